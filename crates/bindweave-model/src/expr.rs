//! Constant expression nodes.
//!
//! Expressions show up in array counts, enumerator values, constants,
//! and macro bodies. `render` produces target-runtime source text;
//! `evaluate` folds the expression to a [`Value`] through an
//! [`EvalContext`] that resolves names and `sizeof`.
//!
//! The `can_be_ctype` flag threads through rendering: where it is false
//! the generated code needs a plain value, so identifiers of ctypes
//! objects must be unwrapped with `.value` at the points that know how.

use serde::{Deserialize, Serialize};

use crate::ctype::{CType, CTypeKind};
use crate::diag::{DiagClass, Diagnostic};
use crate::error::{ModelError, Result};
use crate::keywords::is_keyword;
use crate::value::Value;

// === Operators ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `~x`
    BitNot,
    /// `!x`
    Not,
    /// `&x`; renders but cannot be evaluated.
    AddressOf,
    /// `*x`; renders but cannot be evaluated.
    Deref,
}

impl UnaryOp {
    /// The C spelling, for diagnostics.
    pub fn c_name(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
        }
    }

    /// Whether the operand may be a ctypes object in generated code.
    fn child_can_be_ctype(&self) -> bool {
        match self {
            UnaryOp::Plus | UnaryOp::Not | UnaryOp::AddressOf | UnaryOp::Deref => true,
            UnaryOp::Minus | UnaryOp::BitNot => false,
        }
    }

    fn render(&self, child: &str) -> String {
        match self {
            UnaryOp::Plus => format!("(+{child})"),
            UnaryOp::Minus => format!("(-{child})"),
            UnaryOp::BitNot => format!("(~{child})"),
            UnaryOp::Not => format!("(not {child})"),
            UnaryOp::AddressOf => format!("pointer({child})"),
            UnaryOp::Deref => format!("({child}[0])"),
        }
    }

    fn apply(&self, v: Value) -> Result<Value> {
        match self {
            UnaryOp::Plus => v.pos(),
            UnaryOp::Minus => v.neg(),
            UnaryOp::BitNot => v.bit_not(),
            UnaryOp::Not => v.not(),
            UnaryOp::AddressOf | UnaryOp::Deref => Err(ModelError::NotEvaluable {
                what: self.c_name().into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    /// The C spelling, for diagnostics.
    pub fn c_name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// The target-language spelling.
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            other => other.c_name(),
        }
    }

    /// Whether each side may be a ctypes object in generated code. The
    /// logical operators only test truthiness, so they tolerate ctypes
    /// objects; the value operators need plain numbers.
    fn sides_can_be_ctype(&self) -> (bool, bool) {
        match self {
            BinaryOp::And | BinaryOp::Or => (true, true),
            _ => (false, false),
        }
    }

    fn apply(&self, left: Value, right: Value) -> Result<Value> {
        match self {
            BinaryOp::Add => left.add(right),
            BinaryOp::Sub => left.sub(right),
            BinaryOp::Mul => left.mul(right),
            BinaryOp::Div => left.div(right),
            BinaryOp::Mod => left.rem(right),
            BinaryOp::Shl => left.shl(right),
            BinaryOp::Shr => left.shr(right),
            BinaryOp::Lt => cmp(left, right, "<", std::cmp::Ordering::is_lt),
            BinaryOp::Gt => cmp(left, right, ">", std::cmp::Ordering::is_gt),
            BinaryOp::Le => cmp(left, right, "<=", std::cmp::Ordering::is_le),
            BinaryOp::Ge => cmp(left, right, ">=", std::cmp::Ordering::is_ge),
            BinaryOp::Eq => Ok(Value::Bool(left.eq(&right))),
            BinaryOp::Ne => Ok(Value::Bool(!left.eq(&right))),
            BinaryOp::BitAnd => left.bit_and(right),
            BinaryOp::BitXor => left.bit_xor(right),
            BinaryOp::BitOr => left.bit_or(right),
            // Logical operators return the deciding operand, like the
            // target runtime does.
            BinaryOp::And => Ok(if left.truthy() { right } else { left }),
            BinaryOp::Or => Ok(if left.truthy() { left } else { right }),
        }
    }
}

fn cmp(
    left: Value,
    right: Value,
    op: &'static str,
    test: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    Ok(Value::Bool(test(left.compare(op, &right)?)))
}

// === Expression nodes ===

/// A constant expression: the kind plus any diagnostics attached to
/// this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub errors: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// A literal constant carries pre-rendered text spliced verbatim.
    Constant { value: Value, literal: bool },
    Identifier(String),
    /// A macro parameter; never reported by traversal.
    Parameter(String),
    Unary {
        op: UnaryOp,
        child: Box<Expr>,
    },
    SizeOfType(Box<CType>),
    SizeOfExpr(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        yes: Box<Expr>,
        no: Box<Expr>,
    },
    /// Member access; `arrow` distinguishes `->` from `.`.
    Attribute {
        base: Box<Expr>,
        field: String,
        arrow: bool,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Cast {
        base: Box<Expr>,
        target: Box<CType>,
    },
    /// A construct the model cannot represent; carries an attached
    /// diagnostic from construction.
    Unsupported { reason: String },
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            errors: Vec::new(),
        }
    }

    pub fn constant(value: Value) -> Self {
        Self::new(ExprKind::Constant {
            value,
            literal: false,
        })
    }

    /// Pre-rendered text spliced verbatim into generated code (hex
    /// literals, char escapes the upstream parser chose to keep).
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Constant {
            value: Value::Str(text.into()),
            literal: true,
        })
    }

    pub fn int(v: i128) -> Self {
        Self::constant(Value::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Self::constant(Value::Float(v))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::constant(Value::Str(s.into()))
    }

    pub fn null() -> Self {
        Self::constant(Value::Null)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Identifier(name.into()))
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Parameter(name.into()))
    }

    pub fn unary(op: UnaryOp, child: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            child: Box::new(child),
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn conditional(cond: Expr, yes: Expr, no: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            cond: Box::new(cond),
            yes: Box::new(yes),
            no: Box::new(no),
        })
    }

    /// Member access. A field that collides with a target-language
    /// keyword is escaped here, matching the struct-member rename the
    /// processor applies on the definition side.
    pub fn attribute(base: Expr, field: impl Into<String>, arrow: bool) -> Self {
        let mut field = field.into();
        if is_keyword(&field) {
            field.push('_');
        }
        Self::new(ExprKind::Attribute {
            base: Box::new(base),
            field,
            arrow,
        })
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            func: Box::new(func),
            args,
        })
    }

    pub fn cast(base: Expr, target: CType) -> Self {
        Self::new(ExprKind::Cast {
            base: Box::new(base),
            target: Box::new(target),
        })
    }

    pub fn sizeof_type(ty: CType) -> Self {
        Self::new(ExprKind::SizeOfType(Box::new(ty)))
    }

    pub fn sizeof_expr(expr: Expr) -> Self {
        Self::new(ExprKind::SizeOfExpr(Box::new(expr)))
    }

    /// An unsupported construct; the reason is attached as a diagnostic
    /// so traversal surfaces it.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut expr = Self::new(ExprKind::Unsupported {
            reason: reason.clone(),
        });
        expr.errors
            .push(Diagnostic::new(reason, Some(DiagClass::UnsupportedType)));
        expr
    }

    /// Attach a diagnostic to this node.
    pub fn error(&mut self, message: impl Into<String>, class: Option<DiagClass>) {
        self.errors.push(Diagnostic::new(message, class));
    }

    /// Target-runtime source text for this expression.
    pub fn render(&self, can_be_ctype: bool) -> Result<String> {
        match &self.kind {
            ExprKind::Constant { value, literal } => {
                if *literal {
                    Ok(match value {
                        Value::Str(text) => text.clone(),
                        other => other.render(),
                    })
                } else {
                    Ok(match value {
                        Value::Float(f) if f.is_infinite() && *f > 0.0 => "float('inf')".into(),
                        Value::Float(f) if f.is_infinite() => "float('-inf')".into(),
                        other => other.render(),
                    })
                }
            }
            ExprKind::Identifier(name) | ExprKind::Parameter(name) => Ok(name.clone()),
            ExprKind::Unary { op, child } => {
                let child = child.render(op.child_can_be_ctype() && can_be_ctype)?;
                Ok(op.render(&child))
            }
            ExprKind::SizeOfType(ty) => Ok(format!("sizeof({})", ty.render()?)),
            ExprKind::SizeOfExpr(expr) => Ok(format!("sizeof({})", expr.render(true)?)),
            ExprKind::Binary { op, left, right } => {
                let (lf, rf) = op.sides_can_be_ctype();
                Ok(format!(
                    "({} {} {})",
                    left.render(lf && can_be_ctype)?,
                    op.symbol(),
                    right.render(rf && can_be_ctype)?
                ))
            }
            ExprKind::Conditional { cond, yes, no } => Ok(format!(
                "{} and {} or {}",
                cond.render(true)?,
                yes.render(can_be_ctype)?,
                no.render(can_be_ctype)?
            )),
            ExprKind::Attribute { base, field, arrow } => {
                let base = base.render(can_be_ctype)?;
                let access = if *arrow {
                    format!("{base}.contents.{field}")
                } else {
                    format!("{base}.{field}")
                };
                Ok(if can_be_ctype {
                    access
                } else {
                    format!("{access}.value")
                })
            }
            ExprKind::Call { func, args } => {
                let func = func.render(can_be_ctype)?;
                let args = args
                    .iter()
                    .map(|a| a.render(can_be_ctype))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                Ok(format!("{func}({args})"))
            }
            ExprKind::Cast { base, target } => match &target.kind {
                CTypeKind::Pointer { .. } => Ok(format!(
                    "cast({}, {})",
                    base.render(true)?,
                    target.render()?
                )),
                CTypeKind::Struct(def) => Err(ModelError::NonScalarCast {
                    target: def.render(),
                    base: base.render(false)?,
                }),
                CTypeKind::Simple { name, .. } if name == "void" => {
                    // Casting to (void) discards the value entirely.
                    Ok("None".into())
                }
                _ => Ok(format!("{}({}).value", target.render()?, base.render(false)?)),
            },
            ExprKind::Unsupported { reason } => Err(ModelError::UnsupportedExpression {
                reason: reason.clone(),
            }),
        }
    }

    /// Fold to a value, resolving names and `sizeof` through `ctx`.
    pub fn evaluate(&self, ctx: &dyn EvalContext) -> Result<Value> {
        match &self.kind {
            ExprKind::Constant { value, .. } => Ok(value.clone()),
            ExprKind::Identifier(name) => Ok(ctx.evaluate_identifier(name)),
            ExprKind::Parameter(name) => Ok(ctx.evaluate_parameter(name)),
            ExprKind::Unary { op, child } => op.apply(child.evaluate(ctx)?),
            ExprKind::SizeOfType(ty) => Ok(ctx.evaluate_sizeof_type(ty)),
            ExprKind::SizeOfExpr(expr) => Ok(ctx.evaluate_sizeof_expr(expr)),
            ExprKind::Binary { op, left, right } => {
                op.apply(left.evaluate(ctx)?, right.evaluate(ctx)?)
            }
            ExprKind::Conditional { cond, yes, no } => {
                if cond.evaluate(ctx)?.truthy() {
                    yes.evaluate(ctx)
                } else {
                    no.evaluate(ctx)
                }
            }
            ExprKind::Attribute { arrow, .. } => Err(ModelError::NotEvaluable {
                what: if *arrow { "->" } else { "." }.into(),
            }),
            ExprKind::Call { .. } => Err(ModelError::NotEvaluable {
                what: "function call".into(),
            }),
            ExprKind::Cast { base, .. } => base.evaluate(ctx),
            ExprKind::Unsupported { reason } => Err(ModelError::UnsupportedExpression {
                reason: reason.clone(),
            }),
        }
    }
}

// === Evaluation context ===

/// Resolver hooks for folding expressions outside generated code.
///
/// The defaults warn and produce integer zero, which lets callers fold
/// best-effort without wiring up a full symbol table.
pub trait EvalContext {
    fn evaluate_identifier(&self, name: &str) -> Value {
        tracing::warn!("Attempt to evaluate identifier '{}'", name);
        Value::Int(0)
    }

    fn evaluate_parameter(&self, name: &str) -> Value {
        tracing::warn!("Attempt to evaluate parameter '{}'", name);
        Value::Int(0)
    }

    fn evaluate_sizeof_type(&self, ty: &CType) -> Value {
        tracing::warn!("Attempt to evaluate sizeof({})", ty);
        Value::Int(0)
    }

    fn evaluate_sizeof_expr(&self, _expr: &Expr) -> Value {
        tracing::warn!("Attempt to evaluate sizeof of an expression");
        Value::Int(0)
    }
}

/// Context with no bindings at all.
#[derive(Debug, Default)]
pub struct EmptyContext;

impl EvalContext for EmptyContext {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Bindings(HashMap<&'static str, Value>);

    impl EvalContext for Bindings {
        fn evaluate_identifier(&self, name: &str) -> Value {
            self.0.get(name).cloned().unwrap_or(Value::Int(0))
        }
    }

    #[test]
    fn constants_render_like_the_target_runtime() {
        assert_eq!(Expr::int(42).render(false).unwrap(), "42");
        assert_eq!(Expr::null().render(false).unwrap(), "None");
        assert_eq!(Expr::string("hi").render(false).unwrap(), "'hi'");
        assert_eq!(
            Expr::float(f64::INFINITY).render(false).unwrap(),
            "float('inf')"
        );
        assert_eq!(
            Expr::float(f64::NEG_INFINITY).render(false).unwrap(),
            "float('-inf')"
        );
    }

    #[test]
    fn literals_splice_verbatim() {
        assert_eq!(Expr::literal("0x10").render(false).unwrap(), "0x10");
    }

    #[test]
    fn binary_renders_parenthesized() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::int(1),
            Expr::binary(BinaryOp::Mul, Expr::int(2), Expr::int(3)),
        );
        assert_eq!(e.render(false).unwrap(), "(1 + (2 * 3))");
    }

    #[test]
    fn logical_operators_use_target_spellings() {
        let e = Expr::binary(BinaryOp::And, Expr::ident("a"), Expr::ident("b"));
        assert_eq!(e.render(false).unwrap(), "(a and b)");
        let u = Expr::unary(UnaryOp::Not, Expr::ident("a"));
        assert_eq!(u.render(false).unwrap(), "(not a)");
    }

    #[test]
    fn conditional_renders_and_or() {
        let e = Expr::conditional(Expr::ident("c"), Expr::int(1), Expr::int(2));
        assert_eq!(e.render(false).unwrap(), "c and 1 or 2");
    }

    #[test]
    fn pointer_ops_render_but_do_not_evaluate() {
        let addr = Expr::unary(UnaryOp::AddressOf, Expr::ident("x"));
        assert_eq!(addr.render(false).unwrap(), "pointer(x)");
        assert!(addr.evaluate(&EmptyContext).is_err());

        let deref = Expr::unary(UnaryOp::Deref, Expr::ident("x"));
        assert_eq!(deref.render(false).unwrap(), "(x[0])");
        assert!(deref.evaluate(&EmptyContext).is_err());
    }

    #[test]
    fn attribute_access_escapes_keywords_and_unwraps_values() {
        let e = Expr::attribute(Expr::ident("rec"), "class", false);
        assert_eq!(e.render(true).unwrap(), "rec.class_");
        assert_eq!(e.render(false).unwrap(), "rec.class_.value");

        let arrow = Expr::attribute(Expr::ident("p"), "next", true);
        assert_eq!(arrow.render(true).unwrap(), "p.contents.next");
    }

    #[test]
    fn cast_rendering_by_target_kind() {
        let to_ptr = Expr::cast(Expr::null(), CType::pointer(CType::int()));
        assert_eq!(to_ptr.render(false).unwrap(), "cast(None, POINTER(c_int))");

        let to_void = Expr::cast(Expr::ident("x"), CType::void());
        assert_eq!(to_void.render(false).unwrap(), "None");

        let to_int = Expr::cast(Expr::ident("x"), CType::int());
        assert_eq!(to_int.render(false).unwrap(), "c_int(x).value");

        let to_struct = Expr::cast(
            Expr::ident("x"),
            CType::structure(crate::ctype::CStructType::reference(
                crate::ctype::Variety::Struct,
                "s",
            )),
        );
        assert!(matches!(
            to_struct.render(false),
            Err(ModelError::NonScalarCast { .. })
        ));
    }

    #[test]
    fn unsupported_nodes_fail_both_ways() {
        let e = Expr::unsupported("assignment in macro body");
        assert!(e.render(false).is_err());
        assert!(e.evaluate(&EmptyContext).is_err());
        assert_eq!(e.errors.len(), 1);
    }

    #[test]
    fn evaluation_folds_arithmetic() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::int(1),
            Expr::binary(BinaryOp::Shl, Expr::int(1), Expr::int(4)),
        );
        assert_eq!(e.evaluate(&EmptyContext).unwrap(), Value::Int(17));
    }

    #[test]
    fn evaluation_resolves_identifiers_through_context() {
        let mut bindings = HashMap::new();
        bindings.insert("WIDTH", Value::Int(640));
        let ctx = Bindings(bindings);

        let e = Expr::binary(BinaryOp::Mul, Expr::ident("WIDTH"), Expr::int(2));
        assert_eq!(e.evaluate(&ctx).unwrap(), Value::Int(1280));
    }

    #[test]
    fn default_context_falls_back_to_zero() {
        assert_eq!(
            Expr::ident("UNKNOWN").evaluate(&EmptyContext).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            Expr::sizeof_type(CType::int()).evaluate(&EmptyContext).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn conditional_evaluates_the_taken_branch() {
        let e = Expr::conditional(
            Expr::int(0),
            Expr::unsupported("bad"),
            Expr::int(7),
        );
        assert_eq!(e.evaluate(&EmptyContext).unwrap(), Value::Int(7));
    }

    #[test]
    fn cast_evaluation_passes_through() {
        let e = Expr::cast(Expr::int(3), CType::pointer(CType::void()));
        assert_eq!(e.evaluate(&EmptyContext).unwrap(), Value::Int(3));
    }
}
