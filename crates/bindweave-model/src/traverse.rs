//! Recursive walks over type and expression trees.
//!
//! A [`TypeVisitor`] receives every composite definition, typedef
//! reference, identifier, and attached diagnostic reachable from a
//! node. Walks cross freely between types and expressions: array
//! counts embed expressions, and `sizeof`/casts embed types.
//!
//! [`collect_type_info`] and [`collect_expr_info`] run the walk with
//! an accumulating visitor, which is what dependency resolution needs.

use crate::ctype::{CEnumType, CStructType, CType, CTypeKind};
use crate::diag::Diagnostic;
use crate::expr::{Expr, ExprKind};

/// Callbacks fired during a walk. All methods default to no-ops so
/// implementors override only what they consume.
pub trait TypeVisitor<'a> {
    /// A struct or union definition or reference.
    fn visit_struct(&mut self, _def: &'a CStructType) {}

    /// An enum definition or reference.
    fn visit_enum(&mut self, _def: &'a CEnumType) {}

    /// A reference to a typedef by name. Not fired for typedef nodes
    /// that carry errors; the error callback covers those.
    fn visit_typedef(&mut self, _name: &'a str) {}

    /// An identifier inside an expression. Macro parameters are not
    /// reported; they are bound locally, not named symbols.
    fn visit_identifier(&mut self, _name: &'a str) {}

    /// A diagnostic attached to any node along the walk.
    fn visit_error(&mut self, _diag: &'a Diagnostic) {}
}

/// Walk a type tree, firing `v`'s callbacks in encounter order.
///
/// Composites are reported before their members, so a visitor that
/// recurses on its own (the declaration collector does) sees nested
/// definitions while handling the outer one. Bitfield widths and enum
/// enumerator values are not walked; they are rendered in place and
/// never introduce output-order requirements.
pub fn walk_type<'a>(ty: &'a CType, v: &mut dyn TypeVisitor<'a>) {
    match &ty.kind {
        CTypeKind::Simple { .. } | CTypeKind::Special(_) => {}
        CTypeKind::Typedef(name) => {
            if ty.errors.is_empty() {
                v.visit_typedef(name);
            }
        }
        CTypeKind::Bitfield { base, .. } => walk_type(base, v),
        CTypeKind::Pointer { target, .. } => walk_type(target, v),
        CTypeKind::Array { base, count } => {
            walk_type(base, v);
            if let Some(count) = count {
                walk_expr(count, v);
            }
        }
        CTypeKind::Function {
            restype, argtypes, ..
        } => {
            walk_type(restype, v);
            for arg in argtypes {
                walk_type(arg, v);
            }
        }
        CTypeKind::Struct(def) => {
            v.visit_struct(def);
            if let Some(members) = &def.members {
                for (_, member) in members {
                    walk_type(member, v);
                }
            }
        }
        CTypeKind::Enum(def) => v.visit_enum(def),
    }
    for diag in &ty.errors {
        v.visit_error(diag);
    }
}

/// Walk an expression tree, firing `v`'s callbacks in encounter order.
pub fn walk_expr<'a>(expr: &'a Expr, v: &mut dyn TypeVisitor<'a>) {
    match &expr.kind {
        ExprKind::Constant { .. } | ExprKind::Parameter(_) | ExprKind::Unsupported { .. } => {}
        ExprKind::Identifier(name) => v.visit_identifier(name),
        ExprKind::Unary { child, .. } => walk_expr(child, v),
        ExprKind::SizeOfType(ty) => walk_type(ty, v),
        ExprKind::SizeOfExpr(child) => walk_expr(child, v),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, v);
            walk_expr(right, v);
        }
        ExprKind::Conditional { cond, yes, no } => {
            walk_expr(cond, v);
            walk_expr(yes, v);
            walk_expr(no, v);
        }
        ExprKind::Attribute { base, .. } => walk_expr(base, v),
        ExprKind::Call { func, args } => {
            walk_expr(func, v);
            for arg in args {
                walk_expr(arg, v);
            }
        }
        ExprKind::Cast { base, target } => {
            walk_expr(base, v);
            walk_type(target, v);
        }
    }
    for diag in &expr.errors {
        v.visit_error(diag);
    }
}

/// Everything a walk reached, in encounter order per category.
#[derive(Debug, Default)]
pub struct TypeInfo<'a> {
    pub structs: Vec<&'a CStructType>,
    pub enums: Vec<&'a CEnumType>,
    pub typedefs: Vec<&'a str>,
    pub identifiers: Vec<&'a str>,
    pub errors: Vec<&'a Diagnostic>,
}

impl<'a> TypeInfo<'a> {
    /// Extend from another root's walk, preserving order.
    pub fn absorb(&mut self, other: TypeInfo<'a>) {
        self.structs.extend(other.structs);
        self.enums.extend(other.enums);
        self.typedefs.extend(other.typedefs);
        self.identifiers.extend(other.identifiers);
        self.errors.extend(other.errors);
    }
}

impl<'a> TypeVisitor<'a> for TypeInfo<'a> {
    fn visit_struct(&mut self, def: &'a CStructType) {
        self.structs.push(def);
    }

    fn visit_enum(&mut self, def: &'a CEnumType) {
        self.enums.push(def);
    }

    fn visit_typedef(&mut self, name: &'a str) {
        self.typedefs.push(name);
    }

    fn visit_identifier(&mut self, name: &'a str) {
        self.identifiers.push(name);
    }

    fn visit_error(&mut self, diag: &'a Diagnostic) {
        self.errors.push(diag);
    }
}

/// Collect every name and diagnostic reachable from a type.
pub fn collect_type_info(ty: &CType) -> TypeInfo<'_> {
    let mut info = TypeInfo::default();
    walk_type(ty, &mut info);
    info
}

/// Collect every name and diagnostic reachable from an expression.
pub fn collect_expr_info(expr: &Expr) -> TypeInfo<'_> {
    let mut info = TypeInfo::default();
    walk_expr(expr, &mut info);
    info
}
