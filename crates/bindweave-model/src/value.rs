//! Dynamic values produced by constant-expression evaluation.
//!
//! Arithmetic follows the target runtime, not C: true division always
//! yields a float, modulo takes the sign of the divisor, and the logical
//! operators return the deciding operand rather than a boolean.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A value computed from a constant expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

/// Numeric view of a value, with booleans coerced the way the target
/// runtime coerces them.
enum Num {
    Int(i128),
    Float(f64),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }

    /// Truthiness under target-runtime rules.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(i128::from(*b))),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Null | Value::Str(_) => None,
        }
    }

    fn as_int(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(i128::from(*b)),
            Value::Int(i) => Some(*i),
            Value::Null | Value::Float(_) | Value::Str(_) => None,
        }
    }

    /// Source text for this value in the target language.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "None".into(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::Str(s) => render_str(s),
        }
    }

    pub fn add(self, other: Value) -> Result<Value> {
        if let (Value::Str(l), Value::Str(r)) = (&self, &other) {
            return Ok(Value::Str(format!("{l}{r}")));
        }
        numeric_op("+", self, other, |l, r| Ok(Value::Int(l.wrapping_add(r))), |l, r| {
            Ok(Value::Float(l + r))
        })
    }

    pub fn sub(self, other: Value) -> Result<Value> {
        numeric_op("-", self, other, |l, r| Ok(Value::Int(l.wrapping_sub(r))), |l, r| {
            Ok(Value::Float(l - r))
        })
    }

    pub fn mul(self, other: Value) -> Result<Value> {
        numeric_op("*", self, other, |l, r| Ok(Value::Int(l.wrapping_mul(r))), |l, r| {
            Ok(Value::Float(l * r))
        })
    }

    /// True division: integer operands still produce a float.
    pub fn div(self, other: Value) -> Result<Value> {
        numeric_op(
            "/",
            self,
            other,
            |l, r| {
                if r == 0 {
                    Err(ModelError::DivisionByZero)
                } else {
                    Ok(Value::Float(l as f64 / r as f64))
                }
            },
            |l, r| {
                if r == 0.0 {
                    Err(ModelError::DivisionByZero)
                } else {
                    Ok(Value::Float(l / r))
                }
            },
        )
    }

    /// Remainder with the divisor's sign.
    pub fn rem(self, other: Value) -> Result<Value> {
        numeric_op(
            "%",
            self,
            other,
            |l, r| {
                if r == 0 {
                    Err(ModelError::DivisionByZero)
                } else {
                    let m = l % r;
                    let m = if m != 0 && (m < 0) != (r < 0) { m + r } else { m };
                    Ok(Value::Int(m))
                }
            },
            |l, r| {
                if r == 0.0 {
                    Err(ModelError::DivisionByZero)
                } else {
                    Ok(Value::Float(l - r * (l / r).floor()))
                }
            },
        )
    }

    pub fn shl(self, other: Value) -> Result<Value> {
        int_op("<<", self, other, |l, r| {
            let count = u32::try_from(r).map_err(|_| ModelError::ShiftOutOfRange)?;
            l.checked_shl(count).ok_or(ModelError::ShiftOutOfRange)
        })
    }

    pub fn shr(self, other: Value) -> Result<Value> {
        int_op(">>", self, other, |l, r| {
            let count = u32::try_from(r).map_err(|_| ModelError::ShiftOutOfRange)?;
            l.checked_shr(count).ok_or(ModelError::ShiftOutOfRange)
        })
    }

    pub fn bit_and(self, other: Value) -> Result<Value> {
        int_op("&", self, other, |l, r| Ok(l & r))
    }

    pub fn bit_xor(self, other: Value) -> Result<Value> {
        int_op("^", self, other, |l, r| Ok(l ^ r))
    }

    pub fn bit_or(self, other: Value) -> Result<Value> {
        int_op("|", self, other, |l, r| Ok(l | r))
    }

    pub fn neg(self) -> Result<Value> {
        match self.as_num() {
            Some(Num::Int(i)) => Ok(Value::Int(-i)),
            Some(Num::Float(f)) => Ok(Value::Float(-f)),
            None => Err(mismatch("-", &self, &self)),
        }
    }

    pub fn pos(self) -> Result<Value> {
        match self.as_num() {
            Some(Num::Int(i)) => Ok(Value::Int(i)),
            Some(Num::Float(f)) => Ok(Value::Float(f)),
            None => Err(mismatch("+", &self, &self)),
        }
    }

    pub fn bit_not(self) -> Result<Value> {
        match self.as_int() {
            Some(i) => Ok(Value::Int(!i)),
            None => Err(mismatch("~", &self, &self)),
        }
    }

    pub fn not(self) -> Result<Value> {
        Ok(Value::Bool(!self.truthy()))
    }

    /// Equality never fails; unrelated kinds simply compare unequal.
    pub fn eq(&self, other: &Value) -> bool {
        match (self.as_num(), other.as_num()) {
            (Some(Num::Int(l)), Some(Num::Int(r))) => l == r,
            (Some(l), Some(r)) => to_f64(l) == to_f64(r),
            _ => match (self, other) {
                (Value::Str(l), Value::Str(r)) => l == r,
                (Value::Null, Value::Null) => true,
                _ => false,
            },
        }
    }

    /// Ordering comparison; numeric operands mix, strings compare with
    /// strings, anything else is an error.
    pub fn compare(&self, op: &'static str, other: &Value) -> Result<std::cmp::Ordering> {
        match (self.as_num(), other.as_num()) {
            (Some(Num::Int(l)), Some(Num::Int(r))) => Ok(l.cmp(&r)),
            (Some(l), Some(r)) => to_f64(l)
                .partial_cmp(&to_f64(r))
                .ok_or_else(|| mismatch(op, self, other)),
            _ => match (self, other) {
                (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
                _ => Err(mismatch(op, self, other)),
            },
        }
    }
}

fn to_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn mismatch(op: &'static str, left: &Value, right: &Value) -> ModelError {
    ModelError::TypeMismatch {
        op,
        left: left.kind_name(),
        right: right.kind_name(),
    }
}

fn numeric_op(
    op: &'static str,
    left: Value,
    right: Value,
    int_case: impl FnOnce(i128, i128) -> Result<Value>,
    float_case: impl FnOnce(f64, f64) -> Result<Value>,
) -> Result<Value> {
    match (left.as_num(), right.as_num()) {
        (Some(Num::Int(l)), Some(Num::Int(r))) => int_case(l, r),
        (Some(l), Some(r)) => float_case(to_f64(l), to_f64(r)),
        _ => Err(mismatch(op, &left, &right)),
    }
}

fn int_op(
    op: &'static str,
    left: Value,
    right: Value,
    f: impl FnOnce(i128, i128) -> Result<i128>,
) -> Result<Value> {
    match (left.as_int(), right.as_int()) {
        (Some(l), Some(r)) => f(l, r).map(Value::Int),
        _ => Err(mismatch(op, &left, &right)),
    }
}

/// Float text matching the target runtime's `repr`: whole values keep a
/// trailing `.0`, everything else uses the shortest round-trip form.
fn render_float(f: f64) -> String {
    if f.is_finite() && f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Single-quoted string literal with the escapes the target runtime's
/// `repr` would produce.
fn render_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_division_produces_floats() {
        let v = Value::Int(3).div(Value::Int(2)).unwrap();
        assert_eq!(v, Value::Float(1.5));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            Value::Int(1).div(Value::Int(0)),
            Err(ModelError::DivisionByZero)
        ));
    }

    #[test]
    fn modulo_takes_divisor_sign() {
        assert_eq!(Value::Int(-7).rem(Value::Int(3)).unwrap(), Value::Int(2));
        assert_eq!(Value::Int(7).rem(Value::Int(-3)).unwrap(), Value::Int(-2));
        assert_eq!(Value::Int(7).rem(Value::Int(3)).unwrap(), Value::Int(1));
    }

    #[test]
    fn booleans_coerce_in_arithmetic() {
        assert_eq!(Value::Bool(true).add(Value::Int(1)).unwrap(), Value::Int(2));
    }

    #[test]
    fn whole_floats_render_with_decimal_point() {
        assert_eq!(Value::Float(2.0).render(), "2.0");
        assert_eq!(Value::Float(0.5).render(), "0.5");
    }

    #[test]
    fn strings_render_single_quoted() {
        assert_eq!(Value::Str("a'b".into()).render(), "'a\\'b'");
        assert_eq!(Value::Str("tab\there".into()).render(), "'tab\\there'");
    }

    #[test]
    fn mixed_kind_equality_is_false_not_an_error() {
        assert!(!Value::Str("1".into()).eq(&Value::Int(1)));
        assert!(Value::Bool(true).eq(&Value::Int(1)));
        assert!(Value::Null.eq(&Value::Null));
    }

    #[test]
    fn string_comparison_with_number_fails() {
        assert!(Value::Str("a".into()).compare("<", &Value::Int(1)).is_err());
    }
}
