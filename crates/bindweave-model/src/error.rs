//! Model error types.

/// Errors produced while rendering or evaluating model nodes.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An expression node the model cannot represent.
    #[error("unsupported expression: {reason}")]
    UnsupportedExpression { reason: String },

    /// A cast to a composite type has no scalar rendering.
    #[error("conversion to non-scalar type {target} requested from {base}")]
    NonScalarCast { target: String, base: String },

    /// A construct with no meaning outside generated code.
    #[error("'{what}' cannot be evaluated in a constant context")]
    NotEvaluable { what: String },

    /// Constant folding divided or took a remainder by zero.
    #[error("division by zero in constant expression")]
    DivisionByZero,

    /// A shift count that is negative or exceeds the integer width.
    #[error("shift count out of range in constant expression")]
    ShiftOutOfRange,

    /// Operands of incompatible kinds reached an operator.
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
