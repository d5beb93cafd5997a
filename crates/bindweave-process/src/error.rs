//! Processing error types.

/// Errors that can occur while processing a declaration store.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A symbol rule was not of the form `RULE=PATTERN`.
    #[error("malformed symbol rule '{spec}', expected RULE=PATTERN")]
    MalformedSymbolRule { spec: String },

    /// A symbol rule named an inclusion rule that does not exist.
    #[error("unknown inclusion rule '{rule}' in symbol rule '{spec}'")]
    UnknownIncludeRule { spec: String, rule: String },

    /// A symbol rule pattern failed to compile.
    #[error("invalid symbol rule pattern: {0}")]
    SymbolRulePattern(#[from] regex::Error),

    /// Renaming a symbol kept colliding with protected names.
    #[error("renaming '{name}' did not settle after {attempts} attempts")]
    RenameLimit { name: String, attempts: u32 },

    /// Every declaration ended up excluded.
    #[error("no declarations were included in the output")]
    NothingIncluded,

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessError>;
