//! Diagnostics attached to model nodes and symbol descriptions.
//!
//! A diagnostic is a message plus an optional class. Classes let callers
//! filter what gets surfaced (macro translation noise is usually demoted
//! to warnings, for example) without parsing message text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagClass {
    /// A type or expression the model cannot represent.
    UnsupportedType,
    /// A macro body that could not be parsed or translated.
    Macro,
    /// A name lookup that failed during dependency resolution.
    UnresolvedReference,
    /// A name that collides with a protected target-runtime name.
    NameConflict,
    /// A symbol or member renamed to avoid a collision.
    Rename,
    /// The shared library to probe could not be loaded.
    MissingLibrary,
    /// Everything else.
    Other,
}

impl fmt::Display for DiagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagClass::UnsupportedType => "unsupported-type",
            DiagClass::Macro => "macro",
            DiagClass::UnresolvedReference => "unresolved-reference",
            DiagClass::NameConflict => "name-conflict",
            DiagClass::Rename => "rename",
            DiagClass::MissingLibrary => "missing-library",
            DiagClass::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// A single recorded problem, attached to an AST node or a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub class: Option<DiagClass>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, class: Option<DiagClass>) -> Self {
        Self {
            message: message.into(),
            class,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
