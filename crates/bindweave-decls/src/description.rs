//! Per-symbol descriptions.
//!
//! A description is one declaration plus everything the resolution
//! passes track about it: whether it may be emitted, which other
//! descriptions it requires, and the diagnostics collected along the
//! way.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use bindweave_model::ctype::Attributes;
use bindweave_model::{CType, DiagClass, Diagnostic, Expr, Location, Variety};

use crate::store::{DeclKind, DescriptionId};

/// Whether a description may appear in generated output.
///
/// `Always` entries are emitted and pull in what they require.
/// `IfNeeded` entries are emitted only when something included requires
/// them. `Never` entries are dropped even if required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncludeRule {
    #[serde(rename = "yes")]
    Always,
    #[serde(rename = "if_needed")]
    IfNeeded,
    #[serde(rename = "never")]
    Never,
}

impl IncludeRule {
    /// Parse the spelling used in configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(IncludeRule::Always),
            "if_needed" => Some(IncludeRule::IfNeeded),
            "never" => Some(IncludeRule::Never),
            _ => None,
        }
    }
}

impl fmt::Display for IncludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncludeRule::Always => "yes",
            IncludeRule::IfNeeded => "if_needed",
            IncludeRule::Never => "never",
        };
        write!(f, "{s}")
    }
}

/// The declaration data carried by a description.
#[derive(Debug, Clone, PartialEq)]
pub enum DescKind {
    Constant {
        name: String,
        value: Expr,
    },
    Typedef {
        name: String,
        ty: CType,
    },
    /// A struct or union. `members` stays `None` while only forward
    /// declarations have been seen.
    Struct {
        tag: String,
        variety: Variety,
        attributes: Attributes,
        members: Option<Vec<(Option<String>, CType)>>,
        /// True when the tag is synthetic, for a tagless definition.
        anonymous: bool,
    },
    Enum {
        tag: String,
        enumerators: Option<Vec<(String, Expr)>>,
        /// True when the tag is synthetic, for a tagless definition.
        anonymous: bool,
    },
    Function {
        name: String,
        /// The linker-level name; kept when the output name is renamed.
        c_name: String,
        restype: CType,
        argtypes: Vec<CType>,
        variadic: bool,
        attributes: Attributes,
    },
    Variable {
        name: String,
        /// The linker-level name; kept when the output name is renamed.
        c_name: String,
        ty: CType,
    },
    /// A macro. `body` is `None` when the definition could not be
    /// parsed; the parse failure is attached as an error.
    Macro {
        name: String,
        params: Option<Vec<String>>,
        body: Option<Expr>,
    },
    /// A `#undef` directive targeting a macro defined earlier.
    Undef {
        name: String,
        target: Expr,
    },
}

/// One declaration plus resolution bookkeeping.
#[derive(Debug, Clone)]
pub struct Description {
    pub kind: DescKind,
    pub src: Option<Location>,
    pub include_rule: IncludeRule,
    /// Descriptions this one needs in order to be emitted.
    pub requirements: BTreeSet<DescriptionId>,
    /// Descriptions that need this one. Mirror of `requirements`.
    pub dependents: BTreeSet<DescriptionId>,
    /// Fatal problems. A description with errors is excluded before
    /// output, and its errors are reported if it would have been kept.
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Scratch for the inclusion resolver's first pass.
    pub can_include: Option<bool>,
    /// Final inclusion verdict.
    pub included: bool,
}

impl Description {
    pub fn new(kind: DescKind, src: Option<Location>) -> Self {
        // Undefs only matter when the macro they target is output.
        let include_rule = match kind {
            DescKind::Undef { .. } => IncludeRule::IfNeeded,
            _ => IncludeRule::Always,
        };
        Self {
            kind,
            src,
            include_rule,
            requirements: BTreeSet::new(),
            dependents: BTreeSet::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            can_include: None,
            included: false,
        }
    }

    /// Attach a fatal problem.
    pub fn error(&mut self, message: impl Into<String>, class: Option<DiagClass>) {
        self.errors.push(Diagnostic::new(message, class));
    }

    /// Attach a nonfatal problem.
    pub fn warning(&mut self, message: impl Into<String>, class: Option<DiagClass>) {
        self.warnings.push(Diagnostic::new(message, class));
    }

    /// The declaration category, as used in output ordering.
    pub fn decl_kind(&self) -> DeclKind {
        match &self.kind {
            DescKind::Constant { .. } => DeclKind::Constant,
            DescKind::Typedef { .. } => DeclKind::Typedef,
            DescKind::Struct { .. } => DeclKind::Struct,
            DescKind::Enum { .. } => DeclKind::Enum,
            DescKind::Function { .. } => DeclKind::Function,
            DescKind::Variable { .. } => DeclKind::Variable,
            DescKind::Macro { .. } => DeclKind::Macro,
            DescKind::Undef { .. } => DeclKind::Undef,
        }
    }

    /// Human-facing name for diagnostics.
    pub fn casual_name(&self) -> String {
        match &self.kind {
            DescKind::Constant { name, .. } => format!("Constant '{name}'"),
            DescKind::Typedef { name, .. } => format!("Typedef '{name}'"),
            DescKind::Struct { tag, variety, .. } => {
                format!("{} '{tag}'", variety.capitalized())
            }
            DescKind::Enum { tag, .. } => format!("Enum '{tag}'"),
            DescKind::Function { name, .. } => format!("Function '{name}'"),
            DescKind::Variable { name, .. } => format!("Variable '{name}'"),
            DescKind::Macro { name, .. } => format!("Macro '{name}'"),
            DescKind::Undef { name, .. } => format!("Undef '{name}'"),
        }
    }

    /// The name this description binds in generated code.
    pub fn py_name(&self) -> String {
        match &self.kind {
            DescKind::Constant { name, .. }
            | DescKind::Typedef { name, .. }
            | DescKind::Function { name, .. }
            | DescKind::Variable { name, .. }
            | DescKind::Macro { name, .. } => name.clone(),
            DescKind::Struct { tag, variety, .. } => format!("{}_{tag}", variety.keyword()),
            DescKind::Enum { tag, .. } => format!("enum_{tag}"),
            DescKind::Undef { name, .. } => format!("#undef:{name}"),
        }
    }

    /// The name as C spells it. Survives renaming for functions and
    /// variables, which must still be looked up by linker name.
    pub fn c_name(&self) -> String {
        match &self.kind {
            DescKind::Constant { name, .. }
            | DescKind::Typedef { name, .. }
            | DescKind::Macro { name, .. } => name.clone(),
            DescKind::Function { c_name, .. } | DescKind::Variable { c_name, .. } => {
                c_name.clone()
            }
            DescKind::Struct { tag, variety, .. } => format!("{} {tag}", variety.keyword()),
            DescKind::Enum { tag, .. } => format!("enum {tag}"),
            DescKind::Undef { name, .. } => format!("#undef {name}"),
        }
    }

    /// Replace the output name. Functions and variables keep their
    /// linker-level `c_name`; undef targets keep the original
    /// identifier.
    pub fn set_name(&mut self, new: impl Into<String>) {
        let new = new.into();
        match &mut self.kind {
            DescKind::Constant { name, .. }
            | DescKind::Typedef { name, .. }
            | DescKind::Function { name, .. }
            | DescKind::Variable { name, .. }
            | DescKind::Macro { name, .. }
            | DescKind::Undef { name, .. } => *name = new,
            DescKind::Struct { tag, .. } | DescKind::Enum { tag, .. } => *tag = new,
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.casual_name())
    }
}
