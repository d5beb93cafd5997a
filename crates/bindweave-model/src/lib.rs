//! C type and expression model for the bindweave resolution engine.
//!
//! Declarations handed over by the upstream C parser are modeled as two
//! small ASTs: [`CType`] for types and [`Expr`] for constant expressions.
//! Every node can render itself as target-runtime (Python/ctypes) source
//! text, report the names it references through a pure traversal, and
//! fold to a [`Value`] where C constant semantics allow it.
//!
//! ## Modules
//!
//! - [`ctype`] — C type nodes, the builtin type map, function-pointer normalization
//! - [`expr`] — Constant expression nodes, rendering, and evaluation
//! - [`value`] — Dynamic values produced by evaluation
//! - [`traverse`] — Pure reference and error collection over both trees
//! - [`diag`] — Diagnostics attached to nodes and symbol descriptions
//! - [`location`] — Source positions carried through from the parser
//! - [`keywords`] — Reserved words of the target language
//! - [`error`] — Model error type

pub mod ctype;
pub mod diag;
pub mod error;
pub mod expr;
pub mod keywords;
pub mod location;
pub mod traverse;
pub mod value;

// Re-export key types for convenience
pub use ctype::{remove_function_pointer, CEnumType, CStructType, CType, CTypeKind, Variety};
pub use diag::{DiagClass, Diagnostic};
pub use error::ModelError;
pub use expr::{BinaryOp, EmptyContext, EvalContext, Expr, ExprKind, UnaryOp};
pub use location::Location;
pub use traverse::{collect_expr_info, collect_type_info, walk_expr, walk_type, TypeInfo, TypeVisitor};
pub use value::Value;
