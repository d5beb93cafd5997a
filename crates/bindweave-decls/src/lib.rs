//! Symbol descriptions and the declaration store.
//!
//! Each C declaration the upstream parser reports becomes a
//! [`Description`]: the declaration's data plus the bookkeeping the
//! resolution passes operate on (inclusion rule, requirement edges,
//! diagnostics). Descriptions live in a [`Declarations`] arena and are
//! referred to by [`DescriptionId`]; the arena also records the order
//! entries must appear in generated output.
//!
//! [`DeclarationCollector`] is the intake layer. It hoists composite
//! definitions out of the types that embed them, merges opaque and
//! transparent sightings of the same tag into one description, and
//! defers macro definitions until the rest of the input has been seen.
//!
//! ## Modules
//!
//! - [`description`] — Per-symbol descriptions and inclusion rules
//! - [`store`] — The arena and output ordering
//! - [`collect`] — Declaration intake and composite hoisting

pub mod collect;
pub mod description;
pub mod store;

// Re-export key types for convenience
pub use collect::{DeclarationCollector, MacroBody};
pub use description::{DescKind, Description, IncludeRule};
pub use store::{DeclKind, Declarations, DescriptionId};
