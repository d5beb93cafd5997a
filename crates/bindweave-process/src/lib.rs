//! Resolution passes for a collected declaration store.
//!
//! Decides what actually reaches generated output through an ordered
//! pipeline: dependency discovery, struct aliasing, external-symbol
//! masking, regex rule filtering, conflict renaming, library probing,
//! and final inclusion resolution.
//!
//! [`process`] runs the whole pipeline; the individual passes are
//! exported for callers that need a different composition.

pub mod depgraph;
pub mod error;
pub mod inclusion;
pub mod options;
pub mod passes;
pub mod pipeline;
pub mod probe;
pub mod protected;
pub mod rename;
pub mod report;

pub use depgraph::find_dependencies;
pub use error::ProcessError;
pub use inclusion::calculate_final_inclusion;
pub use options::{OutputLanguage, ProcessOptions};
pub use passes::{
    auto_alias_structs, check_symbols, filter_by_regex_rules, mask_external_members,
    remove_macros, remove_null_macro,
};
pub use pipeline::process;
pub use probe::{ProbeError, StaticProbe, SymbolProbe};
pub use rename::fix_conflicting_names;
pub use report::{RenameRecord, ReportFormat, RunReport};
