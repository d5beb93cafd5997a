//! Best-effort dynamic-library symbol probing.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Errors that can occur while probing a library for its exports.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The library could not be located at all.
    #[error("library '{library}' not found")]
    NotFound { library: String },

    /// The library was found but could not be loaded.
    #[error("could not load library '{library}': {detail}")]
    LoadFailed { library: String, detail: String },
}

/// An oracle answering which symbols a shared library exports.
///
/// Probing is best effort: the pipeline downgrades any failure to a
/// warning and proceeds unguarded, so implementations may fail freely.
pub trait SymbolProbe {
    /// Return the exported symbol names of `library`, searching `libdirs`
    /// first and the system search path when `search_sys` is set.
    fn probe(
        &self,
        library: &str,
        libdirs: &[PathBuf],
        search_sys: bool,
    ) -> Result<BTreeSet<String>, ProbeError>;
}

/// A probe backed by a fixed export list, for embedders that already know
/// the symbol set and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    symbols: BTreeSet<String>,
}

impl StaticProbe {
    pub fn new<I>(symbols: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        StaticProbe {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl SymbolProbe for StaticProbe {
    fn probe(
        &self,
        _library: &str,
        _libdirs: &[PathBuf],
        _search_sys: bool,
    ) -> Result<BTreeSet<String>, ProbeError> {
        Ok(self.symbols.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_probe_reports_its_fixed_exports() {
        let probe = StaticProbe::new(["sin", "cos"]);
        let exports = probe.probe("m", &[], true).unwrap();
        assert!(exports.contains("sin"));
        assert!(exports.contains("cos"));
        assert!(!exports.contains("tan"));
    }
}
