//! Processing options, loadable from TOML.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The output target. It decides whether symbols share one flat module
/// namespace and therefore whether name conflicts must be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLanguage {
    /// Python/ctypes source. Flat namespace, conflicts are renamed away.
    #[default]
    #[serde(rename = "py")]
    Python,
    /// Structured JSON. Names live in per-kind records, no renaming.
    #[serde(rename = "json")]
    Json,
}

impl OutputLanguage {
    /// True when every emitted symbol lands in a single module namespace.
    pub fn flat_namespace(self) -> bool {
        matches!(self, OutputLanguage::Python)
    }
}

/// Options controlling how a declaration store is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProcessOptions {
    /// The header files named as inputs. Symbols from other files are
    /// demoted to if-needed unless `all_headers` is set.
    pub headers: Vec<String>,
    /// Extra headers passed through to the upstream parser.
    pub system_headers: Vec<String>,
    /// Keep symbols regardless of which header they came from.
    pub all_headers: bool,
    /// Keep compiler built-in symbols.
    pub builtin_symbols: bool,
    /// Emit macro definitions.
    pub include_macros: bool,
    /// Honor `#undef` directives.
    pub include_undefs: bool,
    /// Ordered `RULE=PATTERN` overrides, `RULE` one of `never`,
    /// `if_needed`, `yes`, applied to every symbol whose target name
    /// fully matches `PATTERN`.
    pub symbol_rules: Vec<String>,
    /// Names already bound by linked modules; they resolve without edges
    /// and are protected from renames.
    pub linked_symbols: BTreeSet<String>,
    /// The shared library to probe for declared symbols.
    pub library: Option<String>,
    /// Directories searched for the library.
    pub compile_libdirs: Vec<PathBuf>,
    /// Fall back to the system library search path.
    pub search_sys: bool,
    /// Skip probing the library entirely.
    pub no_load_library: bool,
    /// Keep symbols missing from the binary guarded instead of dropping
    /// them.
    pub guard_symbols: bool,
    /// The output target.
    pub output_language: OutputLanguage,
    /// Report problems even for symbols that end up excluded.
    pub show_all_errors: bool,
    /// Report every problem instead of summarizing long lists.
    pub show_long_errors: bool,
    /// Report macros that could not be translated.
    pub show_macro_warnings: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            headers: Vec::new(),
            system_headers: Vec::new(),
            all_headers: false,
            builtin_symbols: false,
            include_macros: true,
            include_undefs: true,
            symbol_rules: Vec::new(),
            linked_symbols: BTreeSet::new(),
            library: None,
            compile_libdirs: Vec::new(),
            search_sys: true,
            no_load_library: false,
            guard_symbols: true,
            output_language: OutputLanguage::Python,
            show_all_errors: false,
            show_long_errors: false,
            show_macro_warnings: true,
        }
    }
}

impl ProcessOptions {
    /// Parse options from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Parse options from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_documented_profile() {
        let opts = ProcessOptions::default();
        assert!(opts.include_macros);
        assert!(opts.include_undefs);
        assert!(opts.search_sys);
        assert!(opts.guard_symbols);
        assert!(opts.show_macro_warnings);
        assert!(!opts.all_headers);
        assert!(!opts.no_load_library);
        assert_eq!(opts.output_language, OutputLanguage::Python);
        assert!(opts.output_language.flat_namespace());
    }

    #[test]
    fn parse_kebab_case_toml() {
        let toml = r#"
headers = ["foo.h", "sub/bar.h"]
all-headers = true
include-macros = false
symbol-rules = ["never=_.*", "yes=FOO_.*"]
linked-symbols = ["size_t", "struct_timeval"]
library = "foo"
compile-libdirs = ["/opt/foo/lib"]
search-sys = false
output-language = "json"
"#;
        let opts = ProcessOptions::parse(toml).unwrap();
        assert_eq!(opts.headers, vec!["foo.h", "sub/bar.h"]);
        assert!(opts.all_headers);
        assert!(!opts.include_macros);
        assert_eq!(opts.symbol_rules.len(), 2);
        assert!(opts.linked_symbols.contains("struct_timeval"));
        assert_eq!(opts.library.as_deref(), Some("foo"));
        assert_eq!(opts.compile_libdirs, vec![PathBuf::from("/opt/foo/lib")]);
        assert!(!opts.search_sys);
        assert_eq!(opts.output_language, OutputLanguage::Json);
        assert!(!opts.output_language.flat_namespace());
        // untouched fields keep their defaults
        assert!(opts.include_undefs);
        assert!(opts.guard_symbols);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "library = \"m\"").unwrap();
        writeln!(file, "no-load-library = true").unwrap();
        let opts = ProcessOptions::load(file.path()).unwrap();
        assert_eq!(opts.library.as_deref(), Some("m"));
        assert!(opts.no_load_library);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(ProcessOptions::parse("headers = 3").is_err());
    }
}
