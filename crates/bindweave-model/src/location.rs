//! Source positions carried through from the upstream parser.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pseudo-file for symbols synthesized by the compiler or by this engine.
pub const BUILTIN_FILE: &str = "<built-in>";

/// Pseudo-file for symbols defined on the preprocessor command line.
pub const COMMAND_LINE_FILE: &str = "<command line>";

/// Where a declaration came from. The file may be one of the pseudo-file
/// names above rather than a real path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of a symbol this engine synthesizes itself.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_FILE, 1)
    }

    /// The file name without any directory components. Pseudo-files are
    /// returned unchanged.
    pub fn basename(&self) -> &str {
        self.file.rsplit(['/', '\\']).next().unwrap_or(&self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_directories() {
        assert_eq!(Location::new("/usr/include/stdio.h", 33).basename(), "stdio.h");
        assert_eq!(Location::new("local.h", 1).basename(), "local.h");
    }

    #[test]
    fn pseudo_files_survive_basename() {
        assert_eq!(Location::builtin().basename(), BUILTIN_FILE);
        assert_eq!(Location::new(COMMAND_LINE_FILE, 1).basename(), COMMAND_LINE_FILE);
    }
}
