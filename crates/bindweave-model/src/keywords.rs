//! Reserved words of the target language.
//!
//! C symbol and member names that collide with these cannot be bound
//! verbatim in generated code; the renamer and the attribute-access
//! constructor both escape them with a trailing underscore.

/// Python keywords (the hard keyword list; soft keywords like `match`
/// bind fine as identifiers and are deliberately absent).
pub const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Whether `name` is a keyword in the target language.
pub fn is_keyword(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_detected() {
        assert!(is_keyword("class"));
        assert!(is_keyword("None"));
        assert!(!is_keyword("match"));
        assert!(!is_keyword("value"));
    }
}
