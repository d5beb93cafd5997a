//! Summary of a processing run, renderable as text or JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bindweave_decls::Declarations;

/// One rename performed by the conflict pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    /// Output name before renaming.
    pub original: String,
    /// Output name after renaming.
    pub renamed: String,
}

/// The output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    /// Parse a report format from a string.
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => ReportFormat::Json,
            _ => ReportFormat::Text,
        }
    }
}

/// What one processing run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Description counts by declaration category.
    pub totals: BTreeMap<String, usize>,
    /// Descriptions marked for output.
    pub included: usize,
    /// Descriptions left out.
    pub excluded: usize,
    /// Renames performed by the conflict pass.
    pub renames: Vec<RenameRecord>,
    /// Functions and variables the loaded binary did not export.
    pub missing_symbols: Vec<String>,
    /// Errors surfaced to the log.
    pub errors: usize,
    /// Warnings surfaced to the log.
    pub warnings: usize,
}

impl RunReport {
    /// Recount category totals and inclusion verdicts from the store.
    pub fn tally(&mut self, decls: &Declarations) {
        self.totals.clear();
        self.included = 0;
        self.excluded = 0;
        for (_, desc) in decls.iter() {
            *self
                .totals
                .entry(desc.decl_kind().to_string())
                .or_insert(0) += 1;
            if desc.included {
                self.included += 1;
            } else {
                self.excluded += 1;
            }
        }
    }

    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Json => {
                serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }

    fn render_text(&self) -> String {
        let mut text = String::new();
        text.push_str("=== Processing Report ===\n\n");

        text.push_str("DECLARATIONS\n");
        let width = self.totals.keys().map(|k| k.len()).max().unwrap_or(0);
        for (kind, count) in &self.totals {
            text.push_str(&format!("  {kind:width$}  {count}\n"));
        }
        text.push_str(&format!("\n  Included: {}\n", self.included));
        text.push_str(&format!("  Excluded: {}\n", self.excluded));

        if !self.renames.is_empty() {
            text.push('\n');
            text.push_str("RENAMES\n");
            for rename in &self.renames {
                text.push_str(&format!("  {} -> {}\n", rename.original, rename.renamed));
            }
        }

        if !self.missing_symbols.is_empty() {
            text.push('\n');
            text.push_str("MISSING SYMBOLS\n");
            for name in &self.missing_symbols {
                text.push_str(&format!("  {name}\n"));
            }
        }

        text.push('\n');
        text.push_str(&format!(
            "Status: {} errors, {} warnings\n",
            self.errors, self.warnings
        ));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindweave_decls::{DescKind, Description};
    use bindweave_model::Expr;

    fn store_of(names: &[(&str, bool)]) -> Declarations {
        let mut decls = Declarations::new();
        for (name, included) in names {
            let id = decls.push(Description::new(
                DescKind::Constant {
                    name: (*name).into(),
                    value: Expr::int(1),
                },
                None,
            ));
            decls[id].included = *included;
        }
        decls
    }

    #[test]
    fn tally_counts_categories_and_verdicts() {
        let decls = store_of(&[("A", true), ("B", false), ("C", true)]);
        let mut report = RunReport::default();
        report.tally(&decls);

        assert_eq!(report.totals["constant"], 3);
        assert_eq!(report.included, 2);
        assert_eq!(report.excluded, 1);
    }

    #[test]
    fn text_rendering_lists_renames_and_missing_symbols() {
        let report = RunReport {
            renames: vec![RenameRecord {
                original: "open".into(),
                renamed: "open_".into(),
            }],
            missing_symbols: vec!["gone".into()],
            errors: 1,
            warnings: 2,
            ..Default::default()
        };
        let text = report.render(ReportFormat::Text);

        assert!(text.contains("RENAMES"));
        assert!(text.contains("open -> open_"));
        assert!(text.contains("MISSING SYMBOLS"));
        assert!(text.contains("  gone"));
        assert!(text.contains("Status: 1 errors, 2 warnings"));
    }

    #[test]
    fn json_rendering_round_trips() {
        let mut report = RunReport::default();
        report.tally(&store_of(&[("A", true)]));
        let json = report.render(ReportFormat::Json);

        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.included, 1);
        assert_eq!(back.totals["constant"], 1);
    }

    #[test]
    fn format_parsing_defaults_to_text() {
        assert_eq!(ReportFormat::parse("json"), ReportFormat::Json);
        assert_eq!(ReportFormat::parse("text"), ReportFormat::Text);
        assert_eq!(ReportFormat::parse("anything"), ReportFormat::Text);
    }
}
