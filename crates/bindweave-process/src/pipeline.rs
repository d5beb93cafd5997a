//! The processing pipeline.
//!
//! Runs every resolution pass over a declaration store in dependency
//! order: requirement discovery, the rule adjustments, conflict
//! renaming for flat-namespace targets, the library probe, then two
//! rounds of inclusion resolution with diagnostics surfaced in
//! between. Surfacing excludes every description that carries errors,
//! which is why the second round can give a different answer.

use tracing::{error, info, warn};

use bindweave_decls::{Declarations, DescKind, DescriptionId, IncludeRule};

use crate::depgraph::find_dependencies;
use crate::error::{ProcessError, Result};
use crate::inclusion::calculate_final_inclusion;
use crate::options::ProcessOptions;
use crate::passes::{
    auto_alias_structs, check_symbols, filter_by_regex_rules, mask_external_members,
    remove_macros, remove_null_macro,
};
use crate::probe::SymbolProbe;
use crate::rename::fix_conflicting_names;
use crate::report::RunReport;

/// Process a declaration store: resolve requirements, apply every
/// inclusion adjustment, and settle which descriptions are emitted.
///
/// `probe` looks up exported symbols in the target library; passing
/// `None` disables probing. Fails if an option is malformed, a rename
/// cannot settle, or nothing at all ends up included.
pub fn process(
    decls: &mut Declarations,
    opts: &ProcessOptions,
    probe: Option<&dyn SymbolProbe>,
) -> Result<RunReport> {
    info!("Processing {} declarations", decls.len());

    find_dependencies(decls, opts);
    auto_alias_structs(decls);
    mask_external_members(decls, opts);
    remove_macros(decls, opts);
    filter_by_regex_rules(decls, opts)?;
    remove_null_macro(decls);

    let renames = if opts.output_language.flat_namespace() {
        fix_conflicting_names(decls, opts)?
    } else {
        Vec::new()
    };
    let missing_symbols = check_symbols(decls, opts, probe);

    calculate_final_inclusion(decls);
    let (errors, warnings) = surface_diagnostics(decls, opts);
    calculate_final_inclusion(decls);

    if !decls.any_included() {
        return Err(ProcessError::NothingIncluded);
    }

    let mut report = RunReport {
        renames,
        missing_symbols,
        errors,
        warnings,
        ..Default::default()
    };
    report.tally(decls);
    info!(
        "Included {} of {} descriptions",
        report.included,
        decls.len()
    );
    Ok(report)
}

/// Log the diagnostics of every description that would be emitted (or
/// of all of them under `show_all_errors`), then exclude everything
/// that carries errors. Long diagnostic lists collapse to the first
/// entry plus a count unless `show_long_errors` is set. Macro errors
/// rank as warnings, macro translation is best effort; they are hidden
/// entirely when `show_macro_warnings` is off.
///
/// Returns how many lines were surfaced at each level.
fn surface_diagnostics(decls: &mut Declarations, opts: &ProcessOptions) -> (usize, usize) {
    let mut errors = 0;
    let mut warnings = 0;

    let ids: Vec<DescriptionId> = decls.iter().map(|(id, _)| id).collect();
    for id in ids {
        let desc = &decls[id];
        if desc.included || opts.show_all_errors {
            let casual = desc.casual_name();
            let is_macro = matches!(desc.kind, DescKind::Macro { .. });
            let total = desc.errors.len() + desc.warnings.len();

            if opts.show_long_errors || total <= 2 {
                for diag in &desc.errors {
                    if is_macro {
                        if opts.show_macro_warnings {
                            warn!("{}", diag);
                            warnings += 1;
                        }
                    } else {
                        error!("{}", diag);
                        errors += 1;
                    }
                }
                for diag in &desc.warnings {
                    warn!("{}", diag);
                    warnings += 1;
                }
            } else if !desc.errors.is_empty() {
                let more_errors = desc.errors.len() - 1;
                let more_warnings = desc.warnings.len();
                let summary = if more_warnings > 0 {
                    format!(
                        "{more_errors} more errors and {more_warnings} more warnings \
                         for {casual}"
                    )
                } else {
                    format!("{more_errors} more errors for {casual}")
                };
                if is_macro {
                    if opts.show_macro_warnings {
                        warn!("{}", desc.errors[0]);
                        warn!("{}", summary);
                        warnings += 2;
                    }
                } else {
                    error!("{}", desc.errors[0]);
                    error!("{}", summary);
                    errors += 2;
                }
            } else {
                warn!("{}", desc.warnings[0]);
                warn!("{} more warnings for {}", desc.warnings.len() - 1, casual);
                warnings += 2;
            }
        }

        if !decls[id].errors.is_empty() {
            decls[id].include_rule = IncludeRule::Never;
        }
    }
    (errors, warnings)
}
