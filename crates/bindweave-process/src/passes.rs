//! Rule-adjusting passes that run between dependency discovery and the
//! inclusion resolver.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use bindweave_decls::{DeclKind, Declarations, DescKind, Description, DescriptionId, IncludeRule};
use bindweave_model::location::{BUILTIN_FILE, COMMAND_LINE_FILE};
use bindweave_model::{CStructType, CType};

use crate::error::{ProcessError, Result};
use crate::options::ProcessOptions;
use crate::probe::SymbolProbe;

/// Add a bare-name typedef for every tagged struct and union, matching
/// the common C practice of typedefing them. Anonymous definitions keep
/// their synthetic tags private, and enums are left alone. A duplicate
/// alias name is harmless, the output side shadows like C does.
pub fn auto_alias_structs(decls: &mut Declarations) {
    let ids: Vec<DescriptionId> = decls
        .output_order
        .iter()
        .filter(|(kind, _)| *kind == DeclKind::Struct)
        .map(|(_, id)| *id)
        .collect();

    let mut added = 0;
    for id in ids {
        let DescKind::Struct {
            tag,
            variety,
            anonymous,
            ..
        } = &decls[id].kind
        else {
            continue;
        };
        if *anonymous {
            continue;
        }
        let tag = tag.clone();
        let ty = CType::structure(CStructType::reference(*variety, tag.clone()));
        let src = decls[id].src.clone();
        let alias = decls.push(Description::new(DescKind::Typedef { name: tag, ty }, src));
        decls.add_requirement(alias, id);
        decls.output_order.push((DeclKind::Typedef, alias));
        added += 1;
    }
    debug!("Added {} struct aliases", added);
}

fn header_basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// Demote symbols that did not come from the requested headers, so they
/// are only emitted when something requested needs them.
///
/// Covers symbols injected on the command line, compiler built-ins
/// (unless `builtin_symbols`), and symbols from headers pulled in
/// transitively (unless `all_headers`).
pub fn mask_external_members(decls: &mut Declarations, opts: &ProcessOptions) {
    let input_headers: BTreeSet<&str> = opts
        .headers
        .iter()
        .chain(opts.system_headers.iter())
        .map(|h| header_basename(h))
        .collect();

    for (_, desc) in decls.iter_mut() {
        let Some(src) = &desc.src else { continue };
        if src.file == COMMAND_LINE_FILE {
            desc.include_rule = IncludeRule::IfNeeded;
        } else if src.file == BUILTIN_FILE {
            if !opts.builtin_symbols {
                desc.include_rule = IncludeRule::IfNeeded;
            }
        } else if !input_headers.contains(src.basename()) && !opts.all_headers {
            desc.include_rule = IncludeRule::IfNeeded;
        }
    }
}

/// Exclude every macro unless macro output was requested.
pub fn remove_macros(decls: &mut Declarations, opts: &ProcessOptions) {
    if opts.include_macros {
        return;
    }
    for (_, desc) in decls.iter_mut() {
        if matches!(desc.kind, DescKind::Macro { .. }) {
            desc.include_rule = IncludeRule::Never;
        }
    }
}

/// Apply the ordered `RULE=PATTERN` overrides from the options. Each
/// pattern must match the whole output name; later entries override
/// earlier ones.
pub fn filter_by_regex_rules(decls: &mut Declarations, opts: &ProcessOptions) -> Result<()> {
    for spec in &opts.symbol_rules {
        let Some((rule_name, pattern)) = spec.split_once('=') else {
            return Err(ProcessError::MalformedSymbolRule { spec: spec.clone() });
        };
        let Some(rule) = IncludeRule::parse(rule_name) else {
            return Err(ProcessError::UnknownIncludeRule {
                spec: spec.clone(),
                rule: rule_name.to_string(),
            });
        };
        let expr = Regex::new(&format!("^(?:{pattern})$"))?;
        for (_, desc) in decls.iter_mut() {
            if expr.is_match(&desc.py_name()) {
                desc.include_rule = rule;
            }
        }
    }
    Ok(())
}

/// The output runtime defines NULL itself; the macro would shadow it.
pub fn remove_null_macro(decls: &mut Declarations) {
    for (_, desc) in decls.iter_mut() {
        if matches!(&desc.kind, DescKind::Macro { name, .. } if name == "NULL") {
            desc.include_rule = IncludeRule::Never;
        }
    }
}

/// Probe the requested library and report functions and variables it
/// does not export. With symbol guards enabled the missing names stay
/// in; with guards disabled they are excluded. Returns the missing
/// linker names, for the run report.
pub fn check_symbols(
    decls: &mut Declarations,
    opts: &ProcessOptions,
    probe: Option<&dyn SymbolProbe>,
) -> Vec<String> {
    if opts.no_load_library {
        return Vec::new();
    }
    let Some(library) = &opts.library else {
        return Vec::new();
    };
    let Some(probe) = probe else {
        return Vec::new();
    };
    let found = match probe.probe(library, &opts.compile_libdirs, opts.search_sys) {
        Ok(found) => found,
        Err(_) => {
            warn!(
                "Could not load library '{}'. Okay, I'll try to load it at runtime instead.",
                library
            );
            return Vec::new();
        }
    };

    let mut missing_ids = Vec::new();
    let mut missing = Vec::new();
    for (id, desc) in decls.iter() {
        let linkable = matches!(
            desc.kind,
            DescKind::Function { .. } | DescKind::Variable { .. }
        );
        if linkable && desc.include_rule != IncludeRule::Never {
            let c_name = desc.c_name();
            if !found.contains(&c_name) {
                missing_ids.push(id);
                missing.push(c_name);
            }
        }
    }
    if missing.is_empty() {
        return missing;
    }

    warn!("Some symbols could not be found: {}", missing.join(", "));
    if !opts.guard_symbols {
        warn!("Missing symbols will be excluded since symbol guards are disabled");
        for id in missing_ids {
            decls[id].include_rule = IncludeRule::Never;
        }
    }
    missing
}
