//! Conflict renaming against the protected namespace.

use tracing::debug;

use bindweave_decls::{DeclKind, Declarations, DescKind, DescriptionId, IncludeRule};
use bindweave_model::keywords::is_keyword;
use bindweave_model::DiagClass;

use crate::error::{ProcessError, Result};
use crate::options::ProcessOptions;
use crate::protected::protected_names;
use crate::report::RenameRecord;

/// Suffix attempts per symbol before giving up. Reaching this means the
/// protected set contains a pathological run of underscore siblings.
const MAX_RENAME_ATTEMPTS: u32 = 64;

/// Categories in rename priority order. Earlier categories claim a
/// contested name; later ones get the underscores. Undefs never rename,
/// their target names are not identifiers in the output.
const PRIORITY: [DeclKind; 7] = [
    DeclKind::Function,
    DeclKind::Variable,
    DeclKind::Struct,
    DeclKind::Typedef,
    DeclKind::Enum,
    DeclKind::Constant,
    DeclKind::Macro,
];

/// Rename every description whose target name collides with a protected
/// name, appending underscores until it is free. Returns the renames
/// performed, for the run report.
///
/// Renaming invalidates references already rendered into dependents, so
/// every dependent of a renamed symbol is excluded, and the warning says
/// so.
pub fn fix_conflicting_names(
    decls: &mut Declarations,
    opts: &ProcessOptions,
) -> Result<Vec<RenameRecord>> {
    let mut protected = protected_names(&opts.linked_symbols);
    let mut records = Vec::new();

    for kind in PRIORITY {
        let ids: Vec<DescriptionId> = decls
            .iter()
            .filter(|(_, d)| d.decl_kind() == kind)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            let original_py = decls[id].py_name();
            let Some(reason) = protected.get(&original_py).cloned() else {
                continue;
            };
            let original_casual = decls[id].casual_name();

            let mut attempts = 0;
            while protected.contains_key(&decls[id].py_name()) {
                attempts += 1;
                if attempts > MAX_RENAME_ATTEMPTS {
                    return Err(ProcessError::RenameLimit {
                        name: original_py,
                        attempts: MAX_RENAME_ATTEMPTS,
                    });
                }
                append_underscore(&mut decls[id].kind);
            }

            let new_py = decls[id].py_name();
            let new_casual = decls[id].casual_name();
            let mut message = format!(
                "{original_casual} has been renamed to {new_casual} due to a name \
                 conflict with {reason}."
            );

            let dependents: Vec<DescriptionId> = decls[id].dependents.iter().copied().collect();
            if !dependents.is_empty() {
                let names: Vec<String> = dependents
                    .iter()
                    .map(|dep| decls[*dep].casual_name())
                    .collect();
                message.push_str(&format!(
                    " Dependent symbols will be excluded: {}.",
                    names.join(", ")
                ));
                for dep in &dependents {
                    decls[*dep].include_rule = IncludeRule::Never;
                }
            }
            decls[id].warning(message, None);

            // Protect the new name of symbols known to be output, so a
            // later category cannot silently re-collide with it.
            if decls[id].include_rule == IncludeRule::Always {
                protected.insert(new_py.clone(), new_casual);
            }
            records.push(RenameRecord {
                original: original_py,
                renamed: new_py,
            });
        }
    }

    rename_keyword_members(decls);
    exclude_keyword_param_macros(decls);

    debug!("Renamed {} conflicting symbols", records.len());
    Ok(records)
}

fn append_underscore(kind: &mut DescKind) {
    match kind {
        DescKind::Struct { tag, .. } | DescKind::Enum { tag, .. } => tag.push('_'),
        DescKind::Constant { name, .. }
        | DescKind::Typedef { name, .. }
        | DescKind::Function { name, .. }
        | DescKind::Variable { name, .. }
        | DescKind::Macro { name, .. }
        | DescKind::Undef { name, .. } => name.push('_'),
    }
}

/// Struct member names live in a positional table, not a namespace, so
/// they only clash with keywords, and one underscore settles it.
fn rename_keyword_members(decls: &mut Declarations) {
    let ids: Vec<DescriptionId> = decls
        .iter()
        .filter(|(_, d)| matches!(d.kind, DescKind::Struct { .. }))
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        let casual = decls[id].casual_name();
        let mut renamed = Vec::new();
        if let DescKind::Struct {
            members: Some(members),
            ..
        } = &mut decls[id].kind
        {
            for (name, _) in members.iter_mut() {
                if let Some(name) = name {
                    if is_keyword(name) {
                        renamed.push(name.clone());
                        name.push('_');
                    }
                }
            }
        }
        for old in renamed {
            decls[id].warning(
                format!(
                    "Member '{old}' of {casual} has been renamed to '{old}_' because it \
                     has the same name as a Python keyword."
                ),
                Some(DiagClass::Rename),
            );
        }
    }
}

/// Macro parameters are not renamed; a keyword parameter excludes the
/// whole macro.
fn exclude_keyword_param_macros(decls: &mut Declarations) {
    let ids: Vec<DescriptionId> = decls
        .iter()
        .filter(|(_, d)| matches!(d.kind, DescKind::Macro { .. }))
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        let bad = match &decls[id].kind {
            DescKind::Macro {
                params: Some(params),
                ..
            } => params.iter().find(|p| is_keyword(p)).cloned(),
            _ => None,
        };
        if let Some(param) = bad {
            let casual = decls[id].casual_name();
            decls[id].error(
                format!(
                    "One of the params to {casual}, '{param}', has the same name as a \
                     Python keyword. {casual} will be excluded."
                ),
                Some(DiagClass::NameConflict),
            );
            decls[id].include_rule = IncludeRule::Never;
        }
    }
}
