//! Dependency graph construction.
//!
//! Walks the emission sequence, registers every description in the
//! namespace it declares into, and resolves the names its types and
//! expressions reference into requirement edges. Unresolved references
//! become errors on the description; whether those errors matter is
//! decided later, once inclusion is known.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use bindweave_decls::{DeclKind, Declarations, DescKind, Description, DescriptionId};
use bindweave_model::{
    collect_expr_info, collect_type_info, DiagClass, Diagnostic, TypeInfo, Variety,
};

use crate::options::ProcessOptions;

/// A namespace slot: either a description in the store or a name
/// satisfied externally by a linked module.
#[derive(Debug, Clone, Copy)]
enum Entry {
    /// Lookup succeeds without creating an edge.
    External,
    Desc(DescriptionId),
}

/// The four symbol namespaces references resolve against.
#[derive(Debug, Default)]
struct Namespaces {
    structs: HashMap<(Variety, String), Entry>,
    enums: HashMap<String, Entry>,
    typedefs: HashMap<String, Entry>,
    identifiers: HashMap<String, Entry>,
}

impl Namespaces {
    /// Pre-seed every table from the caller's linked symbol names.
    /// Plain names land in the typedef and identifier tables;
    /// `struct_<tag>` / `union_<tag>` / `enum_<tag>` spellings land in
    /// the matching tag table.
    fn seeded(linked_symbols: &BTreeSet<String>) -> Self {
        let mut ns = Namespaces::default();
        for name in linked_symbols {
            ns.typedefs.insert(name.clone(), Entry::External);
            ns.identifiers.insert(name.clone(), Entry::External);
            if let Some(tag) = name.strip_prefix("struct_") {
                ns.structs
                    .insert((Variety::Struct, tag.to_string()), Entry::External);
            } else if let Some(tag) = name.strip_prefix("union_") {
                ns.structs
                    .insert((Variety::Union, tag.to_string()), Entry::External);
            } else if let Some(tag) = name.strip_prefix("enum_") {
                ns.enums.insert(tag.to_string(), Entry::External);
            }
        }
        ns
    }

    /// Register one emission entry. First writer wins: a key is never
    /// overwritten, so duplicate declarations cannot steal references
    /// already resolved to the original.
    fn register(&mut self, decls: &Declarations, kind: DeclKind, id: DescriptionId) {
        match (kind, &decls[id].kind) {
            (DeclKind::Struct, DescKind::Struct { tag, variety, .. }) => {
                self.structs
                    .entry((*variety, tag.clone()))
                    .or_insert(Entry::Desc(id));
            }
            (DeclKind::Enum, DescKind::Enum { tag, .. }) => {
                self.enums.entry(tag.clone()).or_insert(Entry::Desc(id));
            }
            (DeclKind::Typedef, DescKind::Typedef { name, .. }) => {
                self.typedefs.entry(name.clone()).or_insert(Entry::Desc(id));
            }
            (
                DeclKind::Constant | DeclKind::Function | DeclKind::Variable | DeclKind::Macro,
                _,
            ) => {
                self.identifiers
                    .entry(decls[id].py_name())
                    .or_insert(Entry::Desc(id));
            }
            // Undef and struct-fields entries declare nothing.
            _ => {}
        }
    }
}

/// References gathered from one entry's roots, cloned out of the tree
/// so edges can be added while they are consumed.
#[derive(Debug, Default)]
struct RootInfo {
    structs: Vec<(Variety, String)>,
    enums: Vec<String>,
    typedefs: Vec<String>,
    identifiers: Vec<String>,
    errors: Vec<Diagnostic>,
}

impl RootInfo {
    fn from_walk(info: TypeInfo<'_>) -> Self {
        RootInfo {
            structs: info
                .structs
                .iter()
                .map(|s| (s.variety, s.tag.clone()))
                .collect(),
            enums: info.enums.iter().map(|e| e.tag.clone()).collect(),
            typedefs: info.typedefs.iter().map(|s| s.to_string()).collect(),
            identifiers: info.identifiers.iter().map(|s| s.to_string()).collect(),
            errors: info.errors.into_iter().cloned().collect(),
        }
    }
}

/// The roots owned by one emission entry. A struct or enum entry has
/// none: members belong to the fields entry and enumerator values to
/// their own constant descriptions.
fn gather_roots(desc: &Description, kind: DeclKind) -> RootInfo {
    let mut info = TypeInfo::default();
    match (kind, &desc.kind) {
        (DeclKind::Struct | DeclKind::Enum, _) => {}
        (
            DeclKind::StructFields,
            DescKind::Struct {
                members: Some(members),
                ..
            },
        ) => {
            for (_, ty) in members {
                info.absorb(collect_type_info(ty));
            }
        }
        (_, DescKind::Constant { value, .. }) => info.absorb(collect_expr_info(value)),
        (_, DescKind::Typedef { ty, .. } | DescKind::Variable { ty, .. }) => {
            info.absorb(collect_type_info(ty));
        }
        (
            _,
            DescKind::Function {
                restype, argtypes, ..
            },
        ) => {
            for ty in argtypes {
                info.absorb(collect_type_info(ty));
            }
            info.absorb(collect_type_info(restype));
        }
        (_, DescKind::Macro { body: Some(body), .. }) => info.absorb(collect_expr_info(body)),
        (_, DescKind::Undef { target, .. }) => info.absorb(collect_expr_info(target)),
        _ => {}
    }
    RootInfo::from_walk(info)
}

/// Resolve one entry's references into edges and errors.
fn resolve_entry(
    decls: &mut Declarations,
    ns: &Namespaces,
    opts: &ProcessOptions,
    kind: DeclKind,
    id: DescriptionId,
) {
    let info = gather_roots(&decls[id], kind);
    let casual = decls[id].casual_name();

    // Identity and shadowing context, cloned out so edges can be added
    // below without holding a borrow on the description.
    let (own_struct, own_enum, macro_params, undef_target) = match &decls[id].kind {
        DescKind::Struct { tag, variety, .. } => (Some((*variety, tag.clone())), None, None, None),
        DescKind::Enum { tag, .. } => (None, Some(tag.clone()), None, None),
        DescKind::Macro { params, .. } => (None, None, params.clone(), None),
        DescKind::Undef { name, .. } => (None, None, None, Some(name.clone())),
        _ => (None, None, None, None),
    };

    let mut errors = info.errors;
    let mut unresolved: Vec<String> = Vec::new();

    for (variety, tag) in &info.structs {
        // A struct may reference its own tag, directly or through its
        // fields entry; that never becomes an edge.
        if let Some((own_variety, own_tag)) = &own_struct {
            if own_variety == variety && own_tag == tag {
                continue;
            }
        }
        match ns.structs.get(&(*variety, tag.clone())) {
            Some(Entry::Desc(req)) => decls.add_requirement(id, *req),
            Some(Entry::External) => {}
            None => unresolved.push(format!("{} '{tag}'", variety.keyword())),
        }
    }

    for tag in &info.enums {
        if own_enum.as_deref() == Some(tag.as_str()) {
            continue;
        }
        match ns.enums.get(tag) {
            Some(Entry::Desc(req)) => decls.add_requirement(id, *req),
            Some(Entry::External) => {}
            None => unresolved.push(format!("enum '{tag}'")),
        }
    }

    for name in &info.typedefs {
        match ns.typedefs.get(name) {
            Some(Entry::Desc(req)) => decls.add_requirement(id, *req),
            Some(Entry::External) => {}
            None => unresolved.push(format!("typedef '{name}'")),
        }
    }

    for ident in &info.identifiers {
        // Macro parameters shadow the identifier namespace.
        if let Some(params) = &macro_params {
            if params.iter().any(|p| p == ident) {
                continue;
            }
        }
        if opts.include_undefs && kind == DeclKind::Undef {
            // An undef co-depends with the macro it removes: the undef
            // is emitted only with the macro, and the macro must pull
            // the undef along so the removal is not silently lost.
            let mut hit = None;
            if undef_target.as_deref() == Some(ident.as_str()) {
                if let Some(Entry::Desc(req)) = ns.identifiers.get(ident) {
                    decls.add_requirement(id, *req);
                    decls.add_requirement(*req, id);
                    hit = Some(*req);
                }
            }
            let is_macro = match hit {
                Some(req) => matches!(decls[req].kind, DescKind::Macro { .. }),
                None => false,
            };
            if !is_macro {
                unresolved.push(format!("identifier '{ident}'"));
            }
        } else {
            match ns.identifiers.get(ident) {
                Some(Entry::Desc(req)) => decls.add_requirement(id, *req),
                Some(Entry::External) => {}
                None => unresolved.push(format!("identifier '{ident}'")),
            }
        }
    }

    for u in unresolved {
        errors.push(Diagnostic::new(
            format!("{casual} depends on an unknown {u}."),
            Some(DiagClass::UnresolvedReference),
        ));
    }
    for diag in errors {
        decls[id].error(format!("{} {casual} will not be output", diag.message), diag.class);
    }
}

/// Build the requirement graph and transfer node errors onto their
/// descriptions.
///
/// Non-macro entries register and resolve interleaved, in emission
/// order. Macro entries register immediately but resolve only after the
/// full walk, because a macro body may reference macros declared later
/// in the input.
pub fn find_dependencies(decls: &mut Declarations, opts: &ProcessOptions) {
    let mut ns = Namespaces::seeded(&opts.linked_symbols);
    let entries = decls.output_order.clone();
    let mut deferred = Vec::new();

    for (kind, id) in &entries {
        ns.register(decls, *kind, *id);
        if *kind == DeclKind::Macro {
            deferred.push(*id);
        } else {
            resolve_entry(decls, &ns, opts, *kind, *id);
        }
    }
    for id in deferred {
        resolve_entry(decls, &ns, opts, DeclKind::Macro, id);
    }
    debug!(
        "Resolved dependencies for {} of {} descriptions",
        entries.len(),
        decls.len()
    );
}
