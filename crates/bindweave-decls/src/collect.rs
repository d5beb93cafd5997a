//! Declaration intake.
//!
//! The upstream C parser reports declarations one at a time; the
//! collector turns them into [`Description`]s in a [`Declarations`]
//! store. Three behaviors live here rather than in the store itself:
//!
//! - Composite definitions embedded in other declarations are hoisted
//!   into their own descriptions, nested ones before the types that
//!   contain them, so output order never references an undefined type.
//! - An opaque sighting of a tag and a later transparent one merge into
//!   a single description, completed in place.
//! - Macro definitions are buffered and replayed after everything else,
//!   because a macro body may reference symbols declared after it.
//!
//! `NULL` is seeded as a built-in constant; C headers use it freely and
//! no header is obliged to define it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use bindweave_model::ctype::Attributes;
use bindweave_model::traverse::{walk_expr, walk_type, TypeVisitor};
use bindweave_model::{
    remove_function_pointer, CEnumType, CStructType, CType, DiagClass, Expr, Location, Value,
    Variety,
};

use crate::description::{DescKind, Description};
use crate::store::{DeclKind, Declarations, DescriptionId};

/// Body of a parsed `#define`.
#[derive(Debug, Clone)]
pub enum MacroBody {
    /// The definition is an expression, the common case.
    Expr(Expr),
    /// The definition names a type, making the macro a type alias.
    Type(CType),
}

#[derive(Debug)]
enum SavedMacro {
    Define {
        name: String,
        params: Option<Vec<String>>,
        body: Option<MacroBody>,
        src: Location,
    },
    Undef {
        name: String,
        src: Location,
    },
}

/// Builds the declaration store from parser callbacks.
#[derive(Debug)]
pub struct DeclarationCollector {
    decls: Declarations,
    saved_macros: Vec<SavedMacro>,
    seen_structs: HashSet<(Variety, String)>,
    /// Tags seen only in opaque form so far, by description.
    opaque_structs: HashMap<(Variety, String), DescriptionId>,
    seen_enums: HashSet<String>,
    opaque_enums: HashMap<String, DescriptionId>,
}

impl Default for DeclarationCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationCollector {
    pub fn new() -> Self {
        let mut decls = Declarations::new();
        let null = decls.push(Description::new(
            DescKind::Constant {
                name: "NULL".into(),
                value: Expr::null(),
            },
            Some(Location::builtin()),
        ));
        decls.output_order.push((DeclKind::Constant, null));
        Self {
            decls,
            saved_macros: Vec::new(),
            seen_structs: HashSet::new(),
            opaque_structs: HashMap::new(),
            seen_enums: HashSet::new(),
            opaque_enums: HashMap::new(),
        }
    }

    /// Replay deferred macros and hand over the finished store.
    pub fn finish(mut self) -> Declarations {
        debug!("Replaying {} deferred macros", self.saved_macros.len());
        for saved in std::mem::take(&mut self.saved_macros) {
            match saved {
                SavedMacro::Define {
                    name,
                    params,
                    body,
                    src,
                } => self.handle_macro(name, params, body, src),
                SavedMacro::Undef { name, src } => self.handle_undef(name, src),
            }
        }
        self.decls
    }

    // === Declaration intake ===

    pub fn typedef(&mut self, name: impl Into<String>, ty: CType, src: Location) {
        let ty = remove_function_pointer(ty);
        walk_type(&ty, self);
        let id = self.decls.push(Description::new(
            DescKind::Typedef {
                name: name.into(),
                ty,
            },
            Some(src),
        ));
        self.decls.output_order.push((DeclKind::Typedef, id));
    }

    pub fn function(
        &mut self,
        name: impl Into<String>,
        restype: CType,
        argtypes: Vec<CType>,
        variadic: bool,
        attributes: Attributes,
        src: Location,
    ) {
        let argtypes: Vec<CType> = argtypes.into_iter().map(remove_function_pointer).collect();
        walk_type(&restype, self);
        for arg in &argtypes {
            walk_type(arg, self);
        }
        let name = name.into();
        let id = self.decls.push(Description::new(
            DescKind::Function {
                c_name: name.clone(),
                name,
                restype,
                argtypes,
                variadic,
                attributes,
            },
            Some(src),
        ));
        self.decls.output_order.push((DeclKind::Function, id));
    }

    pub fn variable(&mut self, name: impl Into<String>, ty: CType, src: Location) {
        walk_type(&ty, self);
        let name = name.into();
        let id = self.decls.push(Description::new(
            DescKind::Variable {
                c_name: name.clone(),
                name,
                ty,
            },
            Some(src),
        ));
        self.decls.output_order.push((DeclKind::Variable, id));
    }

    /// A struct or union declared at top level.
    pub fn structure(&mut self, def: &CStructType, src: Location) {
        self.handle_struct(def, src);
    }

    /// An enum declared at top level.
    pub fn enumeration(&mut self, def: &CEnumType, src: Location) {
        self.handle_enum(def, src);
    }

    // === Macro intake (deferred) ===

    /// A parsed `#define`. Buffered until [`finish`](Self::finish): the
    /// body may use names that only appear later in the input.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        params: Option<Vec<String>>,
        body: Option<MacroBody>,
        src: Location,
    ) {
        self.saved_macros.push(SavedMacro::Define {
            name: name.into(),
            params,
            body,
            src,
        });
    }

    /// A `#undef`. Buffered with the defines to keep directive order.
    pub fn undefine(&mut self, name: impl Into<String>, src: Location) {
        self.saved_macros.push(SavedMacro::Undef {
            name: name.into(),
            src,
        });
    }

    /// A `#define` the upstream parser gave up on. Recorded right away
    /// with the reconstructed directive text; the error keeps it out of
    /// output while still making it visible in diagnostics.
    pub fn unparseable_define(
        &mut self,
        name: &str,
        params: Option<Vec<String>>,
        tokens: &[String],
        src: Location,
    ) {
        let original = match &params {
            Some(params) if !params.is_empty() => {
                format!("#define {name}({}) {}", params.join(","), tokens.join(" "))
            }
            _ => format!("#define {name} {}", tokens.join(" ")),
        };
        let mut desc = Description::new(
            DescKind::Macro {
                name: name.into(),
                params,
                body: None,
            },
            Some(src),
        );
        desc.error(
            format!("Could not parse macro '{original}'"),
            Some(DiagClass::Macro),
        );
        let id = self.decls.push(desc);
        self.decls.output_order.push((DeclKind::Macro, id));
    }

    // === Composite handling ===

    fn handle_struct(&mut self, def: &CStructType, src: Location) {
        let key = (def.variety, def.tag.clone());
        if self.seen_structs.contains(&key) {
            return;
        }

        match &def.members {
            None => {
                if !self.opaque_structs.contains_key(&key) {
                    let id = self.decls.push(Description::new(
                        DescKind::Struct {
                            tag: def.tag.clone(),
                            variety: def.variety,
                            attributes: def.attributes.clone(),
                            members: None,
                            anonymous: def.anonymous,
                        },
                        Some(src),
                    ));
                    self.opaque_structs.insert(key, id);
                    self.decls.output_order.push((DeclKind::Struct, id));
                }
            }
            Some(members) => {
                // Nested definitions first, so they precede this one.
                for (_, member_ty) in members {
                    walk_type(member_ty, self);
                }

                if let Some(id) = self.opaque_structs.remove(&key) {
                    let desc = &mut self.decls[id];
                    desc.src = def.src.clone().or(Some(src));
                    if let DescKind::Struct {
                        members: slot @ None,
                        ..
                    } = &mut desc.kind
                    {
                        *slot = Some(members.clone());
                    }
                    self.decls.output_order.push((DeclKind::StructFields, id));
                } else {
                    let id = self.decls.push(Description::new(
                        DescKind::Struct {
                            tag: def.tag.clone(),
                            variety: def.variety,
                            attributes: def.attributes.clone(),
                            members: Some(members.clone()),
                            anonymous: def.anonymous,
                        },
                        Some(src),
                    ));
                    self.decls.output_order.push((DeclKind::Struct, id));
                    self.decls.output_order.push((DeclKind::StructFields, id));
                }
                self.seen_structs.insert(key);
            }
        }
    }

    fn handle_enum(&mut self, def: &CEnumType, src: Location) {
        if self.seen_enums.contains(&def.tag) {
            return;
        }

        match &def.enumerators {
            None => {
                if !self.opaque_enums.contains_key(&def.tag) {
                    let id = self.decls.push(Description::new(
                        DescKind::Enum {
                            tag: def.tag.clone(),
                            enumerators: None,
                            anonymous: def.anonymous,
                        },
                        Some(src),
                    ));
                    self.opaque_enums.insert(def.tag.clone(), id);
                    self.decls.output_order.push((DeclKind::Enum, id));
                }
            }
            Some(enumerators) => {
                if let Some(id) = self.opaque_enums.remove(&def.tag) {
                    let desc = &mut self.decls[id];
                    desc.src = def.src.clone().or(Some(src.clone()));
                    if let DescKind::Enum {
                        enumerators: slot @ None,
                        ..
                    } = &mut desc.kind
                    {
                        *slot = Some(enumerators.clone());
                    }
                    // The original entry still marks where the enum is
                    // emitted; no second entry is needed.
                } else {
                    let id = self.decls.push(Description::new(
                        DescKind::Enum {
                            tag: def.tag.clone(),
                            enumerators: Some(enumerators.clone()),
                            anonymous: def.anonymous,
                        },
                        Some(src.clone()),
                    ));
                    self.decls.output_order.push((DeclKind::Enum, id));
                }
                self.seen_enums.insert(def.tag.clone());

                // Each enumerator also binds a plain constant.
                for (name, value) in enumerators {
                    let id = self.decls.push(Description::new(
                        DescKind::Constant {
                            name: name.clone(),
                            value: value.clone(),
                        },
                        Some(src.clone()),
                    ));
                    self.decls.output_order.push((DeclKind::Constant, id));
                }
            }
        }
    }

    // === Deferred macro replay ===

    fn handle_macro(
        &mut self,
        name: String,
        params: Option<Vec<String>>,
        body: Option<MacroBody>,
        src: Location,
    ) {
        let body = match body {
            // A bodyless define is truthy in conditionals but has no
            // output form; keep it findable without emitting it.
            None => {
                self.decls.push(Description::new(
                    DescKind::Constant {
                        name,
                        value: Expr::constant(Value::Bool(true)),
                    },
                    Some(src),
                ));
                return;
            }
            Some(body) => body,
        };

        match body {
            MacroBody::Type(ty) => {
                walk_type(&ty, self);
                if params.as_ref().is_some_and(|p| !p.is_empty()) {
                    let mut desc = Description::new(
                        DescKind::Macro {
                            name,
                            params: None,
                            body: None,
                        },
                        Some(src),
                    );
                    desc.error(
                        format!(
                            "{} has parameters but evaluates to a type. This is not supported.",
                            desc.casual_name()
                        ),
                        Some(DiagClass::Macro),
                    );
                    let id = self.decls.push(desc);
                    self.decls.output_order.push((DeclKind::Macro, id));
                } else {
                    let id = self.decls.push(Description::new(
                        DescKind::Typedef { name, ty },
                        Some(src),
                    ));
                    self.decls.output_order.push((DeclKind::Typedef, id));
                }
            }
            MacroBody::Expr(expr) => {
                walk_expr(&expr, self);
                let id = self.decls.push(Description::new(
                    DescKind::Macro {
                        name,
                        params,
                        body: Some(expr),
                    },
                    Some(src),
                ));
                self.decls.output_order.push((DeclKind::Macro, id));
            }
        }
    }

    fn handle_undef(&mut self, name: String, src: Location) {
        let id = self.decls.push(Description::new(
            DescKind::Undef {
                target: Expr::ident(name.clone()),
                name,
            },
            Some(src),
        ));
        self.decls.output_order.push((DeclKind::Undef, id));
    }
}

impl<'a> TypeVisitor<'a> for DeclarationCollector {
    fn visit_struct(&mut self, def: &'a CStructType) {
        let src = def.src.clone().unwrap_or_else(Location::builtin);
        self.handle_struct(def, src);
    }

    fn visit_enum(&mut self, def: &'a CEnumType) {
        let src = def.src.clone().unwrap_or_else(Location::builtin);
        self.handle_enum(def, src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::IncludeRule;

    fn loc(line: u32) -> Location {
        Location::new("test.h", line)
    }

    fn order_names(decls: &Declarations) -> Vec<(DeclKind, String)> {
        decls
            .output_order
            .iter()
            .map(|&(kind, id)| (kind, decls[id].py_name()))
            .collect()
    }

    #[test]
    fn null_is_seeded_first() {
        let decls = DeclarationCollector::new().finish();
        assert_eq!(decls.len(), 1);
        assert_eq!(
            order_names(&decls),
            vec![(DeclKind::Constant, "NULL".to_string())]
        );
        let (_, null) = decls.iter().next().unwrap();
        assert_eq!(null.src.as_ref().unwrap().file, "<built-in>");
    }

    #[test]
    fn typedefs_hoist_embedded_definitions() {
        let mut c = DeclarationCollector::new();
        let def = CStructType::new(
            Variety::Struct,
            "point",
            Attributes::new(),
            Some(vec![
                (Some("x".into()), CType::int()),
                (Some("y".into()), CType::int()),
            ]),
            Some(loc(3)),
        );
        c.typedef("point_t", CType::structure(def), loc(3));
        let decls = c.finish();

        assert_eq!(
            order_names(&decls),
            vec![
                (DeclKind::Constant, "NULL".into()),
                (DeclKind::Struct, "struct_point".into()),
                (DeclKind::StructFields, "struct_point".into()),
                (DeclKind::Typedef, "point_t".into()),
            ]
        );
    }

    #[test]
    fn nested_definitions_precede_their_container() {
        let inner = CStructType::new(
            Variety::Struct,
            "inner",
            Attributes::new(),
            Some(vec![(Some("v".into()), CType::int())]),
            Some(loc(1)),
        );
        let outer = CStructType::new(
            Variety::Struct,
            "outer",
            Attributes::new(),
            Some(vec![(Some("i".into()), CType::structure(inner))]),
            Some(loc(2)),
        );

        let mut c = DeclarationCollector::new();
        c.structure(&outer, loc(2));
        let decls = c.finish();

        let names: Vec<_> = order_names(&decls)
            .into_iter()
            .filter(|(k, _)| *k == DeclKind::Struct)
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["struct_inner", "struct_outer"]);
    }

    #[test]
    fn opaque_then_transparent_completes_in_place() {
        let mut c = DeclarationCollector::new();
        c.structure(&CStructType::reference(Variety::Struct, "node"), loc(1));
        let full = CStructType::new(
            Variety::Struct,
            "node",
            Attributes::new(),
            Some(vec![(
                Some("next".into()),
                CType::pointer(CType::structure(CStructType::reference(
                    Variety::Struct,
                    "node",
                ))),
            )]),
            Some(loc(9)),
        );
        c.structure(&full, loc(9));
        let decls = c.finish();

        // One description, introduced where the forward declaration was,
        // with the member assignment where the body appeared.
        assert_eq!(decls.len(), 2); // NULL + the struct
        let entries: Vec<_> = decls
            .output_order
            .iter()
            .filter(|(_, id)| decls[*id].py_name() == "struct_node")
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, DeclKind::Struct);
        assert_eq!(entries[1].0, DeclKind::StructFields);
        assert_eq!(entries[0].1, entries[1].1);

        let desc = &decls[entries[0].1];
        match &desc.kind {
            DescKind::Struct { members, .. } => assert!(members.is_some()),
            other => panic!("expected struct, got {other:?}"),
        }
        assert_eq!(desc.src.as_ref().unwrap().line, 9);
    }

    #[test]
    fn duplicate_definitions_are_ignored() {
        let def = CStructType::new(
            Variety::Union,
            "u",
            Attributes::new(),
            Some(vec![(Some("a".into()), CType::int())]),
            Some(loc(1)),
        );
        let mut c = DeclarationCollector::new();
        c.structure(&def, loc(1));
        c.structure(&def, loc(8));
        let decls = c.finish();
        assert_eq!(decls.len(), 2); // NULL + one union
    }

    #[test]
    fn enums_bind_enumerator_constants() {
        let def = CEnumType::from_declaration(
            "color",
            vec![("RED".into(), None), ("GREEN".into(), None)],
            Some(loc(4)),
        );
        let mut c = DeclarationCollector::new();
        c.enumeration(&def, loc(4));
        let decls = c.finish();

        assert_eq!(
            order_names(&decls),
            vec![
                (DeclKind::Constant, "NULL".into()),
                (DeclKind::Enum, "enum_color".into()),
                (DeclKind::Constant, "RED".into()),
                (DeclKind::Constant, "GREEN".into()),
            ]
        );
    }

    #[test]
    fn opaque_enum_completion_adds_no_second_entry() {
        let mut c = DeclarationCollector::new();
        c.enumeration(&CEnumType::new("state", None, None), loc(1));
        let full = CEnumType::from_declaration(
            "state",
            vec![("ON".into(), None)],
            Some(loc(7)),
        );
        c.enumeration(&full, loc(7));
        let decls = c.finish();

        let enum_entries = decls
            .output_order
            .iter()
            .filter(|(k, _)| *k == DeclKind::Enum)
            .count();
        assert_eq!(enum_entries, 1);
        // The enumerator constant still lands after the enum.
        assert_eq!(
            order_names(&decls).last().unwrap().1,
            "ON".to_string()
        );
    }

    #[test]
    fn macros_replay_after_other_declarations() {
        let mut c = DeclarationCollector::new();
        c.define(
            "LIMIT",
            None,
            Some(MacroBody::Expr(Expr::ident("real_limit"))),
            loc(1),
        );
        c.variable("real_limit", CType::int(), loc(5));
        let decls = c.finish();

        assert_eq!(
            order_names(&decls),
            vec![
                (DeclKind::Constant, "NULL".into()),
                (DeclKind::Variable, "real_limit".into()),
                (DeclKind::Macro, "LIMIT".into()),
            ]
        );
    }

    #[test]
    fn bodyless_defines_are_findable_but_not_emitted() {
        let mut c = DeclarationCollector::new();
        c.define("HAVE_FEATURE", None, None, loc(2));
        let decls = c.finish();

        assert_eq!(decls.len(), 2);
        assert_eq!(decls.output_order.len(), 1); // NULL only
        let hidden = decls
            .iter()
            .find(|(_, d)| d.py_name() == "HAVE_FEATURE")
            .map(|(_, d)| d)
            .unwrap();
        match &hidden.kind {
            DescKind::Constant { value, .. } => {
                assert_eq!(value.render(false).unwrap(), "True");
            }
            other => panic!("expected constant, got {other:?}"),
        }
    }

    #[test]
    fn type_valued_defines_become_typedefs() {
        let mut c = DeclarationCollector::new();
        c.define(
            "HANDLE",
            None,
            Some(MacroBody::Type(CType::pointer(CType::void()))),
            loc(3),
        );
        let decls = c.finish();
        let last = order_names(&decls).last().cloned().unwrap();
        assert_eq!(last, (DeclKind::Typedef, "HANDLE".into()));
    }

    #[test]
    fn parameterized_type_defines_are_rejected() {
        let mut c = DeclarationCollector::new();
        c.define(
            "MAKE_T",
            Some(vec!["x".into()]),
            Some(MacroBody::Type(CType::int())),
            loc(3),
        );
        let decls = c.finish();
        let (_, desc) = decls
            .iter()
            .find(|(_, d)| d.py_name() == "MAKE_T")
            .unwrap();
        assert_eq!(desc.errors.len(), 1);
        assert!(desc.errors[0]
            .message
            .contains("has parameters but evaluates to a type"));
    }

    #[test]
    fn unparseable_defines_keep_the_directive_text() {
        let mut c = DeclarationCollector::new();
        c.unparseable_define(
            "SWAP",
            Some(vec!["a".into(), "b".into()]),
            &["do".into(), "{".into(), "}".into()],
            loc(11),
        );
        let decls = c.finish();
        let (_, desc) = decls.iter().find(|(_, d)| d.py_name() == "SWAP").unwrap();
        assert_eq!(
            desc.errors[0].message,
            "Could not parse macro '#define SWAP(a,b) do { }'"
        );
    }

    #[test]
    fn undefs_are_deferred_with_defines() {
        let mut c = DeclarationCollector::new();
        c.define(
            "FOO",
            None,
            Some(MacroBody::Expr(Expr::int(1))),
            loc(1),
        );
        c.undefine("FOO", loc(2));
        let decls = c.finish();

        let last = decls.output_order.last().unwrap();
        let desc = &decls[last.1];
        assert_eq!(desc.py_name(), "#undef:FOO");
        assert_eq!(desc.include_rule, IncludeRule::IfNeeded);
    }

    #[test]
    fn macro_bodies_hoist_types_they_mention() {
        let mut c = DeclarationCollector::new();
        c.define(
            "ITEM_SIZE",
            None,
            Some(MacroBody::Expr(Expr::sizeof_type(CType::structure(
                CStructType::reference(Variety::Struct, "item"),
            )))),
            loc(6),
        );
        let decls = c.finish();
        assert_eq!(
            order_names(&decls),
            vec![
                (DeclKind::Constant, "NULL".into()),
                (DeclKind::Struct, "struct_item".into()),
                (DeclKind::Macro, "ITEM_SIZE".into()),
            ]
        );
    }
}
