//! The declaration store.
//!
//! Descriptions live in an append-only arena and are addressed by
//! [`DescriptionId`]. Separately from the arena, `output_order` records
//! the sequence entries must take in generated output; a struct appears
//! there twice when its body is completed after a forward declaration,
//! once for the (possibly still opaque) type and once for the member
//! assignment.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::description::Description;

/// Index of a description in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DescriptionId(pub usize);

impl fmt::Display for DescriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output-order entry categories. `StructFields` marks the point where
/// a struct's member table is assigned, which may be later than where
/// the type itself is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Constant,
    Typedef,
    Struct,
    StructFields,
    Enum,
    Function,
    Variable,
    Macro,
    Undef,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKind::Constant => "constant",
            DeclKind::Typedef => "typedef",
            DeclKind::Struct => "struct",
            DeclKind::StructFields => "struct_fields",
            DeclKind::Enum => "enum",
            DeclKind::Function => "function",
            DeclKind::Variable => "variable",
            DeclKind::Macro => "macro",
            DeclKind::Undef => "undef",
        };
        write!(f, "{s}")
    }
}

/// Arena of descriptions plus the generated-output ordering.
#[derive(Debug, Default)]
pub struct Declarations {
    descs: Vec<Description>,
    /// Entries in the order they must be emitted. Not every arena entry
    /// appears here; bodyless macro constants exist only for lookup.
    pub output_order: Vec<(DeclKind, DescriptionId)>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a description, returning its id. Does not add an output
    /// entry; callers decide if and where the entry is emitted.
    pub fn push(&mut self, desc: Description) -> DescriptionId {
        let id = DescriptionId(self.descs.len());
        self.descs.push(desc);
        id
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    pub fn get(&self, id: DescriptionId) -> Option<&Description> {
        self.descs.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DescriptionId, &Description)> {
        self.descs
            .iter()
            .enumerate()
            .map(|(i, d)| (DescriptionId(i), d))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (DescriptionId, &mut Description)> {
        self.descs
            .iter_mut()
            .enumerate()
            .map(|(i, d)| (DescriptionId(i), d))
    }

    /// Record that `of` requires `on`, mirroring the edge into `on`'s
    /// dependents.
    pub fn add_requirement(&mut self, of: DescriptionId, on: DescriptionId) {
        self.descs[of.0].requirements.insert(on);
        self.descs[on.0].dependents.insert(of);
    }

    /// Whether anything survived resolution.
    pub fn any_included(&self) -> bool {
        self.descs.iter().any(|d| d.included)
    }

    /// The output entries whose descriptions were included, in order.
    pub fn included_output(&self) -> impl Iterator<Item = (DeclKind, DescriptionId)> + '_ {
        self.output_order
            .iter()
            .copied()
            .filter(|(_, id)| self[*id].included)
    }
}

impl Index<DescriptionId> for Declarations {
    type Output = Description;

    fn index(&self, id: DescriptionId) -> &Description {
        &self.descs[id.0]
    }
}

impl IndexMut<DescriptionId> for Declarations {
    fn index_mut(&mut self, id: DescriptionId) -> &mut Description {
        &mut self.descs[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::DescKind;
    use bindweave_model::Expr;

    fn constant(name: &str) -> Description {
        Description::new(
            DescKind::Constant {
                name: name.into(),
                value: Expr::int(0),
            },
            None,
        )
    }

    #[test]
    fn requirements_are_mirrored_as_dependents() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A"));
        let b = decls.push(constant("B"));
        decls.add_requirement(a, b);

        assert!(decls[a].requirements.contains(&b));
        assert!(decls[b].dependents.contains(&a));
        assert!(decls[b].requirements.is_empty());
    }

    #[test]
    fn included_output_filters_but_keeps_order() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A"));
        let b = decls.push(constant("B"));
        let c = decls.push(constant("C"));
        decls.output_order.push((DeclKind::Constant, a));
        decls.output_order.push((DeclKind::Constant, b));
        decls.output_order.push((DeclKind::Constant, c));

        decls[a].included = true;
        decls[c].included = true;

        let names: Vec<_> = decls
            .included_output()
            .map(|(_, id)| decls[id].py_name())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(decls.any_included());
    }
}
