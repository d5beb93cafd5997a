//! C type nodes.
//!
//! Every node renders to a string that, evaluated in the generated
//! wrapper at runtime, produces a ctypes type object. An array of four
//! ints renders as `c_int * int(4)`, a pointer to it as
//! `POINTER(c_int * int(4))`, and so on.
//!
//! Nodes are plain data: the upstream parser builds them, attaches
//! diagnostics where it had to give up, and hands them over. Traversal
//! and dependency extraction live in [`crate::traverse`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::diag::{DiagClass, Diagnostic};
use crate::error::Result;
use crate::expr::Expr;
use crate::location::Location;

// === Anonymous tags ===

static NEXT_ANON_TAG: AtomicU64 = AtomicU64::new(0);

/// Next synthetic tag number for an anonymous struct, union, or enum.
///
/// One process-wide monotone counter serves all composite kinds. Values
/// are never reused, so synthetic tags stay globally unique across a run
/// even when the input spans several files.
fn next_anon_tag() -> u64 {
    NEXT_ANON_TAG.fetch_add(1, Ordering::Relaxed) + 1
}

// === Builtin type map ===

/// Target name for a builtin C type, keyed by base name, signedness, and
/// the `long` count (`-1` stands for `short`).
///
/// Unknown combinations return `None`; rendering falls back to the bare
/// C name for those.
pub fn ctypes_name(name: &str, signed: bool, longs: i8) -> Option<&'static str> {
    Some(match (name, signed, longs) {
        ("void", true, 0) => "None",
        ("int", true, 0) => "c_int",
        ("int", false, 0) => "c_uint",
        ("int", true, 1) => "c_long",
        ("int", false, 1) => "c_ulong",
        ("int", true, 2) => "c_longlong",
        ("int", false, 2) => "c_ulonglong",
        ("int", true, -1) => "c_short",
        ("int", false, -1) => "c_ushort",
        ("char", true, 0) => "c_char",
        ("char", false, 0) => "c_ubyte",
        ("short", true, 0) => "c_short",
        ("short", false, 0) => "c_ushort",
        ("float", true, 0) => "c_float",
        ("double", true, 0) => "c_double",
        ("double", true, 1) => "c_longdouble",
        ("_Bool", true, 0) => "c_bool",
        ("int8_t" | "__int8_t" | "__int8", true, 0) => "c_int8",
        ("int16_t" | "__int16_t" | "__int16", true, 0) => "c_int16",
        ("int32_t" | "__int32_t" | "__int32", true, 0) => "c_int32",
        ("int64_t" | "__int64_t" | "__int64", true, 0) => "c_int64",
        ("uint8_t" | "__uint8_t" | "__uint8", false, 0) => "c_uint8",
        ("uint16_t" | "__uint16_t" | "__uint16", false, 0) => "c_uint16",
        ("uint32_t" | "__uint32_t" | "__uint32", false, 0) => "c_uint32",
        ("uint64_t" | "__uint64_t" | "__uint64", false, 0) => "c_uint64",
        ("size_t", true, 0) => "c_size_t",
        ("ssize_t", true, 0) | ("ptrdiff_t", true, 0) => "c_ssize_t",
        ("wchar_t", true, 0) => "c_wchar",
        ("va_list", true, 0) => "c_void_p",
        ("off64_t", true, 0) => "c_int64",
        _ => return None,
    })
}

// === Composite definitions ===

/// Struct-or-union discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variety {
    Struct,
    Union,
}

impl Variety {
    pub fn keyword(&self) -> &'static str {
        match self {
            Variety::Struct => "struct",
            Variety::Union => "union",
        }
    }

    /// Capitalized form for human-facing names.
    pub fn capitalized(&self) -> &'static str {
        match self {
            Variety::Struct => "Struct",
            Variety::Union => "Union",
        }
    }
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A GCC-style attribute value (`packed`, `aligned(16)`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Int(i64),
    List(Vec<i64>),
}

/// Attributes applied to a composite or function declaration.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A struct or union, either a bare reference (`members` unset, opaque)
/// or a full definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CStructType {
    pub variety: Variety,
    pub tag: String,
    pub attributes: Attributes,
    /// `None` while only a forward declaration has been seen. Member
    /// names may be `None` for anonymous nested fields.
    pub members: Option<Vec<(Option<String>, CType)>>,
    pub anonymous: bool,
    pub src: Option<Location>,
}

impl CStructType {
    /// A tagless definition is anonymous and receives a synthetic
    /// `anon_<n>` tag.
    pub fn new(
        variety: Variety,
        tag: impl Into<String>,
        attributes: Attributes,
        members: Option<Vec<(Option<String>, CType)>>,
        src: Option<Location>,
    ) -> Self {
        let mut tag = tag.into();
        let anonymous = tag.is_empty();
        if anonymous {
            tag = format!("anon_{}", next_anon_tag());
        }
        Self {
            variety,
            tag,
            attributes,
            members,
            anonymous,
            src,
        }
    }

    /// Bare reference to a tag, with no body.
    pub fn reference(variety: Variety, tag: impl Into<String>) -> Self {
        Self::new(variety, tag, Attributes::new(), None, None)
    }

    pub fn opaque(&self) -> bool {
        self.members.is_none()
    }

    pub fn render(&self) -> String {
        format!("{}_{}", self.variety.keyword(), self.tag)
    }
}

/// An enum, either a bare reference or a full definition with its
/// enumerators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CEnumType {
    pub tag: String,
    pub enumerators: Option<Vec<(String, Expr)>>,
    pub anonymous: bool,
    pub src: Option<Location>,
}

impl CEnumType {
    pub fn new(
        tag: impl Into<String>,
        enumerators: Option<Vec<(String, Expr)>>,
        src: Option<Location>,
    ) -> Self {
        let mut tag = tag.into();
        let anonymous = tag.is_empty();
        if anonymous {
            tag = format!("anon_{}", next_anon_tag());
        }
        Self {
            tag,
            enumerators,
            anonymous,
            src,
        }
    }

    /// Build a definition from declared enumerators where values may be
    /// omitted: the first defaults to zero and every later one to the
    /// previous enumerator plus one.
    pub fn from_declaration(
        tag: impl Into<String>,
        declared: Vec<(String, Option<Expr>)>,
        src: Option<Location>,
    ) -> Self {
        let mut enumerators = Vec::with_capacity(declared.len());
        let mut last_name: Option<String> = None;
        for (name, value) in declared {
            let value = match value {
                Some(v) => v,
                None => match &last_name {
                    Some(prev) => Expr::binary(
                        crate::expr::BinaryOp::Add,
                        Expr::ident(prev.clone()),
                        Expr::int(1),
                    ),
                    None => Expr::int(0),
                },
            };
            last_name = Some(name.clone());
            enumerators.push((name, value));
        }
        Self::new(tag, Some(enumerators), src)
    }

    pub fn opaque(&self) -> bool {
        self.enumerators.is_none()
    }

    pub fn render(&self) -> String {
        format!("enum_{}", self.tag)
    }
}

// === Types ===

/// A C type: the kind plus any diagnostics the upstream parser attached
/// to this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CType {
    pub kind: CTypeKind,
    pub errors: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CTypeKind {
    /// A builtin type; `longs` counts `long` specifiers and is `-1` for
    /// `short`.
    Simple {
        name: String,
        signed: bool,
        longs: i8,
    },
    /// A name the target runtime defines itself (`String`, `WideString`).
    Special(String),
    /// Reference to a named typedef.
    Typedef(String),
    /// A bitfield over an integer base type.
    Bitfield { base: Box<CType>, width: Box<Expr> },
    Pointer {
        target: Box<CType>,
        qualifiers: Vec<String>,
    },
    /// An array; without a count it is equivalent to a pointer.
    Array {
        base: Box<CType>,
        count: Option<Box<Expr>>,
    },
    Function {
        restype: Box<CType>,
        argtypes: Vec<CType>,
        variadic: bool,
        attributes: Attributes,
    },
    Struct(CStructType),
    Enum(CEnumType),
}

impl CType {
    pub fn new(kind: CTypeKind) -> Self {
        Self {
            kind,
            errors: Vec::new(),
        }
    }

    pub fn simple(name: impl Into<String>, signed: bool, longs: i8) -> Self {
        Self::new(CTypeKind::Simple {
            name: name.into(),
            signed,
            longs,
        })
    }

    pub fn void() -> Self {
        Self::simple("void", true, 0)
    }

    pub fn int() -> Self {
        Self::simple("int", true, 0)
    }

    pub fn uint() -> Self {
        Self::simple("int", false, 0)
    }

    pub fn special(name: impl Into<String>) -> Self {
        Self::new(CTypeKind::Special(name.into()))
    }

    pub fn typedef_ref(name: impl Into<String>) -> Self {
        Self::new(CTypeKind::Typedef(name.into()))
    }

    pub fn bitfield(base: CType, width: Expr) -> Self {
        Self::new(CTypeKind::Bitfield {
            base: Box::new(base),
            width: Box::new(width),
        })
    }

    pub fn pointer(target: CType) -> Self {
        Self::new(CTypeKind::Pointer {
            target: Box::new(target),
            qualifiers: Vec::new(),
        })
    }

    pub fn array(base: CType, count: Option<Expr>) -> Self {
        Self::new(CTypeKind::Array {
            base: Box::new(base),
            count: count.map(Box::new),
        })
    }

    /// Function type; every argument is function-pointer normalized at
    /// construction.
    pub fn function(restype: CType, argtypes: Vec<CType>, variadic: bool) -> Self {
        Self::new(CTypeKind::Function {
            restype: Box::new(restype),
            argtypes: argtypes.into_iter().map(remove_function_pointer).collect(),
            variadic,
            attributes: Attributes::new(),
        })
    }

    pub fn structure(def: CStructType) -> Self {
        Self::new(CTypeKind::Struct(def))
    }

    pub fn enumeration(def: CEnumType) -> Self {
        Self::new(CTypeKind::Enum(def))
    }

    /// Attach a diagnostic to this node.
    pub fn error(&mut self, message: impl Into<String>, class: Option<DiagClass>) {
        self.errors.push(Diagnostic::new(message, class));
    }

    /// Target-runtime source text for this type.
    ///
    /// Fails only when an expression embedded in the type (an array
    /// count) cannot be rendered.
    pub fn render(&self) -> Result<String> {
        Ok(match &self.kind {
            CTypeKind::Simple {
                name,
                signed,
                longs,
            } => ctypes_name(name, *signed, *longs)
                .map(str::to_owned)
                .unwrap_or_else(|| name.clone()),
            CTypeKind::Special(name) => name.clone(),
            CTypeKind::Typedef(name) => name.clone(),
            CTypeKind::Bitfield { base, .. } => base.render()?,
            CTypeKind::Pointer { target, .. } => format!("POINTER({})", target.render()?),
            CTypeKind::Array { base, count: None } => {
                // In a parameter position an unsized array is a pointer.
                format!("POINTER({})", base.render()?)
            }
            CTypeKind::Array {
                base,
                count: Some(count),
            } => {
                let count = count.render(false)?;
                if matches!(base.kind, CTypeKind::Array { .. }) {
                    format!("({}) * int({count})", base.render()?)
                } else {
                    format!("{} * int({count})", base.render()?)
                }
            }
            CTypeKind::Function {
                restype, argtypes, ..
            } => {
                let args = argtypes
                    .iter()
                    .map(|a| a.render())
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("CFUNCTYPE({}, {args})", restype.render()?)
            }
            CTypeKind::Struct(def) => def.render(),
            CTypeKind::Enum(def) => def.render(),
        })
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => write!(f, "{text}"),
            Err(_) => write!(f, "<unrenderable type>"),
        }
    }
}

/// Strip one level of indirection from function pointers, recursing
/// through pointer chains.
///
/// A typedef'd or parameter-position function pointer is modeled at one
/// fewer pointer depth than written, so `void (*)(int)` arrives here as
/// pointer-to-function and leaves as the bare function type.
pub fn remove_function_pointer(t: CType) -> CType {
    match t.kind {
        CTypeKind::Pointer { target, qualifiers } => {
            if matches!(target.kind, CTypeKind::Function { .. }) {
                *target
            } else {
                CType {
                    kind: CTypeKind::Pointer {
                        target: Box::new(remove_function_pointer(*target)),
                        qualifiers,
                    },
                    errors: t.errors,
                }
            }
        }
        _ => t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_types_use_the_builtin_map() {
        assert_eq!(CType::int().render().unwrap(), "c_int");
        assert_eq!(CType::uint().render().unwrap(), "c_uint");
        assert_eq!(CType::void().render().unwrap(), "None");
        assert_eq!(CType::simple("int", true, 2).render().unwrap(), "c_longlong");
        assert_eq!(CType::simple("int", true, -1).render().unwrap(), "c_short");
        assert_eq!(CType::simple("size_t", true, 0).render().unwrap(), "c_size_t");
        assert_eq!(CType::simple("double", true, 1).render().unwrap(), "c_longdouble");
    }

    #[test]
    fn unknown_simple_renders_bare_name() {
        assert_eq!(
            CType::simple("__builtin_va_list", true, 0).render().unwrap(),
            "__builtin_va_list"
        );
    }

    #[test]
    fn pointers_and_arrays_render() {
        let p = CType::pointer(CType::int());
        assert_eq!(p.render().unwrap(), "POINTER(c_int)");

        let a = CType::array(CType::int(), Some(Expr::int(4)));
        assert_eq!(a.render().unwrap(), "c_int * int(4)");

        let r#unsized = CType::array(CType::int(), None);
        assert_eq!(r#unsized.render().unwrap(), "POINTER(c_int)");
    }

    #[test]
    fn nested_arrays_parenthesize_the_base() {
        let inner = CType::array(CType::int(), Some(Expr::int(3)));
        let outer = CType::array(inner, Some(Expr::int(2)));
        assert_eq!(outer.render().unwrap(), "(c_int * int(3)) * int(2)");
    }

    #[test]
    fn function_types_render_cfunctype() {
        let f = CType::function(CType::void(), vec![CType::int(), CType::pointer(CType::int())], false);
        assert_eq!(f.render().unwrap(), "CFUNCTYPE(None, c_int, POINTER(c_int))");
    }

    #[test]
    fn function_arguments_unwrap_function_pointers() {
        let callback = CType::pointer(CType::function(CType::void(), vec![CType::int()], false));
        let f = CType::function(CType::void(), vec![callback], false);
        match &f.kind {
            CTypeKind::Function { argtypes, .. } => {
                assert!(matches!(argtypes[0].kind, CTypeKind::Function { .. }));
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn remove_function_pointer_recurses_through_pointers() {
        let fnptr = CType::pointer(CType::function(CType::int(), vec![], false));
        assert!(matches!(
            remove_function_pointer(fnptr).kind,
            CTypeKind::Function { .. }
        ));

        let deep = CType::pointer(CType::pointer(CType::function(CType::int(), vec![], false)));
        let stripped = remove_function_pointer(deep);
        match stripped.kind {
            CTypeKind::Pointer { target, .. } => {
                assert!(matches!(target.kind, CTypeKind::Function { .. }));
            }
            _ => panic!("expected pointer"),
        }
    }

    #[test]
    fn composites_render_prefixed_tags() {
        let s = CStructType::reference(Variety::Struct, "point");
        assert_eq!(s.render(), "struct_point");
        let u = CStructType::reference(Variety::Union, "value");
        assert_eq!(u.render(), "union_value");
        let e = CEnumType::new("color", None, None);
        assert_eq!(e.render(), "enum_color");
    }

    #[test]
    fn anonymous_composites_get_synthetic_tags() {
        let a = CStructType::new(Variety::Struct, "", Attributes::new(), None, None);
        let b = CEnumType::new("", None, None);
        assert!(a.anonymous);
        assert!(b.anonymous);
        assert!(a.tag.starts_with("anon_"));
        assert!(b.tag.starts_with("anon_"));
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn enum_declaration_fills_implicit_values() {
        let e = CEnumType::from_declaration(
            "mode",
            vec![
                ("A".into(), None),
                ("B".into(), Some(Expr::int(5))),
                ("C".into(), None),
            ],
            None,
        );
        let members = e.enumerators.unwrap();
        assert_eq!(members[0].1.render(false).unwrap(), "0");
        assert_eq!(members[1].1.render(false).unwrap(), "5");
        assert_eq!(members[2].1.render(false).unwrap(), "(B + 1)");
    }

    #[test]
    fn bitfield_renders_as_base() {
        let b = CType::bitfield(CType::uint(), Expr::int(3));
        assert_eq!(b.render().unwrap(), "c_uint");
    }
}
