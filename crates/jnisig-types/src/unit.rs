//! Parsed compilation units.
//!
//! A [`ParsedUnit`] is the result of parsing one source text: an ordered
//! table of named type definitions and an ordered table of function
//! declarations. Order is declaration order, so consumers that walk the
//! tables see types before the declarations that use them.

use crate::parser::ParseError;
use crate::types::*;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// What declared a [`TypeEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Union,
    Enum,
    Typedef,
}

impl TypeKind {
    /// The C keyword used to reference a tagged type, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::Struct => Some("struct"),
            Self::Union => Some("union"),
            Self::Enum => Some("enum"),
            Self::Typedef => None,
        }
    }
}

/// A named type definition.
///
/// Tagged types are named by their bare tag (`JNINativeInterface_`, not
/// `struct JNINativeInterface_`). Typedef entries hold the aliased type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub kind: TypeKind,
    pub ty: CType,
}

impl TypeEntry {
    /// Returns true if this typedef only aliases the tag of the same name,
    /// as in `typedef struct X X;`.
    fn is_self_alias(&self) -> bool {
        self.kind == TypeKind::Typedef && refers_to_tag(&self.ty, &self.name)
    }
}

/// A named function declaration.
pub type FunctionEntry = FunctionPrototype;

/// The type and function tables of one parsed source unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedUnit {
    /// Unit name used in diagnostics (`jni.h`, `jni_ext.h`).
    name: String,

    /// Data model the unit was laid out for.
    arch: ArchInfo,

    /// Tagged definitions and typedefs, in declaration order.
    types: IndexMap<String, TypeEntry>,

    /// Names introduced by typedef, including ones whose entry is the tag
    /// they alias.
    typedef_names: IndexSet<String>,

    /// Function declarations, in declaration order.
    functions: IndexMap<String, FunctionEntry>,
}

impl ParsedUnit {
    /// Create an empty unit.
    pub fn new(name: impl Into<String>, arch: ArchInfo) -> Self {
        Self {
            name: name.into(),
            arch,
            types: IndexMap::new(),
            typedef_names: IndexSet::new(),
            functions: IndexMap::new(),
        }
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data model used for layout.
    pub fn arch(&self) -> &ArchInfo {
        &self.arch
    }

    // ==================== Type Management ====================

    /// Record a tagged definition (struct, union, enum with a body).
    pub fn add_tagged(&mut self, kind: TypeKind, name: &str, ty: CType) -> Result<(), ParseError> {
        let entry = TypeEntry {
            name: name.to_string(),
            kind,
            ty,
        };
        match self.types.get_mut(name) {
            None => {
                self.types.insert(name.to_string(), entry);
                Ok(())
            }
            Some(existing) if existing.is_self_alias() => {
                *existing = entry;
                Ok(())
            }
            Some(existing) if *existing == entry => Ok(()),
            Some(_) => Err(ParseError::Redefinition(name.to_string())),
        }
    }

    /// Record a typedef.
    pub fn add_typedef(&mut self, name: &str, target: CType) -> Result<(), ParseError> {
        if refers_to_tag(&target, name) && self.types.contains_key(name) {
            // `typedef struct X {..} X;` names the same type twice.
            self.typedef_names.insert(name.to_string());
            return Ok(());
        }

        let entry = TypeEntry {
            name: name.to_string(),
            kind: TypeKind::Typedef,
            ty: target,
        };
        match self.types.get(name) {
            None => {
                self.types.insert(name.to_string(), entry);
            }
            Some(existing) if *existing == entry => {}
            Some(_) => return Err(ParseError::Redefinition(name.to_string())),
        }
        self.typedef_names.insert(name.to_string());
        Ok(())
    }

    /// Record a function declaration. Redeclaring with the same signature is
    /// accepted (parameter names may differ), a differing signature is a
    /// conflict. The first declaration is kept.
    pub fn add_function(&mut self, proto: FunctionEntry) -> Result<(), ParseError> {
        match self.functions.get(&proto.name) {
            None => {
                self.functions.insert(proto.name.clone(), proto);
                Ok(())
            }
            Some(existing) if existing.signature.same_signature(&proto.signature) => Ok(()),
            Some(_) => Err(ParseError::ConflictingTypes(proto.name)),
        }
    }

    /// Get a type entry by bare name.
    pub fn get_entry(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    /// Get a type by name. Accepts bare names and `struct X` style references.
    pub fn get_type(&self, name: &str) -> Option<&CType> {
        if let Some(entry) = self.types.get(name) {
            return Some(&entry.ty);
        }
        let (keyword, tag) = name.split_once(' ')?;
        self.types
            .get(tag)
            .filter(|e| e.kind.keyword() == Some(keyword))
            .map(|e| &e.ty)
    }

    /// Returns true if `name` was declared by a typedef and may be used as
    /// a bare type name.
    pub fn is_typedef(&self, name: &str) -> bool {
        self.typedef_names.contains(name)
    }

    /// Get a function declaration by name.
    pub fn get_function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    /// Check if a type exists.
    pub fn has_type(&self, name: &str) -> bool {
        self.get_type(name).is_some()
    }

    /// Check if a function exists.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Type entries in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeEntry> {
        self.types.values()
    }

    /// Function declarations in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions.values()
    }

    /// Get all type names.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    /// Get all function names.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    // ==================== Resolution ====================

    /// Follow named references until a concrete type is reached.
    pub fn resolve<'a>(&'a self, ty: &'a CType) -> &'a CType {
        let mut current = ty;
        // Bounded walk; a self-referential alias stops at the named reference.
        for _ in 0..32 {
            match current {
                CType::Named(name) => match self.get_type(name) {
                    Some(next) if next != current => current = next,
                    _ => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Size and alignment of a type, resolving typedefs through this unit.
    /// Incomplete types lay out as zero-sized.
    pub fn layout_of(&self, ty: &CType) -> Result<Layout, LayoutOverflow> {
        let resolved = self.resolve(ty);
        match resolved {
            CType::Array(a) => {
                let elem = self.layout_of(&a.element)?;
                let size = elem
                    .size
                    .checked_mul(a.length.unwrap_or(0))
                    .ok_or(LayoutOverflow)?;
                Ok(Layout::new(size, elem.align))
            }
            other => Ok(Layout::new(
                other.size(&self.arch).unwrap_or(0),
                other.alignment(&self.arch).unwrap_or(1),
            )),
        }
    }

    // ==================== Formatting ====================

    /// Format a type as a C type definition.
    pub fn format_type(&self, name: &str) -> String {
        let Some(entry) = self.types.get(name) else {
            return format!("// Unknown type: {}", name);
        };
        match (&entry.kind, &entry.ty) {
            (TypeKind::Struct, CType::Struct(s)) => {
                let mut result = format!("struct {} {{\n", name);
                for field in &s.fields {
                    result.push_str(&format!(
                        "    {}; // offset {:#x}\n",
                        field.field_type.to_c_string(Some(&field.name)),
                        field.offset
                    ));
                }
                result.push('}');
                if s.size > 0 {
                    result.push_str(&format!(" // size: {:#x}", s.size));
                }
                result
            }
            (TypeKind::Union, CType::Union(u)) => {
                let mut result = format!("union {} {{\n", name);
                for member in &u.members {
                    result.push_str(&format!(
                        "    {};\n",
                        member.member_type.to_c_string(Some(&member.name))
                    ));
                }
                result.push('}');
                result
            }
            (TypeKind::Enum, CType::Enum(e)) => {
                let mut result = format!("enum {} {{\n", name);
                for (name, value) in &e.values {
                    result.push_str(&format!("    {} = {},\n", name, value));
                }
                result.push('}');
                result
            }
            (_, ty) => format!("typedef {};", ty.to_c_string(Some(name))),
        }
    }

    // ==================== Serialization ====================

    /// Save unit to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load unit from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    // ==================== Statistics ====================

    /// Get unit statistics.
    pub fn stats(&self) -> UnitStats {
        let typedef_count = self
            .types
            .values()
            .filter(|e| e.kind == TypeKind::Typedef)
            .count();
        UnitStats {
            type_count: self.types.len() - typedef_count,
            typedef_count,
            function_count: self.functions.len(),
        }
    }
}

/// Returns true if `ty` names the tag `name` (`struct name` or an inline
/// definition tagged `name`).
fn refers_to_tag(ty: &CType, name: &str) -> bool {
    match ty {
        CType::Named(n) => n
            .split_once(' ')
            .map(|(_, tag)| tag == name)
            .unwrap_or(false),
        CType::Struct(s) => s.name.as_deref() == Some(name),
        CType::Union(u) => u.name.as_deref() == Some(name),
        CType::Enum(e) => e.name.as_deref() == Some(name),
        _ => false,
    }
}

/// Statistics about a parsed unit.
#[derive(Debug, Clone)]
pub struct UnitStats {
    pub type_count: usize,
    pub typedef_count: usize,
    pub function_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> CType {
        let mut s = StructType::new(Some("point".to_string()));
        s.add_field("x".to_string(), CType::int(), Layout::new(4, 4)).unwrap();
        s.add_field("y".to_string(), CType::int(), Layout::new(4, 4)).unwrap();
        s.finalize().unwrap();
        CType::Struct(s)
    }

    #[test]
    fn test_tagged_lookup() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::default());
        unit.add_tagged(TypeKind::Struct, "point", point()).unwrap();

        assert!(unit.has_type("point"));
        assert!(unit.has_type("struct point"));
        assert!(!unit.has_type("union point"));
        assert!(!unit.is_typedef("point"));
    }

    #[test]
    fn test_forward_typedef_replaced_by_definition() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::default());
        unit.add_typedef("point", CType::named("struct point")).unwrap();
        assert_eq!(unit.get_entry("point").unwrap().kind, TypeKind::Typedef);

        unit.add_tagged(TypeKind::Struct, "point", point()).unwrap();
        let entry = unit.get_entry("point").unwrap();
        assert_eq!(entry.kind, TypeKind::Struct);
        assert!(unit.is_typedef("point"));
        assert_eq!(unit.stats().type_count, 1);
    }

    #[test]
    fn test_typedef_conflict() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::default());
        unit.add_typedef("jint", CType::int()).unwrap();
        unit.add_typedef("jint", CType::int()).unwrap();
        assert_eq!(
            unit.add_typedef("jint", CType::longlong()),
            Err(ParseError::Redefinition("jint".to_string()))
        );
    }

    #[test]
    fn test_function_redeclaration() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::default());
        let f = FunctionPrototype::new("f", CType::int()).param("a", CType::int());
        let same = FunctionPrototype::new("f", CType::int()).param("b", CType::int());
        let other = FunctionPrototype::new("f", CType::void()).param("a", CType::int());

        unit.add_function(f).unwrap();
        unit.add_function(same).unwrap();
        assert_eq!(
            unit.add_function(other),
            Err(ParseError::ConflictingTypes("f".to_string()))
        );
        assert_eq!(unit.get_function("f").unwrap().signature.parameters[0].name, "a");
    }

    #[test]
    fn test_resolve_and_layout_through_typedefs() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::ilp32());
        unit.add_typedef("jlong", CType::longlong()).unwrap();
        unit.add_typedef("jobject", CType::ptr(CType::named("struct _jobject")))
            .unwrap();
        unit.add_typedef("self_ref", CType::named("struct self_ref")).unwrap();

        assert_eq!(unit.resolve(&CType::named("jlong")), &CType::longlong());
        assert_eq!(unit.layout_of(&CType::named("jobject")), Ok(Layout::new(4, 4)));
        assert_eq!(
            unit.layout_of(&CType::array(CType::named("jlong"), Some(2))),
            Ok(Layout::new(16, 8))
        );
        // Incomplete tag behind a self alias.
        assert_eq!(unit.layout_of(&CType::named("self_ref")).unwrap().size, 0);
        assert_eq!(
            unit.layout_of(&CType::array(CType::named("jlong"), Some(usize::MAX / 4))),
            Err(LayoutOverflow)
        );
    }

    #[test]
    fn test_format_type() {
        let mut unit = ParsedUnit::new("t.h", ArchInfo::default());
        unit.add_tagged(TypeKind::Struct, "point", point()).unwrap();
        unit.add_typedef("jint", CType::int()).unwrap();

        let text = unit.format_type("point");
        assert!(text.starts_with("struct point {"));
        assert!(text.contains("int y; // offset 0x4"));
        assert_eq!(unit.format_type("jint"), "typedef int jint;");
        assert_eq!(unit.format_type("nope"), "// Unknown type: nope");
    }

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let mut unit = ParsedUnit::new("jni.h", ArchInfo::default());
        unit.add_typedef("b", CType::int()).unwrap();
        unit.add_typedef("a", CType::char()).unwrap();
        unit.add_tagged(TypeKind::Struct, "point", point()).unwrap();

        let back = ParsedUnit::from_json(&unit.to_json().unwrap()).unwrap();
        let names: Vec<_> = back.type_names().collect();
        assert_eq!(names, vec!["b", "a", "point"]);
        assert!(back.is_typedef("a"));
        assert_eq!(back.name(), "jni.h");
    }
}
