//! C type representation.
//!
//! This module defines the type model produced by the declaration parser
//! and committed into an analysis database: scalars, pointers, arrays,
//! tagged aggregates, function signatures and named references.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layout arithmetic overflowed the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("type too large")]
pub struct LayoutOverflow;

/// A C type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CType {
    /// void type
    Void,

    /// Integer type (char, short, int, long, etc.)
    Int(IntType),

    /// Floating-point type (float, double)
    Float(FloatType),

    /// Pointer to another type
    Pointer(Box<CType>),

    /// Array of elements
    Array(ArrayType),

    /// Structure type
    Struct(StructType),

    /// Union type
    Union(UnionType),

    /// Enumeration type
    Enum(EnumType),

    /// Function type
    Function(FunctionType),

    /// Named reference to a type: a typedef name such as `jint`, or a tagged
    /// reference such as `struct _jobject`.
    Named(String),
}

impl CType {
    /// Get the size of this type in bytes for the given architecture.
    /// Returns None for incomplete types (void, unsized arrays, named references)
    /// and for arrays whose size does not fit in `usize`.
    pub fn size(&self, arch: &ArchInfo) -> Option<usize> {
        match self {
            CType::Void => None,
            CType::Int(i) => Some(i.size),
            CType::Float(f) => Some(f.size),
            CType::Pointer(_) => Some(arch.pointer_size),
            CType::Array(a) => {
                let elem_size = a.element.size(arch)?;
                elem_size.checked_mul(a.length?)
            }
            CType::Struct(s) => Some(s.size),
            CType::Union(u) => Some(u.size),
            CType::Enum(e) => Some(e.underlying_size),
            CType::Function(_) => None,
            CType::Named(_) => None,
        }
    }

    /// Get the alignment of this type in bytes for the given architecture.
    pub fn alignment(&self, arch: &ArchInfo) -> Option<usize> {
        match self {
            CType::Void => None,
            CType::Int(i) => Some(i.size.min(arch.max_align)),
            CType::Float(f) => Some(f.size.min(arch.max_align)),
            CType::Pointer(_) => Some(arch.pointer_size),
            CType::Array(a) => a.element.alignment(arch),
            CType::Struct(s) => Some(s.alignment),
            CType::Union(u) => Some(u.alignment),
            CType::Enum(e) => Some(e.underlying_size.min(arch.max_align)),
            CType::Function(_) => None,
            CType::Named(_) => None,
        }
    }

    /// Check if this is a void type.
    pub fn is_void(&self) -> bool {
        matches!(self, CType::Void)
    }

    /// Check if this is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, CType::Int(_))
    }

    /// Check if this is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, CType::Float(_))
    }

    /// Check if this is a pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    /// Check if this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self, CType::Struct(_))
    }

    /// Check if this is a function type.
    pub fn is_function(&self) -> bool {
        matches!(self, CType::Function(_))
    }

    /// Returns the function signature if this is a function type.
    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            CType::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Component types of a compound type, outermost first.
    ///
    /// A pointer yields its target, an array its element, a function its
    /// return type followed by its parameter types.
    pub fn children(&self) -> Vec<&CType> {
        match self {
            CType::Pointer(inner) => vec![inner.as_ref()],
            CType::Array(a) => vec![a.element.as_ref()],
            CType::Function(f) => std::iter::once(f.return_type.as_ref())
                .chain(f.parameters.iter().map(|p| &p.param_type))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Format this type as a C declaration.
    pub fn to_c_string(&self, name: Option<&str>) -> String {
        let name = name.filter(|n| !n.is_empty());
        match self {
            CType::Void => with_name("void", name),
            CType::Int(i) => {
                let type_name = match (i.signed, i.size) {
                    (true, 1) => "char",
                    (false, 1) => "unsigned char",
                    (true, 2) => "short",
                    (false, 2) => "unsigned short",
                    (true, 4) => "int",
                    (false, 4) => "unsigned int",
                    (true, 8) => "long long",
                    (false, 8) => "unsigned long long",
                    _ => "int",
                };
                with_name(type_name, name)
            }
            CType::Float(f) => {
                let type_name = match f.size {
                    4 => "float",
                    8 => "double",
                    16 => "long double",
                    _ => "double",
                };
                with_name(type_name, name)
            }
            CType::Pointer(inner) => match inner.as_ref() {
                CType::Function(f) => {
                    let cc = f
                        .calling_convention
                        .map(|cc| format!("{} ", cc))
                        .unwrap_or_default();
                    format!(
                        "{} ({}*{})({})",
                        f.return_type.to_c_string(None),
                        cc,
                        name.unwrap_or(""),
                        f.format_params()
                    )
                }
                _ => {
                    let inner_str = inner.to_c_string(None);
                    format!(
                        "{}*{}",
                        inner_str,
                        name.map(|n| format!(" {}", n)).unwrap_or_default()
                    )
                }
            },
            CType::Array(a) => {
                let elem_str = a.element.to_c_string(name);
                match a.length {
                    Some(len) => format!("{}[{}]", elem_str, len),
                    None => format!("{}[]", elem_str),
                }
            }
            CType::Struct(s) => with_name(&tagged("struct", s.name.as_deref()), name),
            CType::Union(u) => with_name(&tagged("union", u.name.as_deref()), name),
            CType::Enum(e) => with_name(&tagged("enum", e.name.as_deref()), name),
            CType::Function(f) => {
                let ret = f.return_type.to_c_string(None);
                let cc = f
                    .calling_convention
                    .map(|cc| format!(" {}", cc))
                    .unwrap_or_default();
                format!("{}{} {}({})", ret, cc, name.unwrap_or(""), f.format_params())
            }
            CType::Named(n) => with_name(n, name),
        }
    }
}

fn with_name(base: &str, name: Option<&str>) -> String {
    match name {
        Some(n) => format!("{} {}", base, n),
        None => base.to_string(),
    }
}

fn tagged(keyword: &str, tag: Option<&str>) -> String {
    match tag {
        Some(t) => format!("{} {}", keyword, t),
        None => keyword.to_string(),
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_c_string(None))
    }
}

/// Data model of the target platform, used for sizing and struct layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchInfo {
    /// Pointer size in bytes.
    pub pointer_size: usize,
    /// Long size in bytes.
    pub long_size: usize,
    /// Largest scalar alignment.
    pub max_align: usize,
    /// Is big endian?
    pub big_endian: bool,
}

impl Default for ArchInfo {
    fn default() -> Self {
        Self::lp64()
    }
}

impl ArchInfo {
    /// LP64 model (aarch64, x86_64).
    pub fn lp64() -> Self {
        Self {
            pointer_size: 8,
            long_size: 8,
            max_align: 8,
            big_endian: false,
        }
    }

    /// ILP32 model (armv7, x86). 64-bit scalars are 8-byte aligned on ARM EABI.
    pub fn ilp32() -> Self {
        Self {
            pointer_size: 4,
            long_size: 4,
            max_align: 8,
            big_endian: false,
        }
    }

    /// ILP32 model for i386 System V, where 64-bit scalars are 4-byte aligned.
    pub fn ilp32_i386() -> Self {
        Self {
            max_align: 4,
            ..Self::ilp32()
        }
    }
}

/// Calling convention attached to a function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallingConvention {
    Cdecl,
    Stdcall,
    Fastcall,
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cdecl => write!(f, "__cdecl"),
            Self::Stdcall => write!(f, "__stdcall"),
            Self::Fastcall => write!(f, "__fastcall"),
        }
    }
}

/// Integer type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntType {
    /// Size in bytes.
    pub size: usize,
    /// Whether the type is signed.
    pub signed: bool,
}

impl IntType {
    pub fn new(size: usize, signed: bool) -> Self {
        Self { size, signed }
    }

    pub fn char() -> Self {
        Self::new(1, true)
    }
    pub fn uchar() -> Self {
        Self::new(1, false)
    }
    pub fn short() -> Self {
        Self::new(2, true)
    }
    pub fn ushort() -> Self {
        Self::new(2, false)
    }
    pub fn int() -> Self {
        Self::new(4, true)
    }
    pub fn uint() -> Self {
        Self::new(4, false)
    }
    pub fn longlong() -> Self {
        Self::new(8, true)
    }
    pub fn ulonglong() -> Self {
        Self::new(8, false)
    }
}

/// Floating-point type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatType {
    /// Size in bytes.
    pub size: usize,
}

impl FloatType {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn float() -> Self {
        Self::new(4)
    }
    pub fn double() -> Self {
        Self::new(8)
    }
}

/// Array type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayType {
    /// Element type.
    pub element: Box<CType>,
    /// Array length (None for flexible array member or incomplete).
    pub length: Option<usize>,
}

impl ArrayType {
    pub fn new(element: CType, length: Option<usize>) -> Self {
        Self {
            element: Box::new(element),
            length,
        }
    }
}

/// Size and alignment of a member, resolved by whoever knows the typedefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: usize,
    pub align: usize,
}

impl Layout {
    pub fn new(size: usize, align: usize) -> Self {
        Self {
            size,
            align: align.max(1),
        }
    }
}

/// Round `size` up to a multiple of the power-of-two `align`.
fn align_up(size: usize, align: usize) -> Result<usize, LayoutOverflow> {
    let mask = align.max(1) - 1;
    size.checked_add(mask).map(|s| s & !mask).ok_or(LayoutOverflow)
}

/// Structure type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    /// Optional struct tag name.
    pub name: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<StructField>,
    /// Total size in bytes (including padding).
    pub size: usize,
    /// Alignment requirement.
    pub alignment: usize,
}

impl StructType {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            fields: Vec::new(),
            size: 0,
            alignment: 1,
        }
    }

    /// Add a field and update size/alignment.
    pub fn add_field(
        &mut self,
        name: String,
        field_type: CType,
        layout: Layout,
    ) -> Result<(), LayoutOverflow> {
        let offset = align_up(self.size, layout.align)?;
        let end = offset.checked_add(layout.size).ok_or(LayoutOverflow)?;

        self.fields.push(StructField {
            name,
            field_type,
            offset,
            bit_field: None,
        });

        self.size = end;
        self.alignment = self.alignment.max(layout.align);
        Ok(())
    }

    /// Finalize the struct (add trailing padding).
    pub fn finalize(&mut self) -> Result<(), LayoutOverflow> {
        self.size = align_up(self.size, self.alignment)?;
        Ok(())
    }

    /// Get field at a specific byte offset.
    pub fn field_at_offset(&self, offset: usize) -> Option<&StructField> {
        self.fields.iter().find(|f| f.offset == offset)
    }

    /// Get field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field in a struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: CType,
    /// Byte offset from struct start.
    pub offset: usize,
    /// Bit field info (if this is a bit field).
    pub bit_field: Option<BitFieldInfo>,
}

/// Bit field information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitFieldInfo {
    /// Number of bits.
    pub bit_width: usize,
}

/// Union type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    /// Optional union tag name.
    pub name: Option<String>,
    /// Members.
    pub members: Vec<UnionMember>,
    /// Total size (max of all members).
    pub size: usize,
    /// Alignment requirement.
    pub alignment: usize,
}

impl UnionType {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            members: Vec::new(),
            size: 0,
            alignment: 1,
        }
    }

    /// Add a member and update size/alignment.
    pub fn add_member(&mut self, name: String, member_type: CType, layout: Layout) {
        self.members.push(UnionMember { name, member_type });

        self.size = self.size.max(layout.size);
        self.alignment = self.alignment.max(layout.align);
    }

    /// Finalize the union (add trailing padding).
    pub fn finalize(&mut self) -> Result<(), LayoutOverflow> {
        self.size = align_up(self.size, self.alignment)?;
        Ok(())
    }
}

/// A member in a union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionMember {
    /// Member name.
    pub name: String,
    /// Member type.
    pub member_type: CType,
}

/// Enumeration type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    /// Optional enum tag name.
    pub name: Option<String>,
    /// Enumerators (name, value).
    pub values: Vec<(String, i64)>,
    /// Size of underlying integer type.
    pub underlying_size: usize,
}

impl EnumType {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            values: Vec::new(),
            underlying_size: 4,
        }
    }

    /// Add an enumerator.
    pub fn add_value(&mut self, name: String, value: i64) {
        self.values.push((name, value));

        if value > i32::MAX as i64 || value < i32::MIN as i64 {
            self.underlying_size = 8;
        }
    }

    /// Get value by name.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// Function type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    /// Return type.
    pub return_type: Box<CType>,
    /// Parameters.
    pub parameters: Vec<FunctionParam>,
    /// Whether the function is variadic (has ...).
    pub variadic: bool,
    /// Explicit calling convention, if the declaration named one.
    pub calling_convention: Option<CallingConvention>,
}

impl FunctionType {
    pub fn new(return_type: CType) -> Self {
        Self {
            return_type: Box::new(return_type),
            parameters: Vec::new(),
            variadic: false,
            calling_convention: None,
        }
    }

    /// Add a parameter.
    pub fn add_param(&mut self, name: String, param_type: CType) {
        self.parameters.push(FunctionParam { name, param_type });
    }

    /// Compare signatures ignoring parameter names.
    pub fn same_signature(&self, other: &FunctionType) -> bool {
        self.return_type == other.return_type
            && self.variadic == other.variadic
            && self.calling_convention == other.calling_convention
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.param_type == b.param_type)
    }

    fn format_params(&self) -> String {
        let params: Vec<_> = self
            .parameters
            .iter()
            .map(|p| p.param_type.to_c_string(Some(&p.name)))
            .collect();
        if params.is_empty() {
            if self.variadic {
                "...".to_string()
            } else {
                "void".to_string()
            }
        } else if self.variadic {
            format!("{}, ...", params.join(", "))
        } else {
            params.join(", ")
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Parameter name (empty when the declaration left it unnamed).
    pub name: String,
    /// Parameter type.
    pub param_type: CType,
}

/// A named function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPrototype {
    /// Function name.
    pub name: String,
    /// Signature.
    pub signature: FunctionType,
}

impl FunctionPrototype {
    pub fn new(name: impl Into<String>, return_type: CType) -> Self {
        Self {
            name: name.into(),
            signature: FunctionType::new(return_type),
        }
    }

    pub fn param(mut self, name: impl Into<String>, param_type: CType) -> Self {
        self.signature.add_param(name.into(), param_type);
        self
    }

    pub fn variadic(mut self) -> Self {
        self.signature.variadic = true;
        self
    }

    /// The signature as a standalone function type.
    pub fn function_type(&self) -> CType {
        CType::Function(self.signature.clone())
    }

    /// Convert to C declaration string.
    pub fn to_c_string(&self) -> String {
        CType::Function(self.signature.clone()).to_c_string(Some(&self.name))
    }
}

// Common type constructors for convenience
impl CType {
    pub fn void() -> Self {
        CType::Void
    }
    pub fn char() -> Self {
        CType::Int(IntType::char())
    }
    pub fn uchar() -> Self {
        CType::Int(IntType::uchar())
    }
    pub fn short() -> Self {
        CType::Int(IntType::short())
    }
    pub fn ushort() -> Self {
        CType::Int(IntType::ushort())
    }
    pub fn int() -> Self {
        CType::Int(IntType::int())
    }
    pub fn uint() -> Self {
        CType::Int(IntType::uint())
    }
    pub fn longlong() -> Self {
        CType::Int(IntType::longlong())
    }
    pub fn ulonglong() -> Self {
        CType::Int(IntType::ulonglong())
    }
    pub fn float() -> Self {
        CType::Float(FloatType::float())
    }
    pub fn double() -> Self {
        CType::Float(FloatType::double())
    }

    pub fn ptr(inner: CType) -> Self {
        CType::Pointer(Box::new(inner))
    }
    pub fn array(element: CType, length: Option<usize>) -> Self {
        CType::Array(ArrayType::new(element, length))
    }

    /// Create a reference to a typedef or tagged type by name.
    pub fn named(name: impl Into<String>) -> Self {
        CType::Named(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sizes() {
        let arch = ArchInfo::lp64();
        assert_eq!(CType::char().size(&arch), Some(1));
        assert_eq!(CType::short().size(&arch), Some(2));
        assert_eq!(CType::int().size(&arch), Some(4));
        assert_eq!(CType::longlong().size(&arch), Some(8));
    }

    #[test]
    fn test_pointer_size_follows_arch() {
        assert_eq!(CType::ptr(CType::int()).size(&ArchInfo::lp64()), Some(8));
        assert_eq!(CType::ptr(CType::void()).size(&ArchInfo::ilp32()), Some(4));
    }

    #[test]
    fn test_struct_layout() {
        let mut s = StructType::new(Some("test".to_string()));
        s.add_field("a".to_string(), CType::char(), Layout::new(1, 1)).unwrap();
        s.add_field("b".to_string(), CType::int(), Layout::new(4, 4)).unwrap();
        s.add_field("c".to_string(), CType::char(), Layout::new(1, 1)).unwrap();
        s.finalize().unwrap();

        assert_eq!(s.fields[0].offset, 0);
        assert_eq!(s.fields[1].offset, 4);
        assert_eq!(s.fields[2].offset, 8);
        assert_eq!(s.size, 12);
        assert_eq!(s.alignment, 4);
        assert_eq!(s.field_at_offset(4).map(|f| f.name.as_str()), Some("b"));
        assert!(s.field_by_name("c").is_some());
    }

    #[test]
    fn test_struct_layout_overflow() {
        let mut s = StructType::new(Some("huge".to_string()));
        let big = Layout::new(usize::MAX / 2 + 1, 1);
        s.add_field("a".to_string(), CType::char(), big).unwrap();
        assert_eq!(
            s.add_field("b".to_string(), CType::char(), big),
            Err(LayoutOverflow)
        );

        let mut t = StructType::new(None);
        t.add_field("a".to_string(), CType::char(), Layout::new(usize::MAX, 1))
            .unwrap();
        t.add_field("b".to_string(), CType::char(), Layout::new(0, 1)).unwrap();
        t.alignment = 4;
        assert_eq!(t.finalize(), Err(LayoutOverflow));
    }

    #[test]
    fn test_union_layout() {
        let mut u = UnionType::new(Some("jvalue".to_string()));
        u.add_member("z".to_string(), CType::uchar(), Layout::new(1, 1));
        u.add_member("j".to_string(), CType::longlong(), Layout::new(8, 8));
        u.finalize().unwrap();

        assert_eq!(u.size, 8);
        assert_eq!(u.alignment, 8);
    }

    #[test]
    fn test_to_c_string() {
        assert_eq!(CType::int().to_c_string(Some("x")), "int x");
        assert_eq!(CType::ptr(CType::char()).to_c_string(Some("s")), "char* s");
        assert_eq!(CType::ptr(CType::void()).to_c_string(None), "void*");
        assert_eq!(CType::named("jint").to_c_string(Some("")), "jint");
    }

    #[test]
    fn test_function_pointer_to_c_string() {
        let mut f = FunctionType::new(CType::named("jint"));
        f.add_param("env".to_string(), CType::ptr(CType::named("JNIEnv")));
        let fp = CType::ptr(CType::Function(f));

        assert_eq!(fp.to_c_string(Some("GetVersion")), "jint (*GetVersion)(JNIEnv* env)");
    }

    #[test]
    fn test_function_prototype() {
        let proto = FunctionPrototype::new("Java_Foo_bar", CType::named("jint"))
            .param("", CType::ptr(CType::named("JNIEnv")))
            .param("", CType::named("jobject"));

        assert_eq!(proto.to_c_string(), "jint Java_Foo_bar(JNIEnv*, jobject)");
        assert!(proto.function_type().is_function());
    }

    #[test]
    fn test_variadic_prototype() {
        let proto = FunctionPrototype::new("printf", CType::int())
            .param("format", CType::ptr(CType::char()))
            .variadic();

        assert_eq!(proto.to_c_string(), "int printf(char* format, ...)");
    }

    #[test]
    fn test_children_of_function_pointer() {
        let mut f = FunctionType::new(CType::void());
        f.add_param("env".to_string(), CType::ptr(CType::named("JNIEnv")));
        let fp = CType::ptr(CType::Function(f.clone()));

        let children = fp.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0], &CType::Function(f));

        let grandchildren = children[0].children();
        assert_eq!(grandchildren.len(), 2);
        assert!(grandchildren[0].is_void());
        assert!(grandchildren[1].is_pointer());
    }

    #[test]
    fn test_children_of_scalar_is_empty() {
        assert!(CType::int().children().is_empty());
        assert!(CType::named("jobject").children().is_empty());
    }

    #[test]
    fn test_ctype_size_incomplete() {
        let arch = ArchInfo::default();
        assert_eq!(CType::void().size(&arch), None);
        assert_eq!(CType::array(CType::int(), None).size(&arch), None);
        assert_eq!(CType::named("jobject").size(&arch), None);
        assert_eq!(CType::Function(FunctionType::new(CType::int())).size(&arch), None);
        let huge = CType::array(CType::int(), Some(usize::MAX / 2));
        assert_eq!(huge.size(&arch), None);
    }

    #[test]
    fn test_ctype_array_size() {
        let arr = CType::array(CType::int(), Some(10));
        assert_eq!(arr.size(&ArchInfo::default()), Some(40));
    }

    #[test]
    fn test_i386_long_long_alignment() {
        assert_eq!(CType::longlong().alignment(&ArchInfo::ilp32_i386()), Some(4));
        assert_eq!(CType::longlong().alignment(&ArchInfo::ilp32()), Some(8));
    }

    #[test]
    fn test_enum_underlying_size_grows() {
        let mut e = EnumType::new(Some("big".to_string()));
        e.add_value("SMALL".to_string(), 1);
        assert_eq!(e.underlying_size, 4);
        e.add_value("HUGE".to_string(), i64::from(i32::MAX) + 1);
        assert_eq!(e.underlying_size, 8);
        assert_eq!(e.value_of("HUGE"), Some(i64::from(i32::MAX) + 1));
    }

    #[test]
    fn test_type_serde_roundtrip() {
        let proto = FunctionPrototype::new("f", CType::named("jint"))
            .param("env", CType::ptr(CType::named("JNIEnv")));
        let json = serde_json::to_string(&proto.function_type()).unwrap();
        let back: CType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proto.function_type());
    }
}
