//! The type system contract consumed by expression resolution.
//!
//! Resolution never owns type metadata. It asks a [`TypeSystem`] about type
//! shapes, members and inheritance, and gets a definitive `None`/`false` for
//! negative answers. `sable-registry` provides the in-memory implementation.

use bitflags::bitflags;

use crate::{DataType, TypeHash, primitives};

// ============================================================================
// Types
// ============================================================================

/// The shape of a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A builtin numeric, `bool`, `char`, `void` or `intptr`.
    Primitive,
    Struct,
    Class,
    Interface,
    Enum { underlying: TypeHash },
    /// A delegate type; `invoke` is the hash of its `Invoke` method.
    Delegate { invoke: TypeHash },
    TypeParameter(TypeParamConstraints),
}

bitflags! {
    /// Declaration modifiers of a named type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        const ABSTRACT = 1 << 0;
        const SEALED = 1 << 1;
        const STATIC = 1 << 2;
        /// Implements the enumerable contract (collection initializers).
        const ENUMERABLE = 1 << 3;
    }
}

/// Constraints on a generic type parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeParamConstraints {
    pub has_default_constructor: bool,
    pub is_value_type: bool,
    pub is_reference_type: bool,
    /// Interface and class constraints, searched for indexers and members.
    pub bounds: Vec<TypeHash>,
}

/// Metadata of a named type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub hash: TypeHash,
    pub name: String,
    pub kind: TypeKind,
    pub base: Option<TypeHash>,
    pub interfaces: Vec<TypeHash>,
    pub flags: TypeFlags,
    /// Size in bytes for value types with a known layout.
    pub size: Option<u32>,
}

impl TypeInfo {
    pub fn is_value_type(&self) -> bool {
        match &self.kind {
            TypeKind::Primitive | TypeKind::Struct | TypeKind::Enum { .. } => true,
            TypeKind::TypeParameter(c) => c.is_value_type,
            _ => false,
        }
    }

    pub fn is_reference_type(&self) -> bool {
        match &self.kind {
            TypeKind::Class | TypeKind::Interface | TypeKind::Delegate { .. } => true,
            TypeKind::TypeParameter(c) => c.is_reference_type,
            _ => false,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT) || self.kind == TypeKind::Interface
    }
}

// ============================================================================
// Members
// ============================================================================

/// Passing mode of a parameter or argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamModifier {
    #[default]
    None,
    Ref,
    Out,
    /// Trailing `params T[]` parameter that accepts a variadic list.
    Params,
}

impl ParamModifier {
    pub fn keyword(self) -> &'static str {
        match self {
            ParamModifier::None => "",
            ParamModifier::Ref => "ref",
            ParamModifier::Out => "out",
            ParamModifier::Params => "params",
        }
    }

    /// Whether the argument is passed by address.
    pub fn is_by_ref(self) -> bool {
        matches!(self, ParamModifier::Ref | ParamModifier::Out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: DataType,
    pub modifier: ParamModifier,
    pub has_default: bool,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            modifier: ParamModifier::None,
            has_default: false,
        }
    }

    pub fn with_modifier(mut self, modifier: ParamModifier) -> Self {
        self.modifier = modifier;
        self
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        const ABSTRACT = 1 << 2;
        /// Operators and property/indexer/event accessors.
        const SPECIAL_NAME = 1 << 3;
        const CONSTRUCTOR = 1 << 4;
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub params: Vec<ParamInfo>,
    pub return_type: DataType,
    pub flags: MethodFlags,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.intersects(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT)
    }

    pub fn is_special_name(&self) -> bool {
        self.flags.contains(MethodFlags::SPECIAL_NAME)
    }

    pub fn has_params_array(&self) -> bool {
        self.params
            .last()
            .is_some_and(|p| p.modifier == ParamModifier::Params)
    }
}

/// Compile-time value of a `const` field or enum member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberConstant {
    Bool(bool),
    Char(u16),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Null,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub ty: DataType,
    pub is_static: bool,
    pub is_readonly: bool,
    /// Present for `const` fields and enum members.
    pub constant: Option<MemberConstant>,
}

#[derive(Debug, Clone)]
pub struct PropertyInfo {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub ty: DataType,
    pub getter: Option<TypeHash>,
    pub setter: Option<TypeHash>,
    pub is_static: bool,
}

/// An indexer (`this[...]` property). Parameters select the overload.
#[derive(Debug, Clone)]
pub struct IndexerInfo {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub params: Vec<ParamInfo>,
    pub ty: DataType,
    pub getter: Option<TypeHash>,
    pub setter: Option<TypeHash>,
}

#[derive(Debug, Clone)]
pub struct EventInfo {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    /// The delegate type of the event.
    pub ty: DataType,
    pub add: TypeHash,
    pub remove: TypeHash,
    pub is_static: bool,
}

/// Result of looking up a member name on a type.
#[derive(Debug, Clone)]
pub enum MemberLookup<'a> {
    Field(&'a FieldInfo),
    Property(&'a PropertyInfo),
    Event(&'a EventInfo),
    /// Every method with the name, most derived first.
    Methods(Vec<TypeHash>),
    NestedType(TypeHash),
}

// ============================================================================
// Contract
// ============================================================================

/// Queries the resolver needs answered about types and members.
pub trait TypeSystem {
    fn type_info(&self, hash: TypeHash) -> Option<&TypeInfo>;

    /// Resolve a fully qualified type name (`Geometry.Point`).
    fn find_type(&self, qualified_name: &str) -> Option<TypeHash>;

    /// Whether `name` is a known namespace prefix.
    fn is_namespace(&self, name: &str) -> bool;

    fn method(&self, hash: TypeHash) -> Option<&MethodInfo>;

    fn field(&self, hash: TypeHash) -> Option<&FieldInfo>;

    fn property(&self, hash: TypeHash) -> Option<&PropertyInfo>;

    /// Look a member up on `owner` and its base types, most derived first.
    fn lookup_member(&self, owner: TypeHash, name: &str) -> Option<MemberLookup<'_>>;

    /// User-defined operators named `name` declared directly on `owner`.
    fn operators(&self, owner: TypeHash, name: &str) -> &[TypeHash];

    /// Instance constructors declared on `owner`.
    fn constructors(&self, owner: TypeHash) -> &[TypeHash];

    /// Indexers declared on `owner`, its base types, and for type parameters
    /// the indexers of their constraint bounds.
    fn indexers(&self, owner: TypeHash) -> Vec<&IndexerInfo>;

    /// Whether `derived` inherits from or implements `base` (not reflexive).
    fn is_subtype_of(&self, derived: TypeHash, base: TypeHash) -> bool;

    // ------------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------------

    fn is_value_type(&self, ty: DataType) -> bool {
        ty.is_named()
            && self
                .type_info(ty.type_hash)
                .is_some_and(TypeInfo::is_value_type)
    }

    /// Classes, interfaces, delegates, arrays, `string` and `object`.
    fn is_reference_type(&self, ty: DataType) -> bool {
        if ty.is_array() {
            return true;
        }
        if !ty.is_named() {
            return false;
        }
        ty.type_hash == primitives::STRING
            || ty.type_hash == primitives::OBJECT
            || self
                .type_info(ty.type_hash)
                .is_some_and(TypeInfo::is_reference_type)
    }

    fn is_interface(&self, ty: DataType) -> bool {
        ty.is_named()
            && self
                .type_info(ty.type_hash)
                .is_some_and(|t| t.kind == TypeKind::Interface)
    }

    fn is_type_parameter(&self, ty: DataType) -> bool {
        ty.is_named()
            && self
                .type_info(ty.type_hash)
                .is_some_and(|t| matches!(t.kind, TypeKind::TypeParameter(_)))
    }

    /// Underlying integral type of an enum.
    fn enum_underlying(&self, ty: DataType) -> Option<DataType> {
        if !ty.is_named() {
            return None;
        }
        match self.type_info(ty.type_hash)?.kind {
            TypeKind::Enum { underlying } => Some(DataType::simple(underlying)),
            _ => None,
        }
    }

    fn is_enum(&self, ty: DataType) -> bool {
        self.enum_underlying(ty).is_some()
    }

    /// `Invoke` method of a delegate type.
    fn delegate_invoke(&self, ty: DataType) -> Option<TypeHash> {
        if !ty.is_named() {
            return None;
        }
        match self.type_info(ty.type_hash)?.kind {
            TypeKind::Delegate { invoke } => Some(invoke),
            _ => None,
        }
    }

    fn is_delegate(&self, ty: DataType) -> bool {
        self.delegate_invoke(ty).is_some()
    }

    /// Size in bytes of a value stored at a pointer of this element type.
    fn size_of(&self, ty: DataType) -> Option<u32> {
        if ty.pointer_depth > 0 && !ty.is_array() {
            return Some(8);
        }
        primitives::size_of(ty.type_hash)
            .filter(|_| ty.is_named())
            .or_else(|| self.type_info(ty.type_hash).and_then(|t| t.size))
    }

    /// Name used in diagnostics.
    fn type_name(&self, ty: DataType) -> String {
        let base = primitives::keyword(ty.type_hash)
            .map(str::to_string)
            .or_else(|| self.type_info(ty.type_hash).map(|t| t.name.clone()))
            .unwrap_or_else(|| ty.type_hash.to_string());
        let mut name = base;
        for _ in 0..ty.pointer_depth {
            name.push('*');
        }
        if ty.array_rank > 0 {
            name.push('[');
            name.push_str(&",".repeat(ty.array_rank as usize - 1));
            name.push(']');
        }
        name
    }

    /// Signature used in diagnostics.
    fn method_name(&self, hash: TypeHash) -> String {
        match self.method(hash) {
            Some(m) => {
                let params: Vec<String> = m
                    .params
                    .iter()
                    .map(|p| match p.modifier {
                        ParamModifier::None => self.type_name(p.ty),
                        other => format!("{} {}", other.keyword(), self.type_name(p.ty)),
                    })
                    .collect();
                format!(
                    "{}.{}({})",
                    self.type_name(DataType::simple(m.owner)),
                    m.name,
                    params.join(", ")
                )
            }
            None => hash.to_string(),
        }
    }
}
