//! Fluent registration of types and their members.
//!
//! ```
//! use sable_core::{DataType, TypeSystem, primitives};
//! use sable_registry::TypeRegistry;
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let point = registry
//!     .define_struct("Point")
//!     .field("X", DataType::INT32)
//!     .field("Y", DataType::INT32)
//!     .size(8)
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.is_value_type(DataType::simple(point)));
//! assert_eq!(registry.size_of(DataType::simple(point)), Some(8));
//! ```

use sable_core::{
    DataType, EventInfo, FieldInfo, IndexerInfo, MemberConstant, MethodFlags, MethodInfo,
    ParamInfo, PropertyInfo, TypeFlags, TypeHash, TypeInfo, TypeKind, primitives,
};

use crate::registry::{RegistrationError, TypeRegistry};

/// Builds one type. Members are registered as they are declared; the type
/// itself is registered by [`TypeBuilder::build`].
pub struct TypeBuilder<'r> {
    registry: &'r mut TypeRegistry,
    info: TypeInfo,
    error: Option<RegistrationError>,
}

fn signature(params: &[ParamInfo]) -> Vec<TypeHash> {
    params.iter().map(|p| p.ty.signature_hash()).collect()
}

/// Unnamed value parameters, for operators and indexers.
pub fn params_of(types: &[DataType]) -> Vec<ParamInfo> {
    types
        .iter()
        .enumerate()
        .map(|(i, &ty)| ParamInfo::new(format!("arg{i}"), ty))
        .collect()
}

impl<'r> TypeBuilder<'r> {
    pub(crate) fn new(registry: &'r mut TypeRegistry, name: &str, kind: TypeKind) -> Self {
        let base = match kind {
            TypeKind::Struct => Some(primitives::VALUE_TYPE),
            TypeKind::Enum { .. } => Some(primitives::ENUM),
            TypeKind::Delegate { .. } => Some(primitives::DELEGATE),
            TypeKind::Class => Some(primitives::OBJECT),
            _ => None,
        };
        let hash = TypeHash::from_name(name);
        Self {
            registry,
            info: TypeInfo {
                hash,
                name: name.to_string(),
                kind,
                base: base.filter(|b| *b != hash),
                interfaces: Vec::new(),
                flags: TypeFlags::empty(),
                size: None,
            },
            error: None,
        }
    }

    /// Hash of the type being built.
    pub fn hash(&self) -> TypeHash {
        self.info.hash
    }

    fn record<T>(&mut self, result: Result<T, RegistrationError>) {
        if let Err(err) = result
            && self.error.is_none()
        {
            self.error = Some(err);
        }
    }

    // ==========================================================================
    // Type shape
    // ==========================================================================

    pub fn base(mut self, base: TypeHash) -> Self {
        self.info.base = Some(base);
        self
    }

    pub fn implements(mut self, iface: TypeHash) -> Self {
        self.info.interfaces.push(iface);
        self
    }

    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.info.flags |= flags;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.info.size = Some(size);
        self
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    fn push_field(mut self, name: &str, ty: DataType, is_static: bool, is_readonly: bool, constant: Option<MemberConstant>) -> Self {
        let field = FieldInfo {
            hash: TypeHash::from_member(self.info.hash, name),
            owner: self.info.hash,
            name: name.to_string(),
            ty,
            is_static,
            is_readonly,
            constant,
        };
        let result = self.registry.add_field(field);
        self.record(result);
        self
    }

    pub fn field(self, name: &str, ty: DataType) -> Self {
        self.push_field(name, ty, false, false, None)
    }

    pub fn readonly_field(self, name: &str, ty: DataType) -> Self {
        self.push_field(name, ty, false, true, None)
    }

    pub fn static_field(self, name: &str, ty: DataType) -> Self {
        self.push_field(name, ty, true, false, None)
    }

    pub fn constant(self, name: &str, ty: DataType, value: MemberConstant) -> Self {
        self.push_field(name, ty, true, true, Some(value))
    }

    /// An enum member; its type is the enum itself.
    pub fn member(self, name: &str, value: i64) -> Self {
        let ty = DataType::simple(self.info.hash);
        self.push_field(name, ty, true, true, Some(MemberConstant::Int(value)))
    }

    // ==========================================================================
    // Methods
    // ==========================================================================

    fn push_method(mut self, name: &str, params: &[ParamInfo], ret: DataType, flags: MethodFlags) -> Self {
        let method = MethodInfo {
            hash: TypeHash::from_method(self.info.hash, name, &signature(params)),
            owner: self.info.hash,
            name: name.to_string(),
            params: params.to_vec(),
            return_type: ret,
            flags,
        };
        let result = self.registry.add_method(method);
        self.record(result);
        self
    }

    pub fn method(self, name: &str, params: &[ParamInfo], ret: DataType) -> Self {
        self.push_method(name, params, ret, MethodFlags::empty())
    }

    pub fn virtual_method(self, name: &str, params: &[ParamInfo], ret: DataType) -> Self {
        self.push_method(name, params, ret, MethodFlags::VIRTUAL)
    }

    pub fn static_method(self, name: &str, params: &[ParamInfo], ret: DataType) -> Self {
        self.push_method(name, params, ret, MethodFlags::STATIC)
    }

    /// A user-defined operator (`op_Addition`, `op_Increment`, `op_True`, ...).
    pub fn operator(self, name: &str, params: &[DataType], ret: DataType) -> Self {
        let params = params_of(params);
        let method = MethodInfo {
            hash: TypeHash::from_operator(self.info.hash, name, &signature(&params)),
            owner: self.info.hash,
            name: name.to_string(),
            params,
            return_type: ret,
            flags: MethodFlags::STATIC | MethodFlags::SPECIAL_NAME,
        };
        self.registry.add_operator(method);
        self
    }

    /// A user-defined implicit or explicit conversion between `from` and `to`,
    /// one of which is this type.
    pub fn conversion(self, from: DataType, to: DataType, is_explicit: bool) -> Self {
        let method = MethodInfo {
            hash: TypeHash::from_conversion(
                self.info.hash,
                from.signature_hash(),
                to.signature_hash(),
                is_explicit,
            ),
            owner: self.info.hash,
            name: if is_explicit { "op_Explicit" } else { "op_Implicit" }.to_string(),
            params: vec![ParamInfo::new("value", from)],
            return_type: to,
            flags: MethodFlags::STATIC | MethodFlags::SPECIAL_NAME,
        };
        self.registry.add_operator(method);
        self
    }

    pub fn constructor(self, params: &[ParamInfo]) -> Self {
        let method = MethodInfo {
            hash: TypeHash::from_constructor(self.info.hash, &signature(params)),
            owner: self.info.hash,
            name: ".ctor".to_string(),
            params: params.to_vec(),
            return_type: DataType::VOID,
            flags: MethodFlags::CONSTRUCTOR | MethodFlags::SPECIAL_NAME,
        };
        self.registry.add_constructor(method);
        self
    }

    fn accessor(&mut self, name: String, params: Vec<ParamInfo>, ret: DataType, extra: MethodFlags) -> TypeHash {
        let flags = MethodFlags::SPECIAL_NAME | extra;
        self.registry.add_accessor(MethodInfo {
            hash: TypeHash::from_method(self.info.hash, &name, &signature(&params)),
            owner: self.info.hash,
            name,
            params,
            return_type: ret,
            flags,
        })
    }

    // ==========================================================================
    // Properties, indexers, events
    // ==========================================================================

    fn push_property(mut self, name: &str, ty: DataType, get: bool, set: bool, is_static: bool) -> Self {
        let extra = if is_static { MethodFlags::STATIC } else { MethodFlags::empty() };
        let getter = get.then(|| self.accessor(format!("get_{name}"), Vec::new(), ty, extra));
        let setter = set.then(|| {
            self.accessor(
                format!("set_{name}"),
                vec![ParamInfo::new("value", ty)],
                DataType::VOID,
                extra,
            )
        });
        let property = PropertyInfo {
            hash: TypeHash::from_member(self.info.hash, name),
            owner: self.info.hash,
            name: name.to_string(),
            ty,
            getter,
            setter,
            is_static,
        };
        let result = self.registry.add_property(property);
        self.record(result);
        self
    }

    pub fn property(self, name: &str, ty: DataType, get: bool, set: bool) -> Self {
        self.push_property(name, ty, get, set, false)
    }

    pub fn static_property(self, name: &str, ty: DataType, get: bool, set: bool) -> Self {
        self.push_property(name, ty, get, set, true)
    }

    pub fn indexer(self, params: &[DataType], ty: DataType, get: bool, set: bool) -> Self {
        self.push_indexer(params, ty, get, set, MethodFlags::empty())
    }

    /// An indexer whose accessors are virtual.
    pub fn virtual_indexer(self, params: &[DataType], ty: DataType, get: bool, set: bool) -> Self {
        self.push_indexer(params, ty, get, set, MethodFlags::VIRTUAL)
    }

    fn push_indexer(mut self, params: &[DataType], ty: DataType, get: bool, set: bool, extra: MethodFlags) -> Self {
        let params = params_of(params);
        let getter = get.then(|| self.accessor("get_Item".into(), params.clone(), ty, extra));
        let setter = set.then(|| {
            let mut with_value = params.clone();
            with_value.push(ParamInfo::new("value", ty));
            self.accessor("set_Item".into(), with_value, DataType::VOID, extra)
        });
        let indexer = IndexerInfo {
            hash: TypeHash::from_operator(self.info.hash, "this[]", &signature(&params)),
            owner: self.info.hash,
            params,
            ty,
            getter,
            setter,
        };
        self.registry.add_indexer(indexer);
        self
    }

    pub fn event(mut self, name: &str, delegate: DataType) -> Self {
        let value = vec![ParamInfo::new("value", delegate)];
        let add = self.accessor(format!("add_{name}"), value.clone(), DataType::VOID, MethodFlags::empty());
        let remove = self.accessor(format!("remove_{name}"), value, DataType::VOID, MethodFlags::empty());
        let event = EventInfo {
            hash: TypeHash::from_member(self.info.hash, name),
            owner: self.info.hash,
            name: name.to_string(),
            ty: delegate,
            add,
            remove,
            is_static: false,
        };
        let result = self.registry.add_event(event);
        self.record(result);
        self
    }

    /// Register the type. Fails with the first member registration error.
    pub fn build(self) -> Result<TypeHash, RegistrationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.registry.register_type(self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{MemberLookup, TypeSystem};

    #[test]
    fn property_registers_accessors() {
        let mut registry = TypeRegistry::new();
        let owner = registry
            .define_class("Counter")
            .property("Value", DataType::INT32, true, false)
            .build()
            .unwrap();

        let Some(MemberLookup::Property(prop)) = registry.lookup_member(owner, "Value") else {
            panic!("expected property");
        };
        assert!(prop.getter.is_some());
        assert!(prop.setter.is_none());
        let getter = registry.method(prop.getter.unwrap()).unwrap();
        assert!(getter.is_special_name());
        assert_eq!(getter.return_type, DataType::INT32);
    }

    #[test]
    fn duplicate_member_is_rejected() {
        let mut registry = TypeRegistry::new();
        let result = registry
            .define_struct("Dup")
            .field("A", DataType::INT32)
            .field("A", DataType::INT64)
            .build();
        assert!(matches!(result, Err(RegistrationError::DuplicateMember { .. })));
    }

    #[test]
    fn overloads_share_a_method_group() {
        let mut registry = TypeRegistry::new();
        let owner = registry
            .define_class("Printer")
            .method("Print", &params_of(&[DataType::INT32]), DataType::VOID)
            .method("Print", &params_of(&[DataType::STRING]), DataType::VOID)
            .build()
            .unwrap();
        let Some(MemberLookup::Methods(group)) = registry.lookup_member(owner, "Print") else {
            panic!("expected method group");
        };
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn enum_members_are_constants_of_the_enum() {
        let mut registry = TypeRegistry::new();
        let color = registry
            .define_enum("Color", primitives::INT32)
            .member("Red", 1)
            .build()
            .unwrap();
        let Some(MemberLookup::Field(red)) = registry.lookup_member(color, "Red") else {
            panic!("expected field");
        };
        assert_eq!(red.ty, DataType::simple(color));
        assert_eq!(red.constant, Some(MemberConstant::Int(1)));
        assert!(registry.is_enum(DataType::simple(color)));
    }
}
