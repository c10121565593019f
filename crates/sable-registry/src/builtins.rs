//! The builtin library every compilation starts from.

use sable_core::{
    DataType, ParamInfo, ParamModifier, TypeFlags, TypeHash, TypeInfo, TypeKind,
    primitives,
};

use crate::builder::params_of;
use crate::registry::{RegistrationError, TypeRegistry, ty};

const PRIMITIVES: [(&str, TypeHash); 15] = [
    ("void", primitives::VOID),
    ("bool", primitives::BOOL),
    ("char", primitives::CHAR),
    ("sbyte", primitives::INT8),
    ("byte", primitives::UINT8),
    ("short", primitives::INT16),
    ("ushort", primitives::UINT16),
    ("int", primitives::INT32),
    ("uint", primitives::UINT32),
    ("long", primitives::INT64),
    ("ulong", primitives::UINT64),
    ("float", primitives::FLOAT),
    ("double", primitives::DOUBLE),
    ("intptr", primitives::INTPTR),
    ("null", primitives::NULL),
];

/// Arithmetic operator methods declared on `decimal`.
pub const DECIMAL_BINARY_OPERATORS: [&str; 5] = [
    "op_Addition",
    "op_Subtraction",
    "op_Multiply",
    "op_Division",
    "op_Modulus",
];

pub const DECIMAL_COMPARISONS: [&str; 6] = [
    "op_Equality",
    "op_Inequality",
    "op_LessThan",
    "op_GreaterThan",
    "op_LessThanOrEqual",
    "op_GreaterThanOrEqual",
];

impl TypeRegistry {
    /// A registry holding the primitives, `object`, `string`, `decimal`
    /// operators, `Delegate`, `Array`, `Enum`, `ValueType`, `Type` and
    /// `Activator`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // The builtin set is fixed; a failure here is a programming error
        // caught by the tests below.
        if let Err(err) = registry.register_builtins() {
            tracing::error!(%err, "builtin registration failed");
        }
        registry
    }

    fn register_builtins(&mut self) -> Result<(), RegistrationError> {
        self.define_class("object")
            .virtual_method("ToString", &[], DataType::STRING)
            .virtual_method("Equals", &params_of(&[DataType::OBJECT]), DataType::BOOL)
            .virtual_method("GetHashCode", &[], DataType::INT32)
            .build()?;
        self.define_class("ValueType")
            .flags(TypeFlags::ABSTRACT)
            .build()?;
        self.define_class("Enum")
            .base(primitives::VALUE_TYPE)
            .flags(TypeFlags::ABSTRACT)
            .build()?;

        for (name, hash) in PRIMITIVES {
            self.register_type(TypeInfo {
                hash,
                name: name.to_string(),
                kind: TypeKind::Primitive,
                base: (hash != primitives::VOID && hash != primitives::NULL)
                    .then_some(primitives::VALUE_TYPE),
                interfaces: Vec::new(),
                flags: TypeFlags::SEALED,
                size: primitives::size_of(hash),
            })?;
        }

        let string = ty(primitives::STRING);
        let object = ty(primitives::OBJECT);
        let strings = DataType::array_of(string, 1);
        let objects = DataType::array_of(object, 1);
        self.define_class("string")
            .flags(TypeFlags::SEALED | TypeFlags::ENUMERABLE)
            .property("Length", DataType::INT32, true, false)
            .indexer(&[DataType::INT32], ty(primitives::CHAR), true, false)
            .static_method("Concat", &params_of(&[string, string]), string)
            .static_method("Concat", &params_of(&[string, string, string]), string)
            .static_method("Concat", &params_of(&[string, string, string, string]), string)
            .static_method(
                "Concat",
                &[ParamInfo::new("values", strings).with_modifier(ParamModifier::Params)],
                string,
            )
            .static_method("Concat", &params_of(&[object, object]), string)
            .static_method("Concat", &params_of(&[object, object, object]), string)
            .static_method(
                "Concat",
                &[ParamInfo::new("args", objects).with_modifier(ParamModifier::Params)],
                string,
            )
            .operator("op_Equality", &[string, string], DataType::BOOL)
            .operator("op_Inequality", &[string, string], DataType::BOOL)
            .build()?;

        let delegate = ty(primitives::DELEGATE);
        self.define_class("Delegate")
            .flags(TypeFlags::ABSTRACT)
            .static_method("Combine", &params_of(&[delegate, delegate]), delegate)
            .static_method("Remove", &params_of(&[delegate, delegate]), delegate)
            .operator("op_Equality", &[delegate, delegate], DataType::BOOL)
            .operator("op_Inequality", &[delegate, delegate], DataType::BOOL)
            .build()?;

        self.define_class("Array")
            .flags(TypeFlags::ABSTRACT | TypeFlags::ENUMERABLE)
            .property("Length", DataType::INT32, true, false)
            .property("Rank", DataType::INT32, true, false)
            .build()?;

        // The object `typeof` yields.
        self.define_class("Type")
            .flags(TypeFlags::ABSTRACT)
            .property("Name", string, true, false)
            .property("IsValueType", DataType::BOOL, true, false)
            .build()?;

        self.define_class("Activator")
            .flags(TypeFlags::STATIC | TypeFlags::ABSTRACT | TypeFlags::SEALED)
            .static_method("CreateInstance", &[], object)
            .build()?;

        self.register_decimal()?;
        Ok(())
    }

    fn register_decimal(&mut self) -> Result<(), RegistrationError> {
        let decimal = ty(primitives::DECIMAL);
        let mut builder = self
            .define("decimal", TypeKind::Primitive)
            .base(primitives::VALUE_TYPE)
            .flags(TypeFlags::SEALED)
            .size(16);
        for name in DECIMAL_BINARY_OPERATORS {
            builder = builder.operator(name, &[decimal, decimal], decimal);
        }
        for name in DECIMAL_COMPARISONS {
            builder = builder.operator(name, &[decimal, decimal], DataType::BOOL);
        }
        for name in ["op_UnaryNegation", "op_UnaryPlus", "op_Increment", "op_Decrement"] {
            builder = builder.operator(name, &[decimal], decimal);
        }
        for source in primitives::INTEGRALS {
            builder = builder
                .conversion(ty(source), decimal, false)
                .conversion(decimal, ty(source), true);
        }
        for source in [primitives::FLOAT, primitives::DOUBLE] {
            builder = builder
                .conversion(ty(source), decimal, true)
                .conversion(decimal, ty(source), true);
        }
        builder.build()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{MemberLookup, TypeSystem};

    #[test]
    fn builtins_register_without_error() {
        let mut registry = TypeRegistry::new();
        registry.register_builtins().unwrap();
        assert!(registry.type_count() >= PRIMITIVES.len() + 8);
    }

    #[test]
    fn type_objects_are_classes() {
        let registry = TypeRegistry::with_builtins();
        let type_ty = ty(TypeHash::from_name("Type"));
        assert!(registry.is_reference_type(type_ty));
        assert!(matches!(
            registry.lookup_member(type_ty.type_hash, "Name"),
            Some(MemberLookup::Property(_))
        ));
    }

    #[test]
    fn primitives_are_value_types() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.is_value_type(DataType::INT32));
        assert!(registry.is_value_type(ty(primitives::DECIMAL)));
        assert!(registry.is_reference_type(DataType::STRING));
        assert!(registry.is_reference_type(DataType::array_of(DataType::INT32, 1)));
        assert!(!registry.is_reference_type(DataType::INT32));
    }

    #[test]
    fn string_concat_overloads_are_grouped() {
        let registry = TypeRegistry::with_builtins();
        let Some(MemberLookup::Methods(group)) = registry.lookup_member(primitives::STRING, "Concat") else {
            panic!("expected Concat group");
        };
        assert_eq!(group.len(), 7);
    }

    #[test]
    fn decimal_operators_and_conversions_exist() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.operators(primitives::DECIMAL, "op_Addition").len(), 1);
        let widen = TypeHash::from_conversion(
            primitives::DECIMAL,
            primitives::INT32,
            primitives::DECIMAL,
            false,
        );
        assert!(registry.method(widen).is_some());
    }

    #[test]
    fn inherited_object_members_are_visible() {
        let mut registry = TypeRegistry::with_builtins();
        let point = registry.define_struct("Point").build().unwrap();
        assert!(matches!(
            registry.lookup_member(point, "ToString"),
            Some(MemberLookup::Methods(_))
        ));
        assert!(registry.is_subtype_of(point, primitives::OBJECT));
    }
}
