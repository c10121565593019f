//! Reference, boxing and pointer conversions.

use sable_core::{DataType, TypeFlags, TypeKind, TypeSystem, primitives};

use super::{Conversion, ConversionKind};

/// Reference conversions between reference types, and boxing/unboxing
/// between value types and the reference types they convert to.
pub fn find_reference_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    if types.is_type_parameter(source) || types.is_type_parameter(target) {
        return find_type_parameter_conversion(source, target, types);
    }

    let source_ref = types.is_reference_type(source);
    let target_ref = types.is_reference_type(target);

    if source_ref && target_ref {
        return find_between_references(source, target, types);
    }

    if source.is_named() && types.is_value_type(source) && target_ref {
        return is_boxing_target(source, target, types).then(|| {
            Conversion::implicit(ConversionKind::Boxing, Conversion::COST_BOXING)
        });
    }

    if target.is_named() && types.is_value_type(target) && source_ref {
        return is_boxing_target(target, source, types)
            .then(|| Conversion::explicit(ConversionKind::Unboxing));
    }

    None
}

/// `object`, `ValueType`, and every class or interface the value type
/// inherits from (`Enum` for enums).
fn is_boxing_target(value: DataType, target: DataType, types: &dyn TypeSystem) -> bool {
    target.is_named()
        && (target.type_hash == primitives::OBJECT
            || target.type_hash == primitives::VALUE_TYPE
            || types.is_subtype_of(value.type_hash, target.type_hash))
}

fn find_between_references(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    let implicit = || Conversion::implicit(ConversionKind::ImplicitReference, Conversion::COST_REFERENCE);
    let explicit = || Conversion::explicit(ConversionKind::ExplicitReference);

    if target.is(primitives::OBJECT) {
        return Some(implicit());
    }

    if source.is_array() {
        if target.is(primitives::ARRAY) || types.is_subtype_of(primitives::ARRAY, target.type_hash) {
            return Some(implicit());
        }
        if target.is_array() && target.array_rank == source.array_rank {
            let (from, to) = (source.element_type()?, target.element_type()?);
            // Array covariance applies to reference elements only.
            if types.is_reference_type(from) && types.is_reference_type(to) {
                return find_between_references(from, to, types);
            }
        }
        return None;
    }

    if target.is_array() {
        let unwraps = source.is(primitives::OBJECT)
            || source.is(primitives::ARRAY)
            || types.is_interface(source);
        return unwraps.then(explicit);
    }

    if types.is_subtype_of(source.type_hash, target.type_hash) {
        return Some(implicit());
    }

    if source.is(primitives::OBJECT) || types.is_subtype_of(target.type_hash, source.type_hash) {
        return Some(explicit());
    }

    // A non-sealed class may have a subclass implementing any interface.
    let castable_to_interface = |class: DataType, iface: DataType| {
        types.is_interface(iface)
            && !types
                .type_info(class.type_hash)
                .is_some_and(|t| t.flags.contains(TypeFlags::SEALED))
    };
    if castable_to_interface(source, target) || castable_to_interface(target, source) {
        return Some(explicit());
    }

    None
}

fn find_type_parameter_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    let bounds = |ty: DataType| match types.type_info(ty.type_hash).map(|t| &t.kind) {
        Some(TypeKind::TypeParameter(c)) => c.bounds.clone(),
        _ => Vec::new(),
    };
    if types.is_type_parameter(source) && source.is_named() {
        let widens = target.is(primitives::OBJECT)
            || bounds(source)
                .iter()
                .any(|&b| b == target.type_hash || types.is_subtype_of(b, target.type_hash));
        return widens
            .then(|| Conversion::implicit(ConversionKind::Boxing, Conversion::COST_BOXING));
    }
    if types.is_type_parameter(target) && target.is_named() {
        let narrows = source.is(primitives::OBJECT)
            || types.is_interface(source)
            || bounds(target).contains(&source.type_hash);
        return narrows.then(|| Conversion::explicit(ConversionKind::Unboxing));
    }
    None
}

/// Pointer conversions: implicit to `void*`, explicit between pointer types
/// and between pointers and integral types.
pub fn find_pointer_conversion(source: DataType, target: DataType) -> Option<Conversion> {
    match (source.is_pointer(), target.is_pointer()) {
        (true, true) if target.is_void_pointer() => Some(Conversion::implicit(
            ConversionKind::PointerToVoid,
            Conversion::COST_POINTER,
        )),
        (true, true) => Some(Conversion::explicit(ConversionKind::PointerToPointer)),
        (true, false) if target.is_integral() => {
            Some(Conversion::explicit(ConversionKind::PointerToIntegral {
                to: target.type_hash,
            }))
        }
        (false, true) if source.is_integral() => {
            Some(Conversion::explicit(ConversionKind::IntegralToPointer {
                from: source.type_hash,
            }))
        }
        _ => None,
    }
}
