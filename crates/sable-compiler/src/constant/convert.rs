//! Conversions of constant values.

use ordered_float::OrderedFloat;
use sable_core::{CompilationError, DataType, Span, TypeSystem, primitives};

use super::{ConstValue, Constant, Decimal};

type Result<T> = std::result::Result<T, CompilationError>;

/// Implicit constant-expression conversion.
///
/// An `int` constant converts to `sbyte`, `byte`, `short`, `ushort`, `uint`
/// or `ulong` when its value is in range; a non-negative `long` converts to
/// `ulong`; the constant `0` converts to any enum type.
pub fn implicit_constant_conversion(
    constant: &Constant,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Constant> {
    if !constant.ty.is_named() || types.is_enum(constant.ty) {
        return None;
    }
    let value = constant.value.as_integer()?;

    if let Some(underlying) = types.enum_underlying(target) {
        if value != 0 {
            return None;
        }
        let zero = ConstValue::integral(underlying.type_hash, 0)?;
        return Some(Constant::with_type(zero, target));
    }

    let allowed: &[_] = match constant.ty.type_hash {
        primitives::INT32 => &[
            primitives::INT8,
            primitives::UINT8,
            primitives::INT16,
            primitives::UINT16,
            primitives::UINT32,
            primitives::UINT64,
        ],
        primitives::INT64 => &[primitives::UINT64],
        _ => return None,
    };
    if !target.is_named() || !allowed.contains(&target.type_hash) {
        return None;
    }
    ConstValue::integral(target.type_hash, value).map(|v| Constant::with_type(v, target))
}

/// Convert a constant to `target`, folding the conversion.
///
/// Returns `Ok(None)` when the conversion cannot be folded (boxing, user
/// conversions, reference conversions of non-null values); the caller then
/// emits a runtime conversion. Out-of-range integral results fail with 221
/// in checked mode and wrap otherwise; decimal conversions always check.
pub fn convert_constant(
    constant: &Constant,
    target: DataType,
    checked: bool,
    span: Span,
    types: &dyn TypeSystem,
) -> Result<Option<Constant>> {
    if constant.ty == target {
        return Ok(Some(constant.clone()));
    }
    if constant.is_null() {
        let accepts_null = types.is_reference_type(target) || target.is_pointer();
        return Ok(accepts_null.then(|| Constant::with_type(ConstValue::Null, target)));
    }
    let storage = types.enum_underlying(target).unwrap_or(target);
    if !storage.is_named() {
        return Ok(None);
    }

    let out_of_range = || CompilationError::ConstantOutOfRange {
        value: constant.value.to_string(),
        target: types.type_name(target),
        span,
    };

    let value = &constant.value;
    let converted = match storage.type_hash {
        hash if primitives::is_integral(hash) => match value {
            ConstValue::Float(_) | ConstValue::Double(_) => {
                let Some(f) = value.as_f64() else {
                    return Ok(None);
                };
                let truncated = f.trunc();
                let fits = f.is_finite() && ConstValue::integral(hash, truncated as i128).is_some();
                if !fits && checked {
                    return Err(out_of_range());
                }
                ConstValue::integral_wrapping(hash, truncated as i128)
            }
            ConstValue::Decimal(d) => {
                Some(ConstValue::integral(hash, d.trunc()).ok_or_else(out_of_range)?)
            }
            other => match other.as_integer() {
                Some(v) => match ConstValue::integral(hash, v) {
                    Some(fits) => Some(fits),
                    None if checked => return Err(out_of_range()),
                    None => ConstValue::integral_wrapping(hash, v),
                },
                None => None,
            },
        },
        primitives::FLOAT => numeric_f64(value).map(|f| ConstValue::Float(OrderedFloat(f as f32))),
        primitives::DOUBLE => numeric_f64(value).map(|f| ConstValue::Double(OrderedFloat(f))),
        primitives::DECIMAL => match value {
            ConstValue::Float(_) | ConstValue::Double(_) => {
                let f = value.as_f64().unwrap_or(f64::NAN);
                Some(ConstValue::Decimal(Decimal::from_f64(f).ok_or_else(out_of_range)?))
            }
            ConstValue::Decimal(_) => Some(value.clone()),
            other => match other.as_integer() {
                Some(v) => Some(ConstValue::Decimal(
                    Decimal::from_i128(v).ok_or_else(out_of_range)?,
                )),
                None => None,
            },
        },
        primitives::BOOL => matches!(value, ConstValue::Bool(_)).then(|| value.clone()),
        primitives::STRING => matches!(value, ConstValue::String(_)).then(|| value.clone()),
        _ => None,
    };

    Ok(converted.map(|v| Constant::with_type(v, target)))
}

/// Numeric source value; `None` for bool and string constants.
fn numeric_f64(value: &ConstValue) -> Option<f64> {
    match value {
        ConstValue::Bool(_) | ConstValue::String(_) | ConstValue::Null => None,
        other => other.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_registry::TypeRegistry;

    fn span() -> Span {
        Span::new(1, 1, 1)
    }

    #[test]
    fn int_literal_narrows_when_in_range() {
        let registry = TypeRegistry::with_builtins();
        let byte = DataType::simple(primitives::UINT8);
        let c = implicit_constant_conversion(&Constant::int(200), byte, &registry).unwrap();
        assert_eq!(c.value, ConstValue::Byte(200));
        assert_eq!(c.ty, byte);
        assert!(implicit_constant_conversion(&Constant::int(300), byte, &registry).is_none());
        assert!(
            implicit_constant_conversion(&Constant::int(-1), DataType::simple(primitives::UINT32), &registry)
                .is_none()
        );
    }

    #[test]
    fn zero_converts_to_enum() {
        let mut registry = TypeRegistry::with_builtins();
        let color = registry
            .define_enum("Color", primitives::INT32)
            .member("Red", 1)
            .build()
            .unwrap();
        let target = DataType::simple(color);
        let zero = implicit_constant_conversion(&Constant::int(0), target, &registry).unwrap();
        assert_eq!(zero.ty, target);
        assert_eq!(zero.value, ConstValue::Int(0));
        assert!(implicit_constant_conversion(&Constant::int(1), target, &registry).is_none());
    }

    #[test]
    fn explicit_narrowing_checks_or_wraps() {
        let registry = TypeRegistry::with_builtins();
        let byte = DataType::simple(primitives::UINT8);
        let c = Constant::int(300);

        let err = convert_constant(&c, byte, true, span(), &registry).unwrap_err();
        assert_eq!(err.code(), 221);

        let wrapped = convert_constant(&c, byte, false, span(), &registry).unwrap().unwrap();
        assert_eq!(wrapped.value, ConstValue::Byte(44));
    }

    #[test]
    fn float_to_int_truncates() {
        let registry = TypeRegistry::with_builtins();
        let c = Constant::literal(ConstValue::Double(OrderedFloat(-2.75)));
        let converted = convert_constant(&c, DataType::INT32, true, span(), &registry)
            .unwrap()
            .unwrap();
        assert_eq!(converted.value, ConstValue::Int(-2));

        let huge = Constant::literal(ConstValue::Double(OrderedFloat(1e20)));
        assert!(convert_constant(&huge, DataType::INT32, true, span(), &registry).is_err());
    }

    #[test]
    fn null_converts_to_reference_types_only() {
        let registry = TypeRegistry::with_builtins();
        let to_string = convert_constant(&Constant::null(), DataType::STRING, false, span(), &registry)
            .unwrap()
            .unwrap();
        assert_eq!(to_string.ty, DataType::STRING);
        assert!(
            convert_constant(&Constant::null(), DataType::INT32, false, span(), &registry)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn int_to_decimal() {
        let registry = TypeRegistry::with_builtins();
        let converted = convert_constant(
            &Constant::int(7),
            DataType::simple(primitives::DECIMAL),
            false,
            span(),
            &registry,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(converted.value, ConstValue::Decimal(d) if d.to_string() == "7"));
    }

    #[test]
    fn string_to_int_is_not_a_constant_conversion() {
        let registry = TypeRegistry::with_builtins();
        let c = Constant::string("1");
        assert!(
            convert_constant(&c, DataType::INT32, false, span(), &registry)
                .unwrap()
                .is_none()
        );
    }
}
