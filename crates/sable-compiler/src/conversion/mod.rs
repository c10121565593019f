//! Type conversion classification.
//!
//! Determines whether a value of one type converts to another, whether the
//! conversion may be applied implicitly, and at what cost. Used for:
//!
//! - assignment, argument passing and cast checking
//! - operator and method overload resolution
//! - choosing between conversion targets (`better_target`)
//!
//! ## Conversion order
//!
//! 1. Identity
//! 2. `null` literal to a reference or pointer type
//! 3. Numeric (implicit table, explicit otherwise)
//! 4. Enumeration (explicit, between enums and numerics)
//! 5. Pointer conversions
//! 6. Reference conversions, boxing and unboxing
//! 7. User-defined `op_Implicit` / `op_Explicit`

mod numeric;
mod reference;
mod user_defined;

pub use numeric::{
    decimal_conversion_method, is_explicit_numeric, is_implicit_numeric, numeric_conversion_ops,
    numeric_rank,
};
pub use reference::{find_pointer_conversion, find_reference_conversion};
pub use user_defined::find_user_conversion;

use sable_core::{DataType, TypeHash, TypeSystem, primitives};

use crate::constant::{Constant, implicit_constant_conversion};

/// A type conversion with its cost for overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub kind: ConversionKind,
    /// Lower is better.
    pub cost: u32,
    pub is_implicit: bool,
}

/// The kind of conversion being performed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionKind {
    /// No conversion needed.
    Identity,

    /// Between two numeric types, `char` included.
    Numeric { from: TypeHash, to: TypeHash },

    /// An in-range integral constant narrowed to a smaller or unsigned type.
    ImplicitConstant,

    /// The constant `0` to an enum type.
    ZeroToEnum,

    /// `null` to a reference or pointer type.
    NullLiteral,

    /// Derived to base, class to interface, array to `Array`, anything to `object`.
    ImplicitReference,

    /// A checked downcast.
    ExplicitReference,

    Boxing,

    Unboxing,

    /// Enum to enum, enum to numeric or numeric to enum. `from` and `to` are
    /// the underlying storage types.
    Enumeration { from: TypeHash, to: TypeHash },

    /// `T*` to `void*`.
    PointerToVoid,

    /// Reinterpreting one pointer type as another.
    PointerToPointer,

    PointerToIntegral { to: TypeHash },

    IntegralToPointer { from: TypeHash },

    /// A user-defined conversion operator. The source is first converted to
    /// `param` and the operator result converted on to the target.
    UserDefined {
        method: TypeHash,
        param: DataType,
        ret: DataType,
    },
}

impl Conversion {
    pub const COST_EXACT: u32 = 0;
    /// Constant narrowing and zero to enum.
    pub const COST_CONSTANT: u32 = 1;
    pub const COST_NULL: u32 = 2;
    /// Implicit numeric conversions add the target's rank to this base so
    /// narrower and signed targets win.
    pub const COST_NUMERIC: u32 = 3;
    pub const COST_REFERENCE: u32 = 14;
    pub const COST_BOXING: u32 = 15;
    pub const COST_POINTER: u32 = 16;
    pub const COST_USER_DEFINED: u32 = 20;
    /// Cost marker for explicit-only conversions (not usable implicitly).
    pub const COST_EXPLICIT_ONLY: u32 = 100;

    pub(crate) fn identity() -> Self {
        Self::implicit(ConversionKind::Identity, Self::COST_EXACT)
    }

    pub(crate) fn implicit(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            is_implicit: true,
        }
    }

    pub(crate) fn explicit(kind: ConversionKind) -> Self {
        Self {
            kind,
            cost: Self::COST_EXPLICIT_ONLY,
            is_implicit: false,
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.is_implicit
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.kind, ConversionKind::Identity)
    }

    /// Whether this goes through a user-defined operator.
    pub fn is_user_defined(&self) -> bool {
        matches!(self.kind, ConversionKind::UserDefined { .. })
    }
}

/// Find any conversion, implicit or explicit, from `source` to `target`.
pub fn find_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    find_standard_conversion(source, target, types)
        .or_else(|| find_user_conversion(source, target, true, types))
}

/// Find an implicit conversion from `source` to `target`.
pub fn find_implicit_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    match find_standard_conversion(source, target, types) {
        Some(conv) if conv.is_implicit => Some(conv),
        _ => find_user_conversion(source, target, false, types),
    }
}

pub fn can_implicitly_convert(source: DataType, target: DataType, types: &dyn TypeSystem) -> bool {
    find_implicit_conversion(source, target, types).is_some()
}

/// Implicit conversion of a value that may be a constant.
///
/// Constants additionally allow in-range integral narrowing and `0` to enum.
pub fn find_implicit_conversion_from(
    source: DataType,
    constant: Option<&Constant>,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    if let Some(conv) = find_implicit_conversion(source, target, types) {
        return Some(conv);
    }
    let converted = implicit_constant_conversion(constant?, target, types)?;
    let kind = if types.is_enum(converted.ty) {
        ConversionKind::ZeroToEnum
    } else {
        ConversionKind::ImplicitConstant
    };
    Some(Conversion::implicit(kind, Conversion::COST_CONSTANT))
}

/// Conversions other than user-defined ones, which user-defined conversions
/// are themselves built from.
pub fn find_standard_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    if source == target {
        return Some(Conversion::identity());
    }

    if source.is(primitives::NULL) {
        return (types.is_reference_type(target) || target.is_pointer())
            .then(|| Conversion::implicit(ConversionKind::NullLiteral, Conversion::COST_NULL));
    }

    if source.is_numeric() && target.is_numeric() {
        return Some(numeric(source.type_hash, target.type_hash));
    }

    if let Some(conv) = find_enum_conversion(source, target, types) {
        return Some(conv);
    }

    if let Some(conv) = find_pointer_conversion(source, target) {
        return Some(conv);
    }

    find_reference_conversion(source, target, types)
}

fn numeric(from: TypeHash, to: TypeHash) -> Conversion {
    let kind = ConversionKind::Numeric { from, to };
    if is_implicit_numeric(from, to) {
        let rank = numeric_rank(to).unwrap_or(0);
        Conversion::implicit(kind, Conversion::COST_NUMERIC + rank)
    } else {
        Conversion::explicit(kind)
    }
}

/// Explicit enumeration conversions between enums and numeric types.
fn find_enum_conversion(
    source: DataType,
    target: DataType,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    let from = types
        .enum_underlying(source)
        .or_else(|| source.is_numeric().then_some(source))?;
    let to = types
        .enum_underlying(target)
        .or_else(|| target.is_numeric().then_some(target))?;
    if !types.is_enum(source) && !types.is_enum(target) {
        return None;
    }
    Some(Conversion::explicit(ConversionKind::Enumeration {
        from: from.type_hash,
        to: to.type_hash,
    }))
}

// ============================================================================
// Betterness
// ============================================================================

/// Outcome of comparing two candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Better {
    First,
    Second,
    Neither,
}

/// Which of two conversion targets is the better one.
///
/// A target is better when it converts implicitly to the other but not back,
/// or, for integral types, when it is signed and the other unsigned.
pub fn better_target(first: DataType, second: DataType, types: &dyn TypeSystem) -> Better {
    if first == second {
        return Better::Neither;
    }
    let first_to_second = can_implicitly_convert(first, second, types);
    let second_to_first = can_implicitly_convert(second, first, types);
    match (first_to_second, second_to_first) {
        (true, false) => return Better::First,
        (false, true) => return Better::Second,
        _ => {}
    }
    if signed_beats_unsigned(first, second) {
        Better::First
    } else if signed_beats_unsigned(second, first) {
        Better::Second
    } else {
        Better::Neither
    }
}

fn signed_beats_unsigned(signed: DataType, unsigned: DataType) -> bool {
    use primitives::*;
    if !signed.is_named() || !unsigned.is_named() {
        return false;
    }
    let beaten: &[TypeHash] = match signed.type_hash {
        INT8 => &[UINT8, UINT16, UINT32, UINT64],
        INT16 => &[UINT16, UINT32, UINT64],
        INT32 => &[UINT32, UINT64],
        INT64 => &[UINT64],
        _ => return false,
    };
    beaten.contains(&unsigned.type_hash)
}

/// Which of two conversions of the same argument is better, judged by the
/// source and target types alone. Unrelated targets are `Neither`.
pub fn better_conversion_target(source: DataType, first: DataType, second: DataType, types: &dyn TypeSystem) -> Better {
    if first == second {
        return Better::Neither;
    }
    match (first == source, second == source) {
        (true, false) => Better::First,
        (false, true) => Better::Second,
        _ => better_target(first, second, types),
    }
}

/// Which of two conversions of the same argument is better.
///
/// Falls back to conversion cost when the targets are unrelated.
pub fn better_conversion(
    source: DataType,
    first: (&Conversion, DataType),
    second: (&Conversion, DataType),
    types: &dyn TypeSystem,
) -> Better {
    let (first_conv, first_ty) = first;
    let (second_conv, second_ty) = second;
    match better_conversion_target(source, first_ty, second_ty, types) {
        Better::Neither if first_ty != second_ty => match first_conv.cost.cmp(&second_conv.cost) {
            std::cmp::Ordering::Less => Better::First,
            std::cmp::Ordering::Greater => Better::Second,
            std::cmp::Ordering::Equal => Better::Neither,
        },
        better => better,
    }
}

// ============================================================================
// Array indices
// ============================================================================

/// The index type an array access converts `source` to: the first of `int`,
/// `uint`, `long` and `ulong` it converts to implicitly.
pub fn array_index_type(
    source: DataType,
    constant: Option<&Constant>,
    types: &dyn TypeSystem,
) -> Option<DataType> {
    [
        primitives::INT32,
        primitives::UINT32,
        primitives::INT64,
        primitives::UINT64,
    ]
    .into_iter()
    .map(DataType::simple)
    .find(|&target| {
        find_implicit_conversion_from(source, constant, target, types)
            .is_some_and(|c| !c.is_user_defined())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_registry::{TypeRegistry, ty};

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    #[test]
    fn identity_is_exact() {
        let reg = registry();
        let conv = find_conversion(DataType::INT32, DataType::INT32, &reg).unwrap();
        assert!(conv.is_exact());
        assert_eq!(conv.cost, Conversion::COST_EXACT);
    }

    #[test]
    fn widening_is_implicit_narrowing_is_not() {
        let reg = registry();
        let widen = find_conversion(DataType::INT32, DataType::INT64, &reg).unwrap();
        assert!(widen.is_implicit);
        let narrow = find_conversion(DataType::INT64, DataType::INT32, &reg).unwrap();
        assert!(!narrow.is_implicit);
        assert_eq!(narrow.cost, Conversion::COST_EXPLICIT_ONLY);
    }

    #[test]
    fn null_converts_to_references_and_pointers_only() {
        let reg = registry();
        assert!(can_implicitly_convert(DataType::NULL, DataType::STRING, &reg));
        assert!(can_implicitly_convert(DataType::NULL, DataType::INT32.pointer_to(), &reg));
        assert!(find_conversion(DataType::NULL, DataType::INT32, &reg).is_none());
    }

    #[test]
    fn constant_narrowing_requires_a_constant() {
        let reg = registry();
        let byte = ty(primitives::UINT8);
        assert!(!can_implicitly_convert(DataType::INT32, byte, &reg));
        let five = Constant::int(5);
        let conv = find_implicit_conversion_from(DataType::INT32, Some(&five), byte, &reg).unwrap();
        assert_eq!(conv.kind, ConversionKind::ImplicitConstant);
        let big = Constant::int(300);
        assert!(find_implicit_conversion_from(DataType::INT32, Some(&big), byte, &reg).is_none());
    }

    #[test]
    fn zero_converts_to_enum() {
        let mut reg = registry();
        let color = reg.define_enum("Color", primitives::INT32).member("Red", 0).build().unwrap();
        let zero = Constant::int(0);
        let conv =
            find_implicit_conversion_from(DataType::INT32, Some(&zero), ty(color), &reg).unwrap();
        assert_eq!(conv.kind, ConversionKind::ZeroToEnum);
        let one = Constant::int(1);
        assert!(find_implicit_conversion_from(DataType::INT32, Some(&one), ty(color), &reg).is_none());
    }

    #[test]
    fn enum_conversions_are_explicit() {
        let mut reg = registry();
        let color = reg.define_enum("Color", primitives::UINT8).build().unwrap();
        let conv = find_conversion(ty(color), DataType::INT32, &reg).unwrap();
        assert!(!conv.is_implicit);
        assert_eq!(
            conv.kind,
            ConversionKind::Enumeration {
                from: primitives::UINT8,
                to: primitives::INT32
            }
        );
    }

    #[test]
    fn better_target_prefers_long_over_double_for_int() {
        let reg = registry();
        let double = ty(primitives::DOUBLE);
        assert_eq!(better_target(DataType::INT64, double, &reg), Better::First);
        assert_eq!(better_target(double, DataType::INT64, &reg), Better::Second);
    }

    #[test]
    fn better_target_prefers_signed() {
        let reg = registry();
        let short = ty(primitives::INT16);
        let ushort = ty(primitives::UINT16);
        assert_eq!(better_target(short, ushort, &reg), Better::First);
        assert_eq!(better_target(DataType::STRING, DataType::INT32, &reg), Better::Neither);
    }

    #[test]
    fn array_index_types() {
        let reg = registry();
        assert_eq!(array_index_type(ty(primitives::UINT8), None, &reg), Some(DataType::INT32));
        assert_eq!(array_index_type(ty(primitives::UINT32), None, &reg), Some(ty(primitives::UINT32)));
        assert_eq!(array_index_type(ty(primitives::UINT64), None, &reg), Some(ty(primitives::UINT64)));
        assert_eq!(array_index_type(ty(primitives::DOUBLE), None, &reg), None);
    }

    #[test]
    fn decimal_widening_is_numeric() {
        let reg = registry();
        let decimal = ty(primitives::DECIMAL);
        let conv = find_conversion(DataType::INT32, decimal, &reg).unwrap();
        assert!(conv.is_implicit);
        assert!(matches!(conv.kind, ConversionKind::Numeric { .. }));
        assert!(!find_conversion(ty(primitives::DOUBLE), decimal, &reg).unwrap().is_implicit);
    }
}
