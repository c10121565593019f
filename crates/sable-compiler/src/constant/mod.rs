//! Compile-time constants.
//!
//! A [`Constant`] is an immutable typed value. Folding consumes constants and
//! produces new ones:
//!
//! - [`convert`] - implicit constant-expression and explicit conversions
//! - [`fold`] - binary operator folding with the checked/unchecked policy
//! - [`unary`] - unary operator folding, including the literal negation rules
//!
//! An enum constant keeps the value variant of its underlying type and
//! carries the enum as its type.

mod convert;
mod decimal;
mod fold;
mod unary;

use std::fmt;

use ordered_float::OrderedFloat;
use sable_core::{DataType, MemberConstant, TypeHash, TypeSystem, primitives};

pub use convert::{convert_constant, implicit_constant_conversion};
pub use decimal::Decimal;
pub use fold::fold_binary;
pub use unary::fold_unary;

/// A constant value. Each variant determines its natural type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Bool(bool),
    /// A UTF-16 code unit.
    Char(u16),
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Decimal(Decimal),
    String(String),
    Null,
}

impl ConstValue {
    /// The type a value of this variant has when it is not an enum member.
    pub fn natural_type(&self) -> DataType {
        DataType::simple(match self {
            ConstValue::Bool(_) => primitives::BOOL,
            ConstValue::Char(_) => primitives::CHAR,
            ConstValue::SByte(_) => primitives::INT8,
            ConstValue::Byte(_) => primitives::UINT8,
            ConstValue::Short(_) => primitives::INT16,
            ConstValue::UShort(_) => primitives::UINT16,
            ConstValue::Int(_) => primitives::INT32,
            ConstValue::UInt(_) => primitives::UINT32,
            ConstValue::Long(_) => primitives::INT64,
            ConstValue::ULong(_) => primitives::UINT64,
            ConstValue::Float(_) => primitives::FLOAT,
            ConstValue::Double(_) => primitives::DOUBLE,
            ConstValue::Decimal(_) => primitives::DECIMAL,
            ConstValue::String(_) => primitives::STRING,
            ConstValue::Null => primitives::NULL,
        })
    }

    /// Integral value widened to `i128`. `None` for non-integral values.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match *self {
            ConstValue::Char(v) => v as i128,
            ConstValue::SByte(v) => v as i128,
            ConstValue::Byte(v) => v as i128,
            ConstValue::Short(v) => v as i128,
            ConstValue::UShort(v) => v as i128,
            ConstValue::Int(v) => v as i128,
            ConstValue::UInt(v) => v as i128,
            ConstValue::Long(v) => v as i128,
            ConstValue::ULong(v) => v as i128,
            _ => return None,
        })
    }

    /// Numeric value as a double, for float targets and range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Float(v) => Some(v.0 as f64),
            ConstValue::Double(v) => Some(v.0),
            ConstValue::Decimal(d) => Some(d.to_f64()),
            other => other.as_integer().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the default value of its type (`0`, `false`, `null`).
    ///
    /// Negative zero is not a default value.
    pub fn is_default(&self) -> bool {
        match self {
            ConstValue::Bool(b) => !b,
            ConstValue::Float(v) => v.0.to_bits() == 0,
            ConstValue::Double(v) => v.0.to_bits() == 0,
            ConstValue::Decimal(d) => d.is_zero(),
            ConstValue::String(_) => false,
            ConstValue::Null => true,
            other => other.as_integer() == Some(0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_integer() == Some(0)
            || matches!(self, ConstValue::Float(v) if v.0 == 0.0)
            || matches!(self, ConstValue::Double(v) if v.0 == 0.0)
            || matches!(self, ConstValue::Decimal(d) if d.is_zero())
    }

    /// Little-endian storage bytes for array initializer blobs.
    pub fn to_le_bytes(&self) -> Option<Vec<u8>> {
        Some(match *self {
            ConstValue::Bool(b) => vec![b as u8],
            ConstValue::Char(v) => v.to_le_bytes().to_vec(),
            ConstValue::SByte(v) => v.to_le_bytes().to_vec(),
            ConstValue::Byte(v) => vec![v],
            ConstValue::Short(v) => v.to_le_bytes().to_vec(),
            ConstValue::UShort(v) => v.to_le_bytes().to_vec(),
            ConstValue::Int(v) => v.to_le_bytes().to_vec(),
            ConstValue::UInt(v) => v.to_le_bytes().to_vec(),
            ConstValue::Long(v) => v.to_le_bytes().to_vec(),
            ConstValue::ULong(v) => v.to_le_bytes().to_vec(),
            ConstValue::Float(v) => v.0.to_le_bytes().to_vec(),
            ConstValue::Double(v) => v.0.to_le_bytes().to_vec(),
            _ => return None,
        })
    }

    /// Build an integral value of type `hash`, or `None` if out of range.
    pub fn integral(hash: TypeHash, value: i128) -> Option<ConstValue> {
        Some(match hash {
            primitives::INT8 => ConstValue::SByte(i8::try_from(value).ok()?),
            primitives::UINT8 => ConstValue::Byte(u8::try_from(value).ok()?),
            primitives::INT16 => ConstValue::Short(i16::try_from(value).ok()?),
            primitives::UINT16 => ConstValue::UShort(u16::try_from(value).ok()?),
            primitives::CHAR => ConstValue::Char(u16::try_from(value).ok()?),
            primitives::INT32 => ConstValue::Int(i32::try_from(value).ok()?),
            primitives::UINT32 => ConstValue::UInt(u32::try_from(value).ok()?),
            primitives::INT64 => ConstValue::Long(i64::try_from(value).ok()?),
            primitives::UINT64 => ConstValue::ULong(u64::try_from(value).ok()?),
            _ => return None,
        })
    }

    /// Build an integral value of type `hash`, truncating to its width.
    pub fn integral_wrapping(hash: TypeHash, value: i128) -> Option<ConstValue> {
        Some(match hash {
            primitives::INT8 => ConstValue::SByte(value as i8),
            primitives::UINT8 => ConstValue::Byte(value as u8),
            primitives::INT16 => ConstValue::Short(value as i16),
            primitives::UINT16 => ConstValue::UShort(value as u16),
            primitives::CHAR => ConstValue::Char(value as u16),
            primitives::INT32 => ConstValue::Int(value as i32),
            primitives::UINT32 => ConstValue::UInt(value as u32),
            primitives::INT64 => ConstValue::Long(value as i64),
            primitives::UINT64 => ConstValue::ULong(value as u64),
            _ => return None,
        })
    }

    /// Value of a `const` field or enum member stored with type `ty`.
    ///
    /// Enum members are stored in the enum's underlying type.
    pub fn from_member(
        member: &MemberConstant,
        ty: DataType,
        types: &dyn TypeSystem,
    ) -> Option<ConstValue> {
        let storage = types.enum_underlying(ty).unwrap_or(ty);
        let hash = storage.type_hash;
        match member {
            MemberConstant::Bool(b) => Some(ConstValue::Bool(*b)),
            MemberConstant::Char(c) => Some(ConstValue::Char(*c)),
            MemberConstant::Int(v) => Self::numeric_from_i128(hash, *v as i128),
            MemberConstant::UInt(v) => Self::numeric_from_i128(hash, *v as i128),
            MemberConstant::Float(v) => match hash {
                primitives::FLOAT => Some(ConstValue::Float(OrderedFloat(*v as f32))),
                primitives::DECIMAL => Decimal::from_f64(*v).map(ConstValue::Decimal),
                _ => Some(ConstValue::Double(OrderedFloat(*v))),
            },
            MemberConstant::String(s) => Some(ConstValue::String(s.clone())),
            MemberConstant::Null => Some(ConstValue::Null),
        }
    }

    fn numeric_from_i128(hash: TypeHash, value: i128) -> Option<ConstValue> {
        match hash {
            primitives::FLOAT => Some(ConstValue::Float(OrderedFloat(value as f32))),
            primitives::DOUBLE => Some(ConstValue::Double(OrderedFloat(value as f64))),
            primitives::DECIMAL => Decimal::from_i128(value).map(ConstValue::Decimal),
            _ => Self::integral(hash, value),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Char(c) => match char::from_u32(*c as u32) {
                Some(ch) => write!(f, "{ch}"),
                None => write!(f, "\\u{c:04x}"),
            },
            ConstValue::Float(v) => write!(f, "{}", v.0),
            ConstValue::Double(v) => write!(f, "{}", v.0),
            ConstValue::Decimal(d) => write!(f, "{d}"),
            ConstValue::String(s) => write!(f, "{s}"),
            ConstValue::Null => f.write_str("null"),
            other => match other.as_integer() {
                Some(v) => write!(f, "{v}"),
                None => Ok(()),
            },
        }
    }
}

/// A typed constant.
///
/// `ty` differs from the value's natural type for enum constants and for
/// `null` converted to a reference type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: ConstValue,
    pub ty: DataType,
    /// Written directly in source rather than computed.
    pub is_literal: bool,
}

impl Constant {
    /// A literal of the value's natural type.
    pub fn literal(value: ConstValue) -> Self {
        let ty = value.natural_type();
        Self {
            value,
            ty,
            is_literal: true,
        }
    }

    /// A computed constant of the value's natural type.
    pub fn new(value: ConstValue) -> Self {
        let ty = value.natural_type();
        Self {
            value,
            ty,
            is_literal: false,
        }
    }

    pub fn with_type(value: ConstValue, ty: DataType) -> Self {
        Self {
            value,
            ty,
            is_literal: false,
        }
    }

    pub fn int(value: i32) -> Self {
        Self::literal(ConstValue::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::literal(ConstValue::Bool(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(ConstValue::String(value.into()))
    }

    pub fn null() -> Self {
        Self::literal(ConstValue::Null)
    }

    pub fn is_null(&self) -> bool {
        self.value == ConstValue::Null
    }

    /// The constant with its enum type stripped.
    pub fn underlying(&self) -> Constant {
        Constant {
            ty: self.value.natural_type(),
            ..self.clone()
        }
    }
}
