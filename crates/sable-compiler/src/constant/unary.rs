//! Unary constant folding.

use ordered_float::OrderedFloat;
use sable_core::{CompilationError, Span, TypeSystem};

use super::{ConstValue, Constant};
use crate::operators::UnaryOp;

type Result<T> = std::result::Result<T, CompilationError>;

/// `2147483648`, the only uint literal whose negation is an int.
const INT_MIN_MAGNITUDE: u32 = 1 << 31;
/// `9223372036854775808`, the only ulong literal whose negation is a long.
const LONG_MIN_MAGNITUDE: u64 = 1 << 63;

/// Small integral values widen to `int` before any unary operator applies.
fn promote(value: &ConstValue) -> ConstValue {
    match *value {
        ConstValue::SByte(v) => ConstValue::Int(v as i32),
        ConstValue::Byte(v) => ConstValue::Int(v as i32),
        ConstValue::Short(v) => ConstValue::Int(v as i32),
        ConstValue::UShort(v) => ConstValue::Int(v as i32),
        ConstValue::Char(v) => ConstValue::Int(v as i32),
        ref other => other.clone(),
    }
}

/// Fold `op constant`.
///
/// Returns `Ok(None)` when the operator does not apply to the constant's
/// type; the caller then reports or falls through to user operators.
pub fn fold_unary(
    op: UnaryOp,
    constant: &Constant,
    checked: bool,
    span: Span,
    types: &dyn TypeSystem,
) -> Result<Option<Constant>> {
    if types.is_enum(constant.ty) {
        // Only `~` applies to enum values; the result keeps the enum type.
        if op != UnaryOp::OnesComplement {
            return Ok(None);
        }
        let value = match constant.value {
            ConstValue::SByte(v) => ConstValue::SByte(!v),
            ConstValue::Byte(v) => ConstValue::Byte(!v),
            ConstValue::Short(v) => ConstValue::Short(!v),
            ConstValue::UShort(v) => ConstValue::UShort(!v),
            ConstValue::Int(v) => ConstValue::Int(!v),
            ConstValue::UInt(v) => ConstValue::UInt(!v),
            ConstValue::Long(v) => ConstValue::Long(!v),
            ConstValue::ULong(v) => ConstValue::ULong(!v),
            _ => return Ok(None),
        };
        return Ok(Some(Constant::with_type(value, constant.ty)));
    }
    if !constant.ty.is_named() {
        return Ok(None);
    }

    let overflow = || CompilationError::CompileTimeOverflow { span };
    let literal = constant.is_literal;
    let promoted = promote(&constant.value);

    let (value, is_literal) = match op {
        UnaryOp::Plus => match promoted {
            ConstValue::Bool(_) | ConstValue::String(_) | ConstValue::Null => return Ok(None),
            other => (other, false),
        },
        UnaryOp::Minus => match promoted {
            ConstValue::Int(v) => match v.checked_neg() {
                Some(n) => (ConstValue::Int(n), false),
                None if checked => return Err(overflow()),
                None => (ConstValue::Int(v), false),
            },
            ConstValue::UInt(INT_MIN_MAGNITUDE) if literal => (ConstValue::Int(i32::MIN), true),
            ConstValue::UInt(v) => (ConstValue::Long(-(v as i64)), literal),
            ConstValue::Long(v) => match v.checked_neg() {
                Some(n) => (ConstValue::Long(n), false),
                None if checked => return Err(overflow()),
                None => (ConstValue::Long(v), false),
            },
            ConstValue::ULong(LONG_MIN_MAGNITUDE) if literal => (ConstValue::Long(i64::MIN), true),
            ConstValue::Float(v) => (ConstValue::Float(OrderedFloat(-v.0)), false),
            ConstValue::Double(v) => (ConstValue::Double(OrderedFloat(-v.0)), false),
            ConstValue::Decimal(d) => (ConstValue::Decimal(d.neg()), false),
            _ => return Ok(None),
        },
        UnaryOp::LogicalNot => match promoted {
            ConstValue::Bool(b) => (ConstValue::Bool(!b), false),
            _ => return Ok(None),
        },
        UnaryOp::OnesComplement => match promoted {
            ConstValue::Int(v) => (ConstValue::Int(!v), false),
            ConstValue::UInt(v) => (ConstValue::UInt(!v), false),
            ConstValue::Long(v) => (ConstValue::Long(!v), false),
            ConstValue::ULong(v) => (ConstValue::ULong(!v), false),
            _ => return Ok(None),
        },
    };

    let mut folded = Constant::new(value);
    folded.is_literal = is_literal;
    Ok(Some(folded))
}
