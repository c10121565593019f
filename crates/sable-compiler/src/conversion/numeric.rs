//! Numeric conversions between the builtin integral and floating types.

use sable_core::{TypeHash, primitives};

use crate::bytecode::OpCode;

/// Position used to rank conversion targets: narrower and signed first.
pub fn numeric_rank(hash: TypeHash) -> Option<u32> {
    Some(match hash {
        primitives::INT8 => 0,
        primitives::UINT8 => 1,
        primitives::INT16 => 2,
        primitives::UINT16 => 3,
        primitives::CHAR => 3,
        primitives::INT32 => 4,
        primitives::UINT32 => 5,
        primitives::INT64 => 6,
        primitives::UINT64 => 7,
        primitives::FLOAT => 8,
        primitives::DOUBLE => 9,
        primitives::DECIMAL => 10,
        _ => return None,
    })
}

/// The implicit numeric conversion table.
pub fn is_implicit_numeric(from: TypeHash, to: TypeHash) -> bool {
    use primitives::*;
    let targets: &[TypeHash] = match from {
        INT8 => &[INT16, INT32, INT64, FLOAT, DOUBLE, DECIMAL],
        UINT8 => &[INT16, UINT16, INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE, DECIMAL],
        INT16 => &[INT32, INT64, FLOAT, DOUBLE, DECIMAL],
        UINT16 => &[INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE, DECIMAL],
        CHAR => &[UINT16, INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE, DECIMAL],
        INT32 => &[INT64, FLOAT, DOUBLE, DECIMAL],
        UINT32 => &[INT64, UINT64, FLOAT, DOUBLE, DECIMAL],
        INT64 | UINT64 => &[FLOAT, DOUBLE, DECIMAL],
        FLOAT => &[DOUBLE],
        _ => &[],
    };
    targets.contains(&to)
}

/// Every numeric type (including `char`) converts explicitly to every other.
pub fn is_explicit_numeric(from: TypeHash, to: TypeHash) -> bool {
    primitives::is_numeric(from) && primitives::is_numeric(to)
}

/// The `decimal` conversion operator implementing a numeric conversion that
/// involves `decimal`, which has no instruction form.
pub fn decimal_conversion_method(from: TypeHash, to: TypeHash) -> Option<TypeHash> {
    if (from == primitives::DECIMAL) == (to == primitives::DECIMAL) {
        return None;
    }
    Some(TypeHash::from_conversion(
        primitives::DECIMAL,
        from,
        to,
        !is_implicit_numeric(from, to),
    ))
}

fn width(hash: TypeHash) -> u32 {
    primitives::size_of(hash).unwrap_or(0)
}

/// Instructions converting a value of `from` on the stack to `to`.
///
/// Values narrower than 32 bits live on the stack widened to `int`, so
/// widening among them is free. Decimal conversions are calls and are not
/// covered here.
pub fn numeric_conversion_ops(from: TypeHash, to: TypeHash, checked: bool) -> Vec<OpCode> {
    use primitives::*;
    if from == to {
        return Vec::new();
    }
    let unsigned_source = primitives::is_unsigned(from);

    if to == FLOAT || to == DOUBLE {
        let conv = if to == FLOAT { OpCode::ConvR4 } else { OpCode::ConvR8 };
        return if primitives::is_integral(from) && unsigned_source {
            vec![OpCode::ConvRUn, conv]
        } else {
            vec![conv]
        };
    }

    let (plain, ovf, ovf_un) = match to {
        INT8 => (OpCode::ConvI1, OpCode::ConvOvfI1, OpCode::ConvOvfI1Un),
        UINT8 => (OpCode::ConvU1, OpCode::ConvOvfU1, OpCode::ConvOvfU1Un),
        INT16 => (OpCode::ConvI2, OpCode::ConvOvfI2, OpCode::ConvOvfI2Un),
        UINT16 | CHAR => (OpCode::ConvU2, OpCode::ConvOvfU2, OpCode::ConvOvfU2Un),
        INT32 => (OpCode::ConvI4, OpCode::ConvOvfI4, OpCode::ConvOvfI4Un),
        UINT32 => (OpCode::ConvU4, OpCode::ConvOvfU4, OpCode::ConvOvfU4Un),
        INT64 => (OpCode::ConvI8, OpCode::ConvOvfI8, OpCode::ConvOvfI8Un),
        UINT64 => (OpCode::ConvU8, OpCode::ConvOvfU8, OpCode::ConvOvfU8Un),
        _ => return Vec::new(),
    };

    if primitives::is_floating(from) {
        return vec![if checked { ovf } else { plain }];
    }

    let implicit = is_implicit_numeric(from, to);
    if checked && !implicit {
        return vec![if unsigned_source { ovf_un } else { ovf }];
    }

    let (from_width, to_width) = (width(from), width(to));
    match to_width {
        8 if from_width == 8 => Vec::new(),
        // Zero- or sign-extension follows the source.
        8 => vec![if unsigned_source { OpCode::ConvU8 } else { OpCode::ConvI8 }],
        4 if from_width == 8 => vec![plain],
        4 => Vec::new(),
        _ if implicit => Vec::new(),
        _ => vec![plain],
    }
}
