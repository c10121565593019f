//! Binary constant folding.
//!
//! Both operands have already been converted to the operator's operand type,
//! so every arm matches two values of the same variant. Shifts are the
//! exception: the count is always an `int`.

use sable_core::{CompilationError, Span};

use super::ConstValue;
use crate::operators::BinaryOp;

type Result<T> = std::result::Result<T, CompilationError>;

/// Result of a checked operation under the current overflow policy.
fn policy<T>(checked_result: Option<T>, wrapped: T, checked: bool, span: Span) -> Result<T> {
    if checked {
        checked_result.ok_or(CompilationError::CompileTimeOverflow { span })
    } else {
        Ok(wrapped)
    }
}

macro_rules! fold_integral {
    ($ctor:path, $a:expr, $b:expr, $op:expr, $checked:expr, $span:expr) => {{
        let (a, b) = ($a, $b);
        let value = match $op {
            BinaryOp::Addition => policy(a.checked_add(b), a.wrapping_add(b), $checked, $span)?,
            BinaryOp::Subtraction => policy(a.checked_sub(b), a.wrapping_sub(b), $checked, $span)?,
            BinaryOp::Multiply => policy(a.checked_mul(b), a.wrapping_mul(b), $checked, $span)?,
            BinaryOp::Division => {
                if b == 0 {
                    return Err(CompilationError::DivisionByConstantZero { span: $span });
                }
                policy(a.checked_div(b), a.wrapping_div(b), $checked, $span)?
            }
            BinaryOp::Modulus => {
                if b == 0 {
                    return Err(CompilationError::DivisionByConstantZero { span: $span });
                }
                policy(a.checked_rem(b), a.wrapping_rem(b), $checked, $span)?
            }
            BinaryOp::BitwiseAnd => a & b,
            BinaryOp::BitwiseOr => a | b,
            BinaryOp::ExclusiveOr => a ^ b,
            op if op.is_comparison() => return Ok(Some(ConstValue::Bool(compare(op, a, b)))),
            _ => return Ok(None),
        };
        Ok(Some($ctor(value)))
    }};
}

macro_rules! fold_floating {
    ($ctor:path, $a:expr, $b:expr, $op:expr) => {{
        let (a, b) = ($a, $b);
        let value = match $op {
            BinaryOp::Addition => a + b,
            BinaryOp::Subtraction => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Division => a / b,
            BinaryOp::Modulus => a % b,
            op if op.is_comparison() => return Ok(Some(ConstValue::Bool(compare_partial(op, a, b)))),
            _ => return Ok(None),
        };
        Ok(Some($ctor(value.into())))
    }};
}

fn compare<T: Ord>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Equality => a == b,
        BinaryOp::Inequality => a != b,
        BinaryOp::LessThan => a < b,
        BinaryOp::GreaterThan => a > b,
        BinaryOp::LessThanOrEqual => a <= b,
        BinaryOp::GreaterThanOrEqual => a >= b,
        _ => false,
    }
}

/// IEEE comparison: every ordered comparison with NaN is false.
fn compare_partial<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Equality => a == b,
        BinaryOp::Inequality => a != b,
        BinaryOp::LessThan => a < b,
        BinaryOp::GreaterThan => a > b,
        BinaryOp::LessThanOrEqual => a <= b,
        BinaryOp::GreaterThanOrEqual => a >= b,
        _ => false,
    }
}

/// Fold `left op right`.
///
/// Returns `Ok(None)` when the operator does not fold for these values.
/// Checked overflow fails with 220 and integer division by zero with 20.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn fold_binary(
    op: BinaryOp,
    left: &ConstValue,
    right: &ConstValue,
    checked: bool,
    span: Span,
) -> Result<Option<ConstValue>> {
    use ConstValue as V;

    if op.is_shift() {
        let V::Int(count) = *right else {
            return Ok(None);
        };
        let count = count as u32;
        let shl = op == BinaryOp::LeftShift;
        return Ok(Some(match *left {
            V::Int(a) => V::Int(if shl { a.wrapping_shl(count) } else { a.wrapping_shr(count) }),
            V::UInt(a) => V::UInt(if shl { a.wrapping_shl(count) } else { a.wrapping_shr(count) }),
            V::Long(a) => V::Long(if shl { a.wrapping_shl(count) } else { a.wrapping_shr(count) }),
            V::ULong(a) => V::ULong(if shl { a.wrapping_shl(count) } else { a.wrapping_shr(count) }),
            _ => return Ok(None),
        }));
    }

    match (left, right) {
        (V::Int(a), V::Int(b)) => fold_integral!(V::Int, *a, *b, op, checked, span),
        (V::UInt(a), V::UInt(b)) => fold_integral!(V::UInt, *a, *b, op, checked, span),
        (V::Long(a), V::Long(b)) => fold_integral!(V::Long, *a, *b, op, checked, span),
        (V::ULong(a), V::ULong(b)) => fold_integral!(V::ULong, *a, *b, op, checked, span),
        (V::Float(a), V::Float(b)) => fold_floating!(V::Float, a.0, b.0, op),
        (V::Double(a), V::Double(b)) => fold_floating!(V::Double, a.0, b.0, op),
        (V::Decimal(a), V::Decimal(b)) => {
            let (a, b) = (*a, *b);
            let overflow = CompilationError::CompileTimeOverflow { span };
            let value = match op {
                BinaryOp::Addition => a.checked_add(b),
                BinaryOp::Subtraction => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Division | BinaryOp::Modulus if b.is_zero() => {
                    return Err(CompilationError::DivisionByConstantZero { span });
                }
                BinaryOp::Division => a.checked_div(b),
                BinaryOp::Modulus => a.checked_rem(b),
                op if op.is_comparison() => return Ok(Some(V::Bool(compare(op, a, b)))),
                _ => return Ok(None),
            };
            value.map(|d| Some(V::Decimal(d))).ok_or(overflow)
        }
        (V::Bool(a), V::Bool(b)) => Ok(match op {
            BinaryOp::BitwiseAnd | BinaryOp::LogicalAnd => Some(V::Bool(*a && *b)),
            BinaryOp::BitwiseOr | BinaryOp::LogicalOr => Some(V::Bool(*a || *b)),
            BinaryOp::ExclusiveOr => Some(V::Bool(a ^ b)),
            BinaryOp::Equality => Some(V::Bool(a == b)),
            BinaryOp::Inequality => Some(V::Bool(a != b)),
            _ => None,
        }),
        (V::String(_) | V::Null, V::String(_) | V::Null) => Ok(fold_string(op, left, right)),
        _ => Ok(None),
    }
}

/// String concatenation and equality; `null` concatenates as the empty string.
fn fold_string(op: BinaryOp, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
    let text = |v: &ConstValue| match v {
        ConstValue::String(s) => Some(s.clone()),
        _ => None,
    };
    match op {
        BinaryOp::Addition => {
            let (l, r) = (text(left), text(right));
            if l.is_none() && r.is_none() {
                return None;
            }
            Some(ConstValue::String(l.unwrap_or_default() + &r.unwrap_or_default()))
        }
        BinaryOp::Equality => Some(ConstValue::Bool(left == right)),
        BinaryOp::Inequality => Some(ConstValue::Bool(left != right)),
        _ => None,
    }
}
