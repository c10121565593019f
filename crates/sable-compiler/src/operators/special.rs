//! Operators with dedicated typing rules: enums, pointers, delegates and
//! reference equality.

use sable_core::{CompilationError, DataType, Span, TypeSystem, primitives};

use super::{BinaryOp, Operand};
use crate::conversion::{array_index_type, find_implicit_conversion_from, find_reference_conversion};

type Result<T> = std::result::Result<T, CompilationError>;

/// How an operator applies to enum operands.
///
/// The operation runs on `underlying`; operands convert to `left`/`right`
/// first and the result is typed `result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumRule {
    pub left: DataType,
    pub right: DataType,
    pub result: DataType,
    pub underlying: DataType,
}

/// Enum operators:
///
/// - `E == E`, `E < E` and the other comparisons yield `bool`
/// - `E & E`, `E | E`, `E ^ E` yield `E`
/// - `E + U`, `U + E` and `E - U` yield `E`
/// - `E - E` yields `U`; the right operand must be typed `E`
///
/// `U` is the underlying type. The constant `0` converts to any enum.
pub fn enum_binary_rule(
    op: BinaryOp,
    left: Operand<'_>,
    right: Operand<'_>,
    types: &dyn TypeSystem,
) -> Option<EnumRule> {
    let left_enum = types.is_enum(left.ty).then_some(left.ty);
    let right_enum = types.is_enum(right.ty).then_some(right.ty);
    let converts = |operand: Operand<'_>, target: DataType| {
        find_implicit_conversion_from(operand.ty, operand.constant, target, types)
            .is_some_and(|c| !c.is_user_defined())
    };

    // The enum both operands can be treated as, if any.
    let shared = match (left_enum, right_enum) {
        (Some(l), Some(r)) if l == r => Some(l),
        (Some(_), Some(_)) => return None,
        (Some(e), None) if converts(right, e) => Some(e),
        (None, Some(e)) if converts(left, e) => Some(e),
        _ => None,
    };

    if let Some(e) = shared {
        let underlying = types.enum_underlying(e)?;
        let result = if op.is_comparison() {
            DataType::BOOL
        } else if op.is_bitwise() {
            e
        } else if op == BinaryOp::Subtraction && right_enum.is_some() {
            underlying
        } else if matches!(op, BinaryOp::Addition | BinaryOp::Subtraction) {
            // `E + 0`, `E - 0`: the zero is an offset.
            return offset_rule(op, left, right, left_enum, right_enum, types);
        } else {
            return None;
        };
        return Some(EnumRule {
            left: e,
            right: e,
            result,
            underlying,
        });
    }

    offset_rule(op, left, right, left_enum, right_enum, types)
}

/// `E + U`, `U + E`, `E - U`.
fn offset_rule(
    op: BinaryOp,
    left: Operand<'_>,
    right: Operand<'_>,
    left_enum: Option<DataType>,
    right_enum: Option<DataType>,
    types: &dyn TypeSystem,
) -> Option<EnumRule> {
    let converts = |operand: Operand<'_>, target: DataType| {
        find_implicit_conversion_from(operand.ty, operand.constant, target, types)
            .is_some_and(|c| !c.is_user_defined())
    };
    match (op, left_enum, right_enum) {
        (BinaryOp::Addition | BinaryOp::Subtraction, Some(e), None) => {
            let underlying = types.enum_underlying(e)?;
            converts(right, underlying).then_some(EnumRule {
                left: e,
                right: underlying,
                result: e,
                underlying,
            })
        }
        (BinaryOp::Addition, None, Some(e)) => {
            let underlying = types.enum_underlying(e)?;
            converts(left, underlying).then_some(EnumRule {
                left: underlying,
                right: e,
                result: e,
                underlying,
            })
        }
        _ => None,
    }
}

/// How an operator applies to pointer operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRule {
    /// `p + n`, `n + p`, `p - n`: the integral operand is converted to
    /// `offset`, scaled by the element size and added to the address.
    Offset {
        pointer: DataType,
        offset: DataType,
        pointer_on_left: bool,
        element_size: u32,
    },
    /// `p - q`: the byte distance divided by the element size, as `long`.
    Difference { element_size: u32 },
    /// Address comparison; unsigned.
    Comparison,
}

/// Pointer arithmetic and comparison.
///
/// `Ok(None)` when neither operand is a pointer or the operator has no
/// pointer form. Arithmetic on `void*` is an error.
pub fn pointer_binary_rule(
    op: BinaryOp,
    left: Operand<'_>,
    right: Operand<'_>,
    types: &dyn TypeSystem,
    span: Span,
) -> Result<Option<PointerRule>> {
    let (lp, rp) = (left.ty.is_pointer(), right.ty.is_pointer());
    if !lp && !rp {
        return Ok(None);
    }

    if op.is_comparison() {
        let pointer_or_null = |ty: DataType| ty.is_pointer() || ty.is(primitives::NULL);
        return Ok((pointer_or_null(left.ty) && pointer_or_null(right.ty))
            .then_some(PointerRule::Comparison));
    }

    if !matches!(op, BinaryOp::Addition | BinaryOp::Subtraction) {
        return Ok(None);
    }

    let element_size = |pointer: DataType| -> Result<Option<u32>> {
        if pointer.is_void_pointer() {
            return Err(CompilationError::VoidPointerOperation { span });
        }
        Ok(pointer.element_type().and_then(|e| types.size_of(e)))
    };

    match (lp, rp) {
        (true, true) if op == BinaryOp::Subtraction => {
            if left.ty != right.ty {
                return Ok(None);
            }
            Ok(element_size(left.ty)?.map(|element_size| PointerRule::Difference { element_size }))
        }
        (true, false) => {
            let Some(offset) = array_index_type(right.ty, right.constant, types) else {
                return Ok(None);
            };
            Ok(element_size(left.ty)?.map(|element_size| PointerRule::Offset {
                pointer: left.ty,
                offset,
                pointer_on_left: true,
                element_size,
            }))
        }
        (false, true) if op == BinaryOp::Addition => {
            let Some(offset) = array_index_type(left.ty, left.constant, types) else {
                return Ok(None);
            };
            Ok(element_size(right.ty)?.map(|element_size| PointerRule::Offset {
                pointer: right.ty,
                offset,
                pointer_on_left: false,
                element_size,
            }))
        }
        _ => Ok(None),
    }
}

/// Delegate combination (`+`) and removal (`-`) on two operands of the same
/// delegate type. Returns the delegate type.
pub fn delegate_binary_rule(
    op: BinaryOp,
    left: DataType,
    right: DataType,
    types: &dyn TypeSystem,
) -> Option<DataType> {
    if !matches!(op, BinaryOp::Addition | BinaryOp::Subtraction) {
        return None;
    }
    let delegate = if types.is_delegate(left) {
        left
    } else {
        right
    };
    let matches = |ty: DataType| ty == delegate || ty.is(primitives::NULL);
    (types.is_delegate(delegate) && matches(left) && matches(right)).then_some(delegate)
}

/// Whether `==`/`!=` may compare the operands as references.
///
/// Both must be reference types (or `null`) with a reference conversion in
/// one direction.
pub fn is_reference_equality(left: DataType, right: DataType, types: &dyn TypeSystem) -> bool {
    let is_null = |ty: DataType| ty.is(primitives::NULL);
    let reference = |ty: DataType| is_null(ty) || types.is_reference_type(ty);
    if !reference(left) || !reference(right) {
        return false;
    }
    if is_null(left) || is_null(right) || left == right {
        return true;
    }
    find_reference_conversion(left, right, types).is_some()
        || find_reference_conversion(right, left, types).is_some()
}
