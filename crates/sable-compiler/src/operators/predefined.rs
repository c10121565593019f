//! Predefined operator signatures.
//!
//! Each operator has a fixed list of candidate signatures. A candidate is
//! applicable when every operand converts implicitly to its parameter type;
//! the best applicable candidate must be better than every other one for at
//! least one operand and worse for none, otherwise the operator is ambiguous.

use sable_core::{CompilationError, DataType, Span, TypeHash, TypeSystem, primitives};

use super::{BinaryOp, Operand, UnaryOp};
use crate::bytecode::OpCode;
use crate::conversion::{Better, better_conversion_target, find_implicit_conversion_from};

type Result<T> = std::result::Result<T, CompilationError>;

/// A selected predefined binary operator: operands convert to `left` and
/// `right`, the operation yields `result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedBinary {
    pub left: DataType,
    pub right: DataType,
    pub result: DataType,
}

impl PredefinedBinary {
    /// `+` with a string operand.
    pub fn is_string_concat(&self) -> bool {
        self.result.is(primitives::STRING)
    }

    /// Operators on `decimal` are calls to its operator methods.
    pub fn is_decimal(&self) -> bool {
        self.left.is(primitives::DECIMAL)
    }

    /// String `==`/`!=` compare by value through `string.op_Equality`.
    pub fn is_string_equality(&self) -> bool {
        self.left.is(primitives::STRING) && self.result.is(primitives::BOOL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedUnary {
    pub operand: DataType,
    pub result: DataType,
}

const NUMERIC: [TypeHash; 7] = [
    primitives::INT32,
    primitives::UINT32,
    primitives::INT64,
    primitives::UINT64,
    primitives::FLOAT,
    primitives::DOUBLE,
    primitives::DECIMAL,
];

const INTEGRAL: [TypeHash; 4] = [
    primitives::INT32,
    primitives::UINT32,
    primitives::INT64,
    primitives::UINT64,
];

fn same(hashes: &[TypeHash], result: Option<DataType>) -> Vec<[DataType; 3]> {
    hashes
        .iter()
        .map(|&h| {
            let ty = DataType::simple(h);
            [ty, ty, result.unwrap_or(ty)]
        })
        .collect()
}

fn binary_candidates(op: BinaryOp) -> Vec<[DataType; 3]> {
    use BinaryOp::*;
    let bool_ty = DataType::BOOL;
    let string = DataType::STRING;
    let object = DataType::OBJECT;
    match op {
        Addition => {
            let mut list = same(&NUMERIC, None);
            list.extend([
                [string, string, string],
                [string, object, string],
                [object, string, string],
            ]);
            list
        }
        Subtraction | Multiply | Division | Modulus => same(&NUMERIC, None),
        LeftShift | RightShift => INTEGRAL
            .iter()
            .map(|&h| [DataType::simple(h), DataType::INT32, DataType::simple(h)])
            .collect(),
        LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => {
            same(&NUMERIC, Some(bool_ty))
        }
        Equality | Inequality => {
            let mut list = same(&NUMERIC, Some(bool_ty));
            list.push([bool_ty, bool_ty, bool_ty]);
            list.push([string, string, bool_ty]);
            list
        }
        BitwiseAnd | BitwiseOr | ExclusiveOr => {
            let mut list = same(&INTEGRAL, None);
            list.push([bool_ty, bool_ty, bool_ty]);
            list
        }
        LogicalAnd | LogicalOr => vec![[bool_ty, bool_ty, bool_ty]],
    }
}

fn unary_candidates(op: UnaryOp) -> Vec<DataType> {
    use primitives::*;
    let hashes: &[TypeHash] = match op {
        UnaryOp::Plus => &NUMERIC,
        UnaryOp::Minus => &[INT32, INT64, FLOAT, DOUBLE, DECIMAL],
        UnaryOp::LogicalNot => &[BOOL],
        UnaryOp::OnesComplement => &INTEGRAL,
    };
    hashes.iter().copied().map(DataType::simple).collect()
}

enum Selection {
    Found(usize),
    NotFound,
    Ambiguous,
}

/// Pick the best of `candidates` (parameter lists) for `operands`.
fn select(candidates: &[&[DataType]], operands: &[Operand<'_>], types: &dyn TypeSystem) -> Selection {
    let applicable: Vec<(usize, Vec<_>)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, params)| {
            let conversions: Option<Vec<_>> = operands
                .iter()
                .zip(params.iter())
                .map(|(operand, &param)| {
                    find_implicit_conversion_from(operand.ty, operand.constant, param, types)
                        .filter(|c| !c.is_user_defined())
                })
                .collect();
            conversions.map(|c| (i, c))
        })
        .collect();

    if applicable.is_empty() {
        return Selection::NotFound;
    }

    // Unrelated targets (float and decimal) leave neither candidate better.
    let better = |a: &(usize, Vec<_>), b: &(usize, Vec<_>)| {
        let mut any_better = false;
        for (k, operand) in operands.iter().enumerate() {
            match better_conversion_target(operand.ty, candidates[a.0][k], candidates[b.0][k], types) {
                Better::First => any_better = true,
                Better::Second => return false,
                Better::Neither => {}
            }
        }
        any_better
    };

    for candidate in &applicable {
        if applicable
            .iter()
            .all(|other| other.0 == candidate.0 || better(candidate, other))
        {
            return Selection::Found(candidate.0);
        }
    }
    Selection::Ambiguous
}

/// Select the predefined binary operator for the operands.
///
/// `Ok(None)` when no predefined signature applies.
pub fn resolve_predefined_binary(
    op: BinaryOp,
    left: Operand<'_>,
    right: Operand<'_>,
    types: &dyn TypeSystem,
    span: Span,
) -> Result<Option<PredefinedBinary>> {
    let candidates = binary_candidates(op);
    let params: Vec<&[DataType]> = candidates.iter().map(|c| &c[..2]).collect();
    match select(&params, &[left, right], types) {
        Selection::Found(i) => {
            let [l, r, result] = candidates[i];
            Ok(Some(PredefinedBinary {
                left: l,
                right: r,
                result,
            }))
        }
        Selection::NotFound => Ok(None),
        Selection::Ambiguous => Err(CompilationError::AmbiguousOperator {
            op: op.symbol().to_string(),
            operands: format!(
                "'{}' and '{}'",
                types.type_name(left.ty),
                types.type_name(right.ty)
            ),
            span,
        }),
    }
}

/// Select the predefined unary operator for the operand.
pub fn resolve_predefined_unary(
    op: UnaryOp,
    operand: Operand<'_>,
    types: &dyn TypeSystem,
    span: Span,
) -> Result<Option<PredefinedUnary>> {
    // Negating a ulong has no signed result type to widen to.
    if op == UnaryOp::Minus && operand.ty.is(primitives::UINT64) {
        return Ok(None);
    }
    let candidates = unary_candidates(op);
    let params: Vec<&[DataType]> = candidates.iter().map(std::slice::from_ref).collect();
    match select(&params, &[operand], types) {
        Selection::Found(i) => Ok(Some(PredefinedUnary {
            operand: candidates[i],
            result: candidates[i],
        })),
        Selection::NotFound => Ok(None),
        Selection::Ambiguous => Err(CompilationError::AmbiguousOperator {
            op: op.symbol().to_string(),
            operands: format!("'{}'", types.type_name(operand.ty)),
            span,
        }),
    }
}

// ============================================================================
// Instruction selection
// ============================================================================

/// The instruction for an arithmetic, shift or bitwise operator on values of
/// type `operand`.
pub fn arithmetic_opcode(op: BinaryOp, operand: DataType, checked: bool) -> Option<OpCode> {
    use BinaryOp::*;
    let unsigned = operand.is_unsigned() || operand.is_pointer();
    let overflow = checked && operand.is_integral();
    Some(match op {
        Addition if overflow && unsigned => OpCode::AddOvfUn,
        Addition if overflow => OpCode::AddOvf,
        Addition => OpCode::Add,
        Subtraction if overflow && unsigned => OpCode::SubOvfUn,
        Subtraction if overflow => OpCode::SubOvf,
        Subtraction => OpCode::Sub,
        Multiply if overflow && unsigned => OpCode::MulOvfUn,
        Multiply if overflow => OpCode::MulOvf,
        Multiply => OpCode::Mul,
        Division if unsigned => OpCode::DivUn,
        Division => OpCode::Div,
        Modulus if unsigned => OpCode::RemUn,
        Modulus => OpCode::Rem,
        LeftShift => OpCode::Shl,
        RightShift if unsigned => OpCode::ShrUn,
        RightShift => OpCode::Shr,
        BitwiseAnd | LogicalAnd => OpCode::And,
        BitwiseOr | LogicalOr => OpCode::Or,
        ExclusiveOr => OpCode::Xor,
        _ => return None,
    })
}

/// Instructions leaving the boolean result of a comparison on the stack.
pub fn comparison_opcodes(op: BinaryOp, operand: DataType) -> Vec<OpCode> {
    use BinaryOp::*;
    let unsigned = operand.is_unsigned() || operand.is_pointer();
    let floating = operand.is_floating();
    // For `<=` and `>=` NaN must compare false, so the inverted test uses the
    // unordered form on floats.
    let (gt_inverted, lt_inverted) = if unsigned || floating {
        (OpCode::CgtUn, OpCode::CltUn)
    } else {
        (OpCode::Cgt, OpCode::Clt)
    };
    match op {
        Equality => vec![OpCode::Ceq],
        Inequality => vec![OpCode::Ceq, OpCode::PushFalse, OpCode::Ceq],
        LessThan if unsigned => vec![OpCode::CltUn],
        LessThan => vec![OpCode::Clt],
        GreaterThan if unsigned => vec![OpCode::CgtUn],
        GreaterThan => vec![OpCode::Cgt],
        LessThanOrEqual => vec![gt_inverted, OpCode::PushFalse, OpCode::Ceq],
        GreaterThanOrEqual => vec![lt_inverted, OpCode::PushFalse, OpCode::Ceq],
        _ => Vec::new(),
    }
}

/// The conditional branch taken when the comparison is `on_true`.
pub fn comparison_branch(op: BinaryOp, operand: DataType, on_true: bool) -> Option<OpCode> {
    use BinaryOp::*;
    let unsigned = operand.is_unsigned() || operand.is_pointer();
    let branch = match op {
        Equality => OpCode::Beq,
        Inequality => OpCode::BneUn,
        LessThan if unsigned => OpCode::BltUn,
        LessThan => OpCode::Blt,
        GreaterThan if unsigned => OpCode::BgtUn,
        GreaterThan => OpCode::Bgt,
        LessThanOrEqual if unsigned => OpCode::BleUn,
        LessThanOrEqual => OpCode::Ble,
        GreaterThanOrEqual if unsigned => OpCode::BgeUn,
        GreaterThanOrEqual => OpCode::Bge,
        _ => return None,
    };
    if on_true {
        Some(branch)
    } else {
        branch.negate_branch(operand.is_floating())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Constant;
    use sable_registry::{TypeRegistry, ty};

    fn value(ty: DataType) -> Operand<'static> {
        Operand { ty, constant: None }
    }

    fn binary(op: BinaryOp, l: DataType, r: DataType) -> Result<Option<PredefinedBinary>> {
        let reg = TypeRegistry::with_builtins();
        resolve_predefined_binary(op, value(l), value(r), &reg, Span::SYNTHETIC)
    }

    #[test]
    fn byte_plus_byte_is_int() {
        let byte = ty(primitives::UINT8);
        let found = binary(BinaryOp::Addition, byte, byte).unwrap().unwrap();
        assert_eq!(found.result, DataType::INT32);
    }

    #[test]
    fn int_plus_uint_widens_to_long() {
        let found = binary(BinaryOp::Addition, DataType::INT32, ty(primitives::UINT32))
            .unwrap()
            .unwrap();
        assert_eq!(found.result, DataType::INT64);
    }

    #[test]
    fn uint_plus_constant_stays_uint() {
        let reg = TypeRegistry::with_builtins();
        let one = Constant::int(1);
        let found = resolve_predefined_binary(
            BinaryOp::Addition,
            value(ty(primitives::UINT32)),
            Operand {
                ty: DataType::INT32,
                constant: Some(&one),
            },
            &reg,
            Span::SYNTHETIC,
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.result, ty(primitives::UINT32));
    }

    #[test]
    fn long_plus_ulong_is_ambiguous() {
        let err = binary(BinaryOp::Addition, DataType::INT64, ty(primitives::UINT64)).unwrap_err();
        assert_eq!(err.code(), 34);
    }

    #[test]
    fn signed_plus_ulong_is_ambiguous_for_every_arithmetic_operator() {
        for op in [BinaryOp::Addition, BinaryOp::Subtraction, BinaryOp::Multiply, BinaryOp::LessThan] {
            for signed in [DataType::INT32, DataType::INT64, ty(primitives::INT16)] {
                let err = binary(op, signed, ty(primitives::UINT64)).unwrap_err();
                assert_eq!(err.code(), 34, "{op:?} on {signed:?}");
            }
        }
    }

    #[test]
    fn ulong_plus_uint_stays_ulong() {
        let found = binary(BinaryOp::Addition, ty(primitives::UINT64), ty(primitives::UINT32))
            .unwrap()
            .unwrap();
        assert_eq!(found.result, ty(primitives::UINT64));
    }

    #[test]
    fn long_plus_float_is_float() {
        let found = binary(BinaryOp::Addition, DataType::INT64, ty(primitives::FLOAT))
            .unwrap()
            .unwrap();
        assert_eq!(found.result, ty(primitives::FLOAT));
    }

    #[test]
    fn string_plus_int_concatenates() {
        let found = binary(BinaryOp::Addition, DataType::STRING, DataType::INT32)
            .unwrap()
            .unwrap();
        assert!(found.is_string_concat());
        assert_eq!(found.right, DataType::OBJECT);
    }

    #[test]
    fn double_plus_decimal_has_no_operator() {
        assert_eq!(
            binary(BinaryOp::Addition, ty(primitives::DOUBLE), ty(primitives::DECIMAL)).unwrap(),
            None
        );
    }

    #[test]
    fn bool_operators() {
        let found = binary(BinaryOp::LogicalAnd, DataType::BOOL, DataType::BOOL).unwrap().unwrap();
        assert_eq!(found.result, DataType::BOOL);
        assert_eq!(binary(BinaryOp::Addition, DataType::BOOL, DataType::BOOL).unwrap(), None);
    }

    #[test]
    fn shift_keeps_left_type() {
        let found = binary(BinaryOp::LeftShift, DataType::INT64, DataType::INT32).unwrap().unwrap();
        assert_eq!(found.result, DataType::INT64);
        assert_eq!(found.right, DataType::INT32);
    }

    #[test]
    fn unary_minus_on_uint_widens_and_ulong_fails() {
        let reg = TypeRegistry::with_builtins();
        let found = resolve_predefined_unary(UnaryOp::Minus, value(ty(primitives::UINT32)), &reg, Span::SYNTHETIC)
            .unwrap()
            .unwrap();
        assert_eq!(found.result, DataType::INT64);
        assert_eq!(
            resolve_predefined_unary(UnaryOp::Minus, value(ty(primitives::UINT64)), &reg, Span::SYNTHETIC).unwrap(),
            None
        );
    }

    #[test]
    fn opcode_selection() {
        assert_eq!(arithmetic_opcode(BinaryOp::Addition, DataType::INT32, true), Some(OpCode::AddOvf));
        assert_eq!(arithmetic_opcode(BinaryOp::Addition, ty(primitives::UINT32), true), Some(OpCode::AddOvfUn));
        assert_eq!(arithmetic_opcode(BinaryOp::Addition, ty(primitives::DOUBLE), true), Some(OpCode::Add));
        assert_eq!(arithmetic_opcode(BinaryOp::Division, ty(primitives::UINT64), false), Some(OpCode::DivUn));
        assert_eq!(arithmetic_opcode(BinaryOp::LessThan, DataType::INT32, false), None);
    }

    #[test]
    fn comparison_forms() {
        assert_eq!(comparison_opcodes(BinaryOp::LessThan, ty(primitives::UINT32)), vec![OpCode::CltUn]);
        assert_eq!(
            comparison_opcodes(BinaryOp::LessThanOrEqual, DataType::INT32),
            vec![OpCode::Cgt, OpCode::PushFalse, OpCode::Ceq]
        );
        assert_eq!(comparison_branch(BinaryOp::LessThan, DataType::INT32, false), Some(OpCode::Bge));
        assert_eq!(
            comparison_branch(BinaryOp::LessThan, ty(primitives::DOUBLE), false),
            Some(OpCode::BgeUn)
        );
    }
}
