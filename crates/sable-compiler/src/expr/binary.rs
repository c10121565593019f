//! Binary operators and short-circuit `&&`/`||`.
//!
//! Operator selection runs in a fixed order: user-defined operators of
//! non-predefined operand types, pointer arithmetic, enum rules, delegate
//! combination, the predefined signatures and finally reference equality.
//! Constant operands fold wherever the selected operator allows it.

use sable_core::{CompilationError, ComparisonSide, DataType, Span, Warning, primitives};

use super::invocation::{self, UserOperator};
use super::{Expr, ExprKind, implicit_conversion};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant, convert_constant, fold_binary};
use crate::context::ResolveContext;
use crate::emit::{EmitContext, Label};
use crate::operators::{
    BinaryOp, EnumRule, Operand, PredefinedBinary, UnaryOp, arithmetic_opcode, comparison_branch,
    comparison_opcodes, delegate_binary_rule, enum_binary_rule, is_reference_equality, pointer_binary_rule,
    resolve_predefined_binary, truth_operator, user_binary_candidates,
};

type Result<T> = std::result::Result<T, CompilationError>;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_binary(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    if op.is_logical() {
        return resolve_logical(op, left, right, span, rc);
    }
    let left = left.resolve_value(rc);
    let right = right.resolve_value(rc);
    let (left, right) = rc.join(left, right)?;
    resolve_operands(op, left, right, span, rc)
}

/// Select and apply the operator for two resolved values.
fn resolve_operands(op: BinaryOp, left: Expr, right: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let types = rc.types;
    let (lt, rt) = (left.data_type(), right.data_type());

    if op.is_comparison() && left.is_same_variable(&right) {
        rc.warn(Warning::SelfComparison { span });
    }

    if op.is_equality() {
        let other = if left.is_null_literal() {
            Some(&right)
        } else if right.is_null_literal() {
            Some(&left)
        } else {
            None
        };
        if let Some(other) = other {
            let ty = other.data_type();
            if other.constant().is_none() && types.is_value_type(ty) && !ty.is_pointer() {
                let result = op == BinaryOp::Inequality;
                rc.warn(Warning::ComparisonWithNullAlwaysConstant {
                    result,
                    ty: types.type_name(ty),
                    span,
                });
                let discarded = if left.is_null_literal() { right } else { left };
                return Ok(with_side_effect(Constant::with_type(ConstValue::Bool(result), DataType::BOOL), discarded, span));
            }
        }
    }

    let methods = user_binary_candidates(op, lt, rt, types);
    let (left, right) = match invocation::resolve_user_operator(&methods, vec![left, right], op.symbol(), span, rc)? {
        UserOperator::Applied(call) => return Ok(call),
        UserOperator::NotApplicable(operands) => split_pair(operands)?,
    };

    if lt.is_pointer() || rt.is_pointer() {
        if !rc.is_unsafe() {
            return Err(CompilationError::UnsafeContextRequired { span });
        }
        let rule = pointer_binary_rule(op, Operand::new(lt, left.constant()), Operand::new(rt, right.constant()), types, span)?;
        if let Some(rule) = rule {
            return super::pointer::apply_pointer_rule(op, left, right, rule, span, rc);
        }
        return Err(no_operator(op, lt, rt, span, rc));
    }

    if let Some(rule) = enum_binary_rule(op, Operand::new(lt, left.constant()), Operand::new(rt, right.constant()), types) {
        return apply_enum_rule(op, left, right, rule, span, rc);
    }

    if let Some(delegate) = delegate_binary_rule(op, lt, rt, types) {
        return combine_delegates(op, left, right, delegate, span, rc);
    }

    let selected = resolve_predefined_binary(op, Operand::new(lt, left.constant()), Operand::new(rt, right.constant()), types, span)?;
    if let Some(selected) = selected {
        return apply_predefined(op, left, right, selected, span, rc);
    }

    if op.is_equality() && is_reference_equality(lt, rt, types) {
        let side = match (lt.is(primitives::STRING), rt.is(primitives::STRING)) {
            (true, false) if !rt.is(primitives::NULL) => Some(ComparisonSide::Right),
            (false, true) if !lt.is(primitives::NULL) => Some(ComparisonSide::Left),
            _ => None,
        };
        if let Some(side) = side {
            rc.warn(Warning::ReferenceComparison {
                side,
                ty: "string".to_string(),
                span,
            });
        }
        return Ok(Expr::value(
            ExprKind::PredefinedBinary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                operand_ty: DataType::OBJECT,
                checked: false,
            },
            DataType::BOOL,
            span,
        ));
    }

    Err(no_operator(op, lt, rt, span, rc))
}

fn split_pair(mut operands: Vec<Expr>) -> Result<(Expr, Expr)> {
    let right = operands.pop();
    let left = operands.pop();
    match (left, right) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(CompilationError::internal("operands lost in operator lookup")),
    }
}

fn no_operator(op: BinaryOp, left: DataType, right: DataType, span: Span, rc: &ResolveContext<'_>) -> CompilationError {
    CompilationError::NoBinaryOperator {
        op: op.symbol().to_string(),
        left: rc.types.type_name(left),
        right: rc.types.type_name(right),
        span,
    }
}

/// A constant result that still evaluates `discarded` when it can be
/// observed.
pub(super) fn with_side_effect(constant: Constant, discarded: Expr, span: Span) -> Expr {
    if discarded.has_side_effects() {
        let ty = constant.ty;
        Expr::value(
            ExprKind::SideEffectConstant {
                constant,
                side_effect: Box::new(discarded),
            },
            ty,
            span,
        )
    } else {
        Expr::from_constant(constant, span)
    }
}

// ==========================================================================
// Predefined operators
// ==========================================================================

fn apply_predefined(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    selected: PredefinedBinary,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let types = rc.types;
    if selected.is_string_concat() {
        if let (Some(l), Some(r)) = (left.constant(), right.constant()) {
            if let Some(value) = fold_binary(op, &l.value, &r.value, rc.is_checked(), span)? {
                return Ok(Expr::from_constant(Constant::with_type(value, DataType::STRING), span));
            }
        }
        return super::concat::resolve_concat(left, right, span, rc);
    }

    check_useless_comparison(op, &left, &right, span, rc);
    check_sign_extended_or(op, selected.left, &left, &right, span, rc);

    let left = implicit_conversion(left, selected.left, rc);
    let right = implicit_conversion(right, selected.right, rc);
    let (left, mut right) = rc.join(left, right)?;
    let checked = rc.is_checked();

    if let (Some(l), Some(r)) = (left.constant(), right.constant()) {
        if let Some(value) = fold_binary(op, &l.value, &r.value, checked, span)? {
            return Ok(Expr::from_constant(Constant::with_type(value, selected.result), span));
        }
    }

    if matches!(op, BinaryOp::Division | BinaryOp::Modulus)
        && selected.left.is_integral()
        && right.constant().is_some_and(|c| c.value.is_zero())
    {
        return Err(CompilationError::DivisionByConstantZero { span });
    }

    if op.is_shift() {
        if let Some(&ConstValue::Int(count)) = right.constant().map(|c| &c.value) {
            let masked = count & shift_mask(selected.left);
            if masked != count {
                right = Expr::from_constant(Constant::int(masked), right.span);
            }
        }
    }

    if selected.is_decimal() {
        let method = rc
            .well_known
            .decimal_operator(types, op.method_name())
            .ok_or_else(|| CompilationError::internal(format!("decimal has no {}", op.method_name())))?;
        return Ok(operator_call(method, left, right, selected.result, span));
    }

    if selected.is_string_equality() {
        let method = if op == BinaryOp::Equality {
            rc.well_known.string_equality
        } else {
            rc.well_known.string_inequality
        };
        let method = method.ok_or_else(|| CompilationError::internal("string has no equality operator"))?;
        return Ok(operator_call(method, left, right, DataType::BOOL, span));
    }

    if let Some(value) = right.constant().and_then(|c| absorbed(op, selected.left, &c.value)) {
        return Ok(with_side_effect(Constant::with_type(value, selected.result), left, span));
    }
    if let Some(value) = left.constant().and_then(|c| absorbed(op, selected.left, &c.value)) {
        return Ok(with_side_effect(Constant::with_type(value, selected.result), right, span));
    }

    // `a + (-b)` is `a - b`.
    let (op, right) = match right.kind {
        ExprKind::PredefinedUnary {
            op: UnaryOp::Minus,
            operand,
            checked: false,
        } if op == BinaryOp::Addition => (BinaryOp::Subtraction, *operand),
        kind => (op, Expr { kind, ..right }),
    };

    Ok(Expr::value(
        ExprKind::PredefinedBinary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            operand_ty: selected.left,
            checked,
        },
        selected.result,
        span,
    ))
}

fn operator_call(method: sable_core::TypeHash, left: Expr, right: Expr, result: DataType, span: Span) -> Expr {
    Expr::value(
        ExprKind::OperatorCall {
            method,
            args: vec![left, right],
        },
        result,
        span,
    )
}

fn shift_mask(ty: DataType) -> i32 {
    if primitives::size_of(ty.type_hash) == Some(8) { 63 } else { 31 }
}

/// The result when `constant` decides the operation regardless of the other
/// operand: `x * 0`, `x & 0`, `x | ~0`, `b & false`, `b | true`.
fn absorbed(op: BinaryOp, operand_ty: DataType, constant: &ConstValue) -> Option<ConstValue> {
    if operand_ty.is_integral() {
        let all_ones = ConstValue::integral_wrapping(operand_ty.type_hash, -1);
        return match op {
            BinaryOp::Multiply | BinaryOp::BitwiseAnd if constant.is_zero() => Some(constant.clone()),
            BinaryOp::BitwiseOr if all_ones.as_ref() == Some(constant) => Some(constant.clone()),
            _ => None,
        };
    }
    match (op, constant.as_bool()) {
        (BinaryOp::BitwiseAnd, Some(false)) | (BinaryOp::BitwiseOr, Some(true)) => Some(constant.clone()),
        _ => None,
    }
}

/// Warn about comparing an integral operand with a constant it can never
/// equal.
fn check_useless_comparison(op: BinaryOp, left: &Expr, right: &Expr, span: Span, rc: &mut ResolveContext<'_>) {
    if !op.is_comparison() {
        return;
    }
    for (constant, other) in [(left, right), (right, left)] {
        let (Some(constant), None) = (constant.constant(), other.constant()) else {
            continue;
        };
        let ty = other.data_type();
        let Some(value) = constant.value.as_integer() else {
            continue;
        };
        if ty.is_integral() && ConstValue::integral(ty.type_hash, value).is_none() {
            rc.warn(Warning::UselessComparison {
                ty: rc.types.type_name(ty),
                span,
            });
            return;
        }
    }
}

/// Warn about `|` on an operand sign-extended to a wider type.
fn check_sign_extended_or(
    op: BinaryOp,
    operand_ty: DataType,
    left: &Expr,
    right: &Expr,
    span: Span,
    rc: &mut ResolveContext<'_>,
) {
    if op != BinaryOp::BitwiseOr || !operand_ty.is_integral() {
        return;
    }
    let width = primitives::size_of(operand_ty.type_hash);
    for operand in [left, right] {
        let ty = operand.data_type();
        if operand.constant().is_none()
            && ty.is_integral()
            && !ty.is_unsigned()
            && primitives::size_of(ty.type_hash) < width
        {
            rc.warn(Warning::SignExtendedOr {
                ty: rc.types.type_name(ty),
                span,
            });
            return;
        }
    }
}

// ==========================================================================
// Enums and delegates
// ==========================================================================

fn apply_enum_rule(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    rule: EnumRule,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let left = implicit_conversion(left, rule.left, rc);
    let right = implicit_conversion(right, rule.right, rc);
    let (left, right) = rc.join(left, right)?;

    if let (Some(l), Some(r)) = (left.constant(), right.constant()) {
        if let Some(folded) = fold_enum(op, &rule, l, r, span, rc)? {
            return Ok(Expr::from_constant(folded, span));
        }
    }

    Ok(Expr::value(
        ExprKind::PredefinedBinary {
            op,
            left: Box::new(super::cast::retype(left, rule.underlying)),
            right: Box::new(super::cast::retype(right, rule.underlying)),
            operand_ty: rule.underlying,
            checked: rc.is_checked(),
        },
        rule.result,
        span,
    ))
}

/// Fold an enum operation on the underlying values, promoted the way the
/// predefined operator would promote them.
fn fold_enum(
    op: BinaryOp,
    rule: &EnumRule,
    left: &Constant,
    right: &Constant,
    span: Span,
    rc: &ResolveContext<'_>,
) -> Result<Option<Constant>> {
    let types = rc.types;
    let checked = rc.is_checked();
    let underlying = Operand::value(rule.underlying);
    let Some(promoted) = resolve_predefined_binary(op, underlying, underlying, types, span)? else {
        return Ok(None);
    };
    let l = convert_constant(&left.underlying(), promoted.left, checked, span, types)?;
    let r = convert_constant(&right.underlying(), promoted.right, checked, span, types)?;
    let (Some(l), Some(r)) = (l, r) else {
        return Ok(None);
    };
    let Some(value) = fold_binary(op, &l.value, &r.value, checked, span)? else {
        return Ok(None);
    };
    if rule.result == DataType::BOOL {
        return Ok(Some(Constant::with_type(value, DataType::BOOL)));
    }
    let storage = types.enum_underlying(rule.result).unwrap_or(rule.result);
    let folded = convert_constant(&Constant::with_type(value, promoted.result), storage, checked, span, types)?;
    Ok(folded.map(|c| Constant::with_type(c.value, rule.result)))
}

/// `d1 + d2` and `d1 - d2` through `Delegate.Combine`/`Remove`, cast back
/// to the delegate type.
fn combine_delegates(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    delegate: DataType,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let method = if op == BinaryOp::Addition {
        rc.well_known.delegate_combine
    } else {
        rc.well_known.delegate_remove
    };
    let method = method.ok_or_else(|| CompilationError::internal("Delegate.Combine/Remove not registered"))?;
    let base = DataType::simple(primitives::DELEGATE);
    let left = implicit_conversion(left, base, rc);
    let right = implicit_conversion(right, base, rc);
    let (left, right) = rc.join(left, right)?;
    let call = operator_call(method, left, right, base, span);
    super::cast::explicit_conversion(call, delegate, rc)
}

// ==========================================================================
// Short-circuit operators
// ==========================================================================

fn resolve_logical(op: BinaryOp, left: Expr, right: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let is_and = op == BinaryOp::LogicalAnd;
    let left = left.resolve_value(rc);
    let right = right.resolve_value(rc);
    let (left, right) = rc.join(left, right)?;
    let types = rc.types;
    let (lt, rt) = (left.data_type(), right.data_type());

    let methods = user_binary_candidates(op, lt, rt, types);
    let (left, right) = match invocation::resolve_user_operator(&methods, vec![left, right], op.symbol(), span, rc)? {
        UserOperator::Applied(call) => return user_logical(op, call, span, rc),
        UserOperator::NotApplicable(operands) => split_pair(operands)?,
    };

    let selected = resolve_predefined_binary(op, Operand::new(lt, left.constant()), Operand::new(rt, right.constant()), types, span)?;
    if selected.is_none() {
        return Err(no_operator(op, lt, rt, span, rc));
    }
    let left = implicit_conversion(left, DataType::BOOL, rc);
    let right = implicit_conversion(right, DataType::BOOL, rc);
    let (left, right) = rc.join(left, right)?;

    // The left constant decides: `false && x`, `true || x`.
    if let Some(value) = left.constant().and_then(|c| c.value.as_bool()) {
        if value != is_and {
            rc.warn(Warning::UnreachableExpression { span: right.span });
            return Ok(Expr::from_constant(Constant::with_type(ConstValue::Bool(value), DataType::BOOL), span));
        }
        return Ok(right);
    }
    // `x && true`, `x || false`.
    if let Some(value) = right.constant().and_then(|c| c.value.as_bool()) {
        if value == is_and {
            return Ok(left);
        }
        return Ok(with_side_effect(Constant::with_type(ConstValue::Bool(value), DataType::BOOL), left, span));
    }

    Ok(Expr::value(
        ExprKind::Logical {
            is_and,
            left: Box::new(left),
            right: Box::new(right),
        },
        DataType::BOOL,
        span,
    ))
}

/// A user `&`/`|` applied as `&&`/`||`: the operator must take and return
/// its own type, which must define `false`/`true`.
fn user_logical(op: BinaryOp, call: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let types = rc.types;
    let is_and = op == BinaryOp::LogicalAnd;
    let ExprKind::OperatorCall { method, args } = call.kind else {
        return Err(CompilationError::internal("user operator without a call"));
    };
    let info = types
        .method(method)
        .ok_or_else(|| CompilationError::internal("user operator is not registered"))?;
    let ty = info.return_type;
    if info.params.len() != 2 || info.params.iter().any(|p| p.ty != ty) {
        return Err(CompilationError::UserLogicalOperatorShape {
            op: op.symbol().to_string(),
            ty: types.type_name(ty),
            span,
        });
    }
    let truth = truth_operator(ty, !is_and, types).ok_or_else(|| CompilationError::UserLogicalOperatorTrueFalse {
        ty: types.type_name(ty),
        span,
    })?;
    let (left, right) = split_pair(args)?;
    Ok(Expr::value(
        ExprKind::UserLogical {
            is_and,
            left: Box::new(left),
            right: Box::new(right),
            operator: method,
            truth,
        },
        ty,
        span,
    ))
}

// ==========================================================================
// Emission
// ==========================================================================

pub(super) fn emit_binary(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    match &expr.kind {
        ExprKind::PredefinedBinary {
            op,
            left,
            right,
            operand_ty,
            checked,
        } => {
            left.emit(ec)?;
            right.emit(ec)?;
            if op.is_comparison() {
                for code in comparison_opcodes(*op, *operand_ty) {
                    ec.sink.emit(code);
                }
                return Ok(());
            }
            if op.is_shift() && right.constant().is_none() {
                ec.sink.emit_constant(&ConstValue::Int(shift_mask(*operand_ty)));
                ec.sink.emit(OpCode::And);
            }
            let code = arithmetic_opcode(*op, *operand_ty, *checked)
                .ok_or_else(|| CompilationError::internal(format!("no instruction for '{}'", op.symbol())))?;
            ec.sink.emit(code);
            // Enum arithmetic on a small underlying type stays in range.
            if operand_ty.is_named() && primitives::is_small_integral(operand_ty.type_hash) && !op.is_bitwise() {
                for code in crate::conversion::numeric_conversion_ops(primitives::INT32, operand_ty.type_hash, *checked) {
                    ec.sink.emit(code);
                }
            }
            Ok(())
        }
        ExprKind::Logical { is_and, left, right } => {
            let short = ec.sink.define_label();
            let end = ec.sink.define_label();
            // `&&` skips on false, `||` on true.
            left.emit_branch(ec, !*is_and, short)?;
            right.emit(ec)?;
            ec.sink.emit_branch(OpCode::Br, end);
            ec.sink.mark_label(short);
            ec.sink.emit(if *is_and { OpCode::PushFalse } else { OpCode::PushTrue });
            ec.sink.mark_label(end);
            Ok(())
        }
        ExprKind::UserLogical {
            left,
            right,
            operator,
            truth,
            ..
        } => {
            let end = ec.sink.define_label();
            left.emit(ec)?;
            ec.sink.emit(OpCode::Dup);
            ec.sink.emit_call(OpCode::Call, *truth, 1);
            ec.sink.emit_branch(OpCode::BrTrue, end);
            right.emit(ec)?;
            ec.sink.emit_call(OpCode::Call, *operator, 2);
            ec.sink.mark_label(end);
            Ok(())
        }
        _ => Err(CompilationError::internal("expected a binary operator")),
    }
}

/// Branch form of comparisons and short-circuit operators.
pub(super) fn emit_binary_branch(expr: &Expr, ec: &mut EmitContext<'_>, on_true: bool, label: Label) -> Result<()> {
    match &expr.kind {
        ExprKind::PredefinedBinary {
            op,
            left,
            right,
            operand_ty,
            ..
        } if op.is_comparison() => {
            let Some(branch) = comparison_branch(*op, *operand_ty, on_true) else {
                return fallback_branch(expr, ec, on_true, label);
            };
            left.emit(ec)?;
            right.emit(ec)?;
            ec.sink.emit_branch(branch, label);
            Ok(())
        }
        ExprKind::Logical { is_and, left, right } => {
            if *is_and == on_true {
                // Both must hold (`&&` to true) or both fail (`||` to false).
                let skip = ec.sink.define_label();
                left.emit_branch(ec, !on_true, skip)?;
                right.emit_branch(ec, on_true, label)?;
                ec.sink.mark_label(skip);
            } else {
                left.emit_branch(ec, on_true, label)?;
                right.emit_branch(ec, on_true, label)?;
            }
            Ok(())
        }
        _ => fallback_branch(expr, ec, on_true, label),
    }
}

fn fallback_branch(expr: &Expr, ec: &mut EmitContext<'_>, on_true: bool, label: Label) -> Result<()> {
    expr.emit(ec)?;
    ec.sink.emit_branch(if on_true { OpCode::BrTrue } else { OpCode::BrFalse }, label);
    Ok(())
}
