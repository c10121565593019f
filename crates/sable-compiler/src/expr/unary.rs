//! Prefix unary operators: `+ - ! ~`.

use sable_core::{CompilationError, Span, primitives};

use super::invocation::{self, UserOperator};
use super::{Expr, ExprKind, implicit_conversion};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, fold_unary};
use crate::context::ResolveContext;
use crate::emit::EmitContext;
use crate::operators::{Operand, UnaryOp, resolve_predefined_unary, user_unary_candidates};

type Result<T> = std::result::Result<T, CompilationError>;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_unary(op: UnaryOp, operand: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let operand = operand.resolve_value(rc)?;
    let types = rc.types;
    let ty = operand.data_type();

    if let Some(constant) = operand.constant() {
        if let Some(folded) = fold_unary(op, constant, rc.is_checked(), span, types)? {
            return Ok(Expr::from_constant(folded, span));
        }
    }

    let methods = user_unary_candidates(op.method_name(), ty, types);
    let operand = match invocation::resolve_user_operator(&methods, vec![operand], op.symbol(), span, rc)? {
        UserOperator::Applied(call) => return Ok(call),
        UserOperator::NotApplicable(mut operands) => operands
            .pop()
            .ok_or_else(|| CompilationError::internal("operand lost in operator lookup"))?,
    };

    if op == UnaryOp::OnesComplement && types.is_enum(ty) {
        return Ok(Expr::value(
            ExprKind::PredefinedUnary {
                op,
                operand: Box::new(operand),
                checked: false,
            },
            ty,
            span,
        ));
    }

    let selected = resolve_predefined_unary(op, Operand::new(ty, operand.constant()), types, span)?;
    let Some(selected) = selected else {
        return Err(CompilationError::NoUnaryOperator {
            op: op.symbol().to_string(),
            operand: types.type_name(ty),
            span,
        });
    };
    let operand = implicit_conversion(operand, selected.operand, rc)?;

    if selected.operand.is(primitives::DECIMAL) {
        let method = rc
            .well_known
            .decimal_operator(types, op.method_name())
            .ok_or_else(|| CompilationError::internal(format!("decimal has no {}", op.method_name())))?;
        return Ok(Expr::value(
            ExprKind::OperatorCall {
                method,
                args: vec![operand],
            },
            selected.result,
            span,
        ));
    }

    let checked = rc.is_checked();
    // `-(-x)` is `x` when overflow is not observed.
    if op == UnaryOp::Minus && !checked {
        if let ExprKind::PredefinedUnary {
            op: UnaryOp::Minus,
            operand: inner,
            ..
        } = operand.kind
        {
            let mut inner = *inner;
            inner.span = span;
            return Ok(inner);
        }
    }

    Ok(Expr::value(
        ExprKind::PredefinedUnary {
            op,
            operand: Box::new(operand),
            checked,
        },
        selected.result,
        span,
    ))
}

pub(super) fn emit_unary(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ExprKind::PredefinedUnary { op, operand, checked } = &expr.kind else {
        return Err(CompilationError::internal("expected a unary operator"));
    };
    let ty = operand.data_type();
    match op {
        UnaryOp::Plus => operand.emit(ec),
        UnaryOp::Minus if *checked && ty.is_integral() => {
            // `0 - x` traps where `neg` would wrap.
            let zero = ConstValue::integral(ty.type_hash, 0)
                .ok_or_else(|| CompilationError::internal("integral type without a zero"))?;
            ec.sink.emit_constant(&zero);
            operand.emit(ec)?;
            ec.sink.emit(OpCode::SubOvf);
            Ok(())
        }
        UnaryOp::Minus => {
            operand.emit(ec)?;
            ec.sink.emit(OpCode::Neg);
            Ok(())
        }
        UnaryOp::LogicalNot => {
            operand.emit(ec)?;
            ec.sink.emit(OpCode::PushFalse);
            ec.sink.emit(OpCode::Ceq);
            Ok(())
        }
        UnaryOp::OnesComplement => {
            operand.emit(ec)?;
            ec.sink.emit(OpCode::Not);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use sable_core::{DataType, TypeHash};
    use sable_registry::{TypeRegistry, ty};

    fn negate(name: &str) -> Expr {
        Expr::unary(UnaryOp::Minus, Expr::name(name, span()), span())
    }

    #[test]
    fn constants_fold() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = resolve(&reg, &mut locals, Expr::unary(UnaryOp::Minus, Expr::int(5, span()), span())).unwrap();
        assert_eq!(expr.constant().unwrap().value, ConstValue::Int(-5));
    }

    #[test]
    fn negation_checks_overflow_only_in_checked_mode() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let plain = resolve(&reg, &mut locals, negate("x")).unwrap();
        emit_value(&reg, &locals, &plain).assert_opcodes(&[OpCode::LdLoc, OpCode::Neg]);

        let (checked, _) = resolve_with(&reg, &mut locals, CompilerOptions::default().checked(true), None, negate("x"));
        emit_value(&reg, &locals, &checked.unwrap()).assert_opcodes(&[OpCode::PushZero, OpCode::LdLoc, OpCode::SubOvf]);
    }

    #[test]
    fn double_negation_cancels() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let expr = Expr::unary(UnaryOp::Minus, negate("x"), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc]);
    }

    #[test]
    fn logical_not_compares_with_false() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("b", DataType::BOOL, true);
        let expr = resolve(&reg, &mut locals, Expr::unary(UnaryOp::LogicalNot, Expr::name("b", span()), span())).unwrap();
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::PushFalse, OpCode::Ceq]);
    }

    #[test]
    fn negating_uint_widens_to_long() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("u", ty(primitives::UINT32), true);
        let expr = resolve(&reg, &mut locals, negate("u")).unwrap();
        assert_eq!(expr.ty, Some(DataType::INT64));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::ConvU8, OpCode::Neg]);
    }

    #[test]
    fn complement_keeps_enum_type() {
        let mut reg = TypeRegistry::with_builtins();
        let flags = reg.define_enum("Flags", primitives::INT32).member("A", 1).build().unwrap();
        let mut locals = LocalTable::new();
        locals.declare("f", ty(flags), true);
        let expr = Expr::unary(UnaryOp::OnesComplement, Expr::name("f", span()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        assert_eq!(expr.ty, Some(ty(flags)));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::Not]);

        let minus = resolve(&reg, &mut locals, negate("f")).unwrap_err();
        assert_eq!(minus.code(), 23);
    }

    #[test]
    fn decimal_and_user_operators_are_calls() {
        let mut reg = TypeRegistry::with_builtins();
        let vec2 = ty(TypeHash::from_name("Vec2"));
        reg.define_struct("Vec2")
            .operator("op_UnaryNegation", &[vec2], vec2)
            .build()
            .unwrap();
        let mut locals = LocalTable::new();
        locals.declare("d", ty(primitives::DECIMAL), true);
        locals.declare("v", vec2, true);

        let d = resolve(&reg, &mut locals, negate("d")).unwrap();
        assert!(matches!(d.kind, ExprKind::OperatorCall { .. }));
        let v = resolve(&reg, &mut locals, negate("v")).unwrap();
        assert!(matches!(v.kind, ExprKind::OperatorCall { .. }));
        assert_eq!(v.ty, Some(vec2));
    }

    #[test]
    fn no_operator_for_strings() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = Expr::unary(UnaryOp::Minus, Expr::string("s", span()), span());
        assert_eq!(resolve(&reg, &mut locals, expr).unwrap_err().code(), 23);
    }
}
