//! Conversions: implicit conversions at use sites and explicit casts.
//!
//! Constant operands fold. User-defined conversions become an operator call
//! bridged by standard conversions on either side; `decimal` conversions are
//! calls to `decimal`'s conversion operators.

use sable_core::{CompilationError, DataType, ExprClass, Span};

use super::{Expr, ExprKind};
use crate::bytecode::OpCode;
use crate::constant::{Constant, convert_constant};
use crate::context::ResolveContext;
use crate::conversion::{
    Conversion, ConversionKind, decimal_conversion_method, find_conversion, find_implicit_conversion_from,
    find_standard_conversion, numeric_conversion_ops,
};
use crate::emit::EmitContext;

type Result<T> = std::result::Result<T, CompilationError>;

/// Convert a resolved value to `target` implicitly, or fail with 29 (266
/// when an explicit conversion exists).
pub fn implicit_conversion(expr: Expr, target: DataType, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let source = expr.data_type();
    if source == target {
        return Ok(expr);
    }
    let types = rc.types;
    let Some(conversion) = find_implicit_conversion_from(source, expr.constant(), target, types) else {
        return Err(CompilationError::CannotImplicitlyConvert {
            from: types.type_name(source),
            to: types.type_name(target),
            explicit_exists: find_conversion(source, target, types).is_some(),
            span: expr.span,
        });
    };
    apply_conversion(expr, conversion, target, rc)
}

/// Convert a resolved value to `target` with a cast, or fail with 30.
pub(crate) fn explicit_conversion(expr: Expr, target: DataType, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let source = expr.data_type();
    let span = expr.span;
    let types = rc.types;
    if (source.is_pointer() || target.is_pointer()) && !source.is_void_pointer() && source != target && !rc.is_unsafe() {
        return Err(CompilationError::UnsafeContextRequired { span });
    }
    if let Some(constant) = expr.constant() {
        if let Some(folded) = convert_constant(constant, target, rc.is_checked(), span, types)? {
            return Ok(Expr::from_constant(folded, span));
        }
    }
    let conversion = find_implicit_conversion_from(source, expr.constant(), target, types)
        .or_else(|| find_conversion(source, target, types))
        .ok_or_else(|| CompilationError::CannotConvert {
            from: types.type_name(source),
            to: types.type_name(target),
            span,
        })?;
    apply_conversion(expr, conversion, target, rc)
}

/// Build the nodes performing `conversion`.
pub(super) fn apply_conversion(
    expr: Expr,
    conversion: Conversion,
    target: DataType,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let span = expr.span;
    let types = rc.types;

    if let Some(constant) = expr.constant() {
        if !conversion.is_user_defined() {
            if let Some(folded) = convert_constant(constant, target, rc.is_checked(), span, types)? {
                return Ok(Expr::from_constant(folded, span));
            }
        }
    }

    match conversion.kind {
        ConversionKind::Identity => Ok(retype(expr, target)),
        ConversionKind::UserDefined { method, param, ret } => {
            let operand = bridge(expr, param, rc)?;
            let call = Expr::value(
                ExprKind::OperatorCall {
                    method,
                    args: vec![operand],
                },
                ret,
                span,
            );
            tracing::trace!(method = %types.method_name(method), "user-defined conversion");
            bridge(call, target, rc)
        }
        ConversionKind::Numeric { from, to } => match decimal_conversion_method(from, to) {
            Some(method) => Ok(Expr::value(
                ExprKind::OperatorCall {
                    method,
                    args: vec![expr],
                },
                target,
                span,
            )),
            None => Ok(convert_node(expr, ConversionKind::Numeric { from, to }, target, rc.is_checked())),
        },
        kind => Ok(convert_node(expr, kind, target, rc.is_checked())),
    }
}

/// The standard conversion around a user-defined operator.
fn bridge(expr: Expr, target: DataType, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    if expr.data_type() == target {
        return Ok(expr);
    }
    let conversion = find_standard_conversion(expr.data_type(), target, rc.types).ok_or_else(|| {
        CompilationError::internal("user-defined conversion without a standard bridge")
    })?;
    apply_conversion(expr, conversion, target, rc)
}

fn convert_node(expr: Expr, kind: ConversionKind, target: DataType, checked: bool) -> Expr {
    let span = expr.span;
    Expr::value(
        ExprKind::Convert {
            operand: Box::new(expr),
            kind,
            checked,
        },
        target,
        span,
    )
}

/// The same value seen as another type without a runtime conversion; never
/// a variable.
pub(super) fn retype(expr: Expr, ty: DataType) -> Expr {
    if expr.ty == Some(ty) && expr.class == ExprClass::Value {
        return expr;
    }
    if let ExprKind::Constant(constant) = &expr.kind {
        let constant = Constant::with_type(constant.value.clone(), ty);
        return Expr::from_constant(constant, expr.span);
    }
    convert_node(expr, ConversionKind::Identity, ty, false)
}

pub(super) fn resolve_cast(target: DataType, operand: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let operand = operand.resolve_value(rc)?;
    let mut converted = explicit_conversion(operand, target, rc)?;
    if converted.class != ExprClass::Value {
        converted = convert_node(converted, ConversionKind::Identity, target, false);
    }
    converted.span = span;
    Ok(converted)
}

pub(super) fn emit_convert(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ExprKind::Convert { operand, kind, checked } = &expr.kind else {
        return Err(CompilationError::internal("expected a conversion"));
    };
    operand.emit(ec)?;
    let source = operand.data_type();
    let target = expr.data_type();
    let ops = match kind {
        ConversionKind::Identity
        | ConversionKind::ImplicitConstant
        | ConversionKind::ZeroToEnum
        | ConversionKind::NullLiteral
        | ConversionKind::ImplicitReference
        | ConversionKind::PointerToVoid
        | ConversionKind::PointerToPointer => Vec::new(),
        ConversionKind::Numeric { from, to } | ConversionKind::Enumeration { from, to } => {
            numeric_conversion_ops(*from, *to, *checked)
        }
        ConversionKind::PointerToIntegral { to } => {
            numeric_conversion_ops(sable_core::primitives::UINT64, *to, *checked)
        }
        ConversionKind::IntegralToPointer { from } => {
            numeric_conversion_ops(*from, sable_core::primitives::UINT64, *checked)
        }
        ConversionKind::ExplicitReference => {
            ec.sink.emit_type(OpCode::CastClass, target);
            return Ok(());
        }
        ConversionKind::Boxing => {
            ec.sink.emit_type(OpCode::Box, source);
            return Ok(());
        }
        ConversionKind::Unboxing => {
            ec.sink.emit_type(OpCode::UnboxAny, target);
            return Ok(());
        }
        ConversionKind::UserDefined { .. } => {
            return Err(CompilationError::internal("user-defined conversion reached emission unsplit"));
        }
    };
    for op in ops {
        ec.sink.emit(op);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ConstValue;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use sable_core::{TypeHash, primitives};
    use sable_registry::{TypeRegistry, ty};

    #[test]
    fn constant_casts_fold() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = Expr::cast(ty(primitives::UINT8), Expr::int(300, span()), span());
        let folded = resolve(&reg, &mut locals, expr).unwrap();
        assert_eq!(folded.constant().unwrap().value, ConstValue::Byte(44));
    }

    #[test]
    fn checked_constant_casts_overflow() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = Expr::cast(ty(primitives::UINT8), Expr::int(300, span()), span());
        let (result, _) = resolve_with(&reg, &mut locals, CompilerOptions::default().checked(true), None, expr);
        assert_eq!(result.unwrap_err().code(), 221);
    }

    #[test]
    fn narrowing_cast_emits_conversion() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let cast = resolve(&reg, &mut locals, Expr::cast(ty(primitives::INT16), Expr::name("x", span()), span())).unwrap();
        assert_eq!(cast.class, ExprClass::Value);
        emit_value(&reg, &locals, &cast).assert_opcodes(&[OpCode::LdLoc, OpCode::ConvI2]);
    }

    #[test]
    fn identity_cast_is_not_assignable() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let cast = resolve(&reg, &mut locals, Expr::cast(DataType::INT32, Expr::name("x", span()), span())).unwrap();
        assert_eq!(cast.class, ExprClass::Value);
        emit_value(&reg, &locals, &cast).assert_opcodes(&[OpCode::LdLoc]);
    }

    #[test]
    fn impossible_casts() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = Expr::cast(DataType::BOOL, Expr::string("no", span()), span());
        assert_eq!(resolve(&reg, &mut locals, expr).unwrap_err().code(), 30);
    }

    #[test]
    fn implicit_conversion_reports_explicit_alternative() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("l", DataType::INT64, true);
        let source = resolve(&reg, &mut locals, Expr::name("l", span())).unwrap();

        let mut diags = sable_core::Diagnostics::new();
        let mut rc = ResolveContext::new(
            &reg,
            &crate::overload::BestMatchResolver,
            &mut diags,
            &mut locals,
            CompilerOptions::default(),
        );
        let err = implicit_conversion(source, DataType::INT32, &mut rc).unwrap_err();
        assert_eq!(err.code(), 266);
    }

    #[test]
    fn user_defined_conversions_are_bridged_calls() {
        let mut reg = TypeRegistry::with_builtins();
        let meters = ty(TypeHash::from_name("Meters"));
        reg.define_struct("Meters")
            .conversion(meters, DataType::simple(primitives::DOUBLE), false)
            .build()
            .unwrap();
        let mut locals = LocalTable::new();
        locals.declare("m", meters, true);
        let expr = Expr::cast(DataType::simple(primitives::FLOAT), Expr::name("m", span()), span());
        let resolved = resolve(&reg, &mut locals, expr).unwrap();
        // double -> float after the operator.
        let ExprKind::Convert { operand, .. } = &resolved.kind else {
            panic!("expected a bridging conversion, got {:?}", resolved.kind);
        };
        assert!(matches!(operand.kind, ExprKind::OperatorCall { .. }));
    }
}
