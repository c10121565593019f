//! Test expressions and the conditional operator `c ? a : b`.

use sable_core::{CompilationError, DataType, ExprClass, Span, Warning};

use super::{Expr, ExprKind, implicit_conversion};
use crate::bytecode::OpCode;
use crate::context::ResolveContext;
use crate::conversion::{can_implicitly_convert, find_implicit_conversion_from};
use crate::emit::EmitContext;
use crate::operators::truth_operator;

type Result<T> = std::result::Result<T, CompilationError>;

/// Resolve `expr` as a `bool` test. Types without an implicit conversion to
/// `bool` may still be tested through their `operator true`.
pub(super) fn resolve_test(expr: Expr, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    if let ExprKind::Assign { source, .. } = &expr.kind {
        if matches!(source.kind, ExprKind::Literal(_)) {
            rc.warn(Warning::AssignmentInConditional { span: expr.span });
        }
    }

    let value = expr.resolve_value(rc)?;
    let ty = value.data_type();
    if ty == DataType::BOOL {
        return Ok(value);
    }
    let types = rc.types;
    if find_implicit_conversion_from(ty, value.constant(), DataType::BOOL, types).is_some() {
        return implicit_conversion(value, DataType::BOOL, rc);
    }
    if let Some(method) = truth_operator(ty, true, types) {
        let span = value.span;
        return Ok(Expr::value(
            ExprKind::OperatorCall {
                method,
                args: vec![value],
            },
            DataType::BOOL,
            span,
        ));
    }
    implicit_conversion(value, DataType::BOOL, rc)
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_conditional(
    condition: Expr,
    when_true: Expr,
    when_false: Expr,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let condition = resolve_test(condition, rc);
    let when_true = when_true.resolve_value(rc);
    let when_false = when_false.resolve_value(rc);
    let branches = rc.join(when_true, when_false);
    let (condition, (when_true, when_false)) = rc.join(condition, branches)?;

    let types = rc.types;
    let (tt, ft) = (when_true.data_type(), when_false.data_type());
    let ty = if tt == ft {
        tt
    } else {
        match (can_implicitly_convert(tt, ft, types), can_implicitly_convert(ft, tt, types)) {
            (true, false) => ft,
            (false, true) => tt,
            (true, true) => {
                return Err(CompilationError::ConditionalAmbiguous {
                    left: types.type_name(tt),
                    right: types.type_name(ft),
                    span,
                });
            }
            (false, false) => {
                return Err(CompilationError::ConditionalNoConversion {
                    left: types.type_name(tt),
                    right: types.type_name(ft),
                    span,
                });
            }
        }
    };

    let when_true = implicit_conversion(when_true, ty, rc);
    let when_false = implicit_conversion(when_false, ty, rc);
    let (when_true, when_false) = rc.join(when_true, when_false)?;

    if let Some(taken) = condition.constant().and_then(|c| c.value.as_bool()) {
        let mut chosen = if taken { when_true } else { when_false };
        chosen.span = span;
        if chosen.class != ExprClass::Value {
            chosen = super::cast::retype(chosen, ty);
        }
        return Ok(chosen);
    }

    Ok(Expr::value(
        ExprKind::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        },
        ty,
        span,
    ))
}

pub(super) fn emit_conditional(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ExprKind::Conditional {
        condition,
        when_true,
        when_false,
    } = &expr.kind
    else {
        return Err(CompilationError::internal("expected a conditional"));
    };
    let otherwise = ec.sink.define_label();
    let end = ec.sink.define_label();
    condition.emit_branch(ec, false, otherwise)?;
    when_true.emit(ec)?;
    ec.sink.emit_branch(OpCode::Br, end);
    ec.sink.mark_label(otherwise);
    when_false.emit(ec)?;
    ec.sink.mark_label(end);
    Ok(())
}
