//! `++` and `--`, prefix and postfix.
//!
//! Both forms become a compound assignment of `x + 1` (or `x - 1`, or the
//! user's `op_Increment`) whose source reads the target through
//! `PreparedLoad`. The postfix form yields the value from before the store.

use sable_core::{CompilationError, ExprClass, Span, primitives};

use super::assign::{check_readable, check_writable};
use super::cast::explicit_conversion;
use super::invocation::{self, UserOperator};
use super::{Expr, ExprKind, binary, implicit_conversion};
use crate::constant::Constant;
use crate::context::ResolveContext;
use crate::operators::{IncDecMode, user_unary_candidates};

type Result<T> = std::result::Result<T, CompilationError>;

pub(super) fn resolve_inc_dec(mode: IncDecMode, operand: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let target = operand.resolve_target(rc, false)?;
    if !matches!(
        target.class,
        ExprClass::Variable | ExprClass::PropertyAccess | ExprClass::IndexerAccess
    ) {
        return Err(CompilationError::IncrementOperandNotAssignable { span });
    }
    check_readable(&target, rc)?;
    check_writable(&target, rc)?;

    let types = rc.types;
    let ty = target.data_type();
    let load = Expr::value(ExprKind::PreparedLoad, ty, target.span);

    let methods = user_unary_candidates(mode.method_name(), ty, types);
    let load = match invocation::resolve_user_operator(&methods, vec![load], mode.symbol(), span, rc)? {
        UserOperator::Applied(call) => {
            let source = implicit_conversion(call, ty, rc)?;
            return Ok(inc_dec_assignment(mode, target, source, span));
        }
        UserOperator::NotApplicable(mut operands) => operands
            .pop()
            .ok_or_else(|| CompilationError::internal("operand lost in operator lookup"))?,
    };

    let steppable = ty.is_numeric() || ty.is(primitives::CHAR) || types.is_enum(ty) || ty.is_pointer();
    if !steppable {
        return Err(CompilationError::NoIncrementOperator {
            op: mode.symbol().to_string(),
            operand: types.type_name(ty),
            span,
        });
    }

    let one = Expr::from_constant(Constant::int(1), span);
    let stepped = binary::resolve_binary(mode.binary_op(), load, one, span, rc)?;
    let source = if stepped.data_type() == ty {
        stepped
    } else {
        explicit_conversion(stepped, ty, rc)?
    };
    Ok(inc_dec_assignment(mode, target, source, span))
}

fn inc_dec_assignment(mode: IncDecMode, target: Expr, source: Expr, span: Span) -> Expr {
    let ty = target.data_type();
    Expr::value(
        ExprKind::Assignment {
            target: Box::new(target),
            source: Box::new(source),
            compound: true,
            postfix: !mode.is_prefix(),
        },
        ty,
        span,
    )
}
