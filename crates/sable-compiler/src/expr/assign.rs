//! Simple, compound and event assignment.

use sable_core::{CompilationError, DataType, ExprClass, Span};

use super::cast::explicit_conversion;
use super::{Expr, ExprKind, binary, implicit_conversion, lvalue};
use crate::bytecode::OpCode;
use crate::context::{ResolveContext, ResolveFlags};
use crate::conversion::find_implicit_conversion_from;
use crate::emit::EmitContext;
use crate::operators::BinaryOp;

type Result<T> = std::result::Result<T, CompilationError>;

/// Fail unless `target` can be stored to.
pub(super) fn check_writable(target: &Expr, rc: &ResolveContext<'_>) -> Result<()> {
    let span = target.span;
    match target.class {
        ExprClass::Variable => Ok(()),
        ExprClass::PropertyAccess | ExprClass::IndexerAccess => {
            let has_setter = match &target.kind {
                ExprKind::Property { setter, .. } | ExprKind::IndexerAccess { setter, .. } => setter.is_some(),
                _ => false,
            };
            if has_setter {
                Ok(())
            } else {
                Err(CompilationError::ReadOnly {
                    member: target.describe(rc),
                    span,
                })
            }
        }
        ExprClass::EventAccess => Err(CompilationError::EventMisuse {
            event: target.describe(rc),
            span,
        }),
        _ => Err(CompilationError::NotAssignable { span }),
    }
}

/// Fail unless the current value of `target` can be read.
pub(super) fn check_readable(target: &Expr, rc: &ResolveContext<'_>) -> Result<()> {
    let has_getter = match &target.kind {
        ExprKind::Property { getter, .. } | ExprKind::IndexerAccess { getter, .. } => getter.is_some(),
        _ => true,
    };
    if has_getter {
        Ok(())
    } else {
        Err(CompilationError::NoGetter {
            member: target.describe(rc),
            span: target.span,
        })
    }
}

fn assignment(target: Expr, source: Expr, compound: bool, postfix: bool, span: Span) -> Expr {
    let ty = target.data_type();
    Expr::value(
        ExprKind::Assignment {
            target: Box::new(target),
            source: Box::new(source),
            compound,
            postfix,
        },
        ty,
        span,
    )
}

pub(super) fn resolve_assign(target: Expr, source: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let target = target.resolve_target(rc, true);
    let source = source.resolve_value(rc);
    let (target, source) = rc.join(target, source)?;
    check_writable(&target, rc)?;

    let source = implicit_conversion(source, target.data_type(), rc)?;
    if let ExprKind::Variable { id, .. } = target.kind {
        rc.locals.mark_assigned(id);
    }
    Ok(assignment(target, source, false, false, span))
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_compound_assign(
    op: BinaryOp,
    target: Expr,
    source: Expr,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let target = if matches!(op, BinaryOp::Addition | BinaryOp::Subtraction) {
        rc.with_flags(ResolveFlags::EVENT_ASSIGNMENT, true, |rc| target.resolve_target(rc, false))
    } else {
        target.resolve_target(rc, false)
    };
    let source = source.resolve_value(rc);
    let (target, source) = rc.join(target, source)?;
    let ty = target.data_type();

    if target.class == ExprClass::EventAccess {
        let handler = implicit_conversion(source, ty, rc)?;
        return Ok(Expr::value(
            ExprKind::EventAssignment {
                event: Box::new(target),
                handler: Box::new(handler),
                add: op == BinaryOp::Addition,
            },
            DataType::VOID,
            span,
        ));
    }

    check_writable(&target, rc)?;
    check_readable(&target, rc)?;

    // `b += 1` on a byte narrows the int result back, but only when the
    // operand itself would fit.
    let source_fits =
        op.is_shift() || find_implicit_conversion_from(source.data_type(), source.constant(), ty, rc.types).is_some();

    let load = Expr::value(ExprKind::PreparedLoad, ty, target.span);
    let result = binary::resolve_binary(op, load, source, span, rc)?;
    let result_ty = result.data_type();
    let narrows = !matches!(result.kind, ExprKind::OperatorCall { .. }) && source_fits;
    let result = if result_ty == ty
        || find_implicit_conversion_from(result_ty, result.constant(), ty, rc.types).is_some()
        || !narrows
    {
        implicit_conversion(result, ty, rc)?
    } else {
        explicit_conversion(result, ty, rc)?
    };
    Ok(assignment(target, result, true, false, span))
}

pub(super) fn emit_assignment(expr: &Expr, ec: &mut EmitContext<'_>, leave_value: bool) -> Result<()> {
    match &expr.kind {
        ExprKind::Assignment {
            target,
            source,
            compound,
            postfix,
        } => lvalue::emit_store(target, source, *compound, *postfix, leave_value, ec),
        ExprKind::EventAssignment { event, handler, add } => {
            let ExprKind::Event {
                instance,
                add: adder,
                remove,
                ..
            } = &event.kind
            else {
                return Err(CompilationError::internal("event assignment to a non-event"));
            };
            let accessor = if *add { *adder } else { *remove };
            let owner = ec
                .types
                .method(accessor)
                .map(|m| m.owner)
                .ok_or_else(|| CompilationError::internal("event accessor not registered"))?;
            let temp = match instance {
                Some(instance) => lvalue::emit_receiver(instance, owner, ec)?,
                None => None,
            };
            handler.emit(ec)?;
            ec.sink.emit_call(OpCode::Call, accessor, 1);
            if let Some(temp) = temp {
                ec.release_temp(temp)?;
            }
            Ok(())
        }
        _ => Err(CompilationError::internal("expected an assignment")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use sable_core::primitives;
    use sable_registry::{TypeRegistry, ty};

    fn name(n: &str) -> Expr {
        Expr::name(n, span())
    }

    fn widget_registry() -> (TypeRegistry, DataType) {
        let mut reg = TypeRegistry::with_builtins();
        let widget = reg
            .define_class("Widget")
            .property("Size", DataType::INT32, true, false)
            .property("Label", DataType::STRING, false, true)
            .event("Changed", DataType::simple(primitives::DELEGATE))
            .build()
            .unwrap();
        (reg, ty(widget))
    }

    #[test]
    fn compound_narrows_back_to_the_target() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("b", ty(primitives::UINT8), true);
        let expr = Expr::compound_assign(BinaryOp::Addition, name("b"), Expr::int(1, span()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        assert_eq!(expr.ty, Some(ty(primitives::UINT8)));
        emit_statement(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::PushOne,
            OpCode::Add,
            OpCode::ConvU1,
            OpCode::StLoc,
        ]);
    }

    #[test]
    fn compound_operand_must_fit_the_target() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("b", ty(primitives::UINT8), true);
        let expr = Expr::compound_assign(BinaryOp::Addition, name("b"), Expr::int(1000, span()), span());
        assert_eq!(resolve(&reg, &mut locals, expr).unwrap_err().code(), 266);
    }

    #[test]
    fn assignment_marks_the_local() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let x = locals.declare("x", DataType::INT32, false);
        let expr = resolve(&reg, &mut locals, Expr::assign(name("x"), Expr::int(7, span()), span())).unwrap();
        assert_eq!(expr.class, ExprClass::Value);
        assert!(locals.get(x).unwrap().assigned);
        emit_statement(&reg, &locals, &expr).assert_opcodes(&[OpCode::Constant, OpCode::StLoc]);
    }

    #[test]
    fn compound_reads_need_an_assigned_target() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("x", DataType::INT32, false);
        let expr = Expr::compound_assign(BinaryOp::Multiply, name("x"), Expr::int(2, span()), span());
        assert_eq!(resolve(&reg, &mut locals, expr).unwrap_err().code(), 165);
    }

    #[test]
    fn unwritable_targets() {
        let (reg, widget) = widget_registry();
        let mut locals = LocalTable::new();
        locals.declare("w", widget, true);

        let read_only = Expr::assign(Expr::member(name("w"), "Size", span()), Expr::int(1, span()), span());
        assert_eq!(resolve(&reg, &mut locals, read_only).unwrap_err().code(), 200);

        let write_only = Expr::compound_assign(
            BinaryOp::Addition,
            Expr::member(name("w"), "Label", span()),
            Expr::string("!", span()),
            span(),
        );
        assert_eq!(resolve(&reg, &mut locals, write_only).unwrap_err().code(), 154);

        let literal = Expr::assign(Expr::int(5, span()), Expr::int(1, span()), span());
        assert_eq!(resolve(&reg, &mut locals, literal).unwrap_err().code(), 131);
    }

    #[test]
    fn events_only_take_add_and_remove() {
        let (reg, widget) = widget_registry();
        let mut locals = LocalTable::new();
        locals.declare("w", widget, true);
        locals.declare("h", DataType::simple(primitives::DELEGATE), true);

        let plain = Expr::assign(Expr::member(name("w"), "Changed", span()), name("h"), span());
        assert_eq!(resolve(&reg, &mut locals, plain).unwrap_err().code(), 70);

        let add = Expr::compound_assign(BinaryOp::Addition, Expr::member(name("w"), "Changed", span()), name("h"), span());
        let add = resolve(&reg, &mut locals, add).unwrap();
        assert!(matches!(add.kind, ExprKind::EventAssignment { add: true, .. }));
        assert_eq!(add.ty, Some(DataType::VOID));
        emit_statement(&reg, &locals, &add).assert_opcodes(&[OpCode::LdLoc, OpCode::LdLoc, OpCode::Call]);

        let remove =
            Expr::compound_assign(BinaryOp::Subtraction, Expr::member(name("w"), "Changed", span()), name("h"), span());
        let remove = resolve(&reg, &mut locals, remove).unwrap();
        assert!(matches!(remove.kind, ExprKind::EventAssignment { add: false, .. }));
    }

    #[test]
    fn incompatible_source() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let expr = Expr::assign(name("x"), Expr::string("s", span()), span());
        assert_eq!(resolve(&reg, &mut locals, expr).unwrap_err().code(), 29);
    }
}
