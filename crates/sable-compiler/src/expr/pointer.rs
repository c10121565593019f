//! Unsafe pointer operations: `&v`, `*p`, pointer arithmetic and
//! `stackalloc`.

use sable_core::{CompilationError, DataType, ExprClass, Span, TypeSystem, primitives};

use super::type_query::is_unmanaged;
use super::{Expr, ExprKind, implicit_conversion, lvalue};
use crate::bytecode::OpCode;
use crate::constant::ConstValue;
use crate::context::ResolveContext;
use crate::conversion::numeric_conversion_ops;
use crate::emit::EmitContext;
use crate::operators::{BinaryOp, PointerRule};

type Result<T> = std::result::Result<T, CompilationError>;

fn require_unsafe(span: Span, rc: &ResolveContext<'_>) -> Result<()> {
    if rc.is_unsafe() {
        Ok(())
    } else {
        Err(CompilationError::UnsafeContextRequired { span })
    }
}

/// Whether the variable cannot be moved by the collector: locals and value
/// parameters, pointer targets, and fields of such struct variables.
fn is_fixed_variable(expr: &Expr, types: &dyn TypeSystem) -> bool {
    match &expr.kind {
        ExprKind::Variable { storage, .. } => storage.is_fixed(),
        ExprKind::Deref(_) => true,
        ExprKind::Field {
            instance: Some(instance),
            ..
        } => types.is_value_type(instance.data_type()) && is_fixed_variable(instance, types),
        _ => false,
    }
}

/// `&operand`. `in_fixed` is set for the initializer of a `fixed` statement,
/// which is where moveable variables must be pinned.
pub(super) fn resolve_address_of(operand: Expr, in_fixed: bool, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_unsafe(span, rc)?;
    let target = operand.resolve_target(rc, true)?;
    if target.class != ExprClass::Variable {
        return Err(CompilationError::CannotTakeAddress { span });
    }

    let fixed = is_fixed_variable(&target, rc.types);
    if fixed && in_fixed {
        return Err(CompilationError::AlreadyFixed { span });
    }
    if !fixed && !in_fixed {
        return Err(CompilationError::AddressOfUnfixed { span });
    }

    if let ExprKind::Variable { id, .. } = target.kind {
        rc.locals.mark_assigned(id);
    }
    let ty = target.data_type().pointer_to();
    Ok(Expr::value(ExprKind::AddressOfVariable(Box::new(target)), ty, span))
}

/// `*operand`: a variable of the pointee type.
pub(super) fn resolve_indirection(operand: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_unsafe(span, rc)?;
    let pointer = operand.resolve_value(rc)?;
    let ty = pointer.data_type();
    if !ty.is_pointer() {
        return Err(CompilationError::IndirectionOfNonPointer {
            ty: rc.types.type_name(ty),
            span,
        });
    }
    if ty.is_void_pointer() {
        return Err(CompilationError::VoidPointerOperation { span });
    }
    let pointee = ty
        .element_type()
        .ok_or_else(|| CompilationError::internal("pointer without a pointee"))?;
    Ok(deref(pointer, pointee, span))
}

pub(super) fn deref(pointer: Expr, pointee: DataType, span: Span) -> Expr {
    Expr::resolved(ExprKind::Deref(Box::new(pointer)), pointee, ExprClass::Variable, span)
}

/// Build the node for a binary operator already matched to a pointer rule.
pub(super) fn apply_pointer_rule(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    rule: PointerRule,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    match rule {
        PointerRule::Offset {
            pointer,
            offset,
            pointer_on_left,
            element_size,
        } => {
            let (pointer_expr, offset_expr) = if pointer_on_left { (left, right) } else { (right, left) };
            let offset_expr = implicit_conversion(offset_expr, offset, rc)?;
            Ok(pointer_offset(
                pointer_expr,
                offset_expr,
                pointer,
                element_size,
                op == BinaryOp::Subtraction,
                pointer_on_left,
                span,
            ))
        }
        PointerRule::Difference { element_size } => Ok(Expr::value(
            ExprKind::PointerDiff {
                left: Box::new(left),
                right: Box::new(right),
                element_size,
            },
            DataType::INT64,
            span,
        )),
        PointerRule::Comparison => {
            let pointer = if left.data_type().is_pointer() {
                left.data_type()
            } else {
                right.data_type()
            };
            let left = implicit_conversion(left, pointer, rc);
            let right = implicit_conversion(right, pointer, rc);
            let (left, right) = rc.join(left, right)?;
            Ok(Expr::value(
                ExprKind::PredefinedBinary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    operand_ty: pointer,
                    checked: false,
                },
                DataType::BOOL,
                span,
            ))
        }
    }
}

/// `pointer + offset` scaled by `element_size`; also the address of a
/// pointer element access `p[i]`.
pub(super) fn pointer_offset(
    pointer: Expr,
    offset: Expr,
    ty: DataType,
    element_size: u32,
    subtract: bool,
    pointer_first: bool,
    span: Span,
) -> Expr {
    Expr::value(
        ExprKind::PointerOffset {
            pointer: Box::new(pointer),
            offset: Box::new(offset),
            element_size,
            subtract,
            pointer_first,
        },
        ty,
        span,
    )
}

/// `stackalloc element[count]`, typed `element*`.
pub(super) fn resolve_stack_alloc(element: DataType, count: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_unsafe(span, rc)?;
    let types = rc.types;
    if types.type_info(element.type_hash).is_none() {
        return Err(CompilationError::TypeNotFound {
            name: types.type_name(element),
            span,
        });
    }
    if !is_unmanaged(element, types) {
        return Err(CompilationError::ManagedType {
            ty: types.type_name(element),
            span,
        });
    }

    let count = count.resolve_value(rc)?;
    let count = implicit_conversion(count, DataType::INT32, rc)?;
    if count.constant().and_then(|c| c.value.as_integer()).is_some_and(|n| n < 0) {
        return Err(CompilationError::NegativeStackAllocSize { span: count.span });
    }
    Ok(Expr::value(
        ExprKind::StackAllocation {
            element,
            count: Box::new(count),
        },
        element.pointer_to(),
        span,
    ))
}

/// Push the byte count of a stack allocation and allocate it.
fn emit_stack_alloc(element: DataType, count: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let size = ec.types.size_of(element);
    let folded = size
        .zip(count.constant().and_then(|c| c.value.as_integer()))
        .and_then(|(size, n)| n.checked_mul(i128::from(size)))
        .and_then(|bytes| i32::try_from(bytes).ok());

    match (folded, size) {
        (Some(bytes), _) => ec.sink.emit_constant(&ConstValue::Int(bytes)),
        (None, Some(1)) => count.emit(ec)?,
        (None, Some(size)) => {
            count.emit(ec)?;
            let size = i32::try_from(size).map_err(|_| CompilationError::internal("element size out of range"))?;
            ec.sink.emit_constant(&ConstValue::Int(size));
            ec.sink.emit(OpCode::MulOvfUn);
        }
        (None, None) => {
            count.emit(ec)?;
            ec.sink.emit_type(OpCode::SizeOf, element);
            ec.sink.emit(OpCode::MulOvfUn);
        }
    }
    ec.sink.emit(OpCode::LocAlloc);
    Ok(())
}

pub(super) fn emit_pointer(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    match &expr.kind {
        ExprKind::AddressOfVariable(target) => lvalue::emit_address(target, ec),
        ExprKind::PointerOffset {
            pointer,
            offset,
            element_size,
            subtract,
            pointer_first,
        } => {
            if *pointer_first {
                pointer.emit(ec)?;
                emit_scaled_offset(offset, *element_size, ec)?;
            } else {
                emit_scaled_offset(offset, *element_size, ec)?;
                pointer.emit(ec)?;
            }
            ec.sink.emit(if *subtract { OpCode::Sub } else { OpCode::Add });
            Ok(())
        }
        ExprKind::PointerDiff {
            left,
            right,
            element_size,
        } => {
            left.emit(ec)?;
            right.emit(ec)?;
            ec.sink.emit(OpCode::Sub);
            if *element_size != 1 {
                ec.sink.emit_constant(&ConstValue::Long(i64::from(*element_size)));
                ec.sink.emit(OpCode::Div);
            }
            Ok(())
        }
        ExprKind::StackAllocation { element, count } => emit_stack_alloc(*element, count, ec),
        _ => Err(CompilationError::internal("expected a pointer operation")),
    }
}

/// Push `offset * size` as a native-width byte count.
fn emit_scaled_offset(offset: &Expr, size: u32, ec: &mut EmitContext<'_>) -> Result<()> {
    if let Some(value) = offset.constant().and_then(|c| c.value.as_integer()) {
        let bytes = value
            .checked_mul(i128::from(size))
            .and_then(|b| i64::try_from(b).ok())
            .ok_or_else(|| CompilationError::internal("pointer offset out of range"))?;
        ec.sink.emit_constant(&ConstValue::Long(bytes));
        return Ok(());
    }

    offset.emit(ec)?;
    let ty = offset.data_type();
    if ty.is(primitives::INT32) {
        ec.sink.emit(OpCode::ConvI);
    } else if ty.is(primitives::UINT32) {
        for op in numeric_conversion_ops(primitives::UINT32, primitives::UINT64, false) {
            ec.sink.emit(op);
        }
    }
    if size != 1 {
        ec.sink.emit_constant(&ConstValue::Long(i64::from(size)));
        ec.sink.emit(OpCode::Mul);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use sable_registry::{TypeRegistry, ty as ty_of};

    fn unsafe_resolve(reg: &TypeRegistry, locals: &mut LocalTable, expr: Expr) -> Result<Expr> {
        resolve_with(reg, locals, CompilerOptions::default().allow_unsafe(true), None, expr).0
    }

    fn name(n: &str) -> Expr {
        Expr::name(n, span())
    }

    #[test]
    fn address_of_requires_unsafe() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "x");
        let err = resolve(&reg, &mut locals, Expr::address_of(name("x"), span())).unwrap_err();
        assert_eq!(err.code(), 214);
    }

    #[test]
    fn address_of_local_is_fixed() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let x = locals.declare("x", DataType::INT32, false);
        let expr = unsafe_resolve(&reg, &mut locals, Expr::address_of(name("x"), span())).unwrap();
        assert_eq!(expr.ty, Some(DataType::INT32.pointer_to()));
        assert!(locals.get(x).unwrap().assigned);
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLocA]);

        let again = unsafe_resolve(&reg, &mut locals, Expr::fixed_address_of(name("x"), span())).unwrap_err();
        assert_eq!(again.code(), 213);
    }

    #[test]
    fn array_elements_must_be_pinned() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("xs", DataType::array_of(DataType::INT32, 1), true);
        let element = || Expr::element_access(name("xs"), vec![Expr::int(0, span())], span());

        let unpinned = unsafe_resolve(&reg, &mut locals, Expr::address_of(element(), span())).unwrap_err();
        assert_eq!(unpinned.code(), 212);
        let pinned = unsafe_resolve(&reg, &mut locals, Expr::fixed_address_of(element(), span())).unwrap();
        emit_value(&reg, &locals, &pinned).assert_opcodes(&[OpCode::LdLoc, OpCode::PushZero, OpCode::LdElemA]);
    }

    #[test]
    fn values_have_no_address() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let err = unsafe_resolve(&reg, &mut locals, Expr::address_of(Expr::int(3, span()), span())).unwrap_err();
        assert_eq!(err.code(), 211);
    }

    #[test]
    fn indirection_checks_operand() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "n");
        locals.declare("p", DataType::INT32.pointer_to(), true);
        locals.declare("v", DataType::VOID.pointer_to(), true);

        let ok = unsafe_resolve(&reg, &mut locals, Expr::deref(name("p"), span())).unwrap();
        assert_eq!(ok.class, ExprClass::Variable);
        emit_value(&reg, &locals, &ok).assert_opcodes(&[OpCode::LdLoc, OpCode::LdInd]);

        let not_pointer = unsafe_resolve(&reg, &mut locals, Expr::deref(name("n"), span())).unwrap_err();
        assert_eq!(not_pointer.code(), 193);
        let void = unsafe_resolve(&reg, &mut locals, Expr::deref(name("v"), span())).unwrap_err();
        assert_eq!(void.code(), 242);
    }

    #[test]
    fn offsets_are_scaled() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("p", DataType::INT64.pointer_to(), true);
        int_local(&mut locals, "i");

        let constant = Expr::binary(BinaryOp::Addition, name("p"), Expr::int(2, span()), span());
        let constant = unsafe_resolve(&reg, &mut locals, constant).unwrap();
        emit_value(&reg, &locals, &constant).assert_opcodes(&[OpCode::LdLoc, OpCode::Constant, OpCode::Add]);

        let variable = Expr::binary(BinaryOp::Subtraction, name("p"), name("i"), span());
        let variable = unsafe_resolve(&reg, &mut locals, variable).unwrap();
        assert_eq!(variable.ty, Some(DataType::INT64.pointer_to()));
        emit_value(&reg, &locals, &variable).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::ConvI,
            OpCode::Constant,
            OpCode::Mul,
            OpCode::Sub,
        ]);
    }

    #[test]
    fn difference_divides_by_element_size() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("p", DataType::INT32.pointer_to(), true);
        locals.declare("q", DataType::INT32.pointer_to(), true);
        let expr = Expr::binary(BinaryOp::Subtraction, name("p"), name("q"), span());
        let expr = unsafe_resolve(&reg, &mut locals, expr).unwrap();
        assert_eq!(expr.ty, Some(DataType::INT64));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::Sub,
            OpCode::Constant,
            OpCode::Div,
        ]);
    }

    #[test]
    fn pointer_comparison_is_unsigned() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let bytes = DataType::simple(primitives::UINT8).pointer_to();
        locals.declare("p", bytes, true);
        locals.declare("q", bytes, true);
        let expr = Expr::binary(BinaryOp::LessThan, name("p"), name("q"), span());
        let expr = unsafe_resolve(&reg, &mut locals, expr).unwrap();
        assert_eq!(expr.ty, Some(DataType::BOOL));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::LdLoc, OpCode::CltUn]);

        let null = Expr::binary(BinaryOp::Equality, name("p"), Expr::null(span()), span());
        let null = unsafe_resolve(&reg, &mut locals, null).unwrap();
        assert!(matches!(null.kind, ExprKind::PredefinedBinary { operand_ty, .. } if operand_ty == bytes));
    }

    #[test]
    fn stack_allocation_scales_the_count() {
        let mut reg = TypeRegistry::with_builtins();
        let cell = ty_of(reg.define_struct("Cell").field("V", DataType::INT32).build().unwrap());
        let mut locals = LocalTable::new();
        int_local(&mut locals, "n");

        let err = resolve(&reg, &mut locals, Expr::stack_alloc(DataType::INT32, name("n"), span())).unwrap_err();
        assert_eq!(err.code(), 214);

        let fixed = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(DataType::INT64, Expr::int(4, span()), span())).unwrap();
        assert_eq!(fixed.ty, Some(DataType::INT64.pointer_to()));
        emit_value(&reg, &locals, &fixed).assert_opcodes(&[OpCode::Constant, OpCode::LocAlloc]);

        let ints = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(DataType::INT32, name("n"), span())).unwrap();
        emit_value(&reg, &locals, &ints).assert_opcodes(&[OpCode::LdLoc, OpCode::Constant, OpCode::MulOvfUn, OpCode::LocAlloc]);

        let bytes = DataType::simple(primitives::UINT8);
        let raw = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(bytes, name("n"), span())).unwrap();
        emit_value(&reg, &locals, &raw).assert_opcodes(&[OpCode::LdLoc, OpCode::LocAlloc]);

        let cells = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(cell, name("n"), span())).unwrap();
        emit_value(&reg, &locals, &cells).assert_opcodes(&[OpCode::LdLoc, OpCode::SizeOf, OpCode::MulOvfUn, OpCode::LocAlloc]);
    }

    #[test]
    fn stack_allocation_rejects_bad_sizes_and_managed_elements() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("s", DataType::STRING, true);

        let negative = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(DataType::INT32, Expr::int(-1, span()), span()));
        assert_eq!(negative.unwrap_err().code(), 247);
        let managed = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(DataType::STRING, Expr::int(2, span()), span()));
        assert_eq!(managed.unwrap_err().code(), 208);
        let not_int = unsafe_resolve(&reg, &mut locals, Expr::stack_alloc(DataType::INT32, name("s"), span()));
        assert_eq!(not_int.unwrap_err().code(), 29);
    }
}
