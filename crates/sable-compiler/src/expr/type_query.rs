//! Type queries: `is`, `as`, `typeof`, `sizeof` and `default(T)`.
//!
//! `is` folds to a constant when the answer follows from the static types
//! alone and warns that it does; otherwise it becomes an `isinst` test.
//! `as` is either a standard implicit conversion or an `isinst`.

use sable_core::{CompilationError, DataType, Span, TypeKind, TypeSystem, Warning, primitives};

use super::cast::retype;
use super::literal::{default_constant, default_value};
use super::{Expr, ExprKind, implicit_conversion};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant};
use crate::context::ResolveContext;
use crate::conversion::{ConversionKind, find_reference_conversion, find_standard_conversion};
use crate::emit::{EmitContext, Label};

type Result<T> = std::result::Result<T, CompilationError>;

/// What the static types say about `e is T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeTestOutcome {
    Always,
    Never,
    Runtime,
}

fn require_type(ty: DataType, span: Span, rc: &ResolveContext<'_>) -> Result<()> {
    if rc.types.type_info(ty.type_hash).is_some() {
        Ok(())
    } else {
        Err(CompilationError::TypeNotFound {
            name: rc.types.type_name(ty),
            span,
        })
    }
}

fn require_non_void(ty: DataType, span: Span) -> Result<()> {
    if ty == DataType::VOID {
        Err(CompilationError::VoidInThisContext { span })
    } else {
        Ok(())
    }
}

/// Whether a value of `ty` contains no references: pointers, enums, the
/// numeric primitives and structs.
///
/// Struct fields are not inspected.
pub(super) fn is_unmanaged(ty: DataType, types: &dyn TypeSystem) -> bool {
    if ty.is_pointer() {
        return true;
    }
    if ty.is_array() || !ty.is_named() {
        return false;
    }
    match types.type_info(ty.type_hash).map(|t| &t.kind) {
        Some(TypeKind::Primitive) => primitives::size_of(ty.type_hash).is_some(),
        Some(TypeKind::Enum { .. } | TypeKind::Struct) => true,
        _ => false,
    }
}

/// The size `sizeof` folds to: the numeric primitives, `bool`, `char`,
/// `decimal` and enums over them.
fn predefined_size(ty: DataType, types: &dyn TypeSystem) -> Option<u32> {
    let storage = types.enum_underlying(ty).unwrap_or(ty);
    if !storage.is_named() || storage.is(primitives::INTPTR) {
        return None;
    }
    primitives::size_of(storage.type_hash)
}

/// A constant result that still evaluates `operand` when it can be observed.
fn constant_result(operand: Expr, value: ConstValue, ty: DataType, span: Span) -> Expr {
    let constant = Constant::with_type(value, ty);
    if operand.has_side_effects() {
        Expr::value(
            ExprKind::SideEffectConstant {
                constant,
                side_effect: Box::new(operand),
            },
            ty,
            span,
        )
    } else {
        Expr::from_constant(constant, span)
    }
}

// ==========================================================================
// is
// ==========================================================================

fn type_test_outcome(source: DataType, target: DataType, types: &dyn TypeSystem) -> TypeTestOutcome {
    use TypeTestOutcome::*;

    if types.is_type_parameter(source) || types.is_type_parameter(target) {
        return Runtime;
    }
    if types.is_value_type(target) {
        if source == target {
            return Always;
        }
        return match find_reference_conversion(source, target, types).map(|c| c.kind) {
            Some(ConversionKind::Unboxing) => Runtime,
            _ => Never,
        };
    }
    if types.is_value_type(source) {
        return match find_reference_conversion(source, target, types).map(|c| c.kind) {
            Some(ConversionKind::Boxing) => Always,
            _ => Never,
        };
    }
    if source == target {
        return Runtime;
    }
    match find_reference_conversion(source, target, types).map(|c| c.kind) {
        Some(ConversionKind::ImplicitReference | ConversionKind::ExplicitReference) => Runtime,
        _ => Never,
    }
}

/// `operand is ty`.
pub(super) fn resolve_is(operand: Expr, ty: DataType, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let operand = operand.resolve_value(rc)?;
    require_type(ty, span, rc)?;
    let source = operand.data_type();
    if source.is_pointer() || ty.is_pointer() {
        return Err(CompilationError::TypeTestOnPointer { op: "is", span });
    }

    let types = rc.types;
    let outcome = if operand.is_null_literal() {
        TypeTestOutcome::Never
    } else {
        type_test_outcome(source, ty, types)
    };
    tracing::trace!(
        source = %types.type_name(source),
        target = %types.type_name(ty),
        ?outcome,
        "type test"
    );

    match outcome {
        TypeTestOutcome::Always => {
            rc.warn(Warning::AlwaysOfType {
                ty: types.type_name(ty),
                span,
            });
            Ok(constant_result(operand, ConstValue::Bool(true), DataType::BOOL, span))
        }
        TypeTestOutcome::Never => {
            rc.warn(Warning::NeverOfType {
                ty: types.type_name(ty),
                span,
            });
            Ok(constant_result(operand, ConstValue::Bool(false), DataType::BOOL, span))
        }
        TypeTestOutcome::Runtime => Ok(Expr::value(
            ExprKind::TypeTest {
                operand: Box::new(operand),
                target: ty,
            },
            DataType::BOOL,
            span,
        )),
    }
}

// ==========================================================================
// as
// ==========================================================================

/// `operand as ty`.
pub(super) fn resolve_as(operand: Expr, ty: DataType, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let operand = operand.resolve_value(rc)?;
    require_type(ty, span, rc)?;
    let source = operand.data_type();
    if source.is_pointer() || ty.is_pointer() {
        return Err(CompilationError::TypeTestOnPointer { op: "as", span });
    }

    let types = rc.types;
    if types.is_type_parameter(ty) {
        if !types.is_reference_type(ty) {
            return Err(CompilationError::AsWithUnconstrainedTypeParameter {
                ty: types.type_name(ty),
                span,
            });
        }
    } else if types.is_value_type(ty) {
        return Err(CompilationError::AsWithValueType {
            ty: types.type_name(ty),
            span,
        });
    }

    if find_standard_conversion(source, ty, types).is_some_and(|c| c.is_implicit()) {
        let mut converted = retype(implicit_conversion(operand, ty, rc)?, ty);
        converted.span = span;
        return Ok(converted);
    }

    let checked_at_runtime = types.is_type_parameter(source)
        || matches!(
            find_reference_conversion(source, ty, types).map(|c| c.kind),
            Some(ConversionKind::ExplicitReference | ConversionKind::Unboxing)
        );
    if !checked_at_runtime {
        return Err(CompilationError::NoBuiltinConversion {
            from: types.type_name(source),
            to: types.type_name(ty),
            span,
        });
    }
    Ok(Expr::value(
        ExprKind::TypeAs {
            operand: Box::new(operand),
        },
        ty,
        span,
    ))
}

// ==========================================================================
// typeof, sizeof, default
// ==========================================================================

/// `typeof(ty)`.
pub(super) fn resolve_typeof(ty: DataType, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_type(ty, span, rc)?;
    if ty.is_pointer() && !rc.is_unsafe() {
        return Err(CompilationError::UnsafeContextRequired { span });
    }
    let Some(system_type) = rc.well_known.system_type else {
        return Err(CompilationError::TypeNotFound {
            name: "Type".to_string(),
            span,
        });
    };
    Ok(Expr::value(ExprKind::TypeToken(ty), DataType::simple(system_type), span))
}

/// `sizeof(ty)`: a constant for the predefined types, an unsafe runtime
/// query for other unmanaged types.
pub(super) fn resolve_sizeof(ty: DataType, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_type(ty, span, rc)?;
    require_non_void(ty, span)?;
    let types = rc.types;
    if let Some(size) = predefined_size(ty, types) {
        let size = i32::try_from(size).map_err(|_| CompilationError::internal("type size out of range"))?;
        return Ok(Expr::from_constant(
            Constant::with_type(ConstValue::Int(size), DataType::INT32),
            span,
        ));
    }
    if !rc.is_unsafe() {
        return Err(CompilationError::SizeOfRequiresUnsafe {
            ty: types.type_name(ty),
            span,
        });
    }
    if !is_unmanaged(ty, types) {
        return Err(CompilationError::ManagedType {
            ty: types.type_name(ty),
            span,
        });
    }
    Ok(Expr::value(ExprKind::SizeOfType(ty), DataType::INT32, span))
}

/// `default(ty)`: a constant when the type has one, otherwise a zeroed value.
pub(super) fn resolve_default(ty: DataType, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    require_type(ty, span, rc)?;
    require_non_void(ty, span)?;
    if ty.is_pointer() && !rc.is_unsafe() {
        return Err(CompilationError::UnsafeContextRequired { span });
    }
    match default_constant(ty, rc.types) {
        Some(constant) => Ok(Expr::from_constant(constant, span)),
        None => Ok(default_value(ty, span)),
    }
}

// ==========================================================================
// Emission
// ==========================================================================

/// Push the operand as an object reference ready for `isinst`.
fn emit_as_object(operand: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    operand.emit(ec)?;
    let source = operand.data_type();
    if ec.types.is_type_parameter(source) {
        ec.sink.emit_type(OpCode::Box, source);
    }
    Ok(())
}

pub(super) fn emit_type_query(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    match &expr.kind {
        ExprKind::TypeTest { operand, target } => {
            emit_as_object(operand, ec)?;
            ec.sink.emit_type(OpCode::IsInst, *target);
            ec.sink.emit(OpCode::PushNull);
            ec.sink.emit(OpCode::CgtUn);
            Ok(())
        }
        ExprKind::TypeAs { operand } => {
            emit_as_object(operand, ec)?;
            ec.sink.emit_type(OpCode::IsInst, expr.data_type());
            Ok(())
        }
        ExprKind::TypeToken(ty) => {
            ec.sink.emit_type(OpCode::LdToken, *ty);
            Ok(())
        }
        ExprKind::SizeOfType(ty) => {
            ec.sink.emit_type(OpCode::SizeOf, *ty);
            Ok(())
        }
        _ => Err(CompilationError::internal("expected a type query")),
    }
}

/// `e is T` as a jump: the `isinst` result is tested directly.
pub(super) fn emit_type_test_branch(expr: &Expr, ec: &mut EmitContext<'_>, on_true: bool, label: Label) -> Result<()> {
    let ExprKind::TypeTest { operand, target } = &expr.kind else {
        return Err(CompilationError::internal("expected a type test"));
    };
    emit_as_object(operand, ec)?;
    ec.sink.emit_type(OpCode::IsInst, *target);
    ec.sink.emit_branch(if on_true { OpCode::BrTrue } else { OpCode::BrFalse }, label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use sable_core::{TypeHash, TypeParamConstraints};
    use sable_registry::{TypeRegistry, ty};

    struct Shapes {
        reg: TypeRegistry,
        shape: DataType,
        circle: DataType,
        point: DataType,
        color: DataType,
    }

    fn shapes() -> Shapes {
        let mut reg = TypeRegistry::with_builtins();
        let shape = ty(reg.define_class("Shape").build().unwrap());
        let circle = ty(reg.define_class("Circle").base(shape.type_hash).build().unwrap());
        let point = ty(reg
            .define_struct("Point")
            .field("X", DataType::INT32)
            .field("Y", DataType::INT32)
            .build()
            .unwrap());
        let color = ty(reg.define_enum("Color", primitives::UINT8).member("Red", 0).build().unwrap());
        Shapes {
            reg,
            shape,
            circle,
            point,
            color,
        }
    }

    fn name(n: &str) -> Expr {
        Expr::name(n, span())
    }

    fn bool_of(expr: &Expr) -> Option<bool> {
        match &expr.kind {
            ExprKind::Constant(c) => c.value.as_bool(),
            ExprKind::SideEffectConstant { constant, .. } => constant.value.as_bool(),
            _ => None,
        }
    }

    #[test]
    fn downcast_test_is_checked_at_runtime() {
        let s = shapes();
        let mut locals = LocalTable::new();
        locals.declare("s", s.shape, true);

        let expr = resolve(&s.reg, &mut locals, Expr::is_type(name("s"), s.circle, span())).unwrap();
        assert_eq!(expr.ty, Some(DataType::BOOL));
        assert!(matches!(expr.kind, ExprKind::TypeTest { target, .. } if target == s.circle));
        emit_value(&s.reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::IsInst, OpCode::PushNull, OpCode::CgtUn]);

        let same = resolve(&s.reg, &mut locals, Expr::is_type(name("s"), s.shape, span())).unwrap();
        assert!(matches!(same.kind, ExprKind::TypeTest { .. }));
    }

    #[test]
    fn statically_known_tests_fold_with_a_warning() {
        let s = shapes();
        let mut locals = LocalTable::new();
        locals.declare("p", s.point, true);
        locals.declare("c", s.circle, true);

        let (always, diags) = resolve_with(
            &s.reg,
            &mut locals,
            CompilerOptions::default(),
            None,
            Expr::is_type(name("p"), s.point, span()),
        );
        assert_eq!(bool_of(&always.unwrap()), Some(true));
        assert!(diags.contains(183));

        let (boxed, diags) = resolve_with(
            &s.reg,
            &mut locals,
            CompilerOptions::default(),
            None,
            Expr::is_type(name("p"), DataType::OBJECT, span()),
        );
        assert_eq!(bool_of(&boxed.unwrap()), Some(true));
        assert!(diags.contains(183));

        let (never, diags) = resolve_with(
            &s.reg,
            &mut locals,
            CompilerOptions::default(),
            None,
            Expr::is_type(name("c"), DataType::STRING, span()),
        );
        assert_eq!(bool_of(&never.unwrap()), Some(false));
        assert!(diags.contains(184));

        let (null, diags) = resolve_with(
            &s.reg,
            &mut locals,
            CompilerOptions::default(),
            None,
            Expr::is_type(Expr::null(span()), s.shape, span()),
        );
        assert_eq!(bool_of(&null.unwrap()), Some(false));
        assert!(diags.contains(184));
    }

    #[test]
    fn unboxing_test_and_branch_form() {
        let s = shapes();
        let mut locals = LocalTable::new();
        locals.declare("o", DataType::OBJECT, true);

        let expr = resolve(&s.reg, &mut locals, Expr::is_type(name("o"), s.point, span())).unwrap();
        assert!(matches!(expr.kind, ExprKind::TypeTest { .. }));

        let not = Expr::unary(
            crate::operators::UnaryOp::LogicalNot,
            Expr::is_type(name("o"), DataType::INT32, span()),
            span(),
        );
        let when = resolve(&s.reg, &mut locals, Expr::conditional(not, Expr::int(1, span()), Expr::int(2, span()), span())).unwrap();
        let chunk = emit_value(&s.reg, &locals, &when);
        chunk.assert_contains_opcodes(&[OpCode::LdLoc, OpCode::IsInst, OpCode::BrTrue]);
        assert_eq!(chunk.count(OpCode::CgtUn), 0);
    }

    #[test]
    fn folded_test_keeps_side_effects() {
        let mut s = shapes();
        let factory = ty(s
            .reg
            .define_class("Factory")
            .static_method("Make", &[], DataType::INT32)
            .build()
            .unwrap());
        let mut locals = LocalTable::new();
        let call = Expr::invoke(Expr::member(Expr::type_ref(factory, span()), "Make", span()), Vec::new(), span());

        let expr = resolve(&s.reg, &mut locals, Expr::is_type(call, DataType::INT32, span())).unwrap();
        assert!(matches!(expr.kind, ExprKind::SideEffectConstant { .. }));
        emit_value(&s.reg, &locals, &expr).assert_opcodes(&[OpCode::Call, OpCode::Pop, OpCode::PushTrue]);
    }

    #[test]
    fn type_tests_reject_pointers() {
        let s = shapes();
        let mut locals = LocalTable::new();
        locals.declare("p", DataType::INT32.pointer_to(), true);
        let (result, _) = resolve_with(
            &s.reg,
            &mut locals,
            CompilerOptions::default().allow_unsafe(true),
            None,
            Expr::is_type(name("p"), DataType::OBJECT, span()),
        );
        assert_eq!(result.unwrap_err().code(), 244);
    }

    #[test]
    fn as_converts_or_tests_at_runtime() {
        let s = shapes();
        let mut locals = LocalTable::new();
        locals.declare("s", s.shape, true);
        locals.declare("c", s.circle, true);
        locals.declare("p", s.point, true);

        let down = resolve(&s.reg, &mut locals, Expr::as_type(name("s"), s.circle, span())).unwrap();
        assert_eq!(down.ty, Some(s.circle));
        assert!(matches!(down.kind, ExprKind::TypeAs { .. }));
        emit_value(&s.reg, &locals, &down).assert_opcodes(&[OpCode::LdLoc, OpCode::IsInst]);

        let up = resolve(&s.reg, &mut locals, Expr::as_type(name("c"), s.shape, span())).unwrap();
        assert_eq!(up.ty, Some(s.shape));
        assert_eq!(emit_value(&s.reg, &locals, &up).count(OpCode::IsInst), 0);

        let boxed = resolve(&s.reg, &mut locals, Expr::as_type(name("p"), DataType::OBJECT, span())).unwrap();
        emit_value(&s.reg, &locals, &boxed).assert_opcodes(&[OpCode::LdLoc, OpCode::Box]);
    }

    #[test]
    fn as_rejects_value_types_and_unrelated_classes() {
        let mut s = shapes();
        let loose = ty(s
            .reg
            .define("T", TypeKind::TypeParameter(TypeParamConstraints::default()))
            .build()
            .unwrap());
        let classy = ty(s
            .reg
            .define(
                "U",
                TypeKind::TypeParameter(TypeParamConstraints {
                    is_reference_type: true,
                    ..TypeParamConstraints::default()
                }),
            )
            .build()
            .unwrap());
        let mut locals = LocalTable::new();
        locals.declare("o", DataType::OBJECT, true);
        locals.declare("c", s.circle, true);

        let err = resolve(&s.reg, &mut locals, Expr::as_type(name("o"), s.point, span())).unwrap_err();
        assert_eq!(err.code(), 77);
        let err = resolve(&s.reg, &mut locals, Expr::as_type(name("o"), loose, span())).unwrap_err();
        assert_eq!(err.code(), 413);
        let err = resolve(&s.reg, &mut locals, Expr::as_type(name("c"), DataType::STRING, span())).unwrap_err();
        assert_eq!(err.code(), 39);

        let generic = resolve(&s.reg, &mut locals, Expr::as_type(name("o"), classy, span())).unwrap();
        assert!(matches!(generic.kind, ExprKind::TypeAs { .. }));
    }

    #[test]
    fn type_parameter_operands_are_boxed_before_isinst() {
        let mut s = shapes();
        let t = ty(s
            .reg
            .define("T", TypeKind::TypeParameter(TypeParamConstraints::default()))
            .build()
            .unwrap());
        let mut locals = LocalTable::new();
        locals.declare("t", t, true);

        let expr = resolve(&s.reg, &mut locals, Expr::as_type(name("t"), s.shape, span())).unwrap();
        emit_value(&s.reg, &locals, &expr).assert_opcodes(&[OpCode::LdLoc, OpCode::Box, OpCode::IsInst]);

        let test = resolve(&s.reg, &mut locals, Expr::is_type(name("t"), s.shape, span())).unwrap();
        emit_value(&s.reg, &locals, &test).assert_contains_opcodes(&[OpCode::Box, OpCode::IsInst, OpCode::CgtUn]);
    }

    #[test]
    fn typeof_loads_a_type_object() {
        let s = shapes();
        let mut locals = LocalTable::new();
        let expr = resolve(&s.reg, &mut locals, Expr::type_of(s.circle, span())).unwrap();
        assert_eq!(expr.ty, Some(ty(TypeHash::from_name("Type"))));
        assert!(!expr.has_side_effects());
        emit_value(&s.reg, &locals, &expr).assert_opcodes(&[OpCode::LdToken]);

        let pointer = Expr::type_of(DataType::INT32.pointer_to(), span());
        assert_eq!(resolve(&s.reg, &mut locals, pointer).unwrap_err().code(), 214);
        let missing = Expr::type_of(DataType::simple(TypeHash::from_name("Missing")), span());
        assert_eq!(resolve(&s.reg, &mut locals, missing).unwrap_err().code(), 246);
    }

    #[test]
    fn sizeof_folds_predefined_sizes() {
        let s = shapes();
        let mut locals = LocalTable::new();
        let size = |ty: DataType, locals: &mut LocalTable| {
            let expr = resolve(&s.reg, locals, Expr::size_of(ty, span())).unwrap();
            expr.constant().map(|c| c.value.clone())
        };
        assert_eq!(size(DataType::INT32, &mut locals), Some(ConstValue::Int(4)));
        assert_eq!(size(DataType::simple(primitives::CHAR), &mut locals), Some(ConstValue::Int(2)));
        assert_eq!(size(DataType::simple(primitives::DECIMAL), &mut locals), Some(ConstValue::Int(16)));
        assert_eq!(size(s.color, &mut locals), Some(ConstValue::Int(1)));

        let void = resolve(&s.reg, &mut locals, Expr::size_of(DataType::VOID, span())).unwrap_err();
        assert_eq!(void.code(), 1547);
    }

    #[test]
    fn sizeof_of_other_types_needs_unsafe_and_unmanaged() {
        let s = shapes();
        let mut locals = LocalTable::new();
        let err = resolve(&s.reg, &mut locals, Expr::size_of(s.point, span())).unwrap_err();
        assert_eq!(err.code(), 233);

        let unsafe_options = CompilerOptions::default().allow_unsafe(true);
        let (point, _) = resolve_with(&s.reg, &mut locals, unsafe_options, None, Expr::size_of(s.point, span()));
        let point = point.unwrap();
        assert_eq!(point.ty, Some(DataType::INT32));
        emit_value(&s.reg, &locals, &point).assert_opcodes(&[OpCode::SizeOf]);

        let (shape, _) = resolve_with(&s.reg, &mut locals, unsafe_options, None, Expr::size_of(s.shape, span()));
        assert_eq!(shape.unwrap_err().code(), 208);
    }

    #[test]
    fn default_of_a_type() {
        let mut s = shapes();
        let classy = ty(s
            .reg
            .define(
                "U",
                TypeKind::TypeParameter(TypeParamConstraints {
                    is_reference_type: true,
                    ..TypeParamConstraints::default()
                }),
            )
            .build()
            .unwrap());
        let mut locals = LocalTable::new();
        let constant = |ty: DataType, locals: &mut LocalTable| {
            let expr = resolve(&s.reg, locals, Expr::default_of(ty, span())).unwrap();
            assert_eq!(expr.ty, Some(ty));
            expr.constant().map(|c| c.value.clone())
        };
        assert_eq!(constant(DataType::INT32, &mut locals), Some(ConstValue::Int(0)));
        assert_eq!(constant(DataType::BOOL, &mut locals), Some(ConstValue::Bool(false)));
        assert_eq!(constant(s.shape, &mut locals), Some(ConstValue::Null));
        assert_eq!(constant(classy, &mut locals), Some(ConstValue::Null));

        let point = resolve(&s.reg, &mut locals, Expr::default_of(s.point, span())).unwrap();
        assert!(matches!(point.kind, ExprKind::DefaultValue));
        emit_value(&s.reg, &locals, &point).assert_opcodes(&[OpCode::LdLocA, OpCode::InitObj, OpCode::LdLoc]);

        let void = resolve(&s.reg, &mut locals, Expr::default_of(DataType::VOID, span())).unwrap_err();
        assert_eq!(void.code(), 1547);
    }

    #[test]
    fn unmanaged_types() {
        let s = shapes();
        assert!(is_unmanaged(DataType::INT32, &s.reg));
        assert!(is_unmanaged(s.point, &s.reg));
        assert!(is_unmanaged(s.color, &s.reg));
        assert!(is_unmanaged(s.shape.pointer_to(), &s.reg));
        assert!(!is_unmanaged(DataType::STRING, &s.reg));
        assert!(!is_unmanaged(s.shape, &s.reg));
        assert!(!is_unmanaged(DataType::array_of(DataType::INT32, 1), &s.reg));
    }
}
