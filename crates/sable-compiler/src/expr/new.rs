//! Object creation: `new T(args) { initializers }`.
//!
//! Value types without arguments are zeroed; those with a default constant
//! fold to it. Type parameters are created through the activator. Object
//! and collection initializers run against a temporary holding the new
//! instance, named by [`ExprKind::InitializerTarget`].

use rustc_hash::FxHashSet;
use sable_core::{CompilationError, DataType, ExprClass, MemberLookup, Span, TypeFlags, TypeHash, TypeKind};

use super::invocation::{bind_arguments, emit_args, method_candidates, resolve_arguments, select};
use super::literal::{default_constant, emit_default};
use super::member::{Receiver, bind_member};
use super::{Argument, Expr, ExprKind, InitElement, InitValue};
use crate::bytecode::OpCode;
use crate::context::ResolveContext;
use crate::emit::EmitContext;

type Result<T> = std::result::Result<T, CompilationError>;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_new(
    ty: DataType,
    args: Vec<Argument>,
    initializer: Option<Vec<InitElement>>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let creation = resolve_creation(ty, args, span, rc)?;
    let Some(elements) = initializer else {
        return Ok(creation);
    };

    let target = Expr::resolved(ExprKind::InitializerTarget, ty, ExprClass::Variable, span);
    rc.push_initializer_target(ty);
    let steps = resolve_initializer(target, ty, elements, span, rc);
    rc.pop_initializer_target();
    let steps = steps?;
    tracing::trace!(ty = %rc.types.type_name(ty), steps = steps.len(), "object initializer");

    Ok(Expr::value(
        ExprKind::ObjectInitializer {
            creation: Box::new(creation),
            steps,
        },
        ty,
        span,
    ))
}

fn resolve_creation(ty: DataType, args: Vec<Argument>, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let types = rc.types;
    let name = types.type_name(ty);
    let Some(info) = types.type_info(ty.type_hash) else {
        return Err(CompilationError::TypeNotFound { name, span });
    };

    if let TypeKind::TypeParameter(constraints) = &info.kind {
        if !args.is_empty() {
            return Err(CompilationError::TypeParameterConstructorArgs { ty: name, span });
        }
        if !constraints.has_default_constructor && !constraints.is_value_type {
            return Err(CompilationError::MissingNewConstraint { ty: name, span });
        }
        let create = rc
            .well_known
            .create_instance
            .ok_or_else(|| CompilationError::internal("activator is not registered"))?;
        return Ok(Expr::value(ExprKind::NewTypeParameter { create }, ty, span));
    }
    if info.flags.contains(TypeFlags::STATIC) {
        return Err(CompilationError::StaticInstantiation { ty: name, span });
    }
    if info.is_abstract() {
        return Err(CompilationError::AbstractInstantiation { ty: name, span });
    }

    let args = resolve_arguments(args, rc)?;
    let constructors = types.constructors(ty.type_hash);

    if info.is_value_type() && args.is_empty() {
        if let Some(constant) = default_constant(ty, types) {
            return Ok(Expr::from_constant(constant, span));
        }
        return Ok(Expr::value(
            ExprKind::NewValueType {
                ctor: None,
                args: Vec::new(),
            },
            ty,
            span,
        ));
    }

    if constructors.is_empty() {
        if !args.is_empty() {
            return Err(CompilationError::ArgumentCountMismatch {
                method: name,
                count: args.len(),
                span,
            });
        }
        let ctor = TypeHash::from_constructor(ty.type_hash, &[]);
        return Ok(Expr::value(ExprKind::NewObject { ctor, args: Vec::new() }, ty, span));
    }

    let candidates = method_candidates(constructors, rc);
    let selected = select(&candidates, &args, span, rc)?;
    let params = types
        .method(selected.method)
        .map(|m| m.params.clone())
        .ok_or_else(|| CompilationError::internal("selected constructor is not registered"))?;
    let args = bind_arguments(&params, &selected, args, span, rc)?;

    let kind = if info.is_value_type() {
        ExprKind::NewValueType {
            ctor: Some(selected.method),
            args,
        }
    } else {
        ExprKind::NewObject {
            ctor: selected.method,
            args,
        }
    };
    Ok(Expr::value(kind, ty, span))
}

/// Resolve the elements of an initializer applied to `target`.
fn resolve_initializer(
    target: Expr,
    ty: DataType,
    elements: Vec<InitElement>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Vec<Expr>> {
    let has_members = elements.iter().any(|e| matches!(e, InitElement::Member { .. }));
    let has_items = elements.iter().any(|e| matches!(e, InitElement::Item { .. }));
    if has_members && has_items {
        return Err(CompilationError::MixedInitializer { span });
    }
    if has_items {
        return resolve_collection(target, ty, elements, span, rc);
    }

    let mut seen = FxHashSet::default();
    let mut results = Vec::with_capacity(elements.len());
    for element in elements {
        let InitElement::Member { name, value, span } = element else {
            continue;
        };
        if !seen.insert(name.clone()) {
            results.push(Err(CompilationError::DuplicateInitializerMember { member: name, span }));
            continue;
        }
        results.push(resolve_member_step(&target, ty, &name, value, span, rc));
    }
    let steps = rc.join_all(results)?;
    Ok(steps.into_iter().flatten().collect())
}

/// The assignments one `member = value` element expands to.
fn resolve_member_step(
    target: &Expr,
    ty: DataType,
    name: &str,
    value: InitValue,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Vec<Expr>> {
    let member = resolve_init_member(target, ty, name, span, rc)?;
    match value {
        InitValue::Expr(value) => Ok(vec![Expr::assign(member, value, span).resolve(rc)?]),
        InitValue::Nested(nested) => {
            let member_ty = member.data_type();
            if rc.types.is_value_type(member_ty) {
                return Err(CompilationError::NotAssignable { span });
            }
            resolve_initializer(member, member_ty, nested, span, rc)
        }
    }
}

/// The field or property `name` of the object being initialized.
fn resolve_init_member(
    target: &Expr,
    ty: DataType,
    name: &str,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let types = rc.types;
    let Some(lookup) = types.lookup_member(ty.type_hash, name) else {
        return Err(CompilationError::MemberNotFound {
            ty: types.type_name(ty),
            member: name.to_string(),
            span,
        });
    };
    let is_static = match &lookup {
        MemberLookup::Field(field) => field.is_static || field.constant.is_some(),
        MemberLookup::Property(property) => property.is_static,
        _ => {
            return Err(CompilationError::InitializerMemberNotFieldOrProperty {
                member: name.to_string(),
                span,
            });
        }
    };
    if is_static {
        return Err(CompilationError::StaticInitializerMember {
            member: name.to_string(),
            span,
        });
    }
    bind_member(Receiver::Instance(target.clone()), lookup, name, span, rc)
}

/// Collection elements become `target.Add(args)` calls.
fn resolve_collection(
    target: Expr,
    ty: DataType,
    elements: Vec<InitElement>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Vec<Expr>> {
    let types = rc.types;
    let enumerable = ty.is_array()
        || types
            .type_info(ty.type_hash)
            .is_some_and(|info| info.flags.contains(TypeFlags::ENUMERABLE));
    if !enumerable {
        return Err(CompilationError::CollectionInitializerUnsupported {
            ty: types.type_name(ty),
            span,
        });
    }

    let results: Vec<Result<Expr>> = elements
        .into_iter()
        .filter_map(|element| match element {
            InitElement::Item { args, span } => Some((args, span)),
            InitElement::Member { .. } => None,
        })
        .map(|(args, span)| {
            let add = Expr::member(target.clone(), "Add", span);
            let args = args.into_iter().map(Argument::value).collect();
            Expr::invoke(add, args, span).resolve(rc)
        })
        .collect();
    rc.join_all(results)
}

pub(super) fn emit_new(expr: &Expr, ec: &mut EmitContext<'_>, leave_value: bool) -> Result<()> {
    let ty = expr.data_type();
    match &expr.kind {
        ExprKind::NewObject { ctor, args }
        | ExprKind::NewValueType {
            ctor: Some(ctor),
            args,
        } => {
            let argc = emit_args(args, ec)?;
            ec.sink.emit_call(OpCode::NewObj, *ctor, argc);
        }
        ExprKind::NewValueType { ctor: None, .. } => emit_default(ty, ec)?,
        ExprKind::NewTypeParameter { create } => {
            ec.sink.emit_call(OpCode::Call, *create, 0);
            ec.sink.emit_type(OpCode::UnboxAny, ty);
        }
        ExprKind::ObjectInitializer { creation, steps } => {
            creation.emit(ec)?;
            let temp = ec.acquire_temp(ty);
            ec.store_temp(temp);
            ec.push_initializer_target(temp);
            for step in steps {
                step.emit_statement(ec)?;
            }
            ec.pop_initializer_target();
            if leave_value {
                ec.load_temp(temp);
            }
            return ec.release_temp(temp);
        }
        _ => return Err(CompilationError::internal("expected an object creation")),
    }
    if !leave_value {
        ec.sink.emit(OpCode::Pop);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use sable_core::{ParamInfo, TypeHash, TypeParamConstraints, primitives};
    use sable_registry::{TypeRegistry, ty};

    fn name(n: &str) -> Expr {
        Expr::name(n, span())
    }

    fn new(ty: DataType, args: Vec<Argument>) -> Expr {
        Expr::new_object(ty, args, None, span())
    }

    fn with_init(ty: DataType, elements: Vec<InitElement>) -> Expr {
        Expr::new_object(ty, Vec::new(), Some(elements), span())
    }

    fn set(member: &str, value: Expr) -> InitElement {
        InitElement::Member {
            name: member.to_string(),
            value: InitValue::Expr(value),
            span: span(),
        }
    }

    fn item(args: Vec<Expr>) -> InitElement {
        InitElement::Item { args, span: span() }
    }

    fn shapes() -> (TypeRegistry, DataType, DataType) {
        let mut reg = TypeRegistry::with_builtins();
        let point = reg
            .define_struct("Point")
            .field("X", DataType::INT32)
            .field("Y", DataType::INT32)
            .constructor(&[ParamInfo::new("x", DataType::INT32), ParamInfo::new("y", DataType::INT32)])
            .build()
            .unwrap();
        let shape = reg
            .define_class("Shape")
            .field("Name", DataType::STRING)
            .property("Area", ty(primitives::DOUBLE), true, true)
            .static_field("Count", DataType::INT32)
            .method("Draw", &[], DataType::VOID)
            .build()
            .unwrap();
        (reg, ty(point), ty(shape))
    }

    #[test]
    fn zeroing_a_struct_variable_is_initobj() {
        let (reg, point, _) = shapes();
        let mut locals = LocalTable::new();
        locals.declare("s", point, false);
        let expr = Expr::assign(name("s"), new(point, Vec::new()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        emit_statement(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdLocA, OpCode::InitObj]);
    }

    #[test]
    fn struct_constructor_calls_newobj() {
        let (reg, point, _) = shapes();
        let mut locals = LocalTable::new();
        let expr = new(point, vec![Argument::value(Expr::int(1, span())), Argument::value(Expr::int(2, span()))]);
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        assert!(matches!(expr.kind, ExprKind::NewValueType { ctor: Some(_), .. }));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::PushOne, OpCode::Constant, OpCode::NewObj]);
    }

    #[test]
    fn struct_constructor_assigned_to_a_variable_runs_in_place() {
        let (reg, point, _) = shapes();
        let mut locals = LocalTable::new();
        locals.declare("s", point, false);
        let ctor_args = || vec![Argument::value(Expr::int(1, span())), Argument::value(Expr::int(2, span()))];

        let store = Expr::assign(name("s"), new(point, ctor_args()), span());
        let store = resolve(&reg, &mut locals, store).unwrap();
        let chunk = emit_statement(&reg, &locals, &store);
        chunk.assert_opcodes(&[OpCode::LdLocA, OpCode::PushOne, OpCode::Constant, OpCode::Call]);
        assert_eq!(chunk.read_byte(chunk.len() - 1), Some(2));

        // As a value the new instance is built first and copied.
        let kept = Expr::assign(name("s"), new(point, ctor_args()), span());
        let kept = resolve(&reg, &mut locals, kept).unwrap();
        emit_value(&reg, &locals, &kept).assert_contains_opcodes(&[OpCode::NewObj, OpCode::Dup, OpCode::StLoc]);
    }

    #[test]
    fn struct_constructor_stored_to_a_field_uses_newobj() {
        let (mut reg, point, _) = shapes();
        let holder = reg.define_class("Holder").field("P", point).build().unwrap();
        let mut locals = LocalTable::new();
        locals.declare("h", ty(holder), true);
        let field = Expr::member(name("h"), "P", span());
        let args = vec![Argument::value(Expr::int(1, span())), Argument::value(Expr::int(2, span()))];
        let store = resolve(&reg, &mut locals, Expr::assign(field, new(point, args), span())).unwrap();
        emit_statement(&reg, &locals, &store).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::PushOne,
            OpCode::Constant,
            OpCode::NewObj,
            OpCode::StFld,
        ]);
    }

    #[test]
    fn primitives_fold_to_their_default() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = resolve(&reg, &mut locals, new(DataType::INT32, Vec::new())).unwrap();
        assert!(expr.constant().is_some_and(|c| c.value.is_default()));
    }

    #[test]
    fn classes_without_constructors() {
        let (reg, _, shape) = shapes();
        let mut locals = LocalTable::new();
        let expr = resolve(&reg, &mut locals, new(shape, Vec::new())).unwrap();
        assert!(matches!(expr.kind, ExprKind::NewObject { .. }));

        let err = resolve(&reg, &mut locals, new(shape, vec![Argument::value(Expr::int(1, span()))])).unwrap_err();
        assert_eq!(err.code(), 1501);
    }

    #[test]
    fn uninstantiable_types() {
        let mut reg = TypeRegistry::with_builtins();
        let base = reg.define_class("Base").flags(TypeFlags::ABSTRACT).build().unwrap();
        let util = reg
            .define_class("Util")
            .flags(TypeFlags::STATIC | TypeFlags::ABSTRACT | TypeFlags::SEALED)
            .build()
            .unwrap();
        let mut locals = LocalTable::new();
        assert_eq!(resolve(&reg, &mut locals, new(ty(base), Vec::new())).unwrap_err().code(), 144);
        assert_eq!(resolve(&reg, &mut locals, new(ty(util), Vec::new())).unwrap_err().code(), 712);
        let missing = DataType::simple(TypeHash::from_name("Missing"));
        assert_eq!(resolve(&reg, &mut locals, new(missing, Vec::new())).unwrap_err().code(), 246);
    }

    #[test]
    fn type_parameters_need_the_new_constraint() {
        let mut reg = TypeRegistry::with_builtins();
        let creatable = reg
            .define(
                "T",
                TypeKind::TypeParameter(TypeParamConstraints {
                    has_default_constructor: true,
                    ..TypeParamConstraints::default()
                }),
            )
            .build()
            .unwrap();
        let plain = reg
            .define("U", TypeKind::TypeParameter(TypeParamConstraints::default()))
            .build()
            .unwrap();
        let mut locals = LocalTable::new();

        let expr = resolve(&reg, &mut locals, new(ty(creatable), Vec::new())).unwrap();
        assert!(matches!(expr.kind, ExprKind::NewTypeParameter { .. }));
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::Call, OpCode::UnboxAny]);

        assert_eq!(resolve(&reg, &mut locals, new(ty(plain), Vec::new())).unwrap_err().code(), 304);
        let with_args = new(ty(creatable), vec![Argument::value(Expr::int(1, span()))]);
        assert_eq!(resolve(&reg, &mut locals, with_args).unwrap_err().code(), 417);
    }

    #[test]
    fn object_initializer_assigns_members() {
        let (reg, _, shape) = shapes();
        let mut locals = LocalTable::new();
        let expr = with_init(
            shape,
            vec![set("Name", Expr::string("box", span())), set("Area", Expr::int(4, span()))],
        );
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        let ExprKind::ObjectInitializer { steps, .. } = &expr.kind else {
            panic!("expected an object initializer");
        };
        assert_eq!(steps.len(), 2);
        emit_value(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::NewObj,
            OpCode::StLoc,
            OpCode::LdLoc,
            OpCode::Constant,
            OpCode::StFld,
            OpCode::LdLoc,
            OpCode::Constant,
            OpCode::Call,
            OpCode::LdLoc,
        ]);
    }

    #[test]
    fn initializer_member_errors() {
        let (reg, _, shape) = shapes();
        let mut locals = LocalTable::new();
        let cases = [
            (vec![set("Name", Expr::string("a", span())), set("Name", Expr::string("b", span()))], 1912),
            (vec![set("Draw", Expr::int(1, span()))], 1913),
            (vec![set("Count", Expr::int(1, span()))], 1914),
            (vec![set("Missing", Expr::int(1, span()))], 117),
            (vec![set("Name", Expr::string("a", span())), item(vec![Expr::int(1, span())])], 747),
            (vec![item(vec![Expr::int(1, span())])], 1922),
        ];
        for (elements, code) in cases {
            let err = resolve(&reg, &mut locals, with_init(shape, elements)).unwrap_err();
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn every_bad_initializer_member_is_reported() {
        let (reg, _, shape) = shapes();
        let mut locals = LocalTable::new();
        let elements = vec![
            set("Missing", Expr::int(1, span())),
            set("Name", Expr::string("ok", span())),
            set("Count", Expr::int(1, span())),
            set("Name", Expr::string("again", span())),
        ];
        let (result, diags) = resolve_with(
            &reg,
            &mut locals,
            crate::options::CompilerOptions::default(),
            None,
            with_init(shape, elements),
        );
        assert_eq!(result.unwrap_err().code(), 117);
        assert!(diags.contains(1914));
        assert!(diags.contains(1912));
        assert!(!diags.contains(117));
    }

    #[test]
    fn collection_initializer_calls_add() {
        let mut reg = TypeRegistry::with_builtins();
        let bag = reg
            .define_class("Bag")
            .flags(TypeFlags::ENUMERABLE)
            .method("Add", &[ParamInfo::new("item", DataType::INT32)], DataType::VOID)
            .build()
            .unwrap();
        let mut locals = LocalTable::new();
        let expr = with_init(ty(bag), vec![item(vec![Expr::int(1, span())]), item(vec![Expr::int(2, span())])]);
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        let ExprKind::ObjectInitializer { steps, .. } = &expr.kind else {
            panic!("expected an object initializer");
        };
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| matches!(s.kind, ExprKind::Call { .. })));
    }

    #[test]
    fn nested_initializers_need_reference_members() {
        let (mut reg, point, _) = shapes();
        let line = reg.define_class("Line").field("Start", point).build().unwrap();
        let mut locals = LocalTable::new();
        let nested = InitElement::Member {
            name: "Start".to_string(),
            value: InitValue::Nested(vec![set("X", Expr::int(1, span()))]),
            span: span(),
        };
        let err = resolve(&reg, &mut locals, with_init(ty(line), vec![nested])).unwrap_err();
        assert_eq!(err.code(), 131);
    }
}
