//! Simple names, locals, `this` and `base`.
//!
//! A simple name is looked up as a local first, then as a member of the
//! enclosing type (with an implicit `this`), then as a type, then as a
//! namespace.

use sable_core::{CompilationError, DataType, ExprClass, Span, TypeHash};

use super::member::{self, Receiver};
use super::{Expr, ExprKind};
use crate::context::{ResolveContext, ResolveFlags};
use crate::locals::LocalId;

type Result<T> = std::result::Result<T, CompilationError>;

pub(super) fn resolve_name(name: &str, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    if let Some(id) = rc.locals.lookup(name) {
        return resolve_local(id, span, true, rc);
    }

    let types = rc.types;
    if let Some(owner) = rc.enclosing_type() {
        if let Some(lookup) = types.lookup_member(owner, name) {
            let this = implicit_this(owner, span, rc);
            return member::bind_member(Receiver::Implicit(this), lookup, name, span, rc);
        }
    }

    if let Some(hash) = types.find_type(name) {
        let ty = DataType::simple(hash);
        return Ok(Expr::resolved(ExprKind::TypeRef(ty), ty, ExprClass::Type, span));
    }
    if types.is_namespace(name) {
        return Ok(Expr::resolved(
            ExprKind::Namespace(name.to_string()),
            DataType::VOID,
            ExprClass::Namespace,
            span,
        ));
    }
    Err(CompilationError::NameNotFound {
        name: name.to_string(),
        span,
    })
}

/// A local or parameter. Reads require the variable to be definitely
/// assigned; assignment targets pass `require_assigned = false`.
pub(super) fn resolve_local(
    id: LocalId,
    span: Span,
    require_assigned: bool,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let info = rc
        .locals
        .get(id)
        .ok_or_else(|| CompilationError::internal(format!("local {} is not declared", id.0)))?;
    if require_assigned && !info.assigned {
        let name = info.name.clone();
        return Err(if info.is_out_param() {
            CompilationError::UnassignedOutParameter { name, span }
        } else {
            CompilationError::UnassignedLocal { name, span }
        });
    }
    Ok(Expr::resolved(
        ExprKind::Variable {
            id,
            storage: info.storage,
        },
        info.ty,
        ExprClass::Variable,
        span,
    ))
}

fn this_expr(owner: TypeHash, span: Span, rc: &ResolveContext<'_>) -> Expr {
    let ty = DataType::simple(owner);
    // A struct's `this` is a variable passed by reference.
    let class = if rc.types.is_value_type(ty) {
        ExprClass::Variable
    } else {
        ExprClass::Value
    };
    Expr::resolved(ExprKind::This, ty, class, span)
}

/// The receiver of an unqualified instance member, if `this` exists here.
///
/// Struct constructors may assign fields through it before every field is
/// assigned, so the check `this` itself makes does not apply.
fn implicit_this(owner: TypeHash, span: Span, rc: &ResolveContext<'_>) -> Option<Expr> {
    if rc.flags().intersects(ResolveFlags::STATIC | ResolveFlags::NO_THIS) {
        return None;
    }
    Some(this_expr(owner, span, rc))
}

fn check_this_available(span: Span, rc: &ResolveContext<'_>) -> Result<TypeHash> {
    let flags = rc.flags();
    if flags.contains(ResolveFlags::STATIC) {
        return Err(CompilationError::ThisInStaticContext { span });
    }
    if flags.contains(ResolveFlags::NO_THIS) {
        return Err(CompilationError::ThisUnavailable { span });
    }
    rc.enclosing_type()
        .ok_or(CompilationError::ThisUnavailable { span })
}

pub(super) fn resolve_this(span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let owner = check_this_available(span, rc)?;
    let this = this_expr(owner, span, rc);
    if rc.flags().contains(ResolveFlags::UNASSIGNED_FIELDS) && this.class == ExprClass::Variable {
        return Err(CompilationError::ThisBeforeFieldsAssigned { span });
    }
    Ok(this)
}

pub(super) fn resolve_base(span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let owner = check_this_available(span, rc)?;
    let base = rc
        .types
        .type_info(owner)
        .and_then(|info| info.base)
        .ok_or(CompilationError::ThisUnavailable { span })?;
    let ty = DataType::simple(base);
    Ok(Expr::resolved(ExprKind::Base, ty, ExprClass::Value, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use crate::overload::BestMatchResolver;
    use sable_core::{Diagnostics, ParamModifier};
    use sable_registry::TypeRegistry;

    #[test]
    fn unassigned_locals_cannot_be_read() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("x", DataType::INT32, false);
        locals.declare_param("result", DataType::INT32, 0, ParamModifier::Out);

        let err = resolve(&reg, &mut locals, Expr::name("x", span())).unwrap_err();
        assert_eq!(err.code(), 165);
        let err = resolve(&reg, &mut locals, Expr::name("result", span())).unwrap_err();
        assert_eq!(err.code(), 269);
    }

    #[test]
    fn locals_resolve_to_variables() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let id = int_local(&mut locals, "n");
        let expr = resolve(&reg, &mut locals, Expr::name("n", span())).unwrap();
        assert_eq!(expr.class, ExprClass::Variable);
        assert!(matches!(expr.kind, ExprKind::Variable { id: found, .. } if found == id));
    }

    #[test]
    fn unknown_names() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let err = resolve(&reg, &mut locals, Expr::name("missing", span())).unwrap_err();
        assert_eq!(err.code(), 103);
    }

    #[test]
    fn type_names_resolve_to_types() {
        let mut reg = TypeRegistry::with_builtins();
        reg.define_class("Widget").build().unwrap();
        let mut locals = LocalTable::new();
        let expr = resolve(&reg, &mut locals, Expr::name("Widget", span())).unwrap();
        assert_eq!(expr.class, ExprClass::Type);
    }

    #[test]
    fn fields_of_the_enclosing_type_bind_to_this() {
        let mut reg = TypeRegistry::with_builtins();
        let counter = reg.define_class("Counter").field("count", DataType::INT32).build().unwrap();
        let mut locals = LocalTable::new();
        let (result, _) = resolve_with(
            &reg,
            &mut locals,
            CompilerOptions::default(),
            Some(counter),
            Expr::name("count", span()),
        );
        let expr = result.unwrap();
        let ExprKind::Field { instance: Some(instance), .. } = &expr.kind else {
            panic!("expected an instance field, got {:?}", expr.kind);
        };
        assert!(matches!(instance.kind, ExprKind::This));
    }

    #[test]
    fn this_depends_on_context() {
        let mut reg = TypeRegistry::with_builtins();
        let counter = reg.define_class("Counter").field("count", DataType::INT32).build().unwrap();
        let point = reg.define_struct("Point").field("x", DataType::INT32).build().unwrap();
        let mut diags = Diagnostics::new();
        let mut locals = LocalTable::new();

        let mut rc = ResolveContext::new(&reg, &BestMatchResolver, &mut diags, &mut locals, CompilerOptions::default())
            .with_enclosing_type(counter);
        rc.set_flags(ResolveFlags::STATIC, true);
        assert_eq!(Expr::this(span()).resolve(&mut rc).unwrap_err().code(), 26);
        assert_eq!(Expr::name("count", span()).resolve(&mut rc).unwrap_err().code(), 120);
        rc.set_flags(ResolveFlags::STATIC, false);
        rc.set_flags(ResolveFlags::NO_THIS, true);
        assert_eq!(Expr::this(span()).resolve(&mut rc).unwrap_err().code(), 27);
        drop(rc);

        let mut rc = ResolveContext::new(&reg, &BestMatchResolver, &mut diags, &mut locals, CompilerOptions::default())
            .with_enclosing_type(point);
        rc.set_flags(ResolveFlags::UNASSIGNED_FIELDS, true);
        assert_eq!(Expr::this(span()).resolve(&mut rc).unwrap_err().code(), 188);
        // Field assignment through the implicit receiver is still allowed.
        assert!(Expr::name("x", span()).resolve(&mut rc).is_ok());
    }
}
