//! Member access: `expr.Name`, `Type.Name`, `Namespace.Name`.

use sable_core::{CompilationError, DataType, ExprClass, MemberLookup, Span, primitives};

use super::{Expr, ExprKind};
use crate::constant::{ConstValue, Constant};
use crate::context::{ResolveContext, ResolveFlags};

type Result<T> = std::result::Result<T, CompilationError>;

/// What a member is accessed through.
pub(super) enum Receiver {
    /// `Type.Member`
    Type,
    /// `expr.Member`
    Instance(Expr),
    /// A simple name in a member body, with `this` when one exists.
    Implicit(Option<Expr>),
}

impl Receiver {
    /// The instance for a member that is or is not static.
    fn bind(self, is_static: bool, member: &str, span: Span) -> Result<Option<Box<Expr>>> {
        match (self, is_static) {
            (Receiver::Type | Receiver::Implicit(_), true) => Ok(None),
            (Receiver::Instance(_), true) => Err(CompilationError::StaticMemberThroughInstance {
                member: member.to_string(),
                span,
            }),
            (Receiver::Instance(instance) | Receiver::Implicit(Some(instance)), false) => {
                Ok(Some(Box::new(instance)))
            }
            (Receiver::Type | Receiver::Implicit(None), false) => {
                Err(CompilationError::InstanceMemberWithoutObject {
                    member: member.to_string(),
                    span,
                })
            }
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_member_access(
    target: Expr,
    name: &str,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let target = target.resolve(rc)?;
    let types = rc.types;
    match target.class {
        ExprClass::Namespace => {
            let ExprKind::Namespace(namespace) = &target.kind else {
                return Err(CompilationError::internal("namespace class without a namespace"));
            };
            let qualified = format!("{namespace}.{name}");
            if let Some(hash) = types.find_type(&qualified) {
                let ty = DataType::simple(hash);
                Ok(Expr::resolved(ExprKind::TypeRef(ty), ty, ExprClass::Type, span))
            } else if types.is_namespace(&qualified) {
                Ok(Expr::resolved(
                    ExprKind::Namespace(qualified),
                    DataType::VOID,
                    ExprClass::Namespace,
                    span,
                ))
            } else {
                Err(CompilationError::TypeNotFound { name: qualified, span })
            }
        }
        ExprClass::Type => {
            let owner = target.data_type();
            let lookup = types
                .lookup_member(owner.type_hash, name)
                .ok_or_else(|| not_found(owner, name, span, rc))?;
            bind_member(Receiver::Type, lookup, name, span, rc)
        }
        _ => {
            let target = target.into_value(rc)?;
            let ty = target.data_type();
            let owner = if ty.is_array() {
                primitives::ARRAY
            } else if ty.is_pointer() {
                return Err(not_found(ty, name, span, rc));
            } else {
                ty.type_hash
            };
            let lookup = types
                .lookup_member(owner, name)
                .ok_or_else(|| not_found(ty, name, span, rc))?;
            bind_member(Receiver::Instance(target), lookup, name, span, rc)
        }
    }
}

fn not_found(owner: DataType, name: &str, span: Span, rc: &ResolveContext<'_>) -> CompilationError {
    CompilationError::MemberNotFound {
        ty: rc.types.type_name(owner),
        member: name.to_string(),
        span,
    }
}

/// Turn a looked-up member into its expression.
pub(super) fn bind_member(
    receiver: Receiver,
    lookup: MemberLookup<'_>,
    name: &str,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let types = rc.types;
    match lookup {
        MemberLookup::Field(field) => {
            if let Some(value) = &field.constant {
                if matches!(receiver, Receiver::Instance(_)) {
                    return Err(CompilationError::StaticMemberThroughInstance {
                        member: name.to_string(),
                        span,
                    });
                }
                let value = ConstValue::from_member(value, field.ty, types).ok_or_else(|| {
                    CompilationError::internal(format!("constant '{name}' does not fit its type"))
                })?;
                tracing::trace!(member = name, %value, "folded constant member");
                return Ok(Expr::from_constant(Constant::with_type(value, field.ty), span));
            }
            let instance = receiver.bind(field.is_static, name, span)?;
            // A field of a struct value (not a variable) is itself a value.
            let class = match &instance {
                Some(i) if i.class != ExprClass::Variable && types.is_value_type(i.data_type()) => {
                    ExprClass::Value
                }
                _ => ExprClass::Variable,
            };
            Ok(Expr::resolved(
                ExprKind::Field {
                    instance,
                    field: field.hash,
                },
                field.ty,
                class,
                span,
            ))
        }
        MemberLookup::Property(property) => {
            let instance = receiver.bind(property.is_static, name, span)?;
            let through_base = instance.as_ref().is_some_and(|i| matches!(i.kind, ExprKind::Base));
            let is_virtual = property
                .getter
                .or(property.setter)
                .and_then(|m| types.method(m))
                .is_some_and(|m| m.is_virtual());
            Ok(Expr::resolved(
                ExprKind::Property {
                    instance,
                    name: name.to_string(),
                    getter: property.getter,
                    setter: property.setter,
                    virtual_call: is_virtual && !through_base,
                },
                property.ty,
                ExprClass::PropertyAccess,
                span,
            ))
        }
        MemberLookup::Event(event) => {
            if !rc.flags().contains(ResolveFlags::EVENT_ASSIGNMENT) {
                return Err(CompilationError::EventMisuse {
                    event: name.to_string(),
                    span,
                });
            }
            let instance = receiver.bind(event.is_static, name, span)?;
            Ok(Expr::resolved(
                ExprKind::Event {
                    instance,
                    name: name.to_string(),
                    add: event.add,
                    remove: event.remove,
                },
                event.ty,
                ExprClass::EventAccess,
                span,
            ))
        }
        MemberLookup::Methods(methods) => {
            // Static-ness is checked once overload resolution has picked a
            // method.
            let (instance, implicit) = match receiver {
                Receiver::Type => (None, false),
                Receiver::Instance(instance) => (Some(Box::new(instance)), false),
                Receiver::Implicit(this) => (this.map(Box::new), true),
            };
            let non_virtual = instance.as_ref().is_some_and(|i| matches!(i.kind, ExprKind::Base));
            Ok(Expr::resolved(
                ExprKind::MethodGroup {
                    instance,
                    name: name.to_string(),
                    methods,
                    non_virtual,
                    implicit,
                },
                DataType::VOID,
                ExprClass::MethodGroup,
                span,
            ))
        }
        MemberLookup::NestedType(hash) => {
            let ty = DataType::simple(hash);
            Ok(Expr::resolved(ExprKind::TypeRef(ty), ty, ExprClass::Type, span))
        }
    }
}
