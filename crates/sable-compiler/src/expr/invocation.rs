//! Invocation: method calls, delegate calls and argument binding.
//!
//! Argument binding is shared with constructors and indexers: `ref`/`out`
//! arguments pass their variable's address, value arguments convert to the
//! parameter type, omitted optional parameters get `default(T)` and
//! expanded `params` arguments are packed into a new array.

use sable_core::{CompilationError, DataType, ExprClass, ParamInfo, ParamModifier, Span, TypeHash};

use super::{Argument, Expr, ExprKind, default_value, implicit_conversion};
use crate::bytecode::OpCode;
use crate::constant::Constant;
use crate::context::ResolveContext;
use crate::emit::EmitContext;
use crate::overload::{ArgumentInfo, Candidate, OverloadMatch};

type Result<T> = std::result::Result<T, CompilationError>;

/// Resolve each argument according to its passing mode. Errors in several
/// arguments are all reported.
pub(super) fn resolve_arguments(args: Vec<Argument>, rc: &mut ResolveContext<'_>) -> Result<Vec<Argument>> {
    let results: Vec<Result<Argument>> = args
        .into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let modifier = arg.modifier;
            let expr = match modifier {
                ParamModifier::Ref => arg.expr.resolve_target(rc, false).and_then(|e| check_ref_argument(e, index, rc)),
                ParamModifier::Out => arg.expr.resolve_target(rc, true).and_then(|e| check_ref_argument(e, index, rc)),
                ParamModifier::None | ParamModifier::Params => arg.expr.resolve_value(rc),
            };
            expr.map(|expr| Argument { expr, modifier })
        })
        .collect();
    rc.join_all(results)
}

fn check_ref_argument(expr: Expr, index: usize, rc: &ResolveContext<'_>) -> Result<Expr> {
    match expr.class {
        ExprClass::Variable => Ok(expr),
        ExprClass::PropertyAccess | ExprClass::IndexerAccess => Err(CompilationError::PropertyAsRefArgument {
            member: expr.describe(rc),
            span: expr.span,
        }),
        _ => Err(CompilationError::RefArgumentNotAssignable {
            index: index + 1,
            span: expr.span,
        }),
    }
}

/// Pick the best of `candidates` for the resolved arguments.
pub(super) fn select(
    candidates: &[Candidate<'_>],
    args: &[Argument],
    span: Span,
    rc: &ResolveContext<'_>,
) -> Result<OverloadMatch> {
    let infos: Vec<ArgumentInfo<'_>> = args
        .iter()
        .map(|arg| ArgumentInfo {
            ty: arg.expr.data_type(),
            modifier: arg.modifier,
            constant: arg.expr.constant(),
        })
        .collect();
    rc.overloads.select(rc.types, candidates, &infos, span)
}

/// Candidates for registered methods.
pub(super) fn method_candidates<'t>(methods: &[TypeHash], rc: &ResolveContext<'t>) -> Vec<Candidate<'t>> {
    let types = rc.types;
    methods.iter().filter_map(|&m| Candidate::method(types, m)).collect()
}

/// Turn the arguments into the values passed for `params`.
pub(super) fn bind_arguments(
    params: &[ParamInfo],
    selected: &OverloadMatch,
    args: Vec<Argument>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Vec<Expr>> {
    let fixed = if selected.expanded { params.len().saturating_sub(1) } else { params.len() };
    let mut results = Vec::with_capacity(args.len());
    for (arg, &target) in args.into_iter().zip(&selected.targets) {
        results.push(bind_argument(arg, target, rc));
    }
    let mut values = rc.join_all(results)?;

    let rest = if selected.expanded {
        values.split_off(fixed.min(values.len()))
    } else {
        Vec::new()
    };
    for param in &params[values.len()..fixed] {
        values.push(default_value(param.ty, span));
    }
    if selected.expanded {
        let array_ty = params[fixed].ty;
        let element = array_ty
            .element_type()
            .ok_or_else(|| CompilationError::internal("params parameter is not an array"))?;
        let count = i32::try_from(rest.len()).map_err(|_| CompilationError::internal("too many params arguments"))?;
        values.push(Expr::value(
            ExprKind::ArrayNew {
                element,
                sizes: vec![Expr::from_constant(Constant::int(count), span)],
                elements: Some(rest),
            },
            array_ty,
            span,
        ));
    }
    Ok(values)
}

fn bind_argument(arg: Argument, target: DataType, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    if !arg.modifier.is_by_ref() {
        return implicit_conversion(arg.expr, target, rc);
    }
    if arg.modifier == ParamModifier::Out {
        if let ExprKind::Variable { id, .. } = arg.expr.kind {
            rc.locals.mark_assigned(id);
        }
    }
    let span = arg.expr.span;
    Ok(Expr::value(ExprKind::RefArgument(Box::new(arg.expr)), target, span))
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_invocation(
    callee: Expr,
    args: Vec<Argument>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let callee = callee.resolve(rc);
    let args = resolve_arguments(args, rc);
    let (callee, args) = rc.join(callee, args)?;

    match callee.class {
        ExprClass::MethodGroup => {
            let ExprKind::MethodGroup {
                instance,
                name,
                methods,
                non_virtual,
                implicit,
            } = callee.kind
            else {
                return Err(CompilationError::internal("method group class without a method group"));
            };
            let candidates = method_candidates(&methods, rc);
            if candidates.is_empty() {
                return Err(CompilationError::NotInvocable { member: name, span });
            }
            let selected = select(&candidates, &args, span, rc)?;
            bind_method_call(selected, instance, &name, non_virtual, implicit, args, span, rc)
        }
        ExprClass::Type | ExprClass::Namespace => Err(CompilationError::MethodNameExpected { span }),
        _ => {
            let value = callee.into_value(rc)?;
            let ty = value.data_type();
            let Some(invoke) = rc.types.delegate_invoke(ty) else {
                return Err(CompilationError::NotInvocable {
                    member: value.describe(rc),
                    span,
                });
            };
            let candidates = method_candidates(&[invoke], rc);
            let selected = select(&candidates, &args, span, rc)?;
            let (params, return_type) = signature(selected.method, rc)?;
            let args = bind_arguments(&params, &selected, args, span, rc)?;
            Ok(Expr::value(
                ExprKind::Call {
                    method: selected.method,
                    instance: Some(Box::new(value)),
                    args,
                    virtual_call: true,
                },
                return_type,
                span,
            ))
        }
    }
}

/// Outcome of trying an operator's user-defined candidates.
pub(super) enum UserOperator {
    Applied(Expr),
    /// No candidate accepts the operands, which are handed back.
    NotApplicable(Vec<Expr>),
}

/// Overload resolution over user-defined operator methods.
///
/// Inapplicable candidates are not an error: the caller falls back to the
/// predefined operators. Ambiguity is reported as 34.
pub(super) fn resolve_user_operator(
    methods: &[TypeHash],
    operands: Vec<Expr>,
    symbol: &str,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<UserOperator> {
    let candidates = method_candidates(methods, rc);
    let args: Vec<Argument> = operands.into_iter().map(Argument::value).collect();
    if candidates.is_empty() {
        return Ok(UserOperator::NotApplicable(args.into_iter().map(|a| a.expr).collect()));
    }
    let selected = match select(&candidates, &args, span, rc) {
        Ok(selected) => selected,
        Err(CompilationError::AmbiguousCall { .. }) => {
            let types = rc.types;
            let names: Vec<String> = args
                .iter()
                .map(|a| format!("'{}'", types.type_name(a.expr.data_type())))
                .collect();
            return Err(CompilationError::AmbiguousOperator {
                op: symbol.to_string(),
                operands: names.join(" and "),
                span,
            });
        }
        Err(
            CompilationError::ArgumentCountMismatch { .. }
            | CompilationError::InvalidArguments { .. }
            | CompilationError::ArgumentModifierMismatch { .. },
        ) => return Ok(UserOperator::NotApplicable(args.into_iter().map(|a| a.expr).collect())),
        Err(err) => return Err(err),
    };
    let (params, return_type) = signature(selected.method, rc)?;
    let args = bind_arguments(&params, &selected, args, span, rc)?;
    tracing::trace!(method = %rc.types.method_name(selected.method), "user-defined operator");
    Ok(UserOperator::Applied(Expr::value(
        ExprKind::OperatorCall {
            method: selected.method,
            args,
        },
        return_type,
        span,
    )))
}

fn signature(method: TypeHash, rc: &ResolveContext<'_>) -> Result<(Vec<ParamInfo>, DataType)> {
    rc.types
        .method(method)
        .map(|m| (m.params.clone(), m.return_type))
        .ok_or_else(|| CompilationError::internal(format!("method {method} is not registered")))
}

#[allow(clippy::too_many_arguments)]
fn bind_method_call(
    selected: OverloadMatch,
    instance: Option<Box<Expr>>,
    name: &str,
    non_virtual: bool,
    implicit: bool,
    args: Vec<Argument>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let types = rc.types;
    let info = types
        .method(selected.method)
        .ok_or_else(|| CompilationError::internal(format!("method '{name}' is not registered")))?;
    if info.is_special_name() {
        return Err(CompilationError::SpecialNameCall {
            method: types.method_name(selected.method),
            span,
        });
    }

    let instance = match (info.is_static(), instance) {
        (true, Some(_)) if !implicit => {
            return Err(CompilationError::StaticMemberThroughInstance {
                member: name.to_string(),
                span,
            });
        }
        (true, _) => None,
        (false, Some(instance)) => Some(instance),
        (false, None) => {
            return Err(CompilationError::InstanceMemberWithoutObject {
                member: name.to_string(),
                span,
            });
        }
    };
    let virtual_call = info.is_virtual()
        && !non_virtual
        && instance.as_ref().is_some_and(|i| types.is_reference_type(i.data_type()));
    let return_type = info.return_type;
    let params = info.params.clone();

    let args = bind_arguments(&params, &selected, args, span, rc)?;
    tracing::trace!(method = %types.method_name(selected.method), virtual_call, "bound call");
    Ok(Expr::value(
        ExprKind::Call {
            method: selected.method,
            instance,
            args,
            virtual_call,
        },
        return_type,
        span,
    ))
}

pub(super) fn emit_args(args: &[Expr], ec: &mut EmitContext<'_>) -> Result<u8> {
    for arg in args {
        arg.emit(ec)?;
    }
    u8::try_from(args.len()).map_err(|_| CompilationError::internal("too many arguments for one call"))
}

pub(super) fn emit_call(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    match &expr.kind {
        ExprKind::Call {
            method,
            instance,
            args,
            virtual_call,
        } => {
            let temp = match instance {
                Some(instance) => {
                    let owner = ec.types.method(*method).map(|m| m.owner).unwrap_or(instance.data_type().type_hash);
                    super::lvalue::emit_receiver(instance, owner, ec)?
                }
                None => None,
            };
            let argc = emit_args(args, ec)?;
            let op = if *virtual_call { OpCode::CallVirt } else { OpCode::Call };
            ec.sink.emit_call(op, *method, argc);
            match temp {
                Some(temp) => ec.release_temp(temp),
                None => Ok(()),
            }
        }
        ExprKind::OperatorCall { method, args } => {
            let argc = emit_args(args, ec)?;
            ec.sink.emit_call(OpCode::Call, *method, argc);
            Ok(())
        }
        _ => Err(CompilationError::internal("expected a call")),
    }
}
