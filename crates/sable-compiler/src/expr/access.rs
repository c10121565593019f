//! Element access `a[i, ...]`: arrays, pointers and indexers.

use sable_core::{CompilationError, DataType, ExprClass, Span, Warning};

use super::invocation::{bind_arguments, select};
use super::{Argument, Expr, ExprKind, implicit_conversion, pointer};
use crate::context::ResolveContext;
use crate::conversion::array_index_type;
use crate::overload::Candidate;

type Result<T> = std::result::Result<T, CompilationError>;

/// Convert an index by the array-index rules: the first of `int`, `uint`,
/// `long` and `ulong` it converts to.
pub(super) fn convert_index(index: Expr, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let target = array_index_type(index.data_type(), index.constant(), rc.types).unwrap_or(DataType::INT32);
    implicit_conversion(index, target, rc)
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_element_access(
    target: Expr,
    indices: Vec<Expr>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let target = target.resolve_value(rc);
    let indices: Vec<Result<Expr>> = indices.into_iter().map(|i| i.resolve_value(rc)).collect();
    let indices = rc.join_all(indices);
    let (target, indices) = rc.join(target, indices)?;
    let ty = target.data_type();

    if ty.is_array() {
        return array_access(target, indices, span, rc);
    }
    if ty.is_pointer() {
        return pointer_access(target, indices, span, rc);
    }
    indexer_access(target, indices, span, rc)
}

fn array_access(array: Expr, indices: Vec<Expr>, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let ty = array.data_type();
    let rank = usize::from(ty.array_rank);
    if indices.len() != rank {
        return Err(CompilationError::WrongIndexCount { expected: rank, span });
    }
    let element = ty
        .element_type()
        .ok_or_else(|| CompilationError::internal("array without element type"))?;

    let converted: Vec<Result<Expr>> = indices
        .into_iter()
        .map(|index| {
            if index.constant().and_then(|c| c.value.as_integer()).is_some_and(|v| v < 0) {
                rc.warn(Warning::NegativeArrayIndex { span: index.span });
            }
            convert_index(index, rc)
        })
        .collect();
    let indices = rc.join_all(converted)?;

    Ok(Expr::resolved(
        ExprKind::ArrayAccess {
            array: Box::new(array),
            indices,
        },
        element,
        ExprClass::Variable,
        span,
    ))
}

/// `p[i]` is `*(p + i)`.
fn pointer_access(base: Expr, mut indices: Vec<Expr>, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    if !rc.is_unsafe() {
        return Err(CompilationError::UnsafeContextRequired { span });
    }
    if indices.len() != 1 {
        return Err(CompilationError::PointerMultipleIndices { span });
    }
    let ty = base.data_type();
    if ty.is_void_pointer() {
        return Err(CompilationError::VoidPointerOperation { span });
    }
    let pointee = ty
        .element_type()
        .ok_or_else(|| CompilationError::internal("pointer without a pointee"))?;
    let size = rc
        .types
        .size_of(pointee)
        .ok_or_else(|| CompilationError::internal(format!("size of '{}' is unknown", rc.types.type_name(pointee))))?;
    let index = indices
        .pop()
        .ok_or_else(|| CompilationError::internal("pointer access without an index"))?;
    let offset = convert_index(index, rc)?;
    let address = pointer::pointer_offset(base, offset, ty, size, false, true, span);
    Ok(pointer::deref(address, pointee, span))
}

fn indexer_access(instance: Expr, indices: Vec<Expr>, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let types = rc.types;
    let ty = instance.data_type();
    let indexers = types.indexers(ty.type_hash);
    if indexers.is_empty() {
        return Err(CompilationError::CannotIndex {
            ty: types.type_name(ty),
            span,
        });
    }

    let candidates: Vec<Candidate<'_>> = indexers
        .iter()
        .map(|ix| Candidate {
            hash: ix.hash,
            params: &ix.params,
            name: "this[]",
        })
        .collect();
    let args: Vec<Argument> = indices.into_iter().map(Argument::value).collect();
    let selected = select(&candidates, &args, span, rc)?;
    let indexer = indexers
        .iter()
        .find(|ix| ix.hash == selected.method)
        .ok_or_else(|| CompilationError::internal("selected indexer vanished"))?;
    let args = bind_arguments(&indexer.params, &selected, args, span, rc)?;

    // `base[...]` binds the base type's accessors directly.
    let through_base = matches!(instance.kind, ExprKind::Base);
    let virtual_call = indexer
        .getter
        .or(indexer.setter)
        .and_then(|m| types.method(m))
        .is_some_and(|m| m.is_virtual())
        && types.is_reference_type(ty)
        && !through_base;
    tracing::trace!(ty = %types.type_name(ty), virtual_call, through_base, "indexer access");

    Ok(Expr::resolved(
        ExprKind::IndexerAccess {
            instance: Box::new(instance),
            args,
            getter: indexer.getter,
            setter: indexer.setter,
            virtual_call,
        },
        indexer.ty,
        ExprClass::IndexerAccess,
        span,
    ))
}
