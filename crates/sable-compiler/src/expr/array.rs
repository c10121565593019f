//! Array creation: `new T[n]`, `new T[,] { ... }`, `new[] { ... }` and
//! bare initializers in variable declarations.

use sable_core::{CompilationError, DataType, Span, TypeHash, TypeSystem, primitives};

use super::access::convert_index;
use super::{ArrayInit, Expr, ExprKind, implicit_conversion, lvalue};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant};
use crate::context::ResolveContext;
use crate::conversion::find_implicit_conversion_from;
use crate::emit::EmitContext;

type Result<T> = std::result::Result<T, CompilationError>;

/// Constant elements needed before the data is emitted as one blob.
const BLOB_THRESHOLD: usize = 3;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn resolve_array_creation(
    element: Option<DataType>,
    rank: u8,
    sizes: Vec<Expr>,
    initializer: Option<Vec<ArrayInit>>,
    span: Span,
    rc: &mut ResolveContext<'_>,
) -> Result<Expr> {
    let sizes: Vec<Result<Expr>> = sizes.into_iter().map(|size| resolve_size(size, rc)).collect();
    let sizes = rc.join_all(sizes)?;

    let Some(items) = initializer else {
        let element = element.ok_or_else(|| CompilationError::internal("implicit array without an initializer"))?;
        let rank = u8::try_from(sizes.len()).map_err(|_| CompilationError::internal("array rank overflow"))?;
        return Ok(array_new(element, rank, sizes, None, span));
    };

    let mut dims = vec![None; usize::from(rank.max(1))];
    let mut values = Vec::new();
    flatten(items, 0, &mut dims, &mut values, span)?;
    let dims: Vec<usize> = dims.into_iter().map(|d| d.unwrap_or(0)).collect();

    let sizes = if sizes.is_empty() {
        dims.iter()
            .map(|&d| {
                let d = i32::try_from(d).map_err(|_| CompilationError::internal("array initializer too long"))?;
                Ok(Expr::from_constant(Constant::int(d), span))
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        check_sizes(&sizes, &dims)?;
        sizes
    };

    let values: Vec<Result<Expr>> = values.into_iter().map(|v| v.resolve_value(rc)).collect();
    let values = rc.join_all(values)?;
    let element = match element {
        Some(element) => element,
        None => best_element_type(&values, rc.types).ok_or(CompilationError::NoBestArrayType { span })?,
    };
    let values: Vec<Result<Expr>> = values
        .into_iter()
        .map(|v| implicit_conversion(v, element, rc))
        .collect();
    let values = rc.join_all(values)?;
    tracing::trace!(element = %rc.types.type_name(element), rank, count = values.len(), "array initializer");

    Ok(array_new(element, rank, sizes, Some(values), span))
}

fn array_new(element: DataType, rank: u8, sizes: Vec<Expr>, elements: Option<Vec<Expr>>, span: Span) -> Expr {
    Expr::value(
        ExprKind::ArrayNew {
            element,
            sizes,
            elements,
        },
        DataType::array_of(element, rank.max(1)),
        span,
    )
}

fn resolve_size(size: Expr, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let size = size.resolve_value(rc)?;
    if size.constant().and_then(|c| c.value.as_integer()).is_some_and(|v| v < 0) {
        return Err(CompilationError::NegativeArraySize { span: size.span });
    }
    convert_index(size, rc)
}

/// Walk a nested initializer, fixing the length of each dimension from its
/// first list and collecting the values in row-major order.
fn flatten(
    items: Vec<ArrayInit>,
    depth: usize,
    dims: &mut [Option<usize>],
    out: &mut Vec<Expr>,
    span: Span,
) -> Result<()> {
    let innermost = depth + 1 == dims.len();
    match dims[depth] {
        Some(expected) if expected != items.len() => {
            return Err(CompilationError::ArrayInitializerLength { expected, span });
        }
        Some(_) => {}
        None => dims[depth] = Some(items.len()),
    }
    for item in items {
        match (item, innermost) {
            (ArrayInit::Value(value), true) => out.push(value),
            (ArrayInit::List(nested, nested_span), false) => flatten(nested, depth + 1, dims, out, nested_span)?,
            (ArrayInit::Value(value), false) => {
                return Err(CompilationError::ArrayInitializerContext { span: value.span });
            }
            (ArrayInit::List(_, nested_span), true) => {
                return Err(CompilationError::ArrayInitializerContext { span: nested_span });
            }
        }
    }
    Ok(())
}

/// Explicit sizes next to an initializer must be constants matching it.
fn check_sizes(sizes: &[Expr], dims: &[usize]) -> Result<()> {
    for (size, &length) in sizes.iter().zip(dims) {
        let Some(value) = size.constant().and_then(|c| c.value.as_integer()) else {
            return Err(CompilationError::ConstantExpected { span: size.span });
        };
        if usize::try_from(value).ok() != Some(length) {
            return Err(CompilationError::ArrayInitializerLength {
                expected: usize::try_from(value).unwrap_or(0),
                span: size.span,
            });
        }
    }
    Ok(())
}

/// The one element type among the values that every value converts to.
fn best_element_type(values: &[Expr], types: &dyn TypeSystem) -> Option<DataType> {
    let mut candidates: Vec<DataType> = Vec::new();
    for value in values.iter().filter(|v| !v.is_null_literal()) {
        let ty = value.data_type();
        if !candidates.contains(&ty) {
            candidates.push(ty);
        }
    }
    let mut fitting = candidates.into_iter().filter(|&candidate| {
        candidate != DataType::VOID
            && values
                .iter()
                .all(|v| find_implicit_conversion_from(v.data_type(), v.constant(), candidate, types).is_some())
    });
    let best = fitting.next()?;
    match fitting.next() {
        Some(_) => None,
        None => Some(best),
    }
}

// ==========================================================================
// Emission
// ==========================================================================

pub(super) fn emit_array_new(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ExprKind::ArrayNew {
        element,
        sizes,
        elements,
    } = &expr.kind
    else {
        return Err(CompilationError::internal("expected an array creation"));
    };
    let array_ty = expr.data_type();
    let rank = sizes.len();
    for size in sizes {
        size.emit(ec)?;
    }
    if rank == 1 {
        ec.sink.emit_type(OpCode::NewArr, *element);
    } else {
        let params = vec![primitives::INT32; rank];
        let ctor = TypeHash::from_constructor(array_ty.signature_hash(), &params);
        let argc = u8::try_from(rank).map_err(|_| CompilationError::internal("array rank overflow"))?;
        ec.sink.emit_call(OpCode::NewObj, ctor, argc);
    }

    let Some(elements) = elements else {
        return Ok(());
    };
    let blob = if rank == 1 { blob_data(elements, *element, ec.types) } else { None };
    let from_blob = blob.is_some();
    if let Some(data) = blob {
        ec.sink.emit(OpCode::Dup);
        ec.sink.emit_blob(data);
    }

    let dims = constant_dims(sizes)?;
    let setter = if rank > 1 { Some(lvalue::array_accessor(array_ty, "Set")?) } else { None };
    let by_ref = ec.types.is_reference_type(*element);

    for (position, value) in elements.iter().enumerate() {
        let constant = value.constant();
        if constant.is_some_and(|c| c.value.is_default()) || (from_blob && constant.is_some()) {
            continue;
        }
        ec.sink.emit(OpCode::Dup);
        for index in row_major_indices(position, &dims) {
            ec.sink.emit_constant(&ConstValue::Int(index));
        }
        value.emit(ec)?;
        match setter {
            Some(set) => {
                let argc = u8::try_from(rank + 1).map_err(|_| CompilationError::internal("array rank overflow"))?;
                ec.sink.emit_call(OpCode::Call, set, argc);
            }
            None => {
                let op = if by_ref { OpCode::StElemRef } else { OpCode::StElem };
                ec.sink.emit_type(op, *element);
            }
        }
    }
    Ok(())
}

/// Element data for a one-dimensional array of primitives with enough
/// constant elements; non-constant positions are left zero.
fn blob_data(elements: &[Expr], element: DataType, types: &dyn TypeSystem) -> Option<Vec<u8>> {
    if types.is_reference_type(element) {
        return None;
    }
    let constants = elements.iter().filter(|e| e.constant().is_some()).count();
    if constants < BLOB_THRESHOLD {
        return None;
    }
    let size = usize::try_from(types.size_of(element)?).ok()?;
    let mut data = Vec::with_capacity(size * elements.len());
    for value in elements {
        match value.constant() {
            Some(constant) => {
                let bytes = constant.value.to_le_bytes()?;
                if bytes.len() != size {
                    return None;
                }
                data.extend_from_slice(&bytes);
            }
            None => data.resize(data.len() + size, 0),
        }
    }
    Some(data)
}

fn constant_dims(sizes: &[Expr]) -> Result<Vec<usize>> {
    sizes
        .iter()
        .map(|size| {
            size.constant()
                .and_then(|c| c.value.as_integer())
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| CompilationError::internal("initialized array with a non-constant size"))
        })
        .collect()
}

fn row_major_indices(mut position: usize, dims: &[usize]) -> Vec<i32> {
    let mut indices = vec![0; dims.len()];
    for (slot, &dim) in indices.iter_mut().zip(dims).rev() {
        if dim == 0 {
            continue;
        }
        *slot = (position % dim) as i32;
        position /= dim;
    }
    indices
}
