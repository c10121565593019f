//! String concatenation.
//!
//! A chain `a + b + c` with string operands becomes one `string.Concat`
//! call. Adjacent constant parts merge, non-string parts are passed as
//! `object`, and chains longer than the fixed-arity overloads are packed
//! into an array.

use sable_core::{CompilationError, DataType, Span, primitives};

use super::{Expr, ExprKind, implicit_conversion};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant};
use crate::context::ResolveContext;
use crate::emit::EmitContext;

type Result<T> = std::result::Result<T, CompilationError>;

/// Longest `Concat(string, ...)` overload.
const MAX_STRING_ARITY: usize = 4;
/// Longest `Concat(object, ...)` overload.
const MAX_OBJECT_ARITY: usize = 3;

pub(super) fn resolve_concat(left: Expr, right: Expr, span: Span, rc: &mut ResolveContext<'_>) -> Result<Expr> {
    let mut parts = Vec::new();
    flatten(left, &mut parts);
    flatten(right, &mut parts);

    let mut merged: Vec<Expr> = Vec::with_capacity(parts.len());
    for part in parts {
        if let (Some(last), Some(text)) = (merged.last_mut(), string_constant(&part)) {
            if let Some(previous) = string_constant(last) {
                let joined = format!("{previous}{text}");
                *last = Expr::from_constant(Constant::with_type(ConstValue::String(joined), DataType::STRING), last.span);
                continue;
            }
        }
        merged.push(part);
    }

    // `null` parts contribute nothing once something else remains.
    if merged.len() > 1 {
        merged.retain(|p| !p.is_null_literal());
    }
    if merged.len() == 1 && merged[0].data_type().is(primitives::STRING) {
        let mut only = merged.remove(0);
        only.span = span;
        return Ok(only);
    }

    let objects = merged.iter().any(|p| !p.data_type().is(primitives::STRING));
    let converted: Vec<Result<Expr>> = merged
        .into_iter()
        .map(|part| {
            if part.data_type().is(primitives::STRING) {
                Ok(part)
            } else {
                implicit_conversion(part, DataType::OBJECT, rc)
            }
        })
        .collect();
    let parts = rc.join_all(converted)?;

    let limit = if objects { MAX_OBJECT_ARITY } else { MAX_STRING_ARITY };
    let known = &rc.well_known;
    let (method, array) = if parts.len() <= limit {
        (known.concat(parts.len(), objects), None)
    } else if objects {
        (known.concat_object_array, Some(DataType::OBJECT))
    } else {
        (known.concat_string_array, Some(DataType::STRING))
    };
    let method = method.ok_or_else(|| CompilationError::internal("string.Concat overload not registered"))?;
    tracing::trace!(parts = parts.len(), packed = array.is_some(), "string concatenation");

    Ok(Expr::value(
        ExprKind::StringConcat { parts, method, array },
        DataType::STRING,
        span,
    ))
}

/// Append the parts of `expr`, splicing in an earlier concatenation.
fn flatten(expr: Expr, parts: &mut Vec<Expr>) {
    match expr.kind {
        ExprKind::StringConcat { parts: inner, .. } => parts.extend(inner),
        kind => parts.push(Expr { kind, ..expr }),
    }
}

fn string_constant(expr: &Expr) -> Option<&str> {
    match expr.constant().map(|c| &c.value) {
        Some(ConstValue::String(s)) => Some(s),
        _ => None,
    }
}

pub(super) fn emit_concat(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ExprKind::StringConcat { parts, method, array } = &expr.kind else {
        return Err(CompilationError::internal("expected a concatenation"));
    };
    match array {
        None => {
            for part in parts {
                part.emit(ec)?;
            }
            let argc = u8::try_from(parts.len()).map_err(|_| CompilationError::internal("too many concat parts"))?;
            ec.sink.emit_call(OpCode::Call, *method, argc);
        }
        Some(element) => {
            let count = i32::try_from(parts.len()).map_err(|_| CompilationError::internal("too many concat parts"))?;
            ec.sink.emit_constant(&ConstValue::Int(count));
            ec.sink.emit_type(OpCode::NewArr, *element);
            for (index, part) in (0..count).zip(parts) {
                ec.sink.emit(OpCode::Dup);
                ec.sink.emit_constant(&ConstValue::Int(index));
                part.emit(ec)?;
                ec.sink.emit_type(OpCode::StElemRef, *element);
            }
            ec.sink.emit_call(OpCode::Call, *method, 1);
        }
    }
    Ok(())
}
