//! Literals and default values.

use ordered_float::OrderedFloat;
use sable_core::{CompilationError, DataType, Span, TypeSystem, primitives};

use super::{Expr, ExprKind};
use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant, Decimal};
use crate::emit::EmitContext;

pub(super) fn resolve_literal(value: ConstValue, span: Span) -> Expr {
    Expr::from_constant(Constant::literal(value), span)
}

/// `default(T)` as a node.
pub fn default_value(ty: DataType, span: Span) -> Expr {
    Expr::value(ExprKind::DefaultValue, ty, span)
}

/// The default value of `ty` as a constant, when it has one.
///
/// Structs other than the builtin numerics have none, nor do type
/// parameters; they are zeroed with `initobj`.
pub(crate) fn default_constant(ty: DataType, types: &dyn TypeSystem) -> Option<Constant> {
    if ty.is_pointer() || types.is_reference_type(ty) {
        return Some(Constant::with_type(ConstValue::Null, ty));
    }
    let storage = types.enum_underlying(ty).unwrap_or(ty);
    if !storage.is_named() {
        return None;
    }
    let value = match storage.type_hash {
        primitives::BOOL => ConstValue::Bool(false),
        primitives::FLOAT => ConstValue::Float(OrderedFloat(0.0)),
        primitives::DOUBLE => ConstValue::Double(OrderedFloat(0.0)),
        primitives::DECIMAL => ConstValue::Decimal(Decimal::ZERO),
        hash => ConstValue::integral(hash, 0)?,
    };
    Some(Constant::with_type(value, ty))
}

pub(super) fn emit_default(ty: DataType, ec: &mut EmitContext<'_>) -> Result<(), CompilationError> {
    if let Some(constant) = default_constant(ty, ec.types) {
        ec.sink.emit_constant(&constant.value);
        return Ok(());
    }
    ec.with_temp(ty, |ec, temp| {
        ec.load_temp_address(temp);
        ec.sink.emit_type(OpCode::InitObj, ty);
        ec.load_temp(temp);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use sable_registry::{TypeRegistry, ty};

    #[test]
    fn literals_resolve_to_literal_constants() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        let expr = resolve(&reg, &mut locals, Expr::string("hi", span())).unwrap();
        let constant = expr.constant().unwrap();
        assert!(constant.is_literal);
        assert_eq!(expr.ty, Some(DataType::STRING));
    }

    #[test]
    fn default_constants_follow_the_storage_type() {
        let mut reg = TypeRegistry::with_builtins();
        let color = reg.define_enum("Color", primitives::UINT8).member("Red", 0).build().unwrap();
        let zero = default_constant(ty(color), &reg).unwrap();
        assert_eq!(zero.value, ConstValue::Byte(0));
        assert_eq!(zero.ty, ty(color));
        assert!(default_constant(DataType::STRING, &reg).unwrap().is_null());
        assert_eq!(default_constant(DataType::INT64, &reg).unwrap().value, ConstValue::Long(0));
    }

    #[test]
    fn struct_defaults_are_zeroed_in_a_temporary() {
        let mut reg = TypeRegistry::with_builtins();
        let point = reg
            .define_struct("Point")
            .field("X", DataType::INT32)
            .build()
            .unwrap();
        let locals = LocalTable::new();
        let chunk = emit_value(&reg, &locals, &default_value(ty(point), span()));
        chunk.assert_opcodes(&[OpCode::LdLocA, OpCode::InitObj, OpCode::LdLoc]);
    }
}
