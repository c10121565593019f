//! User-defined operator lookup.
//!
//! Operators are static `op_*` methods declared on an operand's type or one
//! of its base classes. Choosing between the candidates is overload
//! resolution's job.

use sable_core::{DataType, TypeHash, TypeSystem, primitives};

use super::BinaryOp;

/// Types whose operators are all predefined: numerics, `bool`, `char`,
/// `string`, `object` and `null`. Arrays and pointers have no user operators
/// either.
pub fn is_predefined_type(ty: DataType) -> bool {
    !ty.is_named() || primitives::keyword(ty.type_hash).is_some()
}

/// `ty` and its base classes, most derived first.
fn base_chain(ty: DataType, types: &dyn TypeSystem) -> Vec<TypeHash> {
    let mut chain = Vec::new();
    if !ty.is_named() {
        return chain;
    }
    let mut current = Some(ty.type_hash);
    while let Some(hash) = current {
        if chain.contains(&hash) {
            break;
        }
        chain.push(hash);
        current = types.type_info(hash).and_then(|t| t.base);
    }
    chain
}

fn collect(name: &str, operands: &[DataType], types: &dyn TypeSystem) -> Vec<TypeHash> {
    let mut found = Vec::new();
    for &operand in operands {
        for owner in base_chain(operand, types) {
            for &method in types.operators(owner, name) {
                if !found.contains(&method) {
                    found.push(method);
                }
            }
        }
    }
    found
}

/// Candidate `op_*` methods for a binary operator.
///
/// Empty when both operands have only predefined operators.
pub fn user_binary_candidates(
    op: BinaryOp,
    left: DataType,
    right: DataType,
    types: &dyn TypeSystem,
) -> Vec<TypeHash> {
    if is_predefined_type(left) && is_predefined_type(right) {
        return Vec::new();
    }
    collect(op.method_name(), &[left, right], types)
}

/// Candidate `op_*` methods named `name` for a unary operator, `++` or `--`.
pub fn user_unary_candidates(name: &str, operand: DataType, types: &dyn TypeSystem) -> Vec<TypeHash> {
    if is_predefined_type(operand) {
        return Vec::new();
    }
    collect(name, &[operand], types)
}

/// The `op_True` or `op_False` operator of `ty`, used to short-circuit a
/// user-defined `&&` or `||`.
pub fn truth_operator(ty: DataType, is_true: bool, types: &dyn TypeSystem) -> Option<TypeHash> {
    let name = if is_true { "op_True" } else { "op_False" };
    base_chain(ty, types).into_iter().find_map(|owner| {
        types.operators(owner, name).iter().copied().find(|&m| {
            types.method(m).is_some_and(|info| {
                info.return_type == DataType::BOOL
                    && info.params.len() == 1
                    && info.params[0].ty.type_hash == owner
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_registry::{TypeRegistry, ty};

    fn vectors() -> (TypeRegistry, DataType, DataType) {
        let mut reg = TypeRegistry::with_builtins();
        let base = TypeHash::from_name("Vec2");
        let vec2 = ty(base);
        reg.define_class("Vec2")
            .operator("op_Addition", &[vec2, vec2], vec2)
            .operator("op_True", &[vec2], DataType::BOOL)
            .build()
            .unwrap();
        let derived = reg.define_class("Vec2Ex").base(base).build().unwrap();
        (reg, vec2, ty(derived))
    }

    #[test]
    fn finds_operators_on_base_classes() {
        let (reg, vec2, derived) = vectors();
        let found = user_binary_candidates(BinaryOp::Addition, derived, vec2, &reg);
        assert_eq!(found.len(), 1);
        assert!(user_binary_candidates(BinaryOp::Subtraction, derived, vec2, &reg).is_empty());
    }

    #[test]
    fn predefined_operands_have_no_user_operators() {
        let (reg, ..) = vectors();
        assert!(is_predefined_type(DataType::STRING));
        assert!(is_predefined_type(DataType::simple(primitives::DECIMAL)));
        assert!(user_binary_candidates(BinaryOp::Addition, DataType::INT32, DataType::STRING, &reg).is_empty());
        assert!(user_unary_candidates("op_UnaryNegation", DataType::INT32, &reg).is_empty());
    }

    #[test]
    fn truth_operators() {
        let (reg, vec2, derived) = vectors();
        assert!(truth_operator(vec2, true, &reg).is_some());
        assert!(truth_operator(derived, true, &reg).is_some());
        assert!(truth_operator(vec2, false, &reg).is_none());
    }
}
