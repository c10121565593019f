//! User-defined conversions.
//!
//! `op_Implicit` and `op_Explicit` operators declared on either the source
//! or the target type. The operator's parameter and return type need not
//! match exactly; a standard implicit conversion may bridge each side.

use sable_core::{DataType, TypeHash, TypeSystem, primitives};

use super::{Conversion, ConversionKind, find_standard_conversion};

/// Find a user-defined conversion from `source` to `target`.
///
/// With `allow_explicit`, `op_Explicit` operators are considered too and the
/// bridging conversions may themselves be explicit.
pub fn find_user_conversion(
    source: DataType,
    target: DataType,
    allow_explicit: bool,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    // Conversions between builtin numerics are never user-defined.
    if source.is_numeric() && target.is_numeric() {
        return None;
    }

    let mut best: Option<(Conversion, bool)> = None;
    for owner in owners(source, target) {
        for name in operator_names(allow_explicit) {
            for &method in types.operators(owner, name) {
                let Some(info) = types.method(method) else {
                    continue;
                };
                let Some(param) = info.params.first().map(|p| p.ty) else {
                    continue;
                };
                let ret = info.return_type;
                let is_implicit = *name == "op_Implicit";

                let Some(into) = bridge(source, param, allow_explicit, types) else {
                    continue;
                };
                let Some(out) = bridge(ret, target, allow_explicit, types) else {
                    continue;
                };
                let implicit = is_implicit && into.is_implicit && out.is_implicit;
                let conversion = Conversion {
                    kind: ConversionKind::UserDefined { method, param, ret },
                    cost: if implicit {
                        Conversion::COST_USER_DEFINED
                    } else {
                        Conversion::COST_EXPLICIT_ONLY
                    },
                    is_implicit: implicit,
                };
                if !allow_explicit && !implicit {
                    continue;
                }
                let exact = into.is_exact() && out.is_exact();
                match &best {
                    Some((_, true)) => {}
                    Some(_) if !exact => {}
                    _ => best = Some((conversion, exact)),
                }
            }
        }
    }
    best.map(|(conversion, _)| conversion)
}

fn owners(source: DataType, target: DataType) -> Vec<TypeHash> {
    let mut owners = Vec::with_capacity(2);
    for ty in [source, target] {
        if ty.is_named() && ty.type_hash != primitives::NULL && !owners.contains(&ty.type_hash) {
            owners.push(ty.type_hash);
        }
    }
    owners
}

fn operator_names(allow_explicit: bool) -> &'static [&'static str] {
    if allow_explicit {
        &["op_Implicit", "op_Explicit"]
    } else {
        &["op_Implicit"]
    }
}

fn bridge(
    from: DataType,
    to: DataType,
    allow_explicit: bool,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    find_standard_conversion(from, to, types).filter(|c| c.is_implicit || allow_explicit)
}
