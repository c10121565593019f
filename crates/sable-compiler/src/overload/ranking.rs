//! Ranking of applicable candidates.
//!
//! A candidate is better than another when none of its argument conversions
//! is worse and at least one is better. Ties fall back to the normal form
//! over the expanded form, then to fewer defaulted parameters.

use sable_core::{CompilationError, Span, TypeSystem};

use super::{ArgumentInfo, Candidate, OverloadMatch};
use crate::conversion::{Better, better_conversion};

/// Find the best match from viable candidates.
///
/// Returns `AmbiguousCall` when no candidate beats every other one.
pub fn find_best_match(
    viable: &[OverloadMatch],
    candidates: &[Candidate<'_>],
    args: &[ArgumentInfo<'_>],
    types: &dyn TypeSystem,
    span: Span,
) -> Result<OverloadMatch, CompilationError> {
    if let [only] = viable {
        return Ok(only.clone());
    }

    for candidate in viable {
        if viable
            .iter()
            .all(|other| std::ptr::eq(candidate, other) || compare(candidate, other, args, types) == Better::First)
        {
            return Ok(candidate.clone());
        }
    }

    // Report the two cheapest candidates.
    let mut sorted: Vec<&OverloadMatch> = viable.iter().collect();
    sorted.sort_by_key(|m| m.total_cost());
    let name = |m: &OverloadMatch| {
        candidates
            .get(m.index)
            .map(|c| types.method_name(c.hash))
            .unwrap_or_else(|| m.method.to_string())
    };
    Err(CompilationError::AmbiguousCall {
        first: name(sorted[0]),
        second: name(sorted[1]),
        span,
    })
}

/// Compare two candidates argument by argument.
fn compare(
    a: &OverloadMatch,
    b: &OverloadMatch,
    args: &[ArgumentInfo<'_>],
    types: &dyn TypeSystem,
) -> Better {
    let mut a_better = false;
    let mut b_better = false;
    for (i, arg) in args.iter().enumerate() {
        let first = (&a.conversions[i], a.targets[i]);
        let second = (&b.conversions[i], b.targets[i]);
        match better_conversion(arg.ty, first, second, types) {
            Better::First => a_better = true,
            Better::Second => b_better = true,
            Better::Neither => {}
        }
    }
    match (a_better, b_better) {
        (true, false) => Better::First,
        (false, true) => Better::Second,
        (true, true) => Better::Neither,
        (false, false) => break_tie(a, b),
    }
}

/// Try to break a tie between two candidates with equivalent conversions.
fn break_tie(a: &OverloadMatch, b: &OverloadMatch) -> Better {
    match (a.expanded, b.expanded) {
        (false, true) => return Better::First,
        (true, false) => return Better::Second,
        _ => {}
    }
    match a.defaulted.cmp(&b.defaulted) {
        std::cmp::Ordering::Less => Better::First,
        std::cmp::Ordering::Greater => Better::Second,
        std::cmp::Ordering::Equal => Better::Neither,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{Conversion, find_implicit_conversion};
    use sable_core::{DataType, TypeHash, primitives};
    use sable_registry::{TypeRegistry, ty};

    fn make_match(id: usize, source: DataType, target: DataType, reg: &TypeRegistry) -> OverloadMatch {
        let conversion = find_implicit_conversion(source, target, reg).unwrap();
        OverloadMatch {
            method: TypeHash::from_name(&format!("func_{id}")),
            index: id,
            expanded: false,
            conversions: vec![conversion],
            targets: vec![target],
            defaulted: 0,
        }
    }

    #[test]
    fn single_viable_returns_it() {
        let reg = TypeRegistry::with_builtins();
        let m = make_match(0, DataType::INT32, DataType::INT32, &reg);
        let args = [ArgumentInfo::value(DataType::INT32)];
        let found = find_best_match(&[m.clone()], &[], &args, &reg, Span::SYNTHETIC).unwrap();
        assert_eq!(found.method, m.method);
    }

    #[test]
    fn better_target_wins() {
        let reg = TypeRegistry::with_builtins();
        let source = ty(primitives::UINT8);
        let long = make_match(0, source, DataType::INT64, &reg);
        let int = make_match(1, source, DataType::INT32, &reg);
        let args = [ArgumentInfo::value(source)];
        let found = find_best_match(&[long, int.clone()], &[], &args, &reg, Span::SYNTHETIC).unwrap();
        assert_eq!(found.method, int.method);
    }

    #[test]
    fn incomparable_targets_are_ambiguous() {
        let reg = TypeRegistry::with_builtins();
        let source = DataType::NULL;
        let a = make_match(0, source, DataType::STRING, &reg);
        let b = make_match(1, source, DataType::array_of(DataType::INT32, 1), &reg);
        let args = [ArgumentInfo::value(source)];
        let err = find_best_match(&[a, b], &[], &args, &reg, Span::SYNTHETIC).unwrap_err();
        assert_eq!(err.code(), 121);
    }

    #[test]
    fn normal_form_beats_expanded() {
        let reg = TypeRegistry::with_builtins();
        let normal = make_match(0, DataType::INT32, DataType::INT32, &reg);
        let mut expanded = make_match(1, DataType::INT32, DataType::INT32, &reg);
        expanded.expanded = true;
        assert_eq!(break_tie(&normal, &expanded), Better::First);
        assert_eq!(Conversion::COST_EXACT, normal.total_cost());
    }
}
