//! Overload resolution for method, constructor, operator and indexer calls.
//!
//! Expression resolution talks to an [`OverloadResolver`]; the crate ships
//! [`BestMatchResolver`], which implements the usual algorithm:
//!
//! ## Algorithm
//!
//! 1. Filter candidates by argument count (defaults and `params` arrays
//!    considered)
//! 2. Check each argument against its parameter: passing mode, then an
//!    implicit conversion (constant-aware) for value arguments or an exact
//!    type for `ref`/`out`
//! 3. A `params` method that fails in its normal form is retried in expanded
//!    form, matching trailing arguments against the element type
//! 4. Rank applicable candidates pairwise by better conversion
//!    ([`ranking`]); a unique best candidate wins, otherwise the call is
//!    ambiguous

mod ranking;

pub use ranking::find_best_match;

use sable_core::{CompilationError, DataType, ParamInfo, ParamModifier, Span, TypeHash, TypeSystem};

use crate::constant::Constant;
use crate::conversion::{Conversion, find_implicit_conversion_from};

type Result<T> = std::result::Result<T, CompilationError>;

/// A method-like member offered to overload resolution.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Method, constructor or indexer accessor identity.
    pub hash: TypeHash,
    pub params: &'a [ParamInfo],
    /// Name for diagnostics.
    pub name: &'a str,
}

impl<'a> Candidate<'a> {
    /// A candidate for a registered method.
    pub fn method(types: &'a dyn TypeSystem, hash: TypeHash) -> Option<Self> {
        let info = types.method(hash)?;
        Some(Self {
            hash,
            params: &info.params,
            name: &info.name,
        })
    }

    fn params_array(&self) -> Option<&ParamInfo> {
        self.params
            .last()
            .filter(|p| p.modifier == ParamModifier::Params)
    }

    fn required(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.has_default && p.modifier != ParamModifier::Params)
            .count()
    }

    /// Whether `count` arguments can bind in either form.
    fn accepts_count(&self, count: usize) -> bool {
        count >= self.required() && (count <= self.params.len() || self.params_array().is_some())
    }
}

/// What overload resolution knows about an argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentInfo<'a> {
    pub ty: DataType,
    pub modifier: ParamModifier,
    /// Value of a constant argument, for constant conversions.
    pub constant: Option<&'a Constant>,
}

impl<'a> ArgumentInfo<'a> {
    pub fn value(ty: DataType) -> Self {
        Self {
            ty,
            modifier: ParamModifier::None,
            constant: None,
        }
    }
}

/// The selected candidate and how each argument binds to it.
#[derive(Debug, Clone)]
pub struct OverloadMatch {
    pub method: TypeHash,
    /// Position of the winner in the candidate list.
    pub index: usize,
    /// Matched in expanded form: trailing arguments fill a `params` array.
    pub expanded: bool,
    /// Conversion of each argument to its parameter (or element) type.
    pub conversions: Vec<Conversion>,
    /// The type each argument converts to.
    pub targets: Vec<DataType>,
    /// Parameters left to their default value.
    pub defaulted: usize,
}

impl OverloadMatch {
    /// Sum of argument conversion costs.
    pub fn total_cost(&self) -> u32 {
        self.conversions.iter().map(|c| c.cost).sum()
    }
}

/// Selects the best candidate for an argument list.
pub trait OverloadResolver {
    fn select(
        &self,
        types: &dyn TypeSystem,
        candidates: &[Candidate<'_>],
        args: &[ArgumentInfo<'_>],
        span: Span,
    ) -> Result<OverloadMatch>;
}

/// The default resolver: applicability, expanded form, pairwise betterness.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestMatchResolver;

impl OverloadResolver for BestMatchResolver {
    fn select(
        &self,
        types: &dyn TypeSystem,
        candidates: &[Candidate<'_>],
        args: &[ArgumentInfo<'_>],
        span: Span,
    ) -> Result<OverloadMatch> {
        #[cfg(feature = "profiling")]
        profiling::scope!("overload::select");

        let Some(first) = candidates.first() else {
            return Err(CompilationError::internal("no candidates for overload resolution"));
        };

        let viable: Vec<OverloadMatch> = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                try_match(candidate, index, args, false, types)
                    .or_else(|| try_match(candidate, index, args, true, types))
            })
            .collect();

        if viable.is_empty() {
            return Err(no_match_error(candidates, first, args, types, span));
        }

        let best = find_best_match(&viable, candidates, args, types, span)?;
        tracing::debug!(
            method = %types.method_name(best.method),
            expanded = best.expanded,
            candidates = candidates.len(),
            "selected overload"
        );
        Ok(best)
    }
}

/// Try to match arguments against a candidate in normal or expanded form.
fn try_match(
    candidate: &Candidate<'_>,
    index: usize,
    args: &[ArgumentInfo<'_>],
    expanded: bool,
    types: &dyn TypeSystem,
) -> Option<OverloadMatch> {
    let params = candidate.params;
    let element = if expanded {
        let array = candidate.params_array()?;
        Some(array.ty.element_type()?)
    } else {
        None
    };
    let fixed = if expanded { params.len() - 1 } else { params.len() };

    if args.len() < candidate.required() || (!expanded && args.len() > params.len()) {
        return None;
    }
    if expanded && args.len() < fixed {
        return None;
    }
    let defaulted = fixed.saturating_sub(args.len());
    if params[args.len().min(fixed)..fixed].iter().any(|p| !p.has_default) {
        return None;
    }

    let mut conversions = Vec::with_capacity(args.len());
    let mut targets = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let (target, modifier) = match (i < fixed, element) {
            (true, _) => (params[i].ty, params[i].modifier),
            (false, Some(element)) => (element, ParamModifier::None),
            (false, None) => return None,
        };
        conversions.push(match_argument(arg, target, modifier, types)?);
        targets.push(target);
    }

    Some(OverloadMatch {
        method: candidate.hash,
        index,
        expanded,
        conversions,
        targets,
        defaulted,
    })
}

fn match_argument(
    arg: &ArgumentInfo<'_>,
    target: DataType,
    modifier: ParamModifier,
    types: &dyn TypeSystem,
) -> Option<Conversion> {
    let by_ref = modifier.is_by_ref();
    let expected = if modifier == ParamModifier::Params {
        ParamModifier::None
    } else {
        modifier
    };
    if arg.modifier != expected {
        return None;
    }
    if by_ref {
        return (arg.ty == target).then(Conversion::identity);
    }
    find_implicit_conversion_from(arg.ty, arg.constant, target, types)
}

fn no_match_error(
    candidates: &[Candidate<'_>],
    first: &Candidate<'_>,
    args: &[ArgumentInfo<'_>],
    types: &dyn TypeSystem,
    span: Span,
) -> CompilationError {
    let counted: Vec<&Candidate<'_>> = candidates
        .iter()
        .filter(|c| c.accepts_count(args.len()))
        .collect();

    let Some(&closest) = counted.first() else {
        return CompilationError::ArgumentCountMismatch {
            method: first.name.to_string(),
            count: args.len(),
            span,
        };
    };

    // A lone candidate with the right arity gets the precise diagnostic.
    if counted.len() == 1 {
        for (i, (arg, param)) in args.iter().zip(closest.params).enumerate() {
            if param.modifier.is_by_ref() && arg.modifier != param.modifier {
                return CompilationError::ArgumentModifierMismatch {
                    index: i + 1,
                    expected: param.modifier.keyword(),
                    span,
                };
            }
        }
    }

    CompilationError::InvalidArguments {
        method: types.method_name(closest.hash),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::primitives;
    use sable_registry::{TypeRegistry, params_of, ty};

    fn registry() -> (TypeRegistry, Vec<TypeHash>) {
        let mut reg = TypeRegistry::with_builtins();
        let owner = reg
            .define_class("Printer")
            .static_method("Print", &params_of(&[DataType::INT32]), DataType::VOID)
            .static_method("Print", &params_of(&[ty(primitives::DOUBLE)]), DataType::VOID)
            .static_method(
                "Print",
                &[
                    ParamInfo::new("format", DataType::STRING),
                    ParamInfo::new("args", DataType::array_of(DataType::OBJECT, 1))
                        .with_modifier(ParamModifier::Params),
                ],
                DataType::VOID,
            )
            .static_method(
                "Swap",
                &[ParamInfo::new("a", DataType::INT32).with_modifier(ParamModifier::Ref)],
                DataType::VOID,
            )
            .build()
            .unwrap();
        let Some(sable_core::MemberLookup::Methods(print)) = reg.lookup_member(owner, "Print") else {
            panic!("expected methods");
        };
        let Some(sable_core::MemberLookup::Methods(swap)) = reg.lookup_member(owner, "Swap") else {
            panic!("expected methods");
        };
        let mut hashes = print;
        hashes.extend(swap);
        (reg, hashes)
    }

    fn candidates<'a>(reg: &'a TypeRegistry, hashes: &[TypeHash]) -> Vec<Candidate<'a>> {
        hashes
            .iter()
            .filter_map(|&h| Candidate::method(reg, h))
            .collect()
    }

    #[test]
    fn exact_match_wins() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[..3]);
        let found = BestMatchResolver
            .select(&reg, &cands, &[ArgumentInfo::value(DataType::INT32)], Span::SYNTHETIC)
            .unwrap();
        assert_eq!(found.method, hashes[0]);
        assert!(found.conversions[0].is_exact());
    }

    #[test]
    fn widening_picks_the_better_target() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[..3]);
        let found = BestMatchResolver
            .select(&reg, &cands, &[ArgumentInfo::value(ty(primitives::INT16))], Span::SYNTHETIC)
            .unwrap();
        assert_eq!(found.method, hashes[0]);
    }

    #[test]
    fn params_array_in_expanded_form() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[..3]);
        let args = [
            ArgumentInfo::value(DataType::STRING),
            ArgumentInfo::value(DataType::INT32),
            ArgumentInfo::value(DataType::STRING),
        ];
        let found = BestMatchResolver.select(&reg, &cands, &args, Span::SYNTHETIC).unwrap();
        assert_eq!(found.method, hashes[2]);
        assert!(found.expanded);
        assert_eq!(found.targets[1], DataType::OBJECT);

        let normal = [
            ArgumentInfo::value(DataType::STRING),
            ArgumentInfo::value(DataType::array_of(DataType::OBJECT, 1)),
        ];
        let found = BestMatchResolver.select(&reg, &cands, &normal, Span::SYNTHETIC).unwrap();
        assert!(!found.expanded);
    }

    #[test]
    fn count_mismatch_is_1501() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[..2]);
        let err = BestMatchResolver.select(&reg, &cands, &[], Span::SYNTHETIC).unwrap_err();
        assert_eq!(err.code(), 1501);
    }

    #[test]
    fn wrong_argument_type_is_1502() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[..2]);
        let err = BestMatchResolver
            .select(&reg, &cands, &[ArgumentInfo::value(DataType::STRING)], Span::SYNTHETIC)
            .unwrap_err();
        assert_eq!(err.code(), 1502);
    }

    #[test]
    fn missing_ref_keyword_is_1620() {
        let (reg, hashes) = registry();
        let cands = candidates(&reg, &hashes[3..]);
        let err = BestMatchResolver
            .select(&reg, &cands, &[ArgumentInfo::value(DataType::INT32)], Span::SYNTHETIC)
            .unwrap_err();
        assert_eq!(err.code(), 1620);

        let by_ref = ArgumentInfo {
            modifier: ParamModifier::Ref,
            ..ArgumentInfo::value(DataType::INT32)
        };
        assert!(BestMatchResolver.select(&reg, &cands, &[by_ref], Span::SYNTHETIC).is_ok());
    }
}
