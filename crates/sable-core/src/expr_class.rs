//! Expression classification.

use std::fmt;

/// What a resolved expression denotes.
///
/// The class decides which operations are legal on a node: only `Variable`,
/// `PropertyAccess` and `IndexerAccess` can be assigned, only `MethodGroup`
/// can be invoked by name, only `Variable` can have its address taken.
/// `Invalid` doubles as the marker for nodes that have not been resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExprClass {
    #[default]
    Invalid,
    Value,
    Variable,
    PropertyAccess,
    IndexerAccess,
    EventAccess,
    MethodGroup,
    Type,
    Namespace,
}

impl ExprClass {
    #[inline]
    pub fn is_resolved(self) -> bool {
        self != ExprClass::Invalid
    }

    /// Whether the node can be the target of an assignment or `++`/`--`.
    #[inline]
    pub fn is_assignable(self) -> bool {
        matches!(
            self,
            ExprClass::Variable | ExprClass::PropertyAccess | ExprClass::IndexerAccess
        )
    }

    /// Whether the node produces a value when read.
    #[inline]
    pub fn is_value_like(self) -> bool {
        matches!(
            self,
            ExprClass::Value
                | ExprClass::Variable
                | ExprClass::PropertyAccess
                | ExprClass::IndexerAccess
        )
    }
}

impl fmt::Display for ExprClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExprClass::Invalid => "invalid expression",
            ExprClass::Value => "value",
            ExprClass::Variable => "variable",
            ExprClass::PropertyAccess => "property access",
            ExprClass::IndexerAccess => "indexer access",
            ExprClass::EventAccess => "event",
            ExprClass::MethodGroup => "method group",
            ExprClass::Type => "type",
            ExprClass::Namespace => "namespace",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unresolved() {
        assert!(!ExprClass::default().is_resolved());
        assert!(ExprClass::Value.is_resolved());
    }

    #[test]
    fn assignable_classes() {
        assert!(ExprClass::Variable.is_assignable());
        assert!(ExprClass::IndexerAccess.is_assignable());
        assert!(!ExprClass::Value.is_assignable());
        assert!(!ExprClass::EventAccess.is_assignable());
        assert!(!ExprClass::MethodGroup.is_value_like());
    }
}
