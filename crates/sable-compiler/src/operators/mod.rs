//! Operator resolution for expression compilation.
//!
//! This module decides how an operator applies to its operand types:
//! - Predefined operators map to stack instructions after numeric promotion
//! - Enum, pointer, string and delegate operators follow dedicated rules
//! - User-defined operators become calls to `op_*` methods
//!
//! Constant folding lives in [`crate::constant`]; building the rewritten
//! expression nodes happens in [`crate::expr`].

mod predefined;
mod special;
mod user;

pub use predefined::{
    PredefinedBinary, PredefinedUnary, arithmetic_opcode, comparison_branch, comparison_opcodes,
    resolve_predefined_binary, resolve_predefined_unary,
};
pub use special::{
    EnumRule, PointerRule, delegate_binary_rule, enum_binary_rule, is_reference_equality,
    pointer_binary_rule,
};
pub use user::{is_predefined_type, truth_operator, user_binary_candidates, user_unary_candidates};

use std::fmt;

use sable_core::DataType;

use crate::constant::Constant;

/// An operand as seen by operator selection: its type and, when it is a
/// compile-time constant, its value.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub ty: DataType,
    pub constant: Option<&'a Constant>,
}

impl<'a> Operand<'a> {
    pub fn new(ty: DataType, constant: Option<&'a Constant>) -> Self {
        Self { ty, constant }
    }

    pub fn value(ty: DataType) -> Self {
        Self { ty, constant: None }
    }
}

/// A prefix unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    LogicalNot,
    OnesComplement,
}

impl UnaryOp {
    /// Name of the user-defined operator method.
    pub fn method_name(self) -> &'static str {
        match self {
            UnaryOp::Plus => "op_UnaryPlus",
            UnaryOp::Minus => "op_UnaryNegation",
            UnaryOp::LogicalNot => "op_LogicalNot",
            UnaryOp::OnesComplement => "op_OnesComplement",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::LogicalNot => "!",
            UnaryOp::OnesComplement => "~",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Multiply,
    Division,
    Modulus,
    Addition,
    Subtraction,
    LeftShift,
    RightShift,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equality,
    Inequality,
    BitwiseAnd,
    ExclusiveOr,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Name of the user-defined operator method.
    ///
    /// `&&` and `||` are built from the user's `&` and `|`.
    pub fn method_name(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Multiply => "op_Multiply",
            Division => "op_Division",
            Modulus => "op_Modulus",
            Addition => "op_Addition",
            Subtraction => "op_Subtraction",
            LeftShift => "op_LeftShift",
            RightShift => "op_RightShift",
            LessThan => "op_LessThan",
            GreaterThan => "op_GreaterThan",
            LessThanOrEqual => "op_LessThanOrEqual",
            GreaterThanOrEqual => "op_GreaterThanOrEqual",
            Equality => "op_Equality",
            Inequality => "op_Inequality",
            BitwiseAnd | LogicalAnd => "op_BitwiseAnd",
            ExclusiveOr => "op_ExclusiveOr",
            BitwiseOr | LogicalOr => "op_BitwiseOr",
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Multiply => "*",
            Division => "/",
            Modulus => "%",
            Addition => "+",
            Subtraction => "-",
            LeftShift => "<<",
            RightShift => ">>",
            LessThan => "<",
            GreaterThan => ">",
            LessThanOrEqual => "<=",
            GreaterThanOrEqual => ">=",
            Equality => "==",
            Inequality => "!=",
            BitwiseAnd => "&",
            ExclusiveOr => "^",
            BitwiseOr => "|",
            LogicalAnd => "&&",
            LogicalOr => "||",
        }
    }

    /// `+ - * / %`
    pub fn is_arithmetic(self) -> bool {
        use BinaryOp::*;
        matches!(self, Multiply | Division | Modulus | Addition | Subtraction)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::LeftShift | BinaryOp::RightShift)
    }

    /// `== !=`
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equality | BinaryOp::Inequality)
    }

    /// `< > <= >=`
    pub fn is_relational(self) -> bool {
        use BinaryOp::*;
        matches!(self, LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual)
    }

    /// Relational or equality; the result is `bool`.
    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }

    /// `& ^ |`
    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitwiseAnd | BinaryOp::ExclusiveOr | BinaryOp::BitwiseOr)
    }

    /// `&& ||`
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    /// The comparison that holds when `a op b` holds, with operands swapped.
    pub fn swapped(self) -> BinaryOp {
        use BinaryOp::*;
        match self {
            LessThan => GreaterThan,
            GreaterThan => LessThan,
            LessThanOrEqual => GreaterThanOrEqual,
            GreaterThanOrEqual => LessThanOrEqual,
            other => other,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Increment or decrement, prefix or postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecMode {
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl IncDecMode {
    pub fn is_increment(self) -> bool {
        matches!(self, IncDecMode::PreIncrement | IncDecMode::PostIncrement)
    }

    pub fn is_prefix(self) -> bool {
        matches!(self, IncDecMode::PreIncrement | IncDecMode::PreDecrement)
    }

    pub fn method_name(self) -> &'static str {
        if self.is_increment() { "op_Increment" } else { "op_Decrement" }
    }

    pub fn symbol(self) -> &'static str {
        if self.is_increment() { "++" } else { "--" }
    }

    /// The binary operator applied to the operand and `1`.
    pub fn binary_op(self) -> BinaryOp {
        if self.is_increment() {
            BinaryOp::Addition
        } else {
            BinaryOp::Subtraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_operators_use_bitwise_method_names() {
        assert_eq!(BinaryOp::LogicalAnd.method_name(), "op_BitwiseAnd");
        assert_eq!(BinaryOp::LogicalOr.method_name(), "op_BitwiseOr");
    }

    #[test]
    fn classification() {
        assert!(BinaryOp::Modulus.is_arithmetic());
        assert!(BinaryOp::RightShift.is_shift());
        assert!(BinaryOp::LessThanOrEqual.is_relational());
        assert!(BinaryOp::Inequality.is_comparison());
        assert!(!BinaryOp::BitwiseAnd.is_comparison());
        assert!(BinaryOp::LogicalOr.is_logical());
    }

    #[test]
    fn swapped_comparisons() {
        assert_eq!(BinaryOp::LessThan.swapped(), BinaryOp::GreaterThan);
        assert_eq!(BinaryOp::Equality.swapped(), BinaryOp::Equality);
    }

    #[test]
    fn inc_dec_modes() {
        assert!(IncDecMode::PostIncrement.is_increment());
        assert!(!IncDecMode::PostIncrement.is_prefix());
        assert_eq!(IncDecMode::PreDecrement.method_name(), "op_Decrement");
        assert_eq!(IncDecMode::PreDecrement.binary_op(), BinaryOp::Subtraction);
    }
}
