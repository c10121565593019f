//! Error and warning types raised while resolving expressions.
//!
//! Every condition has a stable numeric code (`CSnnnn` in messages) that
//! downstream tooling and the test suite match on, plus a human readable
//! message. Errors carry the span of the offending node.

use thiserror::Error;

use crate::{ExprClass, Span};

// ============================================================================
// Errors
// ============================================================================

/// An error that makes an expression unresolvable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------
    #[error("at {span}: operator '{op}' cannot be applied to operands of type '{left}' and '{right}'")]
    NoBinaryOperator {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("at {span}: operator '{op}' cannot be applied to operand of type '{operand}'")]
    NoUnaryOperator {
        op: String,
        operand: String,
        span: Span,
    },

    #[error("at {span}: operator '{op}' is ambiguous on operands of type {operands}")]
    AmbiguousOperator {
        op: String,
        operands: String,
        span: Span,
    },

    #[error("at {span}: no such operator '{op}' defined for type '{operand}'")]
    NoIncrementOperator {
        op: String,
        operand: String,
        span: Span,
    },

    #[error("at {span}: the operand of an increment or decrement operator must be a variable, property or indexer")]
    IncrementOperandNotAssignable { span: Span },

    #[error("at {span}: user-defined operator '{op}' must have parameters and return values of type '{ty}' to be used as a short circuit operator")]
    UserLogicalOperatorShape { op: String, ty: String, span: Span },

    #[error("at {span}: the type '{ty}' must declare operator true and operator false to be used as a short circuit operator")]
    UserLogicalOperatorTrueFalse { ty: String, span: Span },

    // ------------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------------
    #[error("at {span}: the operation overflows at compile time in checked mode")]
    CompileTimeOverflow { span: Span },

    #[error("at {span}: constant value '{value}' cannot be converted to a '{target}'")]
    ConstantOutOfRange {
        value: String,
        target: String,
        span: Span,
    },

    #[error("at {span}: division by constant zero")]
    DivisionByConstantZero { span: Span },

    #[error("at {span}: a constant value is expected")]
    ConstantExpected { span: Span },

    // ------------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------------
    #[error("at {span}: cannot implicitly convert type '{from}' to '{to}'{}", if *explicit_exists { ". An explicit conversion exists (are you missing a cast?)" } else { "" })]
    CannotImplicitlyConvert {
        from: String,
        to: String,
        explicit_exists: bool,
        span: Span,
    },

    #[error("at {span}: cannot convert type '{from}' to '{to}'")]
    CannotConvert { from: String, to: String, span: Span },

    // ------------------------------------------------------------------------
    // Assignment and storage
    // ------------------------------------------------------------------------
    #[error("at {span}: the left-hand side of an assignment must be a variable, a property or an indexer")]
    NotAssignable { span: Span },

    #[error("at {span}: property or indexer '{member}' cannot be assigned to (it is read only)")]
    ReadOnly { member: String, span: Span },

    #[error("at {span}: the property or indexer '{member}' cannot be used in this context because it lacks the get accessor")]
    NoGetter { member: String, span: Span },

    #[error("at {span}: a property or indexer '{member}' may not be passed as an out or ref parameter")]
    PropertyAsRefArgument { member: String, span: Span },

    #[error("at {span}: the event '{event}' can only appear on the left hand side of += or -=")]
    EventMisuse { event: String, span: Span },

    #[error("at {span}: '{name}' is a '{found}' but is used like a {expected}")]
    ClassMisuse {
        name: String,
        found: ExprClass,
        expected: &'static str,
        span: Span,
    },

    // ------------------------------------------------------------------------
    // Pointers and addresses
    // ------------------------------------------------------------------------
    #[error("at {span}: cannot take the address of the given expression")]
    CannotTakeAddress { span: Span },

    #[error("at {span}: you can only take the address of an unfixed expression inside a fixed statement initializer")]
    AddressOfUnfixed { span: Span },

    #[error("at {span}: you cannot use the fixed statement to take the address of an already fixed expression")]
    AlreadyFixed { span: Span },

    #[error("at {span}: the * or -> operator must be applied to a pointer, found '{ty}'")]
    IndirectionOfNonPointer { ty: String, span: Span },

    #[error("at {span}: the operation in question is undefined on void pointers")]
    VoidPointerOperation { span: Span },

    #[error("at {span}: pointers and fixed size buffers may only be used in an unsafe context")]
    UnsafeContextRequired { span: Span },

    // ------------------------------------------------------------------------
    // Arrays and indexers
    // ------------------------------------------------------------------------
    #[error("at {span}: wrong number of indexes inside [], expected '{expected}'")]
    WrongIndexCount { expected: usize, span: Span },

    #[error("at {span}: cannot apply indexing with [] to an expression of type '{ty}'")]
    CannotIndex { ty: String, span: Span },

    #[error("at {span}: a pointer must be indexed by only one value")]
    PointerMultipleIndices { span: Span },

    #[error("at {span}: cannot create an array with a negative size")]
    NegativeArraySize { span: Span },

    #[error("at {span}: an array initializer of length '{expected}' is expected")]
    ArrayInitializerLength { expected: usize, span: Span },

    #[error("at {span}: array initializers can only be used in a variable or field initializer")]
    ArrayInitializerContext { span: Span },

    #[error("at {span}: the type of an implicitly typed array cannot be inferred from the initializer")]
    NoBestArrayType { span: Span },

    // ------------------------------------------------------------------------
    // Object creation and initializers
    // ------------------------------------------------------------------------
    #[error("at {span}: cannot create an instance of the abstract class or interface '{ty}'")]
    AbstractInstantiation { ty: String, span: Span },

    #[error("at {span}: cannot create an instance of the static class '{ty}'")]
    StaticInstantiation { ty: String, span: Span },

    #[error("at {span}: cannot create an instance of the variable type '{ty}' because it does not have the new() constraint")]
    MissingNewConstraint { ty: String, span: Span },

    #[error("at {span}: '{ty}': cannot provide arguments when creating an instance of a variable type")]
    TypeParameterConstructorArgs { ty: String, span: Span },

    #[error("at {span}: an object initializer includes more than one member '{member}' initialization")]
    DuplicateInitializerMember { member: String, span: Span },

    #[error("at {span}: member '{member}' cannot be initialized. An object initializer may only be used for fields, or properties")]
    InitializerMemberNotFieldOrProperty { member: String, span: Span },

    #[error("at {span}: static field or property '{member}' cannot be assigned in an object initializer")]
    StaticInitializerMember { member: String, span: Span },

    #[error("at {span}: a field or property '{ty}' cannot be initialized with a collection object initializer because type does not implement the enumerable contract")]
    CollectionInitializerUnsupported { ty: String, span: Span },

    #[error("at {span}: inconsistent `object initializer' and `collection initializer' members declaration")]
    MixedInitializer { span: Span },

    // ------------------------------------------------------------------------
    // `this` and definite assignment
    // ------------------------------------------------------------------------
    #[error("at {span}: keyword `this' is not valid in a static property, static method, or static field initializer")]
    ThisInStaticContext { span: Span },

    #[error("at {span}: keyword `this' is not available in the current context")]
    ThisUnavailable { span: Span },

    #[error("at {span}: the `this' object cannot be used before all of its fields are assigned to")]
    ThisBeforeFieldsAssigned { span: Span },

    #[error("at {span}: use of unassigned local variable '{name}'")]
    UnassignedLocal { name: String, span: Span },

    #[error("at {span}: use of unassigned out parameter '{name}'")]
    UnassignedOutParameter { name: String, span: Span },

    // ------------------------------------------------------------------------
    // Members and invocation
    // ------------------------------------------------------------------------
    #[error("at {span}: '{ty}' does not contain a definition for '{member}'")]
    MemberNotFound {
        ty: String,
        member: String,
        span: Span,
    },

    #[error("at {span}: the name '{name}' does not exist in the current context")]
    NameNotFound { name: String, span: Span },

    #[error("at {span}: the type or namespace name '{name}' could not be found")]
    TypeNotFound { name: String, span: Span },

    #[error("at {span}: an object reference is required to access non-static member '{member}'")]
    InstanceMemberWithoutObject { member: String, span: Span },

    #[error("at {span}: static member '{member}' cannot be accessed with an instance reference, qualify it with a type name instead")]
    StaticMemberThroughInstance { member: String, span: Span },

    #[error("at {span}: '{method}': cannot explicitly call operator or accessor")]
    SpecialNameCall { method: String, span: Span },

    #[error("at {span}: method name expected")]
    MethodNameExpected { span: Span },

    #[error("at {span}: non-invocable member '{member}' cannot be used like a method")]
    NotInvocable { member: String, span: Span },

    #[error("at {span}: no overload for method '{method}' takes '{count}' arguments")]
    ArgumentCountMismatch {
        method: String,
        count: usize,
        span: Span,
    },

    #[error("at {span}: the best overloaded method match for '{method}' has some invalid arguments")]
    InvalidArguments { method: String, span: Span },

    #[error("at {span}: the call is ambiguous between the following methods or properties: '{first}' and '{second}'")]
    AmbiguousCall {
        first: String,
        second: String,
        span: Span,
    },

    #[error("at {span}: argument {index} must be an assignable variable to be passed as ref or out")]
    RefArgumentNotAssignable { index: usize, span: Span },

    #[error("at {span}: argument {index} must be passed with the '{expected}' keyword")]
    ArgumentModifierMismatch {
        index: usize,
        expected: &'static str,
        span: Span,
    },

    // ------------------------------------------------------------------------
    // Conditional
    // ------------------------------------------------------------------------
    #[error("at {span}: type of conditional expression cannot be determined because there is no implicit conversion between '{left}' and '{right}'")]
    ConditionalNoConversion {
        left: String,
        right: String,
        span: Span,
    },

    #[error("at {span}: type of conditional expression cannot be determined as '{left}' and '{right}' convert implicitly to each other")]
    ConditionalAmbiguous {
        left: String,
        right: String,
        span: Span,
    },

    // ------------------------------------------------------------------------
    // Type queries
    // ------------------------------------------------------------------------
    #[error("at {span}: the `{op}' operator cannot be applied to an operand of pointer type")]
    TypeTestOnPointer { op: &'static str, span: Span },

    #[error("at {span}: the `as' operator cannot be used with a non-nullable value type '{ty}'")]
    AsWithValueType { ty: String, span: Span },

    #[error("at {span}: the `as' operator cannot be used with type parameter '{ty}' because it does not have a class type constraint")]
    AsWithUnconstrainedTypeParameter { ty: String, span: Span },

    #[error("at {span}: cannot convert type '{from}' to '{to}' via a built-in conversion")]
    NoBuiltinConversion { from: String, to: String, span: Span },

    #[error("at {span}: keyword `void' cannot be used in this context")]
    VoidInThisContext { span: Span },

    #[error("at {span}: cannot take the address of, get the size of, or declare a pointer to a managed type '{ty}'")]
    ManagedType { ty: String, span: Span },

    #[error("at {span}: '{ty}' does not have a predefined size, therefore sizeof can only be used in an unsafe context")]
    SizeOfRequiresUnsafe { ty: String, span: Span },

    #[error("at {span}: cannot use a negative size with stackalloc")]
    NegativeStackAllocSize { span: Span },

    // ------------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------------
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// The stable diagnostic number.
    pub fn code(&self) -> u16 {
        use CompilationError::*;
        match self {
            NoBinaryOperator { .. } => 19,
            NoUnaryOperator { .. } => 23,
            AmbiguousOperator { .. } => 34,
            NoIncrementOperator { .. } => 187,
            IncrementOperandNotAssignable { .. } => 1059,
            UserLogicalOperatorShape { .. } => 217,
            UserLogicalOperatorTrueFalse { .. } => 218,
            CompileTimeOverflow { .. } => 220,
            ConstantOutOfRange { .. } => 221,
            DivisionByConstantZero { .. } => 20,
            ConstantExpected { .. } => 150,
            CannotImplicitlyConvert {
                explicit_exists: true,
                ..
            } => 266,
            CannotImplicitlyConvert { .. } => 29,
            CannotConvert { .. } => 30,
            NotAssignable { .. } => 131,
            ReadOnly { .. } => 200,
            NoGetter { .. } => 154,
            PropertyAsRefArgument { .. } => 206,
            EventMisuse { .. } => 70,
            ClassMisuse { .. } => 118,
            CannotTakeAddress { .. } => 211,
            AddressOfUnfixed { .. } => 212,
            AlreadyFixed { .. } => 213,
            IndirectionOfNonPointer { .. } => 193,
            VoidPointerOperation { .. } => 242,
            UnsafeContextRequired { .. } => 214,
            WrongIndexCount { .. } => 22,
            CannotIndex { .. } => 21,
            PointerMultipleIndices { .. } => 196,
            NegativeArraySize { .. } => 248,
            ArrayInitializerLength { .. } => 847,
            ArrayInitializerContext { .. } => 623,
            NoBestArrayType { .. } => 826,
            AbstractInstantiation { .. } => 144,
            StaticInstantiation { .. } => 712,
            MissingNewConstraint { .. } => 304,
            TypeParameterConstructorArgs { .. } => 417,
            DuplicateInitializerMember { .. } => 1912,
            InitializerMemberNotFieldOrProperty { .. } => 1913,
            StaticInitializerMember { .. } => 1914,
            CollectionInitializerUnsupported { .. } => 1922,
            MixedInitializer { .. } => 747,
            ThisInStaticContext { .. } => 26,
            ThisUnavailable { .. } => 27,
            ThisBeforeFieldsAssigned { .. } => 188,
            UnassignedLocal { .. } => 165,
            UnassignedOutParameter { .. } => 269,
            MemberNotFound { .. } => 117,
            NameNotFound { .. } => 103,
            TypeNotFound { .. } => 246,
            InstanceMemberWithoutObject { .. } => 120,
            StaticMemberThroughInstance { .. } => 176,
            SpecialNameCall { .. } => 571,
            MethodNameExpected { .. } => 149,
            NotInvocable { .. } => 1955,
            ArgumentCountMismatch { .. } => 1501,
            InvalidArguments { .. } => 1502,
            AmbiguousCall { .. } => 121,
            RefArgumentNotAssignable { .. } => 1510,
            ArgumentModifierMismatch { .. } => 1620,
            ConditionalNoConversion { .. } => 173,
            ConditionalAmbiguous { .. } => 172,
            TypeTestOnPointer { .. } => 244,
            AsWithValueType { .. } => 77,
            AsWithUnconstrainedTypeParameter { .. } => 413,
            NoBuiltinConversion { .. } => 39,
            VoidInThisContext { .. } => 1547,
            ManagedType { .. } => 208,
            SizeOfRequiresUnsafe { .. } => 233,
            NegativeStackAllocSize { .. } => 247,
            Internal { .. } => 0,
        }
    }

    /// Location of the offending node. Internal errors have none.
    pub fn span(&self) -> Span {
        use CompilationError::*;
        match self {
            NoBinaryOperator { span, .. }
            | NoUnaryOperator { span, .. }
            | AmbiguousOperator { span, .. }
            | NoIncrementOperator { span, .. }
            | IncrementOperandNotAssignable { span }
            | UserLogicalOperatorShape { span, .. }
            | UserLogicalOperatorTrueFalse { span, .. }
            | CompileTimeOverflow { span }
            | ConstantOutOfRange { span, .. }
            | DivisionByConstantZero { span }
            | ConstantExpected { span }
            | CannotImplicitlyConvert { span, .. }
            | CannotConvert { span, .. }
            | NotAssignable { span }
            | ReadOnly { span, .. }
            | NoGetter { span, .. }
            | PropertyAsRefArgument { span, .. }
            | EventMisuse { span, .. }
            | ClassMisuse { span, .. }
            | CannotTakeAddress { span }
            | AddressOfUnfixed { span }
            | AlreadyFixed { span }
            | IndirectionOfNonPointer { span, .. }
            | VoidPointerOperation { span }
            | UnsafeContextRequired { span }
            | WrongIndexCount { span, .. }
            | CannotIndex { span, .. }
            | PointerMultipleIndices { span }
            | NegativeArraySize { span }
            | ArrayInitializerLength { span, .. }
            | ArrayInitializerContext { span }
            | NoBestArrayType { span }
            | AbstractInstantiation { span, .. }
            | StaticInstantiation { span, .. }
            | MissingNewConstraint { span, .. }
            | TypeParameterConstructorArgs { span, .. }
            | DuplicateInitializerMember { span, .. }
            | InitializerMemberNotFieldOrProperty { span, .. }
            | StaticInitializerMember { span, .. }
            | CollectionInitializerUnsupported { span, .. }
            | MixedInitializer { span }
            | ThisInStaticContext { span }
            | ThisUnavailable { span }
            | ThisBeforeFieldsAssigned { span }
            | UnassignedLocal { span, .. }
            | UnassignedOutParameter { span, .. }
            | MemberNotFound { span, .. }
            | NameNotFound { span, .. }
            | TypeNotFound { span, .. }
            | InstanceMemberWithoutObject { span, .. }
            | StaticMemberThroughInstance { span, .. }
            | SpecialNameCall { span, .. }
            | MethodNameExpected { span }
            | NotInvocable { span, .. }
            | ArgumentCountMismatch { span, .. }
            | InvalidArguments { span, .. }
            | AmbiguousCall { span, .. }
            | RefArgumentNotAssignable { span, .. }
            | ArgumentModifierMismatch { span, .. }
            | ConditionalNoConversion { span, .. }
            | ConditionalAmbiguous { span, .. }
            | TypeTestOnPointer { span, .. }
            | AsWithValueType { span, .. }
            | AsWithUnconstrainedTypeParameter { span, .. }
            | NoBuiltinConversion { span, .. }
            | VoidInThisContext { span }
            | ManagedType { span, .. }
            | SizeOfRequiresUnsafe { span, .. }
            | NegativeStackAllocSize { span } => *span,
            Internal { .. } => Span::SYNTHETIC,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Which operand of a comparison triggered a reference-comparison warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonSide {
    Left,
    Right,
}

/// A condition worth reporting that never blocks resolution or emission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("at {span}: the result of the expression is always '{result}' since a value of type '{ty}' is never equal to 'null'")]
    ComparisonWithNullAlwaysConstant { result: bool, ty: String, span: Span },

    #[error("at {span}: unreachable expression code detected")]
    UnreachableExpression { span: Span },

    #[error("at {span}: a comparison between a constant and a variable is useless. The constant is out of the range of the variable type '{ty}'")]
    UselessComparison { ty: String, span: Span },

    #[error("at {span}: comparison made to same variable; did you mean to compare something else?")]
    SelfComparison { span: Span },

    #[error("at {span}: the operator `|' used on the sign-extended type '{ty}'. Consider casting to a smaller unsigned type first")]
    SignExtendedOr { ty: String, span: Span },

    #[error("at {span}: possible unintended reference comparison. Consider casting the {} side of the expression to type '{ty}' to get value comparison", match side { ComparisonSide::Left => "left", ComparisonSide::Right => "right" })]
    ReferenceComparison {
        side: ComparisonSide,
        ty: String,
        span: Span,
    },

    #[error("at {span}: indexing an array with a negative index (array indices always start at zero)")]
    NegativeArrayIndex { span: Span },

    #[error("at {span}: assignment in conditional expression is always constant. Did you mean to use == instead of = ?")]
    AssignmentInConditional { span: Span },

    #[error("at {span}: the given expression is always of the provided ('{ty}') type")]
    AlwaysOfType { ty: String, span: Span },

    #[error("at {span}: the given expression is never of the provided ('{ty}') type")]
    NeverOfType { ty: String, span: Span },
}

impl Warning {
    pub fn code(&self) -> u16 {
        match self {
            Warning::ComparisonWithNullAlwaysConstant { .. } => 472,
            Warning::UnreachableExpression { .. } => 429,
            Warning::UselessComparison { .. } => 652,
            Warning::SelfComparison { .. } => 1718,
            Warning::SignExtendedOr { .. } => 675,
            Warning::ReferenceComparison {
                side: ComparisonSide::Left,
                ..
            } => 252,
            Warning::ReferenceComparison { .. } => 253,
            Warning::NegativeArrayIndex { .. } => 251,
            Warning::AssignmentInConditional { .. } => 665,
            Warning::AlwaysOfType { .. } => 183,
            Warning::NeverOfType { .. } => 184,
        }
    }

    /// Minimum warning level at which the warning is reported.
    pub fn level(&self) -> u8 {
        match self {
            Warning::UnreachableExpression { .. } => 4,
            Warning::SelfComparison { .. }
            | Warning::SignExtendedOr { .. }
            | Warning::AssignmentInConditional { .. } => 3,
            Warning::ComparisonWithNullAlwaysConstant { .. }
            | Warning::UselessComparison { .. }
            | Warning::ReferenceComparison { .. }
            | Warning::NegativeArrayIndex { .. } => 2,
            Warning::AlwaysOfType { .. } | Warning::NeverOfType { .. } => 1,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Warning::ComparisonWithNullAlwaysConstant { span, .. }
            | Warning::UnreachableExpression { span }
            | Warning::UselessComparison { span, .. }
            | Warning::SelfComparison { span }
            | Warning::SignExtendedOr { span, .. }
            | Warning::ReferenceComparison { span, .. }
            | Warning::NegativeArrayIndex { span }
            | Warning::AssignmentInConditional { span }
            | Warning::AlwaysOfType { span, .. }
            | Warning::NeverOfType { span, .. } => *span,
        }
    }
}
