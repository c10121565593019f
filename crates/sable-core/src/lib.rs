//! Shared vocabulary of the sable expression compiler.
//!
//! - [`Span`] and [`TypeHash`] identify where and what
//! - [`DataType`] adds pointer and array structure to a type identity
//! - [`ExprClass`] classifies resolved expressions
//! - [`CompilationError`] and [`Warning`] carry stable diagnostic codes
//! - [`TypeSystem`] is the metadata contract resolution consumes

mod data_type;
mod diagnostics;
mod error;
mod expr_class;
mod span;
mod type_hash;
mod type_system;

pub use data_type::DataType;
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use error::{CompilationError, ComparisonSide, Warning};
pub use expr_class::ExprClass;
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants, primitives};
pub use type_system::{
    EventInfo, FieldInfo, IndexerInfo, MemberConstant, MemberLookup, MethodFlags, MethodInfo,
    ParamInfo, ParamModifier, PropertyInfo, TypeFlags, TypeInfo, TypeKind, TypeParamConstraints,
    TypeSystem,
};
