//! Sable: an expression compiler for a statically typed scripting language.
//!
//! A front end hands over expression trees ([`compiler::expr::Expr`]). They
//! are resolved against a [`core::TypeSystem`], usually a
//! [`registry::TypeRegistry`], and emitted as stack bytecode.
//! [`Compilation`] drives both phases and collects diagnostics.

pub use sable_compiler as compiler;
pub use sable_core as core;
pub use sable_registry as registry;

mod compilation;
mod error;
pub mod logging;

pub use compilation::Compilation;
pub use error::{SableError, SableResult};

pub mod prelude {
    pub use crate::compilation::Compilation;
    pub use crate::error::{SableError, SableResult};
    pub use sable_compiler::bytecode::{BytecodeChunk, OpCode};
    pub use sable_compiler::expr::Expr;
    pub use sable_compiler::operators::{BinaryOp, UnaryOp};
    pub use sable_compiler::{CompilerOptions, LocalId};
    pub use sable_core::{CompilationError, DataType, Diagnostics, Span, TypeHash, TypeSystem};
    pub use sable_registry::TypeRegistry;
}
