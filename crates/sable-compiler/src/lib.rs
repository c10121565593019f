//! Sable expression compiler
//!
//! Resolves expression trees against a [`TypeSystem`](sable_core::TypeSystem)
//! and emits stack bytecode for them.
//!
//! ## Modules
//!
//! - [`constant`]: Constant values and compile-time folding
//! - [`conversion`]: Implicit, explicit and user-defined conversions
//! - [`operators`]: Predefined operator tables and user operator lookup
//! - [`overload`]: Best-match selection among candidate methods
//! - [`expr`]: Expression nodes, resolution and emission
//! - [`emit`]: The code sink, temporaries and labels
//! - [`bytecode`]: Opcodes, chunks and the constant pool
//! - [`clone`]: Deep copies of expression trees

pub mod bytecode;
pub mod clone;
pub mod constant;
pub mod context;
pub mod conversion;
pub mod emit;
pub mod expr;
pub mod locals;
pub mod operators;
pub mod options;
pub mod overload;

pub use clone::CloneContext;
pub use context::{ResolveContext, ResolveFlags, WellKnown};
pub use locals::{LocalId, LocalInfo, LocalTable, Storage};
pub use options::CompilerOptions;
pub use overload::{BestMatchResolver, OverloadResolver};

// Re-export the error type for convenience
pub use sable_core::CompilationError;
