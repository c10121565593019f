//! Sable type registry.
//!
//! An in-memory [`TypeSystem`](sable_core::TypeSystem) implementation used by
//! the compiler's tests and by embedders that do not bring their own metadata
//! source.

mod builder;
mod builtins;
mod hierarchy;
mod registry;

pub use builder::{TypeBuilder, params_of};
pub use builtins::{DECIMAL_BINARY_OPERATORS, DECIMAL_COMPARISONS};
pub use hierarchy::{Hierarchy, Relation};
pub use registry::{RegistrationError, TypeRegistry, ty};
