//! Bytecode types for the expression code sink.
//!
//! This module contains the core bytecode types:
//!
//! - [`OpCode`] - The stack machine instruction set
//! - [`BytecodeChunk`] - Compiled bytecode for one expression body
//! - [`PoolEntry`] and [`ConstantPool`] - Shared, deduplicated operand storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{ConstantPool, PoolEntry};
pub use opcode::OpCode;
