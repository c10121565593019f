//! Code emission.
//!
//! Expression nodes emit against the abstract [`CodeSink`]. The crate's own
//! sink, [`BytecodeEmitter`], writes a [`BytecodeChunk`](crate::bytecode::BytecodeChunk)
//! with a shared constant pool:
//!
//! ```
//! use sable_compiler::bytecode::{ConstantPool, OpCode};
//! use sable_compiler::constant::ConstValue;
//! use sable_compiler::emit::{BytecodeEmitter, CodeSink};
//!
//! let mut pool = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut pool);
//! emitter.emit_constant(&ConstValue::Int(40));
//! emitter.emit_constant(&ConstValue::Int(2));
//! emitter.emit(OpCode::Add);
//! let chunk = emitter.finish().unwrap();
//! chunk.assert_opcodes(&[OpCode::Constant, OpCode::Constant, OpCode::Add]);
//! ```

mod context;
mod emitter;
mod labels;
mod temps;

pub use context::{EmitContext, Prepared, PreparedState};
pub use emitter::BytecodeEmitter;
pub use labels::LabelTable;
pub use temps::{Temp, TempPool};

use sable_core::{DataType, TypeHash};

use crate::bytecode::OpCode;
use crate::constant::ConstValue;

/// A branch target. Defined first, marked once, referenced by any number of
/// branches before or after it is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

/// The instruction stream expression emission writes to.
pub trait CodeSink {
    /// Source line attached to subsequent instructions.
    fn set_line(&mut self, line: u32);

    /// An instruction without operands.
    fn emit(&mut self, op: OpCode);

    /// Push a constant, choosing the shortest form.
    fn emit_constant(&mut self, value: &ConstValue);

    /// Local or argument slot instructions.
    fn emit_slot(&mut self, op: OpCode, slot: u16);

    /// Instructions with a type operand (`box`, `ldobj`, `newarr`, ...).
    fn emit_type(&mut self, op: OpCode, ty: DataType);

    /// Field instructions.
    fn emit_member(&mut self, op: OpCode, member: TypeHash);

    /// `call`, `callvirt` and `newobj`. `arg_count` excludes the receiver.
    fn emit_call(&mut self, op: OpCode, method: TypeHash, arg_count: u8);

    /// Raw element data for `InitializeArray`.
    fn emit_blob(&mut self, data: Vec<u8>);

    fn define_label(&mut self) -> Label;

    /// Bind `label` to the current position.
    fn mark_label(&mut self, label: Label);

    fn emit_branch(&mut self, op: OpCode, label: Label);

    /// A new frame slot for a temporary of type `ty`.
    fn declare_local(&mut self, ty: DataType) -> u16;
}
