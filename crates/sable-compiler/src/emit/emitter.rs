//! The bytecode implementation of [`CodeSink`].

use sable_core::{CompilationError, DataType, TypeHash};

use super::{CodeSink, Label, LabelTable};
use crate::bytecode::{BytecodeChunk, ConstantPool, OpCode, PoolEntry};
use crate::constant::ConstValue;

/// Emits bytecode for one expression body.
///
/// Uses a shared constant pool for deduplication across bodies.
pub struct BytecodeEmitter<'pool> {
    /// The chunk being built
    chunk: BytecodeChunk,

    /// Shared constant pool (deduplicated)
    constants: &'pool mut ConstantPool,

    labels: LabelTable,

    /// Frame slots below this belong to declared locals.
    slot_base: u16,

    /// Types of the temporaries declared so far.
    temp_types: Vec<DataType>,

    /// Current source line for debug info
    current_line: u32,

    /// First operand that did not fit its encoding; reported by `finish`.
    operand_error: Option<CompilationError>,
}

impl<'pool> BytecodeEmitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            labels: LabelTable::new(),
            slot_base: 0,
            temp_types: Vec::new(),
            current_line: 1,
            operand_error: None,
        }
    }

    /// Temporaries are numbered from `base`, above the declared locals.
    pub fn with_slot_base(mut self, base: u16) -> Self {
        self.slot_base = base;
        self
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    /// Types of the temporaries declared during emission, in slot order.
    pub fn temp_types(&self) -> &[DataType] {
        &self.temp_types
    }

    /// Patch all branches and return the chunk.
    pub fn finish(mut self) -> Result<BytecodeChunk, CompilationError> {
        if let Some(error) = self.operand_error.take() {
            return Err(error);
        }
        self.labels.resolve(&mut self.chunk)?;
        Ok(self.chunk)
    }

    // ==========================================================================
    // Operand encoding
    // ==========================================================================

    fn record_overflow(&mut self, message: String) {
        if self.operand_error.is_none() {
            self.operand_error = Some(CompilationError::internal(message));
        }
    }

    /// Narrow a pool index to the u16 operand encoding.
    fn pool_operand(&mut self, op: OpCode, index: u32) -> u16 {
        u16::try_from(index).unwrap_or_else(|_| {
            self.record_overflow(format!("constant pool index {index} too large for {}", op.name()));
            0
        })
    }

    fn emit_pool_operand(&mut self, op: OpCode, index: u32) {
        let operand = self.pool_operand(op, index);
        self.emit_u16(op, operand);
    }

    fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    /// Narrow or wide pool load depending on the index.
    fn emit_pool_entry(&mut self, entry: PoolEntry) {
        let index = self.constants.add(entry);
        match u8::try_from(index) {
            Ok(narrow) => {
                self.chunk.write_op(OpCode::Constant, self.current_line);
                self.chunk.write_byte(narrow, self.current_line);
            }
            Err(_) => self.emit_pool_operand(OpCode::ConstantWide, index),
        }
    }

    fn emit_int(&mut self, value: i64, wide: bool) {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            -1 => self.emit(OpCode::PushMinusOne),
            _ if wide => self.emit_pool_entry(PoolEntry::Int64(value)),
            _ => self.emit_pool_entry(PoolEntry::Int32(value as i32)),
        }
    }
}

impl CodeSink for BytecodeEmitter<'_> {
    fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    fn emit_constant(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Bool(true) => self.emit(OpCode::PushTrue),
            ConstValue::Bool(false) => self.emit(OpCode::PushFalse),
            ConstValue::Null => self.emit(OpCode::PushNull),
            ConstValue::Char(v) => self.emit_int(i64::from(*v), false),
            ConstValue::SByte(v) => self.emit_int(i64::from(*v), false),
            ConstValue::Byte(v) => self.emit_int(i64::from(*v), false),
            ConstValue::Short(v) => self.emit_int(i64::from(*v), false),
            ConstValue::UShort(v) => self.emit_int(i64::from(*v), false),
            ConstValue::Int(v) => self.emit_int(i64::from(*v), false),
            // Stored by bit pattern.
            ConstValue::UInt(v) => match *v {
                0 | 1 => self.emit_int(i64::from(*v), false),
                _ => self.emit_pool_entry(PoolEntry::Int32(*v as i32)),
            },
            ConstValue::Long(v) => self.emit_int(*v, true),
            ConstValue::ULong(v) => match *v {
                0 | 1 => self.emit_int(*v as i64, true),
                _ => self.emit_pool_entry(PoolEntry::Int64(*v as i64)),
            },
            ConstValue::Float(v) => self.emit_pool_entry(PoolEntry::Float32(v.into_inner())),
            ConstValue::Double(v) => self.emit_pool_entry(PoolEntry::Float64(v.into_inner())),
            ConstValue::Decimal(d) => self.emit_pool_entry(PoolEntry::Decimal {
                mantissa: d.mantissa(),
                scale: d.scale(),
            }),
            ConstValue::String(s) => self.emit_pool_entry(PoolEntry::StringData(s.as_bytes().to_vec())),
        }
    }

    fn emit_slot(&mut self, op: OpCode, slot: u16) {
        self.emit_u16(op, slot);
    }

    fn emit_type(&mut self, op: OpCode, ty: DataType) {
        let index = self.constants.add_type(ty);
        self.emit_pool_operand(op, index);
    }

    fn emit_member(&mut self, op: OpCode, member: TypeHash) {
        let index = self.constants.add_type_hash(member);
        self.emit_pool_operand(op, index);
    }

    fn emit_call(&mut self, op: OpCode, method: TypeHash, arg_count: u8) {
        let index = self.constants.add_type_hash(method);
        self.emit_pool_operand(op, index);
        self.chunk.write_byte(arg_count, self.current_line);
    }

    fn emit_blob(&mut self, data: Vec<u8>) {
        let index = self.constants.add(PoolEntry::Blob(data));
        self.emit_pool_operand(OpCode::InitializeArray, index);
    }

    fn define_label(&mut self) -> Label {
        self.labels.define()
    }

    fn mark_label(&mut self, label: Label) {
        self.labels.mark(label, self.chunk.current_offset());
    }

    fn emit_branch(&mut self, op: OpCode, label: Label) {
        self.chunk.write_op(op, self.current_line);
        self.labels.add_fixup(self.chunk.current_offset(), label);
        self.chunk.write_i32(0, self.current_line);
    }

    fn declare_local(&mut self, ty: DataType) -> u16 {
        let slot = u16::try_from(self.temp_types.len())
            .ok()
            .and_then(|offset| self.slot_base.checked_add(offset));
        self.temp_types.push(ty);
        slot.unwrap_or_else(|| {
            self.record_overflow("too many frame slots".to_string());
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Decimal;
    use ordered_float::OrderedFloat;

    #[test]
    fn small_integers_use_push_forms() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_constant(&ConstValue::Int(0));
        emitter.emit_constant(&ConstValue::Int(1));
        emitter.emit_constant(&ConstValue::Long(-1));
        emitter.emit_constant(&ConstValue::Bool(true));
        emitter.emit_constant(&ConstValue::Null);
        let chunk = emitter.finish().unwrap();
        chunk.assert_opcodes(&[
            OpCode::PushZero,
            OpCode::PushOne,
            OpCode::PushMinusOne,
            OpCode::PushTrue,
            OpCode::PushNull,
        ]);
        assert!(pool.is_empty());
    }

    #[test]
    fn unsigned_constants_keep_their_bit_pattern() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_constant(&ConstValue::UInt(u32::MAX));
        emitter.emit_constant(&ConstValue::ULong(u64::MAX));
        emitter.finish().unwrap();
        assert_eq!(pool.get(0), Some(&PoolEntry::Int32(-1)));
        assert_eq!(pool.get(1), Some(&PoolEntry::Int64(-1)));
    }

    #[test]
    fn pool_entries_are_deduplicated() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_constant(&ConstValue::Double(OrderedFloat(2.5)));
        emitter.emit_constant(&ConstValue::Double(OrderedFloat(2.5)));
        emitter.emit_constant(&ConstValue::String("hi".into()));
        emitter.emit_constant(&ConstValue::Decimal(Decimal::new(15, 1).unwrap()));
        emitter.finish().unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(2), Some(&PoolEntry::Decimal { mantissa: 15, scale: 1 }));
    }

    #[test]
    fn call_operands() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_call(OpCode::Call, TypeHash::from_name("f"), 2);
        let chunk = emitter.finish().unwrap();
        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk.read_u16(1), Some(0));
        assert_eq!(chunk.read_byte(3), Some(2));
    }

    #[test]
    fn branches_are_patched_on_finish() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        let skip = emitter.define_label();
        emitter.emit(OpCode::PushTrue);
        emitter.emit_branch(OpCode::BrTrue, skip);
        emitter.emit_constant(&ConstValue::Int(5));
        emitter.emit(OpCode::Pop);
        emitter.mark_label(skip);
        let chunk = emitter.finish().unwrap();
        // PushTrue(1) BrTrue(5) Constant(2) Pop(1): the operand ends at 6.
        assert_eq!(chunk.read_i32(2), Some(3));
    }

    #[test]
    fn temporaries_are_numbered_above_the_base() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool).with_slot_base(3);
        assert_eq!(emitter.declare_local(DataType::INT32), 3);
        assert_eq!(emitter.declare_local(DataType::STRING), 4);
        assert_eq!(emitter.temp_types(), &[DataType::INT32, DataType::STRING]);
    }

    fn crowded_pool() -> ConstantPool {
        let mut pool = ConstantPool::new();
        for value in 0..=i32::from(u16::MAX) {
            pool.add(PoolEntry::Int32(value + 2));
        }
        pool
    }

    #[test]
    fn wide_constant_indices_use_constant_wide() {
        let mut pool = ConstantPool::new();
        for value in 0..300 {
            pool.add(PoolEntry::Int32(value + 2));
        }
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_constant(&ConstValue::Int(100));
        emitter.emit_constant(&ConstValue::Int(1_000));
        let chunk = emitter.finish().unwrap();
        chunk.assert_opcodes(&[OpCode::Constant, OpCode::ConstantWide]);
        assert_eq!(chunk.read_u16(3), Some(300));
    }

    #[test]
    fn pool_index_past_u16_fails_finish() {
        let mut pool = crowded_pool();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_type(OpCode::Box, DataType::INT32);
        let err = emitter.finish().unwrap_err();
        assert!(matches!(err, CompilationError::Internal { .. }));
        assert!(err.to_string().contains("constant pool index 65536"));
    }

    #[test]
    fn pool_overflow_is_reported_for_constants_and_members() {
        let mut pool = crowded_pool();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_constant(&ConstValue::String("late".into()));
        assert!(emitter.finish().is_err());

        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_member(OpCode::LdFld, TypeHash::from_name("Point::X"));
        assert!(emitter.finish().is_err());
    }

    #[test]
    fn slot_numbers_past_u16_fail_finish() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool).with_slot_base(u16::MAX);
        assert_eq!(emitter.declare_local(DataType::INT32), u16::MAX);
        emitter.declare_local(DataType::INT32);
        assert!(emitter.finish().is_err());
    }
}
