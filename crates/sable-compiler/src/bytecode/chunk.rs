//! Bytecode chunk for compiled expression bodies.
//!
//! A `BytecodeChunk` contains the emitted bytecode along with line number
//! information for debugging.

use super::OpCode;

/// A chunk of compiled bytecode.
///
/// Operands that are not small integers (constants, member hashes, types)
/// live in a shared `ConstantPool` and are referenced by index.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    /// The bytecode instructions.
    code: Vec<u8>,
    /// Line numbers for debugging (parallel to code).
    lines: Vec<u32>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bytecode chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
            lines: Vec::with_capacity(capacity),
        }
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op.into());
        self.lines.push(line);
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Write a 32-bit signed operand (big-endian).
    pub fn write_i32(&mut self, value: i32, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Overwrite a previously written 32-bit operand.
    ///
    /// Returns false if the operand lies outside the chunk.
    pub fn patch_i32(&mut self, offset: usize, value: i32) -> bool {
        match self.code.get_mut(offset..offset + 4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_be_bytes());
                true
            }
            None => false,
        }
    }

    /// Get current code offset (for branch patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Get the bytecode.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Get the line numbers.
    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    /// Get the line number for a given offset.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read a byte at the given offset.
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read an i32 at the given offset (big-endian).
    pub fn read_i32(&self, offset: usize) -> Option<i32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an opcode at the given offset.
    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Decode the chunk into `(offset, opcode)` pairs.
    pub fn instructions(&self) -> Vec<(usize, OpCode)> {
        let mut instructions = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                instructions.push((offset, op));
                offset += 1 + op.operand_size();
            } else {
                // Invalid opcode, skip one byte
                offset += 1;
            }
        }

        instructions
    }

    /// Extract all opcodes from the chunk, skipping operands.
    ///
    /// This is useful for testing bytecode sequences without worrying about
    /// specific operand values or instruction offsets.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions().into_iter().map(|(_, op)| op).collect()
    }

    /// Number of occurrences of `op` in the chunk.
    pub fn count(&self, op: OpCode) -> usize {
        self.opcodes().iter().filter(|&&o| o == op).count()
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    ///
    /// This ignores operand values, only checking the opcodes themselves.
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check if this chunk contains the given opcodes (in order, but not necessarily contiguous).
    ///
    /// Useful for verifying key opcodes are present without checking every instruction.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_empty() {
        let chunk = BytecodeChunk::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }

    #[test]
    fn write_op() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(42, 1);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.read_op(0), Some(OpCode::Constant));
        assert_eq!(chunk.read_byte(1), Some(42));
        assert_eq!(chunk.line_at(1), Some(1));
    }

    #[test]
    fn write_u16() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_u16(0x1234, 5);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.read_u16(0), Some(0x1234));
        assert_eq!(chunk.line_at(0), Some(5));
    }

    #[test]
    fn patch_branch_operand() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Br, 1);
        chunk.write_i32(0, 1);
        chunk.write_op(OpCode::Pop, 1);

        assert!(chunk.patch_i32(1, -5));
        assert_eq!(chunk.read_i32(1), Some(-5));
        assert!(!chunk.patch_i32(4, 0));
    }

    #[test]
    fn read_out_of_bounds() {
        let chunk = BytecodeChunk::new();
        assert_eq!(chunk.read_byte(0), None);
        assert_eq!(chunk.read_u16(0), None);
        assert_eq!(chunk.read_i32(0), None);
    }

    #[test]
    fn opcodes_extraction() {
        let mut chunk = BytecodeChunk::new();

        // LdLoc (u16) + Constant (u8) + Add + StLoc (u16)
        chunk.write_op(OpCode::LdLoc, 1);
        chunk.write_u16(0, 1);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::StLoc, 1);
        chunk.write_u16(0, 1);

        let ops = chunk.opcodes();
        assert_eq!(ops, vec![OpCode::LdLoc, OpCode::Constant, OpCode::Add, OpCode::StLoc]);
        assert_eq!(chunk.count(OpCode::Add), 1);
    }

    #[test]
    fn opcodes_with_call_operands() {
        let mut chunk = BytecodeChunk::new();

        chunk.write_op(OpCode::Call, 1);
        chunk.write_u16(0x1234, 1);
        chunk.write_byte(2, 1);
        chunk.write_op(OpCode::Pop, 1);

        assert_eq!(chunk.opcodes(), vec![OpCode::Call, OpCode::Pop]);
        assert_eq!(chunk.instructions()[1].0, 4);
    }

    #[test]
    fn reference_element_operands_are_skipped() {
        let mut chunk = BytecodeChunk::new();
        let token = u16::from(OpCode::Constant as u8);

        chunk.write_op(OpCode::StElemRef, 1);
        chunk.write_u16(token, 1);
        chunk.write_op(OpCode::LdElemRef, 1);
        chunk.write_u16(token, 1);
        chunk.write_op(OpCode::Pop, 1);

        assert_eq!(chunk.opcodes(), vec![OpCode::StElemRef, OpCode::LdElemRef, OpCode::Pop]);
        assert_eq!(chunk.instructions()[2].0, 6);
    }

    #[test]
    #[should_panic(expected = "Bytecode mismatch")]
    fn assert_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushNull, 1);
        chunk.assert_opcodes(&[OpCode::LdLoc]);
    }

    #[test]
    fn assert_contains_opcodes_success() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::LdArg, 1);
        chunk.write_u16(0, 1);
        chunk.write_op(OpCode::PushOne, 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::StArg, 1);
        chunk.write_u16(0, 1);

        chunk.assert_contains_opcodes(&[OpCode::LdArg, OpCode::Add, OpCode::StArg]);
    }

    #[test]
    #[should_panic(expected = "Missing opcodes")]
    fn assert_contains_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushOne, 1);
        chunk.assert_contains_opcodes(&[OpCode::PushOne, OpCode::Sub]);
    }
}
