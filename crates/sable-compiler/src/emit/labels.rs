//! Label bookkeeping for branch fixups.
//!
//! Branches are written with a placeholder operand. Once every label is
//! marked, each operand is patched with the distance from the end of the
//! operand to the label.

use sable_core::CompilationError;

use super::Label;
use crate::bytecode::BytecodeChunk;

#[derive(Debug, Default)]
pub struct LabelTable {
    /// Marked position of each label.
    targets: Vec<Option<usize>>,
    /// Operand offset of each branch and the label it jumps to.
    fixups: Vec<(usize, Label)>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self) -> Label {
        self.targets.push(None);
        Label(self.targets.len() as u32 - 1)
    }

    pub fn mark(&mut self, label: Label, offset: usize) {
        if let Some(slot) = self.targets.get_mut(label.0 as usize) {
            *slot = Some(offset);
        }
    }

    /// Record a branch whose 4-byte operand starts at `operand`.
    pub fn add_fixup(&mut self, operand: usize, label: Label) {
        self.fixups.push((operand, label));
    }

    pub fn is_marked(&self, label: Label) -> bool {
        self.targets
            .get(label.0 as usize)
            .is_some_and(Option::is_some)
    }

    /// Patch every recorded branch.
    ///
    /// Fails if a branch refers to a label that was never marked.
    pub fn resolve(&self, chunk: &mut BytecodeChunk) -> Result<(), CompilationError> {
        for &(operand, label) in &self.fixups {
            let target = self
                .targets
                .get(label.0 as usize)
                .copied()
                .flatten()
                .ok_or_else(|| CompilationError::internal(format!("label {} was never marked", label.0)))?;
            let distance = target as i64 - (operand as i64 + 4);
            let distance = i32::try_from(distance)
                .map_err(|_| CompilationError::internal("branch distance out of range"))?;
            if !chunk.patch_i32(operand, distance) {
                return Err(CompilationError::internal("branch operand outside the chunk"));
            }
        }
        Ok(())
    }
}
