//! Temporary frame slots.
//!
//! Temporaries hold intermediate values while one statement is emitted:
//! spilled indexer arguments, copies left by assignments used as values, the
//! old value of a postfix `++`. Slots are declared through the sink on first
//! use and recycled by type afterwards. Release is strictly nested.

use rustc_hash::FxHashMap;
use sable_core::{CompilationError, DataType};

use super::CodeSink;

/// Handle to an acquired temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temp {
    pub slot: u16,
    pub ty: DataType,
}

#[derive(Debug, Default)]
pub struct TempPool {
    /// Released slots by type, ready for reuse.
    free: FxHashMap<DataType, Vec<u16>>,
    /// Acquired temporaries, innermost last.
    live: Vec<Temp>,
    declared: usize,
}

impl TempPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A temporary of type `ty`, reusing a released slot when one exists.
    pub fn acquire(&mut self, ty: DataType, sink: &mut dyn CodeSink) -> Temp {
        let slot = match self.free.get_mut(&ty).and_then(Vec::pop) {
            Some(slot) => slot,
            None => {
                let slot = sink.declare_local(ty);
                self.declared += 1;
                tracing::debug!(slot, ?ty, declared = self.declared, "temp pool grew");
                slot
            }
        };
        let temp = Temp { slot, ty };
        self.live.push(temp);
        temp
    }

    /// Return `temp` to the pool. It must be the most recently acquired live
    /// temporary.
    pub fn release(&mut self, temp: Temp) -> Result<(), CompilationError> {
        match self.live.last() {
            Some(&top) if top == temp => {
                self.live.pop();
                self.free.entry(temp.ty).or_default().push(temp.slot);
                Ok(())
            }
            _ => Err(CompilationError::internal(format!(
                "temporary slot {} released out of order",
                temp.slot
            ))),
        }
    }

    /// Temporaries currently acquired.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Slots declared through the sink so far.
    pub fn declared_count(&self) -> usize {
        self.declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ConstantPool;
    use crate::emit::BytecodeEmitter;

    #[test]
    fn released_slots_are_reused_by_type() {
        let mut pool = ConstantPool::new();
        let mut sink = BytecodeEmitter::new(&mut pool);
        let mut temps = TempPool::new();

        let a = temps.acquire(DataType::INT32, &mut sink);
        temps.release(a).unwrap();
        let b = temps.acquire(DataType::INT32, &mut sink);
        assert_eq!(a.slot, b.slot);
        let c = temps.acquire(DataType::STRING, &mut sink);
        assert_ne!(b.slot, c.slot);
        assert_eq!(temps.declared_count(), 2);
    }

    #[test]
    fn release_must_be_nested() {
        let mut pool = ConstantPool::new();
        let mut sink = BytecodeEmitter::new(&mut pool);
        let mut temps = TempPool::new();

        let outer = temps.acquire(DataType::INT32, &mut sink);
        let inner = temps.acquire(DataType::INT32, &mut sink);
        assert_eq!(temps.release(outer).unwrap_err().code(), 0);
        temps.release(inner).unwrap();
        temps.release(outer).unwrap();
        assert_eq!(temps.live_count(), 0);
    }
}
