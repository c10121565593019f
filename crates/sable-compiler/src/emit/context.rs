//! Emission context.

use sable_core::{CompilationError, DataType, TypeHash, TypeSystem};

use super::{CodeSink, Temp, TempPool};

type Result<T> = std::result::Result<T, CompilationError>;

/// How a prepared assignment target re-reads its current value.
///
/// Compound assignment computes the storage location once, then reads and
/// writes through it. The variants say what is already on the stack (or in
/// temporaries) after preparation.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Local(u16),
    Arg(u16),
    StaticField(TypeHash),
    /// An address is on the stack, duplicated.
    Address(DataType),
    /// The instance is on the stack, duplicated.
    Field(TypeHash),
    /// A property read through `getter`. With an instance, the instance is
    /// on the stack, duplicated.
    Accessor {
        getter: TypeHash,
        has_instance: bool,
        virtual_call: bool,
    },
    /// An indexer: the instance and arguments live in temporaries, instance
    /// first.
    Spilled {
        temps: Vec<Temp>,
        getter: TypeHash,
        virtual_call: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedState {
    pub kind: Prepared,
    /// Keep the value read through the target (postfix `++` used as a value).
    pub keep_old: bool,
    /// Where the kept value went.
    pub old: Option<Temp>,
}

/// State threaded through emission.
pub struct EmitContext<'a> {
    pub sink: &'a mut dyn CodeSink,
    pub types: &'a dyn TypeSystem,
    temps: TempPool,
    prepared: Vec<PreparedState>,
    /// Temporaries holding objects under initialization, innermost last.
    initializer_targets: Vec<Temp>,
}

impl<'a> EmitContext<'a> {
    pub fn new(sink: &'a mut dyn CodeSink, types: &'a dyn TypeSystem) -> Self {
        Self {
            sink,
            types,
            temps: TempPool::new(),
            prepared: Vec::new(),
            initializer_targets: Vec::new(),
        }
    }

    // ==========================================================================
    // Temporaries
    // ==========================================================================

    pub fn acquire_temp(&mut self, ty: DataType) -> Temp {
        self.temps.acquire(ty, self.sink)
    }

    pub fn release_temp(&mut self, temp: Temp) -> Result<()> {
        self.temps.release(temp)
    }

    /// Run `f` with a temporary of type `ty`. The temporary is released on
    /// every exit path.
    pub fn with_temp<T>(&mut self, ty: DataType, f: impl FnOnce(&mut Self, Temp) -> Result<T>) -> Result<T> {
        let temp = self.acquire_temp(ty);
        let result = f(self, temp);
        let released = self.release_temp(temp);
        let value = result?;
        released?;
        Ok(value)
    }

    /// Store the value on top of the stack into `temp`.
    pub fn store_temp(&mut self, temp: Temp) {
        self.sink.emit_slot(crate::bytecode::OpCode::StLoc, temp.slot);
    }

    pub fn load_temp(&mut self, temp: Temp) {
        self.sink.emit_slot(crate::bytecode::OpCode::LdLoc, temp.slot);
    }

    pub fn load_temp_address(&mut self, temp: Temp) {
        self.sink.emit_slot(crate::bytecode::OpCode::LdLocA, temp.slot);
    }

    /// Statement boundary: no temporary may outlive a statement.
    pub fn end_statement(&mut self) -> Result<()> {
        let live = self.temps.live_count();
        if live != 0 || !self.prepared.is_empty() {
            return Err(CompilationError::internal(format!(
                "{live} temporaries live at a statement boundary"
            )));
        }
        Ok(())
    }

    pub fn temp_pool(&self) -> &TempPool {
        &self.temps
    }

    // ==========================================================================
    // Prepared assignment targets
    // ==========================================================================

    pub fn push_prepared(&mut self, kind: Prepared, keep_old: bool) {
        self.prepared.push(PreparedState {
            kind,
            keep_old,
            old: None,
        });
    }

    pub fn pop_prepared(&mut self) -> Result<PreparedState> {
        self.prepared
            .pop()
            .ok_or_else(|| CompilationError::internal("no prepared assignment target"))
    }

    pub fn current_prepared(&self) -> Result<&PreparedState> {
        self.prepared
            .last()
            .ok_or_else(|| CompilationError::internal("prepared value read outside an assignment"))
    }

    pub fn set_kept_old(&mut self, temp: Temp) -> Result<()> {
        let state = self
            .prepared
            .last_mut()
            .ok_or_else(|| CompilationError::internal("prepared value read outside an assignment"))?;
        state.old = Some(temp);
        Ok(())
    }

    // ==========================================================================
    // Initializer targets
    // ==========================================================================

    pub fn push_initializer_target(&mut self, temp: Temp) {
        self.initializer_targets.push(temp);
    }

    pub fn pop_initializer_target(&mut self) {
        self.initializer_targets.pop();
    }

    pub fn initializer_target(&self) -> Result<Temp> {
        self.initializer_targets
            .last()
            .copied()
            .ok_or_else(|| CompilationError::internal("initializer target used outside an initializer"))
    }
}
