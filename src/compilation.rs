//! One compilation run: resolve expressions, then emit them.

use sable_compiler::bytecode::{BytecodeChunk, ConstantPool};
use sable_compiler::emit::{BytecodeEmitter, EmitContext};
use sable_compiler::expr::Expr;
use sable_compiler::{BestMatchResolver, CompilerOptions, LocalId, LocalTable, OverloadResolver, ResolveContext};
use sable_core::{CompilationError, DataType, DiagnosticSink, Diagnostics, TypeHash, TypeSystem};

use crate::error::{SableError, SableResult};

/// Drives resolution and emission for the expressions of one body.
///
/// Every error is collected in [`Compilation::diagnostics`]. Once any error
/// has been reported, emission refuses to produce code.
///
/// ```
/// use sable::Compilation;
/// use sable::compiler::expr::Expr;
/// use sable::compiler::operators::BinaryOp;
/// use sable::core::Span;
/// use sable::registry::TypeRegistry;
///
/// let types = TypeRegistry::with_builtins();
/// let mut compilation = Compilation::new(&types);
/// let span = Span::new(1, 1, 5);
/// let sum = Expr::binary(BinaryOp::Addition, Expr::int(1, span), Expr::int(2, span), span);
/// let chunk = compilation.compile_value(sum).unwrap();
/// assert_eq!(chunk.opcodes().len(), 1);
/// ```
pub struct Compilation<'a> {
    types: &'a dyn TypeSystem,
    resolver: &'a dyn OverloadResolver,
    options: CompilerOptions,
    enclosing: Option<TypeHash>,
    locals: LocalTable,
    diagnostics: Diagnostics,
    constants: ConstantPool,
}

impl<'a> Compilation<'a> {
    pub fn new(types: &'a dyn TypeSystem) -> Self {
        Self {
            types,
            resolver: &BestMatchResolver,
            options: CompilerOptions::default(),
            enclosing: None,
            locals: LocalTable::new(),
            diagnostics: Diagnostics::new(),
            constants: ConstantPool::new(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resolver(mut self, resolver: &'a dyn OverloadResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Compile as the body of a member of `owner`.
    pub fn with_enclosing_type(mut self, owner: TypeHash) -> Self {
        self.enclosing = Some(owner);
        self
    }

    pub fn declare_local(&mut self, name: &str, ty: DataType, assigned: bool) -> LocalId {
        self.locals.declare(name, ty, assigned)
    }

    pub fn locals(&self) -> &LocalTable {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut LocalTable {
        &mut self.locals
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    fn failed(&self) -> SableError {
        SableError::Failed {
            errors: self.diagnostics.error_count(),
        }
    }

    /// Resolve `expr` to a value. The propagated error, if any, is reported
    /// along with those already reported during resolution.
    pub fn resolve(&mut self, expr: Expr) -> SableResult<Expr> {
        self.resolve_with(expr, Expr::resolve_value)
    }

    /// Resolve `expr` as a `bool` test.
    pub fn resolve_condition(&mut self, expr: Expr) -> SableResult<Expr> {
        self.resolve_with(expr, Expr::resolve_condition)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn resolve_with(
        &mut self,
        expr: Expr,
        resolve: impl FnOnce(Expr, &mut ResolveContext<'_>) -> Result<Expr, CompilationError>,
    ) -> SableResult<Expr> {
        let result = {
            let mut rc = ResolveContext::new(
                self.types,
                self.resolver,
                &mut self.diagnostics,
                &mut self.locals,
                self.options,
            );
            if let Some(owner) = self.enclosing {
                rc = rc.with_enclosing_type(owner);
            }
            let result = resolve(expr, &mut rc);
            if let Err(err) = &result {
                rc.report(err);
            }
            result
        };
        result.map_err(|_| self.failed())
    }

    /// Emit a resolved expression leaving its value on the stack.
    pub fn emit_value(&mut self, expr: &Expr) -> SableResult<BytecodeChunk> {
        self.emit_with(|ec| {
            expr.emit(ec)?;
            ec.end_statement()
        })
    }

    /// Emit resolved expressions as statements, discarding their values.
    pub fn emit_statements(&mut self, statements: &[Expr]) -> SableResult<BytecodeChunk> {
        self.emit_with(|ec| {
            for statement in statements {
                statement.emit_statement(ec)?;
                ec.end_statement()?;
            }
            Ok(())
        })
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn emit_with(
        &mut self,
        body: impl FnOnce(&mut EmitContext<'_>) -> Result<(), CompilationError>,
    ) -> SableResult<BytecodeChunk> {
        if self.diagnostics.has_errors() {
            tracing::debug!(errors = self.diagnostics.error_count(), "emission skipped");
            return Err(self.failed());
        }
        let mut sink = BytecodeEmitter::new(&mut self.constants).with_slot_base(self.locals.slot_count());
        let outcome = {
            let mut ec = EmitContext::new(&mut sink, self.types);
            body(&mut ec)
        };
        if let Err(err) = outcome {
            self.diagnostics.error(&err);
            return Err(err.into());
        }
        let temps = sink.temp_types().len();
        let chunk = sink.finish()?;
        tracing::debug!(bytes = chunk.len(), temps, "emitted chunk");
        Ok(chunk)
    }

    /// Resolve then emit as a value.
    pub fn compile_value(&mut self, expr: Expr) -> SableResult<BytecodeChunk> {
        let resolved = self.resolve(expr)?;
        self.emit_value(&resolved)
    }

    /// Resolve `condition` and emit a jump past the end of the chunk taken
    /// when it evaluates to `on_true`.
    pub fn compile_branch(&mut self, condition: Expr, on_true: bool) -> SableResult<BytecodeChunk> {
        let resolved = self.resolve_condition(condition)?;
        self.emit_with(|ec| {
            let done = ec.sink.define_label();
            resolved.emit_branch(ec, on_true, done)?;
            ec.sink.mark_label(done);
            ec.end_statement()
        })
    }

    /// Resolve then emit as a statement.
    pub fn compile_statement(&mut self, expr: Expr) -> SableResult<BytecodeChunk> {
        let resolved = self.resolve(expr)?;
        self.emit_statements(std::slice::from_ref(&resolved))
    }
}
