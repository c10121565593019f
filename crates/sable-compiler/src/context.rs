//! Resolution context.
//!
//! One [`ResolveContext`] is built per compilation unit and threaded through
//! every resolve call. It owns nothing global: the type system, overload
//! resolver and diagnostic sink are borrowed, and frequently used method
//! handles are looked up once into [`WellKnown`].

use bitflags::bitflags;
use sable_core::{
    CompilationError, DataType, DiagnosticSink, MemberLookup, ParamModifier, Severity, TypeHash,
    TypeSystem, Warning, primitives,
};

use crate::locals::LocalTable;
use crate::options::CompilerOptions;
use crate::overload::OverloadResolver;

type Result<T> = std::result::Result<T, CompilationError>;

bitflags! {
    /// Context-dependent resolution modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResolveFlags: u16 {
        /// Inside `checked { }` (or checked by default).
        const CHECKED = 1 << 0;
        /// Pointer operations are permitted.
        const UNSAFE = 1 << 1;
        /// A static member body: no `this`.
        const STATIC = 1 << 2;
        /// A field initializer or other place `this` cannot be used.
        const NO_THIS = 1 << 3;
        /// A struct constructor whose fields are not all assigned yet.
        const UNASSIGNED_FIELDS = 1 << 4;
        /// Resolving the target of `+=`/`-=`, where events are legal.
        const EVENT_ASSIGNMENT = 1 << 5;
    }
}

/// Method handles looked up once per compilation.
#[derive(Debug, Clone, Default)]
pub struct WellKnown {
    /// `string.Concat(string, ...)` by argument count.
    pub concat_strings: Vec<(usize, TypeHash)>,
    /// `string.Concat(object, ...)` by argument count.
    pub concat_objects: Vec<(usize, TypeHash)>,
    /// `string.Concat(params string[])`.
    pub concat_string_array: Option<TypeHash>,
    /// `string.Concat(params object[])`.
    pub concat_object_array: Option<TypeHash>,
    pub string_equality: Option<TypeHash>,
    pub string_inequality: Option<TypeHash>,
    pub delegate_combine: Option<TypeHash>,
    pub delegate_remove: Option<TypeHash>,
    pub create_instance: Option<TypeHash>,
    /// The class `typeof` yields.
    pub system_type: Option<TypeHash>,
}

impl WellKnown {
    pub fn new(types: &dyn TypeSystem) -> Self {
        let mut known = Self::default();

        if let Some(MemberLookup::Methods(concat)) = types.lookup_member(primitives::STRING, "Concat") {
            for hash in concat {
                let Some(method) = types.method(hash) else {
                    continue;
                };
                let params = &method.params;
                let all = |ty: DataType| params.iter().all(|p| p.ty == ty);
                match params.as_slice() {
                    [p] if p.modifier == ParamModifier::Params => {
                        if p.ty.element_type() == Some(DataType::STRING) {
                            known.concat_string_array = Some(hash);
                        } else {
                            known.concat_object_array = Some(hash);
                        }
                    }
                    _ if all(DataType::STRING) => known.concat_strings.push((params.len(), hash)),
                    _ if all(DataType::OBJECT) => known.concat_objects.push((params.len(), hash)),
                    _ => {}
                }
            }
        }

        let first = |owner: TypeHash, name: &str| types.operators(owner, name).first().copied();
        known.string_equality = first(primitives::STRING, "op_Equality");
        known.string_inequality = first(primitives::STRING, "op_Inequality");

        let single = |owner: TypeHash, name: &str| match types.lookup_member(owner, name) {
            Some(MemberLookup::Methods(methods)) => methods.first().copied(),
            _ => None,
        };
        known.delegate_combine = single(primitives::DELEGATE, "Combine");
        known.delegate_remove = single(primitives::DELEGATE, "Remove");
        known.create_instance = single(TypeHash::from_name("Activator"), "CreateInstance");
        known.system_type = types.find_type("Type");
        known
    }

    /// `string.Concat` taking exactly `count` strings (or objects).
    pub fn concat(&self, count: usize, objects: bool) -> Option<TypeHash> {
        let list = if objects {
            &self.concat_objects
        } else {
            &self.concat_strings
        };
        list.iter().find(|(n, _)| *n == count).map(|(_, h)| *h)
    }

    /// The operator method `name` of `decimal` taking `arity` decimals.
    pub fn decimal_operator(&self, types: &dyn TypeSystem, name: &str) -> Option<TypeHash> {
        types.operators(primitives::DECIMAL, name).first().copied()
    }
}

/// State threaded through resolution.
pub struct ResolveContext<'a> {
    pub types: &'a dyn TypeSystem,
    pub overloads: &'a dyn OverloadResolver,
    diagnostics: &'a mut dyn DiagnosticSink,
    pub locals: &'a mut LocalTable,
    pub options: CompilerOptions,
    pub well_known: WellKnown,
    flags: ResolveFlags,
    /// The type whose member body is being compiled.
    enclosing_type: Option<TypeHash>,
    /// Objects under construction by nested initializers, innermost last.
    initializer_targets: Vec<DataType>,
    errors: usize,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        types: &'a dyn TypeSystem,
        overloads: &'a dyn OverloadResolver,
        diagnostics: &'a mut dyn DiagnosticSink,
        locals: &'a mut LocalTable,
        options: CompilerOptions,
    ) -> Self {
        Self {
            types,
            overloads,
            diagnostics,
            locals,
            options,
            well_known: WellKnown::new(types),
            flags: options.initial_flags(),
            enclosing_type: None,
            initializer_targets: Vec::new(),
            errors: 0,
        }
    }

    /// Compile inside a member of `owner`.
    pub fn with_enclosing_type(mut self, owner: TypeHash) -> Self {
        self.enclosing_type = Some(owner);
        self
    }

    pub fn enclosing_type(&self) -> Option<TypeHash> {
        self.enclosing_type
    }

    pub fn flags(&self) -> ResolveFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ResolveFlags, enabled: bool) {
        self.flags.set(flags, enabled);
    }

    pub fn is_checked(&self) -> bool {
        self.flags.contains(ResolveFlags::CHECKED)
    }

    pub fn is_unsafe(&self) -> bool {
        self.flags.contains(ResolveFlags::UNSAFE)
    }

    /// Run `f` with `flags` switched on or off, restoring them afterwards.
    pub fn with_flags<T>(&mut self, flags: ResolveFlags, enabled: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.flags;
        self.flags.set(flags, enabled);
        let result = f(self);
        self.flags = saved;
        result
    }

    // ==========================================================================
    // Initializer targets
    // ==========================================================================

    pub fn push_initializer_target(&mut self, ty: DataType) {
        self.initializer_targets.push(ty);
    }

    pub fn pop_initializer_target(&mut self) {
        self.initializer_targets.pop();
    }

    pub fn initializer_target(&self) -> Option<DataType> {
        self.initializer_targets.last().copied()
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    /// Report an error to the sink.
    pub fn report(&mut self, err: &CompilationError) {
        self.errors += 1;
        self.diagnostics.error(err);
    }

    /// Report a warning subject to the warning level and promotion options.
    pub fn warn(&mut self, warning: Warning) {
        if warning.level() > self.options.warning_level {
            return;
        }
        if self.options.warnings_as_errors {
            self.errors += 1;
            let text = warning.to_string();
            let prefix = format!("at {}: ", warning.span());
            let message = text.strip_prefix(&prefix).unwrap_or(&text);
            self.diagnostics
                .report(warning.code(), Severity::Error, warning.span(), message);
        } else {
            self.diagnostics.warning(&warning);
        }
    }

    /// Errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Combine two independent results. When both failed the second error is
    /// reported and the first propagated.
    pub fn join<A, B>(&mut self, a: Result<A>, b: Result<B>) -> Result<(A, B)> {
        match (a, b) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Err(first), Err(second)) => {
                self.report(&second);
                Err(first)
            }
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    }

    /// Combine independent results, reporting every error after the first.
    pub fn join_all<T>(&mut self, results: Vec<Result<T>>) -> Result<Vec<T>> {
        let mut first = None;
        let mut values = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(err) if first.is_none() => first = Some(err),
                Err(err) => self.report(&err),
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }
}
