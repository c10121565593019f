//! Compiler options.

use crate::context::ResolveFlags;

/// Settings for one compilation run.
///
/// ```
/// use sable_compiler::CompilerOptions;
///
/// let options = CompilerOptions::default().checked(true).warning_level(2);
/// assert!(options.checked);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Arithmetic and conversions check for overflow outside explicit
    /// `checked`/`unchecked` regions.
    pub checked: bool,
    /// Pointer operations are permitted.
    pub allow_unsafe: bool,
    /// Warnings whose level is above this are not reported.
    pub warning_level: u8,
    /// Report warnings as errors.
    pub warnings_as_errors: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            checked: false,
            allow_unsafe: false,
            warning_level: 4,
            warnings_as_errors: false,
        }
    }
}

impl CompilerOptions {
    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn allow_unsafe(mut self, allow: bool) -> Self {
        self.allow_unsafe = allow;
        self
    }

    pub fn warning_level(mut self, level: u8) -> Self {
        self.warning_level = level;
        self
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Flags a resolution starts with.
    pub fn initial_flags(&self) -> ResolveFlags {
        let mut flags = ResolveFlags::empty();
        flags.set(ResolveFlags::CHECKED, self.checked);
        flags.set(ResolveFlags::UNSAFE, self.allow_unsafe);
        flags
    }
}
