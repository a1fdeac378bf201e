//! Diagnostic reporting infrastructure.
//!
//! A [`Handler`] collects [`Diagnostic`] values as the pipeline runs and
//! prints them to `stderr`, gated by a minimum [`Level`] set from the
//! command line. The driver keeps exactly one `Handler` per invocation and
//! threads it explicitly through the pipeline (see `nanoc-drv`) rather than
//! reaching for global mutable state.
//!
//! # Examples
//!
//! ```
//! use nanoc_util::diagnostic::{Handler, Level};
//!
//! let mut handler = Handler::new(Level::Warn);
//! handler.warn("'x' is never read");
//! handler.error("undeclared identifier 'y'");
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.diagnostics().len(), 2);
//! ```

mod level;

pub use level::Level;

/// A single logged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Collects and prints diagnostics for a single compiler invocation.
///
/// `min_level` is the CLI's `-l/--logLevel` threshold: only diagnostics at
/// or below this level (inclusive) in the verbosity scale are printed, but
/// *every* diagnostic is still recorded in [`Handler::diagnostics`] so that
/// [`Handler::has_errors`] is unaffected by the print threshold.
pub struct Handler {
    min_level: Level,
    diagnostics: Vec<Diagnostic>,
}

impl Handler {
    pub fn new(min_level: Level) -> Self {
        Self {
            min_level,
            diagnostics: Vec::new(),
        }
    }

    fn emit(&mut self, level: Level, message: impl Into<String>) {
        let diag = Diagnostic::new(level, message.into());
        if diag.level != Level::None && diag.level <= self.min_level {
            eprintln!("{}: {}", diag.level, diag.message);
        }
        self.diagnostics.push(diag);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.emit(Level::Error, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.emit(Level::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.emit(Level::Info, message);
    }

    /// Prints directly to stdout in addition to logging at [`Level::Info`],
    /// mirroring the driver's "announce each pipeline stage" behavior.
    pub fn info_and_print(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.emit(Level::Info, message.clone());
        println!("{message}");
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level.is_error())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_diagnostic_regardless_of_print_threshold() {
        let mut handler = Handler::new(Level::None);
        handler.error("boom");
        handler.warn("careful");
        assert_eq!(handler.diagnostics().len(), 2);
        assert!(handler.has_errors());
    }

    #[test]
    fn has_errors_is_false_without_an_error_level_diagnostic() {
        let mut handler = Handler::new(Level::InfoLowLevel);
        handler.warn("careful");
        handler.info("fyi");
        assert!(!handler.has_errors());
    }
}
