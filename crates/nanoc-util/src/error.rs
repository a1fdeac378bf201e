//! Per-stage error types shared across the pipeline crates.
//!
//! Each compiler stage gets its own error enum so call sites can match on the
//! specific failure instead of a single catch-all. `nanoc-drv` wraps all of
//! them behind [`PipelineError`] so the driver has one `Result` type to match
//! on.

use thiserror::Error;

/// Error type for lexical analysis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// No classification (keyword, operator, literal, identifier) matched
    /// at this position.
    #[error("line {line}, column {column}: no valid token starts at '{text}'")]
    InvalidLexeme {
        line: usize,
        column: usize,
        text: String,
    },

    /// Two adjacent alphanumeric-or-underscore lexemes were not separated by
    /// whitespace.
    #[error("line {line}, column {column}: '{lhs}' and '{rhs}' must be separated by whitespace")]
    MissingBoundary {
        line: usize,
        column: usize,
        lhs: String,
        rhs: String,
    },
}

pub type LexResult<T> = std::result::Result<T, LexError>;

/// Error type for AST construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The grammar has no rule set registered for this non-terminal.
    #[error("no grammar registered for non-terminal {0}")]
    UnknownNonTerminal(String),

    /// Every alternative of a non-terminal's rule set failed to match.
    #[error("no alternative of {nt} matched at token index {index}")]
    NoAlternativeMatched { nt: String, index: usize },

    /// A top-level parse succeeded but did not consume every token.
    #[error("{leftover} token(s) left over after parsing {nt}")]
    LeftoverTokens { nt: String, leftover: usize },

    /// A rule's collapsed element set contained more than one node-label
    /// terminal.
    #[error("rule for {nt} produced more than one node-label terminal")]
    DuplicateNodeLabel { nt: String },

    /// The token stream ended while a rule still expected more symbols.
    #[error("unexpected end of input while parsing {nt}")]
    UnexpectedEof { nt: String },
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Error type for symbol-table construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemaError {
    /// An identifier was read before any enclosing scope declared it.
    #[error("'{name}' is read before it is declared")]
    UndeclaredRead { name: String },

    /// An identifier was assigned to before any enclosing scope declared it.
    #[error("'{name}' is assigned to before it is declared")]
    UndeclaredWrite { name: String },

    /// An identifier was declared twice in the same table.
    #[error("'{name}' is already declared in this scope")]
    DuplicateDeclaration { name: String },
}

pub type SemaResult<T> = std::result::Result<T, SemaError>;

/// Error type for TAC generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    /// A lowering routine was called with an absent operand.
    #[error("operand is missing where a value was required")]
    MissingOperand,

    /// A divide or modulo lowering saw a literal zero divisor.
    #[error("division or modulo by the literal 0")]
    DivisionByZero,

    /// A control-flow AST node did not have the expected shape.
    #[error("malformed '{construct}' node: {detail}")]
    MalformedControlFlow { construct: String, detail: String },
}

pub type IrResult<T> = std::result::Result<T, IrError>;

/// Error type for register allocation and target code emission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The register pool was empty and the spill policy had no candidate to
    /// evict.
    #[error("register pool exhausted and no variable was eligible for spilling")]
    AllocationFailed,

    /// A variable was referenced while inactive but has no recorded memory
    /// address to load from.
    #[error("'{name}' has no known memory address but was referenced while inactive")]
    MissingMemoryAddress { name: String },

    /// Any other invariant violation in the allocator.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type AsmResult<T> = std::result::Result<T, AsmError>;

/// Aggregate error returned by the driver, unifying every stage's failure
/// behind one `Result`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Sema(#[from] SemaError),

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Asm(#[from] AsmError),

    #[error("no input file argument provided")]
    MissingInput,

    #[error("argument '{flag}' requires a value")]
    MissingArgumentValue { flag: String },

    #[error("log level argument '{0}' not recognised")]
    UnknownLogLevel(String),

    #[error("unrecognized argument '{0}'")]
    UnknownFlag(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let e = LexError::InvalidLexeme {
            line: 1,
            column: 4,
            text: "@".into(),
        };
        assert_eq!(e.to_string(), "line 1, column 4: no valid token starts at '@'");
    }

    #[test]
    fn pipeline_error_wraps_stage_errors() {
        let e: PipelineError = SemaError::DuplicateDeclaration { name: "x".into() }.into();
        assert!(e.to_string().contains("already declared"));
    }
}
