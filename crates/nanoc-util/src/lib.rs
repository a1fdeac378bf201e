//! Shared foundation for every pipeline crate: interned identifiers, typed
//! index vectors, diagnostics, and the per-stage error types.
//!
//! Nothing in this crate knows about the source language, the target
//! machine, or any particular pipeline stage — it is pure infrastructure
//! that `nanoc-lex` through `nanoc-drv` build on top of.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod symbol;

pub use index_vec::{Idx, IndexVec};
pub use symbol::{Interner, Symbol};

pub use rustc_hash::FxHashMap;
