//! Renders a target instruction list to text. Intentionally thin: no
//! object-file format, no linker — just the textual assembly form and a
//! convenience write-to-file for the driver.

pub mod serializer;

pub use serializer::{render_instruction, render_program, write_to_file};
