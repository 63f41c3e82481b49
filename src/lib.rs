//! Threaded-code virtual machine for the eight-command tape language.
//!
//! Source text is turned into a [`Program`] by [`compile`] once, with runs of
//! arithmetic and pointer commands folded together and every loop jump
//! resolved to an absolute index. [`run`] (or a [`Machine`] for finer
//! control) then walks that program without any lookups at run time.
//!
//! Cells are 8 bits wide and wrap on overflow. The head may not leave the
//! tape; doing so ends the run with [`RuntimeError::OutOfBounds`].

pub mod calc;
mod compiler;
mod engine;
mod instruction;
mod output;
mod tape;

pub use compiler::{CompileError, CompileOptions, compile};
pub use engine::{Machine, RuntimeError, Step, run};
pub use instruction::{BfInstruction, OutputPolicy, Program};
pub use output::OutputSink;
pub use tape::{TAPE_CAPACITY, Tape};
