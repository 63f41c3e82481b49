use std::ops::Index;

/// How a `Write` hands bytes to the output, fixed when the program is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputPolicy {
    /// Every byte is written through as soon as it is produced.
    Unbuffered,
    /// Bytes are held back until a newline or the end of the run.
    #[default]
    LineBuffered,
}

/// A single executable unit. Counts are always positive and jump targets are
/// absolute indices into the owning [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BfInstruction {
    IncCell(usize),
    DecCell(usize),
    IncPtr(usize),
    DecPtr(usize),
    Read,
    Write(OutputPolicy),
    /// Jumps to `target` (one past the matching close) when the head cell is zero.
    LoopOpen(usize),
    /// Jumps to `target` (one past the matching open) when the head cell is nonzero.
    LoopClose(usize),
    Halt,
}

/// Compiled instruction sequence, terminated by exactly one [`BfInstruction::Halt`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program {
    instructions: Box<[BfInstruction]>,
}

impl Program {
    pub(crate) fn new(instructions: Vec<BfInstruction>) -> Self {
        debug_assert_eq!(instructions.last(), Some(&BfInstruction::Halt));
        Self {
            instructions: instructions.into_boxed_slice(),
        }
    }

    pub fn instructions(&self) -> &[BfInstruction] {
        &self.instructions
    }

    /// Number of instructions, including the trailing `Halt`.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when nothing but the trailing `Halt` was compiled, e.g. for comment-only sources.
    pub fn is_empty(&self) -> bool {
        self.instructions.len() <= 1
    }
}

impl Index<usize> for Program {
    type Output = BfInstruction;

    fn index(&self, index: usize) -> &Self::Output {
        &self.instructions[index]
    }
}
