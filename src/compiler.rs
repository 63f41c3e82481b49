use thiserror::Error;

use crate::instruction::{BfInstruction, OutputPolicy, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    pub buffer_output: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            buffer_output: true,
        }
    }
}

impl CompileOptions {
    pub fn output_policy(&self) -> OutputPolicy {
        if self.buffer_output {
            OutputPolicy::LineBuffered
        } else {
            OutputPolicy::Unbuffered
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("syntax error: program is empty")]
    EmptyProgram,
    #[error("syntax error: loop `{bracket}` at offset {position} unmatched")]
    UnmatchedBracket { bracket: char, position: usize },
}

/// Compiles source text in one left-to-right pass.
///
/// Runs of `+`, `-`, `>` and `<` are folded into a single counted instruction,
/// loop brackets get their jump targets resolved, and every other byte is
/// treated as a comment. The result always ends with a `Halt`.
pub fn compile(source: &str, options: CompileOptions) -> Result<Program, CompileError> {
    if source.is_empty() {
        return Err(CompileError::EmptyProgram);
    }
    let write = BfInstruction::Write(options.output_policy());
    let bytes = source.as_bytes();
    let mut instructions = vec![];
    // (index of the open instruction, source offset of its `[`)
    let mut loop_stack: Vec<(usize, usize)> = vec![];
    let mut cursor = 0;
    while let Some(&code) = bytes.get(cursor) {
        match code {
            b'+' | b'-' | b'>' | b'<' => {
                let run = bytes[cursor..].iter().take_while(|&&b| b == code).count();
                instructions.push(match code {
                    b'+' => BfInstruction::IncCell(run),
                    b'-' => BfInstruction::DecCell(run),
                    b'>' => BfInstruction::IncPtr(run),
                    _ => BfInstruction::DecPtr(run),
                });
                cursor += run;
                continue;
            }
            b',' => instructions.push(BfInstruction::Read),
            b'.' => instructions.push(write),
            b'[' => {
                loop_stack.push((instructions.len(), cursor));
                // patched once the matching `]` shows up
                instructions.push(BfInstruction::LoopOpen(0));
            }
            b']' => {
                let Some((beginning, _)) = loop_stack.pop() else {
                    return Err(CompileError::UnmatchedBracket {
                        bracket: ']',
                        position: cursor,
                    });
                };
                let ending = instructions.len();
                instructions[beginning] = BfInstruction::LoopOpen(ending + 1);
                instructions.push(BfInstruction::LoopClose(beginning + 1));
            }
            _ => {}
        }
        cursor += 1;
    }
    if let Some(&(_, position)) = loop_stack.last() {
        return Err(CompileError::UnmatchedBracket {
            bracket: '[',
            position,
        });
    }
    instructions.push(BfInstruction::Halt);
    Ok(Program::new(instructions))
}

#[test]
fn test_folds_runs() -> anyhow::Result<()> {
    let program = compile("+++>>--<", CompileOptions::default())?;
    assert_eq!(
        program.instructions(),
        [
            BfInstruction::IncCell(3),
            BfInstruction::IncPtr(2),
            BfInstruction::DecCell(2),
            BfInstruction::DecPtr(1),
            BfInstruction::Halt,
        ]
    );
    Ok(())
}

#[test]
fn test_comments_split_nothing() -> anyhow::Result<()> {
    let program = compile("+ + a+", CompileOptions::default())?;
    assert_eq!(
        program.instructions(),
        [
            BfInstruction::IncCell(1),
            BfInstruction::IncCell(1),
            BfInstruction::IncCell(1),
            BfInstruction::Halt,
        ]
    );
    let program = compile("comment only", CompileOptions::default())?;
    assert!(program.is_empty());
    Ok(())
}

#[test]
fn test_loop_targets() -> anyhow::Result<()> {
    let program = compile("+[>[-]<-].", CompileOptions::default())?;
    assert_eq!(
        program.instructions(),
        [
            BfInstruction::IncCell(1),
            BfInstruction::LoopOpen(9),
            BfInstruction::IncPtr(1),
            BfInstruction::LoopOpen(6),
            BfInstruction::DecCell(1),
            BfInstruction::LoopClose(4),
            BfInstruction::DecPtr(1),
            BfInstruction::DecCell(1),
            BfInstruction::LoopClose(2),
            BfInstruction::Write(OutputPolicy::LineBuffered),
            BfInstruction::Halt,
        ]
    );
    Ok(())
}

#[test]
fn test_write_policy_is_baked() -> anyhow::Result<()> {
    let program = compile(".", CompileOptions { buffer_output: false })?;
    assert_eq!(program[0], BfInstruction::Write(OutputPolicy::Unbuffered));
    let program = compile(".", CompileOptions::default())?;
    assert_eq!(program[0], BfInstruction::Write(OutputPolicy::LineBuffered));
    Ok(())
}

#[test]
fn test_empty_program() {
    let err = compile("", CompileOptions::default()).expect_err("must reject empty source");
    assert_eq!(err, CompileError::EmptyProgram);
}

#[test]
fn test_not_opening_loop() {
    let err = compile("+]", CompileOptions::default()).expect_err("must occur syntax error");
    assert_eq!(
        err,
        CompileError::UnmatchedBracket {
            bracket: ']',
            position: 1
        }
    );
}

#[test]
fn test_not_closing_loop() {
    let err = compile("[[]", CompileOptions::default()).expect_err("must occur syntax error");
    assert_eq!(
        err,
        CompileError::UnmatchedBracket {
            bracket: '[',
            position: 0
        }
    );
}
