use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::instruction::{BfInstruction, OutputPolicy, Program};
use crate::output::OutputSink;
use crate::tape::Tape;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("input read error")]
    ReadFailure(#[source] io::Error),
    #[error("lack of input")]
    EndOfInput,
    #[error("cannot move head from {pointer} by {offset}: tape has {capacity} cells")]
    OutOfBounds {
        pointer: usize,
        offset: isize,
        capacity: usize,
    },
    #[error("output write error")]
    WriteFailure(#[source] io::Error),
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
}

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Continue,
    Jump(usize),
    Halt,
}

/// Execution state for one compiled [`Program`].
///
/// The program is only borrowed, so any number of machines may run it.
#[derive(Debug)]
pub struct Machine<'p, I, O> {
    program: &'p Program,
    instruction_pointer: usize,
    tape: Tape,
    input: I,
    output: OutputSink<O>,
    steps: u64,
    step_limit: Option<u64>,
    halted: bool,
}

impl<'p, I, O> Machine<'p, I, O>
where
    I: BufRead,
    O: Write,
{
    pub fn new(program: &'p Program, input: I, output: O) -> Self {
        Self {
            program,
            instruction_pointer: 0,
            tape: Tape::new(),
            input,
            output: OutputSink::new(output),
            steps: 0,
            step_limit: None,
            halted: false,
        }
    }

    /// Replaces the tape with a zeroed one of `capacity` cells. A capacity of
    /// zero is widened to a single cell.
    pub fn with_tape_capacity(mut self, capacity: usize) -> Self {
        self.tape = Tape::with_capacity(capacity);
        self
    }

    /// Caps the number of instructions a run may execute.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn current_instruction(&self) -> &BfInstruction {
        &self.program[self.instruction_pointer]
    }

    /// Executes the instruction under the instruction pointer.
    ///
    /// Buffered output is not flushed here; [`Machine::execute`] does that once
    /// the run ends.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        if self.halted {
            return Ok(Step::Halt);
        }
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimitExceeded { limit });
            }
        }
        let instruction = *self.current_instruction();
        let step = self.dispatch(instruction)?;
        self.steps += 1;
        match step {
            Step::Continue => self.instruction_pointer += 1,
            Step::Jump(target) => self.instruction_pointer = target,
            Step::Halt => self.halted = true,
        }
        Ok(step)
    }

    fn dispatch(&mut self, instruction: BfInstruction) -> Result<Step, RuntimeError> {
        match instruction {
            BfInstruction::IncCell(n) => self.tape.add(n),
            BfInstruction::DecCell(n) => self.tape.sub(n),
            BfInstruction::IncPtr(n) => self.tape.move_right(n)?,
            BfInstruction::DecPtr(n) => self.tape.move_left(n)?,
            BfInstruction::Read => {
                let buf = self.input.fill_buf().map_err(RuntimeError::ReadFailure)?;
                let Some(&byte) = buf.first() else {
                    return Err(RuntimeError::EndOfInput);
                };
                self.input.consume(1);
                self.tape.set_head(byte);
            }
            BfInstruction::Write(OutputPolicy::Unbuffered) => self
                .output
                .write_unbuffered(self.tape.head_value())
                .map_err(RuntimeError::WriteFailure)?,
            BfInstruction::Write(OutputPolicy::LineBuffered) => self
                .output
                .write_line_buffered(self.tape.head_value())
                .map_err(RuntimeError::WriteFailure)?,
            BfInstruction::LoopOpen(target) => {
                if self.tape.head_value() == 0 {
                    return Ok(Step::Jump(target));
                }
            }
            BfInstruction::LoopClose(target) => {
                if self.tape.head_value() != 0 {
                    return Ok(Step::Jump(target));
                }
            }
            BfInstruction::Halt => return Ok(Step::Halt),
        }
        Ok(Step::Continue)
    }

    /// Runs until `Halt` or the first error, then flushes buffered output.
    ///
    /// When both the run and the final flush fail, the run's error is reported.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        let result = self.run_to_halt();
        let flushed = self.output.flush().map_err(RuntimeError::WriteFailure);
        result.and(flushed)
    }

    fn run_to_halt(&mut self) -> Result<(), RuntimeError> {
        while self.step()? != Step::Halt {}
        Ok(())
    }

    /// Puts the machine back to its initial state. Unflushed output is dropped.
    pub fn reset(&mut self) {
        self.instruction_pointer = 0;
        self.tape.clear();
        self.output.discard();
        self.steps = 0;
        self.halted = false;
    }

    pub fn into_output(self) -> io::Result<O> {
        self.output.into_inner()
    }
}

/// Runs `program` from a fresh state against the given input and output.
pub fn run<I, O>(program: &Program, input: I, output: O) -> Result<(), RuntimeError>
where
    I: BufRead,
    O: Write,
{
    Machine::new(program, input, output).execute()
}

#[cfg(test)]
use crate::compiler::{CompileOptions, compile};

#[test]
fn test_echo() -> anyhow::Result<()> {
    let program = compile(",[.,]", CompileOptions::default())?;
    let input = std::io::BufReader::new(&[1, 4, 2, 3, 5, 2, 3, 0][..]);
    let mut output = vec![];
    run(&program, input, &mut output)?;
    assert_eq!(output, [1, 4, 2, 3, 5, 2, 3]);
    Ok(())
}

#[test]
fn test_reverse() -> anyhow::Result<()> {
    let program = compile(">,[>,]<[.<]", CompileOptions::default())?;
    let input = std::io::BufReader::new(&[1, 4, 2, 3, 5, 2, 3, 0][..]);
    let mut output = vec![];
    run(&program, input, &mut output)?;
    assert_eq!(output, [3, 2, 5, 3, 2, 4, 1]);
    Ok(())
}

#[test]
fn test_hello_world() -> anyhow::Result<()> {
    let program = compile(
        "++++++++++[>+++++++>++++++++++>+++>++++<
<<<-]>++.>+.+++++++..+++.>>++++.<++.<+++
+++++.--------.+++.------.--------.>+.",
        CompileOptions {
            buffer_output: false,
        },
    )?;
    let input = std::io::empty();
    let mut output = vec![];
    run(&program, input, &mut output)?;
    assert_eq!(output, b"Hello, world!");
    Ok(())
}

#[test]
fn test_sum_n() -> anyhow::Result<()> {
    let program = compile(
        ",[[->>+>+<<<]>>>[-<<<+>>>]<[-<+>]<<-]>.",
        CompileOptions::default(),
    )?;
    let input = std::io::BufReader::new(&[3][..]);
    let mut output = vec![];
    run(&program, input, &mut output)?;
    assert_eq!(output, [6]);
    Ok(())
}

#[test]
fn test_flush_without_newline() -> anyhow::Result<()> {
    let program = compile("++++++++[>++++++++<-]>.", CompileOptions::default())?;
    let input = std::io::empty();
    let mut output = vec![];
    run(&program, input, &mut output)?;
    assert_eq!(output, b"@");
    Ok(())
}

#[test]
fn test_line_buffered_holds_until_newline() -> anyhow::Result<()> {
    // prints "A" then "\n"
    let program = compile("+++++++++++++[>+++++<-]>.<++++++++++.", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]);
    while !matches!(machine.current_instruction(), BfInstruction::Write(_)) {
        machine.step()?;
    }
    machine.step()?;
    assert!(machine.output.get_ref().is_empty());
    machine.execute()?;
    assert_eq!(machine.into_output()?, b"A\n");
    Ok(())
}

#[test]
fn test_unbuffered_write_reaches_writer_before_halt() -> anyhow::Result<()> {
    let program = compile("+++++++++++++[>+++++<-]>.+.", CompileOptions {
        buffer_output: false,
    })?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]);
    while !matches!(machine.current_instruction(), BfInstruction::Write(_)) {
        machine.step()?;
    }
    machine.step()?;
    assert!(!machine.is_halted());
    assert_eq!(machine.output.get_ref(), b"A");
    machine.execute()?;
    assert_eq!(machine.into_output()?, b"AB");
    Ok(())
}

#[test]
fn test_zero_capacity_is_one_cell() -> anyhow::Result<()> {
    let program = compile("+>", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]).with_tape_capacity(0);
    assert_eq!(machine.tape().capacity(), 1);
    let err = machine.execute().expect_err("must fall off the tape");
    assert!(matches!(err, RuntimeError::OutOfBounds { capacity: 1, .. }));
    assert_eq!(machine.tape().head_value(), 1);
    Ok(())
}

#[test]
fn test_lack_of_input() -> anyhow::Result<()> {
    let program = compile("+>++<,", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]);
    let err = machine.execute().expect_err("must run out of input");
    assert!(matches!(err, RuntimeError::EndOfInput));
    assert_eq!(machine.tape().pointer(), 0);
    assert_eq!(&machine.tape().cells()[..2], [1, 2]);
    assert_eq!(machine.instruction_pointer(), 4);
    Ok(())
}

#[test]
fn test_out_of_bounds_flushes_output() -> anyhow::Result<()> {
    let program = compile("++++++++[>++++++++<-]>+.<<", CompileOptions::default())?;
    let mut output = vec![];
    let err = run(&program, std::io::empty(), &mut output).expect_err("must fall off the tape");
    assert!(matches!(
        err,
        RuntimeError::OutOfBounds {
            pointer: 1,
            offset: -2,
            ..
        }
    ));
    assert_eq!(output, b"A");
    Ok(())
}

#[test]
fn test_small_tape() -> anyhow::Result<()> {
    let program = compile(">>>", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]).with_tape_capacity(3);
    let err = machine.execute().expect_err("must fall off the tape");
    assert!(matches!(err, RuntimeError::OutOfBounds { capacity: 3, .. }));
    Ok(())
}

#[test]
fn test_step_limit() -> anyhow::Result<()> {
    let program = compile("+[]", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]).with_step_limit(100);
    let err = machine.execute().expect_err("must stop an endless loop");
    assert!(matches!(err, RuntimeError::StepLimitExceeded { limit: 100 }));
    assert_eq!(machine.steps(), 100);
    Ok(())
}

#[test]
fn test_halt_is_not_an_error() -> anyhow::Result<()> {
    let program = compile("+", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]);
    assert_eq!(machine.step()?, Step::Continue);
    assert_eq!(machine.step()?, Step::Halt);
    assert!(machine.is_halted());
    assert_eq!(machine.step()?, Step::Halt);
    machine.execute()?;
    Ok(())
}

#[test]
fn test_reset_reruns_identically() -> anyhow::Result<()> {
    let program = compile(",[.-]", CompileOptions::default())?;
    let mut first = vec![];
    run(&program, &[5u8][..], &mut first)?;
    let mut second = vec![];
    run(&program, &[5u8][..], &mut second)?;
    assert_eq!(first, [5, 4, 3, 2, 1]);
    assert_eq!(first, second);

    let mut machine = Machine::new(&program, &[3u8, 3][..], vec![]);
    machine.execute()?;
    machine.reset();
    assert_eq!(machine.instruction_pointer(), 0);
    assert_eq!(machine.tape().head_value(), 0);
    machine.execute()?;
    assert_eq!(machine.into_output()?, [3, 2, 1, 3, 2, 1]);
    Ok(())
}
