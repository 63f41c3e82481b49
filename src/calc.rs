//! A small stack calculator built the same way as the tape machine: a flat
//! list of instructions executed one by one, each reporting how far the
//! instruction pointer moves.

use std::io::{self, Write};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackInstruction {
    Push(f64),
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Prints the top of the stack without popping it.
    Print,
}

#[derive(Debug, Error)]
pub enum StackError {
    #[error("stack underflow: need {needed} operands, have {available}")]
    StackUnderflow { needed: usize, available: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("output write error")]
    Output(#[from] io::Error),
    #[error("unknown token `{token}`")]
    Parse { token: String },
}

/// Parses whitespace separated reverse polish notation, e.g. `3 7 + print`.
pub fn parse(source: &str) -> Result<Vec<StackInstruction>, StackError> {
    source
        .split_whitespace()
        .map(|token| {
            Ok(match token {
                "+" => StackInstruction::Add,
                "-" => StackInstruction::Subtract,
                "*" => StackInstruction::Multiply,
                "/" => StackInstruction::Divide,
                "." | "print" => StackInstruction::Print,
                _ => StackInstruction::Push(token.parse().map_err(|_| StackError::Parse {
                    token: token.to_owned(),
                })?),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackMachine<O> {
    stack: Vec<f64>,
    output: O,
}

impl<O: Write> StackMachine<O> {
    pub fn new(output: O) -> Self {
        Self {
            stack: vec![],
            output,
        }
    }

    pub fn stack(&self) -> &[f64] {
        &self.stack
    }

    /// Executes one instruction and returns the instruction pointer delta.
    pub fn execute(&mut self, instruction: StackInstruction) -> Result<isize, StackError> {
        match instruction {
            StackInstruction::Push(value) => self.stack.push(value),
            StackInstruction::Add => self.binary(|x, y| Ok(x + y))?,
            StackInstruction::Subtract => self.binary(|x, y| Ok(x - y))?,
            StackInstruction::Multiply => self.binary(|x, y| Ok(x * y))?,
            StackInstruction::Divide => self.binary(|x, y| {
                if y == 0.0 {
                    return Err(StackError::DivisionByZero);
                }
                Ok(x / y)
            })?,
            StackInstruction::Print => {
                let &top = self.stack.last().ok_or(StackError::StackUnderflow {
                    needed: 1,
                    available: 0,
                })?;
                writeln!(self.output, "{top:.6}")?;
            }
        }
        Ok(1)
    }

    /// Pops `x` (the top) and then `y`, and pushes `op(x, y)`.
    /// The stack is left as it was when `op` fails.
    fn binary(
        &mut self,
        op: impl FnOnce(f64, f64) -> Result<f64, StackError>,
    ) -> Result<(), StackError> {
        let available = self.stack.len();
        let [.., y, x] = self.stack[..] else {
            return Err(StackError::StackUnderflow {
                needed: 2,
                available,
            });
        };
        let result = op(x, y)?;
        self.stack.truncate(available - 2);
        self.stack.push(result);
        Ok(())
    }

    /// Runs `program` until the instruction pointer leaves it.
    pub fn run(&mut self, program: &[StackInstruction]) -> Result<(), StackError> {
        let mut ip = 0usize;
        while let Some(&instruction) = program.get(ip) {
            let delta = self.execute(instruction)?;
            let Some(next) = ip.checked_add_signed(delta) else {
                break;
            };
            ip = next;
        }
        self.output.flush()?;
        Ok(())
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

#[test]
fn test_add_then_multiply() -> anyhow::Result<()> {
    use StackInstruction::*;
    let mut machine = StackMachine::new(vec![]);
    machine.run(&[Push(3.0), Push(7.0), Add, Print, Push(4.5), Multiply, Print])?;
    assert_eq!(machine.stack(), [45.0]);
    assert_eq!(machine.into_output(), b"10.000000\n45.000000\n");
    Ok(())
}

#[test]
fn test_top_is_first_operand() -> anyhow::Result<()> {
    let mut machine = StackMachine::new(vec![]);
    machine.run(&parse("2 10 - 4 20 /")?)?;
    assert_eq!(machine.stack(), [8.0, 5.0]);
    Ok(())
}

#[test]
fn test_underflow() {
    let mut machine = StackMachine::new(vec![]);
    let err = machine
        .run(&[StackInstruction::Push(1.0), StackInstruction::Add])
        .expect_err("must underflow");
    assert!(matches!(
        err,
        StackError::StackUnderflow {
            needed: 2,
            available: 1
        }
    ));
    assert_eq!(machine.stack(), [1.0]);

    let mut machine = StackMachine::new(vec![]);
    let err = machine
        .execute(StackInstruction::Print)
        .expect_err("must underflow");
    assert!(matches!(err, StackError::StackUnderflow { needed: 1, .. }));
}

#[test]
fn test_division_by_zero() {
    let mut machine = StackMachine::new(vec![]);
    let err = machine
        .run(&parse("0 1 /").unwrap())
        .expect_err("must refuse to divide");
    assert!(matches!(err, StackError::DivisionByZero));
    assert_eq!(machine.stack(), [0.0, 1.0]);
}

#[test]
fn test_parse() -> anyhow::Result<()> {
    assert_eq!(
        parse("3 -1.5 - print .")?,
        [
            StackInstruction::Push(3.0),
            StackInstruction::Push(-1.5),
            StackInstruction::Subtract,
            StackInstruction::Print,
            StackInstruction::Print,
        ]
    );
    let err = parse("1 two +").expect_err("must reject words");
    assert!(matches!(err, StackError::Parse { token } if token == "two"));
    Ok(())
}
