use bf_vm::{BfInstruction, CompileError, CompileOptions, Machine, compile, run};
use proptest::prelude::*;

/// Balanced programs built from the eight commands plus comment bytes.
fn balanced_source() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(vec!["+", "-", ">", "<", ",", ".", "x", " "])
        .prop_map(str::to_owned);
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(|parts| parts.concat()),
            inner.prop_map(|body| format!("[{body}]")),
        ]
    })
}

proptest! {
    #[test]
    fn prop_loop_targets_point_past_partner(source in balanced_source()) {
        let program = compile(&format!(" {source}"), CompileOptions::default()).unwrap();
        let instructions = program.instructions();
        prop_assert_eq!(instructions.last(), Some(&BfInstruction::Halt));
        prop_assert_eq!(
            instructions.iter().filter(|i| **i == BfInstruction::Halt).count(),
            1
        );
        for (index, instruction) in instructions.iter().enumerate() {
            match *instruction {
                BfInstruction::LoopOpen(target) => {
                    prop_assert!(target > index + 1);
                    prop_assert_eq!(instructions[target - 1], BfInstruction::LoopClose(index + 1));
                }
                BfInstruction::LoopClose(target) => {
                    prop_assert!(target >= 1 && target <= index);
                    prop_assert_eq!(instructions[target - 1], BfInstruction::LoopOpen(index + 1));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_stray_bracket_is_rejected(source in balanced_source(), close in any::<bool>()) {
        let broken = if close { format!("{source}]") } else { format!("[{source}") };
        let err = compile(&broken, CompileOptions::default()).unwrap_err();
        let is_unmatched = matches!(err, CompileError::UnmatchedBracket { .. });
        prop_assert!(is_unmatched);
    }

    #[test]
    fn prop_folding_matches_unit_steps(count in 1usize..600, down in any::<bool>()) {
        let command = if down { "-" } else { "+" };
        let folded = compile(&command.repeat(count), CompileOptions::default()).unwrap();
        prop_assert_eq!(folded.len(), 2);

        let unfolded = compile(&vec![command; count].join(" "), CompileOptions::default()).unwrap();
        prop_assert_eq!(unfolded.len(), count + 1);

        let mut a = Machine::new(&folded, std::io::empty(), vec![]);
        a.execute().unwrap();
        let mut b = Machine::new(&unfolded, std::io::empty(), vec![]);
        b.execute().unwrap();
        prop_assert_eq!(a.tape().cells(), b.tape().cells());
    }

    #[test]
    fn prop_reruns_are_identical(source in balanced_source(), input in prop::collection::vec(any::<u8>(), 0..32)) {
        let program = compile(&format!("+{source}"), CompileOptions::default()).unwrap();
        let outcome = |output: &mut Vec<u8>| {
            Machine::new(&program, &input[..], output)
                .with_step_limit(10_000)
                .execute()
                .map_err(|err| err.to_string())
        };
        let mut first = vec![];
        let first_result = outcome(&mut first);
        let mut second = vec![];
        let second_result = outcome(&mut second);
        prop_assert_eq!(first_result, second_result);
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_at_sign_flushed_at_halt() -> anyhow::Result<()> {
    let program = compile("++++++++[>++++++++<-]>.", CompileOptions::default())?;
    let mut output = vec![];
    run(&program, std::io::empty(), &mut output)?;
    assert_eq!(output, [64]);
    Ok(())
}

#[test]
fn test_read_at_end_of_input_leaves_tape() -> anyhow::Result<()> {
    let program = compile(",", CompileOptions::default())?;
    let mut machine = Machine::new(&program, std::io::empty(), vec![]);
    let err = machine.execute().expect_err("must fail to read");
    assert!(matches!(err, bf_vm::RuntimeError::EndOfInput));
    assert_eq!(machine.tape().pointer(), 0);
    assert!(machine.tape().cells().iter().all(|&cell| cell == 0));
    Ok(())
}
