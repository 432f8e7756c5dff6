//! Facade flow suite: the observer operations end-to-end, the reference
//! scenarios from assembly text, and the step/step-back restore invariant.

use ripple_core::CpuView;
use ripple_session::{Session, SessionError};

fn run_to_halt(session: &mut Session) -> CpuView {
    for _ in 0..500 {
        let outcome = session.step().expect("no error before halt");
        if !outcome.running {
            return outcome.cpu_state;
        }
    }
    panic!("program did not halt within 500 cycles");
}

fn assembled(source: &str) -> Session {
    let mut session = Session::new();
    session.assemble(source).expect("assembles");
    session
}

#[test]
fn forwarding_scenario_retires_with_no_stalls() {
    let mut session = assembled(
        "ADDI $r1, $r0, 5\n\
         ADDI $r2, $r0, 7\n\
         ADD $r3, $r1, $r2\n",
    );
    let state = run_to_halt(&mut session);

    assert_eq!(state.registers[1], 5);
    assert_eq!(state.registers[2], 7);
    assert_eq!(state.registers[3], 12);
    assert_eq!(state.performance.stalls, 0);

    let sources: Vec<&str> = state
        .forward_history
        .iter()
        .flat_map(|record| record.forward_a.iter().chain(record.forward_b.iter()))
        .map(|fwd| fwd.source.as_str())
        .collect();
    assert!(sources.contains(&"EX_MEM"));
    assert!(sources.contains(&"MEM_WB"));
}

#[test]
fn load_use_scenario_stalls_exactly_once() {
    let mut session = assembled(
        "ADDI $r1, $r0, 4\n\
         SW $r1, 0($r0)\n\
         LW $r2, 0($r0)\n\
         ADD $r3, $r2, $r1\n",
    );
    let state = run_to_halt(&mut session);

    assert_eq!(state.registers[2], 4);
    assert_eq!(state.registers[3], 8);
    assert_eq!(state.performance.stalls, 1);
    assert_eq!(state.stall_history.len(), 1);
}

#[test]
fn taken_branch_scenario_flushes_once() {
    let mut session = assembled(
        "ADDI $r1, $r0, 5\n\
         ADDI $r2, $r0, 5\n\
         BEQ $r1, $r2, 2\n\
         ADDI $r3, $r0, 9\n\
         ADDI $r3, $r0, 9\n\
         ADDI $r4, $r0, 1\n",
    );
    let state = run_to_halt(&mut session);

    assert_eq!(state.registers[3], 0);
    assert_eq!(state.registers[4], 1);
    assert_eq!(state.performance.flush_count, 1);
}

#[test]
fn jal_and_jr_scenario_links_and_returns() {
    let mut session = assembled(
        "JAL 4\n\
         ADD $r0, $r0, $r0\n\
         ADD $r0, $r0, $r0\n\
         ADD $r0, $r0, $r0\n\
         JR $r7\n",
    );

    for _ in 0..4 {
        session.step().expect("still running");
    }
    assert_eq!(session.cpu().pc(), 1, "JR redirected to the link address");

    let outcome = session.step().expect("still running");
    assert_eq!(outcome.cpu_state.registers[7], 1, "JAL linked PC+1");
}

#[test]
fn slt_scenario_compares_signed() {
    let mut session = assembled("ADDI $r1, $r0, 1\nSLT $r2, $r0, $r1\n");
    let state = run_to_halt(&mut session);
    assert_eq!(state.registers[2], 1);

    let mut session = assembled("ADDI $r1, $r0, -1\nSLT $r2, $r1, $r0\n");
    let state = run_to_halt(&mut session);
    assert_eq!(state.registers[1], 0xFFFF);
    assert_eq!(state.registers[2], 1);
}

#[test]
fn branch_after_load_scenario_stalls_twice_and_takes() {
    let mut session = assembled("LW $r1, 0($r0)\nBEQ $r1, $r0, 1\n");
    let state = run_to_halt(&mut session);

    assert_eq!(state.performance.stalls, 2);
    assert_eq!(state.performance.flush_count, 1);
    assert!(state
        .pipeline_history
        .iter()
        .any(|record| record.stalled));
}

#[test]
fn uninitialized_read_surfaces_a_warning_snapshot() {
    let mut session = assembled("LW $r1, 3($r0)\n");
    let mut warned = false;
    for _ in 0..10 {
        let outcome = session.step().expect("no error before halt");
        if let Some(warning) = &outcome.cpu_state.memory_warning {
            assert_eq!(warning.kind, "UninitializedRead");
            assert_eq!(warning.address, 3);
            warned = true;
        }
        if !outcome.running {
            break;
        }
    }
    assert!(warned, "the uninitialized read must warn exactly when MEM runs");
}

#[test]
fn run_matches_single_stepping_and_keeps_step_back_reachable() {
    let source = "ADDI $r1, $r0, 4\n\
                  SW $r1, 0($r0)\n\
                  LW $r2, 0($r0)\n\
                  ADD $r3, $r2, $r1\n";

    let mut stepped = assembled(source);
    let stepped_state = run_to_halt(&mut stepped);

    let mut ran = assembled(source);
    let outcome = ran.run(1000).expect("runs to halt");

    assert!(!outcome.running);
    assert_eq!(outcome.cpu_state, stepped_state);
    assert_eq!(outcome.cycles_executed, stepped.cpu().cycle());

    // Every intermediate cycle is reachable backwards after a run.
    let restored = ran.step_back().expect("steps back").cpu_state;
    assert_eq!(restored.cycle, outcome.cpu_state.cycle - 1);
}

#[test]
fn run_with_a_cycle_limit_resumes_where_it_stopped() {
    let mut session = assembled("ADDI $r1, $r0, 5\nADDI $r2, $r0, 7\n");

    let outcome = session.run(3).expect("runs");
    assert!(outcome.running);
    assert_eq!(outcome.cycles_executed, 3);

    let outcome = session.run(1000).expect("finishes");
    assert!(!outcome.running);
    assert_eq!(outcome.cpu_state.registers[1], 5);
    assert_eq!(outcome.cpu_state.registers[2], 7);
}

#[test]
fn step_back_restores_the_previous_state_bit_identically() {
    let mut session = assembled(
        "ADDI $r1, $r0, 4\n\
         SW $r1, 0($r0)\n\
         LW $r2, 0($r0)\n\
         ADD $r3, $r2, $r1\n",
    );

    for _ in 0..3 {
        session.step().expect("still running");
    }

    let before = CpuView::from_cpu(session.cpu());
    session.step().expect("still running");
    let restored = session.step_back().expect("steps back").cpu_state;

    assert_eq!(restored, before);
}

#[test]
fn step_back_walks_all_the_way_to_the_initial_state() {
    let mut session = assembled("ADDI $r1, $r0, 5\n");
    let initial = CpuView::from_cpu(session.cpu());

    let mut steps = 0;
    loop {
        let outcome = session.step().expect("no error before halt");
        steps += 1;
        if !outcome.running {
            break;
        }
    }

    for _ in 0..steps {
        session.step_back().expect("history not exhausted");
    }
    assert_eq!(CpuView::from_cpu(session.cpu()), initial);
    assert_eq!(session.step_back().unwrap_err(), SessionError::NoHistory);
}

#[test]
fn step_after_halt_errors_and_preserves_the_snapshot() {
    let mut session = assembled("ADDI $r1, $r0, 5\n");
    let final_state = run_to_halt(&mut session);

    assert_eq!(session.step().unwrap_err(), SessionError::Halted);
    assert_eq!(CpuView::from_cpu(session.cpu()), final_state);
}

#[test]
fn reset_retains_the_program_and_clears_history() {
    let mut session = assembled("ADDI $r1, $r0, 5\n");
    run_to_halt(&mut session);
    assert!(session.can_step_back());

    let outcome = session.reset().expect("resets");
    assert_eq!(outcome.cpu_state.cycle, 0);
    assert_eq!(outcome.cpu_state.registers, [0; 8]);
    assert!(!session.can_step_back());

    // The program is still loaded and runs again to the same result.
    let state = run_to_halt(&mut session);
    assert_eq!(state.registers[1], 5);
}

#[test]
fn reassembling_clears_history_and_state() {
    let mut session = assembled("ADDI $r1, $r0, 5\n");
    run_to_halt(&mut session);

    let outcome = session.assemble("ADDI $r2, $r0, 9\n").expect("assembles");
    assert_eq!(outcome.cpu_state.cycle, 0);
    assert!(!session.can_step_back());

    let state = run_to_halt(&mut session);
    assert_eq!(state.registers[1], 0, "old program's effects are gone");
    assert_eq!(state.registers[2], 9);
}

#[test]
fn cycle_counter_increases_by_one_per_successful_step() {
    let mut session = assembled("ADDI $r1, $r0, 5\nADDI $r2, $r0, 7\n");
    let mut expected = 0;
    loop {
        let outcome = session.step().expect("no error before halt");
        expected += 1;
        assert_eq!(outcome.cpu_state.cycle, expected);
        if !outcome.running {
            break;
        }
    }
}

#[test]
fn outcomes_serialize_with_the_documented_shape() {
    let mut session = Session::new();
    let outcome = session
        .assemble("ADDI $r1, $r0, 5\nBEQ $r1, $r0, 1\n")
        .expect("assembles");

    let json = serde_json::to_value(&outcome).expect("serializes");
    assert_eq!(json["machine_code"][0]["address"], 0);
    assert_eq!(json["machine_code"][0]["hex"], "3045");
    assert_eq!(
        json["machine_code"][0]["binary"].as_str().map(str::len),
        Some(16)
    );
    assert_eq!(json["cpu_state"]["pc"], 0);
    assert!(json["cpu_state"]["IF_ID"].get("valid").is_some());

    let outcome = session.step().expect("steps");
    let json = serde_json::to_value(&outcome).expect("serializes");
    assert_eq!(json["running"], true);
    assert_eq!(json["can_step_back"], true);
    assert_eq!(json["cpu_state"]["cycle"], 1);
}
