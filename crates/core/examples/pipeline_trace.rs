//! Prints a per-cycle pipeline occupancy table for a small demo program.
//!
//! ```text
//! cargo run -p ripple-core --example pipeline_trace
//! ```

use ripple_core::{
    disassemble, encode_i_type, encode_r_type, extract_timeline, Cpu, Funct, Opcode, Program,
};

fn main() {
    // ADDI $r1,$r0,4 ; SW $r1,0($r0) ; LW $r2,0($r0) ; ADD $r3,$r2,$r1
    let words = [
        encode_i_type(Opcode::Addi, 0, 1, 4),
        encode_i_type(Opcode::Sw, 0, 1, 0),
        encode_i_type(Opcode::Lw, 0, 2, 0),
        encode_r_type(2, 1, 3, Funct::Add),
    ];

    let program = Program::from_words(&words);
    let mut cpu = Cpu::with_program(&program);

    println!("program:");
    for record in &program.records {
        println!("  {:03}: {}  {}", record.address, record.hex, record.disasm);
    }
    println!();
    println!("cycle  IF    ID    EX    MEM   WB    notes");

    loop {
        let running = match cpu.step() {
            Ok(running) => running,
            Err(error) => {
                eprintln!("step failed: {error}");
                return;
            }
        };

        let record = cpu
            .pipeline_history()
            .last()
            .expect("a committed step records one cycle");
        let cell = |slot: Option<u16>| slot.map_or_else(|| "----".to_owned(), |raw| format!("{raw:04X}"));
        let note = if record.stalled { "stall" } else { "" };
        println!(
            "{:>5}  {}  {}  {}  {}  {}  {}",
            record.cycle,
            cell(record.fetch),
            cell(record.decode),
            cell(record.execute),
            cell(record.memory),
            cell(record.writeback),
            note,
        );

        if !running {
            break;
        }
    }

    println!();
    println!("registers: {:?}", cpu.registers().snapshot());
    let counters = cpu.counters();
    println!(
        "cycles={} retired={} stalls={} forwards={} flushes={}",
        cpu.cycle(),
        counters.instructions,
        counters.stalls,
        counters.forwards,
        counters.flushes,
    );

    println!();
    println!("timeline:");
    for row in extract_timeline(cpu.pipeline_history()) {
        println!(
            "  {:<18} IF@{:?} ID@{:?} EX@{:?} MEM@{:?} WB@{:?}",
            disassemble(row.raw),
            row.fetch,
            row.decode,
            row.execute,
            row.memory,
            row.writeback,
        );
    }
}
