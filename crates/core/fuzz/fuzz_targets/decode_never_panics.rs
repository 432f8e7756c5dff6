//! Fuzz target: the decoder is total and the engine survives arbitrary
//! program images without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ripple_core::{decode, disassemble, Cpu, Program};

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .take(ripple_core::IMEM_WORDS)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    for &word in &words {
        let _ = decode(word);
        let _ = disassemble(word);
    }

    if words.is_empty() {
        return;
    }

    let mut cpu = Cpu::with_program(&Program::from_words(&words));
    for _ in 0..256 {
        match cpu.step() {
            Ok(true) => {}
            Ok(false) | Err(_) => break,
        }
    }
});
