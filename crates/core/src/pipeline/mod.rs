//! The pipeline execution engine.
//!
//! [`Cpu::step`] commits exactly one clock edge. The stages are evaluated
//! in reverse order (WB, MEM, EX, ID, IF) over the latch values captured at
//! cycle start, which realizes the latching semantics with plain value
//! flow: WB's register write lands before ID's register read, and EX's
//! freshly computed result is available to ID-stage forwarding in the same
//! cycle. Stalls freeze the PC and IF/ID while injecting a bubble into
//! ID/EX; taken control transfers flush the wrong-path fetch and (except
//! for JAL) the transfer instruction itself.

/// Control-signal derivation.
pub mod control;
/// EX- and ID-stage forwarding networks.
pub mod forward;
/// Hazard detection unit.
pub mod hazard;

use crate::cpu::{ControlTransfer, Cpu, TransferKind};
use crate::decoder::{decode, source_regs, Instruction};
use crate::encoding::sign_extend_imm6;
use crate::error::StepError;
use crate::history::{CycleRecord, ForwardRecord};
use crate::state::latch::{ExMem, IdEx, IfId, Latch, MemWb};
use crate::state::memory::MemoryWarning;

use control::{AluOp, AluSrc, Control, RegDst};

struct DecodeOutput {
    id_ex: Latch<IdEx>,
    transfer: Option<ControlTransfer>,
}

impl Cpu {
    /// Advances the core by one clock cycle.
    ///
    /// Returns `Ok(true)` while the program is still running and
    /// `Ok(false)` on the edge that drains the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Halted`] when called after the pipeline has
    /// drained; the architectural state is left untouched.
    pub fn step(&mut self) -> Result<bool, StepError> {
        if self.halted {
            return Err(StepError::Halted);
        }
        self.clear_cycle_indicators();

        let old_if_id = self.if_id;
        let old_id_ex = self.id_ex;
        let old_ex_mem = self.ex_mem;
        let old_mem_wb = self.mem_wb;

        // WB first: a register written this cycle is visible to the decode
        // read below (write-before-read).
        let retired = self.writeback(&old_mem_wb);
        let new_mem_wb = self.memory_access(&old_ex_mem);
        let new_ex_mem = self.execute(&old_id_ex, &old_ex_mem, &old_mem_wb);

        let stall = hazard::detect(&old_if_id, &old_id_ex, &old_ex_mem);
        let mut fetched = None;

        if let Some(info) = stall {
            // PC and IF/ID freeze; the decode slot issues a bubble.
            self.id_ex = Latch::Bubble;
            self.ex_mem = new_ex_mem;
            self.mem_wb = new_mem_wb;
            self.stalling = true;
            self.stall_info = Some(info);
            self.counters.stalls += 1;
        } else {
            let decoded = self.decode_stage(&old_if_id, &new_ex_mem, &old_ex_mem, &old_mem_wb);
            let mut new_id_ex = decoded.id_ex;
            let (mut new_if_id, mut next_pc) = self.fetch();
            fetched = new_if_id.stage().map(|stage| stage.raw);

            if let Some(transfer) = decoded.transfer {
                // Squash the wrong-path fetch; redirect the PC. The
                // transfer instruction itself is squashed too, except JAL,
                // which still has a link register to write.
                self.control_hazard = Some(transfer);
                self.flush_occurred = true;
                self.counters.flushes += 1;
                new_if_id = Latch::Bubble;
                fetched = None;
                if transfer.kind != TransferKind::Jal {
                    new_id_ex = Latch::Bubble;
                }
                next_pc = transfer.target;
            }

            self.if_id = new_if_id;
            self.id_ex = new_id_ex;
            self.ex_mem = new_ex_mem;
            self.mem_wb = new_mem_wb;
            self.pc = next_pc;
        }

        self.cycle += 1;
        if retired {
            self.counters.instructions += 1;
        }

        self.record_cycle(fetched, &old_if_id, &old_id_ex, &old_ex_mem, &old_mem_wb);
        self.update_halted();
        Ok(!self.halted)
    }

    fn fetch(&self) -> (Latch<IfId>, u16) {
        if self.imem.in_program(self.pc) {
            let next_pc = self.pc.wrapping_add(1);
            (
                Latch::Stage(IfId {
                    pc_plus1: next_pc,
                    raw: self.imem.word(self.pc),
                }),
                next_pc,
            )
        } else {
            (Latch::Bubble, self.pc)
        }
    }

    fn decode_stage(
        &mut self,
        if_id: &Latch<IfId>,
        ex_now: &Latch<ExMem>,
        ex_mem: &Latch<ExMem>,
        mem_wb: &Latch<MemWb>,
    ) -> DecodeOutput {
        let Some(fetched) = if_id.stage() else {
            return DecodeOutput {
                id_ex: Latch::Bubble,
                transfer: None,
            };
        };

        let raw = fetched.raw;
        let instr = decode(raw);
        let ctrl = Control::derive(&instr);
        let (rs, rt) = source_regs(raw);
        let rs_val = self.regs.read(rs);
        let rt_val = self.regs.read(rt);
        let imm = sign_extend_imm6(crate::encoding::imm6_bits(raw));
        let write_reg = match ctrl.reg_dst {
            RegDst::None => 0,
            RegDst::Rd => crate::encoding::rd_bits(raw),
            RegDst::Rt => rt,
            RegDst::Link => 7,
        };

        let transfer = match instr {
            Instruction::Jr { rs: jr_rs } => {
                let (target, fwd) =
                    forward::id_operand(jr_rs, self.regs.read(jr_rs), ex_now, ex_mem, mem_wb);
                self.id_forwards.extend(fwd);
                Some(ControlTransfer {
                    kind: TransferKind::Jr,
                    target,
                })
            }
            Instruction::Jump { addr } => Some(ControlTransfer {
                kind: TransferKind::Jump,
                target: (fetched.pc_plus1 & 0xF000) | addr,
            }),
            Instruction::Jal { addr } => Some(ControlTransfer {
                kind: TransferKind::Jal,
                target: (fetched.pc_plus1 & 0xF000) | addr,
            }),
            Instruction::Beq { rs, rt, offset } | Instruction::Bne { rs, rt, offset } => {
                let (a, fwd_a) = forward::id_operand(rs, rs_val, ex_now, ex_mem, mem_wb);
                let (b, fwd_b) = forward::id_operand(rt, rt_val, ex_now, ex_mem, mem_wb);
                self.id_forwards.extend(fwd_a);
                self.id_forwards.extend(fwd_b);

                let taken = match instr {
                    Instruction::Beq { .. } => a == b,
                    _ => a != b,
                };
                taken.then(|| ControlTransfer {
                    kind: TransferKind::Branch,
                    target: fetched.pc_plus1.wrapping_add(offset as u16),
                })
            }
            _ => None,
        };

        DecodeOutput {
            id_ex: Latch::Stage(IdEx {
                raw,
                pc_plus1: fetched.pc_plus1,
                instr,
                rs,
                rt,
                rs_val,
                rt_val,
                imm,
                write_reg,
                ctrl,
            }),
            transfer,
        }
    }

    fn execute(
        &mut self,
        id_ex: &Latch<IdEx>,
        ex_mem: &Latch<ExMem>,
        mem_wb: &Latch<MemWb>,
    ) -> Latch<ExMem> {
        let Some(stage) = id_ex.stage() else {
            return Latch::Bubble;
        };

        let (a, fwd_a) = forward::ex_operand(stage.rs, stage.rs_val, ex_mem, mem_wb);
        let (b_reg, fwd_b) = forward::ex_operand(stage.rt, stage.rt_val, ex_mem, mem_wb);
        self.forward_a = fwd_a;
        self.forward_b = fwd_b;

        let b = match stage.ctrl.alu_src {
            AluSrc::Register => b_reg,
            AluSrc::SignedImm => stage.imm as u16,
            AluSrc::ZeroImm => (stage.imm as u16) & 0x3F,
        };

        let alu_result = match stage.ctrl.alu_op {
            AluOp::Nop => 0,
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Slt => u16::from((a as i16) < (b as i16)),
        };

        Latch::Stage(ExMem {
            raw: stage.raw,
            pc_plus1: stage.pc_plus1,
            alu_result,
            // Store data is the post-forwarding rt operand, captured here.
            store_val: b_reg,
            write_reg: stage.write_reg,
            ctrl: stage.ctrl,
        })
    }

    fn memory_access(&mut self, ex_mem: &Latch<ExMem>) -> Latch<MemWb> {
        let Some(stage) = ex_mem.stage() else {
            return Latch::Bubble;
        };

        let mut mem_data = 0;
        if stage.ctrl.mem_read {
            let (value, initialized) = self.dmem.read(stage.alu_result);
            if !initialized {
                self.memory_warning = Some(MemoryWarning {
                    address: stage.alu_result & crate::state::memory::DATA_ADDR_MASK,
                });
            }
            mem_data = value;
        } else if stage.ctrl.mem_write {
            self.dmem.write(stage.alu_result, stage.store_val);
        }

        Latch::Stage(MemWb {
            raw: stage.raw,
            pc_plus1: stage.pc_plus1,
            alu_result: stage.alu_result,
            mem_data,
            write_reg: stage.write_reg,
            ctrl: stage.ctrl,
        })
    }

    fn writeback(&mut self, mem_wb: &Latch<MemWb>) -> bool {
        let Some(stage) = mem_wb.stage() else {
            return false;
        };
        if stage.ctrl.reg_write && stage.write_reg != 0 {
            self.regs.write(stage.write_reg, stage.write_back_value());
        }
        true
    }

    fn record_cycle(
        &mut self,
        fetched: Option<u16>,
        old_if_id: &Latch<IfId>,
        old_id_ex: &Latch<IdEx>,
        old_ex_mem: &Latch<ExMem>,
        old_mem_wb: &Latch<MemWb>,
    ) {
        self.pipeline_history.push(CycleRecord {
            cycle: self.cycle,
            fetch: fetched,
            decode: old_if_id.stage().map(|stage| stage.raw),
            execute: old_id_ex.stage().map(|stage| stage.raw),
            memory: old_ex_mem.stage().map(|stage| stage.raw),
            writeback: old_mem_wb.stage().map(|stage| stage.raw),
            stalled: self.stalling,
        });

        if self.stalling {
            self.stall_history.push(self.cycle);
        }

        let forwards = ForwardRecord {
            cycle: self.cycle,
            forward_a: self.forward_a,
            forward_b: self.forward_b,
            id_forwards: self.id_forwards.clone(),
        };
        if !forwards.is_empty() {
            self.counters.forwards += 1;
            self.forward_history.push(forwards);
        }
    }

    fn update_halted(&mut self) {
        let drained = self.if_id.is_bubble()
            && self.id_ex.is_bubble()
            && self.ex_mem.is_bubble()
            && self.mem_wb.is_bubble();
        let next_is_nop = !self.imem.in_program(self.pc) || self.imem.word(self.pc) == 0;
        self.halted = drained && next_is_nop;
    }
}

#[cfg(test)]
mod tests {
    use crate::cpu::Cpu;
    use crate::encoding::{encode_i_type, encode_j_type, encode_r_type, Funct, Opcode};
    use crate::error::StepError;
    use crate::program::Program;

    fn run_to_halt(words: &[u16]) -> Cpu {
        let mut cpu = Cpu::with_program(&Program::from_words(words));
        for _ in 0..200 {
            match cpu.step() {
                Ok(true) => {}
                Ok(false) => return cpu,
                Err(error) => panic!("unexpected step error: {error}"),
            }
        }
        panic!("program did not halt within 200 cycles");
    }

    #[test]
    fn a_single_instruction_drains_in_five_cycles() {
        let cpu = run_to_halt(&[encode_i_type(Opcode::Addi, 0, 1, 5)]);
        assert_eq!(cpu.cycle(), 5);
        assert_eq!(cpu.registers().read(1), 5);
        assert_eq!(cpu.counters().instructions, 1);
        assert_eq!(cpu.counters().stalls, 0);
    }

    #[test]
    fn step_after_halt_is_rejected_without_state_change() {
        let mut cpu = run_to_halt(&[encode_i_type(Opcode::Addi, 0, 1, 5)]);
        let before = cpu.clone();
        assert_eq!(cpu.step(), Err(StepError::Halted));
        assert_eq!(cpu, before);
    }

    #[test]
    fn cycle_counter_increases_by_one_per_step() {
        let words = [
            encode_i_type(Opcode::Addi, 0, 1, 5),
            encode_i_type(Opcode::Addi, 0, 2, 7),
        ];
        let mut cpu = Cpu::with_program(&Program::from_words(&words));
        for expected in 1..=4 {
            cpu.step().expect("still running");
            assert_eq!(cpu.cycle(), expected);
        }
    }

    #[test]
    fn r0_stays_zero_even_when_written() {
        let cpu = run_to_halt(&[encode_i_type(Opcode::Addi, 0, 0, 31)]);
        assert_eq!(cpu.registers().read(0), 0);
    }

    #[test]
    fn subi_and_ori_style_ops_compute_wrapping_results() {
        let words = [
            encode_i_type(Opcode::Addi, 0, 1, 3),
            encode_i_type(Opcode::Subi, 1, 2, 5),
        ];
        let cpu = run_to_halt(&words);
        // 3 - 5 wraps to 0xFFFE.
        assert_eq!(cpu.registers().read(2), 0xFFFE);
    }

    #[test]
    fn andi_masks_with_the_zero_extended_immediate() {
        let words = [
            encode_i_type(Opcode::Addi, 0, 1, 0x2F),
            encode_i_type(Opcode::Andi, 1, 2, -1),
        ];
        let cpu = run_to_halt(&words);
        // imm -1 encodes as 0b111111; ANDI masks with 0x3F, not 0xFFFF.
        assert_eq!(cpu.registers().read(2), 0x2F);
    }

    #[test]
    fn uninitialized_load_reads_zero_and_warns() {
        let words = [encode_i_type(Opcode::Lw, 0, 1, 9)];
        let mut cpu = Cpu::with_program(&Program::from_words(&words));
        for _ in 0..4 {
            cpu.step().expect("still running");
        }
        // MEM stage ran on cycle 4.
        let warning = cpu.memory_warning.expect("uninitialized read warns");
        assert_eq!(warning.address, 9);
        cpu.step().expect("drain");
        assert_eq!(cpu.registers().read(1), 0);
    }

    #[test]
    fn store_then_load_roundtrips_through_data_memory() {
        let words = [
            encode_i_type(Opcode::Addi, 0, 1, 4),
            encode_r_type(0, 0, 0, Funct::Add), // NOP spacing
            encode_i_type(Opcode::Sw, 0, 1, 8),
            encode_i_type(Opcode::Lw, 0, 2, 8),
        ];
        let cpu = run_to_halt(&words);
        assert_eq!(cpu.data_memory().read(8), (4, true));
        assert_eq!(cpu.registers().read(2), 4);
    }

    #[test]
    fn jump_flushes_the_wrong_path_fetch() {
        let words = [
            encode_j_type(Opcode::Jump, 3),
            encode_i_type(Opcode::Addi, 0, 1, 9),
            encode_i_type(Opcode::Addi, 0, 1, 9),
            encode_i_type(Opcode::Addi, 0, 2, 1),
        ];
        let cpu = run_to_halt(&words);
        assert_eq!(cpu.registers().read(1), 0);
        assert_eq!(cpu.registers().read(2), 1);
        assert_eq!(cpu.counters().flushes, 1);
    }

    #[test]
    fn stall_freezes_pc_and_if_id() {
        let words = [
            encode_i_type(Opcode::Lw, 0, 1, 0),
            encode_i_type(Opcode::Addi, 1, 2, 0),
        ];
        let mut cpu = Cpu::with_program(&Program::from_words(&words));
        cpu.step().expect("running"); // LW in IF
        cpu.step().expect("running"); // LW in ID, ADDI in IF
        let pc_before = cpu.pc();
        let if_id_before = cpu.if_id;
        cpu.step().expect("running"); // load-use stall
        assert!(cpu.stalling);
        assert_eq!(cpu.pc(), pc_before);
        assert_eq!(cpu.if_id, if_id_before);
        assert!(cpu.id_ex.is_bubble());
        assert_eq!(cpu.counters().stalls, 1);
    }

    #[test]
    fn illegal_words_flow_through_as_nops() {
        let words = [0xF00F, encode_i_type(Opcode::Addi, 0, 1, 2)];
        let cpu = run_to_halt(&words);
        assert_eq!(cpu.registers().read(1), 2);
        assert_eq!(cpu.counters().instructions, 2);
    }
}
