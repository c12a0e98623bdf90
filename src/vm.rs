//! # Cooperative Script Virtual Machine
//!
//! This module implements the room script interpreter: a fixed bank of
//! [`THREAD_COUNT`] cooperative threads stepped on a shared 30 Hz clock.
//!
//! ## High-level model
//! - **Thread bank**: every room event routine runs on one of 20 slots;
//!   slots are started by the host ([`ScriptVm::init_script`]) or by the
//!   script itself (EVT_EXEC) and stop at a top-level EVT_END.
//! - **Scheduler**: [`ScriptVm::tick`] accumulates wall time and fires one
//!   round per 1/30 s, stepping threads in ascending slot order. Crossing
//!   the threshold **zeroes** the accumulator instead of subtracting the
//!   period, so bursts of wall time can never produce more than one round.
//! - **Stepper**: each thread runs a fetch-decode-dispatch loop until a
//!   handler breaks control flow. A yield ends the step; a false predicate
//!   enters the outer reconciliation, which pops the recorded join PC of the
//!   innermost pending if/else block and resumes there.
//! - **PC discipline**: after every handler the PC advances by the opcode's
//!   declared size unless the handler set `override_pc` (jumps, returns, the
//!   SLEEP one-byte transition).
//!
//! The machine is deterministic and fails fast: any malformed-bytecode fault
//! ([`ScriptError`]) is logged once with its thread, PC, and condition, and
//! latches the whole VM halted until [`ScriptVm::reset`].

use crate::bytecode::{self, Instr, ScriptFunction};
use crate::error::ScriptError;
use crate::thread::ScriptThread;
use crate::world::World;

mod ops_control;
mod ops_world;

/// Number of script thread slots per room.
pub const THREAD_COUNT: usize = 20;

/// The script simulation rate. Wall time in excess of one period per tick
/// call is discarded, bounding execution at this rate.
pub const FRAMES_PER_SECOND: f64 = 30.0;

/// Outcome of one opcode handler.
///
/// `Continue` keeps the inner dispatch loop running, `Yield` ends the
/// thread's step for this tick (sleeping or terminated), and `CondFalse`
/// reports a false predicate, sending the stepper through the if/else
/// pop-and-jump reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    CondFalse,
    Yield,
}

/// The room script virtual machine: thread bank plus tick clock.
pub struct ScriptVm {
    threads: [ScriptThread; THREAD_COUNT],
    delta_time: f64,
    halted: bool,
}

impl ScriptVm {
    pub fn new() -> ScriptVm {
        ScriptVm {
            threads: std::array::from_fn(|_| ScriptThread::new()),
            delta_time: 0.0,
            halted: false,
        }
    }

    /// Clear every thread, the clock, and any latched fault (room entry).
    pub fn reset(&mut self) {
        for thread in &mut self.threads {
            thread.reset();
        }
        self.delta_time = 0.0;
        self.halted = false;
    }

    /// Mark `thread_index` running at the entry of event `event_index`.
    pub fn init_script(
        &mut self,
        script: &ScriptFunction,
        thread_index: usize,
        event_index: usize,
    ) {
        if self.halted {
            return;
        }
        let Some(entry) = script.entry(event_index) else {
            self.fault(
                thread_index,
                ScriptError::BadEventIndex {
                    pc: 0,
                    event: event_index,
                },
            );
            return;
        };
        let thread = &mut self.threads[thread_index];
        thread.running = true;
        thread.pc = entry;
    }

    /// Advance the simulation by `elapsed_seconds` of wall time.
    ///
    /// Runs at most one round of thread steps per call, and none at all
    /// until the accumulated time exceeds one period.
    pub fn tick(&mut self, elapsed_seconds: f64, script: &ScriptFunction, world: &mut dyn World) {
        if self.halted {
            return;
        }
        self.delta_time += elapsed_seconds;
        if self.delta_time <= 1.0 / FRAMES_PER_SECOND {
            return;
        }
        self.delta_time = 0.0;

        for index in 0..THREAD_COUNT {
            if let Err(fault) = self.run_thread(index, script, world) {
                self.fault(index, fault);
                return;
            }
        }
    }

    /// Whether a bytecode fault has latched the machine halted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Inspect one thread slot.
    pub fn thread(&self, index: usize) -> &ScriptThread {
        &self.threads[index]
    }

    fn fault(&mut self, thread_index: usize, fault: ScriptError) {
        log::error!("room script halted: thread {thread_index}: {fault}");
        self.halted = true;
    }

    /// Step one thread until it yields for this tick.
    fn run_thread(
        &mut self,
        index: usize,
        script: &ScriptFunction,
        world: &mut dyn World,
    ) -> Result<(), ScriptError> {
        if !self.threads[index].running {
            return Ok(());
        }

        loop {
            let (flow, opcode) = loop {
                let pc = self.threads[index].pc;
                let line = script
                    .instructions
                    .get(&pc)
                    .ok_or(ScriptError::MissingInstruction { pc })?;
                let opcode = line[0];
                let instr = bytecode::decode(line);

                self.threads[index].override_pc = false;
                let flow = self.dispatch(index, instr, script, world)?;

                let thread = &mut self.threads[index];
                if !thread.override_pc {
                    thread.pc += bytecode::instruction_size(opcode);
                }
                thread.override_pc = false;

                if flow != Flow::Continue {
                    break (flow, opcode);
                }
            };

            let thread = &mut self.threads[index];
            if flow == Flow::Yield || thread.levels[thread.sub_level].if_else_counter < 0 {
                return Ok(());
            }

            // A predicate came back false: resume at the join PC recorded by
            // the innermost pending IF_START.
            if thread.stack_index == 0 {
                return Err(ScriptError::EmptyConditionalStack {
                    pc: thread.pc,
                    opcode,
                });
            }
            thread.stack_index -= 1;
            thread.pc = thread.levels[thread.sub_level].join_stack[thread.stack_index];
            thread.levels[thread.sub_level].if_else_counter -= 1;
        }
    }

    fn dispatch(
        &mut self,
        index: usize,
        instr: Instr,
        script: &ScriptFunction,
        world: &mut dyn World,
    ) -> Result<Flow, ScriptError> {
        let pc = self.threads[index].pc;
        match instr {
            Instr::EvtEnd => Ok(ops_control::handle_evt_end(&mut self.threads[index])),
            Instr::EvtExec(inst) => {
                ops_control::handle_evt_exec(&inst, pc, &mut self.threads, script)
            }
            Instr::IfStart(inst) => ops_control::handle_if_start(&inst, &mut self.threads[index]),
            Instr::ElseStart(inst) => {
                ops_control::handle_else_start(&inst, &mut self.threads[index])
            }
            Instr::EndIf => ops_control::handle_end_if(&mut self.threads[index]),
            Instr::Sleep(inst) => ops_control::handle_sleep(&inst, &mut self.threads[index]),
            Instr::Sleeping(_) => ops_control::handle_sleeping(&mut self.threads[index]),
            Instr::ForStart(inst) => {
                ops_control::handle_for_start(&inst, &mut self.threads[index])
            }
            Instr::ForEnd => ops_control::handle_for_end(&mut self.threads[index]),
            Instr::Switch(inst) => {
                ops_control::handle_switch(&inst, &mut self.threads[index], script, world)
            }
            // Stepped into naturally on fall-through from the previous case
            // body; the scan in handle_switch is what dispatches them.
            Instr::Case(_) | Instr::Default => Ok(Flow::Continue),
            Instr::EndSwitch => ops_control::handle_end_switch(&mut self.threads[index]),
            Instr::Goto(inst) => Ok(ops_control::handle_goto(&inst, &self.threads[index])),
            Instr::Gosub(inst) => {
                ops_control::handle_gosub(&inst, &mut self.threads[index], script)
            }
            Instr::Break => ops_control::handle_break(&mut self.threads[index]),
            Instr::Check(inst) => Ok(ops_control::handle_check(&inst, world)),
            Instr::SetBit(inst) => ops_control::handle_set_bit(&inst, pc, world),
            Instr::Compare(inst) => Ok(ops_control::handle_compare(&inst)),
            Instr::MemberCmp(inst) => Ok(ops_control::handle_member_compare(&inst)),
            Instr::WorkSet(inst) => {
                Ok(ops_control::handle_work_set(&inst, &mut self.threads[index]))
            }
            Instr::CutChg(inst) => Ok(ops_world::handle_cut_chg(&inst, world)),
            Instr::AotSet(inst) => Ok(ops_world::handle_aot_set(&inst, world)),
            Instr::AotSet4p(inst) => Ok(ops_world::handle_aot_set_4p(&inst, world)),
            Instr::DoorAotSet(inst) => Ok(ops_world::handle_door_aot_set(&inst, world)),
            Instr::DoorAotSet4p(inst) => Ok(ops_world::handle_door_aot_set_4p(&inst, world)),
            Instr::ItemAotSet(inst) => ops_world::handle_item_aot_set(&inst, pc, world),
            Instr::ItemAotSet4p(inst) => Ok(ops_world::handle_item_aot_set_4p(&inst, world)),
            Instr::AotReset(inst) => Ok(ops_world::handle_aot_reset(&inst, world)),
            Instr::ObjModelSet(inst) => Ok(ops_world::handle_obj_model_set(&inst, world)),
            Instr::PosSet(inst) => {
                Ok(ops_world::handle_pos_set(&inst, &self.threads[index], world))
            }
            Instr::MemberSet(inst) => {
                Ok(ops_world::handle_member_set(&inst, &self.threads[index], world))
            }
            Instr::ScaIdSet(inst) => Ok(ops_world::handle_sca_id_set(&inst, world)),
            Instr::SceEsprOn(inst) => Ok(ops_world::handle_sce_espr_on(&inst, world)),
            Instr::SceEsprKill(inst) => Ok(ops_world::handle_sce_espr_kill(&inst, world)),
            Instr::SceEmSet(inst) => Ok(ops_world::handle_sce_em_set(&inst)),
            Instr::SceBgmControl(inst) => Ok(ops_world::handle_sce_bgm_control(&inst, world)),
            Instr::PlcMotion(inst) => Ok(ops_world::handle_plc_motion(&inst)),
            Instr::PlcDest(inst) => Ok(ops_world::handle_plc_dest(&inst)),
            Instr::PlcNeck(inst) => Ok(ops_world::handle_plc_neck(&inst)),
            // Forward compatibility: undispatched opcodes step over by their
            // declared size.
            Instr::Unknown(_) => Ok(Flow::Continue),
        }
    }
}

impl Default for ScriptVm {
    fn default() -> Self {
        ScriptVm::new()
    }
}

#[cfg(test)]
mod tests;
