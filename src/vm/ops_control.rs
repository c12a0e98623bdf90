//! # Control-Flow and Predicate Handlers
//!
//! This module implements every opcode that steers a thread rather than
//! mutating the game world: routine termination and spawning, if/else
//! blocks, the SLEEP/SLEEPING countdown, FOR loops, SWITCH dispatch,
//! sub-routine calls, and the bit predicates.
//!
//! ## Execution model
//! - Handlers take the active thread explicitly and return a [`Flow`]
//!   (wrapped in `Result` when a malformed-bytecode fault is possible).
//! - A handler that moves the PC itself sets `thread.override_pc` so the
//!   stepper skips the default size-based advance.
//! - Join PCs for pending if/else blocks live on the current sub-level's
//!   `join_stack`; loop scopes (FOR, SLEEP, SWITCH) share the per-level
//!   frame bank.

use crate::bytecode::{
    self, BitTest, BlockLength, Compare, EvtExec, ForStart, Gosub, Goto, Instr, ScriptFunction,
    SetBit, Sleep, Switch, WorkSet, OP_BREAK, OP_CASE, OP_DEFAULT, OP_ELSE_START, OP_END_IF,
    OP_END_SWITCH, OP_FOR, OP_FOR_END, OP_GOSUB, OP_IF_START, OP_SLEEP, OP_SLEEPING, OP_SWITCH,
};
use crate::error::ScriptError;
use crate::thread::{ScriptThread, JOIN_STACK_DEPTH, LOOP_FRAMES, SUB_LEVELS};
use crate::world::World;

use super::Flow;

/// EVT_END: return from a sub-routine, or terminate the thread at top level.
pub(super) fn handle_evt_end(thread: &mut ScriptThread) -> Flow {
    if thread.sub_level != 0 {
        // The caller's pending if/else joins become the live stack again.
        let if_else_counter = thread.levels[thread.sub_level].if_else_counter;
        thread.sub_level -= 1;
        thread.pc = thread.levels[thread.sub_level].return_address;
        thread.override_pc = true;
        thread.stack_index = (if_else_counter + 1) as usize;
        return Flow::Continue;
    }

    thread.running = false;
    Flow::Yield
}

/// EVT_EXEC: start an event routine on another thread slot.
///
/// An in-range `thread_num` addresses that slot directly; anything else
/// selects the lowest non-running slot (slot 0 when every slot is busy).
/// The spawned thread runs this tick only if its slot is after the
/// spawner's in iteration order.
pub(super) fn handle_evt_exec(
    inst: &EvtExec,
    pc: usize,
    threads: &mut [ScriptThread],
    script: &ScriptFunction,
) -> Result<Flow, ScriptError> {
    let requested = inst.thread_num as usize;
    let target = if requested < threads.len() {
        requested
    } else {
        threads.iter().position(|t| !t.running).unwrap_or(0)
    };

    let event = inst.event as usize;
    let entry = script
        .entry(event)
        .ok_or(ScriptError::BadEventIndex { pc, event })?;

    let spawned = &mut threads[target];
    spawned.running = true;
    spawned.pc = entry;
    spawned.levels[0].if_else_counter = -1;
    spawned.levels[0].loop_level = -1;
    Ok(Flow::Continue)
}

/// IF_START: record the join PC past the block and open a pending if.
pub(super) fn handle_if_start(
    inst: &BlockLength,
    thread: &mut ScriptThread,
) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    if thread.stack_index >= JOIN_STACK_DEPTH {
        return Err(ScriptError::ConditionalStackOverflow { pc });
    }

    let join_pc = pc + bytecode::instruction_size(OP_IF_START) + inst.block_length as usize;
    let slot = thread.stack_index;
    let level = thread.level();
    level.if_else_counter += 1;
    level.join_stack[slot] = join_pc;
    thread.stack_index += 1;
    Ok(Flow::Continue)
}

/// ELSE_START: reached from a taken then-branch; skip the else body.
pub(super) fn handle_else_start(
    inst: &BlockLength,
    thread: &mut ScriptThread,
) -> Result<Flow, ScriptError> {
    if thread.stack_index == 0 {
        return Err(ScriptError::EmptyConditionalStack {
            pc: thread.pc,
            opcode: OP_ELSE_START,
        });
    }
    thread.stack_index -= 1;
    thread.pc += inst.block_length as usize;
    thread.level().if_else_counter -= 1;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// END_IF: close the innermost pending if.
pub(super) fn handle_end_if(thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    if thread.stack_index == 0 {
        return Err(ScriptError::EmptyConditionalStack {
            pc: thread.pc,
            opcode: OP_END_IF,
        });
    }
    thread.stack_index -= 1;
    thread.level().if_else_counter -= 1;
    Ok(Flow::Continue)
}

/// SLEEP: open a countdown frame and step onto the paired SLEEPING marker.
pub(super) fn handle_sleep(inst: &Sleep, thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let level = thread.level();
    if level.loop_level >= LOOP_FRAMES as i32 - 1 {
        return Err(ScriptError::LoopStackOverflow {
            pc,
            opcode: OP_SLEEP,
        });
    }
    level.loop_level += 1;
    let frame = level.loop_level as usize;
    level.loops[frame].counter = i32::from(inst.count);

    // One byte, not instruction_size(OP_SLEEP): the SLEEPING opcode is
    // embedded as the second byte of SLEEP's encoding.
    thread.pc = pc + 1;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// SLEEPING: burn one tick; release the frame when the count runs out.
pub(super) fn handle_sleeping(thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let woke = {
        let level = thread.level();
        if level.loop_level < 0 {
            return Err(ScriptError::NoActiveLoop {
                pc,
                opcode: OP_SLEEPING,
            });
        }
        let frame = level.loop_level as usize;
        level.loops[frame].counter -= 1;
        if level.loops[frame].counter == 0 {
            level.loop_level -= 1;
            true
        } else {
            false
        }
    };

    if woke {
        thread.pc = pc + bytecode::instruction_size(OP_SLEEPING);
    }
    thread.override_pc = true;
    Ok(Flow::Yield)
}

/// FOR: open an iteration frame, or skip the whole block on a zero count.
pub(super) fn handle_for_start(
    inst: &ForStart,
    thread: &mut ScriptThread,
) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let body = pc + bytecode::instruction_size(OP_FOR);

    if inst.count != 0 {
        let level = thread.level();
        if level.loop_level >= LOOP_FRAMES as i32 - 1 {
            return Err(ScriptError::LoopStackOverflow {
                pc,
                opcode: OP_FOR,
            });
        }
        level.loop_level += 1;
        let saved = level.if_else_counter;
        let frame = &mut level.loops[level.loop_level as usize];
        frame.counter = i32::from(inst.count);
        frame.break_pc = body + inst.block_length as usize;
        frame.start_pc = body;
        frame.saved_if_counter = saved;

        thread.pc = body;
        thread.override_pc = true;
        return Ok(Flow::Continue);
    }

    thread.pc = body + inst.block_length as usize;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// FOR_END: take the back edge while iterations remain, else drop the frame.
pub(super) fn handle_for_end(thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let next_pc = {
        let level = thread.level();
        if level.loop_level < 0 {
            return Err(ScriptError::NoActiveLoop {
                pc,
                opcode: OP_FOR_END,
            });
        }
        let frame = level.loop_level as usize;
        level.loops[frame].counter -= 1;
        if level.loops[frame].counter != 0 {
            level.loops[frame].start_pc
        } else {
            level.loop_level -= 1;
            pc + bytecode::instruction_size(OP_FOR_END)
        }
    };

    thread.pc = next_pc;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// BREAK: leave the innermost loop scope and restore its if/else depth.
pub(super) fn handle_break(thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let break_pc = {
        let level = thread.level();
        if level.loop_level < 0 {
            return Err(ScriptError::NoActiveLoop {
                pc,
                opcode: OP_BREAK,
            });
        }
        let frame = level.loops[level.loop_level as usize];
        level.if_else_counter = frame.saved_if_counter;
        level.loop_level -= 1;
        frame.break_pc
    };

    thread.pc = break_pc;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// SWITCH: open a scope frame, then scan the case blocks for a match.
///
/// The scan walks CASE headers by their declared sizes without executing
/// anything in between; any other opcode in scan position means the block
/// structure is corrupt.
pub(super) fn handle_switch(
    inst: &Switch,
    thread: &mut ScriptThread,
    script: &ScriptFunction,
    world: &dyn World,
) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let body = pc + bytecode::instruction_size(OP_SWITCH);
    {
        let level = thread.level();
        if level.loop_level >= LOOP_FRAMES as i32 - 1 {
            return Err(ScriptError::LoopStackOverflow {
                pc,
                opcode: OP_SWITCH,
            });
        }
        level.loop_level += 1;
        let saved = level.if_else_counter;
        let frame = &mut level.loops[level.loop_level as usize];
        frame.break_pc = body + inst.block_length as usize;
        frame.saved_if_counter = saved;
    }

    let switch_value = world.script_var(inst.var_id as usize);
    let mut scan = body;
    loop {
        let line = script
            .instructions
            .get(&scan)
            .ok_or(ScriptError::MissingInstruction { pc: scan })?;
        match bytecode::decode(line) {
            Instr::Case(case) => {
                if i32::from(case.value) == switch_value {
                    thread.pc = scan + bytecode::instruction_size(OP_CASE);
                    thread.override_pc = true;
                    return Ok(Flow::Continue);
                }
                scan += bytecode::instruction_size(OP_CASE) + case.block_length as usize;
            }
            Instr::Default => {
                thread.pc = scan + bytecode::instruction_size(OP_DEFAULT);
                thread.override_pc = true;
                return Ok(Flow::Continue);
            }
            Instr::EndSwitch => {
                // No arm matched: drop the scope frame and fall out.
                thread.level().loop_level -= 1;
                thread.pc = scan + bytecode::instruction_size(OP_END_SWITCH);
                thread.override_pc = true;
                return Ok(Flow::Continue);
            }
            _ => {
                return Err(ScriptError::UnexpectedSwitchOpcode {
                    pc: scan,
                    opcode: line[0],
                })
            }
        }
    }
}

/// END_SWITCH: reached naturally at the end of a taken arm.
pub(super) fn handle_end_switch(thread: &mut ScriptThread) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    let level = thread.level();
    if level.loop_level < 0 {
        return Err(ScriptError::NoActiveLoop {
            pc,
            opcode: OP_END_SWITCH,
        });
    }
    level.loop_level -= 1;
    Ok(Flow::Continue)
}

/// GOTO: never applied; the encoded jump loops rooms forever on real data.
pub(super) fn handle_goto(inst: &Goto, thread: &ScriptThread) -> Flow {
    log::warn!(
        "GOTO at pc {:#06x} ignored (offset {})",
        thread.pc,
        inst.offset
    );
    Flow::Continue
}

/// GOSUB: call an event routine one sub-level deeper.
pub(super) fn handle_gosub(
    inst: &Gosub,
    thread: &mut ScriptThread,
    script: &ScriptFunction,
) -> Result<Flow, ScriptError> {
    let pc = thread.pc;
    if thread.sub_level + 1 >= SUB_LEVELS {
        return Err(ScriptError::SubroutineDepthExceeded { pc });
    }
    let event = inst.event as usize;
    let entry = script
        .entry(event)
        .ok_or(ScriptError::BadEventIndex { pc, event })?;

    thread.levels[thread.sub_level].return_address = pc + bytecode::instruction_size(OP_GOSUB);
    thread.levels[thread.sub_level + 1].if_else_counter = -1;
    thread.levels[thread.sub_level + 1].loop_level = -1;
    thread.stack_index = 0;
    thread.sub_level += 1;

    thread.pc = entry;
    thread.override_pc = true;
    Ok(Flow::Continue)
}

/// CHECK: test one flag bit against the expected value.
pub(super) fn handle_check(inst: &BitTest, world: &dyn World) -> Flow {
    if world.bit(inst.bit_array as usize, inst.bit_number as usize) == inst.value {
        Flow::Continue
    } else {
        Flow::CondFalse
    }
}

/// SET_BIT: clear (0), set (1), or flip (7) one flag bit.
pub(super) fn handle_set_bit(
    inst: &SetBit,
    pc: usize,
    world: &mut dyn World,
) -> Result<Flow, ScriptError> {
    let bit_array = inst.bit_array as usize;
    let bit_number = inst.bit_number as usize;
    match inst.operation {
        0 => world.set_bit(bit_array, bit_number, 0),
        1 => world.set_bit(bit_array, bit_number, 1),
        7 => {
            let current = world.bit(bit_array, bit_number);
            world.set_bit(bit_array, bit_number, current ^ 1);
        }
        operation => return Err(ScriptError::InvalidBitOp { pc, operation }),
    }
    Ok(Flow::Continue)
}

// Comparison semantics have not been recovered from the original game;
// both predicates are decoded and treated as true.

pub(super) fn handle_compare(_inst: &Compare) -> Flow {
    Flow::Continue
}

pub(super) fn handle_member_compare(_inst: &Compare) -> Flow {
    Flow::Continue
}

/// WORK_SET: select the entity that member/position writes target.
pub(super) fn handle_work_set(inst: &WorkSet, thread: &mut ScriptThread) -> Flow {
    thread.work_kind = inst.component;
    thread.work_index = inst.index as usize;
    Flow::Continue
}
