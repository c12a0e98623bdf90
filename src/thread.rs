//! Per-thread interpreter state.
//!
//! A room script runs as a bank of cooperative threads, each with its own
//! program counter and two orthogonal nesting stacks: sub-routine levels
//! (GOSUB/EVT_END) and, per level, a stack of pending if/else join points
//! plus a small bank of loop frames (FOR, SLEEP, SWITCH). All of these are
//! fixed-size; the bytecode format was designed around these exact bounds
//! and the arrays must not grow past them.

/// Number of sub-routine levels a thread can nest.
pub const SUB_LEVELS: usize = 4;
/// Depth of the per-level if/else join-point stack.
pub const JOIN_STACK_DEPTH: usize = 8;
/// Number of loop frames available per sub-routine level.
pub const LOOP_FRAMES: usize = 4;

/// One active loop scope (FOR iteration, SLEEP countdown, or SWITCH body).
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopState {
    /// Remaining iterations (FOR) or remaining ticks (SLEEP). Signed: a
    /// SLEEPING decrement happens before the zero test, so a zero count
    /// wraps negative and keeps sleeping.
    pub counter: i32,
    /// Where BREAK (or natural FOR/SWITCH exit) resumes.
    pub break_pc: usize,
    /// First instruction of the loop body, for FOR_END back-edges.
    pub start_pc: usize,
    /// `if_else_counter` captured on loop entry, restored by BREAK.
    pub saved_if_counter: i32,
}

/// Control-flow state for one sub-routine level.
#[derive(Debug, Clone, Copy)]
pub struct LevelState {
    /// Depth of pending if/else joins at this level. −1 marks the level
    /// inert: a control-flow break here terminates the thread step instead
    /// of popping a join point.
    pub if_else_counter: i32,
    /// Index of the active loop frame, −1 when no loop is open.
    pub loop_level: i32,
    /// Resume point once the sub-routine called from this level returns.
    pub return_address: usize,
    /// Join PCs pushed by IF_START, popped by ELSE_START/END_IF or the
    /// stepper's conditional-false reconciliation.
    pub join_stack: [usize; JOIN_STACK_DEPTH],
    pub loops: [LoopState; LOOP_FRAMES],
}

impl Default for LevelState {
    fn default() -> Self {
        LevelState {
            if_else_counter: 0,
            loop_level: 0,
            return_address: 0,
            join_stack: [0; JOIN_STACK_DEPTH],
            loops: [LoopState::default(); LOOP_FRAMES],
        }
    }
}

/// One cooperative script thread.
#[derive(Debug, Clone)]
pub struct ScriptThread {
    /// Whether the scheduler steps this thread.
    pub running: bool,
    /// Workset component selected by WORK_SET (player/enemy/object).
    pub work_kind: u8,
    /// Entity index the workset targets.
    pub work_index: usize,
    /// Byte offset of the next instruction.
    pub pc: usize,
    /// Number of join PCs pushed at the current sub-level.
    pub stack_index: usize,
    /// Current sub-routine depth, `0..SUB_LEVELS`.
    pub sub_level: usize,
    pub levels: [LevelState; SUB_LEVELS],
    /// One-shot: a handler took over the PC, skip the default advance.
    pub override_pc: bool,
}

impl ScriptThread {
    pub fn new() -> ScriptThread {
        let mut thread = ScriptThread {
            running: false,
            work_kind: 0,
            work_index: 0,
            pc: 0,
            stack_index: 0,
            sub_level: 0,
            levels: [LevelState::default(); SUB_LEVELS],
            override_pc: false,
        };
        thread.levels[0].if_else_counter = -1;
        thread.levels[0].loop_level = -1;
        thread
    }

    /// Return the thread to its post-construction state.
    pub fn reset(&mut self) {
        *self = ScriptThread::new();
    }

    /// Shorthand for the level state at the current sub-routine depth.
    pub fn level(&mut self) -> &mut LevelState {
        &mut self.levels[self.sub_level]
    }
}

impl Default for ScriptThread {
    fn default() -> Self {
        ScriptThread::new()
    }
}
