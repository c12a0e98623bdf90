//! # Room Script Runtime
//!
//! A virtual machine for the compiled event bytecode that drives per-room
//! logic in a classic survival-horror engine. Each room's script blob holds
//! many event routines; at room entry several of them are started as
//! cooperative threads that all step on one fixed 30 Hz clock, decoding a
//! one-byte-opcode ISA with structured conditionals, loops, sleeps, switch
//! dispatch, and sub-routine calls.
//!
//! ## High-level model
//! - [`bytecode`]: the ISA: opcode bytes, per-opcode sizes, payload
//!   layouts, and the little-endian decoder.
//! - [`thread`]: per-thread control-flow state (PC, sub-routine levels,
//!   if/else join stacks, loop frames, workset selector).
//! - [`world`]: the adapter trait through which handlers touch the game
//!   and renderer; the VM itself owns no game state.
//! - [`vm`]: the scheduler and stepper tying it together.
//!
//! The host feeds elapsed wall time into [`ScriptVm::tick`]; the VM fires
//! at most one round of thread steps per 1/30 s and applies side effects
//! through the [`World`] it is handed. Malformed bytecode halts the machine
//! with a logged diagnostic rather than propagating errors into the host's
//! frame loop.

pub mod bytecode;
pub mod error;
pub mod thread;
pub mod vm;
pub mod world;

pub use bytecode::{decode, instruction_size, Instr, ScriptFunction};
pub use error::ScriptError;
pub use thread::ScriptThread;
pub use vm::{ScriptVm, FRAMES_PER_SECOND, THREAD_COUNT};
pub use world::World;
