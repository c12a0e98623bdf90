//! # Room Script Bytecode Format & Decoder
//!
//! This module defines the **instruction set** of the room script ISA, the
//! **instruction-size table**, and a **binary decoder** that turns the raw
//! bytes of one instruction into a typed [`Instr`] the VM can dispatch on.
//!
//! ## Binary layout (little-endian)
//! A room ships one compiled script blob per player scenario. An external
//! loader splits the blob into a map from byte offset to instruction record
//! (first byte = opcode, remaining bytes = payload) plus an ordered table of
//! event entry points; both arrive here as a [`ScriptFunction`].
//!
//! All multi-byte operands are little-endian. Every opcode has a fixed
//! encoded length, published in [`instruction_size`]; the VM advances the
//! program counter by that length unless a handler overrides it.
//!
//! ## The SLEEP/SLEEPING pair
//! `SLEEP` encodes as `[0x09, 0x0A, count_lo, count_hi]`: its second byte is
//! the `SLEEPING` opcode. The VM advances the PC by exactly one byte after
//! `SLEEP`, so the next fetch lands on a well-formed 3-byte `SLEEPING`
//! instruction sharing the count operand. Loaders publish an instruction-map
//! entry at that interior offset.
//!
//! ## Unknown opcodes
//! Decoding never fails: bytes the VM has no handler for decode to
//! [`Instr::Unknown`] and are stepped over by their declared size. Sizes are
//! declared for the full known ISA (0x00..=0x6F); bytes past it fall back to
//! a one-byte size so the machine cannot wedge on a stray opcode.

use std::collections::HashMap;

use once_cell::sync::Lazy;

//
// --- Opcode bytes -----------------------------------------------------------
//

pub const OP_NOP: u8 = 0x00;
pub const OP_EVT_END: u8 = 0x01;
pub const OP_EVT_EXEC: u8 = 0x04;
pub const OP_IF_START: u8 = 0x06;
pub const OP_ELSE_START: u8 = 0x07;
pub const OP_END_IF: u8 = 0x08;
pub const OP_SLEEP: u8 = 0x09;
pub const OP_SLEEPING: u8 = 0x0a;
pub const OP_FOR: u8 = 0x0d;
pub const OP_FOR_END: u8 = 0x0e;
pub const OP_SWITCH: u8 = 0x13;
pub const OP_CASE: u8 = 0x14;
pub const OP_DEFAULT: u8 = 0x15;
pub const OP_END_SWITCH: u8 = 0x16;
pub const OP_GOTO: u8 = 0x17;
pub const OP_GOSUB: u8 = 0x18;
pub const OP_BREAK: u8 = 0x1a;
pub const OP_CHECK: u8 = 0x21;
pub const OP_SET_BIT: u8 = 0x22;
pub const OP_COMPARE: u8 = 0x23;
pub const OP_CUT_CHG: u8 = 0x29;
pub const OP_AOT_SET: u8 = 0x2c;
pub const OP_OBJ_MODEL_SET: u8 = 0x2d;
pub const OP_WORK_SET: u8 = 0x2e;
pub const OP_POS_SET: u8 = 0x32;
pub const OP_MEMBER_SET: u8 = 0x34;
pub const OP_SCA_ID_SET: u8 = 0x37;
pub const OP_SCE_ESPR_ON: u8 = 0x3a;
pub const OP_DOOR_AOT_SET: u8 = 0x3b;
pub const OP_MEMBER_CMP: u8 = 0x3e;
pub const OP_PLC_MOTION: u8 = 0x3f;
pub const OP_PLC_DEST: u8 = 0x40;
pub const OP_PLC_NECK: u8 = 0x41;
pub const OP_SCE_EM_SET: u8 = 0x44;
pub const OP_AOT_RESET: u8 = 0x46;
pub const OP_SCE_ESPR_KILL: u8 = 0x4c;
pub const OP_ITEM_AOT_SET: u8 = 0x4e;
pub const OP_SCE_BGM_CONTROL: u8 = 0x51;
pub const OP_AOT_SET_4P: u8 = 0x67;
pub const OP_DOOR_AOT_SET_4P: u8 = 0x68;
pub const OP_ITEM_AOT_SET_4P: u8 = 0x69;

//
// --- Instruction sizes ------------------------------------------------------
//

/// Encoded byte length of every known opcode, opcode byte included.
///
/// Entries cover the full ISA, handled or not, so the default PC advance can
/// step over instructions the VM treats as no-ops.
const SIZES: &[(u8, usize)] = &[
    (0x00, 1),
    (0x01, 1),
    (0x02, 1),
    (0x03, 4),
    (0x04, 4),
    (0x05, 2),
    (0x06, 4),
    (0x07, 4),
    (0x08, 2),
    (0x09, 4),
    (0x0a, 3),
    (0x0b, 1),
    (0x0c, 1),
    (0x0d, 6),
    (0x0e, 2),
    (0x0f, 4),
    (0x10, 2),
    (0x11, 4),
    (0x12, 2),
    (0x13, 4),
    (0x14, 6),
    (0x15, 2),
    (0x16, 2),
    (0x17, 6),
    (0x18, 2),
    (0x19, 2),
    (0x1a, 2),
    (0x1b, 6),
    (0x1c, 1),
    (0x1d, 4),
    (0x1e, 1),
    (0x1f, 1),
    (0x20, 1),
    (0x21, 4),
    (0x22, 4),
    (0x23, 6),
    (0x24, 4),
    (0x25, 3),
    (0x26, 6),
    (0x27, 4),
    (0x28, 1),
    (0x29, 2),
    (0x2a, 1),
    (0x2b, 6),
    (0x2c, 20),
    (0x2d, 38),
    (0x2e, 3),
    (0x2f, 4),
    (0x30, 1),
    (0x31, 1),
    (0x32, 8),
    (0x33, 8),
    (0x34, 4),
    (0x35, 3),
    (0x36, 12),
    (0x37, 4),
    (0x38, 3),
    (0x39, 8),
    (0x3a, 16),
    (0x3b, 32),
    (0x3c, 2),
    (0x3d, 3),
    (0x3e, 6),
    (0x3f, 4),
    (0x40, 8),
    (0x41, 10),
    (0x42, 1),
    (0x43, 4),
    (0x44, 22),
    (0x45, 6),
    (0x46, 10),
    (0x47, 2),
    (0x48, 16),
    (0x49, 10),
    (0x4a, 2),
    (0x4b, 3),
    (0x4c, 5),
    (0x4d, 22),
    (0x4e, 22),
    (0x4f, 4),
    (0x50, 4),
    (0x51, 6),
    (0x52, 6),
    (0x53, 6),
    (0x54, 22),
    (0x55, 6),
    (0x56, 4),
    (0x57, 8),
    (0x58, 4),
    (0x59, 4),
    (0x5a, 2),
    (0x5b, 2),
    (0x5c, 3),
    (0x5d, 2),
    (0x5e, 2),
    (0x5f, 2),
    (0x60, 14),
    (0x61, 4),
    (0x62, 2),
    (0x63, 1),
    (0x64, 16),
    (0x65, 2),
    (0x66, 1),
    (0x67, 28),
    (0x68, 40),
    (0x69, 30),
    (0x6a, 6),
    (0x6b, 4),
    (0x6c, 1),
    (0x6d, 4),
    (0x6e, 6),
    (0x6f, 2),
];

static INSTRUCTION_SIZE: Lazy<[usize; 256]> = Lazy::new(|| {
    let mut table = [1usize; 256];
    for &(opcode, size) in SIZES {
        table[opcode as usize] = size;
    }
    table
});

/// Encoded length of `opcode` in bytes. Never zero.
pub fn instruction_size(opcode: u8) -> usize {
    INSTRUCTION_SIZE[opcode as usize]
}

//
// --- Script program ---------------------------------------------------------
//

/// One room's compiled script, as produced by an external loader.
///
/// `instructions` maps the byte offset of each instruction to its raw bytes
/// (first byte = opcode). `event_entry` maps event numbers to the offset of
/// that event routine's first instruction.
#[derive(Clone, Default)]
pub struct ScriptFunction {
    pub instructions: HashMap<usize, Vec<u8>>,
    pub event_entry: Vec<usize>,
}

impl ScriptFunction {
    /// Entry PC of event routine `event`, if the table has one.
    pub fn entry(&self, event: usize) -> Option<usize> {
        self.event_entry.get(event).copied()
    }
}

//
// --- Decoded payloads -------------------------------------------------------
//

#[derive(Debug, Clone, Copy)]
pub struct EvtExec {
    pub thread_num: u8,
    pub ex_opcode: u8,
    pub event: u8,
}

/// Shared layout of IF_START and ELSE_START.
#[derive(Debug, Clone, Copy)]
pub struct BlockLength {
    pub block_length: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Sleep {
    pub count: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct ForStart {
    pub block_length: u16,
    pub count: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Switch {
    pub var_id: u8,
    pub block_length: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Case {
    pub block_length: u16,
    pub value: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Goto {
    pub if_else_counter: i8,
    pub loop_level: i8,
    pub offset: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct Gosub {
    pub event: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct BitTest {
    pub bit_array: u8,
    pub bit_number: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct SetBit {
    pub bit_array: u8,
    pub bit_number: u8,
    pub operation: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Compare {
    pub flag: u8,
    pub operator: u8,
    pub value: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct CutChg {
    pub camera_id: u8,
}

/// Rectangular area-of-trigger placement.
#[derive(Debug, Clone, Copy)]
pub struct AotSet {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x: i16,
    pub z: i16,
    pub width: i16,
    pub depth: i16,
    pub data: [u8; 6],
}

/// Four-corner area-of-trigger placement.
#[derive(Debug, Clone, Copy)]
pub struct AotSet4p {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x1: i16,
    pub z1: i16,
    pub x2: i16,
    pub z2: i16,
    pub x3: i16,
    pub z3: i16,
    pub x4: i16,
    pub z4: i16,
    pub data: [u8; 6],
}

#[derive(Debug, Clone, Copy)]
pub struct DoorAotSet {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x: i16,
    pub z: i16,
    pub width: i16,
    pub depth: i16,
    pub next_x: i16,
    pub next_y: i16,
    pub next_z: i16,
    pub next_dir: i16,
    pub stage: u8,
    pub room: u8,
    pub camera: u8,
    pub next_floor: u8,
    pub texture_kind: u8,
    pub door_kind: u8,
    pub knock_kind: u8,
    pub key_id: u8,
    pub key_kind: u8,
    pub free: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct DoorAotSet4p {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x1: i16,
    pub z1: i16,
    pub x2: i16,
    pub z2: i16,
    pub x3: i16,
    pub z3: i16,
    pub x4: i16,
    pub z4: i16,
    pub next_x: i16,
    pub next_y: i16,
    pub next_z: i16,
    pub next_dir: i16,
    pub stage: u8,
    pub room: u8,
    pub camera: u8,
    pub next_floor: u8,
    pub texture_kind: u8,
    pub door_kind: u8,
    pub knock_kind: u8,
    pub key_id: u8,
    pub key_kind: u8,
    pub free: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemAotSet {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x: i16,
    pub z: i16,
    pub width: i16,
    pub depth: i16,
    pub item_id: u16,
    pub amount: u16,
    pub picked_flag: u16,
    pub md1_model_id: u8,
    pub action: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemAotSet4p {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub floor: u8,
    pub super_flag: u8,
    pub x1: i16,
    pub z1: i16,
    pub x2: i16,
    pub z2: i16,
    pub x3: i16,
    pub z3: i16,
    pub x4: i16,
    pub z4: i16,
    pub item_id: u16,
    pub amount: u16,
    pub picked_flag: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct AotReset {
    pub aot: u8,
    pub kind: u8,
    pub sat: u8,
    pub data: [u8; 6],
}

#[derive(Debug, Clone, Copy)]
pub struct ObjModelSet {
    pub object_index: u8,
    pub object_id: u8,
    pub counter: u8,
    pub wait: u8,
    pub num: u8,
    pub floor: u8,
    pub flag0: u8,
    pub kind: u16,
    pub flag1: u16,
    pub attribute: i16,
    pub position: [i16; 3],
    pub direction: [i16; 3],
    pub offset: [i16; 3],
    pub dimension: [u16; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct WorkSet {
    pub component: u8,
    pub index: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PosSet {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct MemberSet {
    pub member_index: u8,
    pub value: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct ScaIdSet {
    pub id: u8,
    pub flag: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct SceEsprOn {
    pub id: u8,
    pub kind: u8,
    pub work: u16,
    pub unknown: u16,
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub dir_y: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct SceEsprKill {
    pub id: u8,
    pub kind: u8,
    pub work_kind: u8,
    pub work_index: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct SceEmSet {
    pub aot: u8,
    pub id: u8,
    pub kind: u16,
    pub floor: u8,
    pub sound_flag: u8,
    pub model_kind: u8,
    pub em_flag: u8,
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub dir_y: i16,
    pub motion: u16,
    pub flag: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct SceBgmControl {
    pub id: u8,
    pub op: u8,
    pub kind: u8,
    pub left_volume: u8,
    pub right_volume: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PlcMotion {
    pub motion_id: u8,
    pub mode: u8,
    pub param: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PlcDest {
    pub animation: u8,
    pub form: u8,
    pub x: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct PlcNeck {
    pub op: u8,
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub speed: [i8; 2],
}

//
// --- Instruction enum -------------------------------------------------------
//

/// One decoded instruction, ready for dispatch.
///
/// Opcodes the VM executes get a variant carrying their decoded payload;
/// everything else decodes to [`Instr::Unknown`] and is stepped over.
#[derive(Debug, Clone, Copy)]
pub enum Instr {
    EvtEnd,
    EvtExec(EvtExec),
    IfStart(BlockLength),
    ElseStart(BlockLength),
    EndIf,
    Sleep(Sleep),
    Sleeping(Sleep),
    ForStart(ForStart),
    ForEnd,
    Switch(Switch),
    Case(Case),
    Default,
    EndSwitch,
    Goto(Goto),
    Gosub(Gosub),
    Break,
    Check(BitTest),
    SetBit(SetBit),
    Compare(Compare),
    MemberCmp(Compare),
    CutChg(CutChg),
    AotSet(AotSet),
    AotSet4p(AotSet4p),
    DoorAotSet(DoorAotSet),
    DoorAotSet4p(DoorAotSet4p),
    ItemAotSet(ItemAotSet),
    ItemAotSet4p(ItemAotSet4p),
    AotReset(AotReset),
    ObjModelSet(ObjModelSet),
    WorkSet(WorkSet),
    PosSet(PosSet),
    MemberSet(MemberSet),
    ScaIdSet(ScaIdSet),
    SceEsprOn(SceEsprOn),
    SceEsprKill(SceEsprKill),
    SceEmSet(SceEmSet),
    SceBgmControl(SceBgmControl),
    PlcMotion(PlcMotion),
    PlcDest(PlcDest),
    PlcNeck(PlcNeck),
    Unknown(u8),
}

//
// --- Little-endian readers --------------------------------------------------
//

// Instruction records come from the loader pre-sliced to their declared
// size, so the readers index directly. A record shorter than its opcode's
// layout is loader breakage, not script data the VM can reason about.

fn read_u8(data: &[u8], idx: &mut usize) -> u8 {
    let v = data[*idx];
    *idx += 1;
    v
}

fn read_i8(data: &[u8], idx: &mut usize) -> i8 {
    read_u8(data, idx) as i8
}

fn read_u16(data: &[u8], idx: &mut usize) -> u16 {
    let bytes: [u8; 2] = data[*idx..*idx + 2].try_into().unwrap();
    *idx += 2;
    u16::from_le_bytes(bytes)
}

fn read_i16(data: &[u8], idx: &mut usize) -> i16 {
    read_u16(data, idx) as i16
}

fn read_data6(data: &[u8], idx: &mut usize) -> [u8; 6] {
    let bytes: [u8; 6] = data[*idx..*idx + 6].try_into().unwrap();
    *idx += 6;
    bytes
}

fn read_i16_3(data: &[u8], idx: &mut usize) -> [i16; 3] {
    [
        read_i16(data, idx),
        read_i16(data, idx),
        read_i16(data, idx),
    ]
}

//
// --- Decoder ----------------------------------------------------------------
//

/// Decode the raw bytes of one instruction (first byte = opcode).
pub fn decode(line: &[u8]) -> Instr {
    let opcode = line[0];
    let mut idx = 1;
    let data = line;
    match opcode {
        OP_EVT_END => Instr::EvtEnd,
        OP_EVT_EXEC => Instr::EvtExec(EvtExec {
            thread_num: read_u8(data, &mut idx),
            ex_opcode: read_u8(data, &mut idx),
            event: read_u8(data, &mut idx),
        }),
        OP_IF_START => {
            idx += 1; // alignment byte
            Instr::IfStart(BlockLength {
                block_length: read_u16(data, &mut idx),
            })
        }
        OP_ELSE_START => {
            idx += 1;
            Instr::ElseStart(BlockLength {
                block_length: read_u16(data, &mut idx),
            })
        }
        OP_END_IF => Instr::EndIf,
        OP_SLEEP => {
            idx += 1; // embedded SLEEPING opcode
            Instr::Sleep(Sleep {
                count: read_u16(data, &mut idx),
            })
        }
        OP_SLEEPING => Instr::Sleeping(Sleep {
            count: read_u16(data, &mut idx),
        }),
        OP_FOR => {
            idx += 1;
            Instr::ForStart(ForStart {
                block_length: read_u16(data, &mut idx),
                count: read_u16(data, &mut idx),
            })
        }
        OP_FOR_END => Instr::ForEnd,
        OP_SWITCH => Instr::Switch(Switch {
            var_id: read_u8(data, &mut idx),
            block_length: read_u16(data, &mut idx),
        }),
        OP_CASE => {
            idx += 1;
            Instr::Case(Case {
                block_length: read_u16(data, &mut idx),
                value: read_u16(data, &mut idx),
            })
        }
        OP_DEFAULT => Instr::Default,
        OP_END_SWITCH => Instr::EndSwitch,
        OP_GOTO => {
            let if_else_counter = read_i8(data, &mut idx);
            let loop_level = read_i8(data, &mut idx);
            idx += 1;
            Instr::Goto(Goto {
                if_else_counter,
                loop_level,
                offset: read_i16(data, &mut idx),
            })
        }
        OP_GOSUB => Instr::Gosub(Gosub {
            event: read_u8(data, &mut idx),
        }),
        OP_BREAK => Instr::Break,
        OP_CHECK => Instr::Check(BitTest {
            bit_array: read_u8(data, &mut idx),
            bit_number: read_u8(data, &mut idx),
            value: read_u8(data, &mut idx),
        }),
        OP_SET_BIT => Instr::SetBit(SetBit {
            bit_array: read_u8(data, &mut idx),
            bit_number: read_u8(data, &mut idx),
            operation: read_u8(data, &mut idx),
        }),
        OP_COMPARE => {
            idx += 1;
            Instr::Compare(Compare {
                flag: read_u8(data, &mut idx),
                operator: read_u8(data, &mut idx),
                value: read_u16(data, &mut idx),
            })
        }
        OP_MEMBER_CMP => {
            idx += 1;
            Instr::MemberCmp(Compare {
                flag: read_u8(data, &mut idx),
                operator: read_u8(data, &mut idx),
                value: read_u16(data, &mut idx),
            })
        }
        OP_CUT_CHG => Instr::CutChg(CutChg {
            camera_id: read_u8(data, &mut idx),
        }),
        OP_AOT_SET => Instr::AotSet(AotSet {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x: read_i16(data, &mut idx),
            z: read_i16(data, &mut idx),
            width: read_i16(data, &mut idx),
            depth: read_i16(data, &mut idx),
            data: read_data6(data, &mut idx),
        }),
        OP_AOT_SET_4P => Instr::AotSet4p(AotSet4p {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x1: read_i16(data, &mut idx),
            z1: read_i16(data, &mut idx),
            x2: read_i16(data, &mut idx),
            z2: read_i16(data, &mut idx),
            x3: read_i16(data, &mut idx),
            z3: read_i16(data, &mut idx),
            x4: read_i16(data, &mut idx),
            z4: read_i16(data, &mut idx),
            data: read_data6(data, &mut idx),
        }),
        OP_DOOR_AOT_SET => Instr::DoorAotSet(DoorAotSet {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x: read_i16(data, &mut idx),
            z: read_i16(data, &mut idx),
            width: read_i16(data, &mut idx),
            depth: read_i16(data, &mut idx),
            next_x: read_i16(data, &mut idx),
            next_y: read_i16(data, &mut idx),
            next_z: read_i16(data, &mut idx),
            next_dir: read_i16(data, &mut idx),
            stage: read_u8(data, &mut idx),
            room: read_u8(data, &mut idx),
            camera: read_u8(data, &mut idx),
            next_floor: read_u8(data, &mut idx),
            texture_kind: read_u8(data, &mut idx),
            door_kind: read_u8(data, &mut idx),
            knock_kind: read_u8(data, &mut idx),
            key_id: read_u8(data, &mut idx),
            key_kind: read_u8(data, &mut idx),
            free: read_u8(data, &mut idx),
        }),
        OP_DOOR_AOT_SET_4P => Instr::DoorAotSet4p(DoorAotSet4p {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x1: read_i16(data, &mut idx),
            z1: read_i16(data, &mut idx),
            x2: read_i16(data, &mut idx),
            z2: read_i16(data, &mut idx),
            x3: read_i16(data, &mut idx),
            z3: read_i16(data, &mut idx),
            x4: read_i16(data, &mut idx),
            z4: read_i16(data, &mut idx),
            next_x: read_i16(data, &mut idx),
            next_y: read_i16(data, &mut idx),
            next_z: read_i16(data, &mut idx),
            next_dir: read_i16(data, &mut idx),
            stage: read_u8(data, &mut idx),
            room: read_u8(data, &mut idx),
            camera: read_u8(data, &mut idx),
            next_floor: read_u8(data, &mut idx),
            texture_kind: read_u8(data, &mut idx),
            door_kind: read_u8(data, &mut idx),
            knock_kind: read_u8(data, &mut idx),
            key_id: read_u8(data, &mut idx),
            key_kind: read_u8(data, &mut idx),
            free: read_u8(data, &mut idx),
        }),
        OP_ITEM_AOT_SET => Instr::ItemAotSet(ItemAotSet {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x: read_i16(data, &mut idx),
            z: read_i16(data, &mut idx),
            width: read_i16(data, &mut idx),
            depth: read_i16(data, &mut idx),
            item_id: read_u16(data, &mut idx),
            amount: read_u16(data, &mut idx),
            picked_flag: read_u16(data, &mut idx),
            md1_model_id: read_u8(data, &mut idx),
            action: read_u8(data, &mut idx),
        }),
        OP_ITEM_AOT_SET_4P => Instr::ItemAotSet4p(ItemAotSet4p {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            super_flag: read_u8(data, &mut idx),
            x1: read_i16(data, &mut idx),
            z1: read_i16(data, &mut idx),
            x2: read_i16(data, &mut idx),
            z2: read_i16(data, &mut idx),
            x3: read_i16(data, &mut idx),
            z3: read_i16(data, &mut idx),
            x4: read_i16(data, &mut idx),
            z4: read_i16(data, &mut idx),
            item_id: read_u16(data, &mut idx),
            amount: read_u16(data, &mut idx),
            picked_flag: read_u16(data, &mut idx),
        }),
        OP_AOT_RESET => Instr::AotReset(AotReset {
            aot: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            sat: read_u8(data, &mut idx),
            data: read_data6(data, &mut idx),
        }),
        OP_OBJ_MODEL_SET => Instr::ObjModelSet(ObjModelSet {
            object_index: read_u8(data, &mut idx),
            object_id: read_u8(data, &mut idx),
            counter: read_u8(data, &mut idx),
            wait: read_u8(data, &mut idx),
            num: read_u8(data, &mut idx),
            floor: read_u8(data, &mut idx),
            flag0: read_u8(data, &mut idx),
            kind: read_u16(data, &mut idx),
            flag1: read_u16(data, &mut idx),
            attribute: read_i16(data, &mut idx),
            position: read_i16_3(data, &mut idx),
            direction: read_i16_3(data, &mut idx),
            offset: read_i16_3(data, &mut idx),
            dimension: [
                read_u16(data, &mut idx),
                read_u16(data, &mut idx),
                read_u16(data, &mut idx),
            ],
        }),
        OP_WORK_SET => Instr::WorkSet(WorkSet {
            component: read_u8(data, &mut idx),
            index: read_u8(data, &mut idx),
        }),
        OP_POS_SET => {
            idx += 1;
            Instr::PosSet(PosSet {
                x: read_i16(data, &mut idx),
                y: read_i16(data, &mut idx),
                z: read_i16(data, &mut idx),
            })
        }
        OP_MEMBER_SET => Instr::MemberSet(MemberSet {
            member_index: read_u8(data, &mut idx),
            value: read_u16(data, &mut idx),
        }),
        OP_SCA_ID_SET => Instr::ScaIdSet(ScaIdSet {
            id: read_u8(data, &mut idx),
            flag: read_u16(data, &mut idx),
        }),
        OP_SCE_ESPR_ON => {
            idx += 1;
            Instr::SceEsprOn(SceEsprOn {
                id: read_u8(data, &mut idx),
                kind: read_u8(data, &mut idx),
                work: read_u16(data, &mut idx),
                unknown: read_u16(data, &mut idx),
                x: read_i16(data, &mut idx),
                y: read_i16(data, &mut idx),
                z: read_i16(data, &mut idx),
                dir_y: read_u16(data, &mut idx),
            })
        }
        OP_SCE_ESPR_KILL => Instr::SceEsprKill(SceEsprKill {
            id: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            work_kind: read_u8(data, &mut idx),
            work_index: read_u8(data, &mut idx),
        }),
        OP_SCE_EM_SET => {
            idx += 1;
            Instr::SceEmSet(SceEmSet {
                aot: read_u8(data, &mut idx),
                id: read_u8(data, &mut idx),
                kind: read_u16(data, &mut idx),
                floor: read_u8(data, &mut idx),
                sound_flag: read_u8(data, &mut idx),
                model_kind: read_u8(data, &mut idx),
                em_flag: read_u8(data, &mut idx),
                x: read_i16(data, &mut idx),
                y: read_i16(data, &mut idx),
                z: read_i16(data, &mut idx),
                dir_y: read_i16(data, &mut idx),
                motion: read_u16(data, &mut idx),
                flag: read_u16(data, &mut idx),
            })
        }
        OP_SCE_BGM_CONTROL => Instr::SceBgmControl(SceBgmControl {
            id: read_u8(data, &mut idx),
            op: read_u8(data, &mut idx),
            kind: read_u8(data, &mut idx),
            left_volume: read_u8(data, &mut idx),
            right_volume: read_u8(data, &mut idx),
        }),
        OP_PLC_MOTION => Instr::PlcMotion(PlcMotion {
            motion_id: read_u8(data, &mut idx),
            mode: read_u8(data, &mut idx),
            param: read_u8(data, &mut idx),
        }),
        OP_PLC_DEST => {
            idx += 1;
            Instr::PlcDest(PlcDest {
                animation: read_u8(data, &mut idx),
                form: read_u8(data, &mut idx),
                x: read_i16(data, &mut idx),
                z: read_i16(data, &mut idx),
            })
        }
        OP_PLC_NECK => Instr::PlcNeck(PlcNeck {
            op: read_u8(data, &mut idx),
            x: read_i16(data, &mut idx),
            y: read_i16(data, &mut idx),
            z: read_i16(data, &mut idx),
            speed: [read_i8(data, &mut idx), read_i8(data, &mut idx)],
        }),
        other => Instr::Unknown(other),
    }
}
