use super::*;
use std::collections::HashMap;

use crate::bytecode::{
    instruction_size, AotReset, AotSet, AotSet4p, DoorAotSet, DoorAotSet4p, ItemAotSet,
    ItemAotSet4p, ObjModelSet, SceBgmControl, SceEsprKill, SceEsprOn, ScriptFunction, OP_AOT_RESET,
    OP_AOT_SET, OP_BREAK, OP_CASE, OP_CHECK, OP_CUT_CHG, OP_DEFAULT, OP_DOOR_AOT_SET,
    OP_ELSE_START, OP_END_IF, OP_END_SWITCH, OP_EVT_END, OP_EVT_EXEC, OP_FOR, OP_FOR_END, OP_GOSUB,
    OP_GOTO, OP_IF_START, OP_ITEM_AOT_SET, OP_MEMBER_SET, OP_OBJ_MODEL_SET, OP_POS_SET,
    OP_SCA_ID_SET, OP_SCE_BGM_CONTROL, OP_SCE_ESPR_KILL, OP_SCE_ESPR_ON, OP_SET_BIT, OP_SLEEP,
    OP_SLEEPING, OP_SWITCH, OP_WORK_SET,
};
use crate::thread::{JOIN_STACK_DEPTH, LOOP_FRAMES, SUB_LEVELS};
use crate::world::{World, SCE_ITEM, WORK_OBJECT, WORK_PLAYER};

/// Comfortably past one 30 Hz period.
const TICK: f64 = 0.04;

//
// --- Test world -------------------------------------------------------------
//

#[derive(Default)]
struct TestWorld {
    bits: HashMap<(usize, usize), u8>,
    vars: HashMap<usize, i32>,
    camera: Option<usize>,
    player_position: Option<(f32, f32, f32)>,
    player_heading: Option<f32>,
    object_headings: HashMap<usize, f32>,
    aots: Vec<u8>,
    door_aots: Vec<u8>,
    item_aots: Vec<u16>,
    aot_resets: Vec<u8>,
    models: Vec<u8>,
    removed_collision: Vec<usize>,
    sprites_on: Vec<u8>,
    sprites_killed: Vec<u8>,
    bgm_ops: Vec<u8>,
}

impl World for TestWorld {
    fn script_var(&self, id: usize) -> i32 {
        self.vars.get(&id).copied().unwrap_or(0)
    }

    fn bit(&self, bit_array: usize, bit_number: usize) -> u8 {
        self.bits.get(&(bit_array, bit_number)).copied().unwrap_or(0)
    }

    fn set_bit(&mut self, bit_array: usize, bit_number: usize, value: u8) {
        self.bits.insert((bit_array, bit_number), value);
    }

    fn change_camera(&mut self, camera_id: usize) {
        self.camera = Some(camera_id);
    }

    fn add_aot(&mut self, aot: &AotSet) {
        self.aots.push(aot.aot);
    }

    fn add_aot_4p(&mut self, aot: &AotSet4p) {
        self.aots.push(aot.aot);
    }

    fn add_door_aot(&mut self, door: &DoorAotSet) {
        self.door_aots.push(door.aot);
    }

    fn add_door_aot_4p(&mut self, door: &DoorAotSet4p) {
        self.door_aots.push(door.aot);
    }

    fn add_item_aot(&mut self, item: &ItemAotSet) {
        self.item_aots.push(item.item_id);
    }

    fn add_item_aot_4p(&mut self, item: &ItemAotSet4p) {
        self.item_aots.push(item.item_id);
    }

    fn reset_aot(&mut self, aot: &AotReset) {
        self.aot_resets.push(aot.aot);
    }

    fn set_player_position(&mut self, x: f32, y: f32, z: f32) {
        self.player_position = Some((x, y, z));
    }

    fn set_player_heading_degrees(&mut self, degrees: f32) {
        self.player_heading = Some(degrees);
    }

    fn set_object_heading_degrees(&mut self, object_index: usize, degrees: f32) {
        self.object_headings.insert(object_index, degrees);
    }

    fn set_item_entity_model(&mut self, model: &ObjModelSet) {
        self.models.push(model.object_index);
    }

    fn remove_collision_entity(&mut self, id: usize) {
        self.removed_collision.push(id);
    }

    fn add_sprite(&mut self, sprite: &SceEsprOn) {
        self.sprites_on.push(sprite.id);
    }

    fn kill_sprite(&mut self, sprite: &SceEsprKill) {
        self.sprites_killed.push(sprite.id);
    }

    fn bgm_control(&mut self, control: &SceBgmControl) {
        self.bgm_ops.push(control.op);
    }
}

//
// --- Script assembler -------------------------------------------------------
//

struct Assembler {
    script: ScriptFunction,
    pc: usize,
}

impl Assembler {
    fn new() -> Assembler {
        Assembler {
            script: ScriptFunction::default(),
            pc: 0,
        }
    }

    /// Mark the current offset as the next event's entry point.
    fn event(&mut self) {
        self.script.event_entry.push(self.pc);
    }

    fn emit(&mut self, bytes: Vec<u8>) {
        assert_eq!(
            bytes.len(),
            instruction_size(bytes[0]),
            "test encoding out of sync with the size table"
        );
        let len = bytes.len();
        self.script.instructions.insert(self.pc, bytes);
        self.pc += len;
    }

    /// SLEEP embeds the SLEEPING opcode at its second byte; publish the
    /// interior instruction the way a loader would.
    fn sleep(&mut self, count: u16) {
        let [lo, hi] = count.to_le_bytes();
        self.script
            .instructions
            .insert(self.pc, vec![OP_SLEEP, OP_SLEEPING, lo, hi]);
        self.script
            .instructions
            .insert(self.pc + 1, vec![OP_SLEEPING, lo, hi]);
        self.pc += instruction_size(OP_SLEEP);
    }

    fn finish(self) -> ScriptFunction {
        self.script
    }
}

fn le(v: u16) -> [u8; 2] {
    v.to_le_bytes()
}

fn evt_end() -> Vec<u8> {
    vec![OP_EVT_END]
}

fn evt_exec(thread_num: u8, event: u8) -> Vec<u8> {
    vec![OP_EVT_EXEC, thread_num, OP_GOSUB, event]
}

fn if_start(block_length: u16) -> Vec<u8> {
    let [lo, hi] = le(block_length);
    vec![OP_IF_START, 0, lo, hi]
}

fn else_start(block_length: u16) -> Vec<u8> {
    let [lo, hi] = le(block_length);
    vec![OP_ELSE_START, 0, lo, hi]
}

fn end_if() -> Vec<u8> {
    vec![OP_END_IF, 0]
}

fn for_start(count: u16, block_length: u16) -> Vec<u8> {
    let [bl, bh] = le(block_length);
    let [cl, ch] = le(count);
    vec![OP_FOR, 0, bl, bh, cl, ch]
}

fn for_end() -> Vec<u8> {
    vec![OP_FOR_END, 0]
}

fn switch(var_id: u8, block_length: u16) -> Vec<u8> {
    let [lo, hi] = le(block_length);
    vec![OP_SWITCH, var_id, lo, hi]
}

fn case(value: u16, block_length: u16) -> Vec<u8> {
    let [bl, bh] = le(block_length);
    let [vl, vh] = le(value);
    vec![OP_CASE, 0, bl, bh, vl, vh]
}

fn default_arm() -> Vec<u8> {
    vec![OP_DEFAULT, 0]
}

fn end_switch() -> Vec<u8> {
    vec![OP_END_SWITCH, 0]
}

fn break_loop() -> Vec<u8> {
    vec![OP_BREAK, 0]
}

fn goto(offset: i16) -> Vec<u8> {
    let [lo, hi] = offset.to_le_bytes();
    vec![OP_GOTO, 0, 0, 0, lo, hi]
}

fn gosub(event: u8) -> Vec<u8> {
    vec![OP_GOSUB, event]
}

fn check(bit_array: u8, bit_number: u8, value: u8) -> Vec<u8> {
    vec![OP_CHECK, bit_array, bit_number, value]
}

fn set_bit(bit_array: u8, bit_number: u8, operation: u8) -> Vec<u8> {
    vec![OP_SET_BIT, bit_array, bit_number, operation]
}

fn work_set(component: u8, index: u8) -> Vec<u8> {
    vec![OP_WORK_SET, component, index]
}

fn pos_set(x: i16, y: i16, z: i16) -> Vec<u8> {
    let mut bytes = vec![OP_POS_SET, 0];
    bytes.extend_from_slice(&x.to_le_bytes());
    bytes.extend_from_slice(&y.to_le_bytes());
    bytes.extend_from_slice(&z.to_le_bytes());
    bytes
}

fn member_set(member_index: u8, value: u16) -> Vec<u8> {
    let [lo, hi] = le(value);
    vec![OP_MEMBER_SET, member_index, lo, hi]
}

fn cut_chg(camera_id: u8) -> Vec<u8> {
    vec![OP_CUT_CHG, camera_id]
}

fn sca_id_set(id: u8, flag: u16) -> Vec<u8> {
    let [lo, hi] = le(flag);
    vec![OP_SCA_ID_SET, id, lo, hi]
}

fn aot_set(aot: u8) -> Vec<u8> {
    let mut bytes = vec![OP_AOT_SET, aot, 0, 0, 0, 0];
    bytes.resize(instruction_size(OP_AOT_SET), 0);
    bytes
}

fn door_aot_set(aot: u8) -> Vec<u8> {
    let mut bytes = vec![OP_DOOR_AOT_SET, aot, 1, 0, 0, 0];
    bytes.resize(instruction_size(OP_DOOR_AOT_SET), 0);
    bytes
}

fn item_aot_set(kind: u8, item_id: u16) -> Vec<u8> {
    let mut bytes = vec![OP_ITEM_AOT_SET, 0, kind, 0, 0, 0];
    bytes.resize(14, 0); // x/z/width/depth
    bytes.extend_from_slice(&item_id.to_le_bytes());
    bytes.resize(instruction_size(OP_ITEM_AOT_SET), 0);
    bytes
}

fn aot_reset(aot: u8) -> Vec<u8> {
    let mut bytes = vec![OP_AOT_RESET, aot, 0, 0];
    bytes.resize(instruction_size(OP_AOT_RESET), 0);
    bytes
}

fn obj_model_set(object_index: u8) -> Vec<u8> {
    let mut bytes = vec![OP_OBJ_MODEL_SET, object_index];
    bytes.resize(instruction_size(OP_OBJ_MODEL_SET), 0);
    bytes
}

fn sce_espr_on(id: u8) -> Vec<u8> {
    let mut bytes = vec![OP_SCE_ESPR_ON, 0, id];
    bytes.resize(instruction_size(OP_SCE_ESPR_ON), 0);
    bytes
}

fn sce_espr_kill(id: u8) -> Vec<u8> {
    vec![OP_SCE_ESPR_KILL, id, 0, 0, 0]
}

fn bgm_control(id: u8, op: u8) -> Vec<u8> {
    vec![OP_SCE_BGM_CONTROL, id, op, 0, 0, 0]
}

fn unknown_op() -> Vec<u8> {
    // SE_ON: declared in the size table, not dispatched.
    let mut bytes = vec![0x36];
    bytes.resize(instruction_size(0x36), 0);
    bytes
}

//
// --- Scenarios --------------------------------------------------------------
//

#[test]
fn straight_line_routine_terminates() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));
    asm.emit(pos_set(10, 20, 30));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    assert!(vm.thread(0).running);

    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.player_position, Some((10.0, 20.0, 30.0)));
    assert!(!vm.thread(0).running);
}

#[test]
fn terminated_thread_is_left_alone() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    let pc_after = vm.thread(0).pc;
    vm.tick(TICK, &script, &mut world);
    vm.tick(TICK, &script, &mut world);
    assert!(!vm.thread(0).running);
    assert_eq!(vm.thread(0).pc, pc_after);
}

/// Builds `[IF_START; CHECK(0,0,1); SET_BIT(0,1,1); END_IF; EVT_END]` with
/// the block length spanning through END_IF, so a false predicate joins
/// right at EVT_END.
fn if_block_script() -> ScriptFunction {
    let mut asm = Assembler::new();
    asm.event();
    let block = (instruction_size(OP_CHECK)
        + instruction_size(OP_SET_BIT)
        + instruction_size(OP_END_IF)) as u16;
    asm.emit(if_start(block));
    asm.emit(check(0, 0, 1));
    asm.emit(set_bit(0, 1, 1));
    asm.emit(end_if());
    asm.emit(evt_end());
    asm.finish()
}

#[test]
fn if_block_runs_when_bit_matches() {
    let script = if_block_script();
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.bits.insert((0, 0), 1);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 1), 1);
    assert!(!vm.thread(0).running);
}

#[test]
fn if_block_skipped_when_bit_differs() {
    let script = if_block_script();
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 1), 0);
    assert!(!vm.thread(0).running);
    assert!(!vm.is_halted());
}

/// `[IF_START; CHECK; then SET_BIT(0,1,1); ELSE_START; else SET_BIT(0,2,1);
/// EVT_END]`: if-blocks with an else arm close on ELSE_START, not END_IF.
fn if_else_script() -> ScriptFunction {
    let mut asm = Assembler::new();
    asm.event();
    let then_block = (instruction_size(OP_CHECK)
        + instruction_size(OP_SET_BIT)
        + instruction_size(OP_ELSE_START)) as u16;
    let else_block = (instruction_size(OP_ELSE_START) + instruction_size(OP_SET_BIT)) as u16;
    asm.emit(if_start(then_block));
    asm.emit(check(0, 0, 1));
    asm.emit(set_bit(0, 1, 1));
    asm.emit(else_start(else_block));
    asm.emit(set_bit(0, 2, 1));
    asm.emit(evt_end());
    asm.finish()
}

#[test]
fn else_branch_skipped_when_predicate_holds() {
    let script = if_else_script();
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.bits.insert((0, 0), 1);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 1), 1);
    assert_eq!(world.bit(0, 2), 0);
    assert!(!vm.thread(0).running);
}

#[test]
fn else_branch_taken_when_predicate_fails() {
    let script = if_else_script();
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 1), 0);
    assert_eq!(world.bit(0, 2), 1);
    assert!(!vm.thread(0).running);
}

#[test]
fn sleep_counts_down_across_ticks() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));
    asm.sleep(3);
    asm.emit(pos_set(1, 2, 3));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);

    for _ in 0..3 {
        vm.tick(TICK, &script, &mut world);
        assert_eq!(world.player_position, None);
        assert!(vm.thread(0).running);
    }
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.player_position, Some((1.0, 2.0, 3.0)));
    assert!(!vm.thread(0).running);
}

#[test]
fn for_loop_repeats_body() {
    let mut asm = Assembler::new();
    asm.event();
    let block = (instruction_size(OP_SET_BIT) + instruction_size(OP_FOR_END)) as u16;
    asm.emit(for_start(4, block));
    asm.emit(set_bit(0, 0, 7));
    asm.emit(for_end());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    // Flipped four times from zero.
    assert_eq!(world.bit(0, 0), 0);
    assert!(!vm.thread(0).running);
}

#[test]
fn for_loop_zero_count_skips_block() {
    let mut asm = Assembler::new();
    asm.event();
    let block = (instruction_size(OP_SET_BIT) + instruction_size(OP_FOR_END)) as u16;
    asm.emit(for_start(0, block));
    asm.emit(set_bit(0, 0, 1));
    asm.emit(for_end());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 0), 0);
    assert!(!vm.thread(0).running);
    assert!(!vm.is_halted());
}

#[test]
fn break_leaves_loop_and_restores_if_depth() {
    let mut asm = Assembler::new();
    asm.event();
    let block = (instruction_size(OP_SET_BIT)
        + instruction_size(OP_BREAK)
        + instruction_size(OP_FOR_END)) as u16;
    asm.emit(for_start(10, block));
    asm.emit(set_bit(0, 0, 7));
    asm.emit(break_loop());
    asm.emit(for_end());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 0), 1);
    assert!(!vm.thread(0).running);
    assert_eq!(vm.thread(0).levels[0].loop_level, -1);
    assert_eq!(vm.thread(0).levels[0].if_else_counter, -1);
}

/// `switch (var 5) { case 1: …; case 2: …; default: … }` with per-arm
/// bodies `POS_SET` (+ BREAK when `with_breaks`).
fn switch_script(with_breaks: bool) -> ScriptFunction {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));

    let arm = instruction_size(OP_POS_SET)
        + if with_breaks {
            instruction_size(OP_BREAK)
        } else {
            0
        };
    let block = (2 * (instruction_size(OP_CASE) + arm)
        + instruction_size(OP_DEFAULT)
        + instruction_size(OP_POS_SET)
        + instruction_size(OP_END_SWITCH)) as u16;

    asm.emit(switch(5, block));
    asm.emit(case(1, arm as u16));
    asm.emit(pos_set(1, 0, 0));
    if with_breaks {
        asm.emit(break_loop());
    }
    asm.emit(case(2, arm as u16));
    asm.emit(pos_set(2, 0, 0));
    if with_breaks {
        asm.emit(break_loop());
    }
    asm.emit(default_arm());
    asm.emit(pos_set(9, 0, 0));
    asm.emit(end_switch());
    asm.emit(evt_end());
    asm.finish()
}

#[test]
fn switch_takes_default_arm() {
    let script = switch_script(false);
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.vars.insert(5, 99);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.player_position, Some((9.0, 0.0, 0.0)));
    assert!(!vm.thread(0).running);
}

#[test]
fn switch_takes_matching_case() {
    let script = switch_script(true);
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.vars.insert(5, 2);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.player_position, Some((2.0, 0.0, 0.0)));
    assert!(!vm.thread(0).running);
    assert_eq!(vm.thread(0).levels[0].loop_level, -1);
}

#[test]
fn switch_case_falls_through_without_break() {
    let script = switch_script(false);
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.vars.insert(5, 1);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    // Case 1's body runs first, then control falls through every later arm.
    assert_eq!(world.player_position, Some((9.0, 0.0, 0.0)));
    assert!(!vm.thread(0).running);
}

#[test]
fn switch_without_match_or_default_falls_out() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));
    let arm = instruction_size(OP_POS_SET);
    let block =
        (instruction_size(OP_CASE) + arm + instruction_size(OP_END_SWITCH)) as u16;
    asm.emit(switch(5, block));
    asm.emit(case(1, arm as u16));
    asm.emit(pos_set(1, 0, 0));
    asm.emit(end_switch());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.vars.insert(5, 7);

    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.player_position, None);
    assert!(!vm.thread(0).running);
    assert_eq!(vm.thread(0).levels[0].loop_level, -1);
}

#[test]
fn gosub_runs_event_and_returns() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(gosub(1));
    asm.emit(set_bit(0, 4, 1));
    asm.emit(evt_end());
    asm.event();
    asm.emit(set_bit(0, 5, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 5), 1);
    assert_eq!(world.bit(0, 4), 1);
    assert!(!vm.thread(0).running);
    assert_eq!(vm.thread(0).sub_level, 0);
}

#[test]
fn gosub_callee_may_run_its_own_conditionals() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(gosub(1));
    asm.emit(set_bit(0, 4, 1));
    asm.emit(evt_end());
    asm.event();
    let block = (instruction_size(OP_CHECK)
        + instruction_size(OP_SET_BIT)
        + instruction_size(OP_END_IF)) as u16;
    asm.emit(if_start(block));
    asm.emit(check(0, 0, 1));
    asm.emit(set_bit(0, 5, 1));
    asm.emit(end_if());
    asm.emit(evt_end());
    let script = asm.finish();

    // Callee predicate false: its then-body is skipped, the return is clean.
    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 5), 0);
    assert_eq!(world.bit(0, 4), 1);
    assert!(!vm.thread(0).running);
    assert!(!vm.is_halted());
}

#[test]
fn evt_exec_to_higher_slot_runs_same_tick() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(evt_exec(1, 1));
    asm.emit(evt_end());
    asm.event();
    asm.emit(set_bit(0, 6, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 6), 1);
    assert!(!vm.thread(0).running);
    assert!(!vm.thread(1).running);
}

#[test]
fn evt_exec_to_lower_slot_waits_one_tick() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(evt_exec(1, 1));
    asm.emit(evt_end());
    asm.event();
    asm.emit(set_bit(0, 6, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 5, 0);

    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 6), 0);
    assert!(vm.thread(1).running);

    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 6), 1);
    assert!(!vm.thread(1).running);
}

#[test]
fn evt_exec_auto_assigns_free_slot() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(evt_exec(0xff, 1));
    asm.emit(evt_end());
    asm.event();
    asm.emit(set_bit(0, 6, 1));
    asm.sleep(5);
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    // Slot 0 was busy spawning; slot 1 is the first free one.
    assert_eq!(world.bit(0, 6), 1);
    assert!(vm.thread(1).running);
}

#[test]
fn goto_jump_is_not_applied() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(goto(-6));
    asm.emit(set_bit(0, 8, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 8), 1);
    assert!(!vm.thread(0).running);
}

#[test]
fn unknown_opcode_is_stepped_over() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(unknown_op());
    asm.emit(set_bit(0, 7, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.bit(0, 7), 1);
    assert!(!vm.thread(0).running);
}

#[test]
fn member_set_routes_heading_by_workset() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));
    asm.emit(member_set(15, 2048));
    asm.emit(work_set(WORK_OBJECT, 3));
    asm.emit(member_set(15, 1024));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.player_heading, Some(180.0));
    assert_eq!(world.object_headings.get(&3), Some(&90.0));
}

#[test]
fn room_setup_side_effects_reach_the_world() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(cut_chg(3));
    asm.emit(aot_set(1));
    asm.emit(door_aot_set(2));
    asm.emit(item_aot_set(SCE_ITEM, 47));
    asm.emit(aot_reset(1));
    asm.emit(obj_model_set(6));
    asm.emit(sca_id_set(7, 0));
    asm.emit(sca_id_set(8, 1));
    asm.emit(sce_espr_on(4));
    asm.emit(sce_espr_kill(4));
    asm.emit(bgm_control(0, 2));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert_eq!(world.camera, Some(3));
    assert_eq!(world.aots, vec![1]);
    assert_eq!(world.door_aots, vec![2]);
    assert_eq!(world.item_aots, vec![47]);
    assert_eq!(world.aot_resets, vec![1]);
    assert_eq!(world.models, vec![6]);
    // Only the zero-flag SCA_ID_SET removes its collision entity.
    assert_eq!(world.removed_collision, vec![7]);
    assert_eq!(world.sprites_on, vec![4]);
    assert_eq!(world.sprites_killed, vec![4]);
    assert_eq!(world.bgm_ops, vec![2]);
    assert!(!vm.thread(0).running);
}

//
// --- Scheduler --------------------------------------------------------------
//

#[test]
fn zero_elapsed_time_runs_nothing() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(set_bit(0, 0, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);

    for _ in 0..100 {
        vm.tick(0.0, &script, &mut world);
    }
    assert_eq!(world.bit(0, 0), 0);
    assert!(vm.thread(0).running);
}

#[test]
fn burst_of_wall_time_yields_a_single_round() {
    let mut asm = Assembler::new();
    asm.event();
    asm.sleep(2);
    asm.emit(set_bit(0, 9, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);

    // Each call discards its excess wall time, so ten seconds buys one
    // round, not three hundred.
    vm.tick(10.0, &script, &mut world);
    assert_eq!(world.bit(0, 9), 0);
    vm.tick(10.0, &script, &mut world);
    assert_eq!(world.bit(0, 9), 0);
    vm.tick(10.0, &script, &mut world);
    assert_eq!(world.bit(0, 9), 1);
    assert!(!vm.thread(0).running);
}

#[test]
fn reset_clears_threads_and_is_idempotent() {
    let mut asm = Assembler::new();
    asm.event();
    asm.sleep(100);
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert!(vm.thread(0).running);

    vm.reset();
    vm.reset();
    for index in 0..THREAD_COUNT {
        assert!(!vm.thread(index).running);
        assert_eq!(vm.thread(index).pc, 0);
        assert_eq!(vm.thread(index).sub_level, 0);
        assert_eq!(vm.thread(index).levels[0].if_else_counter, -1);
        assert_eq!(vm.thread(index).levels[0].loop_level, -1);
    }

    vm.tick(TICK, &script, &mut world);
    assert!(!vm.thread(0).running);
}

#[test]
fn thread_state_invariants_hold_after_mixed_program() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(work_set(WORK_PLAYER, 0));
    let for_block = (instruction_size(OP_SET_BIT) + instruction_size(OP_FOR_END)) as u16;
    let if_block = (instruction_size(OP_CHECK)
        + instruction_size(OP_FOR)
        + for_block as usize
        + instruction_size(OP_END_IF)) as u16;
    asm.emit(if_start(if_block));
    asm.emit(check(0, 0, 1));
    asm.emit(for_start(3, for_block));
    asm.emit(set_bit(0, 0, 7));
    asm.emit(for_end());
    asm.emit(end_if());
    asm.emit(gosub(1));
    asm.emit(evt_end());
    asm.event();
    asm.emit(set_bit(0, 1, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    world.bits.insert((0, 0), 1);
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    // Flipped three times from one.
    assert_eq!(world.bit(0, 0), 0);
    assert_eq!(world.bit(0, 1), 1);

    for index in 0..THREAD_COUNT {
        let thread = vm.thread(index);
        assert!(thread.sub_level < SUB_LEVELS);
        assert!(thread.stack_index <= JOIN_STACK_DEPTH);
        for level in &thread.levels {
            assert!(level.if_else_counter >= -1);
            assert!(level.if_else_counter < JOIN_STACK_DEPTH as i32);
            assert!(level.loop_level >= -1);
            assert!(level.loop_level < LOOP_FRAMES as i32);
        }
    }
}

//
// --- Fault latch ------------------------------------------------------------
//

#[test]
fn invalid_set_bit_operation_halts_the_vm() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(set_bit(0, 0, 1));
    asm.emit(set_bit(0, 1, 3));
    asm.emit(set_bit(0, 2, 1));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert!(vm.is_halted());
    assert_eq!(world.bit(0, 0), 1);
    assert_eq!(world.bit(0, 2), 0);

    // A halted machine never steps again.
    vm.tick(TICK, &script, &mut world);
    assert_eq!(world.bit(0, 2), 0);
    assert!(vm.thread(0).running);
}

#[test]
fn item_aot_with_wrong_kind_halts_the_vm() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(item_aot_set(0, 47));
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);

    assert!(vm.is_halted());
    assert!(world.item_aots.is_empty());
}

#[test]
fn end_if_with_empty_stack_halts_the_vm() {
    let mut asm = Assembler::new();
    asm.event();
    asm.emit(end_if());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert!(vm.is_halted());
}

#[test]
fn stray_opcode_inside_switch_scan_halts_the_vm() {
    let mut asm = Assembler::new();
    asm.event();
    let block = (instruction_size(OP_POS_SET) + instruction_size(OP_END_SWITCH)) as u16;
    asm.emit(switch(5, block));
    asm.emit(pos_set(1, 0, 0));
    asm.emit(end_switch());
    asm.emit(evt_end());
    let script = asm.finish();

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert!(vm.is_halted());
}

#[test]
fn missing_instruction_halts_the_vm() {
    let script = ScriptFunction {
        instructions: HashMap::new(),
        event_entry: vec![0x40],
    };

    let mut vm = ScriptVm::new();
    let mut world = TestWorld::default();
    vm.init_script(&script, 0, 0);
    vm.tick(TICK, &script, &mut world);
    assert!(vm.is_halted());

    // Only a reset clears the latch.
    vm.reset();
    assert!(!vm.is_halted());
}
