//! The seam between the VM and the rest of the game.
//!
//! Script handlers never touch game or render state directly; everything
//! observable outside the interpreter goes through [`World`]. A host wires
//! this to its player/enemy/object tables, flag banks, trigger manager,
//! camera controller, and sprite renderer. The VM calls every method from
//! the single host thread that drives [`crate::vm::ScriptVm::tick`].

use crate::bytecode::{
    AotReset, AotSet, AotSet4p, DoorAotSet, DoorAotSet4p, ItemAotSet, ItemAotSet4p, ObjModelSet,
    SceBgmControl, SceEsprKill, SceEsprOn,
};

/// WORK_SET component selecting the player.
pub const WORK_PLAYER: u8 = 1;
/// WORK_SET component selecting an enemy slot.
pub const WORK_ENEMY: u8 = 3;
/// WORK_SET component selecting a room object slot.
pub const WORK_OBJECT: u8 = 4;

/// Trigger kind carried by AOT placements; ITEM_AOT_SET requires this one.
pub const SCE_ITEM: u8 = 2;

/// Entity member index holding the facing angle.
pub const MEMBER_HEADING: u8 = 15;

/// Convert a raw 12-bit script angle to degrees.
pub fn heading_degrees(value: u16) -> f32 {
    f32::from(value) / 4096.0 * 360.0
}

/// Game and renderer side effects available to script handlers.
pub trait World {
    /// Current value of script variable `id` (read by SWITCH).
    fn script_var(&self, id: usize) -> i32;

    /// Read one flag bit; returns 0 or 1.
    fn bit(&self, bit_array: usize, bit_number: usize) -> u8;

    /// Write one flag bit to 0 or 1.
    fn set_bit(&mut self, bit_array: usize, bit_number: usize, value: u8);

    /// Switch the fixed camera angle.
    fn change_camera(&mut self, camera_id: usize);

    fn add_aot(&mut self, aot: &AotSet);
    fn add_aot_4p(&mut self, aot: &AotSet4p);
    fn add_door_aot(&mut self, door: &DoorAotSet);
    fn add_door_aot_4p(&mut self, door: &DoorAotSet4p);
    fn add_item_aot(&mut self, item: &ItemAotSet);
    fn add_item_aot_4p(&mut self, item: &ItemAotSet4p);
    fn reset_aot(&mut self, aot: &AotReset);

    fn set_player_position(&mut self, x: f32, y: f32, z: f32);
    fn set_player_heading_degrees(&mut self, degrees: f32);
    fn set_object_heading_degrees(&mut self, object_index: usize, degrees: f32);

    /// Place or replace a room object's model.
    fn set_item_entity_model(&mut self, model: &ObjModelSet);

    /// Drop the collision entity with this id from the room.
    fn remove_collision_entity(&mut self, id: usize);

    fn add_sprite(&mut self, sprite: &SceEsprOn);
    fn kill_sprite(&mut self, sprite: &SceEsprKill);

    fn bgm_control(&mut self, control: &SceBgmControl);
}
