//! # World-Mutation Handlers
//!
//! Opcodes that change the game or render state: camera cuts, area-of-
//! trigger placement, object models, entity transforms, sprites, and BGM.
//! Handlers decode routing decisions (workset, trigger kind) and hand the
//! payload to the [`World`] adapter; they never keep state of their own.
//!
//! PLC_MOTION, PLC_DEST, PLC_NECK, and SCE_EM_SET have no adapter hook;
//! they are decoded for validation and stepped over.

use crate::bytecode::{
    AotReset, AotSet, AotSet4p, CutChg, DoorAotSet, DoorAotSet4p, ItemAotSet, ItemAotSet4p,
    MemberSet, ObjModelSet, PlcDest, PlcMotion, PlcNeck, PosSet, ScaIdSet, SceBgmControl,
    SceEmSet, SceEsprKill, SceEsprOn,
};
use crate::error::ScriptError;
use crate::thread::ScriptThread;
use crate::world::{heading_degrees, World, MEMBER_HEADING, SCE_ITEM, WORK_OBJECT, WORK_PLAYER};

use super::Flow;

pub(super) fn handle_cut_chg(inst: &CutChg, world: &mut dyn World) -> Flow {
    world.change_camera(inst.camera_id as usize);
    Flow::Continue
}

pub(super) fn handle_aot_set(inst: &AotSet, world: &mut dyn World) -> Flow {
    world.add_aot(inst);
    Flow::Continue
}

pub(super) fn handle_aot_set_4p(inst: &AotSet4p, world: &mut dyn World) -> Flow {
    world.add_aot_4p(inst);
    Flow::Continue
}

pub(super) fn handle_door_aot_set(inst: &DoorAotSet, world: &mut dyn World) -> Flow {
    world.add_door_aot(inst);
    Flow::Continue
}

pub(super) fn handle_door_aot_set_4p(inst: &DoorAotSet4p, world: &mut dyn World) -> Flow {
    world.add_door_aot_4p(inst);
    Flow::Continue
}

/// ITEM_AOT_SET: item pickups must carry the item trigger kind.
pub(super) fn handle_item_aot_set(
    inst: &ItemAotSet,
    pc: usize,
    world: &mut dyn World,
) -> Result<Flow, ScriptError> {
    if inst.kind != SCE_ITEM {
        return Err(ScriptError::WrongAotKind {
            pc,
            kind: inst.kind,
        });
    }
    world.add_item_aot(inst);
    Ok(Flow::Continue)
}

pub(super) fn handle_item_aot_set_4p(inst: &ItemAotSet4p, world: &mut dyn World) -> Flow {
    world.add_item_aot_4p(inst);
    Flow::Continue
}

pub(super) fn handle_aot_reset(inst: &AotReset, world: &mut dyn World) -> Flow {
    world.reset_aot(inst);
    Flow::Continue
}

pub(super) fn handle_obj_model_set(inst: &ObjModelSet, world: &mut dyn World) -> Flow {
    world.set_item_entity_model(inst);
    Flow::Continue
}

/// POS_SET: write the selected workset entity's position.
pub(super) fn handle_pos_set(inst: &PosSet, thread: &ScriptThread, world: &mut dyn World) -> Flow {
    if thread.work_kind == WORK_PLAYER {
        world.set_player_position(f32::from(inst.x), f32::from(inst.y), f32::from(inst.z));
    }
    Flow::Continue
}

/// MEMBER_SET: write one member of the selected workset entity. Member 15
/// is the facing angle, encoded in 4096ths of a turn.
pub(super) fn handle_member_set(
    inst: &MemberSet,
    thread: &ScriptThread,
    world: &mut dyn World,
) -> Flow {
    match thread.work_kind {
        WORK_PLAYER => {
            if inst.member_index == MEMBER_HEADING {
                world.set_player_heading_degrees(heading_degrees(inst.value));
            }
        }
        WORK_OBJECT => {
            if inst.member_index == MEMBER_HEADING {
                world.set_object_heading_degrees(thread.work_index, heading_degrees(inst.value));
            }
        }
        _ => {}
    }
    Flow::Continue
}

/// SCA_ID_SET: flag 0 removes the collision entity with this id.
pub(super) fn handle_sca_id_set(inst: &ScaIdSet, world: &mut dyn World) -> Flow {
    if inst.flag == 0 {
        world.remove_collision_entity(inst.id as usize);
    }
    Flow::Continue
}

pub(super) fn handle_sce_espr_on(inst: &SceEsprOn, world: &mut dyn World) -> Flow {
    world.add_sprite(inst);
    Flow::Continue
}

pub(super) fn handle_sce_espr_kill(inst: &SceEsprKill, world: &mut dyn World) -> Flow {
    world.kill_sprite(inst);
    Flow::Continue
}

pub(super) fn handle_sce_em_set(_inst: &SceEmSet) -> Flow {
    Flow::Continue
}

pub(super) fn handle_sce_bgm_control(inst: &SceBgmControl, world: &mut dyn World) -> Flow {
    world.bgm_control(inst);
    Flow::Continue
}

pub(super) fn handle_plc_motion(_inst: &PlcMotion) -> Flow {
    Flow::Continue
}

pub(super) fn handle_plc_dest(_inst: &PlcDest) -> Flow {
    Flow::Continue
}

pub(super) fn handle_plc_neck(_inst: &PlcNeck) -> Flow {
    Flow::Continue
}
