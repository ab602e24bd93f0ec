//! Per-connection action dispatcher driving the controlled entity

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::game::control::Controllable;
use crate::game::math::{BlockPos, Face};

/// Runtime id a client uses to refer to its own player
pub const SELF_RUNTIME_ID: u64 = 1;

/// Player action codes as numbered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCode {
    StartBreak,
    AbortBreak,
    StopBreak,
    StopSleeping,
    Respawn,
    CreativePlayerDestroyBlock,
    DimensionChangeDone,
    CrackBreak,
    StartBuildingBlock,
    PredictDestroyBlock,
    ContinueDestroyBlock,
    StartItemUseOn,
    StopItemUseOn,
}

impl TryFrom<i32> for ActionCode {
    type Error = ActionError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => ActionCode::StartBreak,
            1 => ActionCode::AbortBreak,
            2 => ActionCode::StopBreak,
            6 => ActionCode::StopSleeping,
            7 => ActionCode::Respawn,
            13 => ActionCode::CreativePlayerDestroyBlock,
            14 => ActionCode::DimensionChangeDone,
            18 => ActionCode::CrackBreak,
            25 => ActionCode::StartBuildingBlock,
            26 => ActionCode::PredictDestroyBlock,
            27 => ActionCode::ContinueDestroyBlock,
            28 => ActionCode::StartItemUseOn,
            29 => ActionCode::StopItemUseOn,
            other => return Err(ActionError::Unhandled(other)),
        })
    }
}

/// Rejections reported back to the client; the connection stays open
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("player action must refer to self ({expected}), got {got}")]
    ForeignEntity { expected: u64, got: u64 },

    #[error("unhandled player action {0}")]
    Unhandled(i32),

    #[error("invalid block face {0}")]
    InvalidFace(i32),
}

impl ActionError {
    /// Short machine-readable code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::ForeignEntity { .. } => "foreign_entity",
            ActionError::Unhandled(_) => "unhandled_action",
            ActionError::InvalidFace(_) => "invalid_face",
        }
    }
}

/// Whether the session believes a block is being broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakState {
    Idle,
    Breaking(BlockPos),
}

/// Holds the arm-swing flag up for as long as it lives
struct ArmSwing(Arc<AtomicBool>);

impl ArmSwing {
    fn start(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Relaxed);
        Self(flag.clone())
    }
}

impl Drop for ArmSwing {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub struct Session {
    controllable: Arc<dyn Controllable>,
    /// Last position a break was started on. Kept after an abort.
    breaking_pos: Option<BlockPos>,
    breaking: bool,
    swinging_arm: Arc<AtomicBool>,
}

impl Session {
    pub fn new(controllable: Arc<dyn Controllable>) -> Self {
        Self {
            controllable,
            breaking_pos: None,
            breaking: false,
            swinging_arm: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn break_state(&self) -> BreakState {
        match (self.breaking, self.breaking_pos) {
            (true, Some(pos)) => BreakState::Breaking(pos),
            _ => BreakState::Idle,
        }
    }

    pub fn breaking_pos(&self) -> Option<BlockPos> {
        self.breaking_pos
    }

    /// Shared view of the arm-swing flag, readable from other tasks
    pub fn swinging_arm(&self) -> Arc<AtomicBool> {
        self.swinging_arm.clone()
    }

    pub fn handle_player_action(
        &mut self,
        action: i32,
        face: i32,
        pos: BlockPos,
        entity_runtime_id: u64,
    ) -> Result<(), ActionError> {
        if entity_runtime_id != SELF_RUNTIME_ID {
            return Err(ActionError::ForeignEntity {
                expected: SELF_RUNTIME_ID,
                got: entity_runtime_id,
            });
        }
        let code = ActionCode::try_from(action)?;
        trace!(?code, face, pos = ?pos.0, "Player action");

        match code {
            ActionCode::Respawn | ActionCode::DimensionChangeDone => {}
            ActionCode::StopSleeping => {
                let mode = self.controllable.game_mode();
                if !mode.visible() && !mode.has_collision() {
                    return Ok(());
                }
            }
            ActionCode::StartBreak | ActionCode::ContinueDestroyBlock => {
                let face = Self::face(face)?;
                let _swing = ArmSwing::start(&self.swinging_arm);
                self.start_breaking(pos, face);
            }
            ActionCode::AbortBreak => {
                self.controllable.abort_breaking();
                self.breaking = false;
            }
            ActionCode::PredictDestroyBlock | ActionCode::StopBreak => {
                let _swing = ArmSwing::start(&self.swinging_arm);
                self.controllable.finish_breaking();
                self.breaking = false;
            }
            ActionCode::CrackBreak => {
                let face = Self::face(face)?;
                let _swing = ArmSwing::start(&self.swinging_arm);
                if self.breaking_pos != Some(pos) {
                    // Clients skip StartBreak when moving straight on to the next block
                    self.start_breaking(pos, face);
                    return Ok(());
                }
                self.controllable.continue_breaking(face);
            }
            ActionCode::StartItemUseOn
            | ActionCode::StopItemUseOn
            | ActionCode::StartBuildingBlock
            | ActionCode::CreativePlayerDestroyBlock => {}
        }
        Ok(())
    }

    fn start_breaking(&mut self, pos: BlockPos, face: Face) {
        self.breaking_pos = Some(pos);
        self.breaking = true;
        self.controllable.start_breaking(pos, face);
    }

    fn face(raw: i32) -> Result<Face, ActionError> {
        Face::from_raw(raw).ok_or(ActionError::InvalidFace(raw))
    }
}
