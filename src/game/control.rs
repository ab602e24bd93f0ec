//! What a session may drive on the entity it controls

use serde::{Deserialize, Serialize};

use super::math::{BlockPos, Face};

/// Player game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub fn visible(self) -> bool {
        self != GameMode::Spectator
    }

    pub fn has_collision(self) -> bool {
        self != GameMode::Spectator
    }

    /// Whether blocks may be broken at all
    pub fn allows_editing(self) -> bool {
        matches!(self, GameMode::Survival | GameMode::Creative)
    }

    pub fn instant_break(self) -> bool {
        self == GameMode::Creative
    }
}

/// Block breaking operations driven by a session's action stream
pub trait Breaker: Send + Sync {
    fn start_breaking(&self, pos: BlockPos, face: Face);

    fn continue_breaking(&self, face: Face);

    fn abort_breaking(&self);

    fn finish_breaking(&self);
}

/// The entity a session controls
pub trait Controllable: Breaker {
    fn game_mode(&self) -> GameMode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectators_are_neither_visible_nor_solid() {
        assert!(!GameMode::Spectator.visible());
        assert!(!GameMode::Spectator.has_collision());
        assert!(GameMode::Adventure.visible());
        assert!(!GameMode::Adventure.allows_editing());
        assert!(GameMode::Creative.instant_break());
    }
}
