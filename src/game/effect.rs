//! Status effects and the potion bundles that carry them

use serde::{Deserialize, Serialize};

use crate::util::time::TICKS_PER_SECOND;

/// Kind of status effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Speed,
    Slowness,
    JumpBoost,
    Strength,
    Weakness,
    Regeneration,
    Poison,
    Wither,
    FireResistance,
    WaterBreathing,
    NightVision,
    Invisibility,
    InstantHealth,
    InstantDamage,
}

impl EffectType {
    /// Lasting effects persist over time and are diluted when an area
    /// source reapplies them. Instant effects resolve on application.
    pub fn is_lasting(self) -> bool {
        !matches!(self, EffectType::InstantHealth | EffectType::InstantDamage)
    }
}

/// A single effect instance: type, level (1-based) and duration in ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectType,
    pub level: u32,
    pub duration: i64,
}

impl Effect {
    pub fn new(kind: EffectType, level: u32, duration: i64) -> Self {
        Self {
            kind,
            level,
            duration,
        }
    }

    fn lasting(kind: EffectType, level: u32, seconds: f64) -> Self {
        Self::new(kind, level, (seconds * TICKS_PER_SECOND as f64) as i64)
    }

    fn instant(kind: EffectType, level: u32) -> Self {
        Self::new(kind, level, 0)
    }
}

/// Potion-like effect payload identified by its numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Potion(pub u8);

impl Potion {
    pub const WATER: Potion = Potion(0);
    pub const NIGHT_VISION: Potion = Potion(5);
    pub const SWIFTNESS: Potion = Potion(14);
    pub const HEALING: Potion = Potion(21);
    pub const HARMING: Potion = Potion(23);
    pub const POISON: Potion = Potion(25);
    pub const REGENERATION: Potion = Potion(28);

    pub fn id(self) -> u8 {
        self.0
    }

    /// Effects carried by this potion. Unknown ids carry none.
    pub fn effects(self) -> Vec<Effect> {
        use EffectType::*;
        let e = match self.0 {
            5 => Effect::lasting(NightVision, 1, 180.0),
            6 => Effect::lasting(NightVision, 1, 480.0),
            7 => Effect::lasting(Invisibility, 1, 180.0),
            8 => Effect::lasting(Invisibility, 1, 480.0),
            9 => Effect::lasting(JumpBoost, 1, 180.0),
            10 => Effect::lasting(JumpBoost, 1, 480.0),
            11 => Effect::lasting(JumpBoost, 2, 90.0),
            12 => Effect::lasting(FireResistance, 1, 180.0),
            13 => Effect::lasting(FireResistance, 1, 480.0),
            14 => Effect::lasting(Speed, 1, 180.0),
            15 => Effect::lasting(Speed, 1, 480.0),
            16 => Effect::lasting(Speed, 2, 90.0),
            17 => Effect::lasting(Slowness, 1, 90.0),
            18 => Effect::lasting(Slowness, 1, 240.0),
            19 => Effect::lasting(WaterBreathing, 1, 180.0),
            20 => Effect::lasting(WaterBreathing, 1, 480.0),
            21 => Effect::instant(InstantHealth, 1),
            22 => Effect::instant(InstantHealth, 2),
            23 => Effect::instant(InstantDamage, 1),
            24 => Effect::instant(InstantDamage, 2),
            25 => Effect::lasting(Poison, 1, 45.0),
            26 => Effect::lasting(Poison, 1, 90.0),
            27 => Effect::lasting(Poison, 2, 22.5),
            28 => Effect::lasting(Regeneration, 1, 45.0),
            29 => Effect::lasting(Regeneration, 1, 90.0),
            30 => Effect::lasting(Regeneration, 2, 22.5),
            31 => Effect::lasting(Strength, 1, 180.0),
            32 => Effect::lasting(Strength, 1, 480.0),
            33 => Effect::lasting(Strength, 2, 90.0),
            34 => Effect::lasting(Weakness, 1, 90.0),
            35 => Effect::lasting(Weakness, 1, 240.0),
            36 => Effect::lasting(Wither, 1, 40.0),
            // water, mundane, thick, awkward and unknown ids
            _ => return Vec::new(),
        };
        vec![e]
    }
}
