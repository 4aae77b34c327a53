//! Ocean entities: players, food, powerups, and the per-species hitbox
//! dispatch table. Species behavior is a data table plus a small match,
//! never inheritance.

use crate::geometry::{Obb, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Swordfish,
    Blobfish,
    Pufferfish,
    Shark,
    Sacabambaspis,
}

impl Species {
    pub fn parse(raw: &str) -> Species {
        match raw.to_ascii_lowercase().as_str() {
            "swordfish" => Species::Swordfish,
            "blobfish" => Species::Blobfish,
            "pufferfish" => Species::Pufferfish,
            "shark" => Species::Shark,
            "sacabambaspis" => Species::Sacabambaspis,
            _ => Species::Swordfish,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Swordfish => "swordfish",
            Species::Blobfish => "blobfish",
            Species::Pufferfish => "pufferfish",
            Species::Shark => "shark",
            Species::Sacabambaspis => "sacabambaspis",
        }
    }

    pub fn hitbox(&self) -> HitboxRatios {
        match self {
            Species::Swordfish => HitboxRatios {
                body_w: 1.3,
                body_h: 0.6,
                mouth_r: 0.25,
                mouth_offset: 0.6,
            },
            Species::Blobfish => HitboxRatios {
                body_w: 1.3,
                body_h: 1.3,
                mouth_r: 0.35,
                mouth_offset: 0.6,
            },
            Species::Pufferfish => HitboxRatios {
                body_w: 1.2,
                body_h: 1.2,
                mouth_r: 0.40,
                mouth_offset: 0.6,
            },
            Species::Shark => HitboxRatios {
                body_w: 1.8,
                body_h: 0.9,
                mouth_r: 0.35,
                mouth_offset: 0.9,
            },
            Species::Sacabambaspis => HitboxRatios {
                body_w: 2.0,
                body_h: 1.0,
                mouth_r: 0.40,
                mouth_offset: 0.9,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitboxRatios {
    pub body_w: f32,
    pub body_h: f32,
    pub mouth_r: f32,
    pub mouth_offset: f32,
}

pub const MAX_SIZE_CAP: f32 = 200.0;

impl HitboxRatios {
    /// Mouth circle center/radius, given live `position`, `size`, and
    /// facing `rotation`. `mouth_r_mult`/`mouth_offset_mult` let the
    /// swordfish powerup scale the mouth independently of body size.
    pub fn mouth_circle(
        &self,
        position: Vec2,
        size: f32,
        rotation: f32,
        mouth_r_mult: f32,
        mouth_offset_mult: f32,
    ) -> crate::geometry::Circle {
        let capped = size.min(MAX_SIZE_CAP);
        let radius = capped * self.mouth_r * mouth_r_mult;
        let offset = capped * self.mouth_offset * mouth_offset_mult;
        let center = position.add(Vec2::new(rotation.cos(), rotation.sin()).mul(offset));
        crate::geometry::Circle::new(center, radius)
    }

    pub fn body_obb(&self, position: Vec2, size: f32, rotation: f32) -> Obb {
        let capped = size.min(MAX_SIZE_CAP);
        let half_extents = Vec2::new(capped * self.body_w / 2.0, capped * self.body_h / 2.0);
        Obb::new(position, half_extents, rotation)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CurrentInput {
    pub dir: Vec2,
    pub boost: bool,
    pub seq: u32,
}

impl Default for CurrentInput {
    fn default() -> Self {
        Self {
            dir: Vec2::ZERO,
            boost: false,
            seq: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PowerupState {
    pub active: bool,
    pub remaining_secs: f32,
    /// Pre-powerup size, used by pufferfish to restore on expiry.
    pub base_size: f32,
}

pub struct Player {
    pub id: String,
    pub name: String,
    pub species: Species,

    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,

    pub size: f32,
    pub score: u32,
    pub alive: bool,
    pub respawn_in: f32,
    pub killed_by: Option<String>,

    pub last_seq: u32,
    pub input: CurrentInput,

    pub powerup: PowerupState,
}

impl Player {
    pub fn new(id: String, name: String, species: Species, position: Vec2, initial_size: f32) -> Self {
        Self {
            id,
            name,
            species,
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            size: initial_size,
            score: 0,
            alive: true,
            respawn_in: 0.0,
            killed_by: None,
            last_seq: 0,
            input: CurrentInput::default(),
            powerup: PowerupState::default(),
        }
    }

    /// Mouth radius/offset multipliers, accounting for the swordfish
    /// powerup's 2x radius / 1.5x offset scaling.
    pub fn mouth_multipliers(&self) -> (f32, f32) {
        if self.powerup.active && self.species == Species::Swordfish {
            (2.0, 1.5)
        } else {
            (1.0, 1.0)
        }
    }

    pub fn mouth_circle(&self) -> crate::geometry::Circle {
        let (r_mult, offset_mult) = self.mouth_multipliers();
        self.species
            .hitbox()
            .mouth_circle(self.position, self.size, self.rotation, r_mult, offset_mult)
    }

    pub fn body_obb(&self) -> Obb {
        self.species.hitbox().body_obb(self.position, self.size, self.rotation)
    }

    /// Blobfish with an active powerup cannot be eaten.
    pub fn is_invulnerable(&self) -> bool {
        self.species == Species::Blobfish && self.powerup.active
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Food {
    pub id: u64,
    pub position: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Powerup {
    pub id: u64,
    pub position: Vec2,
    pub radius: f32,
}

/// Monotonic, never-reused id generator shared by food and powerups.
#[derive(Debug)]
pub struct IdCounter(AtomicU64);

impl IdCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_parse_defaults_to_swordfish() {
        assert_eq!(Species::parse("not-a-fish"), Species::Swordfish);
        assert_eq!(Species::parse("Shark"), Species::Shark);
    }

    #[test]
    fn hitbox_scales_with_capped_size() {
        let ratios = Species::Shark.hitbox();
        let obb = ratios.body_obb(Vec2::ZERO, 500.0, 0.0);
        // size is clamped to MAX_SIZE_CAP before scaling
        assert_eq!(obb.half_extents.x, MAX_SIZE_CAP * ratios.body_w / 2.0);
    }

    #[test]
    fn swordfish_powerup_scales_mouth() {
        let mut p = Player::new("p1".into(), "A".into(), Species::Swordfish, Vec2::ZERO, 20.0);
        let base = p.mouth_circle();
        p.powerup.active = true;
        let boosted = p.mouth_circle();
        assert!(boosted.radius > base.radius);
    }

    #[test]
    fn blobfish_powerup_is_invulnerable() {
        let mut p = Player::new("p1".into(), "A".into(), Species::Blobfish, Vec2::ZERO, 20.0);
        assert!(!p.is_invulnerable());
        p.powerup.active = true;
        assert!(p.is_invulnerable());
    }

    #[test]
    fn id_counter_is_monotonic_and_never_repeats() {
        let counter = IdCounter::new();
        let a = counter.next();
        let b = counter.next();
        assert!(b > a);
    }
}
