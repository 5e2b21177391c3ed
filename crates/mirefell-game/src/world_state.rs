// world_state.rs — the root persisted aggregate: scenes, clock, timers

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::debug;
use mirefell_common::SaveError;

use crate::context::SaveContext;
use crate::data_store::DataStore;
use crate::entity::SceneCache;
use crate::scene_state::SceneState;

pub const WORLD_STATE_VERSION: i32 = 3;
pub const WORLD_STATE_MIN_VERSION: i32 = 1;

// Versions at which optional sections were introduced
const VERSION_TIMERS: i32 = 2;
const VERSION_DATA_STORE: i32 = 3;

/// In-world date the campaign opens on.
pub fn campaign_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1104, 3, 21)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .unwrap_or_default()
}

// ============================================================
// WorldTimer
// ============================================================

/// A world-wide countdown. One-shot timers fire once and stay
/// expired; periodic timers re-arm on firing.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldTimer {
    pub remaining: f64,
    pub period: Option<f64>,
    expired: bool,
}

impl WorldTimer {
    pub fn one_shot(seconds: f64) -> Self {
        Self {
            remaining: seconds,
            period: None,
            expired: false,
        }
    }

    pub fn periodic(period: f64) -> Self {
        Self {
            remaining: period,
            period: Some(period),
            expired: false,
        }
    }

    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Re-arm the timer with a fresh countdown.
    pub fn reset(&mut self, seconds: f64) {
        self.remaining = seconds;
        self.expired = false;
    }

    /// Advance the timer. Returns true if it fired during this update.
    pub fn update(&mut self, dt: f64) -> bool {
        if self.expired {
            return false;
        }
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return false;
        }
        match self.period {
            Some(period) if period > 0.0 => {
                while self.remaining <= 0.0 {
                    self.remaining += period;
                }
            }
            _ => self.expired = true,
        }
        true
    }
}

// ============================================================
// WorldState
// ============================================================

/// The root aggregate: scene states by name, the world clock,
/// world-wide timers, and the global data store. Also owns the cache
/// of retained live scene objects, which is never serialized.
pub struct WorldState {
    pub clock: NaiveDateTime,
    timers: BTreeMap<String, WorldTimer>,
    pub data: DataStore,
    scenes: Vec<SceneState>,
    pub cache: SceneCache,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            clock: campaign_start(),
            timers: BTreeMap::new(),
            data: DataStore::new(),
            scenes: Vec::new(),
            cache: SceneCache::new(),
        }
    }

    // ============================================================
    // Scene registry
    // ============================================================

    /// Register a scene state. A name collision is a programmer
    /// error: the add is rejected and the registry is unchanged.
    pub fn add_scene_state(&mut self, scene: SceneState) -> Result<(), SaveError> {
        if self.get_scene_state(scene.name()).is_some() {
            return Err(SaveError::DuplicateScene {
                name: scene.name().to_string(),
            });
        }
        self.scenes.push(scene);
        Ok(())
    }

    /// Absence is normal: the region has simply never been visited.
    pub fn get_scene_state(&self, name: &str) -> Option<&SceneState> {
        self.scenes.iter().find(|s| s.name() == name)
    }

    pub fn get_scene_state_mut(&mut self, name: &str) -> Option<&mut SceneState> {
        self.scenes.iter_mut().find(|s| s.name() == name)
    }

    pub fn scene_states(&self) -> &[SceneState] {
        &self.scenes
    }

    // ============================================================
    // Clock & timers
    // ============================================================

    pub fn advance_clock(&mut self, seconds: i64) {
        self.clock += chrono::Duration::seconds(seconds);
    }

    pub fn set_timer(&mut self, name: &str, timer: WorldTimer) {
        self.timers.insert(name.to_string(), timer);
    }

    pub fn timer(&self, name: &str) -> Option<&WorldTimer> {
        self.timers.get(name)
    }

    /// Advance world-wide timers only; returns the names of timers
    /// that fired. Simulation of the active region is explicitly not
    /// this engine's job.
    pub fn update(&mut self, dt: f64) -> Vec<String> {
        let mut fired = Vec::new();
        for (name, timer) in &mut self.timers {
            if timer.update(dt) {
                fired.push(name.clone());
            }
        }
        fired
    }

    // ============================================================
    // Serialization (current version 3)
    // ============================================================

    pub fn write_state(&self, ctx: &mut SaveContext) -> Result<(), SaveError> {
        ctx.write_version(WORLD_STATE_VERSION);

        ctx.buf.write_i32(self.clock.year());
        ctx.buf.write_i32(self.clock.month() as i32);
        ctx.buf.write_i32(self.clock.day() as i32);
        ctx.buf.write_i32(self.clock.hour() as i32);
        ctx.buf.write_i32(self.clock.minute() as i32);
        ctx.buf.write_i32(self.clock.second() as i32);

        ctx.buf.write_i32(self.scenes.len() as i32);
        for scene in &self.scenes {
            scene.write_state(ctx)?;
        }

        ctx.buf.write_i32(self.timers.len() as i32);
        for (name, timer) in &self.timers {
            ctx.buf.write_string(name);
            ctx.buf.write_f64(timer.remaining);
            ctx.buf.write_bool(timer.period.is_some());
            ctx.buf.write_f64(timer.period.unwrap_or(0.0));
            ctx.buf.write_bool(timer.expired);
        }

        self.data.write(ctx.buf);
        debug!("wrote world state: {} scenes, {} timers", self.scenes.len(), self.timers.len());
        Ok(())
    }

    pub fn read_state(ctx: &mut SaveContext) -> Result<Self, SaveError> {
        let version = ctx.read_version(
            "world state",
            WORLD_STATE_MIN_VERSION,
            WORLD_STATE_VERSION,
        )?;

        let year = ctx.buf.read_i32()?;
        let month = ctx.buf.read_i32()?;
        let day = ctx.buf.read_i32()?;
        let hour = ctx.buf.read_i32()?;
        let minute = ctx.buf.read_i32()?;
        let second = ctx.buf.read_i32()?;
        let clock = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
            .ok_or_else(|| SaveError::Format {
                label: "world clock".to_string(),
            })?;

        let mut world = WorldState::new();
        world.clock = clock;

        let scene_count = ctx.buf.read_i32()?;
        if scene_count < 0 {
            return Err(SaveError::Format {
                label: "scene count".to_string(),
            });
        }
        for _ in 0..scene_count {
            let scene = SceneState::read_state(ctx)?;
            world.add_scene_state(scene)?;
        }

        if version >= VERSION_TIMERS {
            let timer_count = ctx.buf.read_i32()?;
            if timer_count < 0 {
                return Err(SaveError::Format {
                    label: "world timer count".to_string(),
                });
            }
            for _ in 0..timer_count {
                let name = ctx.buf.read_string()?;
                let remaining = ctx.buf.read_f64()?;
                let has_period = ctx.buf.read_bool()?;
                let period = ctx.buf.read_f64()?;
                let expired = ctx.buf.read_bool()?;
                world.timers.insert(
                    name,
                    WorldTimer {
                        remaining,
                        period: has_period.then_some(period),
                        expired,
                    },
                );
            }
        }

        if version >= VERSION_DATA_STORE {
            world.data = DataStore::read(ctx.buf)?;
        }

        debug!("read world state v{}: {} scenes", version, world.scenes.len());
        Ok(world)
    }
}
