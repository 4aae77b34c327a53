//! Canonical tunables for world size, tick rates, spawn counts, and
//! timeouts. All are overridable by environment variable so an operator
//! can retune without a rebuild.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub world_w: f64,
    pub world_h: f64,
    pub tick_rate_hz: f64,
    pub broadcast_rate_hz: f64,
    pub leaderboard_rate_hz: f64,
    pub shark_vision_rate_hz: f64,

    pub initial_size: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub player_speed: f32,
    pub boost_multiplier: f32,
    pub boost_cost_per_sec: f32,
    pub view_distance: f32,

    pub max_food_count: usize,
    pub food_value: f32,
    pub food_min_size: f32,
    pub food_max_size: f32,
    pub food_spawn_rate: usize,

    pub max_powerup_count: usize,
    pub powerup_duration_secs: f32,

    pub respawn_delay_secs: f32,
    pub size_multiplier: f32,
    pub velocity_lerp: f32,
    pub bounce_strength: f32,

    pub race_max_players: usize,
    pub lobby_wait_secs: f32,
    pub countdown_secs: f32,
    pub cycles_per_race: u32,
    pub cycle_progress: f32,
    pub stall_timeout_secs: f32,
    pub stall_progress_threshold: f32,

    pub max_name_len: usize,

    pub input_channel_capacity: usize,
    pub send_channel_capacity: usize,
    pub write_batch_limit: usize,

    pub read_deadline_secs: u64,
    pub write_deadline_secs: u64,
    pub heartbeat_interval_secs: u64,

    pub cors_allow_origin: Option<String>,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world_w: 4000.0,
            world_h: 4000.0,
            tick_rate_hz: 30.0,
            broadcast_rate_hz: 15.0,
            leaderboard_rate_hz: 1.0,
            shark_vision_rate_hz: 2.0,

            initial_size: 20.0,
            min_size: 10.0,
            max_size: 200.0,
            player_speed: 200.0,
            boost_multiplier: 2.0,
            boost_cost_per_sec: 3.0,
            view_distance: 600.0,

            max_food_count: 300,
            food_value: 2.0,
            food_min_size: 3.0,
            food_max_size: 10.0,
            food_spawn_rate: 5,

            max_powerup_count: 10,
            powerup_duration_secs: 5.0,

            respawn_delay_secs: 3.0,
            size_multiplier: 1.1,
            velocity_lerp: 0.1,
            bounce_strength: 150.0,

            race_max_players: 8,
            lobby_wait_secs: 10.0,
            countdown_secs: 3.0,
            cycles_per_race: 50,
            cycle_progress: 0.02,
            stall_timeout_secs: 3.0,
            stall_progress_threshold: 0.96,

            max_name_len: 20,

            input_channel_capacity: 1024,
            send_channel_capacity: 1024,
            write_batch_limit: 15,

            read_deadline_secs: 60,
            write_deadline_secs: 10,
            heartbeat_interval_secs: 20,

            cors_allow_origin: None,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Layer environment overrides over the defaults. Unparsable values
    /// are logged and the default is kept rather than aborting startup.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = parse_env("FISH_MAX_POWERUP_COUNT") {
            cfg.max_powerup_count = v;
        }
        if let Some(v) = parse_env("FISH_PORT") {
            cfg.bind_addr = format!("0.0.0.0:{v}");
        } else if let Ok(addr) = env::var("FISH_BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        if let Ok(origin) = env::var("FISH_CORS_ORIGIN") {
            cfg.cors_allow_origin = Some(origin);
        }
        if let Some(v) = parse_env("FISH_VIEW_DISTANCE") {
            cfg.view_distance = v;
        }
        if let Some(v) = parse_env("FISH_TICK_RATE_HZ") {
            cfg.tick_rate_hz = v;
        }

        cfg
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    pub fn broadcast_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.broadcast_rate_hz)
    }

    pub fn leaderboard_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.leaderboard_rate_hz)
    }

    pub fn shark_vision_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.shark_vision_rate_hz)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, raw, "ignoring unparsable env override");
                None
            }
        },
        Err(_) => None,
    }
}
