//! The ocean simulator: fixed-rate tick loop, physics, collision
//! resolution, powerups, spawners, and the interest-scoped broadcast
//! loops. This is the largest single component: one authoritative
//! mutation loop plus several independent read-only broadcast cadences
//! sharing one `RwLock<OceanWorld>`.

use crate::config::Config;
use crate::connection::ConnectionHandle;
use crate::entity::{Food, IdCounter, Player, Powerup, Species};
use crate::error::ConnectionError;
use crate::geometry::{circle_overlaps_circle, circle_overlaps_obb, obb_overlaps_obb, wrap_angle, Circle, Rect, Vec2};
use crate::quadtree::{QuadPoint, QuadTree};
use crate::wire::{FoodEntry, OtherPlayer, PowerupEntry, ServerFrame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, RwLock};
use tokio::time::MissedTickBehavior;

pub struct PlayerInput {
    pub player_id: String,
    pub dir: Vec2,
    pub boost: bool,
    pub seq: u32,
}

pub struct OceanWorld {
    pub players: HashMap<String, Player>,
    pub connections: HashMap<String, Arc<ConnectionHandle>>,
    pub food: HashMap<u64, Food>,
    pub powerups: HashMap<u64, Powerup>,
    food_ids: IdCounter,
    powerup_ids: IdCounter,
    rng: StdRng,
    pub tick_id: u64,
}

impl OceanWorld {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            players: HashMap::new(),
            connections: HashMap::new(),
            food: HashMap::new(),
            powerups: HashMap::new(),
            food_ids: IdCounter::new(),
            powerup_ids: IdCounter::new(),
            rng: StdRng::seed_from_u64(seed),
            tick_id: 0,
        }
    }

    pub fn add_player(&mut self, id: String, name: String, species: Species, config: &Config) {
        let pos = random_interior_position(&mut self.rng, config, 100.0);
        let player = Player::new(id.clone(), name, species, pos, config.initial_size);
        self.players.insert(id, player);
    }

    pub fn remove_player(&mut self, id: &str) {
        self.players.remove(id);
        self.connections.remove(id);
    }
}

impl Default for OceanWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn random_interior_position(rng: &mut StdRng, config: &Config, margin: f32) -> Vec2 {
    let w = config.world_w as f32;
    let h = config.world_h as f32;
    let margin = margin.max(0.0).min(w / 2.0).min(h / 2.0);
    Vec2::new(rng.gen_range(margin..=(w - margin)), rng.gen_range(margin..=(h - margin)))
}

/// What a quadtree slot refers to; kept out of the tree itself so the
/// tree stays a plain `Copy` key (`usize`) while players keep string ids.
enum EntityRef {
    Player(String),
    Food(u64),
    Powerup(u64),
}

// ---- tick sub-passes -------------------------------------------------

pub fn drain_inputs(world: &mut OceanWorld, input_rx: &mut mpsc::Receiver<PlayerInput>) {
    loop {
        match input_rx.try_recv() {
            Ok(input) => {
                if let Some(player) = world.players.get_mut(&input.player_id) {
                    if player.alive {
                        player.input.dir = input.dir.normalize();
                        player.input.boost = input.boost;
                        player.last_seq = input.seq;
                    }
                } else {
                    tracing::debug!(player_id = %input.player_id, "input for unknown player, dropping");
                }
            }
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => break,
        }
    }
}

pub fn physics_pass(world: &mut OceanWorld, config: &Config, dt: f32) {
    let w = config.world_w as f32;
    let h = config.world_h as f32;

    for player in world.players.values_mut() {
        if !player.alive {
            continue;
        }

        let speed = if player.input.boost {
            config.player_speed * config.boost_multiplier
        } else {
            config.player_speed
        };
        let target = player.input.dir.mul(speed);
        player.velocity = crate::geometry::lerp_vec2(player.velocity, target, config.velocity_lerp);

        player.position = player.position.add(player.velocity.mul(dt));

        if player.position.x < 0.0 {
            player.position.x = 0.0;
            player.velocity.x = 0.0;
        } else if player.position.x > w {
            player.position.x = w;
            player.velocity.x = 0.0;
        }
        if player.position.y < 0.0 {
            player.position.y = 0.0;
            player.velocity.y = 0.0;
        } else if player.position.y > h {
            player.position.y = h;
            player.velocity.y = 0.0;
        }

        if player.velocity.length() > 0.1 {
            player.rotation = wrap_angle(player.velocity.y.atan2(player.velocity.x) + std::f32::consts::PI);
        }

        if player.velocity.length() > 1.5 * config.player_speed && player.size > config.min_size {
            player.size = (player.size - config.boost_cost_per_sec * dt).max(config.min_size);
        }
    }
}

fn rebuild_index(world: &OceanWorld, config: &Config) -> (QuadTree<usize>, Vec<EntityRef>) {
    let bounds = Rect::new(0.0, 0.0, config.world_w as f32, config.world_h as f32);
    let mut tree = QuadTree::new(bounds);
    let mut refs = Vec::new();

    for p in world.players.values().filter(|p| p.alive) {
        let idx = refs.len();
        refs.push(EntityRef::Player(p.id.clone()));
        tree.insert(QuadPoint {
            id: idx,
            pos: p.position,
            radius: p.size,
        });
    }
    for f in world.food.values() {
        let idx = refs.len();
        refs.push(EntityRef::Food(f.id));
        tree.insert(QuadPoint {
            id: idx,
            pos: f.position,
            radius: f.radius,
        });
    }
    for pu in world.powerups.values() {
        let idx = refs.len();
        refs.push(EntityRef::Powerup(pu.id));
        tree.insert(QuadPoint {
            id: idx,
            pos: pu.position,
            radius: pu.radius,
        });
    }

    (tree, refs)
}

pub fn eating_pass(world: &mut OceanWorld, tree: &QuadTree<usize>, refs: &[EntityRef], config: &Config) {
    let alive_ids: Vec<String> = world
        .players
        .iter()
        .filter(|(_, p)| p.alive)
        .map(|(id, _)| id.clone())
        .collect();

    for eater_id in alive_ids {
        let (mouth, eater_pos, eater_size, eater_name) = {
            let Some(eater) = world.players.get(&eater_id) else {
                continue;
            };
            if !eater.alive {
                continue;
            }
            (eater.mouth_circle(), eater.position, eater.size, eater.name.clone())
        };

        let mut candidates = Vec::new();
        tree.query_circle(eater_pos, config.view_distance, &mut candidates);

        for c in candidates {
            match &refs[c.id] {
                EntityRef::Player(victim_id) => {
                    if *victim_id == eater_id {
                        continue;
                    }
                    let Some(victim) = world.players.get(victim_id) else {
                        continue;
                    };
                    if !victim.alive || victim.is_invulnerable() {
                        continue;
                    }
                    let body = victim.body_obb();
                    let victim_size = victim.size;
                    let victim_score = victim.score;
                    if circle_overlaps_obb(mouth, body) && eater_size >= victim_size * config.size_multiplier {
                        if let Some(v) = world.players.get_mut(victim_id) {
                            v.alive = false;
                            v.killed_by = Some(eater_name.clone());
                            v.respawn_in = config.respawn_delay_secs;
                        }
                        if let Some(e) = world.players.get_mut(&eater_id) {
                            e.size = (e.size + victim_size * 0.5).min(config.max_size);
                            e.score += victim_score + 100;
                        }
                    }
                }
                EntityRef::Food(food_id) => {
                    let Some(food) = world.food.get(food_id) else {
                        continue;
                    };
                    let food_circle = Circle::new(food.position, food.radius);
                    let body = world.players.get(&eater_id).map(|e| e.body_obb());
                    let hit = circle_overlaps_circle(mouth, food_circle)
                        || body.map(|b| circle_overlaps_obb(food_circle, b)).unwrap_or(false);
                    if hit {
                        world.food.remove(food_id);
                        if let Some(e) = world.players.get_mut(&eater_id) {
                            e.size = (e.size + config.food_value).min(config.max_size);
                            e.score += 1;
                        }
                    }
                }
                EntityRef::Powerup(powerup_id) => {
                    let Some(powerup) = world.powerups.get(powerup_id) else {
                        continue;
                    };
                    let already_active = world.players.get(&eater_id).map(|e| e.powerup.active).unwrap_or(true);
                    if already_active {
                        continue;
                    }
                    let powerup_circle = Circle::new(powerup.position, powerup.radius);
                    let body = world.players.get(&eater_id).map(|e| e.body_obb());
                    let hit = circle_overlaps_circle(mouth, powerup_circle)
                        || body.map(|b| circle_overlaps_obb(powerup_circle, b)).unwrap_or(false);
                    if hit {
                        world.powerups.remove(powerup_id);
                        if let Some(e) = world.players.get_mut(&eater_id) {
                            e.powerup.active = true;
                            e.powerup.remaining_secs = config.powerup_duration_secs;
                            if e.species == Species::Pufferfish {
                                e.powerup.base_size = e.size;
                                e.size = (e.size * 1.5).min(config.max_size);
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn bounce_pass(world: &mut OceanWorld, config: &Config) {
    let alive_ids: Vec<String> = world
        .players
        .iter()
        .filter(|(_, p)| p.alive)
        .map(|(id, _)| id.clone())
        .collect();

    for i in 0..alive_ids.len() {
        for j in (i + 1)..alive_ids.len() {
            let id_a = &alive_ids[i];
            let id_b = &alive_ids[j];

            let Some((obb_a, size_a)) = world.players.get(id_a).map(|p| (p.body_obb(), p.size)) else {
                continue;
            };
            let Some((obb_b, size_b)) = world.players.get(id_b).map(|p| (p.body_obb(), p.size)) else {
                continue;
            };

            let (overlap, sep) = obb_overlaps_obb(obb_a, obb_b);
            if !overlap {
                continue;
            }

            let a_can_eat_b = size_a >= size_b * config.size_multiplier;
            let b_can_eat_a = size_b >= size_a * config.size_multiplier;
            if a_can_eat_b || b_can_eat_a {
                continue;
            }

            let impulse = sep.mul(config.bounce_strength * 0.016);
            if let Some(a) = world.players.get_mut(id_a) {
                a.velocity = a.velocity.sub(impulse);
            }
            if let Some(b) = world.players.get_mut(id_b) {
                b.velocity = b.velocity.add(impulse);
            }
        }
    }
}

pub fn respawn_pass(world: &mut OceanWorld, config: &Config, dt: f32) {
    let mut to_respawn = Vec::new();
    for (id, p) in world.players.iter_mut() {
        if !p.alive {
            p.respawn_in -= dt;
            if p.respawn_in <= 0.0 {
                to_respawn.push(id.clone());
            }
        }
    }
    for id in to_respawn {
        let pos = random_interior_position(&mut world.rng, config, 100.0);
        if let Some(p) = world.players.get_mut(&id) {
            p.position = pos;
            p.size = config.initial_size;
            p.rotation = 0.0;
            p.alive = true;
            p.velocity = Vec2::ZERO;
            p.killed_by = None;
            p.respawn_in = 0.0;
        }
    }
}

pub fn powerup_pass(world: &mut OceanWorld, dt: f32) {
    for p in world.players.values_mut() {
        if !p.powerup.active {
            continue;
        }
        p.powerup.remaining_secs -= dt;
        if p.powerup.remaining_secs <= 0.0 {
            p.powerup.active = false;
            if p.species == Species::Pufferfish {
                p.size = p.powerup.base_size;
                p.powerup.base_size = 0.0;
            }
        }
    }
}

pub fn spawn_pass(world: &mut OceanWorld, config: &Config) {
    let mut spawned = 0;
    while world.food.len() < config.max_food_count && spawned < config.food_spawn_rate {
        let pos = random_interior_position(&mut world.rng, config, 0.0);
        let radius = world.rng.gen_range(config.food_min_size..=config.food_max_size);
        let id = world.food_ids.next();
        world.food.insert(id, Food { id, position: pos, radius });
        spawned += 1;
    }
    while world.powerups.len() < config.max_powerup_count {
        let pos = random_interior_position(&mut world.rng, config, 0.0);
        let id = world.powerup_ids.next();
        world.powerups.insert(id, Powerup { id, position: pos, radius: 12.0 });
    }
}

/// Runs one full tick in order: drain inputs, physics, rebuild index,
/// eating, bouncing, respawn/powerup timers, spawners.
pub fn run_tick(world: &mut OceanWorld, input_rx: &mut mpsc::Receiver<PlayerInput>, config: &Config, dt: f32) {
    drain_inputs(world, input_rx);
    physics_pass(world, config, dt);
    let (tree, refs) = rebuild_index(world, config);
    eating_pass(world, &tree, &refs, config);
    bounce_pass(world, config);
    respawn_pass(world, config, dt);
    powerup_pass(world, dt);
    spawn_pass(world, config);
    world.tick_id = world.tick_id.wrapping_add(1);
}

pub async fn run_tick_loop(world: Arc<RwLock<OceanWorld>>, mut input_rx: mpsc::Receiver<PlayerInput>, config: Arc<Config>) {
    let dt = (1.0 / config.tick_rate_hz) as f32;
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let mut w = world.write().await;
        run_tick(&mut w, &mut input_rx, &config, dt);
    }
}

// ---- broadcast --------------------------------------------------------

/// Builds the `PlayerInfo` announcements (if any) and the `State` frame
/// for one connection's viewpoint. Kept separate because they route to
/// different channels.
fn build_state_broadcast(world: &OceanWorld, viewer_id: &str, config: &Config) -> Option<(Vec<ServerFrame>, ServerFrame)> {
    let viewer = world.players.get(viewer_id)?;
    let conn = world.connections.get(viewer_id);

    let mut infos = Vec::new();
    let mut others = Vec::new();

    for (id, p) in world.players.iter() {
        if id == viewer_id || !p.alive {
            continue;
        }
        if viewer.position.distance(p.position) > config.view_distance {
            continue;
        }
        if let Some(conn) = conn {
            if conn.mark_seen(id) {
                infos.push(ServerFrame::PlayerInfo {
                    id: id.clone(),
                    name: p.name.clone(),
                    model: p.species.as_str().to_string(),
                });
            }
        }
        others.push(OtherPlayer {
            id: id.clone(),
            x: p.position.x,
            y: p.position.y,
            vel_x: p.velocity.x,
            vel_y: p.velocity.y,
            rot: p.rotation,
            size: p.size,
            powerup_active: p.powerup.active,
        });
    }

    let food = world
        .food
        .values()
        .filter(|f| viewer.position.distance(f.position) <= config.view_distance)
        .map(|f| FoodEntry {
            id: f.id,
            x: f.position.x,
            y: f.position.y,
            r: f.radius,
        })
        .collect();

    let powerups = world
        .powerups
        .values()
        .map(|p| PowerupEntry {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
            r: p.radius,
        })
        .collect();

    let state = ServerFrame::State {
        alive: viewer.alive,
        killed_by: viewer.killed_by.clone(),
        respawn_in: if viewer.alive { None } else { Some(viewer.respawn_in.max(0.0)) },
        powerup_duration: if viewer.powerup.active {
            Some(viewer.powerup.remaining_secs)
        } else {
            None
        },
        x: viewer.position.x,
        y: viewer.position.y,
        vel_x: viewer.velocity.x,
        vel_y: viewer.velocity.y,
        rot: viewer.rotation,
        size: viewer.size,
        score: viewer.score,
        seq: viewer.last_seq,
        others,
        food,
        powerups,
    };

    Some((infos, state))
}

pub async fn run_broadcast_loop(world: Arc<RwLock<OceanWorld>>, config: Arc<Config>) {
    let mut interval = tokio::time::interval(config.broadcast_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let w = world.read().await;
        let ids: Vec<String> = w.players.keys().cloned().collect();
        for id in ids {
            let Some(conn) = w.connections.get(&id) else { continue };
            let Some((infos, state)) = build_state_broadcast(&w, &id, &config) else {
                continue;
            };

            if !infos.is_empty() {
                let mut buf = bytes::BytesMut::new();
                for f in &infos {
                    f.encode(&mut buf);
                }
                if !conn.enqueue_meta_or_primary(buf.freeze()) {
                    tracing::warn!(player_id = %id, error = %ConnectionError::SendChannelFull, "player-info send dropped");
                }
            }

            let mut buf = bytes::BytesMut::new();
            state.encode(&mut buf);
            if !conn.enqueue_primary(buf.freeze()) {
                tracing::warn!(player_id = %id, error = %ConnectionError::SendChannelFull, "state send dropped");
            }
        }
    }
}

pub async fn run_leaderboard_loop(world: Arc<RwLock<OceanWorld>>, config: Arc<Config>) {
    let mut interval = tokio::time::interval(config.leaderboard_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let w = world.read().await;
        let mut ranked: Vec<&Player> = w.players.values().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(10);
        let entries = ranked.into_iter().map(|p| (p.name.clone(), p.score)).collect();

        let mut buf = bytes::BytesMut::new();
        ServerFrame::Leaderboard { entries }.encode(&mut buf);
        let bytes = buf.freeze();

        for conn in w.connections.values() {
            if !conn.enqueue_meta_or_primary(bytes.clone()) {
                tracing::warn!(error = %ConnectionError::SendChannelFull, "leaderboard send dropped");
            }
        }
    }
}

pub async fn run_shark_vision_loop(world: Arc<RwLock<OceanWorld>>, config: Arc<Config>) {
    let mut interval = tokio::time::interval(config.shark_vision_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let w = world.read().await;

        let sharks_watching = w
            .players
            .iter()
            .filter(|(_, p)| p.species == Species::Shark && p.powerup.active)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        if sharks_watching.is_empty() {
            continue;
        }

        let players = w
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| (p.id.clone(), p.position.x, p.position.y))
            .collect();

        let mut buf = bytes::BytesMut::new();
        ServerFrame::AllPlayers { players }.encode(&mut buf);
        let bytes = buf.freeze();

        for id in sharks_watching {
            if let Some(conn) = w.connections.get(&id) {
                if !conn.enqueue_meta_or_primary(bytes.clone()) {
                    tracing::warn!(player_id = %id, error = %ConnectionError::SendChannelFull, "shark vision send dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::default()
    }

    fn empty_input_channel() -> mpsc::Receiver<PlayerInput> {
        let (_tx, rx) = mpsc::channel(1);
        rx
    }

    fn place_player(world: &mut OceanWorld, id: &str, species: Species, pos: Vec2, size: f32, rotation: f32) {
        let mut p = Player::new(id.to_string(), id.to_string(), species, pos, size);
        p.rotation = rotation;
        world.players.insert(id.to_string(), p);
    }

    /// S1 — ocean eat chain.
    #[test]
    fn scenario_s1_eat_chain() {
        let config = test_config();
        let mut world = OceanWorld::new();
        place_player(&mut world, "p1", Species::Swordfish, Vec2::new(500.0, 500.0), 30.0, 0.0);
        place_player(&mut world, "p2", Species::Swordfish, Vec2::new(520.0, 500.0), 25.0, 0.0);

        let mut rx = empty_input_channel();
        run_tick(&mut world, &mut rx, &config, 1.0 / 30.0);

        let p2 = &world.players["p2"];
        assert!(!p2.alive);
        assert_eq!(p2.killed_by.as_deref(), Some("p1"));
        assert_eq!(p2.respawn_in, config.respawn_delay_secs);

        let p1 = &world.players["p1"];
        assert!(p1.size >= 42.5);
        assert_eq!(p1.score, 100 + 0);
    }

    /// S2 — bounce rather than eat.
    #[test]
    fn scenario_s2_bounce_not_eat() {
        let config = test_config();
        let mut world = OceanWorld::new();
        place_player(&mut world, "p1", Species::Shark, Vec2::new(500.0, 500.0), 40.0, 0.0);
        place_player(&mut world, "p2", Species::Shark, Vec2::new(530.0, 500.0), 40.0, 0.0);

        let mut rx = empty_input_channel();
        let mut last_distance = 0.0;
        for _ in 0..5 {
            run_tick(&mut world, &mut rx, &config, 1.0 / 30.0);
            assert!(world.players["p1"].alive);
            assert!(world.players["p2"].alive);
            last_distance = world.players["p1"].position.distance(world.players["p2"].position);
        }
        assert!(last_distance > 30.0);
    }

    /// S3 — pufferfish powerup round-trip.
    #[test]
    fn scenario_s3_pufferfish_powerup_roundtrip() {
        let config = test_config();
        let mut world = OceanWorld::new();
        place_player(&mut world, "p1", Species::Pufferfish, Vec2::new(500.0, 500.0), 50.0, 0.0);
        world.powerups.insert(
            1,
            Powerup {
                id: 1,
                position: Vec2::new(500.0, 500.0),
                radius: 12.0,
            },
        );

        let mut rx = empty_input_channel();
        run_tick(&mut world, &mut rx, &config, 1.0 / 30.0);

        let p1 = &world.players["p1"];
        assert!(p1.powerup.active);
        assert_eq!(p1.powerup.base_size, 50.0);
        assert_eq!(p1.size, 75.0);

        // Fast-forward past the powerup's duration.
        for _ in 0..(config.powerup_duration_secs / (1.0 / 30.0)) as u32 + 2 {
            run_tick(&mut world, &mut rx, &config, 1.0 / 30.0);
        }

        let p1 = &world.players["p1"];
        assert!(!p1.powerup.active);
        assert_eq!(p1.size, 50.0);
        assert_eq!(p1.powerup.base_size, 0.0);
    }

    /// S6 — interest management.
    #[test]
    fn scenario_s6_interest_management() {
        let config = test_config();
        let mut world = OceanWorld::new();
        place_player(&mut world, "a", Species::Swordfish, Vec2::new(0.0, 0.0), 20.0, 0.0);
        place_player(&mut world, "b", Species::Swordfish, Vec2::new(500.0, 0.0), 20.0, 0.0);
        place_player(&mut world, "c", Species::Swordfish, Vec2::new(1000.0, 0.0), 20.0, 0.0);

        for id in ["a", "b", "c"] {
            let (tx, _rx) = mpsc::channel(8);
            world.connections.insert(id.to_string(), Arc::new(ConnectionHandle::new(tx)));
        }

        let (infos_a, state_a) = build_state_broadcast(&world, "a", &config).unwrap();
        let ids_a: Vec<&str> = match &state_a {
            ServerFrame::State { others, .. } => others.iter().map(|o| o.id.as_str()).collect(),
            _ => unreachable!(),
        };
        assert_eq!(ids_a, vec!["b"]);
        assert_eq!(infos_a.len(), 1);

        let (_, state_c) = build_state_broadcast(&world, "c", &config).unwrap();
        let ids_c: Vec<&str> = match &state_c {
            ServerFrame::State { others, .. } => others.iter().map(|o| o.id.as_str()).collect(),
            _ => unreachable!(),
        };
        assert_eq!(ids_c, vec!["b"]);

        // Second call for the same peer must not re-announce it.
        let (infos_a_again, _) = build_state_broadcast(&world, "a", &config).unwrap();
        assert!(infos_a_again.is_empty());
    }

    #[test]
    fn food_and_powerup_counts_stay_within_cap() {
        let config = test_config();
        let mut world = OceanWorld::new();
        let mut rx = empty_input_channel();
        for _ in 0..200 {
            run_tick(&mut world, &mut rx, &config, 1.0 / 30.0);
        }
        assert!(world.food.len() <= config.max_food_count);
        assert!(world.powerups.len() <= config.max_powerup_count);
    }
}
