//! Racing mode: lobby assignment, ready/countdown/racing/finished state
//! machine, per-race 100ms tick, stall auto-finish, ranking. Unlike the
//! ocean, the server does not simulate motion here — clients report a
//! monotonic mouth-cycle counter and the server derives progress from
//! it.

use crate::config::Config;
use crate::entity::Species;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceState {
    Lobby,
    Countdown,
    Racing,
    Finished,
}

pub struct RacingPlayer {
    pub id: String,
    pub name: String,
    pub species: Species,
    pub mouth_cycles: u32,
    pub progress: f32,
    pub finished: bool,
    pub finish_time: f32,
    pub ready: bool,
    pub last_update: Instant,
    pub send: mpsc::Sender<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceResult {
    pub player_id: String,
    pub name: String,
    pub model: String,
    pub finish_time: f32,
    pub mouth_actions_per_minute: f32,
    pub rank: u32,
}

pub struct Race {
    pub id: String,
    pub state: RaceState,
    pub players: HashMap<String, RacingPlayer>,
    pub start_time: Option<Instant>,
    pub countdown_start: Option<Instant>,
    pub results: Vec<RaceResult>,
    last_countdown_broadcast: Option<Instant>,
}

impl Race {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: RaceState::Lobby,
            players: HashMap::new(),
            start_time: None,
            countdown_start: None,
            results: Vec::new(),
            last_countdown_broadcast: None,
        }
    }

    fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.ready)
    }

    fn all_finished(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.finished)
    }
}

pub struct RacingWorld {
    pub races: HashMap<String, Race>,
    pub waiting_lobby_id: String,
}

impl RacingWorld {
    pub fn new() -> Self {
        let lobby = Race::new();
        let id = lobby.id.clone();
        let mut races = HashMap::new();
        races.insert(id.clone(), lobby);
        Self {
            races,
            waiting_lobby_id: id,
        }
    }
}

impl Default for RacingWorld {
    fn default() -> Self {
        Self::new()
    }
}

pub struct JoinOutcome {
    pub race_id: String,
    pub race_state: RaceState,
}

/// Places a new player into the world's current waiting lobby. If that
/// lobby is already at `RaceMaxPlayers`, a fresh lobby is swapped in
/// first (mirrors the Lobby->Countdown replacement, just triggered by
/// capacity instead of readiness).
pub fn join(
    world: &mut RacingWorld,
    id: String,
    name: String,
    species: Species,
    send: mpsc::Sender<String>,
    config: &Config,
) -> JoinOutcome {
    if world
        .races
        .get(&world.waiting_lobby_id)
        .map(|r| r.players.len() >= config.race_max_players)
        .unwrap_or(false)
    {
        let new_lobby = Race::new();
        world.waiting_lobby_id = new_lobby.id.clone();
        world.races.insert(new_lobby.id.clone(), new_lobby);
    }

    let lobby_id = world.waiting_lobby_id.clone();
    let lobby = world.races.get_mut(&lobby_id).expect("waiting lobby always exists");
    lobby.players.insert(
        id.clone(),
        RacingPlayer {
            id,
            name,
            species,
            mouth_cycles: 0,
            progress: 0.0,
            finished: false,
            finish_time: 0.0,
            ready: false,
            last_update: Instant::now(),
            send,
        },
    );
    JoinOutcome {
        race_id: lobby_id,
        race_state: lobby.state,
    }
}

/// Marks a player ready; if everyone present is now ready, transitions
/// the race to Countdown and replenishes the world's waiting lobby.
/// Silently ignored if the race isn't in Lobby.
pub fn set_ready(world: &mut RacingWorld, race_id: &str, player_id: &str) {
    let Some(race) = world.races.get_mut(race_id) else {
        return;
    };
    if race.state != RaceState::Lobby {
        return;
    }
    let Some(player) = race.players.get_mut(player_id) else {
        return;
    };
    player.ready = true;

    if race.all_ready() {
        race.state = RaceState::Countdown;
        race.countdown_start = Some(Instant::now());

        if world.waiting_lobby_id == race_id {
            let new_lobby = Race::new();
            world.waiting_lobby_id = new_lobby.id.clone();
            world.races.insert(new_lobby.id.clone(), new_lobby);
        }
    }
}

/// Applies a client-reported mouth-cycle count. Ignored if the race is
/// Finished or the player is unknown.
pub fn apply_state_update(world: &mut RacingWorld, race_id: &str, player_id: &str, mouth_cycles: u32, config: &Config) {
    let Some(race) = world.races.get_mut(race_id) else {
        return;
    };
    if race.state == RaceState::Finished {
        return;
    }
    let Some(player) = race.players.get_mut(player_id) else {
        return;
    };

    player.mouth_cycles = mouth_cycles;
    player.last_update = Instant::now();
    player.progress = (player.mouth_cycles as f32 * config.cycle_progress).min(1.0);

    if player.progress >= 1.0 && !player.finished {
        finish_player(player, race.start_time, false);
    }
}

/// `mouthCycle{mouthCycle:int}` bumps the counter by one rather than
/// replacing it outright (see DESIGN.md for why).
pub fn apply_mouth_cycle_increment(world: &mut RacingWorld, race_id: &str, player_id: &str, config: &Config) {
    let Some(race) = world.races.get_mut(race_id) else {
        return;
    };
    if race.state == RaceState::Finished {
        return;
    }
    let Some(player) = race.players.get_mut(player_id) else {
        return;
    };
    player.mouth_cycles += 1;
    player.last_update = Instant::now();
    player.progress = (player.mouth_cycles as f32 * config.cycle_progress).min(1.0);
    if player.progress >= 1.0 && !player.finished {
        finish_player(player, race.start_time, false);
    }
}

fn finish_player(player: &mut RacingPlayer, start_time: Option<Instant>, is_stall: bool) {
    let _ = is_stall; // stall finishes are recorded identically to normal finishes
    player.finished = true;
    player.finish_time = start_time.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
}

fn mouth_actions_per_minute(cycles: u32, finish_time: f32) -> f32 {
    if finish_time <= 0.0 {
        return 0.0;
    }
    (cycles as f32 * 2.0 / finish_time) * 60.0
}

/// Per-race 100ms tick: force-finish stalled players, check for an
/// all-finished transition, otherwise the caller broadcasts
/// `RaceState`.
pub fn race_tick(race: &mut Race, config: &Config) {
    if race.state != RaceState::Racing {
        return;
    }

    let stall_ids: Vec<String> = race
        .players
        .values()
        .filter(|p| {
            !p.finished
                && p.progress >= config.stall_progress_threshold
                && p.last_update.elapsed() > Duration::from_secs_f32(config.stall_timeout_secs)
        })
        .map(|p| p.id.clone())
        .collect();

    for id in stall_ids {
        if let Some(player) = race.players.get_mut(&id) {
            finish_player(player, race.start_time, true);
        }
    }

    if race.all_finished() {
        finish_race(race);
    }
}

fn finish_race(race: &mut Race) {
    race.state = RaceState::Finished;
    let mut results: Vec<RaceResult> = race
        .players
        .values()
        .map(|p| RaceResult {
            player_id: p.id.clone(),
            name: p.name.clone(),
            model: p.species.as_str().to_string(),
            finish_time: p.finish_time,
            mouth_actions_per_minute: mouth_actions_per_minute(p.mouth_cycles, p.finish_time),
            rank: 0,
        })
        .collect();
    results.sort_by(|a, b| a.finish_time.partial_cmp(&b.finish_time).unwrap());
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i as u32 + 1;
    }
    race.results = results;
}

/// Advances `Countdown -> Racing` once `CountdownTime` has elapsed.
/// Called from the race's background loop.
pub fn maybe_start_racing(race: &mut Race, config: &Config) -> bool {
    if race.state != RaceState::Countdown {
        return false;
    }
    let Some(start) = race.countdown_start else {
        return false;
    };
    if start.elapsed().as_secs_f32() >= config.countdown_secs {
        race.state = RaceState::Racing;
        race.start_time = Some(Instant::now());
        true
    } else {
        false
    }
}

pub fn time_remaining(race: &Race, config: &Config) -> f32 {
    match race.state {
        RaceState::Countdown => {
            let elapsed = race.countdown_start.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
            (config.countdown_secs - elapsed).max(0.0)
        }
        RaceState::Lobby => config.lobby_wait_secs,
        _ => 0.0,
    }
}

/// Removes a disconnecting player from their race.
pub fn leave(world: &mut RacingWorld, race_id: &str, player_id: &str) {
    let Some(race) = world.races.get_mut(race_id) else {
        return;
    };
    race.players.remove(player_id);

    let is_waiting_lobby = world.waiting_lobby_id == race_id;
    if race.state == RaceState::Finished && race.players.is_empty() {
        world.races.remove(race_id);
    } else if is_waiting_lobby && race.players.is_empty() {
        // Left in place; new joiners replenish it.
    }
}

pub async fn run_race_loop(world: Arc<RwLock<RacingWorld>>, race_id: String, config: Arc<Config>) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let mut w = world.write().await;
        let Some(race) = w.races.get_mut(&race_id) else {
            return;
        };

        maybe_start_racing(race, &config);
        race_tick(race, &config);
        let finished = race.state == RaceState::Finished;

        if finished {
            broadcast_results(race);
            return;
        }

        // The initial Countdown broadcast happens synchronously where the
        // race transitions into Countdown; from here it's throttled to
        // roughly once per second. The Racing tick itself runs every
        // 100ms and always broadcasts.
        if race.state == RaceState::Countdown {
            let should_broadcast = race
                .last_countdown_broadcast
                .map(|t| t.elapsed() >= Duration::from_secs(1))
                .unwrap_or(true);
            if should_broadcast {
                race.last_countdown_broadcast = Some(Instant::now());
                broadcast_race_state(race, &config);
            }
        } else {
            broadcast_race_state(race, &config);
        }
    }
}

#[derive(Serialize, Clone)]
struct WirePlayer<'a> {
    id: &'a str,
    name: &'a str,
    species: &'a str,
    progress: f32,
    finished: bool,
    ready: bool,
}

#[derive(Serialize)]
struct WireRaceState<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "raceState")]
    race_state: RaceState,
    #[serde(rename = "timeRemaining")]
    time_remaining: f32,
    players: Vec<WirePlayer<'a>>,
    #[serde(rename = "yourProgress")]
    your_progress: f32,
    #[serde(rename = "readyCount")]
    ready_count: u32,
    #[serde(rename = "totalPlayers")]
    total_players: u32,
}

/// Broadcasts one `RaceState` frame to every connection in the race,
/// sorted by id so clients can diff frames.
pub fn broadcast_race_state(race: &Race, config: &Config) {
    let mut ordered: Vec<&RacingPlayer> = race.players.values().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let ready_count = ordered.iter().filter(|p| p.ready).count() as u32;
    let total_players = ordered.len() as u32;
    let time_remaining = time_remaining(race, config);

    let wire_players: Vec<WirePlayer> = ordered
        .iter()
        .map(|p| WirePlayer {
            id: &p.id,
            name: &p.name,
            species: p.species.as_str(),
            progress: p.progress,
            finished: p.finished,
            ready: p.ready,
        })
        .collect();

    for p in ordered.iter() {
        let frame = WireRaceState {
            kind: "raceState",
            race_state: race.state,
            time_remaining,
            players: wire_players.clone(),
            your_progress: p.progress,
            ready_count,
            total_players,
        };
        if let Ok(payload) = serde_json::to_string(&frame) {
            let _ = p.send.try_send(payload);
        }
    }
}

pub fn broadcast_results(race: &Race) {
    #[derive(Serialize)]
    struct WireResults<'a> {
        #[serde(rename = "type")]
        kind: &'static str,
        results: &'a [RaceResult],
    }
    let frame = WireResults {
        kind: "raceResults",
        results: &race.results,
    };
    if let Ok(payload) = serde_json::to_string(&frame) {
        for p in race.players.values() {
            let _ = p.send.try_send(payload.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn test_config() -> Config {
        Config::default()
    }

    fn channel() -> mpsc::Sender<String> {
        let (tx, _rx) = mpsc::channel(8);
        tx
    }

    /// S4 — racing single player.
    #[test]
    fn scenario_s4_single_player_finish() {
        let config = test_config();
        let mut world = RacingWorld::new();
        let lobby_id = world.waiting_lobby_id.clone();
        join(&mut world, "p1".into(), "Nemo".into(), Species::Swordfish, channel(), &config);
        set_ready(&mut world, &lobby_id, "p1");

        // Going to Countdown replaces the world's waiting-lobby pointer,
        // but the race object we joined keeps its id and stays in the map.
        let race = world.races.get_mut(&lobby_id).unwrap();
        assert_eq!(race.state, RaceState::Countdown);
        race.start_time = Some(Instant::now());
        race.state = RaceState::Racing;

        apply_state_update(&mut world, &lobby_id, "p1", 50, &config);
        let race = &world.races[&lobby_id];
        let p1 = &race.players["p1"];
        assert_eq!(p1.progress, 1.0);
        assert!(p1.finished);
    }

    #[test]
    fn scenario_s5_stall_auto_finish() {
        let config = Config {
            stall_timeout_secs: 0.01,
            ..Config::default()
        };
        let mut world = RacingWorld::new();
        let lobby_id = world.waiting_lobby_id.clone();
        join(&mut world, "p1".into(), "Nemo".into(), Species::Swordfish, channel(), &config);

        let race = world.races.get_mut(&lobby_id).unwrap();
        race.state = RaceState::Racing;
        race.start_time = Some(Instant::now());
        race.players.get_mut("p1").unwrap().progress = 0.98;
        race.players.get_mut("p1").unwrap().last_update = Instant::now() - Duration::from_secs(4);

        sleep(Duration::from_millis(20));
        race_tick(race, &config);

        assert!(race.players["p1"].finished);
        assert_eq!(race.state, RaceState::Finished);
        assert_eq!(race.results.len(), 1);
        assert_eq!(race.results[0].rank, 1);
    }

    #[test]
    fn ranks_are_a_permutation_ordered_by_finish_time() {
        let mut race = Race::new();
        for (id, finish_time) in [("a", 10.0_f32), ("b", 5.0), ("c", 7.5)] {
            race.players.insert(
                id.to_string(),
                RacingPlayer {
                    id: id.to_string(),
                    name: id.to_string(),
                    species: Species::Swordfish,
                    mouth_cycles: 50,
                    progress: 1.0,
                    finished: true,
                    finish_time,
                    ready: true,
                    last_update: Instant::now(),
                    send: channel(),
                },
            );
        }
        finish_race(&mut race);
        let ranks: Vec<u32> = race.results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(race.results[0].player_id, "b");
    }

    #[test]
    fn ready_while_not_in_lobby_is_ignored() {
        let config = test_config();
        let mut world = RacingWorld::new();
        let lobby_id = world.waiting_lobby_id.clone();
        join(&mut world, "p1".into(), "Nemo".into(), Species::Swordfish, channel(), &config);
        world.races.get_mut(&lobby_id).unwrap().state = RaceState::Racing;
        set_ready(&mut world, &lobby_id, "p1");
        assert!(!world.races[&lobby_id].players["p1"].ready);
    }

    #[test]
    fn lobby_over_capacity_spills_into_a_new_lobby() {
        let config = Config {
            race_max_players: 2,
            ..Config::default()
        };
        let mut world = RacingWorld::new();
        let first_lobby = world.waiting_lobby_id.clone();

        join(&mut world, "p1".into(), "A".into(), Species::Swordfish, channel(), &config);
        join(&mut world, "p2".into(), "B".into(), Species::Swordfish, channel(), &config);
        assert_eq!(world.waiting_lobby_id, first_lobby);
        assert_eq!(world.races[&first_lobby].players.len(), 2);

        let outcome = join(&mut world, "p3".into(), "C".into(), Species::Swordfish, channel(), &config);
        assert_ne!(outcome.race_id, first_lobby);
        assert_ne!(world.waiting_lobby_id, first_lobby);
        assert_eq!(world.races[&first_lobby].players.len(), 2);
        assert_eq!(world.races[&outcome.race_id].players.len(), 1);
    }
}
