//! HTTP/WebSocket entry points: three upgrade endpoints binding
//! connections to the ocean or racing simulator, plus a liveness
//! string.

use crate::config::Config;
use crate::connection::{run_binary_writer, run_json_writer, ConnectionHandle};
use crate::entity::Species;
use crate::error::ConnectionError;
use crate::geometry::Vec2;
use crate::ocean::{OceanWorld, PlayerInput};
use crate::racing::{self, RaceState, RacingWorld};
use crate::wire::ServerFrame;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ocean_world: Arc<RwLock<OceanWorld>>,
    pub ocean_input_tx: mpsc::Sender<PlayerInput>,
    pub racing_world: Arc<RwLock<RacingWorld>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/ws", get(ocean_ws_handler))
        .route("/ws/meta", get(ocean_meta_ws_handler))
        .route("/ws/racing", get(racing_ws_handler))
        .with_state(state)
}

async fn liveness() -> &'static str {
    "fish-backend: ok"
}

fn sanitize_name(raw: Option<String>, max_len: usize) -> String {
    let name = raw.unwrap_or_default();
    let trimmed: String = name.chars().take(max_len).collect();
    if trimmed.trim().is_empty() {
        "Fish".to_string()
    } else {
        trimmed
    }
}

// ---- ocean primary channel ---------------------------------------------

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum OceanClientMessage {
    #[serde(rename = "join")]
    Join { name: Option<String>, model: Option<String> },
    #[serde(rename = "input")]
    Input {
        #[serde(rename = "dirX")]
        dir_x: f32,
        #[serde(rename = "dirY")]
        dir_y: f32,
        boost: bool,
        seq: u32,
    },
    #[serde(rename = "ping")]
    Ping,
}

async fn ocean_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ocean_socket(socket, state))
}

async fn handle_ocean_socket(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel::<bytes::Bytes>(state.config.send_channel_capacity);
    let conn = Arc::new(ConnectionHandle::new(tx));
    let writer = tokio::spawn(run_binary_writer(
        rx,
        sink,
        state.config.write_batch_limit,
        Duration::from_secs(state.config.heartbeat_interval_secs),
        Duration::from_secs(state.config.write_deadline_secs),
    ));

    let mut player_id: Option<String> = None;
    let read_deadline = Duration::from_secs(state.config.read_deadline_secs);

    loop {
        let next = tokio::time::timeout(read_deadline, stream.next()).await;
        let msg = match next {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %ConnectionError::WebSocket(e), "ocean websocket read error");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(error = %ConnectionError::ReadTimeout, "ocean connection read deadline exceeded");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_ocean_text(&text, &state, &conn, &mut player_id).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    tracing::debug!(
        player_id = ?player_id,
        connected_secs = conn.connected_at.elapsed().as_secs_f64(),
        "ocean connection closed"
    );

    if let Some(id) = player_id {
        let mut w = state.ocean_world.write().await;
        w.remove_player(&id);
    }
    writer.abort();
}

async fn handle_ocean_text(text: &str, state: &AppState, conn: &Arc<ConnectionHandle>, player_id: &mut Option<String>) {
    let parsed: Result<OceanClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(OceanClientMessage::Join { name, model }) => {
            let id = Uuid::new_v4().to_string();
            let species = model.as_deref().map(Species::parse).unwrap_or(Species::Swordfish);
            let sanitized_name = sanitize_name(name, state.config.max_name_len);

            {
                let mut w = state.ocean_world.write().await;
                w.add_player(id.clone(), sanitized_name.clone(), species, &state.config);
                w.connections.insert(id.clone(), conn.clone());
            }
            *player_id = Some(id.clone());

            let welcome = ServerFrame::Welcome {
                id,
                name: sanitized_name,
                model: species.as_str().to_string(),
                world_w: state.config.world_w,
                world_h: state.config.world_h,
            };
            send_frame(conn, &welcome);
        }
        Ok(OceanClientMessage::Input { dir_x, dir_y, boost, seq }) => {
            if let Some(id) = player_id.as_ref() {
                let input = PlayerInput {
                    player_id: id.clone(),
                    dir: Vec2::new(dir_x, dir_y),
                    boost,
                    seq,
                };
                if state.ocean_input_tx.try_send(input).is_err() {
                    tracing::debug!(player_id = %id, "input queue saturated, dropping input");
                }
            }
        }
        Ok(OceanClientMessage::Ping) => {
            send_frame(conn, &ServerFrame::Pong);
        }
        Err(e) => {
            tracing::debug!(error = %ConnectionError::from(e), "malformed ocean client message");
        }
    }
}

fn send_frame(conn: &Arc<ConnectionHandle>, frame: &ServerFrame) {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    if !conn.enqueue_primary(buf.freeze()) {
        tracing::debug!(error = %ConnectionError::SendChannelFull, "dropped single frame send");
    }
}

// ---- ocean metadata channel ---------------------------------------------

#[derive(Deserialize)]
struct MetaQuery {
    id: String,
}

async fn ocean_meta_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<MetaQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ocean_meta_socket(socket, query.id, state))
}

async fn handle_ocean_meta_socket(socket: WebSocket, client_id: String, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel::<bytes::Bytes>(state.config.send_channel_capacity);

    {
        let w = state.ocean_world.read().await;
        match w.connections.get(&client_id) {
            Some(conn) => conn.attach_meta(tx),
            None => {
                tracing::debug!(client_id = %client_id, "meta channel for unknown client id");
                return;
            }
        }
    }

    let writer = tokio::spawn(run_binary_writer(
        rx,
        sink,
        state.config.write_batch_limit,
        Duration::from_secs(state.config.heartbeat_interval_secs),
        Duration::from_secs(state.config.write_deadline_secs),
    ));
    let read_deadline = Duration::from_secs(state.config.read_deadline_secs);

    loop {
        match tokio::time::timeout(read_deadline, stream.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Err(_) => break,
            Ok(Some(Err(_))) => break,
            Ok(Some(Ok(_))) => {}
        }
    }

    writer.abort();
}

// ---- racing channel ------------------------------------------------------

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RacingClientMessage {
    #[serde(rename = "join")]
    Join { name: Option<String>, model: Option<String> },
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "mouthInput")]
    MouthInput {
        #[allow(dead_code)]
        #[serde(rename = "mouthOpen")]
        mouth_open: bool,
    },
    #[serde(rename = "mouthCycle")]
    MouthCycle {
        #[allow(dead_code)]
        #[serde(rename = "mouthCycle")]
        mouth_cycle: i64,
    },
    #[serde(rename = "stateUpdate")]
    StateUpdate {
        #[serde(rename = "fishState")]
        fish_state: FishState,
    },
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Deserialize)]
struct FishState {
    #[serde(rename = "mouthCycles")]
    mouth_cycles: u32,
}

async fn racing_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_racing_socket(socket, state))
}

async fn handle_racing_socket(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(state.config.send_channel_capacity);
    let writer = tokio::spawn(run_json_writer(
        rx,
        sink,
        Duration::from_secs(state.config.heartbeat_interval_secs),
        Duration::from_secs(state.config.write_deadline_secs),
    ));

    let mut joined: Option<(String, String)> = None; // (player_id, race_id)
    let read_deadline = Duration::from_secs(state.config.read_deadline_secs);

    loop {
        let next = tokio::time::timeout(read_deadline, stream.next()).await;
        let msg = match next {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %ConnectionError::WebSocket(e), "racing websocket read error");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(error = %ConnectionError::ReadTimeout, "racing connection read deadline exceeded");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_racing_text(&text, &state, &tx, &mut joined).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    if let Some((player_id, race_id)) = joined {
        let mut w = state.racing_world.write().await;
        racing::leave(&mut w, &race_id, &player_id);
    }
    writer.abort();
}

async fn handle_racing_text(
    text: &str,
    state: &AppState,
    tx: &mpsc::Sender<String>,
    joined: &mut Option<(String, String)>,
) {
    let parsed: Result<RacingClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(RacingClientMessage::Join { name, model }) => {
            let id = Uuid::new_v4().to_string();
            let species = model.as_deref().map(Species::parse).unwrap_or(Species::Swordfish);
            let sanitized_name = sanitize_name(name, state.config.max_name_len);

            let (race_id, race_state) = {
                let mut w = state.racing_world.write().await;
                let outcome = racing::join(&mut w, id.clone(), sanitized_name.clone(), species, tx.clone(), &state.config);
                (outcome.race_id, outcome.race_state)
            };
            *joined = Some((id.clone(), race_id.clone()));

            #[derive(serde::Serialize)]
            struct Welcome<'a> {
                #[serde(rename = "type")]
                kind: &'static str,
                #[serde(rename = "playerId")]
                player_id: &'a str,
                #[serde(rename = "raceId")]
                race_id: &'a str,
                name: &'a str,
                model: &'a str,
                #[serde(rename = "raceState")]
                race_state: RaceState,
            }
            let payload = Welcome {
                kind: "welcome",
                player_id: &id,
                race_id: &race_id,
                name: &sanitized_name,
                model: species.as_str(),
                race_state,
            };
            if let Ok(json) = serde_json::to_string(&payload) {
                let _ = tx.try_send(json);
            }

            let w = state.racing_world.read().await;
            if let Some(race) = w.races.get(&race_id) {
                racing::broadcast_race_state(race, &state.config);
            }
        }
        Ok(RacingClientMessage::Ready) => {
            if let Some((player_id, race_id)) = joined.as_ref() {
                let should_spawn = {
                    let mut w = state.racing_world.write().await;
                    racing::set_ready(&mut w, race_id, player_id);
                    w.races.get(race_id).map(|r| r.state) == Some(RaceState::Countdown)
                };
                {
                    let w = state.racing_world.read().await;
                    if let Some(race) = w.races.get(race_id) {
                        racing::broadcast_race_state(race, &state.config);
                    }
                }
                if should_spawn {
                    tokio::spawn(racing::run_race_loop(
                        state.racing_world.clone(),
                        race_id.clone(),
                        state.config.clone(),
                    ));
                }
            }
        }
        Ok(RacingClientMessage::StateUpdate { fish_state }) => {
            if let Some((player_id, race_id)) = joined.as_ref() {
                let mut w = state.racing_world.write().await;
                racing::apply_state_update(&mut w, race_id, player_id, fish_state.mouth_cycles, &state.config);
            }
        }
        Ok(RacingClientMessage::MouthCycle { .. }) => {
            if let Some((player_id, race_id)) = joined.as_ref() {
                let mut w = state.racing_world.write().await;
                racing::apply_mouth_cycle_increment(&mut w, race_id, player_id, &state.config);
            }
        }
        Ok(RacingClientMessage::MouthInput { .. }) => {
            // Does not affect progress on its own.
        }
        Ok(RacingClientMessage::Ping) => {
            let _ = tx.try_send("{\"type\":\"pong\"}".to_string());
        }
        Err(e) => {
            tracing::debug!(error = %ConnectionError::from(e), "malformed racing client message");
        }
    }
}
