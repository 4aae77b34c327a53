//! Per-connection plumbing shared by both game modes: bounded send
//! channels, write-side batching, and the read/write task pair spawned
//! for every accepted WebSocket upgrade.
//!
//! The world never reaches into a connection's internals: it only holds
//! a `ConnectionHandle` and calls `enqueue_primary` /
//! `enqueue_meta_or_primary`.

use axum::extract::ws::{Message, WebSocket};
use bytes::{Bytes, BytesMut};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{timeout, MissedTickBehavior};

pub struct ConnectionHandle {
    /// When the primary socket was accepted; diagnostic only, never sent
    /// on the wire.
    pub connected_at: Instant,
    inner: Mutex<ConnectionInner>,
}

struct ConnectionInner {
    primary_tx: mpsc::Sender<Bytes>,
    meta_tx: Option<mpsc::Sender<Bytes>>,
    /// Peer ids already announced via a `PlayerInfo` frame to this
    /// connection. Lives here, not on the world's `Player`, because it
    /// is acquired *inside* the world lock while broadcasting.
    seen_peers: std::collections::HashSet<String>,
}

impl ConnectionHandle {
    pub fn new(primary_tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            connected_at: Instant::now(),
            inner: Mutex::new(ConnectionInner {
                primary_tx,
                meta_tx: None,
                seen_peers: std::collections::HashSet::new(),
            }),
        }
    }

    /// Returns `true` the first time `peer_id` is marked seen for this
    /// connection, `false` on every subsequent call.
    pub fn mark_seen(&self, peer_id: &str) -> bool {
        let mut guard = self.inner.lock().unwrap();
        if guard.seen_peers.contains(peer_id) {
            false
        } else {
            guard.seen_peers.insert(peer_id.to_string());
            true
        }
    }

    pub fn attach_meta(&self, meta_tx: mpsc::Sender<Bytes>) {
        self.inner.lock().unwrap().meta_tx = Some(meta_tx);
    }

    /// Non-blocking enqueue on the primary channel only. Returns `false`
    /// on overflow or a closed channel — the caller must disconnect.
    pub fn enqueue_primary(&self, frame: Bytes) -> bool {
        let tx = self.inner.lock().unwrap().primary_tx.clone();
        tx.try_send(frame).is_ok()
    }

    /// Prefers the metadata channel if one is bound, otherwise falls back
    /// to the primary channel. Used for leaderboard, playerInfo, and
    /// other frames that may be shed without affecting gameplay.
    pub fn enqueue_meta_or_primary(&self, frame: Bytes) -> bool {
        let (meta, primary) = {
            let guard = self.inner.lock().unwrap();
            (guard.meta_tx.clone(), guard.primary_tx.clone())
        };
        match meta {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => primary.try_send(frame).is_ok(),
        }
    }
}

/// Sends one message, tearing down the connection if the write doesn't
/// complete within `write_deadline` (spec: "write deadlines 10s;
/// violation tears down the connection").
async fn send_with_deadline(sink: &mut SplitSink<WebSocket, Message>, msg: Message, write_deadline: Duration) -> bool {
    match timeout(write_deadline, sink.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(_)) | Err(_) => false,
    }
}

/// Drains the channel, greedily batching up to `batch_limit` queued
/// frames into one WebSocket binary message. Returns when the channel
/// closes or a write fails. Also drives a periodic protocol-level ping
/// so idle clients don't trip the read deadline.
pub async fn run_binary_writer(
    mut rx: mpsc::Receiver<Bytes>,
    mut sink: SplitSink<WebSocket, Message>,
    batch_limit: usize,
    heartbeat: Duration,
    write_deadline: Duration,
) {
    let mut heartbeat_tick = tokio::time::interval(heartbeat);
    heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            first = rx.recv() => {
                let Some(first) = first else { break };
                let mut batch = BytesMut::new();
                batch.extend_from_slice(&first);

                let mut drained = 1;
                while drained < batch_limit {
                    match rx.try_recv() {
                        Ok(more) => {
                            batch.extend_from_slice(&more);
                            drained += 1;
                        }
                        Err(_) => break,
                    }
                }

                if !send_with_deadline(&mut sink, Message::Binary(batch.to_vec()), write_deadline).await {
                    break;
                }
            }
            _ = heartbeat_tick.tick() => {
                if !send_with_deadline(&mut sink, Message::Ping(Vec::new()), write_deadline).await {
                    break;
                }
            }
        }
    }
}

/// The racing mode's writer is the JSON analogue: one message per queued
/// string, no batching (see DESIGN.md for why racing frames are sent
/// unbatched).
pub async fn run_json_writer(
    mut rx: mpsc::Receiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
    heartbeat: Duration,
    write_deadline: Duration,
) {
    let mut heartbeat_tick = tokio::time::interval(heartbeat);
    heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                if !send_with_deadline(&mut sink, Message::Text(payload), write_deadline).await {
                    break;
                }
            }
            _ = heartbeat_tick.tick() => {
                if !send_with_deadline(&mut sink, Message::Ping(Vec::new()), write_deadline).await {
                    break;
                }
            }
        }
    }
}
