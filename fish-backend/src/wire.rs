//! Binary wire codec for the ocean mode. Big-endian, length-prefixed
//! strings, float32 kinematics, float64 world dimensions. Frames are
//! written into a reusable `BytesMut` so the writer task can batch
//! several frames into one WebSocket message.

use crate::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

const MAX_STRING_LEN: usize = u16::MAX as usize;

fn put_str(buf: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    debug_assert!(bytes.len() <= MAX_STRING_LEN);
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
}

fn put_f32(buf: &mut BytesMut, v: f32) {
    buf.put_slice(&v.to_be_bytes());
}

fn put_f64(buf: &mut BytesMut, v: f64) {
    buf.put_slice(&v.to_be_bytes());
}

fn get_str(buf: &mut Bytes) -> Result<String, WireError> {
    if buf.remaining() < 2 {
        return Err(WireError::UnexpectedEof("string length"));
    }
    let len = buf.get_u16() as usize;
    if len > MAX_STRING_LEN {
        return Err(WireError::StringTooLong {
            len,
            max: MAX_STRING_LEN,
        });
    }
    if buf.remaining() < len {
        return Err(WireError::UnexpectedEof("string bytes"));
    }
    let raw = buf.copy_to_bytes(len);
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn get_f32(buf: &mut Bytes) -> Result<f32, WireError> {
    if buf.remaining() < 4 {
        return Err(WireError::UnexpectedEof("f32"));
    }
    Ok(f32::from_be_bytes(buf.copy_to_bytes(4).as_ref().try_into().unwrap()))
}

fn get_f64(buf: &mut Bytes) -> Result<f64, WireError> {
    if buf.remaining() < 8 {
        return Err(WireError::UnexpectedEof("f64"));
    }
    Ok(f64::from_be_bytes(buf.copy_to_bytes(8).as_ref().try_into().unwrap()))
}

fn need(buf: &Bytes, n: usize, what: &'static str) -> Result<(), WireError> {
    if buf.remaining() < n {
        Err(WireError::UnexpectedEof(what))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherPlayer {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub rot: f32,
    pub size: f32,
    pub powerup_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodEntry {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerupEntry {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Welcome {
        id: String,
        name: String,
        model: String,
        world_w: f64,
        world_h: f64,
    },
    State {
        alive: bool,
        killed_by: Option<String>,
        respawn_in: Option<f32>,
        powerup_duration: Option<f32>,
        x: f32,
        y: f32,
        vel_x: f32,
        vel_y: f32,
        rot: f32,
        size: f32,
        score: u32,
        seq: u32,
        others: Vec<OtherPlayer>,
        food: Vec<FoodEntry>,
        powerups: Vec<PowerupEntry>,
    },
    Pong,
    Leaderboard {
        entries: Vec<(String, u32)>,
    },
    PlayerInfo {
        id: String,
        name: String,
        model: String,
    },
    AllPlayers {
        players: Vec<(String, f32, f32)>,
    },
}

impl ServerFrame {
    pub fn tag(&self) -> u8 {
        match self {
            ServerFrame::Welcome { .. } => 1,
            ServerFrame::State { .. } => 2,
            ServerFrame::Pong => 3,
            ServerFrame::Leaderboard { .. } => 4,
            ServerFrame::PlayerInfo { .. } => 5,
            ServerFrame::AllPlayers { .. } => 6,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tag());
        match self {
            ServerFrame::Welcome {
                id,
                name,
                model,
                world_w,
                world_h,
            } => {
                put_str(buf, id);
                put_str(buf, name);
                put_str(buf, model);
                put_f64(buf, *world_w);
                put_f64(buf, *world_h);
            }
            ServerFrame::State {
                alive,
                killed_by,
                respawn_in,
                powerup_duration,
                x,
                y,
                vel_x,
                vel_y,
                rot,
                size,
                score,
                seq,
                others,
                food,
                powerups,
            } => {
                let mut flags = 0u8;
                if *alive {
                    flags |= 0b0001;
                }
                if killed_by.is_some() {
                    flags |= 0b0010;
                }
                if respawn_in.is_some() {
                    flags |= 0b0100;
                }
                if powerup_duration.is_some() {
                    flags |= 0b1000;
                }
                buf.put_u8(flags);
                put_f32(buf, *x);
                put_f32(buf, *y);
                put_f32(buf, *vel_x);
                put_f32(buf, *vel_y);
                put_f32(buf, *rot);
                put_f32(buf, *size);
                buf.put_u32(*score);
                buf.put_u32(*seq);
                if let Some(k) = killed_by {
                    put_str(buf, k);
                }
                if let Some(r) = respawn_in {
                    put_f32(buf, *r);
                }
                if let Some(d) = powerup_duration {
                    put_f32(buf, *d);
                }
                buf.put_u16(others.len() as u16);
                for o in others {
                    put_str(buf, &o.id);
                    put_f32(buf, o.x);
                    put_f32(buf, o.y);
                    put_f32(buf, o.vel_x);
                    put_f32(buf, o.vel_y);
                    put_f32(buf, o.rot);
                    put_f32(buf, o.size);
                    buf.put_u8(o.powerup_active as u8);
                }
                buf.put_u16(food.len() as u16);
                for f in food {
                    buf.put_u64(f.id);
                    put_f32(buf, f.x);
                    put_f32(buf, f.y);
                    put_f32(buf, f.r);
                }
                buf.put_u16(powerups.len() as u16);
                for p in powerups {
                    buf.put_u64(p.id);
                    put_f32(buf, p.x);
                    put_f32(buf, p.y);
                    put_f32(buf, p.r);
                }
            }
            ServerFrame::Pong => {}
            ServerFrame::Leaderboard { entries } => {
                buf.put_u8(entries.len() as u8);
                for (name, score) in entries {
                    put_str(buf, name);
                    buf.put_u32(*score);
                }
            }
            ServerFrame::PlayerInfo { id, name, model } => {
                put_str(buf, id);
                put_str(buf, name);
                put_str(buf, model);
            }
            ServerFrame::AllPlayers { players } => {
                buf.put_u16(players.len() as u16);
                for (id, x, y) in players {
                    put_str(buf, id);
                    put_f32(buf, *x);
                    put_f32(buf, *y);
                }
            }
        }
    }

    /// Decode exactly one frame from the front of `buf`, advancing it.
    pub fn decode(buf: &mut Bytes) -> Result<ServerFrame, WireError> {
        need(buf, 1, "tag")?;
        let tag = buf.get_u8();
        match tag {
            1 => Ok(ServerFrame::Welcome {
                id: get_str(buf)?,
                name: get_str(buf)?,
                model: get_str(buf)?,
                world_w: get_f64(buf)?,
                world_h: get_f64(buf)?,
            }),
            2 => {
                need(buf, 1, "state flags")?;
                let flags = buf.get_u8();
                let alive = flags & 0b0001 != 0;
                let has_killed_by = flags & 0b0010 != 0;
                let has_respawn_in = flags & 0b0100 != 0;
                let has_powerup_duration = flags & 0b1000 != 0;

                let x = get_f32(buf)?;
                let y = get_f32(buf)?;
                let vel_x = get_f32(buf)?;
                let vel_y = get_f32(buf)?;
                let rot = get_f32(buf)?;
                let size = get_f32(buf)?;
                need(buf, 8, "score+seq")?;
                let score = buf.get_u32();
                let seq = buf.get_u32();

                let killed_by = if has_killed_by { Some(get_str(buf)?) } else { None };
                let respawn_in = if has_respawn_in { Some(get_f32(buf)?) } else { None };
                let powerup_duration = if has_powerup_duration {
                    Some(get_f32(buf)?)
                } else {
                    None
                };

                need(buf, 2, "others count")?;
                let n_others = buf.get_u16();
                let mut others = Vec::with_capacity(n_others as usize);
                for _ in 0..n_others {
                    let id = get_str(buf)?;
                    let ox = get_f32(buf)?;
                    let oy = get_f32(buf)?;
                    let ovx = get_f32(buf)?;
                    let ovy = get_f32(buf)?;
                    let orot = get_f32(buf)?;
                    let osize = get_f32(buf)?;
                    need(buf, 1, "other powerup flag")?;
                    let opowerup = buf.get_u8() != 0;
                    others.push(OtherPlayer {
                        id,
                        x: ox,
                        y: oy,
                        vel_x: ovx,
                        vel_y: ovy,
                        rot: orot,
                        size: osize,
                        powerup_active: opowerup,
                    });
                }

                need(buf, 2, "food count")?;
                let n_food = buf.get_u16();
                let mut food = Vec::with_capacity(n_food as usize);
                for _ in 0..n_food {
                    need(buf, 8, "food id")?;
                    let id = buf.get_u64();
                    let fx = get_f32(buf)?;
                    let fy = get_f32(buf)?;
                    let fr = get_f32(buf)?;
                    food.push(FoodEntry { id, x: fx, y: fy, r: fr });
                }

                need(buf, 2, "powerup count")?;
                let n_powerups = buf.get_u16();
                let mut powerups = Vec::with_capacity(n_powerups as usize);
                for _ in 0..n_powerups {
                    need(buf, 8, "powerup id")?;
                    let id = buf.get_u64();
                    let px = get_f32(buf)?;
                    let py = get_f32(buf)?;
                    let pr = get_f32(buf)?;
                    powerups.push(PowerupEntry { id, x: px, y: py, r: pr });
                }

                Ok(ServerFrame::State {
                    alive,
                    killed_by,
                    respawn_in,
                    powerup_duration,
                    x,
                    y,
                    vel_x,
                    vel_y,
                    rot,
                    size,
                    score,
                    seq,
                    others,
                    food,
                    powerups,
                })
            }
            3 => Ok(ServerFrame::Pong),
            4 => {
                need(buf, 1, "leaderboard count")?;
                let n = buf.get_u8();
                let mut entries = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let name = get_str(buf)?;
                    need(buf, 4, "leaderboard score")?;
                    let score = buf.get_u32();
                    entries.push((name, score));
                }
                Ok(ServerFrame::Leaderboard { entries })
            }
            5 => Ok(ServerFrame::PlayerInfo {
                id: get_str(buf)?,
                name: get_str(buf)?,
                model: get_str(buf)?,
            }),
            6 => {
                need(buf, 2, "all-players count")?;
                let n = buf.get_u16();
                let mut players = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let id = get_str(buf)?;
                    let x = get_f32(buf)?;
                    let y = get_f32(buf)?;
                    players.push((id, x, y));
                }
                Ok(ServerFrame::AllPlayers { players })
            }
            other => Err(WireError::UnknownTag(other)),
        }
    }

    /// Decode every frame packed into one WebSocket message, advancing
    /// until the buffer is exhausted.
    pub fn decode_batch(mut buf: Bytes) -> Result<Vec<ServerFrame>, WireError> {
        let mut frames = Vec::new();
        while buf.has_remaining() {
            frames.push(ServerFrame::decode(&mut buf)?);
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: ServerFrame) {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let decoded = ServerFrame::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn welcome_roundtrips() {
        roundtrip(ServerFrame::Welcome {
            id: "p1".into(),
            name: "Nemo".into(),
            model: "swordfish".into(),
            world_w: 4000.0,
            world_h: 4000.0,
        });
    }

    #[test]
    fn state_roundtrips_with_optional_fields() {
        roundtrip(ServerFrame::State {
            alive: false,
            killed_by: Some("p2".into()),
            respawn_in: Some(2.5),
            powerup_duration: None,
            x: 1.0,
            y: 2.0,
            vel_x: 0.0,
            vel_y: 0.0,
            rot: 3.14,
            size: 42.0,
            score: 10,
            seq: 7,
            others: vec![OtherPlayer {
                id: "p3".into(),
                x: 9.0,
                y: 9.0,
                vel_x: 1.0,
                vel_y: 1.0,
                rot: 0.0,
                size: 20.0,
                powerup_active: true,
            }],
            food: vec![FoodEntry {
                id: 1,
                x: 0.0,
                y: 0.0,
                r: 5.0,
            }],
            powerups: vec![],
        });
    }

    #[test]
    fn pong_roundtrips() {
        roundtrip(ServerFrame::Pong);
    }

    #[test]
    fn leaderboard_roundtrips() {
        roundtrip(ServerFrame::Leaderboard {
            entries: vec![("a".into(), 100), ("b".into(), 50)],
        });
    }

    #[test]
    fn batched_frames_decode_in_order() {
        let frames = vec![
            ServerFrame::Pong,
            ServerFrame::PlayerInfo {
                id: "p1".into(),
                name: "Nemo".into(),
                model: "swordfish".into(),
            },
            ServerFrame::AllPlayers {
                players: vec![("p1".into(), 1.0, 2.0)],
            },
        ];
        let mut buf = BytesMut::new();
        for f in &frames {
            f.encode(&mut buf);
        }
        let decoded = ServerFrame::decode_batch(buf.freeze()).unwrap();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn truncated_frame_errors_instead_of_panicking() {
        let mut buf = BytesMut::new();
        ServerFrame::Pong.encode(&mut buf);
        buf.extend_from_slice(&[5u8, 0, 3, b'a', b'b']); // PlayerInfo tag, truncated string
        let mut bytes = buf.freeze();
        assert!(ServerFrame::decode(&mut bytes).is_ok()); // pong
        assert!(ServerFrame::decode(&mut bytes).is_err());
    }
}
