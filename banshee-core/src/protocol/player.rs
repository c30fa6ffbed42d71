//! Player status: control request builder and status response decoding.
//!
//! # Request layout (7 bytes)
//! ```text
//! byte 0   hi nibble  play action   1 toggle, 2 play, 3 pause, 4 next, 5 previous
//! byte 0   lo nibble  repeat        1 off, 2 single, 3 all, 4 cycle, 5 on/off
//! byte 1              shuffle       1..6 mode, 7 cycle, 8 on/off
//! byte 2              volume        1..100 set, 101 mute, 102 down, 103 up
//! byte 3..7           seek (ms)     u32, 0 = unchanged
//! ```
//! A zero field means "leave as is", so an all-zero request is a pure
//! status query.
//!
//! # Response layout (12 bytes)
//! ```text
//! byte 0    bit 7 paused, bit 6 playing, bits 5-4 repeat, bits 3-0 shuffle
//! byte 1    volume
//! byte 2..6 seek position (ms, u32)
//! byte 6..8 change flag (u16)
//! byte 8..12 song id (u32)
//! ```

use bitflags::bitflags;
use bytes::Bytes;
use serde::Serialize;

use crate::codec::Reader;
use crate::error::BansheeError;
use crate::message::{Repeat, Shuffle};

pub const REQUEST_LEN: usize = 7;
pub const RESPONSE_LEN: usize = 12;

const VOLUME_MUTE: u8 = 101;
const VOLUME_DOWN: u8 = 102;
const VOLUME_UP: u8 = 103;
const SHUFFLE_CYCLE: u8 = 7;
const SHUFFLE_ON_OFF: u8 = 8;
const REPEAT_CYCLE: u8 = 4;
const REPEAT_ON_OFF: u8 = 5;

bitflags! {
    /// Playback bits of the first status byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const PAUSED = 0x80;
        const PLAYING = 0x40;
    }
}

// ── Actions ──────────────────────────────────────────────────────

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayAction {
    Toggle = 1,
    Play = 2,
    Pause = 3,
    Next = 4,
    Previous = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatAction {
    /// `Repeat::Unknown` is sent as 0 and ignored by the server.
    Set(Repeat),
    Cycle,
    OnOffToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShuffleAction {
    Set(Shuffle),
    Cycle,
    OnOffToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeAction {
    /// Clamped into `0..=100`; 0 leaves the volume unchanged.
    Set(i32),
    Mute,
    Down,
    Up,
}

// ── StatusRequest ────────────────────────────────────────────────

/// In-progress player status request. Every setter merges one field into
/// the buffer; calling a setter again for the same field replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRequest {
    buf: [u8; REQUEST_LEN],
}

impl StatusRequest {
    /// An all-zero request (pure status query).
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an earlier request. Absent or wrongly sized params start
    /// from the all-zero default.
    pub fn merge(prior: Option<&[u8]>) -> Self {
        match prior {
            Some(p) if p.len() == REQUEST_LEN => {
                let mut buf = [0u8; REQUEST_LEN];
                buf.copy_from_slice(p);
                Self { buf }
            }
            _ => Self::default(),
        }
    }

    pub fn play(mut self, action: PlayAction) -> Self {
        self.buf[0] = (action as u8) << 4 | (self.buf[0] & 0x0f);
        self
    }

    pub fn repeat(mut self, action: RepeatAction) -> Self {
        let code = match action {
            RepeatAction::Set(mode) => mode.code(),
            RepeatAction::Cycle => REPEAT_CYCLE,
            RepeatAction::OnOffToggle => REPEAT_ON_OFF,
        };
        self.buf[0] = (code & 0x0f) | (self.buf[0] & 0xf0);
        self
    }

    pub fn shuffle(mut self, action: ShuffleAction) -> Self {
        self.buf[1] = match action {
            ShuffleAction::Set(mode) => mode.code(),
            ShuffleAction::Cycle => SHUFFLE_CYCLE,
            ShuffleAction::OnOffToggle => SHUFFLE_ON_OFF,
        };
        self
    }

    pub fn volume(mut self, action: VolumeAction) -> Self {
        self.buf[2] = match action {
            VolumeAction::Set(v) => v.clamp(0, 100) as u8,
            VolumeAction::Mute => VOLUME_MUTE,
            VolumeAction::Down => VOLUME_DOWN,
            VolumeAction::Up => VOLUME_UP,
        };
        self
    }

    /// Seek inside the current track (milliseconds).
    pub fn seek(mut self, position_ms: u32) -> Self {
        self.buf[3..7].copy_from_slice(&position_ms.to_le_bytes());
        self
    }

    /// `true` when no control field is set.
    pub fn is_query(&self) -> bool {
        self.buf.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn to_params(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }
}

// ── PlayerStatus ─────────────────────────────────────────────────

/// Decoded player status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerStatus {
    pub paused: bool,
    pub playing: bool,
    pub repeat: Repeat,
    pub shuffle: Shuffle,
    pub volume: u8,
    pub position_ms: u32,
    /// Opaque counter; a new value means track metadata is stale.
    pub change_flag: u16,
    /// Id of the playing track in the synchronized library.
    pub song_id: u32,
}

impl PlayerStatus {
    pub fn decode(response: &[u8]) -> Result<Self, BansheeError> {
        if response.len() < RESPONSE_LEN {
            return Err(BansheeError::truncated(
                "player status",
                RESPONSE_LEN,
                response.len(),
            ));
        }
        let mut r = Reader::new(response, "player status");
        let head = r.u8()?;
        let flags = StatusFlags::from_bits_truncate(head);
        Ok(Self {
            paused: flags.contains(StatusFlags::PAUSED),
            playing: flags.contains(StatusFlags::PLAYING),
            repeat: Repeat::from_code((head >> 4) & 0x3),
            shuffle: Shuffle::from_code(head & 0x0f),
            volume: r.u8()?,
            position_ms: r.u32()?,
            change_flag: r.u16()?,
            song_id: r.u32()?,
        })
    }

    /// Whether song info must be re-fetched compared to `previous`.
    pub fn track_changed(&self, previous: Option<&PlayerStatus>) -> bool {
        match previous {
            Some(p) => p.change_flag != self.change_flag || p.song_id != self.song_id,
            None => true,
        }
    }
}
