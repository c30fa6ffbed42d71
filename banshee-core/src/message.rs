//! Command definitions and player mode enums.
//!
//! Unknown wire values map to `UnknownVariant` errors or an `Unknown` mode.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BansheeError;

/// Wire code of the reachability probe. Not a [`Command`]: it is only
/// ever sent by the server check, never queued on a connection.
pub const PROBE_CODE: u8 = 0;

// ── Link ─────────────────────────────────────────────────────────

/// Kind of network the client is on; slower links get longer timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    #[default]
    Wifi,
    Mobile,
}

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the Banshee remote listener.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Query (and optionally change) the player state.
    PlayerStatus = 1,
    /// Metadata of the currently playing track.
    SongInfo = 2,
    /// Library database timestamp / file transfer.
    SyncDatabase = 3,
    /// Cover art by art id.
    Cover = 4,
    /// Playlist listing, contents and modification.
    Playlist = 5,
}

impl TryFrom<u8> for Command {
    type Error = BansheeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Command::PlayerStatus),
            2 => Ok(Command::SongInfo),
            3 => Ok(Command::SyncDatabase),
            4 => Ok(Command::Cover),
            5 => Ok(Command::Playlist),
            _ => Err(BansheeError::UnknownVariant {
                type_name: "Command",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Command {
    /// All commands, in wire-code order.
    pub const ALL: [Command; 5] = [
        Command::PlayerStatus,
        Command::SongInfo,
        Command::SyncDatabase,
        Command::Cover,
        Command::Playlist,
    ];

    /// Wire code sent as the first request byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Round-trip deadline for this command on the given link.
    pub fn timeout(self, link: Link) -> Duration {
        let (wifi, mobile) = match self {
            Command::PlayerStatus => (1_000, 3_000),
            Command::SongInfo => (3_000, 6_000),
            Command::SyncDatabase => (10_000, 15_000),
            Command::Cover => (5_000, 10_000),
            Command::Playlist => (10_000, 15_000),
        };
        Duration::from_millis(match link {
            Link::Wifi => wifi,
            Link::Mobile => mobile,
        })
    }
}

// ── Repeat ───────────────────────────────────────────────────────

/// Banshee repeat modes. Unknown codes decode to `Unknown`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    Unknown = 0,
    Off = 1,
    Single = 2,
    All = 3,
}

impl Repeat {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Repeat::Off,
            2 => Repeat::Single,
            3 => Repeat::All,
            _ => Repeat::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Shuffle ──────────────────────────────────────────────────────

/// Banshee shuffle modes. Unknown codes decode to `Unknown`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shuffle {
    #[default]
    Unknown = 0,
    Off = 1,
    Song = 2,
    Artist = 3,
    Album = 4,
    Rating = 5,
    Score = 6,
}

impl Shuffle {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Shuffle::Off,
            2 => Shuffle::Song,
            3 => Shuffle::Artist,
            4 => Shuffle::Album,
            5 => Shuffle::Rating,
            6 => Shuffle::Score,
            _ => Shuffle::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Shuffle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
