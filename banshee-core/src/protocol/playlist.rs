//! Playlist listing, contents and modification.
//!
//! # Requests (first byte selects the operation)
//! ```text
//! 1  names                          [1]
//! 2  tracks                         [2, u16 playlist, u32 max, u32 start]
//! 3  play track                     [3, u16 playlist, u32 track]
//! 4..6  add track/artist/album      [op, u8 allow_twice, u16 playlist, u32 id]
//! 7..9  remove track/artist/album   [op, u16 playlist, u32 id]
//! ```
//! Bit 31 of `start` asks for tracks relative to the playing track: the
//! lower bits are then how many tracks before it to include.
//!
//! # Replies
//! ```text
//! names        u16 active, u16 count, count × (u32 tracks, u16 id, string name)
//! tracks       u32 total, u32 returned, u32 start, returned × u32 track id
//! play track   u8 status
//! add/remove   i16 changed tracks (negative for removals)
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::codec::Reader;
use crate::error::BansheeError;

/// The playlist the listener maintains for remote clients. Other ids are
/// derived from server-side state and may change between sessions.
pub const REMOTE_PLAYLIST_ID: u16 = 1;

const RELATIVE_START: u32 = 0x8000_0000;

const OP_NAMES: u8 = 1;
const OP_TRACKS: u8 = 2;
const OP_PLAY_TRACK: u8 = 3;
const OP_ADD_BASE: u8 = 4;
const OP_REMOVE_BASE: u8 = 7;

// ── Requests ─────────────────────────────────────────────────────

/// What an add/remove request targets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Track = 0,
    Artist = 1,
    Album = 2,
}

impl Target {
    fn from_offset(offset: u8) -> Option<Self> {
        match offset {
            0 => Some(Target::Track),
            1 => Some(Target::Artist),
            2 => Some(Target::Album),
            _ => None,
        }
    }
}

/// Where a tracks request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Start {
    /// Absolute index into the playlist.
    At(u32),
    /// This many tracks before the playing one (the server caps it at 100).
    BeforeCurrent(u32),
}

impl Start {
    fn encode(self) -> u32 {
        match self {
            Start::At(pos) => pos & !RELATIVE_START,
            Start::BeforeCurrent(offset) => (offset & !RELATIVE_START) | RELATIVE_START,
        }
    }

    fn decode(raw: u32) -> Self {
        if raw & RELATIVE_START != 0 {
            Start::BeforeCurrent(raw & !RELATIVE_START)
        } else {
            Start::At(raw)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaylistRequest {
    Names,
    Tracks {
        playlist: u16,
        start: Start,
        /// 0 = no limit.
        max: u32,
    },
    PlayTrack {
        /// 0 plays the track regardless of playlist.
        playlist: u16,
        track_id: u32,
    },
    Add {
        playlist: u16,
        target: Target,
        id: u32,
        allow_twice: bool,
    },
    Remove {
        playlist: u16,
        target: Target,
        id: u32,
    },
}

impl PlaylistRequest {
    pub fn to_params(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(11);
        match *self {
            PlaylistRequest::Names => buf.put_u8(OP_NAMES),
            PlaylistRequest::Tracks {
                playlist,
                start,
                max,
            } => {
                buf.put_u8(OP_TRACKS);
                buf.put_u16_le(playlist);
                buf.put_u32_le(max);
                buf.put_u32_le(start.encode());
            }
            PlaylistRequest::PlayTrack { playlist, track_id } => {
                buf.put_u8(OP_PLAY_TRACK);
                buf.put_u16_le(playlist);
                buf.put_u32_le(track_id);
            }
            PlaylistRequest::Add {
                playlist,
                target,
                id,
                allow_twice,
            } => {
                buf.put_u8(OP_ADD_BASE + target as u8);
                buf.put_u8(allow_twice as u8);
                buf.put_u16_le(playlist);
                buf.put_u32_le(id);
            }
            PlaylistRequest::Remove {
                playlist,
                target,
                id,
            } => {
                buf.put_u8(OP_REMOVE_BASE + target as u8);
                buf.put_u16_le(playlist);
                buf.put_u32_le(id);
            }
        }
        buf.freeze()
    }

    /// Recover the request a params buffer was built from.
    pub fn from_params(params: &[u8]) -> Result<Self, BansheeError> {
        let mut r = Reader::new(params, "playlist request");
        let op = r.u8()?;
        Ok(match op {
            OP_NAMES => PlaylistRequest::Names,
            OP_TRACKS => {
                let playlist = r.u16()?;
                let max = r.u32()?;
                let start = Start::decode(r.u32()?);
                PlaylistRequest::Tracks {
                    playlist,
                    start,
                    max,
                }
            }
            OP_PLAY_TRACK => PlaylistRequest::PlayTrack {
                playlist: r.u16()?,
                track_id: r.u32()?,
            },
            op if (OP_ADD_BASE..OP_REMOVE_BASE).contains(&op) => {
                let allow_twice = r.u8()? != 0;
                PlaylistRequest::Add {
                    playlist: r.u16()?,
                    target: Target::from_offset(op - OP_ADD_BASE).ok_or(
                        BansheeError::InvalidParams("bad add target"),
                    )?,
                    id: r.u32()?,
                    allow_twice,
                }
            }
            op if (OP_REMOVE_BASE..OP_REMOVE_BASE + 3).contains(&op) => {
                PlaylistRequest::Remove {
                    playlist: r.u16()?,
                    target: Target::from_offset(op - OP_REMOVE_BASE).ok_or(
                        BansheeError::InvalidParams("bad remove target"),
                    )?,
                    id: r.u32()?,
                }
            }
            other => {
                return Err(BansheeError::UnknownVariant {
                    type_name: "PlaylistRequest",
                    value: other as u64,
                });
            }
        })
    }
}

// ── Replies ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistEntry {
    pub track_count: u32,
    pub id: u16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistNames {
    pub active: u16,
    pub playlists: Vec<PlaylistEntry>,
}

impl PlaylistNames {
    pub fn decode(response: &[u8]) -> Result<Self, BansheeError> {
        let mut r = Reader::new(response, "playlist names");
        let active = r.u16()?;
        let count = r.u16()? as usize;
        let mut playlists = Vec::with_capacity(count);
        for _ in 0..count {
            playlists.push(PlaylistEntry {
                track_count: r.u32()?,
                id: r.u16()?,
                name: r.string()?,
            });
        }
        Ok(Self { active, playlists })
    }

    pub fn remote(&self) -> Option<&PlaylistEntry> {
        self.playlists.iter().find(|p| p.id == REMOTE_PLAYLIST_ID)
    }
}

/// Reply for an unknown playlist id: count, returned and start written
/// as zeros in a shorter layout.
const NO_PLAYLIST_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlaylistTracks {
    /// Number of tracks in the whole playlist.
    pub total: u32,
    /// Index of the first returned track.
    pub start: u32,
    pub track_ids: Vec<u32>,
}

impl PlaylistTracks {
    pub fn decode(response: &[u8]) -> Result<Self, BansheeError> {
        if response.len() == NO_PLAYLIST_LEN && response.iter().all(|b| *b == 0) {
            return Ok(Self::default());
        }
        let mut r = Reader::new(response, "playlist tracks");
        let total = r.u32()?;
        let returned = r.u32()? as usize;
        let start = r.u32()?;
        if r.remaining() < returned * 4 {
            return Err(BansheeError::truncated(
                "playlist tracks",
                r.position() + returned * 4,
                response.len(),
            ));
        }
        let track_ids = (0..returned).map(|_| r.u32()).collect::<Result<_, _>>()?;
        Ok(Self {
            total,
            start,
            track_ids,
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayTrackStatus {
    NotFound = 0,
    Playing = 1,
    /// Playing, and the requested playlist became the active one.
    PlayingInPlaylist = 2,
}

impl PlayTrackStatus {
    pub fn decode(response: &[u8]) -> Result<Self, BansheeError> {
        let mut r = Reader::new(response, "play track status");
        match r.u8()? {
            0 => Ok(PlayTrackStatus::NotFound),
            1 => Ok(PlayTrackStatus::Playing),
            2 => Ok(PlayTrackStatus::PlayingInPlaylist),
            other => Err(BansheeError::UnknownVariant {
                type_name: "PlayTrackStatus",
                value: other as u64,
            }),
        }
    }
}

/// Tracks added (positive) or removed (negative) by an add/remove request.
pub fn decode_modified(response: &[u8]) -> Result<i16, BansheeError> {
    Reader::new(response, "playlist modification").i16()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::put_string;

    #[test]
    fn tracks_request_layout() {
        let params = PlaylistRequest::Tracks {
            playlist: 0x0102,
            start: Start::At(5),
            max: 50,
        }
        .to_params();
        assert_eq!(&params[..], &[2, 0x02, 0x01, 50, 0, 0, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn relative_start_sets_high_bit() {
        let req = PlaylistRequest::Tracks {
            playlist: REMOTE_PLAYLIST_ID,
            start: Start::BeforeCurrent(3),
            max: 0,
        };
        let params = req.to_params();
        assert_eq!(&params[7..11], &[3, 0, 0, 0x80]);
        assert_eq!(PlaylistRequest::from_params(&params).unwrap(), req);
    }

    #[test]
    fn add_and_remove_layouts() {
        let add = PlaylistRequest::Add {
            playlist: 1,
            target: Target::Album,
            id: 77,
            allow_twice: true,
        };
        let params = add.to_params();
        assert_eq!(&params[..], &[6, 1, 1, 0, 77, 0, 0, 0]);
        assert_eq!(PlaylistRequest::from_params(&params).unwrap(), add);

        let remove = PlaylistRequest::Remove {
            playlist: 1,
            target: Target::Artist,
            id: 9,
        };
        let params = remove.to_params();
        assert_eq!(&params[..], &[8, 1, 0, 9, 0, 0, 0]);
        assert_eq!(PlaylistRequest::from_params(&params).unwrap(), remove);
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(PlaylistRequest::from_params(&[0x42]).is_err());
        assert!(PlaylistRequest::from_params(&[]).is_err());
    }

    #[test]
    fn decode_names() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(1);
        buf.put_u16_le(2);
        buf.put_u32_le(12);
        buf.put_u16_le(REMOTE_PLAYLIST_ID);
        put_string(&mut buf, "Remote").unwrap();
        buf.put_u32_le(340);
        buf.put_u16_le(0x5a5a);
        put_string(&mut buf, "Favourites").unwrap();

        let names = PlaylistNames::decode(&buf).unwrap();
        assert_eq!(names.active, 1);
        assert_eq!(names.playlists.len(), 2);
        assert_eq!(names.remote().unwrap().track_count, 12);
        assert_eq!(names.playlists[1].name, "Favourites");
        assert_eq!(names.playlists[1].id, 0x5a5a);
    }

    #[test]
    fn decode_tracks() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(100);
        buf.put_u32_le(2);
        buf.put_u32_le(40);
        buf.put_u32_le(7);
        buf.put_u32_le(0xdead);
        let tracks = PlaylistTracks::decode(&buf).unwrap();
        assert_eq!(tracks.total, 100);
        assert_eq!(tracks.start, 40);
        assert_eq!(tracks.track_ids, vec![7, 0xdead]);
    }

    #[test]
    fn short_track_list_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(100);
        buf.put_u32_le(3);
        buf.put_u32_le(0);
        buf.put_u32_le(7);
        assert!(PlaylistTracks::decode(&buf).is_err());
    }

    #[test]
    fn empty_playlist_reply() {
        let tracks = PlaylistTracks::decode(&[0u8; 12]).unwrap();
        assert!(tracks.track_ids.is_empty());
    }

    #[test]
    fn unknown_playlist_placeholder() {
        assert_eq!(
            PlaylistTracks::decode(&[0u8; 11]).unwrap(),
            PlaylistTracks {
                total: 0,
                start: 0,
                track_ids: vec![],
            }
        );
        let mut short = [0u8; 11];
        short[0] = 3;
        assert!(PlaylistTracks::decode(&short).is_err());
    }

    #[test]
    fn play_status_and_modified_count() {
        assert_eq!(
            PlayTrackStatus::decode(&[2]).unwrap(),
            PlayTrackStatus::PlayingInPlaylist
        );
        assert!(PlayTrackStatus::decode(&[7]).is_err());
        assert_eq!(decode_modified(&[0xFD, 0xFF]).unwrap(), -3);
    }
}
