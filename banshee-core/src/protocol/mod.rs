//! Typed request builders and response decoders, one module per command.
//!
//! Every request is `[code][u16 password id][params]` on the wire; the
//! modules here only deal with `params` and the response body. Use
//! [`Reply::decode`] to turn a handled command into a typed value.

pub mod cover;
pub mod player;
pub mod playlist;
pub mod song;
pub mod sync;

pub use player::{
    PlayAction, PlayerStatus, RepeatAction, ShuffleAction, StatusFlags, StatusRequest,
    VolumeAction,
};
pub use playlist::{
    PlayTrackStatus, PlaylistEntry, PlaylistNames, PlaylistRequest, PlaylistTracks,
    REMOTE_PLAYLIST_ID, Start, Target,
};
pub use song::SongInfo;
pub use sync::SyncRequest;

use bytes::Bytes;

use crate::error::BansheeError;
use crate::message::Command;

/// A decoded response, tagged by the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(PlayerStatus),
    Song(SongInfo),
    DatabaseTimestamp(u32),
    DatabaseFile(Bytes),
    Recompressed(bool),
    /// Raw image bytes; `None` when the server has no cover.
    Cover { art_id: String, image: Option<Bytes> },
    PlaylistNames(PlaylistNames),
    PlaylistTracks(PlaylistTracks),
    PlayTrack(PlayTrackStatus),
    /// Tracks added (positive) or removed (negative).
    PlaylistModified(i16),
}

impl Reply {
    /// Decode `response` for `command`. Sync and playlist replies depend
    /// on which sub-request was sent, so their params are required.
    pub fn decode(
        command: Command,
        params: Option<&[u8]>,
        response: &[u8],
    ) -> Result<Self, BansheeError> {
        match command {
            Command::PlayerStatus => Ok(Reply::Status(PlayerStatus::decode(response)?)),
            Command::SongInfo => Ok(Reply::Song(SongInfo::decode(response)?)),
            Command::SyncDatabase => {
                let params = params.ok_or(BansheeError::InvalidParams("missing sync request"))?;
                Ok(match SyncRequest::from_params(params)? {
                    SyncRequest::Timestamp => Reply::DatabaseTimestamp(sync::decode_timestamp(response)?),
                    SyncRequest::File => Reply::DatabaseFile(Bytes::copy_from_slice(response)),
                    SyncRequest::Recompress => Reply::Recompressed(sync::decode_recompressed(response)?),
                })
            }
            Command::Cover => {
                let params = params.ok_or(BansheeError::InvalidParams("missing art id"))?;
                let image = cover::has_image(response).then(|| Bytes::copy_from_slice(response));
                Ok(Reply::Cover {
                    art_id: cover::art_id(params)?,
                    image,
                })
            }
            Command::Playlist => {
                let params =
                    params.ok_or(BansheeError::InvalidParams("missing playlist request"))?;
                Ok(match PlaylistRequest::from_params(params)? {
                    PlaylistRequest::Names => Reply::PlaylistNames(PlaylistNames::decode(response)?),
                    PlaylistRequest::Tracks { .. } => {
                        Reply::PlaylistTracks(PlaylistTracks::decode(response)?)
                    }
                    PlaylistRequest::PlayTrack { .. } => {
                        Reply::PlayTrack(PlayTrackStatus::decode(response)?)
                    }
                    PlaylistRequest::Add { .. } | PlaylistRequest::Remove { .. } => {
                        Reply::PlaylistModified(playlist::decode_modified(response)?)
                    }
                })
            }
        }
    }
}
