//! Current track metadata.
//!
//! ```text
//! total time (ms)  u32
//! title            string
//! artist           string
//! album            string
//! genre            string
//! year             u16
//! art id           string   (empty when the server has no cover)
//! rating           u8       (optional, newer servers only)
//! ```

use serde::Serialize;

use crate::codec::Reader;
use crate::error::BansheeError;

/// Reply for "nothing playing": every field written as `{0, 0}`,
/// including the total time.
const NO_TRACK_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SongInfo {
    pub total_time_ms: u32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub year: u16,
    pub art_id: String,
    pub rating: Option<u8>,
}

impl SongInfo {
    pub fn decode(response: &[u8]) -> Result<Self, BansheeError> {
        if response.len() == NO_TRACK_LEN && response.iter().all(|b| *b == 0) {
            return Ok(Self::default());
        }
        let mut r = Reader::new(response, "song info");
        let total_time_ms = r.u32()?;
        let title = r.string()?;
        let artist = r.string()?;
        let album = r.string()?;
        let genre = r.string()?;
        let year = r.u16()?;
        let art_id = r.string()?;
        let rating = if r.remaining() > 0 { Some(r.u8()?) } else { None };
        Ok(Self {
            total_time_ms,
            title,
            artist,
            album,
            genre,
            year,
            art_id,
            rating,
        })
    }

    /// `true` when the server reported no playing track.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty() && self.total_time_ms == 0
    }

    pub fn has_cover(&self) -> bool {
        !self.art_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::put_string;
    use bytes::{BufMut, BytesMut};

    fn encode(song: &SongInfo) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32_le(song.total_time_ms);
        put_string(&mut buf, &song.title).unwrap();
        put_string(&mut buf, &song.artist).unwrap();
        put_string(&mut buf, &song.album).unwrap();
        put_string(&mut buf, &song.genre).unwrap();
        buf.put_u16_le(song.year);
        put_string(&mut buf, &song.art_id).unwrap();
        if let Some(rating) = song.rating {
            buf.put_u8(rating);
        }
        buf
    }

    #[test]
    fn decode_full_song() {
        let song = SongInfo {
            total_time_ms: 245_000,
            title: "Paranoid Android".into(),
            artist: "Radiohead".into(),
            album: "OK Computer".into(),
            genre: "Rock".into(),
            year: 1997,
            art_id: "album-8e2a".into(),
            rating: Some(4),
        };
        assert_eq!(SongInfo::decode(&encode(&song)).unwrap(), song);
    }

    #[test]
    fn decode_without_rating_and_cover() {
        let song = SongInfo {
            total_time_ms: 1,
            title: "Intro".into(),
            year: 0,
            ..Default::default()
        };
        let decoded = SongInfo::decode(&encode(&song)).unwrap();
        assert_eq!(decoded.rating, None);
        assert!(!decoded.has_cover());
        assert_eq!(decoded.title, "Intro");
    }

    #[test]
    fn server_placeholder_for_no_track() {
        let song = SongInfo::decode(&[0u8; NO_TRACK_LEN]).unwrap();
        assert!(song.is_empty());
        assert_eq!(song, SongInfo::default());

        // A regular all-empty record decodes the same way.
        let song = SongInfo::decode(&[0u8; 16]).unwrap();
        assert!(song.is_empty());
    }

    #[test]
    fn truncated_song_is_malformed() {
        let mut buf = encode(&SongInfo {
            title: "Cut short".into(),
            ..Default::default()
        });
        buf.truncate(8);
        assert!(matches!(
            SongInfo::decode(&buf),
            Err(BansheeError::MalformedResponse { .. })
        ));
    }
}
