//! Text and JSON rendering of replies.

use banshee_core::protocol::{PlayerStatus, SongInfo};
use banshee_core::{Reply, ServerStatus, SessionNotice};
use serde_json::json;

/// `m:ss` for a millisecond position.
pub fn format_time(ms: u32) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn status_line(s: &PlayerStatus) -> String {
    let state = if s.playing {
        "playing"
    } else if s.paused {
        "paused"
    } else {
        "stopped"
    };
    format!(
        "{state}  {}  volume {}  repeat {}  shuffle {}",
        format_time(s.position_ms),
        s.volume,
        s.repeat,
        s.shuffle
    )
}

fn song_lines(s: &SongInfo) -> String {
    if s.is_empty() {
        return "nothing playing".into();
    }
    let mut out = format!(
        "{} - {}\n{} ({})  {}  {}",
        s.artist,
        s.title,
        s.album,
        s.year,
        s.genre,
        format_time(s.total_time_ms)
    );
    if let Some(rating) = s.rating {
        out.push_str(&format!("  rating {rating}"));
    }
    out
}

pub fn render(reply: &Reply, as_json: bool) -> Result<String, serde_json::Error> {
    if as_json {
        let value = match reply {
            Reply::Status(s) => serde_json::to_value(s)?,
            Reply::Song(s) => serde_json::to_value(s)?,
            Reply::DatabaseTimestamp(ts) => json!({ "timestamp": ts }),
            Reply::DatabaseFile(data) => json!({ "database_bytes": data.len() }),
            Reply::Recompressed(done) => json!({ "recompressed": done }),
            Reply::Cover { art_id, image } => json!({
                "art_id": art_id,
                "image_bytes": image.as_ref().map(|i| i.len()),
            }),
            Reply::PlaylistNames(n) => serde_json::to_value(n)?,
            Reply::PlaylistTracks(t) => serde_json::to_value(t)?,
            Reply::PlayTrack(p) => json!({ "status": p }),
            Reply::PlaylistModified(n) => json!({ "changed": n }),
        };
        return serde_json::to_string_pretty(&value);
    }

    Ok(match reply {
        Reply::Status(s) => status_line(s),
        Reply::Song(s) => song_lines(s),
        Reply::DatabaseTimestamp(ts) => format!("database timestamp {ts}"),
        Reply::DatabaseFile(data) => format!("database file, {} bytes", data.len()),
        Reply::Recompressed(done) => format!("recompressed: {done}"),
        Reply::Cover { art_id, image } => match image {
            Some(i) => format!("cover {art_id}, {} bytes", i.len()),
            None => format!("no cover for {art_id}"),
        },
        Reply::PlaylistNames(n) => n
            .playlists
            .iter()
            .map(|p| {
                let marker = if p.id == n.active { "*" } else { " " };
                format!("{marker} {:>5}  {} ({} tracks)", p.id, p.name, p.track_count)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Reply::PlaylistTracks(t) => {
            let ids: Vec<String> = t.track_ids.iter().map(u32::to_string).collect();
            format!(
                "{} of {} tracks from {}: {}",
                t.track_ids.len(),
                t.total,
                t.start,
                ids.join(" ")
            )
        }
        Reply::PlayTrack(p) => format!("{p:?}"),
        Reply::PlaylistModified(n) => format!("{n:+} tracks"),
    })
}

pub fn render_check(status: ServerStatus, as_json: bool) -> Result<String, serde_json::Error> {
    if as_json {
        return serde_json::to_string_pretty(&json!({
            "status": status,
            "code": status.code(),
        }));
    }
    Ok(match status {
        ServerStatus::Accepted => "server accepted the password id".into(),
        ServerStatus::Rejected => "server rejected the password id".into(),
        ServerStatus::Unreachable => "server unreachable".into(),
    })
}

pub fn render_notice(notice: &SessionNotice, as_json: bool) -> Result<String, serde_json::Error> {
    if as_json {
        let value = match notice {
            SessionNotice::DatabaseCurrent => json!({ "database": "current" }),
            SessionNotice::DatabaseUnavailable => json!({ "database": "unavailable" }),
            SessionNotice::DatabaseRequested { timestamp } => {
                json!({ "database": "requested", "timestamp": timestamp })
            }
            SessionNotice::DatabaseSynced { timestamp } => {
                json!({ "database": "synced", "timestamp": timestamp })
            }
            SessionNotice::DatabaseRecompressed => json!({ "database": "recompressed" }),
            SessionNotice::CoverStored { art_id } => json!({ "cover": art_id }),
            SessionNotice::ConnectionLost => json!({ "error": "connection lost" }),
        };
        return serde_json::to_string(&value);
    }
    Ok(match notice {
        SessionNotice::DatabaseCurrent => "library is up to date".into(),
        SessionNotice::DatabaseUnavailable => "server has no library database".into(),
        SessionNotice::DatabaseRequested { timestamp } => {
            format!("downloading library (timestamp {timestamp})")
        }
        SessionNotice::DatabaseSynced { timestamp: Some(ts) } => {
            format!("library synced (timestamp {ts})")
        }
        SessionNotice::DatabaseSynced { timestamp: None } => "library synced".into(),
        SessionNotice::DatabaseRecompressed => "server database rebuilt".into(),
        SessionNotice::CoverStored { art_id } => format!("cover {art_id} stored"),
        SessionNotice::ConnectionLost => "connection lost".into(),
    })
}
