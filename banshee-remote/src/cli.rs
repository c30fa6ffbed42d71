//! Command-line arguments and the requests they turn into.

use std::path::PathBuf;

use banshee_core::protocol::{
    PlayAction, PlaylistRequest, REMOTE_PLAYLIST_ID, RepeatAction, ShuffleAction, Start,
    StatusRequest, VolumeAction,
};
use banshee_core::{Command, Repeat, Shuffle};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "banshee-remote", about = "Remote control for a Banshee media player")]
pub struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "banshee-remote.toml")]
    pub config: PathBuf,

    /// Server host (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Server port (overrides config).
    #[arg(long)]
    pub port: Option<u16>,

    /// Password id (overrides config).
    #[arg(long)]
    pub password_id: Option<u16>,

    /// Print replies as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Check that the server is reachable and accepts the password id.
    Check,
    /// Show the player status.
    Status,
    Play,
    Pause,
    /// Toggle between play and pause.
    Toggle,
    Next,
    Prev,
    /// Set the volume: 0-100, up, down or mute.
    Volume {
        #[arg(value_parser = parse_volume, allow_hyphen_values = true)]
        level: VolumeAction,
    },
    Shuffle { mode: ShuffleArg },
    Repeat { mode: RepeatArg },
    /// Seek inside the current track (milliseconds).
    Seek { position_ms: u32 },
    /// Show the current track.
    Song,
    /// List playlists.
    Playlists,
    /// List track ids of a playlist.
    Tracks {
        #[arg(default_value_t = REMOTE_PLAYLIST_ID)]
        playlist: u16,
        /// First track index.
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Start this many tracks before the playing one instead.
        #[arg(long, conflicts_with = "start")]
        before_current: Option<u32>,
        /// Maximum number of ids (0 = all).
        #[arg(long, default_value_t = 0)]
        max: u32,
    },
    /// Play a track by id.
    PlayTrack {
        track_id: u32,
        /// Playlist to play it in (0 = any).
        #[arg(long, default_value_t = 0)]
        playlist: u16,
    },
    /// Download the library database if it changed.
    Sync {
        /// Ask the server to rebuild its database first.
        #[arg(long)]
        recompress: bool,
    },
    /// Fetch cover art into the cache.
    Cover { art_id: String },
    /// Print the default configuration to stdout and exit.
    GenConfig,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleArg {
    Off,
    Song,
    Artist,
    Album,
    Rating,
    Score,
    Cycle,
    Toggle,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatArg {
    Off,
    Single,
    All,
    Cycle,
    Toggle,
}

impl From<ShuffleArg> for ShuffleAction {
    fn from(arg: ShuffleArg) -> Self {
        match arg {
            ShuffleArg::Off => ShuffleAction::Set(Shuffle::Off),
            ShuffleArg::Song => ShuffleAction::Set(Shuffle::Song),
            ShuffleArg::Artist => ShuffleAction::Set(Shuffle::Artist),
            ShuffleArg::Album => ShuffleAction::Set(Shuffle::Album),
            ShuffleArg::Rating => ShuffleAction::Set(Shuffle::Rating),
            ShuffleArg::Score => ShuffleAction::Set(Shuffle::Score),
            ShuffleArg::Cycle => ShuffleAction::Cycle,
            ShuffleArg::Toggle => ShuffleAction::OnOffToggle,
        }
    }
}

impl From<RepeatArg> for RepeatAction {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatAction::Set(Repeat::Off),
            RepeatArg::Single => RepeatAction::Set(Repeat::Single),
            RepeatArg::All => RepeatAction::Set(Repeat::All),
            RepeatArg::Cycle => RepeatAction::Cycle,
            RepeatArg::Toggle => RepeatAction::OnOffToggle,
        }
    }
}

fn parse_volume(s: &str) -> Result<VolumeAction, String> {
    match s {
        "up" => Ok(VolumeAction::Up),
        "down" => Ok(VolumeAction::Down),
        "mute" => Ok(VolumeAction::Mute),
        n => n
            .parse::<i32>()
            .map(VolumeAction::Set)
            .map_err(|_| format!("expected 0-100, up, down or mute, got {n:?}")),
    }
}

impl Action {
    /// The command and params this action sends, or `None` for actions
    /// that are not a single command (check, sync, cover, gen-config).
    pub fn to_request(&self) -> Option<(Command, Option<Bytes>)> {
        let status = |req: StatusRequest| Some((Command::PlayerStatus, Some(req.to_params())));
        let playlist = |req: PlaylistRequest| Some((Command::Playlist, Some(req.to_params())));
        let req = StatusRequest::new();

        match self {
            Action::Status => status(req),
            Action::Play => status(req.play(PlayAction::Play)),
            Action::Pause => status(req.play(PlayAction::Pause)),
            Action::Toggle => status(req.play(PlayAction::Toggle)),
            Action::Next => status(req.play(PlayAction::Next)),
            Action::Prev => status(req.play(PlayAction::Previous)),
            Action::Volume { level } => status(req.volume(*level)),
            Action::Shuffle { mode } => status(req.shuffle((*mode).into())),
            Action::Repeat { mode } => status(req.repeat((*mode).into())),
            Action::Seek { position_ms } => status(req.seek(*position_ms)),
            Action::Song => Some((Command::SongInfo, None)),
            Action::Playlists => playlist(PlaylistRequest::Names),
            Action::Tracks {
                playlist: id,
                start,
                before_current,
                max,
            } => playlist(PlaylistRequest::Tracks {
                playlist: *id,
                start: match before_current {
                    Some(n) => Start::BeforeCurrent(*n),
                    None => Start::At(*start),
                },
                max: *max,
            }),
            Action::PlayTrack {
                track_id,
                playlist: id,
            } => playlist(PlaylistRequest::PlayTrack {
                playlist: *id,
                track_id: *track_id,
            }),
            Action::Check | Action::Sync { .. } | Action::Cover { .. } | Action::GenConfig => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("banshee-remote").chain(args.iter().copied())).unwrap()
    }

    fn params(args: &[&str]) -> Vec<u8> {
        let (_, params) = parse(args).command.to_request().unwrap();
        params.map(|p| p.to_vec()).unwrap_or_default()
    }

    #[test]
    fn global_overrides() {
        let cli = parse(&["--host", "10.0.0.9", "--port", "9000", "--json", "status"]);
        assert_eq!(cli.host.as_deref(), Some("10.0.0.9"));
        assert_eq!(cli.port, Some(9000));
        assert!(cli.json);
        assert_eq!(cli.command, Action::Status);
    }

    #[test]
    fn playback_actions() {
        assert_eq!(params(&["status"]), vec![0; 7]);
        assert_eq!(params(&["next"])[0], 0x40);
        assert_eq!(params(&["toggle"])[0], 0x10);
        assert_eq!(params(&["repeat", "all"])[0], 0x03);
        assert_eq!(params(&["shuffle", "toggle"])[1], 8);
        assert_eq!(params(&["seek", "1000"])[3..7], [0xE8, 0x03, 0, 0]);
    }

    #[test]
    fn volume_forms() {
        assert_eq!(params(&["volume", "57"])[2], 57);
        assert_eq!(params(&["volume", "150"])[2], 100);
        assert_eq!(params(&["volume", "-5"])[2], 0);
        assert_eq!(params(&["volume", "mute"])[2], 101);
        assert!(Cli::try_parse_from(["banshee-remote", "volume", "loud"]).is_err());
    }

    #[test]
    fn playlist_actions() {
        assert_eq!(params(&["playlists"]), vec![1]);
        assert_eq!(params(&["tracks"]), vec![2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            params(&["tracks", "3", "--before-current", "5", "--max", "20"]),
            vec![2, 3, 0, 20, 0, 0, 0, 5, 0, 0, 0x80]
        );
        assert_eq!(
            params(&["play-track", "12", "--playlist", "1"]),
            vec![3, 1, 0, 12, 0, 0, 0]
        );
    }

    #[test]
    fn sync_recompress_flag() {
        assert_eq!(parse(&["sync"]).command, Action::Sync { recompress: false });
        assert_eq!(
            parse(&["sync", "--recompress"]).command,
            Action::Sync { recompress: true }
        );
    }

    #[test]
    fn compound_actions_have_no_single_request() {
        for action in [
            Action::Check,
            Action::Sync { recompress: false },
            Action::GenConfig,
        ] {
            assert!(action.to_request().is_none());
        }
        assert_eq!(
            parse(&["song"]).command.to_request(),
            Some((Command::SongInfo, None))
        );
    }
}
