//! Pending command queue.
//!
//! Entries are appended at the back and taken from the back (LIFO), so
//! the latest user action is served first. Cover requests only go out
//! when no other command is waiting.

use std::collections::{HashSet, VecDeque};

use bytes::Bytes;

use crate::message::Command;
use crate::protocol::cover;

/// A command waiting for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: Command,
    pub params: Option<Bytes>,
}

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Added as the most recent entry.
    Queued,
    /// Replaced the params of an entry for the same command.
    Coalesced,
    /// Dropped: a cover request without an art id, or for a cover
    /// already requested.
    Dismissed,
    /// Dropped: the connection is closed.
    Ignored,
}

impl Enqueued {
    /// `true` when the worker has something new to do.
    pub fn is_accepted(self) -> bool {
        matches!(self, Enqueued::Queued | Enqueued::Coalesced)
    }
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<PendingCommand>,
    /// Art ids of cover requests queued or in flight.
    pending_covers: HashSet<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command, params: Option<Bytes>, coalesce: bool) -> Enqueued {
        let cover_id = if command == Command::Cover {
            if cover::is_empty_request(params.as_deref()) {
                return Enqueued::Dismissed;
            }
            match params.as_deref().map(cover::art_id) {
                Some(Ok(id)) if !self.pending_covers.contains(&id) => Some(id),
                _ => return Enqueued::Dismissed,
            }
        } else {
            None
        };

        if coalesce {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.command == command) {
                if let Some(id) = cover_id {
                    if let Some(old) = entry.params.as_deref().and_then(|p| cover::art_id(p).ok()) {
                        self.pending_covers.remove(&old);
                    }
                    self.pending_covers.insert(id);
                }
                entry.params = params;
                return Enqueued::Coalesced;
            }
        }

        if let Some(id) = cover_id {
            self.pending_covers.insert(id);
        }
        self.entries.push_back(PendingCommand { command, params });
        Enqueued::Queued
    }

    /// Take the most recent non-cover entry, or the most recent cover
    /// entry if nothing else is waiting.
    pub fn pop(&mut self) -> Option<PendingCommand> {
        match self.entries.iter().rposition(|e| e.command != Command::Cover) {
            Some(i) => self.entries.remove(i),
            None => self.entries.pop_back(),
        }
    }

    /// Forget a cover request so the same art id can be asked for again.
    pub fn finish_cover(&mut self, params: Option<&[u8]>) {
        if let Some(id) = params.and_then(|p| cover::art_id(p).ok()) {
            self.pending_covers.remove(&id);
        }
    }

    /// Params of the most recent entry for `command`, if one is waiting.
    pub fn params_for(&self, command: Command) -> Option<Bytes> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.command == command)
            .and_then(|e| e.params.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending_covers.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries, oldest first.
    pub fn snapshot(&self) -> Vec<PendingCommand> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(id: &str) -> Option<Bytes> {
        Some(cover::encode(id).unwrap())
    }

    #[test]
    fn coalescing_keeps_latest_params() {
        let mut q = CommandQueue::new();
        assert_eq!(
            q.push(Command::PlayerStatus, Some(Bytes::from_static(&[1])), true),
            Enqueued::Queued
        );
        assert_eq!(
            q.push(Command::PlayerStatus, Some(Bytes::from_static(&[2])), true),
            Enqueued::Coalesced
        );
        assert_eq!(q.len(), 1);
        assert_eq!(
            q.pop().unwrap().params,
            Some(Bytes::from_static(&[2]))
        );
    }

    #[test]
    fn without_coalescing_entries_pile_up() {
        let mut q = CommandQueue::new();
        q.push(Command::SongInfo, None, false);
        q.push(Command::SongInfo, None, false);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn drains_most_recent_first() {
        let mut q = CommandQueue::new();
        q.push(Command::PlayerStatus, None, true);
        q.push(Command::SongInfo, None, true);
        q.push(Command::Playlist, None, true);
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|e| e.command).collect();
        assert_eq!(
            order,
            vec![Command::Playlist, Command::SongInfo, Command::PlayerStatus]
        );
    }

    #[test]
    fn covers_wait_for_everything_else() {
        let mut q = CommandQueue::new();
        q.push(Command::PlayerStatus, None, true);
        q.push(Command::Cover, cover("a"), false);
        q.push(Command::Cover, cover("b"), false);
        q.push(Command::SongInfo, None, true);

        let order: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(order[0].command, Command::SongInfo);
        assert_eq!(order[1].command, Command::PlayerStatus);
        assert_eq!(order[2].params, cover("b"));
        assert_eq!(order[3].params, cover("a"));
    }

    #[test]
    fn cover_requests_are_deduplicated() {
        let mut q = CommandQueue::new();
        assert_eq!(q.push(Command::Cover, cover("x"), false), Enqueued::Queued);
        assert_eq!(q.push(Command::Cover, cover("x"), false), Enqueued::Dismissed);

        // Still pending while in flight.
        let entry = q.pop().unwrap();
        assert_eq!(q.push(Command::Cover, cover("x"), false), Enqueued::Dismissed);

        q.finish_cover(entry.params.as_deref());
        assert_eq!(q.push(Command::Cover, cover("x"), false), Enqueued::Queued);
    }

    #[test]
    fn coalesced_cover_swaps_pending_id() {
        let mut q = CommandQueue::new();
        q.push(Command::Cover, cover("old"), true);
        assert_eq!(q.push(Command::Cover, cover("new"), true), Enqueued::Coalesced);
        assert_eq!(q.len(), 1);
        // The replaced id may be requested again.
        assert_eq!(q.push(Command::Cover, cover("old"), false), Enqueued::Queued);
    }

    #[test]
    fn empty_cover_request_is_dismissed() {
        let mut q = CommandQueue::new();
        assert_eq!(q.push(Command::Cover, None, true), Enqueued::Dismissed);
        assert_eq!(
            q.push(Command::Cover, Some(Bytes::from_static(&[0])), true),
            Enqueued::Dismissed
        );
        assert!(q.is_empty());
    }

    #[test]
    fn params_for_and_clear() {
        let mut q = CommandQueue::new();
        q.push(Command::PlayerStatus, Some(Bytes::from_static(&[0, 0, 57])), true);
        q.push(Command::Cover, cover("c"), true);
        assert_eq!(
            q.params_for(Command::PlayerStatus),
            Some(Bytes::from_static(&[0, 0, 57]))
        );
        assert_eq!(q.params_for(Command::SongInfo), None);
        assert_eq!(q.snapshot().len(), 2);

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.push(Command::Cover, cover("c"), true), Enqueued::Queued);
    }
}
