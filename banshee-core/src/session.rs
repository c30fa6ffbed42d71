//! Owner of the active connection and the stores around it.
//!
//! A [`Session`] ties a [`Connection`] to the server it was opened for,
//! and turns sync and cover replies into cache updates. The caller reads
//! [`CommandEvent`]s from its channel and feeds them back through
//! [`Session::handle_event`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::check::{CheckReport, ServerCheck};
use crate::error::BansheeError;
use crate::library::{CoverStore, LibraryCache};
use crate::message::Command;
use crate::network::{
    CommandEvent, Connection, ConnectionConfig, Enqueued, EventSender, TcpTransport, Transport,
};
use crate::protocol::{SyncRequest, cover, sync};
use crate::server::{Server, ServerId, ServerStore};

/// What [`Session::handle_event`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The cached library matches the server's.
    DatabaseCurrent,
    /// The server has no library database to offer.
    DatabaseUnavailable,
    /// The cached library is stale or missing; the file was requested.
    DatabaseRequested { timestamp: u32 },
    DatabaseSynced { timestamp: Option<u32> },
    /// The server rebuilt its database; the timestamp was asked for again.
    DatabaseRecompressed,
    CoverStored { art_id: String },
    /// The connection was dropped after too many failures.
    ConnectionLost,
}

struct Active {
    server: Server,
    connection: Connection,
    /// Timestamp announced before the database file was requested.
    incoming_timestamp: Option<u32>,
}

pub struct Session {
    config: ConnectionConfig,
    servers: Box<dyn ServerStore>,
    library: Arc<dyn LibraryCache>,
    covers: Arc<dyn CoverStore>,
    transport: Arc<dyn Transport>,
    active: Option<Active>,
}

impl Session {
    pub fn new(
        config: ConnectionConfig,
        servers: Box<dyn ServerStore>,
        library: Arc<dyn LibraryCache>,
        covers: Arc<dyn CoverStore>,
    ) -> Self {
        Self::with_transport(config, servers, library, covers, Arc::new(TcpTransport::new()))
    }

    pub fn with_transport(
        config: ConnectionConfig,
        servers: Box<dyn ServerStore>,
        library: Arc<dyn LibraryCache>,
        covers: Arc<dyn CoverStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            servers,
            library,
            covers,
            transport,
            active: None,
        }
    }

    pub fn servers(&self) -> &dyn ServerStore {
        self.servers.as_ref()
    }

    pub fn servers_mut(&mut self) -> &mut dyn ServerStore {
        self.servers.as_mut()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open a connection to server `id`, closing the current one first.
    /// The server becomes the default for [`Session::connect_default`].
    pub fn connect(
        &mut self,
        id: ServerId,
        events: Option<EventSender>,
    ) -> Result<&Connection, BansheeError> {
        let server = self.servers.get(id)?;
        self.disconnect();
        self.servers.set_default(id)?;

        info!(server = %server, id, "connecting");
        let connection = Connection::with_transport(
            server.endpoint(),
            self.config,
            Arc::clone(&self.transport),
            events,
        );
        let active = self.active.insert(Active {
            server,
            connection,
            incoming_timestamp: None,
        });
        Ok(&active.connection)
    }

    pub fn connect_default(
        &mut self,
        events: Option<EventSender>,
    ) -> Result<&Connection, BansheeError> {
        let id = self
            .servers
            .default_server()
            .ok_or(BansheeError::InvalidServer("no default server"))?
            .id;
        self.connect(id, events)
    }

    pub fn disconnect(&mut self) {
        if let Some(active) = self.active.take() {
            active.connection.close();
            debug!(server = %active.server, "disconnected");
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.active.as_ref().map(|a| &a.connection)
    }

    /// The server of the active connection.
    pub fn server(&self) -> Option<&Server> {
        self.active.as_ref().map(|a| &a.server)
    }

    fn active(&self) -> Result<&Active, BansheeError> {
        self.active.as_ref().ok_or(BansheeError::NotConnected)
    }

    /// Remove a server from the store, handing its cached library to the
    /// alias that takes over, or deleting it.
    pub fn remove_server(&mut self, id: ServerId) -> Result<Server, BansheeError> {
        let heir = self
            .servers
            .list()
            .into_iter()
            .find(|s| s.same_host_id == Some(id))
            .map(|s| s.id);

        if self
            .active
            .as_ref()
            .is_some_and(|a| a.server.id == id || a.server.library_owner() == id)
        {
            self.disconnect();
        }

        let removed = self.servers.remove(id)?;
        match heir {
            Some(heir) => self.library.move_database(id, heir)?,
            None if !removed.is_alias() => self.library.remove_database(id)?,
            None => {}
        }
        Ok(removed)
    }

    /// Probe server `id` in the background.
    pub fn check(
        &self,
        id: ServerId,
        timeout: Duration,
        reply: &mpsc::Sender<CheckReport>,
    ) -> Result<JoinHandle<()>, BansheeError> {
        let server = self.servers.get(id)?;
        Ok(ServerCheck::spawn_with_transport(
            id,
            server.endpoint(),
            timeout,
            Arc::clone(&self.transport),
            reply,
        ))
    }

    // ── Requests ─────────────────────────────────────────────────

    /// Ask for the server's database timestamp; the reply decides
    /// whether the file is downloaded.
    pub fn request_sync(&self) -> Result<Enqueued, BansheeError> {
        let active = self.active()?;
        Ok(active
            .connection
            .send_command(Command::SyncDatabase, Some(SyncRequest::Timestamp.to_params())))
    }

    /// Ask the server to rebuild its compressed database. A confirmed
    /// rebuild triggers a fresh timestamp request.
    pub fn request_recompress(&self) -> Result<Enqueued, BansheeError> {
        let active = self.active()?;
        Ok(active
            .connection
            .send_command(Command::SyncDatabase, Some(SyncRequest::Recompress.to_params())))
    }

    /// Fetch a cover unless it is already cached. Empty art ids (tracks
    /// without a cover) are dismissed.
    pub fn request_cover(&self, art_id: &str) -> Result<Enqueued, BansheeError> {
        let active = self.active()?;
        if art_id.is_empty() || self.covers.has_cover(art_id) {
            return Ok(Enqueued::Dismissed);
        }
        let params = cover::encode(art_id)?;
        Ok(active
            .connection
            .send_command_with(Command::Cover, Some(params), false))
    }

    // ── Events ───────────────────────────────────────────────────

    /// Apply a connection event to the caches. Returns `None` for events
    /// the session has nothing to do with.
    pub fn handle_event(
        &mut self,
        event: &CommandEvent,
    ) -> Result<Option<SessionNotice>, BansheeError> {
        match event {
            CommandEvent::ConnectionLost => {
                warn!("connection lost");
                self.disconnect();
                Ok(Some(SessionNotice::ConnectionLost))
            }
            CommandEvent::Handled {
                command: Command::SyncDatabase,
                params,
                response,
            } => self.handle_sync(params.as_deref(), response),
            CommandEvent::Handled {
                command: Command::Cover,
                params,
                response,
            } => self.handle_cover(params.as_deref(), response),
            CommandEvent::Handled { .. } => Ok(None),
        }
    }

    fn handle_sync(
        &mut self,
        params: Option<&[u8]>,
        response: &Bytes,
    ) -> Result<Option<SessionNotice>, BansheeError> {
        let params = params.ok_or(BansheeError::InvalidParams("missing sync request"))?;
        let request = SyncRequest::from_params(params)?;
        let library = Arc::clone(&self.library);
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        let owner = active.server.library_owner();

        match request {
            SyncRequest::Timestamp => {
                let timestamp = sync::decode_timestamp(response)?;
                if timestamp == 0 {
                    return Ok(Some(SessionNotice::DatabaseUnavailable));
                }
                if active.server.db_timestamp == Some(timestamp) && library.has_database(owner) {
                    debug!(timestamp, "library is current");
                    return Ok(Some(SessionNotice::DatabaseCurrent));
                }
                active.incoming_timestamp = Some(timestamp);
                active
                    .connection
                    .send_command(Command::SyncDatabase, Some(SyncRequest::File.to_params()));
                info!(timestamp, "library is stale, requesting database");
                Ok(Some(SessionNotice::DatabaseRequested { timestamp }))
            }
            SyncRequest::File => {
                let timestamp = active.incoming_timestamp.take();
                if !sync::is_database(response) {
                    warn!(len = response.len(), "server sent no database file");
                    return Ok(Some(SessionNotice::DatabaseUnavailable));
                }
                library.store_database(owner, response)?;
                let server_id = active.server.id;
                if let Some(ts) = timestamp {
                    active.server.db_timestamp = Some(ts);
                    self.servers.set_db_timestamp(server_id, ts)?;
                }
                info!(?timestamp, len = response.len(), "library synced");
                Ok(Some(SessionNotice::DatabaseSynced { timestamp }))
            }
            SyncRequest::Recompress => {
                if !sync::decode_recompressed(response)? {
                    warn!("server did not recompress its database");
                    return Ok(Some(SessionNotice::DatabaseUnavailable));
                }
                active
                    .connection
                    .send_command(Command::SyncDatabase, Some(SyncRequest::Timestamp.to_params()));
                info!("database recompressed, requesting timestamp");
                Ok(Some(SessionNotice::DatabaseRecompressed))
            }
        }
    }

    fn handle_cover(
        &mut self,
        params: Option<&[u8]>,
        response: &Bytes,
    ) -> Result<Option<SessionNotice>, BansheeError> {
        let params = params.ok_or(BansheeError::InvalidParams("missing art id"))?;
        let art_id = cover::art_id(params)?;
        if !cover::has_image(response) {
            debug!(art_id, "server has no cover");
            return Ok(None);
        }
        self.covers.store_cover(&art_id, response)?;
        Ok(Some(SessionNotice::CoverStored { art_id }))
    }
}
