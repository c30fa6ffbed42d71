//! Server records and the store that keeps them.
//!
//! A server may be an alias of another one on the same host (for example
//! a LAN address and a public address of the same machine). Aliases share
//! the parent's port, password id and library database.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BansheeError;
use crate::network::Endpoint;

pub type ServerId = u64;

/// Port the remote listener uses unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8484;

/// Ports at or below this are not shown in [`Server`]'s display form.
const DISPLAY_PORT_MIN: u16 = 1024;

// ── Server ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// 0 until the server is added to a store.
    #[serde(default)]
    pub id: ServerId,
    pub host: String,
    pub port: u16,
    pub password_id: u16,
    #[serde(default)]
    pub same_host_id: Option<ServerId>,
    /// Version stamp of the locally cached library database.
    #[serde(default)]
    pub db_timestamp: Option<u32>,
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16, password_id: u16) -> Self {
        Self {
            id: 0,
            host: host.into(),
            port,
            password_id,
            same_host_id: None,
            db_timestamp: None,
        }
    }

    /// Another address for the server stored as `parent`.
    pub fn alias_of(host: impl Into<String>, parent: ServerId) -> Self {
        Self {
            same_host_id: Some(parent),
            ..Self::new(host, 0, 0)
        }
    }

    pub fn is_alias(&self) -> bool {
        self.same_host_id.is_some()
    }

    /// The server whose library this one uses.
    pub fn library_owner(&self) -> ServerId {
        self.same_host_id.unwrap_or(self.id)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port, self.password_id)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            Ok(())
        } else if self.port <= DISPLAY_PORT_MIN {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{} : {}", self.host, self.port)
        }
    }
}

// ── ServerStore ──────────────────────────────────────────────────

/// Persistent list of known servers. Every read resolves aliases: an
/// alias reports its parent's port, password id and database timestamp.
pub trait ServerStore: Send + Sync {
    fn get(&self, id: ServerId) -> Result<Server, BansheeError>;

    fn list(&self) -> Vec<Server>;

    /// Store a new server (its `id` must be 0) and return the new id.
    fn add(&mut self, server: Server) -> Result<ServerId, BansheeError>;

    fn update(&mut self, id: ServerId, server: Server) -> Result<(), BansheeError>;

    /// Remove a server. Its first alias takes over its settings and the
    /// other aliases are re-pointed at that one.
    fn remove(&mut self, id: ServerId) -> Result<Server, BansheeError>;

    /// Record the database timestamp on the server owning the library.
    fn set_db_timestamp(&mut self, id: ServerId, timestamp: u32) -> Result<(), BansheeError>;

    fn default_server(&self) -> Option<Server>;

    fn set_default(&mut self, id: ServerId) -> Result<(), BansheeError>;
}

/// In-memory [`ServerStore`].
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryServerStore {
    servers: BTreeMap<ServerId, Server>,
    next_id: ServerId,
    default: Option<ServerId>,
}

impl MemoryServerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, raw: &Server) -> Server {
        let mut server = raw.clone();
        match raw.same_host_id.and_then(|p| self.servers.get(&p)) {
            Some(parent) => {
                server.port = parent.port;
                server.password_id = parent.password_id;
                server.db_timestamp = parent.db_timestamp;
            }
            None => server.same_host_id = None,
        }
        server
    }

    /// Check the alias target and point it at the root server.
    fn validate_parent(&self, id: ServerId, server: &mut Server) -> Result<(), BansheeError> {
        let Some(parent_id) = server.same_host_id else {
            return Ok(());
        };
        if parent_id == id {
            return Err(BansheeError::InvalidServer("server cannot alias itself"));
        }
        let parent = self
            .servers
            .get(&parent_id)
            .ok_or(BansheeError::InvalidServer("same host id is invalid"))?;
        let root = parent.same_host_id.unwrap_or(parent_id);
        if root == id {
            return Err(BansheeError::InvalidServer("alias cycle"));
        }
        server.same_host_id = Some(root);
        server.port = 0;
        server.password_id = 0;
        server.db_timestamp = None;
        Ok(())
    }
}

impl ServerStore for MemoryServerStore {
    fn get(&self, id: ServerId) -> Result<Server, BansheeError> {
        self.servers
            .get(&id)
            .map(|s| self.resolve(s))
            .ok_or(BansheeError::UnknownServer(id))
    }

    fn list(&self) -> Vec<Server> {
        self.servers.values().map(|s| self.resolve(s)).collect()
    }

    fn add(&mut self, mut server: Server) -> Result<ServerId, BansheeError> {
        if server.id != 0 {
            return Err(BansheeError::InvalidServer("server already has an id"));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.validate_parent(id, &mut server)?;
        server.id = id;
        debug!(id, server = %server, "server added");
        self.servers.insert(id, server);
        Ok(id)
    }

    fn update(&mut self, id: ServerId, mut server: Server) -> Result<(), BansheeError> {
        if !self.servers.contains_key(&id) {
            return Err(BansheeError::UnknownServer(id));
        }
        self.validate_parent(id, &mut server)?;
        if server.same_host_id.is_some()
            && self.servers.values().any(|s| s.same_host_id == Some(id))
        {
            return Err(BansheeError::InvalidServer("server has aliases"));
        }
        server.id = id;
        self.servers.insert(id, server);
        Ok(())
    }

    fn remove(&mut self, id: ServerId) -> Result<Server, BansheeError> {
        let removed = self.get(id)?;
        self.servers.remove(&id);

        let children: Vec<ServerId> = self
            .servers
            .values()
            .filter(|s| s.same_host_id == Some(id))
            .map(|s| s.id)
            .collect();

        if let Some((&first, rest)) = children.split_first() {
            if let Some(heir) = self.servers.get_mut(&first) {
                heir.same_host_id = None;
                heir.port = removed.port;
                heir.password_id = removed.password_id;
                heir.db_timestamp = removed.db_timestamp;
            }
            for child in rest {
                if let Some(s) = self.servers.get_mut(child) {
                    s.same_host_id = Some(first);
                }
            }
            info!(removed = id, heir = first, "alias promoted");
        }

        if self.default == Some(id) {
            self.default = None;
        }
        Ok(removed)
    }

    fn set_db_timestamp(&mut self, id: ServerId, timestamp: u32) -> Result<(), BansheeError> {
        let owner = self.get(id)?.library_owner();
        let server = self
            .servers
            .get_mut(&owner)
            .ok_or(BansheeError::UnknownServer(owner))?;
        server.db_timestamp = Some(timestamp);
        Ok(())
    }

    fn default_server(&self) -> Option<Server> {
        self.default.and_then(|id| self.get(id).ok())
    }

    fn set_default(&mut self, id: ServerId) -> Result<(), BansheeError> {
        if !self.servers.contains_key(&id) {
            return Err(BansheeError::UnknownServer(id));
        }
        self.default = Some(id);
        Ok(())
    }
}
