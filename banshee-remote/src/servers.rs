//! The known-server list, persisted as JSON next to the caches.

use std::path::Path;

use banshee_core::{BansheeError, MemoryServerStore, Server, ServerId, ServerStore};

/// Load the server list, falling back to an empty one.
pub fn load(path: &Path) -> MemoryServerStore {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("invalid server list {}: {e}; starting empty", path.display());
            MemoryServerStore::new()
        }),
        Err(_) => MemoryServerStore::new(),
    }
}

pub fn save(path: &Path, store: &MemoryServerStore) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(store).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

/// Id of the stored server at `wanted`'s host and port, adding it when
/// there is none. A changed password id is written back.
pub fn ensure(store: &mut MemoryServerStore, wanted: &Server) -> Result<ServerId, BansheeError> {
    let existing = store
        .list()
        .into_iter()
        .find(|s| !s.is_alias() && s.host == wanted.host && s.port == wanted.port);

    match existing {
        Some(mut server) if server.password_id != wanted.password_id => {
            server.password_id = wanted.password_id;
            let id = server.id;
            store.update(id, server)?;
            Ok(id)
        }
        Some(server) => Ok(server.id),
        None => store.add(wanted.clone()),
    }
}
