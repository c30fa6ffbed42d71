//! Library database synchronization.
//!
//! The request is a single discriminator byte:
//! ```text
//! 1  database timestamp   -> u32 (0 when the server has no database)
//! 2  database file        -> raw file bytes (opaque to the client)
//! 3  force recompression  -> [1] when done
//! ```

use bytes::Bytes;

use crate::codec::read_u32;
use crate::error::BansheeError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncRequest {
    /// Version stamp of the server-side database, compared with the
    /// locally cached one before downloading.
    Timestamp = 1,
    File = 2,
    Recompress = 3,
}

impl SyncRequest {
    pub fn to_params(self) -> Bytes {
        Bytes::copy_from_slice(&[self as u8])
    }

    /// Which sync request a params buffer carries.
    pub fn from_params(params: &[u8]) -> Result<Self, BansheeError> {
        match params.first() {
            Some(1) => Ok(SyncRequest::Timestamp),
            Some(2) => Ok(SyncRequest::File),
            Some(3) => Ok(SyncRequest::Recompress),
            Some(other) => Err(BansheeError::UnknownVariant {
                type_name: "SyncRequest",
                value: *other as u64,
            }),
            None => Err(BansheeError::InvalidParams("empty sync request")),
        }
    }
}

/// Shortest file reply that can be a database. The server answers `[0]`
/// when its database file is missing.
pub const MIN_DATABASE_LEN: usize = 2;

/// Whether a reply to [`SyncRequest::File`] carries a database.
pub fn is_database(response: &[u8]) -> bool {
    response.len() >= MIN_DATABASE_LEN
}

/// Decode the reply to [`SyncRequest::Timestamp`].
pub fn decode_timestamp(response: &[u8]) -> Result<u32, BansheeError> {
    read_u32(response, 0, "database timestamp")
}

/// Decode the reply to [`SyncRequest::Recompress`].
pub fn decode_recompressed(response: &[u8]) -> Result<bool, BansheeError> {
    response
        .first()
        .map(|b| *b == 1)
        .ok_or_else(|| BansheeError::truncated("recompress reply", 1, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_identify_request() {
        for req in [
            SyncRequest::Timestamp,
            SyncRequest::File,
            SyncRequest::Recompress,
        ] {
            assert_eq!(SyncRequest::from_params(&req.to_params()).unwrap(), req);
        }
        assert!(SyncRequest::from_params(&[9]).is_err());
        assert!(SyncRequest::from_params(&[]).is_err());
    }

    #[test]
    fn missing_database_reply_is_not_a_file() {
        assert!(!is_database(&[0]));
        assert!(!is_database(&[]));
        assert!(is_database(b"SQLite format 3"));
    }

    #[test]
    fn timestamp_is_u32_le() {
        assert_eq!(decode_timestamp(&[0x78, 0x56, 0x34, 0x12]).unwrap(), 0x1234_5678);
        assert!(decode_timestamp(&[0]).is_err());
    }

    #[test]
    fn recompress_reply() {
        assert!(decode_recompressed(&[1]).unwrap());
        assert!(!decode_recompressed(&[0]).unwrap());
        assert!(decode_recompressed(&[]).is_err());
    }
}
