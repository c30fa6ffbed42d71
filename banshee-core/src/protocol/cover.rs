//! Cover art requests. Params are the length-prefixed art id; the reply
//! is the raw image, or a short placeholder when the server has none.

use bytes::Bytes;

use crate::codec::{STRING_PREFIX, decode_string, encode_string};
use crate::error::BansheeError;

/// Replies of this size or smaller carry no image.
pub const MIN_COVER_LEN: usize = 2;

pub fn encode(art_id: &str) -> Result<Bytes, BansheeError> {
    encode_string(art_id)
}

/// The art id a cover request was made for.
pub fn art_id(params: &[u8]) -> Result<String, BansheeError> {
    Ok(decode_string(params, 0)?.0)
}

/// A request without a usable art id.
pub fn is_empty_request(params: Option<&[u8]>) -> bool {
    params.is_none_or(|p| p.len() < STRING_PREFIX)
}

pub fn has_image(response: &[u8]) -> bool {
    response.len() > MIN_COVER_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn art_id_roundtrip() {
        let params = encode("album-3f2c").unwrap();
        assert_eq!(art_id(&params).unwrap(), "album-3f2c");
        assert!(!is_empty_request(Some(&params[..])));
    }

    #[test]
    fn empty_requests() {
        assert!(is_empty_request(None));
        assert!(is_empty_request(Some(&[0u8][..])));
        // An empty art id still encodes a full prefix.
        assert!(!is_empty_request(Some(&encode("").unwrap()[..])));
    }

    #[test]
    fn placeholder_has_no_image() {
        assert!(!has_image(&[0]));
        assert!(has_image(&[0xFF, 0xD8, 0xFF]));
    }
}
