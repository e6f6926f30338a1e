//! # Identifier Syntax
//!
//! Checks shared by the document validators and the protocol.

/// Length of a base58 CIDv0 string ("Qm" + 44).
pub const CID_LENGTH: usize = 46;

/// Lower exclusive bound for document timestamps (2019-07-25).
pub const TIMESTAMP_MIN: i64 = 1_564_050_341;

/// Upper exclusive bound for document timestamps (year 3000).
pub const TIMESTAMP_MAX: i64 = 32_521_429_541;

/// `^Q[[:alnum:]]{45}$`; the empty string is accepted separately by
/// [`is_cid_or_empty`].
pub fn is_cid(s: &str) -> bool {
    s.len() == CID_LENGTH && s.starts_with('Q') && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// `^Q[[:alnum:]]{45}$|^$`
pub fn is_cid_or_empty(s: &str) -> bool {
    s.is_empty() || is_cid(s)
}

/// Hex SHA-256, as carried by `previous_order_cid`.
pub fn is_tx_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Strictly inside `(TIMESTAMP_MIN, TIMESTAMP_MAX)`.
pub fn timestamp_in_window(ts: i64) -> bool {
    ts > TIMESTAMP_MIN && ts < TIMESTAMP_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cid_syntax() {
        assert!(is_cid("QmfWg5GffUEzwahd9hkvdnqTGQs5PfusoEpx3kSDSdG4ze"));
        assert!(!is_cid("QmfWg5GffUEzwahd9hkvdnqTGQs5PfusoEpx3kSDSdG4z"));
        assert!(!is_cid("XmfWg5GffUEzwahd9hkvdnqTGQs5PfusoEpx3kSDSdG4ze"));
        assert!(!is_cid("Qm-Wg5GffUEzwahd9hkvdnqTGQs5PfusoEpx3kSDSdG4ze"));
        assert!(is_cid_or_empty(""));
        assert!(!is_cid(""));
    }

    #[test]
    fn test_timestamp_window_boundaries() {
        assert!(!timestamp_in_window(TIMESTAMP_MIN));
        assert!(timestamp_in_window(TIMESTAMP_MIN + 1));
        assert!(timestamp_in_window(TIMESTAMP_MAX - 1));
        assert!(!timestamp_in_window(TIMESTAMP_MAX));
    }

    #[test]
    fn test_tx_hash_syntax() {
        assert!(is_tx_hash(&"ab".repeat(32)));
        assert!(!is_tx_hash(&"zz".repeat(32)));
        assert!(!is_tx_hash("abcd"));
    }
}
