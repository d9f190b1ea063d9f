//! Common type definitions.
//!
//! - Type aliases for entity IDs
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use uuid::Uuid;

// Type aliases for IDs
pub type TokenId = Uuid;
pub type MemberId = i64;

/// Tokens are credentials, so logs only ever carry the first 8 characters.
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("0b8f1c2a-9d4e-4f00-8a3b-6c5d4e3f2a1b").unwrap();
        assert_eq!(abbrev_uuid(&id), "0b8f1c2a");
    }
}
