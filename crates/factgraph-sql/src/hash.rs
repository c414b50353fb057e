//! BLAKE3 content hashing for log rows.
//!
//! Each log row stores the hash of the text it describes, so an edited row
//! or a replayed payload can be spotted by comparing hashes.

use factgraph_core::LogEntry;

/// Hex-encoded BLAKE3 hash of a payload text.
pub fn text_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Whether the entry's stored hash matches its text.
pub fn verify_entry(entry: &LogEntry) -> bool {
    entry.text_hash == text_hash(&entry.text)
}
