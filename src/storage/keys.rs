//! RocksDB key layout
//!
//! `user:<login>`                                   -> User
//! `spin:<user_id><inv_created_at(be)><spin_id>`    -> SpinRecord
//!
//! Spin keys sort newest-first inside a user's prefix by storing the
//! inverted creation time.

use uuid::Uuid;

pub const USER_PREFIX: &[u8] = b"user:";
pub const SPIN_PREFIX: &[u8] = b"spin:";

pub fn user_key(login: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX.len() + login.len());
    key.extend_from_slice(USER_PREFIX);
    key.extend_from_slice(login.as_bytes());
    key
}

pub fn spin_prefix(user_id: &Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(SPIN_PREFIX.len() + 16);
    key.extend_from_slice(SPIN_PREFIX);
    key.extend_from_slice(user_id.as_bytes());
    key
}

pub fn spin_key(user_id: &Uuid, created_at_micros: u64, spin_id: &Uuid) -> Vec<u8> {
    let inv_created = u64::MAX - created_at_micros;
    let mut key = spin_prefix(user_id);
    key.reserve(8 + 16);
    key.extend_from_slice(&inv_created.to_be_bytes());
    key.extend_from_slice(spin_id.as_bytes());
    key
}

/// Printable form of a key for logs and error messages
pub fn display_key(key: &[u8]) -> String {
    if key.starts_with(USER_PREFIX) {
        String::from_utf8_lossy(key).into_owned()
    } else {
        format!("0x{}", key.iter().map(|b| format!("{:02x}", b)).collect::<String>())
    }
}
