//! Opaque identifier generation.
//!
//! Identifiers follow the `<prefix>_<unix_millis>_<random>` shape the rest
//! of the system (and stored data) already uses, so they sort roughly by
//! creation time and are safe to log.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Generate a new identifier with the given prefix.
pub fn new_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!("{prefix}_{millis}_{suffix}")
}

/// Generate a random activation token (no prefix, longer).
pub fn new_token() -> String {
    let mut rng = rand::thread_rng();
    (0..26)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_id("session");
        let b = new_id("session");
        assert!(a.starts_with("session_"));
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_are_long_enough_to_guess_proof() {
        let t = new_token();
        assert_eq!(t.len(), 26);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
