//! Short external identifier (UID) utilities

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of every entity UID
pub const UID_LENGTH: usize = 8;

/// Generate a random alphanumeric UID of the given length
pub fn generate(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Check that a string has the shape of a UID
pub fn is_valid(uid: &str) -> bool {
    uid.len() == UID_LENGTH && uid.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_alphabet() {
        for _ in 0..100 {
            let uid = generate(UID_LENGTH);
            assert!(is_valid(&uid), "bad uid {}", uid);
        }
    }

    #[test]
    fn test_is_valid_rejects_wrong_shape() {
        assert!(!is_valid("short"));
        assert!(!is_valid("12345678X"));
        assert!(!is_valid("1234-678"));
    }
}
