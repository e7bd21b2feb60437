//! Public workflow codes.
//!
//! Every workflow gets a short human-shareable code alongside its internal
//! UUID, so it can be referenced in mail or over the phone without leaking
//! the internal key.  Format: four groups of four uppercase alphanumerics,
//! `XXXX-XXXX-XXXX-XXXX`.

use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GROUPS: usize = 4;
const GROUP_LEN: usize = 4;

/// Generate a fresh public code.
///
/// Uniqueness is enforced by the database's unique constraint, not here;
/// 36^16 makes a collision retry effectively unreachable.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let mut segments = Vec::with_capacity(GROUPS);
    for _ in 0..GROUPS {
        let segment: String = (0..GROUP_LEN)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        segments.push(segment);
    }
    segments.join("-")
}

/// Check a candidate string against the public-code format.
pub fn is_valid(code: &str) -> bool {
    let segments: Vec<&str> = code.split('-').collect();
    segments.len() == GROUPS
        && segments.iter().all(|s| {
            s.len() == GROUP_LEN
                && s.bytes().all(|b| CHARSET.contains(&b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_matches_format() {
        let code = generate();
        assert_eq!(code.len(), 19);
        assert!(is_valid(&code), "bad code: {code}");
    }

    #[test]
    fn codes_are_not_trivially_repeating() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }

    #[test]
    fn format_validation_rejects_lowercase_and_shape() {
        assert!(is_valid("A1B2-C3D4-E5F6-G7H8"));
        assert!(!is_valid("a1b2-c3d4-e5f6-g7h8"));
        assert!(!is_valid("A1B2C3D4E5F6G7H8"));
        assert!(!is_valid("A1B2-C3D4-E5F6"));
        assert!(!is_valid("A1B!-C3D4-E5F6-G7H8"));
    }
}
