//! ID generation.
//!
//! `<prefix>-<12 hex chars>` where the hex comes from a uniform-random
//! generator. Never reused within a process (the generator is not seeded
//! deterministically), but callers needing reproducible tests should treat
//! the suffix as opaque and never assert on its value.

use rand::Rng;

/// Generate an id of the form `<prefix>-<12 hex chars>`.
pub fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..12)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();
    format!("{prefix}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_expected_shape() {
        let id = generate("action");
        assert!(id.starts_with("action-"));
        assert_eq!(id.len(), "action-".len() + 12);
        assert!(id["action-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_not_constant() {
        let a = generate("citation");
        let b = generate("citation");
        assert_ne!(a, b);
    }
}
