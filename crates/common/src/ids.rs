//! Canonical record identifiers.
//!
//! Every row this system inserts gets an id of the shape `c` + 24 lowercase
//! base-36 characters: 8 for the millisecond timestamp, 4 for a process-local
//! counter, 12 random. Rows carrying any other shape were written by some
//! other path and are candidates for repair.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;

use crate::{Error, Result};

const PREFIX: char = 'c';
const BODY_LEN: usize = 24;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh canonical identifier.
pub fn new_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let random: u64 = rand::rng().random();

    let mut id = String::with_capacity(1 + BODY_LEN);
    id.push(PREFIX);
    push_base36(&mut id, millis, 8);
    push_base36(&mut id, count, 4);
    push_base36(&mut id, random, 12);
    id
}

/// Whether `id` has the canonical shape produced by [`new_id`].
pub fn is_canonical_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next() == Some(PREFIX)
        && id.len() == 1 + BODY_LEN
        && chars.all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
}

/// Reject ids that are not canonical.
pub fn ensure_canonical(id: &str) -> Result<&str> {
    if is_canonical_id(id) {
        Ok(id)
    } else {
        Err(Error::invalid_id(id))
    }
}

/// Append the low `width` base-36 digits of `value`, zero padded.
fn push_base36(out: &mut String, mut value: u64, width: usize) {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    out.extend(digits.into_iter().map(char::from));
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet};

    #[test]
    fn generated_ids_are_canonical() {
        for _ in 0..100 {
            let id = new_id();
            assert_eq!(id.len(), 25, "{id}");
            assert!(is_canonical_id(&id), "{id}");
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn rejects_foreign_shapes() {
        assert!(!is_canonical_id(""));
        assert!(!is_canonical_id("default-company"));
        assert!(!is_canonical_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_canonical_id("C0123456789abcdefghijklmn"));
        assert!(!is_canonical_id("c0123456789ABCDEFGHIJKLMN"));
        assert!(!is_canonical_id("c0123456789abcdefghijklm"));
        assert!(is_canonical_id("c0123456789abcdefghijklmn"));
    }

    #[test]
    fn ensure_canonical_reports_the_id() {
        let err = ensure_canonical("company_1").unwrap_err();
        assert_eq!(err.to_string(), "`company_1` is not a canonical identifier");
        assert!(ensure_canonical("c0123456789abcdefghijklmn").is_ok());
    }

    #[test]
    fn base36_is_zero_padded() {
        let mut s = String::new();
        push_base36(&mut s, 35, 3);
        assert_eq!(s, "00z");
    }
}
