//! Pre-sampled value pools.
//!
//! Pools are built once per generator so that per-document work is reduced
//! to uniform draws.

use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::Rng;

/// Draw one element uniformly; an empty pool yields `T::default()`.
pub fn pick<T: Clone + Default, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> T {
    items.choose(rng).cloned().unwrap_or_default()
}

/// Twelve digit AWS account ids.
pub fn account_ids(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| random_account_id(&mut rng)).collect()
}

pub fn random_account_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000_000_000u64..=999_999_999_999).to_string()
}

/// Dotted IPv4 addresses with the first octet drawn from `first_octet`.
pub fn ipv4_pool(count: usize, first_octet: RangeInclusive<u8>) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| random_ipv4(&mut rng, first_octet.clone()))
        .collect()
}

pub fn random_ipv4<R: Rng + ?Sized>(rng: &mut R, first_octet: RangeInclusive<u8>) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(first_octet),
        rng.gen_range(1..=255u8),
        rng.gen_range(1..=255u8),
        rng.gen_range(1..=255u8)
    )
}

/// Lowercase hex string of `len` characters (at most 32).
pub fn hex_suffix(len: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..len.min(hex.len())].to_string()
}

/// Identifiers such as `eni-0a1b2c3d4e5f6a7b`.
pub fn prefixed_ids(prefix: &str, count: usize, hex_len: usize) -> Vec<String> {
    (0..count)
        .map(|_| format!("{prefix}-{}", hex_suffix(hex_len)))
        .collect()
}

/// Names that embed their position, such as `fw-12-1a2b3c4d`.
pub fn numbered_names(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{prefix}-{i}-{}", hex_suffix(8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_ids_are_twelve_digits() {
        let ids = account_ids(20);
        assert_eq!(ids.len(), 20);
        assert!(ids
            .iter()
            .all(|id| id.len() == 12 && id.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn test_ipv4_pool_respects_first_octet() {
        for ip in ipv4_pool(200, 10..=192) {
            let octets: Vec<u16> = ip.split('.').map(|o| o.parse().unwrap()).collect();
            assert_eq!(octets.len(), 4);
            assert!((10..=192).contains(&octets[0]));
            assert!(octets[1..].iter().all(|o| (1..=255).contains(o)));
        }
    }

    #[test]
    fn test_prefixed_and_numbered_ids() {
        let enis = prefixed_ids("eni", 3, 16);
        assert!(enis.iter().all(|id| id.starts_with("eni-") && id.len() == 20));

        let names = numbered_names("fw", 3);
        assert!(names[2].starts_with("fw-2-"));
        assert_eq!(names[2].len(), "fw-2-".len() + 8);
    }

    #[test]
    fn test_pick_stays_in_pool() {
        let pool = ["a", "b", "c"];
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            assert!(pool.contains(&pick(&mut rng, &pool)));
        }
        let empty: Vec<String> = Vec::new();
        assert_eq!(pick(&mut rng, &empty), "");
    }
}
