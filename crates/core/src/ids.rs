//! Identifier generation
//!
//! Logical ids have the form `prefix-epochMillis-random`, where `random` is 9
//! base36 characters. Ids sort by creation time within a prefix and collide
//! with negligible probability.

use crate::types::Millis;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 9;

/// Generate an id such as `fact-1718000000000-k3j9x2a1q`
pub fn generate_id(prefix: &str, now: Millis) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, now, suffix)
}

/// Extract the creation timestamp from a generated id
pub fn id_timestamp(id: &str) -> Option<Millis> {
    let mut parts = id.rsplitn(3, '-');
    let _random = parts.next()?;
    parts.next()?.parse().ok()
}
