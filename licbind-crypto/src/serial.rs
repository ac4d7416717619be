//! Serial binding tokens.
//!
//! A serial ties a license to `(machine id, product, term)` under the serial
//! key. It is recomputed on every validation; the stored copy is only ever
//! compared against the recomputed one.

use crate::key::DerivedKey;
use md5::{Digest, Md5};

/// Length of a displayed serial, separators included (`XXXXX-XXXXX-XXXXX-XXXXX`).
pub const SERIAL_LEN: usize = 23;

/// Hex characters per serial group.
const GROUP_LEN: usize = 5;

/// Computes the binding token for a license.
///
/// Pure and deterministic: the canonical input
/// `machine_id|product_name|max_days|hex(serial_key)` is hashed with MD5 and
/// rendered as upper-case dash-separated groups.
#[must_use]
pub fn bind_serial(
    machine_id: &str,
    product_name: &str,
    max_days: u32,
    serial_key: &DerivedKey,
) -> String {
    let canonical = format!(
        "{machine_id}|{product_name}|{max_days}|{}",
        serial_key.to_hex()
    );
    let digest = hex::encode(Md5::digest(canonical.as_bytes()));

    let mut serial = String::with_capacity(digest.len() + digest.len() / GROUP_LEN);
    for (i, c) in digest.chars().enumerate() {
        if i > 0 && i % GROUP_LEN == 0 {
            serial.push('-');
        }
        serial.push(c);
    }
    serial.truncate(SERIAL_LEN);
    serial.to_uppercase()
}
