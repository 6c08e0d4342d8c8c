//! Content digests and cheap change fingerprints.

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Fingerprints are reduced modulo this bound so they fit an SQLite integer.
const FINGERPRINT_MODULUS: u128 = 1 << 62;

/// 128-bit digest: the first 16 bytes of the BLAKE3 hash.
pub fn digest128(data: &[u8]) -> [u8; 16] {
    let hash = blake3::hash(data);
    let mut out = [0u8; 16];
    out.copy_from_slice(&hash.as_bytes()[..16]);
    out
}

/// Combine inode and modification time (whole seconds) into one number.
pub fn fingerprint(inode: u64, mtime_secs: i64) -> i64 {
    let product = inode as i128 * mtime_secs as i128;
    product.rem_euclid(FINGERPRINT_MODULUS as i128) as i64
}

/// Fingerprint of a file from its metadata.
pub fn metadata_fingerprint(meta: &Metadata) -> i64 {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    fingerprint(inode(meta), mtime)
}

#[cfg(unix)]
fn inode(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode(_meta: &Metadata) -> u64 {
    1
}
