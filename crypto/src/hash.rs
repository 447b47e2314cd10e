//! Blake2b hashing for blocks and work values.

use blake2::digest::consts::{U32, U8};
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;
type Blake2b64 = Blake2b<U8>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// 64-bit Blake2b digest of the given parts, read little-endian.
///
/// Proof-of-work values are `blake2b_64(work_le || root)`.
pub fn blake2b_64_multi(parts: &[&[u8]]) -> u64 {
    let mut hasher = Blake2b64::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 8];
    output.copy_from_slice(&hasher.finalize());
    u64::from_le_bytes(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"lattice"), blake2b_256(b"lattice"));
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn blake2b_64_is_split_insensitive() {
        let a = blake2b_64_multi(&[&7u64.to_le_bytes(), &[0x11; 32]]);
        let mut joined = 7u64.to_le_bytes().to_vec();
        joined.extend_from_slice(&[0x11; 32]);
        assert_eq!(a, blake2b_64_multi(&[&joined]));
    }

    #[test]
    fn blake2b_64_depends_on_work() {
        let root = [0x22; 32];
        assert_ne!(
            blake2b_64_multi(&[&1u64.to_le_bytes(), &root]),
            blake2b_64_multi(&[&2u64.to_le_bytes(), &root])
        );
    }
}
