//! Property tests for content-addressable key hashing

use proptest::prelude::*;

use relschema::model::keys::{HashKeyer, KeyValue};
use relschema::{HashAlgorithm, HashWidth};

proptest! {
    /// hash(s) called twice returns the same value
    #[test]
    fn hash_is_pure(s in ".*") {
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Sha512, HashAlgorithm::Fnv1a64] {
            for width in [HashWidth::Raw, HashWidth::Binary, HashWidth::Unsigned32, HashWidth::Unsigned64] {
                let keyer = HashKeyer::new(algorithm, width);
                prop_assert_eq!(keyer.hash(&s), keyer.hash(&s));
            }
        }
    }

    /// Raw width is the identity on the key string
    #[test]
    fn raw_width_is_identity(s in ".*") {
        let keyer = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Raw);
        prop_assert_eq!(keyer.hash(&s), KeyValue::Text(s));
    }

    /// Truncated widths are prefixes of the same digest
    #[test]
    fn truncation_is_digest_prefix(s in ".*") {
        let keyer32 = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned32);
        let keyer64 = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned64);
        let full = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Binary);

        let digest = match full.hash(&s) {
            KeyValue::Digest(bytes) => bytes,
            other => unreachable!("binary width produced {:?}", other),
        };
        let v32 = match keyer32.hash(&s) {
            KeyValue::Uint32(v) => v,
            other => unreachable!("unsigned32 width produced {:?}", other),
        };
        let v64 = match keyer64.hash(&s) {
            KeyValue::Uint64(v) => v,
            other => unreachable!("unsigned64 width produced {:?}", other),
        };

        let mut prefix32 = [0u8; 4];
        prefix32.copy_from_slice(&digest[..4]);
        prop_assert_eq!(v32, u32::from_be_bytes(prefix32));

        let mut prefix64 = [0u8; 8];
        prefix64.copy_from_slice(&digest[..8]);
        prop_assert_eq!(v64, u64::from_be_bytes(prefix64));
    }

    /// Distinct inputs keep distinct full-width digests (SHA-256 collisions
    /// inside a proptest run would be newsworthy)
    #[test]
    fn distinct_inputs_distinct_digests(a in ".*", b in ".*") {
        prop_assume!(a != b);
        let keyer = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Binary);
        prop_assert_ne!(keyer.hash(&a), keyer.hash(&b));
    }
}
