//! Key encoding and random id draws

use uuid7::uuid7;

const POLICYHOLDER: u8 = b'h';
const EMAIL: u8 = b'e';
const POLICY: u8 = b'p';
const CLAIM: u8 = b'c';

const ID_MASK: u32 = (1 << 31) - 1;

/// Draw a 31-bit candidate policyholder id from the random tail of a uuid7.
pub fn draw_policyholder_id() -> u32 {
    let bits = u128::from_be_bytes(*uuid7().as_bytes());
    (bits as u32) & ID_MASK
}

// Ids are big-endian so key order is numeric order within a prefix.

pub fn policyholder_key(policyholder_id: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(POLICYHOLDER);
    key.extend_from_slice(&policyholder_id.to_be_bytes());
    key
}

pub fn email_key(email: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + email.len());
    key.push(EMAIL);
    key.extend_from_slice(email.as_bytes());
    key
}

/// Prefix covering every policy of one policyholder.
pub fn policy_prefix(policyholder_id: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(POLICY);
    key.extend_from_slice(&policyholder_id.to_be_bytes());
    key
}

pub fn policy_key(policyholder_id: u32, policy_id: u32) -> Vec<u8> {
    let mut key = policy_prefix(policyholder_id);
    key.extend_from_slice(&policy_id.to_be_bytes());
    key
}

/// Prefix covering every claim of one policyholder, across policies.
pub fn holder_claims_prefix(policyholder_id: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(CLAIM);
    key.extend_from_slice(&policyholder_id.to_be_bytes());
    key
}

/// Prefix covering every claim of one policy.
pub fn claim_prefix(policyholder_id: u32, policy_id: u32) -> Vec<u8> {
    let mut key = holder_claims_prefix(policyholder_id);
    key.extend_from_slice(&policy_id.to_be_bytes());
    key
}

pub fn claim_key(policyholder_id: u32, policy_id: u32, claim_id: u32) -> Vec<u8> {
    let mut key = claim_prefix(policyholder_id, policy_id);
    key.extend_from_slice(&claim_id.to_be_bytes());
    key
}

/// The id in the last four bytes of a key, if the key is long enough.
pub fn trailing_id(key: &[u8]) -> Option<u32> {
    let start = key.len().checked_sub(4)?;
    let bytes: [u8; 4] = key[start..].try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

pub fn encode_id(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_stay_in_31_bits() {
        for _ in 0..1_000 {
            assert!(draw_policyholder_id() <= ID_MASK);
        }
    }

    #[test]
    fn claim_keys_sort_numerically_within_a_policy() {
        let low = claim_key(9, 1, 2);
        let high = claim_key(9, 1, 256);
        assert!(low < high);
        assert!(high.starts_with(&claim_prefix(9, 1)));
        assert_eq!(trailing_id(&high), Some(256));
    }

    #[test]
    fn policy_prefix_does_not_cover_neighbouring_holder() {
        // holder 1's prefix must not match holder 256's keys
        let key = policy_key(256, 1);
        assert!(!key.starts_with(&policy_prefix(1)));
    }

    #[test]
    fn owner_prefixes_are_tag_plus_id() {
        assert_eq!(policy_prefix(7), vec![b'p', 0, 0, 0, 7]);
        assert_eq!(holder_claims_prefix(7), vec![b'c', 0, 0, 0, 7]);
        assert_eq!(claim_key(7, 1, 2).len(), 13);
    }

    #[test]
    fn trailing_id_rejects_short_keys() {
        assert_eq!(trailing_id(&[1, 2, 3]), None);
    }
}
