//! HMAC-SHA256 entry signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use chainseal_contracts::key::SigningKey;

type HmacSha256 = Hmac<Sha256>;

/// Sign the link `entry_hash:previous_hash` with `key`.
///
/// Returns the MAC as lowercase hex.
///
/// # Panics
///
/// Never in practice: HMAC key setup only fails for fixed-length MACs.
pub fn sign(entry_hash: &str, previous_hash: &str, key: &SigningKey) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(entry_hash.as_bytes());
    mac.update(b":");
    mac.update(previous_hash.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compare two signatures in constant time.
///
/// Length differences are not secret (signatures are fixed-width hex), so
/// they short-circuit to `false`.
pub fn verify_signature(candidate: &str, expected: &str) -> bool {
    let candidate = candidate.as_bytes();
    let expected = expected.as_bytes();
    if candidate.len() != expected.len() {
        return false;
    }
    bool::from(candidate.ct_eq(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: char) -> SigningKey {
        SigningKey::new(fill.to_string().repeat(32)).unwrap()
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let a = sign("aa", "bb", &key('k'));
        let b = sign("aa", "bb", &key('k'));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_binds_key_hash_and_link() {
        let base = sign("aa", "bb", &key('k'));
        assert_ne!(base, sign("aa", "bb", &key('j')));
        assert_ne!(base, sign("ab", "bb", &key('k')));
        assert_ne!(base, sign("aa", "bc", &key('k')));
    }

    #[test]
    fn signature_matches_mac_over_colon_joined_input() {
        let k = key('k');
        let mut mac = HmacSha256::new_from_slice(k.as_bytes()).unwrap();
        mac.update(b"aa:bb");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(sign("aa", "bb", &k), expected);
    }

    #[test]
    fn verify_signature_compares_exactly() {
        let sig = sign("aa", "bb", &key('k'));
        assert!(verify_signature(&sig, &sig.clone()));

        let mut flipped = sig.clone().into_bytes();
        flipped[63] = if flipped[63] == b'0' { b'1' } else { b'0' };
        assert!(!verify_signature(&String::from_utf8(flipped).unwrap(), &sig));
        assert!(!verify_signature(&sig[..63], &sig));
        assert!(!verify_signature("", &sig));
    }
}
