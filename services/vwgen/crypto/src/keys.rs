//! Key generation, public key derivation and base64 encoding.

use crate::error::KeyError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};

/// Length of private, public and preshared keys in bytes
pub const KEY_LEN: usize = 32;

/// Generate a random preshared key.
pub fn generate_preshared_key<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rng.fill_bytes(&mut key);
    key
}

/// Generate a random private key, clamped to a valid Curve25519 scalar.
pub fn generate_private_key<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> [u8; KEY_LEN] {
    let mut secret = generate_preshared_key(rng);
    clamp(&mut secret);
    secret
}

fn clamp(secret: &mut [u8; KEY_LEN]) {
    secret[0] &= 0xf8;
    secret[KEY_LEN - 1] &= 0x7f;
    secret[KEY_LEN - 1] |= 0x40;
}

/// Derive the public key for `secret` by base-point scalar multiplication.
pub fn derive_public_key(secret: &[u8]) -> Result<[u8; KEY_LEN], KeyError> {
    let bytes: [u8; KEY_LEN] = secret
        .try_into()
        .map_err(|_| KeyError::InvalidLength(secret.len()))?;
    let secret = StaticSecret::from(bytes);
    Ok(PublicKey::from(&secret).to_bytes())
}

/// Encode a key as standard padded base64.
pub fn encode_key(key: &[u8; KEY_LEN]) -> String {
    STANDARD.encode(key)
}

/// Decode a base64 key, rejecting anything that is not exactly 32 bytes.
pub fn parse_key(text: &str) -> Result<[u8; KEY_LEN], KeyError> {
    let raw = STANDARD
        .decode(text.trim())
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    let len = raw.len();
    raw.try_into().map_err(|_| KeyError::InvalidLength(len))
}

/// Decode a base64 key, treating malformed input as absent.
pub fn decode_key(text: &str) -> Option<[u8; KEY_LEN]> {
    parse_key(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // RFC 7748 section 6.1, Alice
    const ALICE_SECRET: &str = "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a";
    const ALICE_PUBLIC: &str = "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_private_key_is_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let key = generate_private_key(&mut rng);
            assert_eq!(key[0] & 0x07, 0);
            assert_eq!(key[31] & 0x80, 0);
            assert_eq!(key[31] & 0x40, 0x40);
        }
    }

    #[test]
    fn test_preshared_keys_differ() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = generate_preshared_key(&mut rng);
        let b = generate_preshared_key(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_public_key_rfc7748_vector() {
        let public = derive_public_key(&hex(ALICE_SECRET)).unwrap();
        assert_eq!(public.to_vec(), hex(ALICE_PUBLIC));
    }

    #[test]
    fn test_public_key_of_zero_key_is_stable() {
        let secret = decode_key("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=").unwrap();
        let first = derive_public_key(&secret).unwrap();
        let second = derive_public_key(&secret).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            encode_key(&first),
            "L+V9o0fNYkMVKNqsX7spBzD/9oSvxM/C7ZCZX1jLO3Q="
        );
    }

    #[test]
    fn test_public_key_rejects_wrong_length() {
        assert_eq!(
            derive_public_key(&[0u8; 31]),
            Err(KeyError::InvalidLength(31))
        );
    }

    #[test]
    fn test_decode_key() {
        assert!(decode_key("dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=").is_some());
        // 16 bytes
        assert!(decode_key("AAAAAAAAAAAAAAAAAAAAAA==").is_none());
        assert!(decode_key("not base64!").is_none());
        assert!(decode_key("").is_none());
        assert!(matches!(
            parse_key("AAAAAAAAAAAAAAAAAAAAAA=="),
            Err(KeyError::InvalidLength(16))
        ));
    }

    #[test]
    fn test_encode_decode_key() {
        let key = hex(ALICE_SECRET);
        let key: [u8; KEY_LEN] = key.try_into().unwrap();
        let text = encode_key(&key);
        assert_eq!(text, "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=");
        assert_eq!(decode_key(&text), Some(key));
    }
}
