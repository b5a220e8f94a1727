//! `vwgen genkey`, `vwgen genpsk`, `vwgen pubkey`

use super::Status;
use anyhow::Result;
use rand::rngs::OsRng;
use std::io::{Read, Write};
use vwgen_crypto::{
    derive_public_key, encode_key, generate_preshared_key, generate_private_key, parse_key,
    KeyError,
};

/// Print a fresh clamped private key
pub fn genkey<W: Write>(out: &mut W) -> Result<Status> {
    writeln!(out, "{}", encode_key(&generate_private_key(&mut OsRng)))?;
    Ok(Status::OK)
}

/// Print a fresh preshared key
pub fn genpsk<W: Write>(out: &mut W) -> Result<Status> {
    writeln!(out, "{}", encode_key(&generate_preshared_key(&mut OsRng)))?;
    Ok(Status::OK)
}

/// Public key for a base64 private key
pub fn pubkey_of(text: &str) -> Result<String, KeyError> {
    let secret = parse_key(text)?;
    Ok(encode_key(&derive_public_key(&secret)?))
}

/// Read a private key from `input` and print its public key
pub fn pubkey<I: Read, W: Write>(input: &mut I, out: &mut W) -> Result<Status> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    match pubkey_of(&text) {
        Ok(public) => {
            writeln!(out, "{}", public)?;
            Ok(Status::OK)
        }
        Err(e) => {
            eprintln!("vwgen: Key is not the correct length or format: {}", e);
            Ok(Status::EINVAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genkey_is_clamped() {
        let mut out = Vec::new();
        assert!(genkey(&mut out).unwrap().is_ok());
        let text = String::from_utf8(out).unwrap();
        let key = parse_key(&text).unwrap();
        assert_eq!(key[0] & 0x07, 0);
        assert_eq!(key[31] & 0xc0, 0x40);
    }

    #[test]
    fn test_genpsk_prints_32_bytes() {
        let mut out = Vec::new();
        genpsk(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert!(parse_key(&text).is_ok());
    }

    #[test]
    fn test_pubkey() {
        let mut input = "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=\n".as_bytes();
        let mut out = Vec::new();
        assert!(pubkey(&mut input, &mut out).unwrap().is_ok());
        assert_eq!(out, b"hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=\n");
    }

    #[test]
    fn test_pubkey_rejects_bad_input() {
        let mut out = Vec::new();
        let status = pubkey(&mut "AAAA".as_bytes(), &mut out).unwrap();
        assert_eq!(status, Status::EINVAL);
        assert!(out.is_empty());
        assert!(pubkey_of("not base64!").is_err());
    }
}
