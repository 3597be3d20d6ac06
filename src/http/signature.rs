use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verifies an HMAC-SHA256 webhook signature in constant time (spec.md S6
/// `dg-signature` / subscription webhook contract), grounded on the same
/// construction as the platform's API key hashing.
pub fn verify_hmac_signature(secret: &str, body: &[u8], hex_signature: &str) -> bool {
    let Ok(expected_bytes) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&expected_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_matching_signature() {
        let signature = sign("secret", b"payload");
        assert!(verify_hmac_signature("secret", b"payload", &signature));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let signature = sign("secret", b"payload");
        assert!(!verify_hmac_signature("secret", b"different", &signature));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(!verify_hmac_signature("secret", b"payload", "not-hex"));
    }
}
