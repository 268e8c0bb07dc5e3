//! Ed25519 webhook signatures
//!
//! The signing key is derived from the bot secret: the secret is repeated
//! until it covers 32 bytes and the first 32 bytes are used as the seed.
//! Callback validation signs `event_ts + plain_token`; event delivery is
//! verified against `timestamp + body`.

use ring::signature::{self, Ed25519KeyPair, KeyPair, UnparsedPublicKey};

use crate::error::{Error, Result};

const SEED_LEN: usize = 32;

/// Signs and verifies webhook payloads for one bot
pub struct WebhookSigner {
    key_pair: Ed25519KeyPair,
}

impl std::fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSigner")
            .field("public_key", &hex::encode(self.key_pair.public_key().as_ref()))
            .finish()
    }
}

/// Derive the 32-byte Ed25519 seed from a bot secret
pub fn derive_seed(secret: &str) -> Result<[u8; SEED_LEN]> {
    if secret.is_empty() {
        return Err(Error::Signature("bot secret is empty".to_string()));
    }

    let mut seed = [0u8; SEED_LEN];
    for (slot, byte) in seed.iter_mut().zip(secret.bytes().cycle()) {
        *slot = byte;
    }
    Ok(seed)
}

impl WebhookSigner {
    /// Create a signer from the bot secret
    pub fn new(secret: &str) -> Result<Self> {
        let seed = derive_seed(secret)?;
        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed)
            .map_err(|e| Error::Signature(format!("invalid signing seed: {}", e)))?;
        Ok(WebhookSigner { key_pair })
    }

    /// Hex signature of `message`
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.key_pair.sign(message).as_ref())
    }

    /// Answer for a callback URL validation request
    pub fn sign_validation(&self, event_ts: &str, plain_token: &str) -> String {
        self.sign(format!("{}{}", event_ts, plain_token).as_bytes())
    }

    /// Check a hex signature over `timestamp + body`
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<()> {
        let signature = hex::decode(signature_hex.trim())
            .map_err(|e| Error::Signature(format!("signature is not hex: {}", e)))?;
        if signature.len() != 64 {
            return Err(Error::Signature(format!(
                "signature has {} bytes, expected 64",
                signature.len()
            )));
        }

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&signature::ED25519, self.key_pair.public_key().as_ref())
            .verify(&message, &signature)
            .map_err(|_| Error::Signature("signature mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_repeats_secret() {
        let seed = derive_seed("abc").unwrap();
        assert_eq!(&seed[..6], b"abcabc");
        assert_eq!(seed[31], b'b');

        let long = "x".repeat(40);
        assert_eq!(derive_seed(&long).unwrap(), [b'x'; 32]);
        assert!(derive_seed("").is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let signer = WebhookSigner::new("DG5g3B4j9X2KOErG").unwrap();
        let body = br#"{"op":0,"t":"GROUP_AT_MESSAGE_CREATE"}"#;
        let signature = signer.sign(&[b"1725442341".as_slice(), body.as_slice()].concat());

        assert_eq!(signature.len(), 128);
        assert!(signer.verify("1725442341", body, &signature).is_ok());
        assert!(signer.verify("1725442342", body, &signature).is_err());
    }

    #[test]
    fn test_validation_signature_is_deterministic() {
        let signer = WebhookSigner::new("secret").unwrap();
        let first = signer.sign_validation("1725442341", "plain");
        assert_eq!(first, signer.sign_validation("1725442341", "plain"));
        assert_eq!(first, signer.sign(b"1725442341plain"));
    }

    #[test]
    fn test_other_secret_rejected() {
        let signer = WebhookSigner::new("secret-a").unwrap();
        let other = WebhookSigner::new("secret-b").unwrap();
        let signature = other.sign(b"1body");
        assert!(matches!(
            signer.verify("1", b"body", &signature),
            Err(Error::Signature(_))
        ));
        assert!(signer.verify("1", b"body", "zz").is_err());
    }
}
