/*
[INPUT]:  Message bytes and API secret key
[OUTPUT]: HMAC-SHA256 digests (raw or lowercase hex)
[POS]:    Auth layer - cryptographic signing for request authentication
[UPDATE]: When changing signing algorithm or digest encoding
*/

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::http::{Result, XeggexError};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer keyed with the API secret
#[derive(Clone)]
pub struct HmacSigner {
    mac: HmacSha256,
}

impl HmacSigner {
    /// Create a signer from the secret key
    pub fn new(secret_key: &str) -> Result<Self> {
        if secret_key.trim().is_empty() {
            return Err(XeggexError::Signing("secret key is empty".to_string()));
        }

        let mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|err| XeggexError::Signing(err.to_string()))?;
        Ok(Self { mac })
    }

    /// Sign a message and return the raw digest
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign a message and return the lowercase hex digest
    pub fn sign_hex(&self, message: &str) -> String {
        hex::encode(self.sign(message.as_bytes()))
    }

    /// Verify a hex digest against a message
    pub fn verify_hex(&self, message: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}
