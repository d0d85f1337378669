//! Signing key fixtures for testing
//!
//! Ed25519 keypairs are deterministic based on a seed value. RSA keys are
//! generated once per process per slot and cached, since 2048-bit generation
//! is slow.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;

/// Number of distinct cached RSA keys available to tests.
pub const RSA_KEY_SLOTS: usize = 2;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// A signing key together with the JWK that publishes its public half.
pub struct TestKeypair {
    kid: String,
    alg: Algorithm,
    encoding_key: EncodingKey,
    jwk: serde_json::Value,
}

impl TestKeypair {
    /// Deterministic Ed25519 keypair; the same seed always yields the same key.
    ///
    /// # Arguments
    /// * `seed` - Seed value for deterministic key generation (0-255)
    /// * `kid` - Key ID published in the JWK and token header
    pub fn ed25519(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let seed_bytes = seed_bytes(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes).map_err(|e| {
            FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e))
        })?;
        let public_key = URL_SAFE_NO_PAD.encode(key_pair.public_key().as_ref());

        let encoding_key = EncodingKey::from_ed_der(&build_pkcs8_from_seed(&seed_bytes));

        Ok(Self {
            kid: kid.to_string(),
            alg: Algorithm::EdDSA,
            encoding_key,
            jwk: json!({
                "kty": "OKP",
                "use": "sig",
                "kid": kid,
                "alg": "EdDSA",
                "crv": "Ed25519",
                "x": public_key,
            }),
        })
    }

    /// RS256 keypair from cache slot `slot` (0..RSA_KEY_SLOTS).
    pub fn rsa(slot: usize, kid: &str) -> Result<Self, FixtureError> {
        Self::rsa_with_alg(slot, kid, Algorithm::RS256)
    }

    /// RSA keypair signing with `alg` (RS256, RS384 or RS512).
    ///
    /// The JWK omits `alg`, as identity providers commonly do.
    pub fn rsa_with_alg(slot: usize, kid: &str, alg: Algorithm) -> Result<Self, FixtureError> {
        let private_key = cached_rsa_key(slot)?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| FixtureError::Crypto(format!("Failed to encode RSA key: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| FixtureError::Crypto(format!("Failed to load RSA key: {}", e)))?;

        Ok(Self {
            kid: kid.to_string(),
            alg,
            encoding_key,
            jwk: json!({
                "kty": "RSA",
                "use": "sig",
                "kid": kid,
                "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            }),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn alg(&self) -> Algorithm {
        self.alg
    }

    /// Public JWK for a JWKS document.
    pub fn jwk(&self) -> serde_json::Value {
        self.jwk.clone()
    }

    /// Sign `claims` with this key, setting `kid` and `alg` in the header.
    pub fn sign(&self, claims: &serde_json::Value) -> Result<String, FixtureError> {
        let mut header = Header::new(self.alg);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| FixtureError::Signing(e.to_string()))
    }

    /// Sign `claims` with this key but announce `kid` in the header.
    ///
    /// Produces tokens whose signature does not match the published key.
    pub fn sign_as(&self, kid: &str, claims: &serde_json::Value) -> Result<String, FixtureError> {
        let mut header = Header::new(self.alg);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| FixtureError::Signing(e.to_string()))
    }
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

fn cached_rsa_key(slot: usize) -> Result<&'static RsaPrivateKey, FixtureError> {
    static KEYS: [OnceLock<RsaPrivateKey>; RSA_KEY_SLOTS] = [OnceLock::new(), OnceLock::new()];

    let cell = KEYS
        .get(slot)
        .ok_or_else(|| FixtureError::Crypto(format!("No RSA key slot {}", slot)))?;

    Ok(cell.get_or_init(|| {
        RsaPrivateKey::new(&mut OsRng, 2048).expect("RSA test key generation should succeed")
    }))
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Ring does not expose PKCS#8 export for seed-derived keys, so the DER is
/// assembled by hand (RFC 5208 / RFC 8410).
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
