//! Prozess-Identitaet (secp256k1) und KeyCodec
//!
//! Jeder Prozess erzeugt beim Start genau ein Schluessel-Paar. Der private
//! Schluessel verlaesst den Prozess nie; der oeffentliche Schluessel wird in
//! jeder signierten Nachricht in komprimierter SEC1-Form (33 Bytes) mitgesendet.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use vouch_core::Fingerprint;

use crate::error::{CryptoError, CryptoResult};

/// Laenge eines komprimierten oeffentlichen Schluessels
pub const PUBLIC_KEY_LEN: usize = 33;

/// Oeffentlicher Schluessel eines Peers
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Kanonische komprimierte Form (33 Bytes)
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Dekodiert einen komprimierten (oder unkomprimierten) SEC1-Punkt
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::UngueltigerPublicKey(e.to_string()))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        Self::from_bytes(&BASE64.decode(text)?)
    }

    /// SHA-256 ueber die komprimierte Form
    pub fn fingerprint(&self) -> Fingerprint {
        let digest = Sha256::digest(self.to_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Fingerprint(out)
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint().kurz())
    }
}

/// Langzeit-Identitaet des lokalen Knotens
pub struct Identity {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Identity {
    /// Generiert ein neues Schluessel-Paar
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = PublicKey(*signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Erstellt eine Identity aus dem privaten Skalar (32 Bytes big-endian)
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::UngueltigerPrivateKey(e.to_string()))?;
        let public_key = PublicKey(*signing_key.verifying_key());
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        Self::from_bytes(&BASE64.decode(text)?)
    }

    /// Gibt den privaten Skalar als Bytes zurueck
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    pub fn private_key_base64(&self) -> String {
        BASE64.encode(self.private_key_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity {{ public_key: {:?} }}", self.public_key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
