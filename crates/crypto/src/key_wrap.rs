//! Wrapping des Kanal-Schluessels fuer einen einzelnen Empfaenger
//!
//! ECIES-aehnliches Schema zwischen zwei Langzeit-Identitaeten:
//! 1. ECDH (secp256k1) eigener privater Schluessel x fremder oeffentlicher Schluessel
//! 2. HKDF-SHA256 -> Wrapping Key (Salt = Passphrase)
//! 3. AES-256-GCM, Passphrase als Additional Authenticated Data
//!
//! Beide Seiten berechnen dasselbe Shared Secret, der Empfaenger braucht
//! daher nur den Absender-Schluessel aus der Key-Nachricht.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use k256::ecdh::diffie_hellman;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{Identity, PublicKey};
use crate::types::{SecretBytes, SYMMETRIC_KEY_LEN};

const WRAP_INFO: &[u8] = b"vouch-key-wrap-v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Erzeugt einen frischen Kanal-Schluessel
pub fn generate_symmetric_key() -> SecretBytes {
    let mut key_bytes = vec![0u8; SYMMETRIC_KEY_LEN];
    OsRng.fill_bytes(&mut key_bytes);
    SecretBytes::new(key_bytes)
}

fn wrapping_cipher(
    identity: &Identity,
    their_public: &PublicKey,
    passphrase: &str,
) -> CryptoResult<Aes256Gcm> {
    let shared = diffie_hellman(
        identity.signing_key().as_nonzero_scalar(),
        their_public.verifying_key().as_affine(),
    );
    let wrapping_key = SecretBytes::new(hkdf_derive(
        shared.raw_secret_bytes().as_slice(),
        passphrase.as_bytes(),
        WRAP_INFO,
        32,
    )?);
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(
        wrapping_key.as_bytes(),
    )))
}

/// Wickelt den Kanal-Schluessel fuer `their_public` ein
///
/// Output: `[nonce(12)] + [ciphertext + tag(16)]`
pub fn wrap_key(
    identity: &Identity,
    their_public: &PublicKey,
    passphrase: &str,
    plaintext_key: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = wrapping_cipher(identity, their_public, passphrase)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext_key,
                aad: passphrase.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Packt einen eingewickelten Kanal-Schluessel aus
///
/// Falsche Passphrase, falscher Absender oder manipulierte Bytes ergeben
/// `CryptoError::Entschluesselung`.
pub fn unwrap_key(
    identity: &Identity,
    their_public: &PublicKey,
    passphrase: &str,
    wrapped: &[u8],
) -> CryptoResult<SecretBytes> {
    if wrapped.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::UngueltigeDaten(
            "Zu kurzer wrapped key".to_string(),
        ));
    }
    let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_LEN);
    let cipher = wrapping_cipher(identity, their_public, passphrase)?;

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: passphrase.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))?;

    Ok(SecretBytes::new(plaintext))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
