//! Umschlaege des Kanalprotokolls
//!
//! Fuenf Varianten, unveraenderlich nach dem Bau. Jede signierte Variante
//! deckt ihre Schluessel-Felder plus die Passphrase ab; die Passphrase wird
//! nie mit uebertragen.
//!
//! | Variante          | Signierte Nutzdaten                 |
//! |-------------------|-------------------------------------|
//! | `AuthRequest`     | pubkey ‖ passphrase                 |
//! | `AuthAcknowledge` | pubkey ‖ auth_pubkey ‖ passphrase   |
//! | `KeyExchange`     | pubkey ‖ passphrase                 |
//! | `Key`             | pubkey ‖ wrapped_key ‖ passphrase   |
//! | `EncryptedChat`   | (HMAC ueber den Chiffretext)        |
//!
//! JSON-Form: getaggtes Objekt (`"type"`), Byte-Felder Base64.

use serde::{Deserialize, Serialize};
use vouch_crypto::{
    hmac, hmac_verify, sign, signing_domain, stream_decrypt, stream_encrypt, verify, wrap_key,
    EcdsaSignature, Identity, Iv, MacTag, PublicKey,
};

use crate::error::{ProtocolError, ProtocolResult};
use crate::serde_b64;

/// Art eines Umschlags (fuer Logging und Dispatch-Tabellen)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    AuthRequest,
    AuthAcknowledge,
    KeyExchange,
    Key,
    EncryptedChat,
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AuthRequest => "auth_request",
            Self::AuthAcknowledge => "auth_acknowledge",
            Self::KeyExchange => "key_exchange",
            Self::Key => "key",
            Self::EncryptedChat => "encrypted_chat",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Zugangsanfrage eines neuen Peers
    AuthRequest {
        #[serde(with = "serde_b64::public_key")]
        pubkey: PublicKey,
        #[serde(with = "serde_b64::signature")]
        signature: EcdsaSignature,
    },
    /// Bestaetigung durch ein Mitglied; `auth_pubkey` ist der bestaetigte Peer
    AuthAcknowledge {
        #[serde(with = "serde_b64::public_key")]
        pubkey: PublicKey,
        #[serde(with = "serde_b64::public_key")]
        auth_pubkey: PublicKey,
        #[serde(with = "serde_b64::signature")]
        signature: EcdsaSignature,
    },
    /// Anforderung des Kanal-Schluessels
    KeyExchange {
        #[serde(with = "serde_b64::public_key")]
        pubkey: PublicKey,
        #[serde(with = "serde_b64::signature")]
        signature: EcdsaSignature,
    },
    /// Eingewickelter Kanal-Schluessel fuer genau einen Empfaenger
    Key {
        #[serde(with = "serde_b64::public_key")]
        pubkey: PublicKey,
        #[serde(with = "serde_b64::bytes")]
        wrapped_key: Vec<u8>,
        #[serde(with = "serde_b64::signature")]
        signature: EcdsaSignature,
    },
    /// Verschluesselte Chat-Zeile
    EncryptedChat {
        #[serde(with = "serde_b64::array")]
        iv: Iv,
        #[serde(with = "serde_b64::bytes")]
        ciphertext: Vec<u8>,
        #[serde(with = "serde_b64::array")]
        mac: MacTag,
    },
}

impl Envelope {
    // -----------------------------------------------------------------------
    // Konstruktoren
    // -----------------------------------------------------------------------

    pub fn auth_request(identity: &Identity, passphrase: &str) -> Self {
        let pubkey = identity.public_key();
        let signature = sign(identity, &signing_domain(&[&pubkey.to_bytes()], passphrase));
        Self::AuthRequest { pubkey, signature }
    }

    /// Bestaetigt `requester` gegenueber dem Kanal
    pub fn auth_acknowledge(identity: &Identity, requester: &PublicKey, passphrase: &str) -> Self {
        let pubkey = identity.public_key();
        let data = signing_domain(&[&pubkey.to_bytes(), &requester.to_bytes()], passphrase);
        Self::AuthAcknowledge {
            pubkey,
            auth_pubkey: *requester,
            signature: sign(identity, &data),
        }
    }

    pub fn key_exchange(identity: &Identity, passphrase: &str) -> Self {
        let pubkey = identity.public_key();
        let signature = sign(identity, &signing_domain(&[&pubkey.to_bytes()], passphrase));
        Self::KeyExchange { pubkey, signature }
    }

    /// Wickelt `symmetric_key` fuer `recipient` ein und signiert das Ergebnis
    pub fn key(
        identity: &Identity,
        recipient: &PublicKey,
        passphrase: &str,
        symmetric_key: &[u8],
    ) -> ProtocolResult<Self> {
        let pubkey = identity.public_key();
        let wrapped_key = wrap_key(identity, recipient, passphrase, symmetric_key)?;
        let data = signing_domain(&[&pubkey.to_bytes(), &wrapped_key], passphrase);
        Ok(Self::Key {
            pubkey,
            wrapped_key,
            signature: sign(identity, &data),
        })
    }

    /// Verschluesselt eine Chat-Zeile; der IV muss frisch sein
    pub fn encrypted_chat(
        symmetric_key: &[u8],
        iv: Iv,
        passphrase: &str,
        plaintext: &[u8],
    ) -> ProtocolResult<Self> {
        let ciphertext = stream_encrypt(symmetric_key, &iv, plaintext)?;
        let mac = hmac(passphrase, &ciphertext)?;
        Ok(Self::EncryptedChat {
            iv,
            ciphertext,
            mac,
        })
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::AuthRequest { .. } => EnvelopeKind::AuthRequest,
            Self::AuthAcknowledge { .. } => EnvelopeKind::AuthAcknowledge,
            Self::KeyExchange { .. } => EnvelopeKind::KeyExchange,
            Self::Key { .. } => EnvelopeKind::Key,
            Self::EncryptedChat { .. } => EnvelopeKind::EncryptedChat,
        }
    }

    /// Oeffentlicher Schluessel des Unterzeichners (None fuer Chat)
    pub fn signer(&self) -> Option<&PublicKey> {
        match self {
            Self::AuthRequest { pubkey, .. }
            | Self::AuthAcknowledge { pubkey, .. }
            | Self::KeyExchange { pubkey, .. }
            | Self::Key { pubkey, .. } => Some(pubkey),
            Self::EncryptedChat { .. } => None,
        }
    }

    /// Kanonische signierte Nutzdaten inklusive Passphrase
    pub fn signed_payload(&self, passphrase: &str) -> Option<Vec<u8>> {
        let data = match self {
            Self::AuthRequest { pubkey, .. } | Self::KeyExchange { pubkey, .. } => {
                signing_domain(&[&pubkey.to_bytes()], passphrase)
            }
            Self::AuthAcknowledge {
                pubkey,
                auth_pubkey,
                ..
            } => signing_domain(&[&pubkey.to_bytes(), &auth_pubkey.to_bytes()], passphrase),
            Self::Key {
                pubkey,
                wrapped_key,
                ..
            } => signing_domain(&[&pubkey.to_bytes(), wrapped_key], passphrase),
            Self::EncryptedChat { .. } => return None,
        };
        Some(data)
    }

    /// Prueft die Signatur gegen den mitgesendeten Schluessel
    pub fn verify_signature(&self, passphrase: &str) -> ProtocolResult<bool> {
        let (pubkey, signature) = match self {
            Self::AuthRequest {
                pubkey, signature, ..
            }
            | Self::AuthAcknowledge {
                pubkey, signature, ..
            }
            | Self::KeyExchange {
                pubkey, signature, ..
            }
            | Self::Key {
                pubkey, signature, ..
            } => (pubkey, signature),
            Self::EncryptedChat { .. } => return Err(ProtocolError::NichtSigniert),
        };
        let data = self
            .signed_payload(passphrase)
            .ok_or(ProtocolError::NichtSigniert)?;
        Ok(verify(pubkey, &data, signature))
    }

    /// Prueft HMAC und entschluesselt eine Chat-Zeile
    ///
    /// Die HMAC-Pruefung laeuft vor der Entschluesselung; ein Mismatch ergibt
    /// `CryptoError::IntegrityFailure`.
    pub fn open_chat(&self, symmetric_key: &[u8], passphrase: &str) -> ProtocolResult<Vec<u8>> {
        let Self::EncryptedChat {
            iv,
            ciphertext,
            mac,
        } = self
        else {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "{} ist keine Chat-Nachricht",
                self.kind()
            )));
        };
        hmac_verify(passphrase, mac, ciphertext)?;
        Ok(stream_decrypt(symmetric_key, iv, ciphertext)?)
    }

    // -----------------------------------------------------------------------
    // Kodierung
    // -----------------------------------------------------------------------

    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Dekodiert rohe Bytes; jede Abweichung ergibt `MalformedEnvelope`
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
