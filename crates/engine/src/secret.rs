//! Kanal-Geheimnis: Passphrase und symmetrischer Kanal-Schluessel

use vouch_crypto::{SecretBytes, SYMMETRIC_KEY_LEN};

use crate::error::{EngineError, EngineResult};

/// Gehoert der Engine; wird beim Verlassen des Kanals verworfen
#[derive(Clone)]
pub struct ChannelSecret {
    passphrase: SecretBytes,
    symmetric_key: Option<SecretBytes>,
}

impl ChannelSecret {
    /// Beitretender Knoten: Passphrase bekannt, Schluessel noch nicht
    pub fn new(passphrase: &str) -> Self {
        Self {
            passphrase: SecretBytes::new(passphrase.as_bytes().to_vec()),
            symmetric_key: None,
        }
    }

    /// Kanal-Ersteller: Passphrase und frischer Schluessel
    pub fn with_key(passphrase: &str, symmetric_key: SecretBytes) -> Self {
        Self {
            passphrase: SecretBytes::new(passphrase.as_bytes().to_vec()),
            symmetric_key: Some(symmetric_key),
        }
    }

    pub fn passphrase(&self) -> &str {
        // Wurde aus einem &str gebaut, ist also gueltiges UTF-8
        std::str::from_utf8(self.passphrase.as_bytes()).unwrap_or_default()
    }

    pub fn symmetric_key(&self) -> Option<&SecretBytes> {
        self.symmetric_key.as_ref()
    }

    /// Uebernimmt den per Key-Nachricht empfangenen Schluessel
    pub fn install_key(&mut self, symmetric_key: SecretBytes) -> EngineResult<()> {
        if symmetric_key.len() != SYMMETRIC_KEY_LEN {
            return Err(EngineError::IntegrityFailure);
        }
        self.symmetric_key = Some(symmetric_key);
        Ok(())
    }
}

impl std::fmt::Debug for ChannelSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSecret")
            .field("passphrase", &"[REDACTED]")
            .field("symmetric_key", &self.symmetric_key)
            .finish()
    }
}
