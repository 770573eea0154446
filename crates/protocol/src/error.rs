//! Fehlertypen fuer Umschlaege und Frames

use thiserror::Error;
use vouch_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Fehlerhafter Umschlag: {0}")]
    MalformedEnvelope(String),

    #[error("Umschlag ist nicht signiert")]
    NichtSigniert,

    #[error("Kryptografie-Fehler: {0}")]
    Krypto(#[from] CryptoError),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedEnvelope(e.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
