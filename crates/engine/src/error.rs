//! Fehlertypen fuer die Protokoll-Engine
//!
//! Kein Fehler ist fatal: die Engine verwirft den betroffenen Umschlag bzw.
//! lehnt den Befehl ab und bedient danach weitere Nachrichten und Befehle.

use thiserror::Error;
use vouch_core::{Fingerprint, HandshakeStufe, VouchError};
use vouch_crypto::CryptoError;
use vouch_protocol::{EnvelopeKind, ProtocolError};

use crate::transport::TransportError;

/// Fehlertyp der Protokoll-Engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Umschlag konnte nicht dekodiert werden
    #[error("Fehlerhafter Umschlag: {0}")]
    MalformedEnvelope(String),

    /// Signatur passt nicht zu Schluessel und Passphrase
    #[error("Ungueltige Signatur ({0})")]
    InvalidSignature(EnvelopeKind),

    /// Absender steht nicht in der Vertrauensliste
    #[error("Absender nicht vertrauenswuerdig ({})", .0.kurz())]
    UntrustedSender(Fingerprint),

    /// HMAC-Pruefung oder Schluessel-Entpackung fehlgeschlagen
    #[error("Integritaetspruefung fehlgeschlagen")]
    IntegrityFailure,

    /// Umschlag passt nicht zum aktuellen Protokoll-Zustand
    #[error("Umschlag im falschen Zustand verworfen ({0})")]
    StaleOrOutOfOrderEnvelope(EnvelopeKind),

    /// Keine Antwort innerhalb der Frist
    #[error("Keine Antwort ({0})")]
    HandshakeTimeout(HandshakeStufe),

    #[error("Ungueltiger Kanalname: {0}")]
    InvalidChannelName(String),

    #[error("Ungueltiger Nickname: {0}")]
    InvalidNickname(String),

    /// Befehl im aktuellen Zustand nicht erlaubt
    #[error("{0}")]
    UngueltigerZustand(String),

    #[error("Transport-Fehler: {0}")]
    Transport(#[from] TransportError),

    #[error("Kryptografie-Fehler: {0}")]
    Krypto(CryptoError),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl EngineError {
    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::UngueltigerZustand(msg.into())
    }

    /// Lokale Eingabefehler, die dem Bediener direkt angezeigt werden
    pub fn ist_eingabefehler(&self) -> bool {
        matches!(
            self,
            Self::InvalidChannelName(_) | Self::InvalidNickname(_) | Self::UngueltigerZustand(_)
        )
    }
}

impl From<VouchError> for EngineError {
    fn from(e: VouchError) -> Self {
        match e {
            VouchError::InvalidChannelName(name) => Self::InvalidChannelName(name),
            VouchError::InvalidNickname(name) => Self::InvalidNickname(name),
            other => Self::Intern(other.to_string()),
        }
    }
}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::IntegrityFailure | CryptoError::Entschluesselung(_) => {
                Self::IntegrityFailure
            }
            other => Self::Krypto(other),
        }
    }
}

impl From<ProtocolError> for EngineError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::MalformedEnvelope(msg) => Self::MalformedEnvelope(msg),
            ProtocolError::NichtSigniert => {
                Self::MalformedEnvelope("Umschlag ist nicht signiert".to_string())
            }
            ProtocolError::Krypto(inner) => inner.into(),
        }
    }
}

/// Result-Typ der Protokoll-Engine
pub type EngineResult<T> = Result<T, EngineError>;
