//! Fehlertypen fuer vouch
//!
//! Zentraler Fehler-Enum fuer lokale Eingabefehler.
//! Die Protokoll- und Krypto-Crates definieren eigene Fehler und
//! konvertieren bei Bedarf via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer vouch
pub type Result<T> = std::result::Result<T, VouchError>;

/// Fehler die vor jedem Netzwerk-Effekt erkannt werden
#[derive(Debug, Error)]
pub enum VouchError {
    // --- Eingabe-Validierung ---
    #[error("Ungueltiger Kanalname: '{0}' (erlaubt: A-Z a-z 0-9 _ - Leerzeichen)")]
    InvalidChannelName(String),

    #[error("Ungueltiger Nickname: '{0}' (erlaubt: A-Z a-z 0-9 _)")]
    InvalidNickname(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl VouchError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn es sich um einen lokalen Eingabefehler handelt
    pub fn ist_eingabefehler(&self) -> bool {
        matches!(self, Self::InvalidChannelName(_) | Self::InvalidNickname(_))
    }
}
