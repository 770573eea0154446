//! Gemeinsame Identifikationstypen fuer vouch
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Adressen, Fingerprints und Namen zur Compilezeit auszuschliessen.
//! Kanal- und Nicknamen koennen nur validiert konstruiert werden.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VouchError};

/// Netzwerk-Adresse eines Peers innerhalb der Transport-Gruppe
///
/// Logische Adresse (zufaellige Knoten-ID pro Prozess), analog zur
/// Adresse eines Gruppenmitglieds im Broadcast-Transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress(pub Uuid);

impl PeerAddress {
    /// Erstellt eine neue zufaellige Adresse
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Fingerprint eines oeffentlichen Schluessels (SHA-256 der komprimierten Form)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Kurzform fuer die Konsole (erste 8 Bytes, hex, mit Doppelpunkten)
    pub fn kurz(&self) -> String {
        self.0[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.kurz())
    }
}

/// Validierter Kanalname (`[A-Za-z0-9_ -]+`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let gueltig = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '));
        if gueltig {
            Ok(Self(name))
        } else {
            Err(VouchError::InvalidChannelName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelName {
    type Error = VouchError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<ChannelName> for String {
    fn from(value: ChannelName) -> Self {
        value.0
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validierter Nickname (`[A-Za-z0-9_]+`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nickname(String);

impl Nickname {
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let gueltig =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if gueltig {
            Ok(Self(name))
        } else {
            Err(VouchError::InvalidNickname(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Nickname {
    fn default() -> Self {
        Self("anonymous".to_string())
    }
}

impl TryFrom<String> for Nickname {
    type Error = VouchError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Nickname> for String {
    fn from(value: Nickname) -> Self {
        value.0
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
