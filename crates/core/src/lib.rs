//! vouch-core – Gemeinsame Typen, Validierung und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! vouch-Crates gemeinsam genutzt werden: Peer-Adressen, Fingerprints,
//! validierte Kanal- und Nicknamen sowie die Konsolen-Ereignisse.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, VouchError};
pub use event::{ConsoleEvent, HandshakeStufe, StatusMeldung};
pub use types::{ChannelName, Fingerprint, Nickname, PeerAddress};
