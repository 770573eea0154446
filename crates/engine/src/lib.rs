//! vouch-engine – Protokoll-Engine des Kanalprotokolls
//!
//! Dieser Crate implementiert den Zustandsautomaten, der Mitgliedschaft in
//! einem passphrase-geschuetzten Gruppenkanal vergibt: Authentifizierungs-
//! Handshake, Schluessel-Verteilung und verschluesselter Chat.
//!
//! ## Architektur
//!
//! ```text
//! Transport (MemoryTransport / UdpGroupTransport)
//!     |
//!     v  Delivery-Queue (FIFO)
//! ProtocolEngine::run
//!     |
//!     +-- handlers::auth_request      (Bediener-Entscheidung ueber InteractionGate)
//!     +-- handlers::auth_acknowledge
//!     +-- handlers::key_exchange
//!     +-- handlers::key
//!     +-- handlers::chat
//!
//! TrustStore     – Vertraute Mitglieder und gesperrte Adressen
//! ChannelSecret  – Passphrase und Kanal-Schluessel
//! ```

pub mod engine;
pub mod error;
pub mod gate;
pub mod handlers;
mod intents;
pub mod secret;
pub mod state;
pub mod transport;
pub mod trust;

// Bequeme Re-Exporte
pub use engine::{EngineConfig, EngineSnapshot, ProtocolEngine};
pub use error::{EngineError, EngineResult};
pub use gate::InteractionGate;
pub use handlers::auth_request::{FRAGE_ENTSCHEIDUNG, FRAGE_SPERREN, FRAGE_VERTRAUEN};
pub use secret::ChannelSecret;
pub use state::ProtocolState;
pub use transport::{
    Delivery, MemoryHub, MemoryTransport, Transport, TransportError, TransportResult,
    DELIVERY_QUEUE_GROESSE,
};
pub use trust::TrustStore;
