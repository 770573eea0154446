//! vouch-protocol – Nachrichten des Kanalprotokolls
//!
//! Dieses Crate definiert die fuenf Umschlag-Varianten, die zwischen Peers
//! ausgetauscht werden, ihre signierten Nutzdaten und das Frame-Format, mit
//! dem Umschlaege ueber eine Gruppen-Transportschicht reisen.

pub mod envelope;
pub mod error;
mod serde_b64;
pub mod wire;

pub use envelope::{Envelope, EnvelopeKind};
pub use error::{ProtocolError, ProtocolResult};
pub use wire::{GroupFrame, GroupFrameCodec, PROTOCOL_VERSION};
