//! Protokoll-Zustand eines Knotens
//!
//! Sechs unabhaengige Flags, die ausschliesslich von der Engine umgeschaltet
//! werden. Invarianten: `key_received => authenticated` und
//! `ack_pending => authenticated`.

/// Flags des Handshake-Automaten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolState {
    /// AuthRequest gesendet, warte auf AuthAcknowledge
    pub requesting_auth: bool,
    /// Von einem Mitglied bestaetigt (oder Kanal selbst erstellt)
    pub authenticated: bool,
    /// AuthAcknowledge gesendet, warte auf KeyExchange des neuen Mitglieds
    pub ack_pending: bool,
    /// KeyExchange gesendet, warte auf Key
    pub key_exchange_requested: bool,
    /// Kanal-Schluessel liegt vor
    pub key_received: bool,
    /// Netzwerk-Kontext wartet auf eine Entscheidung des Bedieners
    pub awaiting_human_decision: bool,
}

impl ProtocolState {
    /// Zustand des Kanal-Erstellers: sofort Mitglied mit Schluessel
    pub fn ersteller() -> Self {
        Self {
            authenticated: true,
            key_received: true,
            ..Self::default()
        }
    }

    pub fn invarianten_ok(&self) -> bool {
        (!self.key_received || self.authenticated) && (!self.ack_pending || self.authenticated)
    }
}
