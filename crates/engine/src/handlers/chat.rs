//! EncryptedChat – verschluesselte Chat-Zeile
//!
//! Manipulierte Nachrichten werden still verworfen: die Konsole sieht nichts.

use vouch_protocol::{Envelope, EnvelopeKind};

use crate::engine::ProtocolEngine;
use crate::error::{EngineError, EngineResult};

pub(crate) fn verarbeiten(engine: &ProtocolEngine, envelope: &Envelope) -> EngineResult<()> {
    let secret = engine
        .mit_kontext(|c| {
            if c.state.authenticated && c.state.key_received {
                c.secret.clone()
            } else {
                None
            }
        })
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(
            EnvelopeKind::EncryptedChat,
        ))?;
    let schluessel = secret
        .symmetric_key()
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(
            EnvelopeKind::EncryptedChat,
        ))?;

    let klartext = envelope.open_chat(schluessel.as_bytes(), secret.passphrase())?;
    engine.chat_zeile(String::from_utf8_lossy(&klartext).into_owned());
    Ok(())
}
