//! KeyExchange – ein frisch bestaetigtes Mitglied fordert den Kanal-Schluessel an

use vouch_core::{PeerAddress, StatusMeldung};
use vouch_crypto::PublicKey;
use vouch_protocol::{Envelope, EnvelopeKind};

use crate::engine::ProtocolEngine;
use crate::error::{EngineError, EngineResult};

const ART: EnvelopeKind = EnvelopeKind::KeyExchange;

pub(crate) async fn verarbeiten(
    engine: &ProtocolEngine,
    sender: PeerAddress,
    envelope: &Envelope,
    pubkey: PublicKey,
) -> EngineResult<()> {
    let (secret, sitzung) = engine
        .mit_kontext(|c| {
            if c.state.authenticated && c.state.ack_pending {
                c.secret.clone().map(|s| (s, c.sitzung))
            } else {
                None
            }
        })
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(ART))?;

    // Ohne eigenen Schluessel gibt es nichts weiterzugeben
    let Some(schluessel) = secret.symmetric_key() else {
        return Err(EngineError::StaleOrOutOfOrderEnvelope(ART));
    };

    let fingerprint = pubkey.fingerprint();
    if !engine.trust().is_trusted(&fingerprint) {
        return Err(EngineError::UntrustedSender(fingerprint));
    }
    if !envelope.verify_signature(secret.passphrase())? {
        return Err(EngineError::InvalidSignature(ART));
    }

    let antwort = Envelope::key(
        engine.identity(),
        &pubkey,
        secret.passphrase(),
        schluessel.as_bytes(),
    )?;
    engine.transport().send_to(sender, antwort.encode()?).await?;

    engine.zustand_aendern(|c| {
        if c.sitzung == sitzung {
            c.state.ack_pending = false;
        }
    });
    tracing::info!(an = %sender, fingerprint = %fingerprint.kurz(), "Kanal-Schluessel gesendet");
    engine.melden(StatusMeldung::SchluesselGesendet { an: sender });
    Ok(())
}
