//! Key – eingewickelter Kanal-Schluessel von einem vertrauten Mitglied
//!
//! Die erste gueltige Key-Nachricht gewinnt. Danach ist
//! `key_exchange_requested` geloescht und jede weitere wird verworfen.

use vouch_core::StatusMeldung;
use vouch_crypto::{unwrap_key, PublicKey};
use vouch_protocol::{Envelope, EnvelopeKind};

use crate::engine::{Context, ProtocolEngine};
use crate::error::{EngineError, EngineResult};

const ART: EnvelopeKind = EnvelopeKind::Key;

pub(crate) fn verarbeiten(
    engine: &ProtocolEngine,
    envelope: &Envelope,
    pubkey: PublicKey,
    wrapped_key: &[u8],
) -> EngineResult<()> {
    let offen = |c: &Context| c.state.authenticated && c.state.key_exchange_requested;

    let (secret, sitzung) = engine
        .mit_kontext(|c| {
            if offen(c) {
                c.secret.clone().map(|s| (s, c.sitzung))
            } else {
                None
            }
        })
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(ART))?;

    let fingerprint = pubkey.fingerprint();
    if !engine.trust().is_trusted(&fingerprint) {
        return Err(EngineError::UntrustedSender(fingerprint));
    }
    if !envelope.verify_signature(secret.passphrase())? {
        return Err(EngineError::InvalidSignature(ART));
    }

    let schluessel = match unwrap_key(engine.identity(), &pubkey, secret.passphrase(), wrapped_key)
    {
        Ok(s) => s,
        Err(e) => {
            engine.melden(StatusMeldung::SchluesselFehlgeschlagen);
            return Err(e.into());
        }
    };

    engine.zustand_aendern(|c| {
        if c.sitzung != sitzung || !offen(&*c) {
            return Err(EngineError::StaleOrOutOfOrderEnvelope(ART));
        }
        let secret = c
            .secret
            .as_mut()
            .ok_or(EngineError::StaleOrOutOfOrderEnvelope(ART))?;
        secret.install_key(schluessel)?;
        c.state.key_exchange_requested = false;
        c.state.key_received = true;
        Ok(())
    })?;

    tracing::info!(von = %fingerprint.kurz(), "Kanal-Schluessel empfangen");
    engine.melden(StatusMeldung::SchluesselEmpfangen);
    Ok(())
}
