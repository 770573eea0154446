//! AuthAcknowledge – ein Mitglied bestaetigt unsere Zugangsanfrage

use vouch_core::{PeerAddress, StatusMeldung};
use vouch_crypto::PublicKey;
use vouch_protocol::{Envelope, EnvelopeKind};

use crate::engine::ProtocolEngine;
use crate::error::{EngineError, EngineResult};

const ART: EnvelopeKind = EnvelopeKind::AuthAcknowledge;

pub(crate) fn verarbeiten(
    engine: &ProtocolEngine,
    sender: PeerAddress,
    envelope: &Envelope,
    pubkey: PublicKey,
    auth_pubkey: PublicKey,
) -> EngineResult<()> {
    let (secret, sitzung) = engine
        .mit_kontext(|c| {
            if c.state.requesting_auth && !c.state.authenticated {
                c.secret.clone().map(|s| (s, c.sitzung))
            } else {
                None
            }
        })
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(ART))?;

    // Bestaetigung fuer einen anderen Knoten
    if auth_pubkey != engine.public_key() {
        return Err(EngineError::StaleOrOutOfOrderEnvelope(ART));
    }

    if !envelope.verify_signature(secret.passphrase())? {
        return Err(EngineError::InvalidSignature(ART));
    }

    let fingerprint = pubkey.fingerprint();
    let uebernommen = engine.zustand_aendern(|c| {
        let offen = c.sitzung == sitzung && c.state.requesting_auth && !c.state.authenticated;
        if offen {
            c.state.authenticated = true;
            c.state.requesting_auth = false;
        }
        offen
    });
    if !uebernommen {
        return Err(EngineError::StaleOrOutOfOrderEnvelope(ART));
    }

    engine.trust().trust(fingerprint, sender);
    tracing::info!(
        durch = %fingerprint.kurz(),
        sender = %sender,
        "Authentifiziert"
    );
    engine.melden(StatusMeldung::Authentifiziert { durch: fingerprint });
    Ok(())
}
