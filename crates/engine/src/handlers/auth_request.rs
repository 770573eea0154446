//! AuthRequest – ein neuer Peer bittet um Aufnahme
//!
//! Nur authentifizierte Mitglieder antworten. Die Entscheidung trifft der
//! Bediener ueber das InteractionGate; waehrenddessen staut sich die
//! Delivery-Queue hinter dieser Anfrage.

use vouch_core::{PeerAddress, StatusMeldung};
use vouch_crypto::PublicKey;
use vouch_protocol::{Envelope, EnvelopeKind};

use crate::engine::ProtocolEngine;
use crate::error::{EngineError, EngineResult};
use crate::secret::ChannelSecret;

pub const FRAGE_ENTSCHEIDUNG: &str = "Verify/Reject/Ignore (V/R/I)";
pub const FRAGE_VERTRAUEN: &str = "Trust new member? (Y/N)";
pub const FRAGE_SPERREN: &str = "Ignore sender? (Y/N)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entscheidung {
    Verifizieren,
    Ablehnen,
    Ignorieren,
}

impl Entscheidung {
    /// Alles ausser V und R gilt als Ignorieren
    fn aus_antwort(antwort: &str) -> Self {
        match antwort.trim().to_ascii_lowercase().as_str() {
            "v" => Self::Verifizieren,
            "r" => Self::Ablehnen,
            _ => Self::Ignorieren,
        }
    }
}

fn ist_ja(antwort: &str) -> bool {
    antwort.trim().eq_ignore_ascii_case("y")
}

pub(crate) async fn verarbeiten(
    engine: &ProtocolEngine,
    sender: PeerAddress,
    envelope: &Envelope,
    pubkey: PublicKey,
) -> EngineResult<()> {
    let (secret, sitzung) = engine
        .mit_kontext(|c| {
            if c.state.authenticated {
                c.secret.clone().map(|s| (s, c.sitzung))
            } else {
                None
            }
        })
        .ok_or(EngineError::StaleOrOutOfOrderEnvelope(
            EnvelopeKind::AuthRequest,
        ))?;

    let gueltig = envelope.verify_signature(secret.passphrase())?;
    let fingerprint = pubkey.fingerprint();
    tracing::info!(
        sender = %sender,
        fingerprint = %fingerprint.kurz(),
        gueltig,
        "Zugangsanfrage empfangen"
    );

    engine.zustand_aendern(|c| c.state.awaiting_human_decision = true);
    engine.melden(StatusMeldung::AuthAnfrageEmpfangen {
        absender: sender,
        fingerprint,
    });

    let ergebnis = entscheiden(engine, sender, &pubkey, gueltig, &secret, sitzung).await;

    engine.zustand_aendern(|c| c.state.awaiting_human_decision = false);
    ergebnis
}

async fn entscheiden(
    engine: &ProtocolEngine,
    sender: PeerAddress,
    pubkey: &PublicKey,
    gueltig: bool,
    secret: &ChannelSecret,
    sitzung: u64,
) -> EngineResult<()> {
    let antwort = engine.gate().ask(FRAGE_ENTSCHEIDUNG).await?;

    match Entscheidung::aus_antwort(&antwort) {
        Entscheidung::Verifizieren if gueltig => {
            engine.melden(StatusMeldung::SignaturGueltig);
            if ist_ja(&engine.gate().ask(FRAGE_VERTRAUEN).await?) {
                aufnehmen(engine, sender, pubkey, secret, sitzung).await?;
            }
            Ok(())
        }
        Entscheidung::Verifizieren => {
            engine.melden(StatusMeldung::SignaturUngueltig);
            sperren_nachfragen(engine, sender).await?;
            Err(EngineError::InvalidSignature(EnvelopeKind::AuthRequest))
        }
        Entscheidung::Ablehnen => sperren_nachfragen(engine, sender).await,
        Entscheidung::Ignorieren => {
            tracing::debug!(sender = %sender, "Zugangsanfrage ignoriert");
            sperren_nachfragen(engine, sender).await
        }
    }
}

/// Nimmt den Peer auf und kuendigt ihn mit einem AuthAcknowledge an
async fn aufnehmen(
    engine: &ProtocolEngine,
    sender: PeerAddress,
    pubkey: &PublicKey,
    secret: &ChannelSecret,
    sitzung: u64,
) -> EngineResult<()> {
    // Kanal koennte waehrend der Rueckfrage gewechselt oder verlassen worden sein
    let noch_mitglied = engine.zustand_aendern(|c| {
        let gleich = c.sitzung == sitzung && c.state.authenticated;
        if gleich {
            c.state.ack_pending = true;
        }
        gleich
    });
    if !noch_mitglied {
        tracing::info!(sender = %sender, "Kanal gewechselt, Aufnahme verworfen");
        return Err(EngineError::StaleOrOutOfOrderEnvelope(
            EnvelopeKind::AuthRequest,
        ));
    }

    let fingerprint = pubkey.fingerprint();
    engine.trust().trust(fingerprint, sender);
    engine.melden(StatusMeldung::MitgliedVertraut { fingerprint });

    let ack = Envelope::auth_acknowledge(engine.identity(), pubkey, secret.passphrase());
    engine.transport().broadcast(ack.encode()?).await?;
    engine.melden(StatusMeldung::MitgliedAngekuendigt);
    Ok(())
}

async fn sperren_nachfragen(engine: &ProtocolEngine, sender: PeerAddress) -> EngineResult<()> {
    if ist_ja(&engine.gate().ask(FRAGE_SPERREN).await?) {
        engine.trust().ban(sender);
        engine.melden(StatusMeldung::AbsenderGebannt { absender: sender });
    }
    Ok(())
}
