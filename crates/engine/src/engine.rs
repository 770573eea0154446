//! ProtocolEngine – Zustandsautomat des Kanalprotokolls
//!
//! Der gesamte Protokoll-Zustand liegt in einem `Context` hinter einem
//! Mutex, der nie ueber ein `.await` gehalten wird. Jede Zustandsaenderung
//! wird zusaetzlich ueber einen watch-Kanal veroeffentlicht, auf den die
//! Befehle (`request_access`, `request_key`) mit Frist warten.
//!
//! ```text
//! Transport --Delivery--> run() --deliver()--> handlers::*
//!                                                 |
//!                                                 +-- InteractionGate (Bediener)
//!                                                 +-- TrustStore / ChannelSecret
//! Konsole ---> intents (create, join, request_access, send_text, ...)
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use vouch_core::{
    ChannelName, ConsoleEvent, HandshakeStufe, Nickname, PeerAddress, StatusMeldung,
};
use vouch_crypto::{Identity, IvGenerator, PublicKey, SecretBytes};
use vouch_protocol::Envelope;

use crate::error::{EngineError, EngineResult};
use crate::gate::InteractionGate;
use crate::handlers;
use crate::secret::ChannelSecret;
use crate::state::ProtocolState;
use crate::transport::{Delivery, Transport};
use crate::trust::TrustStore;

/// Fristen der Handshakes
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wartezeit auf ein AuthAcknowledge
    pub auth_timeout: Duration,
    /// Wartezeit auf eine Key-Nachricht
    pub key_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(20),
            key_timeout: Duration::from_secs(10),
        }
    }
}

/// Veraenderlicher Zustand eines Knotens
pub(crate) struct Context {
    pub state: ProtocolState,
    pub channel: Option<ChannelName>,
    pub secret: Option<ChannelSecret>,
    pub nick: Nickname,
    /// Zaehlt Kanalwechsel; Handler vergleichen ihn vor dem Festschreiben
    pub sitzung: u64,
}

/// Momentaufnahme fuer Anzeige und Tests
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub state: ProtocolState,
    pub channel: Option<ChannelName>,
    pub nick: Nickname,
    pub symmetric_key: Option<SecretBytes>,
    pub vertraute: usize,
    pub gesperrte: usize,
}

struct EngineInner {
    identity: Identity,
    transport: Arc<dyn Transport>,
    trust: TrustStore,
    gate: InteractionGate,
    events: mpsc::UnboundedSender<ConsoleEvent>,
    ivs: IvGenerator,
    config: EngineConfig,
    context: Mutex<Context>,
    zustand_tx: watch::Sender<ProtocolState>,
}

/// Protokoll-Engine eines Knotens
///
/// Clone teilt den inneren Zustand: ein Handle fuer den Netzwerk-Task, eines
/// fuer die Konsole.
#[derive(Clone)]
pub struct ProtocolEngine {
    inner: Arc<EngineInner>,
}

impl ProtocolEngine {
    /// Erstellt eine Engine und gibt die Ereignis-Queue fuer die Konsole zurueck
    pub fn neu(
        identity: Identity,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (zustand_tx, _) = watch::channel(ProtocolState::default());

        tracing::info!(
            fingerprint = %identity.public_key().fingerprint().kurz(),
            adresse = %transport.local_address(),
            "Protokoll-Engine erstellt"
        );

        let engine = Self {
            inner: Arc::new(EngineInner {
                identity,
                transport,
                trust: TrustStore::neu(),
                gate: InteractionGate::neu(events.clone()),
                events,
                ivs: IvGenerator::new(),
                config,
                context: Mutex::new(Context {
                    state: ProtocolState::default(),
                    channel: None,
                    secret: None,
                    nick: Nickname::default(),
                    sitzung: 0,
                }),
                zustand_tx,
            }),
        };
        (engine, events_rx)
    }

    // -----------------------------------------------------------------------
    // Zugriff
    // -----------------------------------------------------------------------

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.identity.public_key()
    }

    pub fn trust(&self) -> &TrustStore {
        &self.inner.trust
    }

    pub fn gate(&self) -> &InteractionGate {
        &self.inner.gate
    }

    pub fn local_address(&self) -> PeerAddress {
        self.inner.transport.local_address()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let ctx = self.inner.context.lock();
        EngineSnapshot {
            state: ctx.state,
            channel: ctx.channel.clone(),
            nick: ctx.nick.clone(),
            symmetric_key: ctx.secret.as_ref().and_then(|s| s.symmetric_key().cloned()),
            vertraute: self.inner.trust.len(),
            gesperrte: self.inner.trust.gesperrt_anzahl(),
        }
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn ivs(&self) -> &IvGenerator {
        &self.inner.ivs
    }

    /// Liest den Kontext (Lock wird sofort wieder freigegeben)
    pub(crate) fn mit_kontext<R>(&self, f: impl FnOnce(&Context) -> R) -> R {
        f(&self.inner.context.lock())
    }

    /// Aendert den Kontext und veroeffentlicht den neuen Protokoll-Zustand
    pub(crate) fn zustand_aendern<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        let mut ctx = self.inner.context.lock();
        let ergebnis = f(&mut ctx);
        debug_assert!(ctx.state.invarianten_ok(), "Invariante verletzt: {:?}", ctx.state);
        self.inner.zustand_tx.send_replace(ctx.state);
        ergebnis
    }

    pub(crate) fn melden(&self, meldung: StatusMeldung) {
        tracing::debug!(meldung = %meldung, "Status");
        let _ = self.inner.events.send(ConsoleEvent::Status(meldung));
    }

    pub(crate) fn chat_zeile(&self, zeile: String) {
        let _ = self.inner.events.send(ConsoleEvent::Chat { zeile });
    }

    /// Wartet bis `bedingung` gilt oder die Frist ablaeuft
    pub(crate) async fn warten_auf(
        &self,
        stufe: HandshakeStufe,
        frist: Duration,
        bedingung: impl Fn(&ProtocolState) -> bool,
    ) -> EngineResult<()> {
        let mut rx = self.inner.zustand_tx.subscribe();
        // Gebunden, weil der Ref aus wait_for `rx` borgt
        #[allow(clippy::let_and_return)]
        let ergebnis = match tokio::time::timeout(frist, rx.wait_for(|s| bedingung(s))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(EngineError::Intern("Zustandskanal geschlossen".to_string())),
            Err(_) => Err(EngineError::HandshakeTimeout(stufe)),
        };
        ergebnis
    }

    // -----------------------------------------------------------------------
    // Netzwerk-Kontext
    // -----------------------------------------------------------------------

    /// Verarbeitet eine eingehende Nachricht
    ///
    /// Nachrichten gesperrter Absender werden vor jeder weiteren Pruefung
    /// verworfen. Fehler lassen den Zustand unveraendert.
    pub async fn deliver(&self, sender: PeerAddress, payload: &[u8]) -> EngineResult<()> {
        if self.inner.trust.is_banned(&sender) {
            tracing::debug!(sender = %sender, "Nachricht von gesperrtem Absender verworfen");
            return Ok(());
        }

        let envelope = Envelope::decode(payload)?;
        tracing::debug!(sender = %sender, art = %envelope.kind(), "Umschlag empfangen");

        match &envelope {
            Envelope::AuthRequest { pubkey, .. } => {
                handlers::auth_request::verarbeiten(self, sender, &envelope, *pubkey).await
            }
            Envelope::AuthAcknowledge {
                pubkey,
                auth_pubkey,
                ..
            } => handlers::auth_acknowledge::verarbeiten(
                self,
                sender,
                &envelope,
                *pubkey,
                *auth_pubkey,
            ),
            Envelope::KeyExchange { pubkey, .. } => {
                handlers::key_exchange::verarbeiten(self, sender, &envelope, *pubkey).await
            }
            Envelope::Key {
                pubkey,
                wrapped_key,
                ..
            } => handlers::key::verarbeiten(self, &envelope, *pubkey, wrapped_key),
            Envelope::EncryptedChat { .. } => handlers::chat::verarbeiten(self, &envelope),
        }
    }

    /// Netzwerk-Task: arbeitet die Delivery-Queue der Reihe nach ab
    ///
    /// Laeuft bis der Transport die Queue schliesst.
    pub async fn run(self, mut deliveries: mpsc::Receiver<Delivery>) {
        tracing::info!(adresse = %self.local_address(), "Netzwerk-Task gestartet");

        while let Some(Delivery { sender, payload }) = deliveries.recv().await {
            if let Err(e) = self.deliver(sender, &payload).await {
                match e {
                    EngineError::StaleOrOutOfOrderEnvelope(_) | EngineError::IntegrityFailure => {
                        tracing::debug!(sender = %sender, fehler = %e, "Umschlag verworfen");
                    }
                    _ => {
                        tracing::warn!(sender = %sender, fehler = %e, "Umschlag abgelehnt");
                    }
                }
            }
        }

        tracing::info!("Delivery-Queue geschlossen, Netzwerk-Task beendet");
    }
}
