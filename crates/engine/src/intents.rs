//! Befehle aus dem Konsolen-Kontext
//!
//! Die Konsole erreicht den Protokoll-Zustand ausschliesslich ueber diese
//! Methoden. Lokale Eingabefehler kommen sofort als `EngineError` zurueck.

use chrono::Local;
use vouch_core::{ChannelName, HandshakeStufe, Nickname, StatusMeldung};
use vouch_crypto::generate_symmetric_key;
use vouch_protocol::Envelope;

use crate::engine::ProtocolEngine;
use crate::error::{EngineError, EngineResult};
use crate::secret::ChannelSecret;
use crate::state::ProtocolState;

impl ProtocolEngine {
    /// Erstellt einen neuen Kanal; der Ersteller ist sofort Mitglied mit Schluessel
    pub async fn create(&self, name: &str, passphrase: &str) -> EngineResult<()> {
        let kanal = ChannelName::parse(name)?;
        self.kanal_verlassen().await?;
        self.transport().open(&kanal).await?;

        self.zustand_aendern(|c| {
            c.channel = Some(kanal.clone());
            c.secret = Some(ChannelSecret::with_key(passphrase, generate_symmetric_key()));
            c.state = ProtocolState {
                awaiting_human_decision: c.state.awaiting_human_decision,
                ..ProtocolState::ersteller()
            };
        });

        tracing::info!(kanal = %kanal, "Kanal erstellt");
        self.melden(StatusMeldung::KanalErstellt { kanal });
        Ok(())
    }

    /// Tritt der Gruppe eines bestehenden Kanals bei (ohne Schluessel)
    pub async fn join(&self, name: &str) -> EngineResult<()> {
        let kanal = ChannelName::parse(name)?;
        self.kanal_verlassen().await?;
        self.transport().open(&kanal).await?;

        self.zustand_aendern(|c| c.channel = Some(kanal.clone()));

        tracing::info!(kanal = %kanal, "Kanal betreten");
        self.melden(StatusMeldung::KanalBetreten { kanal });
        Ok(())
    }

    /// Vollstaendiger Beitritt: AuthRequest, warten, KeyExchange, warten
    ///
    /// Nur mit betretenem Kanal und ohne Kanal-Schluessel erlaubt. Ist der
    /// Knoten schon authentifiziert, wird direkt der Schluessel angefordert.
    pub async fn request_access(&self, passphrase: &str) -> EngineResult<()> {
        let schon_authentifiziert = self.zustand_aendern(|c| {
            if c.channel.is_none() {
                return Err(EngineError::zustand("Kein Kanal betreten, zuerst /join"));
            }
            if c.state.key_received {
                return Err(EngineError::zustand("Kanal-Schluessel liegt bereits vor"));
            }
            if c.state.requesting_auth || c.state.key_exchange_requested {
                return Err(EngineError::zustand("Zugangsanfrage laeuft bereits"));
            }
            if c.state.authenticated {
                return Ok(true);
            }
            c.secret = Some(ChannelSecret::new(passphrase));
            c.state.requesting_auth = true;
            Ok(false)
        })?;

        if !schon_authentifiziert {
            self.authentifizieren(passphrase).await?;
        }
        self.request_key().await?;

        self.melden(StatusMeldung::KanalBeigetreten);
        Ok(())
    }

    async fn authentifizieren(&self, passphrase: &str) -> EngineResult<()> {
        self.melden(StatusMeldung::SchluesselSignieren);
        let anfrage = Envelope::auth_request(self.identity(), passphrase);

        let gesendet = match anfrage.encode() {
            Ok(bytes) => self.transport().broadcast(bytes).await.map_err(EngineError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = gesendet {
            self.zustand_aendern(|c| c.state.requesting_auth = false);
            return Err(e);
        }
        self.melden(StatusMeldung::ZugangAngefragt);

        let stufe = HandshakeStufe::Authentifizierung;
        if let Err(e) = self
            .warten_auf(stufe, self.config().auth_timeout, |s| s.authenticated)
            .await
        {
            self.zustand_aendern(|c| c.state.requesting_auth = false);
            if matches!(e, EngineError::HandshakeTimeout(_)) {
                tracing::info!(stufe = %stufe, "Keine Antwort auf Zugangsanfrage");
                self.melden(StatusMeldung::KeineAntwort { stufe });
            }
            return Err(e);
        }
        Ok(())
    }

    /// Fordert den Kanal-Schluessel an und wartet auf die erste Key-Nachricht
    pub async fn request_key(&self) -> EngineResult<()> {
        let secret = self.zustand_aendern(|c| {
            if !c.state.authenticated {
                return Err(EngineError::zustand("Noch nicht authentifiziert"));
            }
            if c.state.key_received {
                return Err(EngineError::zustand("Kanal-Schluessel liegt bereits vor"));
            }
            let secret = c
                .secret
                .clone()
                .ok_or_else(|| EngineError::zustand("Keine Passphrase gesetzt"))?;
            c.state.key_exchange_requested = true;
            Ok(secret)
        })?;

        self.melden(StatusMeldung::NetzwerkSchluesselAngefragt);
        let anfrage = Envelope::key_exchange(self.identity(), secret.passphrase());

        let gesendet = match anfrage.encode() {
            Ok(bytes) => self.transport().broadcast(bytes).await.map_err(EngineError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = gesendet {
            self.zustand_aendern(|c| c.state.key_exchange_requested = false);
            return Err(e);
        }

        let stufe = HandshakeStufe::Schluesselaustausch;
        if let Err(e) = self
            .warten_auf(stufe, self.config().key_timeout, |s| s.key_received)
            .await
        {
            self.zustand_aendern(|c| c.state.key_exchange_requested = false);
            if matches!(e, EngineError::HandshakeTimeout(_)) {
                tracing::info!(stufe = %stufe, "Kein Kanal-Schluessel erhalten");
                self.melden(StatusMeldung::KeineAntwort { stufe });
            }
            return Err(e);
        }
        Ok(())
    }

    /// Verschluesselt eine Chat-Zeile und sendet sie an die Gruppe
    ///
    /// Gibt die gesendete Zeile (`HH:MM:SS nick> text`) zurueck.
    pub async fn send_text(&self, text: &str) -> EngineResult<String> {
        let (secret, nick) = self.mit_kontext(|c| {
            let secret = if c.state.key_received {
                c.secret.clone()
            } else {
                None
            };
            (secret, c.nick.clone())
        });
        let secret = secret
            .ok_or_else(|| EngineError::zustand("Kein Kanal-Schluessel, zuerst /create oder /request"))?;
        let schluessel = secret
            .symmetric_key()
            .ok_or_else(|| EngineError::zustand("Kein Kanal-Schluessel"))?;

        let zeile = format!("{} {}> {}", Local::now().format("%H:%M:%S"), nick, text);
        let nachricht = Envelope::encrypted_chat(
            schluessel.as_bytes(),
            self.ivs().next_iv(),
            secret.passphrase(),
            zeile.as_bytes(),
        )?;
        self.transport().broadcast(nachricht.encode()?).await?;
        Ok(zeile)
    }

    /// Aendert den lokalen Nickname (wird nicht uebertragen)
    pub fn set_nick(&self, name: &str) -> EngineResult<()> {
        let nick = Nickname::parse(name)?;
        self.zustand_aendern(|c| c.nick = nick.clone());
        self.melden(StatusMeldung::NicknameGeaendert { nick });
        Ok(())
    }

    /// Verlaesst den aktuellen Kanal
    pub async fn quit(&self) -> EngineResult<()> {
        self.kanal_verlassen().await
    }

    /// Schliesst den Transport und verwirft Kanal-Geheimnis und Flags
    ///
    /// Vertrauensliste und Blacklist bleiben fuer die Sitzung erhalten.
    async fn kanal_verlassen(&self) -> EngineResult<()> {
        if self.transport().is_open() {
            self.transport().close().await?;
        }

        let war_verbunden = self.zustand_aendern(|c| {
            let war_verbunden = c.channel.take().is_some();
            c.secret = None;
            c.sitzung += 1;
            c.state = ProtocolState {
                awaiting_human_decision: c.state.awaiting_human_decision,
                ..ProtocolState::default()
            };
            war_verbunden
        });

        if war_verbunden {
            tracing::info!("Kanal verlassen");
            self.melden(StatusMeldung::KanalVerlassen);
        }
        Ok(())
    }
}
