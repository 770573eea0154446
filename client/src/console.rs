//! Zeilen-Konsole
//!
//! Befehle: `/create`, `/join`, `/request`, `/nick [name]`, `/quit`
//! (Gross-/Kleinschreibung egal). Kanalname, Passphrase und Nickname werden
//! danach einzeln abgefragt. Solange der Netzwerk-Kontext auf eine
//! Entscheidung wartet, ist jede freie Zeile die Antwort darauf; sonst wird
//! sie als Chat-Zeile gesendet.

use vouch_core::ConsoleEvent;
use vouch_engine::{EngineError, ProtocolEngine};

/// Erkannter Konsolen-Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Befehl {
    Create,
    Join,
    Request,
    Nick(Option<String>),
    Quit,
}

/// Erkennt einen Befehl am Zeilenanfang; `None` fuer freien Text
pub fn befehl_erkennen(zeile: &str) -> Option<Befehl> {
    let zeile = zeile.trim_end();
    let rest = zeile.strip_prefix('/')?;
    let (wort, argument) = match rest.split_once(' ') {
        Some((w, a)) => (w, Some(a.trim())),
        None => (rest, None),
    };

    match (wort.to_ascii_lowercase().as_str(), argument) {
        ("create", None) => Some(Befehl::Create),
        ("join", None) => Some(Befehl::Join),
        ("request", None) => Some(Befehl::Request),
        ("quit", None) => Some(Befehl::Quit),
        ("nick", a) => Some(Befehl::Nick(a.filter(|a| !a.is_empty()).map(str::to_string))),
        _ => None,
    }
}

/// Formatiert ein Ereignis fuer die Ausgabe
pub fn ereignis_anzeigen(ereignis: &ConsoleEvent) -> String {
    match ereignis {
        ConsoleEvent::Chat { zeile } => zeile.clone(),
        ConsoleEvent::Status(meldung) => format!("> {meldung}"),
        ConsoleEvent::Prompt { frage } => format!("> {frage}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Erwartet {
    Befehl,
    KanalFuerCreate,
    PassphraseFuerCreate { kanal: String },
    KanalFuerJoin,
    Zugang,
    Nick,
}

/// Ergebnis einer Eingabezeile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fluss {
    Weiter,
    Ende,
}

pub struct Konsole {
    engine: ProtocolEngine,
    erwartet: Erwartet,
}

impl Konsole {
    pub fn neu(engine: ProtocolEngine) -> Self {
        Self {
            engine,
            erwartet: Erwartet::Befehl,
        }
    }

    /// Eingabeaufforderung vor der naechsten Zeile
    ///
    /// Waehrend einer offenen Entscheidung keine eigene Aufforderung, die
    /// Rueckfrage steht bereits auf dem Schirm.
    pub fn aufforderung(&self) -> String {
        if self.engine.gate().pending_prompt().is_some() {
            return String::new();
        }
        match &self.erwartet {
            Erwartet::Befehl => format!("{}> ", self.engine.snapshot().nick),
            Erwartet::KanalFuerCreate => "> Enter the channel name: ".to_string(),
            Erwartet::PassphraseFuerCreate { .. } => "> Enter the channel passphrase: ".to_string(),
            Erwartet::KanalFuerJoin => "> Enter the channel to join: ".to_string(),
            Erwartet::Zugang => "> Enter authentication: ".to_string(),
            Erwartet::Nick => "> Enter a nickname: ".to_string(),
        }
    }

    /// Verarbeitet eine Eingabezeile
    ///
    /// Eine offene Rueckfrage hat Vorrang vor jedem angefangenen Dialog; der
    /// Dialog bleibt dabei fuer die naechste Zeile stehen.
    pub async fn zeile(&mut self, zeile: &str) -> Fluss {
        let eingabe = zeile.trim_end();
        if self.engine.gate().pending_prompt().is_some() {
            melden(self.engine.gate().publish(eingabe.trim()));
            return Fluss::Weiter;
        }

        let erwartet = std::mem::replace(&mut self.erwartet, Erwartet::Befehl);

        match erwartet {
            Erwartet::Befehl => return self.befehl_oder_text(eingabe).await,
            Erwartet::KanalFuerCreate => {
                self.erwartet = Erwartet::PassphraseFuerCreate {
                    kanal: eingabe.to_string(),
                };
            }
            Erwartet::PassphraseFuerCreate { kanal } => {
                melden(self.engine.create(&kanal, eingabe).await);
            }
            Erwartet::KanalFuerJoin => melden(self.engine.join(eingabe).await),
            Erwartet::Zugang => self.zugang_anfragen(eingabe.to_string()),
            Erwartet::Nick => melden(self.engine.set_nick(eingabe)),
        }
        Fluss::Weiter
    }

    async fn befehl_oder_text(&mut self, eingabe: &str) -> Fluss {
        match befehl_erkennen(eingabe) {
            Some(Befehl::Create) => self.erwartet = Erwartet::KanalFuerCreate,
            Some(Befehl::Join) => self.erwartet = Erwartet::KanalFuerJoin,
            Some(Befehl::Request) => {
                if self.engine.snapshot().channel.is_none() {
                    println!("> Error, you must join a channel first.");
                } else {
                    self.erwartet = Erwartet::Zugang;
                }
            }
            Some(Befehl::Nick(Some(name))) => melden(self.engine.set_nick(&name)),
            Some(Befehl::Nick(None)) => self.erwartet = Erwartet::Nick,
            Some(Befehl::Quit) => {
                melden(self.engine.quit().await);
                println!("Goodbye.");
                return Fluss::Ende;
            }
            None if eingabe.is_empty() => {}
            None => {
                if self.engine.snapshot().state.key_received {
                    melden(self.engine.send_text(eingabe).await.map(|_| ()));
                } else {
                    println!("> Kein Kanal-Schluessel: zuerst /create oder /join und /request");
                }
            }
        }
        Fluss::Weiter
    }

    /// Startet den Beitritt im Hintergrund, damit die Konsole weiter Rueckfragen beantwortet
    fn zugang_anfragen(&self, passphrase: String) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            match engine.request_access(&passphrase).await {
                Ok(()) => {}
                // Bereits als Statusmeldung angezeigt
                Err(EngineError::HandshakeTimeout(_)) => {}
                Err(e) => println!("> {e}"),
            }
        });
    }
}

fn melden<T>(ergebnis: Result<T, EngineError>) {
    if let Err(e) = ergebnis {
        if e.ist_eingabefehler() {
            println!("> {e}");
        } else {
            tracing::warn!(fehler = %e, "Befehl fehlgeschlagen");
            println!("> Fehler: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use vouch_core::{PeerAddress, StatusMeldung};
    use vouch_crypto::Identity;
    use vouch_engine::{EngineConfig, MemoryHub};
    use vouch_protocol::Envelope;

    fn konsole(hub: &MemoryHub) -> (Konsole, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let transport = Arc::new(hub.transport(tx));
        let (engine, events) =
            ProtocolEngine::neu(Identity::generate(), transport, EngineConfig::default());
        tokio::spawn(engine.clone().run(rx));
        (Konsole::neu(engine), events)
    }

    async fn prompt_abwarten(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(ConsoleEvent::Prompt { .. }) => break,
                    Some(_) => continue,
                    None => panic!("Ereignis-Queue geschlossen"),
                }
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn befehle_erkennen() {
        assert_eq!(befehl_erkennen("/create"), Some(Befehl::Create));
        assert_eq!(befehl_erkennen("/JOIN  "), Some(Befehl::Join));
        assert_eq!(befehl_erkennen("/Request"), Some(Befehl::Request));
        assert_eq!(befehl_erkennen("/quit"), Some(Befehl::Quit));
        assert_eq!(befehl_erkennen("/nick"), Some(Befehl::Nick(None)));
        assert_eq!(
            befehl_erkennen("/nick bob"),
            Some(Befehl::Nick(Some("bob".into())))
        );
        assert_eq!(befehl_erkennen("hallo"), None);
        assert_eq!(befehl_erkennen("/create jetzt"), None);
        assert_eq!(befehl_erkennen("/unbekannt"), None);
    }

    #[test]
    fn ereignisse_formatieren() {
        let chat = ConsoleEvent::Chat {
            zeile: "12:00:00 bob> hi".into(),
        };
        assert_eq!(ereignis_anzeigen(&chat), "12:00:00 bob> hi");
        let status = ConsoleEvent::Status(StatusMeldung::SchluesselEmpfangen);
        assert_eq!(ereignis_anzeigen(&status), "> Kanal-Schluessel empfangen.");
    }

    #[tokio::test]
    async fn create_fragt_name_und_passphrase() {
        let hub = MemoryHub::neu();
        let (mut k, _events) = konsole(&hub);

        assert_eq!(k.aufforderung(), "anonymous> ");
        assert_eq!(k.zeile("/Create").await, Fluss::Weiter);
        assert_eq!(k.aufforderung(), "> Enter the channel name: ");
        k.zeile("test").await;
        assert_eq!(k.aufforderung(), "> Enter the channel passphrase: ");
        k.zeile("pw").await;

        let snap = k.engine.snapshot();
        assert_eq!(snap.channel.unwrap().as_str(), "test");
        assert!(snap.state.key_received);
        assert_eq!(k.aufforderung(), "anonymous> ");
    }

    #[tokio::test]
    async fn nick_mit_und_ohne_argument() {
        let hub = MemoryHub::neu();
        let (mut k, _events) = konsole(&hub);

        k.zeile("/nick bob").await;
        assert_eq!(k.aufforderung(), "bob> ");

        k.zeile("/NICK").await;
        assert_eq!(k.aufforderung(), "> Enter a nickname: ");
        k.zeile("carol").await;
        assert_eq!(k.aufforderung(), "carol> ");

        // Ungueltiger Nick aendert nichts
        k.zeile("/nick a b").await;
        assert_eq!(k.aufforderung(), "carol> ");
    }

    #[tokio::test]
    async fn request_ohne_kanal_wird_abgewiesen() {
        let hub = MemoryHub::neu();
        let (mut k, _events) = konsole(&hub);
        k.zeile("/request").await;
        assert_eq!(k.aufforderung(), "anonymous> ");
    }

    #[tokio::test]
    async fn freie_zeile_beantwortet_offene_frage() {
        let hub = MemoryHub::neu();
        let (mut a, mut a_events) = konsole(&hub);
        let (mut b, _b_events) = konsole(&hub);

        for zeile in ["/create", "test", "pw"] {
            a.zeile(zeile).await;
        }
        for zeile in ["/join", "test", "/request", "pw"] {
            b.zeile(zeile).await;
        }

        // A wartet auf die Entscheidung
        prompt_abwarten(&mut a_events).await;
        assert_eq!(a.aufforderung(), "");
        a.zeile("V").await;
        prompt_abwarten(&mut a_events).await;
        a.zeile("y").await;

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !b.engine.snapshot().state.key_received {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(b.engine.snapshot().symmetric_key, a.engine.snapshot().symmetric_key);
    }

    #[tokio::test]
    async fn rueckfrage_hat_vorrang_vor_angefangenem_dialog() {
        let hub = MemoryHub::neu();
        let (mut a, mut a_events) = konsole(&hub);
        for zeile in ["/create", "test", "pw"] {
            a.zeile(zeile).await;
        }

        // Bediener beginnt einen neuen Dialog, dann kommt die Anfrage
        a.zeile("/create").await;
        assert_eq!(a.aufforderung(), "> Enter the channel name: ");

        let b = Identity::generate();
        let b_adresse = PeerAddress::new();
        let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();
        let verarbeitung = {
            let engine = a.engine.clone();
            tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
        };

        prompt_abwarten(&mut a_events).await;
        assert_eq!(a.aufforderung(), "");
        a.zeile("v").await;
        prompt_abwarten(&mut a_events).await;
        a.zeile("y").await;
        verarbeitung.await.unwrap().unwrap();

        // Antworten wurden nicht als Kanalname oder Passphrase verbraucht
        let snap = a.engine.snapshot();
        assert_eq!(snap.channel.unwrap().as_str(), "test");
        assert!(a.engine.trust().is_trusted(&b.public_key().fingerprint()));
        assert_eq!(a.aufforderung(), "> Enter the channel name: ");
    }

    #[tokio::test]
    async fn quit_beendet() {
        let hub = MemoryHub::neu();
        let (mut k, _events) = konsole(&hub);
        k.zeile("/join").await;
        k.zeile("test").await;
        assert_eq!(k.zeile("/quit").await, Fluss::Ende);
        assert!(k.engine.snapshot().channel.is_none());
    }
}
