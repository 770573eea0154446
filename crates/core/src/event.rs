//! Konsolen-Ereignisse
//!
//! Alles was die Protokoll-Engine dem Bediener mitteilen will, fliesst als
//! `ConsoleEvent` ueber eine Queue an die Konsole: entschluesselte
//! Chat-Zeilen, Status-Uebergaenge und interaktive Rueckfragen.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelName, Fingerprint, Nickname, PeerAddress};

/// Ereignis fuer die Konsole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleEvent {
    /// Entschluesselte Chat-Zeile eines anderen Mitglieds
    Chat { zeile: String },
    /// Status-Uebergang im Handshake oder Kanal
    Status(StatusMeldung),
    /// Rueckfrage an den Bediener, die Antwort geht ueber das InteractionGate
    Prompt { frage: String },
}

/// Handshake-Phase, die auf eine Antwort wartet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeStufe {
    /// AuthRequest gesendet, warte auf AuthAcknowledge
    Authentifizierung,
    /// KeyExchange gesendet, warte auf Key
    Schluesselaustausch,
}

impl std::fmt::Display for HandshakeStufe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentifizierung => write!(f, "Authentifizierung"),
            Self::Schluesselaustausch => write!(f, "Schluesselaustausch"),
        }
    }
}

/// Menschenlesbare Status-Uebergaenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMeldung {
    KanalErstellt { kanal: ChannelName },
    KanalBetreten { kanal: ChannelName },
    KanalVerlassen,
    NicknameGeaendert { nick: Nickname },
    SchluesselSignieren,
    ZugangAngefragt,
    NetzwerkSchluesselAngefragt,
    AuthAnfrageEmpfangen {
        absender: PeerAddress,
        fingerprint: Fingerprint,
    },
    SignaturGueltig,
    SignaturUngueltig,
    MitgliedVertraut { fingerprint: Fingerprint },
    MitgliedAngekuendigt,
    AbsenderGebannt { absender: PeerAddress },
    Authentifiziert { durch: Fingerprint },
    SchluesselGesendet { an: PeerAddress },
    SchluesselEmpfangen,
    SchluesselFehlgeschlagen,
    KanalBeigetreten,
    KeineAntwort { stufe: HandshakeStufe },
}

impl std::fmt::Display for StatusMeldung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KanalErstellt { kanal } => write!(f, "Kanal {kanal} erfolgreich erstellt."),
            Self::KanalBetreten { kanal } => write!(f, "Kanal {kanal} betreten."),
            Self::KanalVerlassen => write!(f, "Kanal verlassen."),
            Self::NicknameGeaendert { nick } => write!(f, "Nickname geaendert zu {nick}"),
            Self::SchluesselSignieren => write!(f, "Signiere Schluessel..."),
            Self::ZugangAngefragt => write!(f, "Zugang angefragt..."),
            Self::NetzwerkSchluesselAngefragt => write!(f, "Netzwerk-Schluessel angefragt..."),
            Self::AuthAnfrageEmpfangen {
                absender,
                fingerprint,
            } => write!(
                f,
                "Zugangsanfrage von {absender} (Fingerprint {})",
                fingerprint.kurz()
            ),
            Self::SignaturGueltig => write!(f, "Signatur gueltig."),
            Self::SignaturUngueltig => write!(f, "Signatur ungueltig."),
            Self::MitgliedVertraut { fingerprint } => {
                write!(f, "Vertrauensliste aktualisiert ({})", fingerprint.kurz())
            }
            Self::MitgliedAngekuendigt => write!(f, "Authentifiziertes Mitglied angekuendigt."),
            Self::AbsenderGebannt { absender } => {
                write!(f, "Absender {absender} dauerhaft ignoriert.")
            }
            Self::Authentifiziert { durch } => {
                write!(f, "Authentifiziert durch {}", durch.kurz())
            }
            Self::SchluesselGesendet { an } => write!(f, "Kanal-Schluessel an {an} gesendet."),
            Self::SchluesselEmpfangen => write!(f, "Kanal-Schluessel empfangen."),
            Self::SchluesselFehlgeschlagen => {
                write!(f, "Kanal-Schluessel konnte nicht entpackt werden.")
            }
            Self::KanalBeigetreten => write!(f, "Kanal erfolgreich beigetreten."),
            Self::KeineAntwort { stufe } => write!(f, "Keine Antwort ({stufe})."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = ConsoleEvent::Status(StatusMeldung::KeineAntwort {
            stufe: HandshakeStufe::Schluesselaustausch,
        });
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: ConsoleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }

    #[test]
    fn keine_antwort_anzeige() {
        let s = StatusMeldung::KeineAntwort {
            stufe: HandshakeStufe::Authentifizierung,
        };
        assert_eq!(s.to_string(), "Keine Antwort (Authentifizierung).");
    }
}
