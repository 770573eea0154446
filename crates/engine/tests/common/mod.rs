//! Gemeinsame Hilfen fuer die Engine-Integrationstests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use vouch_core::{ChannelName, ConsoleEvent, PeerAddress, StatusMeldung};
use vouch_crypto::Identity;
use vouch_engine::{
    Delivery, EngineConfig, MemoryHub, MemoryTransport, ProtocolEngine, Transport,
    DELIVERY_QUEUE_GROESSE,
};
use vouch_protocol::{Envelope, EnvelopeKind};

/// Frist fuer das Warten auf Ereignisse in Tests
pub const TEST_FRIST: Duration = Duration::from_secs(5);

pub struct Knoten {
    pub engine: ProtocolEngine,
    pub events: mpsc::UnboundedReceiver<ConsoleEvent>,
    pub adresse: PeerAddress,
}

/// Engine mit laufendem Netzwerk-Task am Hub
pub fn knoten(hub: &MemoryHub) -> Knoten {
    knoten_mit(hub, Identity::generate(), EngineConfig::default())
}

pub fn knoten_mit(hub: &MemoryHub, identity: Identity, config: EngineConfig) -> Knoten {
    let (tx, rx) = mpsc::channel(DELIVERY_QUEUE_GROESSE);
    let transport = Arc::new(hub.transport(tx));
    let adresse = transport.local_address();
    let (engine, events) = ProtocolEngine::neu(identity, transport, config);
    tokio::spawn(engine.clone().run(rx));
    Knoten {
        engine,
        events,
        adresse,
    }
}

/// Roher Mithoerer in einer Gruppe (zaehlt gesendete Umschlaege)
pub struct Beobachter {
    pub transport: MemoryTransport,
    pub rx: mpsc::Receiver<Delivery>,
}

pub async fn beobachter(hub: &MemoryHub, kanal: &str) -> Beobachter {
    let (tx, rx) = mpsc::channel(DELIVERY_QUEUE_GROESSE);
    let transport = hub.transport(tx);
    transport
        .open(&ChannelName::parse(kanal).unwrap())
        .await
        .unwrap();
    Beobachter { transport, rx }
}

impl Beobachter {
    /// Alle bisher empfangenen Umschlag-Arten
    pub fn arten(&mut self) -> Vec<EnvelopeKind> {
        let mut arten = Vec::new();
        while let Ok(d) = self.rx.try_recv() {
            arten.push(Envelope::decode(&d.payload).unwrap().kind());
        }
        arten
    }
}

/// Wartet auf die naechste Rueckfrage und gibt ihren Text zurueck
pub async fn naechster_prompt(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> String {
    tokio::time::timeout(TEST_FRIST, async {
        loop {
            match events.recv().await {
                Some(ConsoleEvent::Prompt { frage }) => return frage,
                Some(_) => continue,
                None => panic!("Ereignis-Queue geschlossen"),
            }
        }
    })
    .await
    .expect("Kein Prompt erhalten")
}

/// Wartet auf eine Statusmeldung, die `passt` erfuellt
pub async fn status_abwarten(
    events: &mut mpsc::UnboundedReceiver<ConsoleEvent>,
    passt: impl Fn(&StatusMeldung) -> bool,
) -> StatusMeldung {
    tokio::time::timeout(TEST_FRIST, async {
        loop {
            match events.recv().await {
                Some(ConsoleEvent::Status(s)) if passt(&s) => return s,
                Some(_) => continue,
                None => panic!("Ereignis-Queue geschlossen"),
            }
        }
    })
    .await
    .expect("Statusmeldung nicht erhalten")
}

/// Wartet auf eine Chat-Zeile
pub async fn chat_abwarten(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> String {
    tokio::time::timeout(TEST_FRIST, async {
        loop {
            match events.recv().await {
                Some(ConsoleEvent::Chat { zeile }) => return zeile,
                Some(_) => continue,
                None => panic!("Ereignis-Queue geschlossen"),
            }
        }
    })
    .await
    .expect("Keine Chat-Zeile erhalten")
}

/// Pollt bis `bedingung` gilt
pub async fn warten_bis(mut bedingung: impl FnMut() -> bool) {
    tokio::time::timeout(TEST_FRIST, async {
        while !bedingung() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Bedingung nicht erreicht");
}

/// Keine Rueckfrage in der Queue
pub fn kein_prompt(events: &mut mpsc::UnboundedReceiver<ConsoleEvent>) -> bool {
    while let Ok(e) = events.try_recv() {
        if matches!(e, ConsoleEvent::Prompt { .. }) {
            return false;
        }
    }
    true
}

/// Kanal-Ersteller A und beigetretener Knoten B, komplett bis zum Schluessel
pub async fn zwei_mitglieder(hub: &MemoryHub) -> (Knoten, Knoten) {
    let mut a = knoten(hub);
    let mut b = knoten(hub);

    a.engine.create("test", "pw").await.unwrap();
    b.engine.join("test").await.unwrap();

    let beitritt = {
        let engine = b.engine.clone();
        tokio::spawn(async move { engine.request_access("pw").await })
    };

    assert_eq!(naechster_prompt(&mut a.events).await, "Verify/Reject/Ignore (V/R/I)");
    a.engine.gate().publish("v").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, "Trust new member? (Y/N)");
    a.engine.gate().publish("y").unwrap();

    tokio::time::timeout(TEST_FRIST, beitritt)
        .await
        .expect("Beitritt haengt")
        .unwrap()
        .unwrap();

    // Statusmeldungen des Beitritts verwerfen
    while b.events.try_recv().is_ok() {}
    while a.events.try_recv().is_ok() {}
    (a, b)
}
