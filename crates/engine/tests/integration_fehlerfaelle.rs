//! Integration-Tests fuer verworfene Nachrichten, Sperren, Fristen und Eingabefehler

mod common;

use std::time::Duration;

use common::*;
use vouch_core::{ConsoleEvent, HandshakeStufe, PeerAddress, StatusMeldung};
use vouch_crypto::{generate_symmetric_key, Identity, IvGenerator};
use vouch_engine::{
    EngineConfig, EngineError, MemoryHub, FRAGE_ENTSCHEIDUNG, FRAGE_SPERREN, FRAGE_VERTRAUEN,
};
use vouch_protocol::{Envelope, EnvelopeKind};

#[tokio::test]
async fn manipulierter_chiffretext_wird_still_verworfen() {
    let hub = MemoryHub::neu();
    let (a, mut b) = zwei_mitglieder(&hub).await;

    let schluessel = a.engine.snapshot().symmetric_key.unwrap();
    let echt = Envelope::encrypted_chat(
        schluessel.as_bytes(),
        IvGenerator::new().next_iv(),
        "pw",
        b"12:00:00 anonymous> geheim",
    )
    .unwrap();
    let Envelope::EncryptedChat {
        iv,
        mut ciphertext,
        mac,
    } = echt
    else {
        panic!("Erwartet EncryptedChat");
    };
    ciphertext[3] ^= 0x20;
    let kaputt = Envelope::EncryptedChat {
        iv,
        ciphertext,
        mac,
    }
    .encode()
    .unwrap();

    let vorher = b.engine.snapshot();
    assert!(matches!(
        b.engine.deliver(a.adresse, &kaputt).await,
        Err(EngineError::IntegrityFailure)
    ));
    let nachher = b.engine.snapshot();
    assert_eq!(vorher.state, nachher.state);
    assert_eq!(vorher.symmetric_key, nachher.symmetric_key);

    while let Ok(e) = b.events.try_recv() {
        assert!(!matches!(e, ConsoleEvent::Chat { .. }), "nichts zustellen");
    }

    // Engine arbeitet danach normal weiter
    a.engine.send_text("noch da").await.unwrap();
    assert!(chat_abwarten(&mut b.events).await.ends_with("> noch da"));
}

#[tokio::test]
async fn gesperrter_absender_erzeugt_keine_rueckfrage() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();
    while a.events.try_recv().is_ok() {}

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    a.engine.trust().ban(b_adresse);

    let vorher = a.engine.snapshot();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();
    a.engine.deliver(b_adresse, &anfrage).await.unwrap();

    assert!(kein_prompt(&mut a.events));
    assert!(a.engine.gate().pending_prompt().is_none());
    assert_eq!(a.engine.snapshot().state, vorher.state);
    assert!(!a.engine.trust().is_trusted(&b.public_key().fingerprint()));

    // Auch Muell von gesperrten Absendern wird nicht einmal dekodiert
    a.engine.deliver(b_adresse, b"kein json").await.unwrap();
}

#[tokio::test]
async fn ablehnen_und_sperren() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();

    let verarbeitung = {
        let engine = a.engine.clone();
        let anfrage = anfrage.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_ENTSCHEIDUNG);
    a.engine.gate().publish("R").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_SPERREN);
    a.engine.gate().publish("Y").unwrap();
    verarbeitung.await.unwrap().unwrap();

    assert!(a.engine.trust().is_banned(&b_adresse));
    assert!(!a.engine.snapshot().state.ack_pending);

    // Weitere Anfragen desselben Absenders loesen nichts mehr aus
    a.engine.deliver(b_adresse, &anfrage).await.unwrap();
    assert!(kein_prompt(&mut a.events));
}

#[tokio::test]
async fn ignorieren_ohne_sperre_aendert_nichts() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();
    let mut mithoerer = beobachter(&hub, "test").await;

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();

    let verarbeitung = {
        let engine = a.engine.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_ENTSCHEIDUNG);
    a.engine.gate().publish("i").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_SPERREN);
    a.engine.gate().publish("n").unwrap();
    verarbeitung.await.unwrap().unwrap();

    assert!(!a.engine.trust().is_banned(&b_adresse));
    assert!(a.engine.trust().is_empty());
    assert!(mithoerer.arten().is_empty());
    assert!(!a.engine.snapshot().state.awaiting_human_decision);
}

#[tokio::test]
async fn ignorieren_und_sperren() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();

    let verarbeitung = {
        let engine = a.engine.clone();
        let anfrage = anfrage.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_ENTSCHEIDUNG);
    a.engine.gate().publish("I").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_SPERREN);
    a.engine.gate().publish("y").unwrap();
    verarbeitung.await.unwrap().unwrap();

    assert!(a.engine.trust().is_banned(&b_adresse));
    assert!(a.engine.trust().is_empty());

    a.engine.deliver(b_adresse, &anfrage).await.unwrap();
    assert!(kein_prompt(&mut a.events));
}

#[tokio::test]
async fn kanalwechsel_waehrend_rueckfrage_verwirft_aufnahme() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();
    let mut alter_kanal = beobachter(&hub, "test").await;
    let mut neuer_kanal = beobachter(&hub, "anders").await;

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();

    let verarbeitung = {
        let engine = a.engine.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_ENTSCHEIDUNG);

    // Bediener wechselt den Kanal, bevor er antwortet
    a.engine.create("anders", "neu").await.unwrap();

    a.engine.gate().publish("v").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_VERTRAUEN);
    a.engine.gate().publish("y").unwrap();

    assert!(matches!(
        verarbeitung.await.unwrap(),
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::AuthRequest))
    ));

    let snap = a.engine.snapshot();
    assert_eq!(snap.channel.unwrap().as_str(), "anders");
    assert!(!snap.state.ack_pending);
    assert!(!snap.state.awaiting_human_decision);
    assert!(!a.engine.trust().is_trusted(&b.public_key().fingerprint()));
    assert!(alter_kanal.arten().is_empty());
    assert!(neuer_kanal.arten().is_empty());
}

#[tokio::test]
async fn falsche_passphrase_ergibt_ungueltige_signatur() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();

    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "geraten").encode().unwrap();

    let verarbeitung = {
        let engine = a.engine.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_ENTSCHEIDUNG);
    a.engine.gate().publish("v").unwrap();
    assert_eq!(naechster_prompt(&mut a.events).await, FRAGE_SPERREN);
    a.engine.gate().publish("y").unwrap();

    assert!(matches!(
        verarbeitung.await.unwrap(),
        Err(EngineError::InvalidSignature(EnvelopeKind::AuthRequest))
    ));
    assert!(a.engine.trust().is_banned(&b_adresse));
    assert!(!a.engine.trust().is_trusted(&b.public_key().fingerprint()));

    status_abwarten(&mut a.events, |s| {
        matches!(s, StatusMeldung::AbsenderGebannt { absender } if *absender == b_adresse)
    })
    .await;
}

#[tokio::test]
async fn nachrichten_im_falschen_zustand_sind_veraltet() {
    let hub = MemoryHub::neu();
    let b = knoten(&hub);
    b.engine.join("test").await.unwrap();

    let fremd = Identity::generate();
    let adresse = PeerAddress::new();

    // Nicht authentifiziert: keine AuthRequests beantworten
    let anfrage = Envelope::auth_request(&fremd, "pw").encode().unwrap();
    assert!(matches!(
        b.engine.deliver(adresse, &anfrage).await,
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::AuthRequest))
    ));

    // Keine Anfrage gestellt: AuthAcknowledge ist veraltet
    let ack = Envelope::auth_acknowledge(&fremd, &b.engine.public_key(), "pw")
        .encode()
        .unwrap();
    assert!(matches!(
        b.engine.deliver(adresse, &ack).await,
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::AuthAcknowledge))
    ));

    // Kein Schluessel: Chat ist veraltet
    let chat = Envelope::encrypted_chat(
        generate_symmetric_key().as_bytes(),
        IvGenerator::new().next_iv(),
        "pw",
        b"x",
    )
    .unwrap()
    .encode()
    .unwrap();
    assert!(matches!(
        b.engine.deliver(adresse, &chat).await,
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::EncryptedChat))
    ));

    // Kein KeyExchange gestellt: Key ist veraltet
    let key = Envelope::key(&fremd, &b.engine.public_key(), "pw", &[7u8; 32])
        .unwrap()
        .encode()
        .unwrap();
    assert!(matches!(
        b.engine.deliver(adresse, &key).await,
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::Key))
    ));

    assert_eq!(b.engine.snapshot().state, Default::default());
}

#[tokio::test]
async fn bestaetigung_fuer_anderen_knoten_wird_verworfen() {
    let hub = MemoryHub::neu();
    let mut b = knoten(&hub);
    b.engine.join("test").await.unwrap();

    let beitritt = {
        let engine = b.engine.clone();
        tokio::spawn(async move { engine.request_access("pw").await })
    };
    status_abwarten(&mut b.events, |s| *s == StatusMeldung::ZugangAngefragt).await;

    let a = Identity::generate();
    let jemand_anders = Identity::generate().public_key();
    let ack = Envelope::auth_acknowledge(&a, &jemand_anders, "pw")
        .encode()
        .unwrap();
    assert!(matches!(
        b.engine.deliver(PeerAddress::new(), &ack).await,
        Err(EngineError::StaleOrOutOfOrderEnvelope(EnvelopeKind::AuthAcknowledge))
    ));
    assert!(!b.engine.snapshot().state.authenticated);

    // Falsche Passphrase in der Bestaetigung
    let falsch = Envelope::auth_acknowledge(&a, &b.engine.public_key(), "anders")
        .encode()
        .unwrap();
    assert!(matches!(
        b.engine.deliver(PeerAddress::new(), &falsch).await,
        Err(EngineError::InvalidSignature(EnvelopeKind::AuthAcknowledge))
    ));
    assert!(!b.engine.snapshot().state.authenticated);
    assert!(b.engine.trust().is_empty());

    beitritt.abort();
}

#[tokio::test]
async fn key_exchange_von_unbekanntem_wird_abgelehnt() {
    let hub = MemoryHub::neu();
    let mut a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();

    // ack_pending herstellen: B wird aufgenommen
    let b = Identity::generate();
    let b_adresse = PeerAddress::new();
    let anfrage = Envelope::auth_request(&b, "pw").encode().unwrap();
    let verarbeitung = {
        let engine = a.engine.clone();
        tokio::spawn(async move { engine.deliver(b_adresse, &anfrage).await })
    };
    naechster_prompt(&mut a.events).await;
    a.engine.gate().publish("v").unwrap();
    naechster_prompt(&mut a.events).await;
    a.engine.gate().publish("y").unwrap();
    verarbeitung.await.unwrap().unwrap();
    assert!(a.engine.snapshot().state.ack_pending);

    let fremd = Identity::generate();
    let ke = Envelope::key_exchange(&fremd, "pw").encode().unwrap();
    assert!(matches!(
        a.engine.deliver(PeerAddress::new(), &ke).await,
        Err(EngineError::UntrustedSender(fp)) if fp == fremd.public_key().fingerprint()
    ));
    assert!(a.engine.snapshot().state.ack_pending);

    // Vertraut, aber falsche Passphrase
    let falsch = Envelope::key_exchange(&b, "anders").encode().unwrap();
    assert!(matches!(
        a.engine.deliver(b_adresse, &falsch).await,
        Err(EngineError::InvalidSignature(EnvelopeKind::KeyExchange))
    ));
    assert!(a.engine.snapshot().state.ack_pending);
}

#[tokio::test]
async fn fehlerhafte_bytes_sind_malformed() {
    let hub = MemoryHub::neu();
    let a = knoten(&hub);
    a.engine.create("test", "pw").await.unwrap();
    let vorher = a.engine.snapshot().state;

    for roh in [&b"\x00\x01\x02"[..], b"{}", br#"{"type":"key_exchange"}"#] {
        assert!(matches!(
            a.engine.deliver(PeerAddress::new(), roh).await,
            Err(EngineError::MalformedEnvelope(_))
        ));
    }
    assert_eq!(a.engine.snapshot().state, vorher);
}

#[tokio::test(start_paused = true)]
async fn keine_antwort_auf_zugangsanfrage() {
    let hub = MemoryHub::neu();
    let mut b = knoten(&hub);
    b.engine.join("test").await.unwrap();

    let ergebnis = b.engine.request_access("pw").await;
    assert!(matches!(
        ergebnis,
        Err(EngineError::HandshakeTimeout(HandshakeStufe::Authentifizierung))
    ));
    assert!(!b.engine.snapshot().state.requesting_auth);

    status_abwarten(&mut b.events, |s| {
        *s == StatusMeldung::KeineAntwort {
            stufe: HandshakeStufe::Authentifizierung,
        }
    })
    .await;

    // Spaete Bestaetigung ist veraltet
    let ack = Envelope::auth_acknowledge(&Identity::generate(), &b.engine.public_key(), "pw")
        .encode()
        .unwrap();
    assert!(b.engine.deliver(PeerAddress::new(), &ack).await.is_err());
    assert!(!b.engine.snapshot().state.authenticated);
}

#[tokio::test(start_paused = true)]
async fn keine_antwort_auf_schluesselanfrage() {
    let hub = MemoryHub::neu();
    let config = EngineConfig {
        auth_timeout: Duration::from_secs(20),
        key_timeout: Duration::from_secs(10),
    };
    let mut b = knoten_mit(&hub, Identity::generate(), config);
    b.engine.join("test").await.unwrap();

    let beitritt = {
        let engine = b.engine.clone();
        tokio::spawn(async move { engine.request_access("pw").await })
    };
    status_abwarten(&mut b.events, |s| *s == StatusMeldung::ZugangAngefragt).await;

    let ack = Envelope::auth_acknowledge(&Identity::generate(), &b.engine.public_key(), "pw")
        .encode()
        .unwrap();
    b.engine.deliver(PeerAddress::new(), &ack).await.unwrap();

    assert!(matches!(
        beitritt.await.unwrap(),
        Err(EngineError::HandshakeTimeout(HandshakeStufe::Schluesselaustausch))
    ));
    let snap = b.engine.snapshot();
    assert!(snap.state.authenticated);
    assert!(!snap.state.key_exchange_requested);
    assert!(!snap.state.key_received);

    status_abwarten(&mut b.events, |s| {
        *s == StatusMeldung::KeineAntwort {
            stufe: HandshakeStufe::Schluesselaustausch,
        }
    })
    .await;
}

#[tokio::test]
async fn eingabefehler_werden_sofort_gemeldet() {
    let hub = MemoryHub::neu();
    let a = knoten(&hub);

    let e = a.engine.create("a/b", "pw").await.unwrap_err();
    assert!(matches!(e, EngineError::InvalidChannelName(_)));
    assert!(e.ist_eingabefehler());

    assert!(matches!(
        a.engine.join("").await,
        Err(EngineError::InvalidChannelName(_))
    ));
    assert!(matches!(
        a.engine.set_nick("mit leerzeichen"),
        Err(EngineError::InvalidNickname(_))
    ));
    assert!(matches!(
        a.engine.request_access("pw").await,
        Err(EngineError::UngueltigerZustand(_))
    ));
    assert!(matches!(
        a.engine.send_text("hallo").await,
        Err(EngineError::UngueltigerZustand(_))
    ));
    assert!(matches!(
        a.engine.request_key().await,
        Err(EngineError::UngueltigerZustand(_))
    ));

    // Ersteller braucht keinen Zugang mehr
    a.engine.create("test", "pw").await.unwrap();
    assert!(matches!(
        a.engine.request_access("pw").await,
        Err(EngineError::UngueltigerZustand(_))
    ));

    // quit ohne Kanal ist harmlos
    a.engine.quit().await.unwrap();
    a.engine.quit().await.unwrap();
}
