//! Transport-Abstraktion fuer die Gruppen-Kommunikation
//!
//! Die Engine sieht nur das `Transport`-Trait: Gruppe oeffnen, an alle
//! senden, an einen Peer senden, schliessen. Eingehende Nachrichten schiebt
//! der Transport als `Delivery` in eine mpsc-Queue, die der Netzwerk-Task
//! der Engine der Reihe nach abarbeitet.
//!
//! Keine Zustell- oder Reihenfolge-Garantien.
//!
//! ## Implementierungen
//! - `MemoryTransport` (Tests, Demos): In-Process-Hub
//! - `UdpGroupTransport` (Client-Binary): UDP-Multicast

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use vouch_core::{ChannelName, PeerAddress};

/// Groesse der Delivery-Queue pro Knoten
pub const DELIVERY_QUEUE_GROESSE: usize = 256;

/// Eingehende Nachricht aus der Gruppe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sender: PeerAddress,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Keine Gruppe geoeffnet")]
    NichtVerbunden,

    #[error("Unbekannter Empfaenger: {0}")]
    UnbekannterEmpfaenger(PeerAddress),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Tritt der Gruppe `group` bei; eine bereits offene Gruppe wird verlassen
    async fn open(&self, group: &ChannelName) -> TransportResult<()>;

    /// Sendet an alle anderen Mitglieder der Gruppe
    async fn broadcast(&self, payload: Vec<u8>) -> TransportResult<()>;

    /// Sendet an genau einen Peer der Gruppe
    async fn send_to(&self, address: PeerAddress, payload: Vec<u8>) -> TransportResult<()>;

    async fn close(&self) -> TransportResult<()>;

    fn is_open(&self) -> bool;

    /// Eigene Adresse in der Gruppe
    fn local_address(&self) -> PeerAddress;
}

// ---------------------------------------------------------------------------
// MemoryHub
// ---------------------------------------------------------------------------

struct MemoryKnoten {
    gruppe: Option<ChannelName>,
    tx: mpsc::Sender<Delivery>,
}

/// In-Process-Gruppen-Hub
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct MemoryHub {
    knoten: Arc<DashMap<PeerAddress, MemoryKnoten>>,
}

impl MemoryHub {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen neuen Knoten; Zustellungen landen in `tx`
    ///
    /// Der Knoten wird abgemeldet, sobald das letzte Handle gedroppt ist.
    pub fn transport(&self, tx: mpsc::Sender<Delivery>) -> MemoryTransport {
        let adresse = PeerAddress::new();
        self.knoten
            .insert(adresse, MemoryKnoten { gruppe: None, tx });
        MemoryTransport {
            adresse,
            hub: self.clone(),
            _anmeldung: Arc::new(Anmeldung {
                adresse,
                knoten: self.knoten.clone(),
            }),
        }
    }

    /// Anzahl registrierter Knoten
    pub fn knoten_anzahl(&self) -> usize {
        self.knoten.len()
    }

    fn gruppe_von(&self, adresse: &PeerAddress) -> Option<ChannelName> {
        self.knoten.get(adresse).and_then(|k| k.gruppe.clone())
    }

    fn zustellen(tx: &mpsc::Sender<Delivery>, delivery: Delivery) {
        match tx.try_send(delivery) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Delivery-Queue voll – Nachricht verworfen");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Delivery-Queue geschlossen (Knoten beendet)");
            }
        }
    }
}

/// Meldet den Knoten beim Drop vom Hub ab
struct Anmeldung {
    adresse: PeerAddress,
    knoten: Arc<DashMap<PeerAddress, MemoryKnoten>>,
}

impl Drop for Anmeldung {
    fn drop(&mut self) {
        self.knoten.remove(&self.adresse);
    }
}

/// Transport-Handle eines Knotens am `MemoryHub`
#[derive(Clone)]
pub struct MemoryTransport {
    adresse: PeerAddress,
    hub: MemoryHub,
    _anmeldung: Arc<Anmeldung>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, group: &ChannelName) -> TransportResult<()> {
        if let Some(mut knoten) = self.hub.knoten.get_mut(&self.adresse) {
            knoten.gruppe = Some(group.clone());
        }
        tracing::debug!(adresse = %self.adresse, gruppe = %group, "Gruppe geoeffnet");
        Ok(())
    }

    async fn broadcast(&self, payload: Vec<u8>) -> TransportResult<()> {
        let gruppe = self
            .hub
            .gruppe_von(&self.adresse)
            .ok_or(TransportError::NichtVerbunden)?;

        // Empfaenger zuerst einsammeln, damit keine DashMap-Referenz gehalten wird
        let empfaenger: Vec<mpsc::Sender<Delivery>> = self
            .hub
            .knoten
            .iter()
            .filter(|e| *e.key() != self.adresse && e.value().gruppe.as_ref() == Some(&gruppe))
            .map(|e| e.value().tx.clone())
            .collect();

        for tx in &empfaenger {
            MemoryHub::zustellen(
                tx,
                Delivery {
                    sender: self.adresse,
                    payload: payload.clone(),
                },
            );
        }
        Ok(())
    }

    async fn send_to(&self, address: PeerAddress, payload: Vec<u8>) -> TransportResult<()> {
        let gruppe = self
            .hub
            .gruppe_von(&self.adresse)
            .ok_or(TransportError::NichtVerbunden)?;

        let tx = self
            .hub
            .knoten
            .get(&address)
            .filter(|k| k.gruppe.as_ref() == Some(&gruppe))
            .map(|k| k.tx.clone())
            .ok_or(TransportError::UnbekannterEmpfaenger(address))?;

        MemoryHub::zustellen(
            &tx,
            Delivery {
                sender: self.adresse,
                payload,
            },
        );
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        if let Some(mut knoten) = self.hub.knoten.get_mut(&self.adresse) {
            knoten.gruppe = None;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.hub.gruppe_von(&self.adresse).is_some()
    }

    fn local_address(&self) -> PeerAddress {
        self.adresse
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
