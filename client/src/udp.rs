//! UDP-Multicast-Transport
//!
//! Jeder Kanal ist eine logische Gruppe auf derselben Multicast-Adresse.
//! Ein Datagramm traegt genau einen `GroupFrame`. Frames fremder Gruppen,
//! eigene Frames und Direktnachrichten an andere Knoten werden beim Empfang
//! verworfen.
//!
//! Direktnachrichten (`send_to`) gehen per Unicast an die Socket-Adresse,
//! von der zuletzt ein Frame des Ziel-Peers kam.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};
use vouch_core::{ChannelName, PeerAddress};
use vouch_engine::{Delivery, Transport, TransportError, TransportResult};
use vouch_protocol::wire::LENGTH_FIELD_SIZE;
use vouch_protocol::{GroupFrame, GroupFrameCodec};

/// Socket-Parameter aus der Konfiguration
#[derive(Debug, Clone)]
pub struct UdpEinstellungen {
    pub gruppe: SocketAddrV4,
    pub bind: SocketAddrV4,
    pub ttl: u32,
    pub max_datagramm: usize,
}

struct Verbindung {
    gruppe: ChannelName,
    socket: Arc<UdpSocket>,
    empfang: JoinHandle<()>,
}

/// Gruppen-Transport ueber UDP-Multicast
pub struct UdpGroupTransport {
    adresse: PeerAddress,
    einstellungen: UdpEinstellungen,
    deliveries: mpsc::Sender<Delivery>,
    peers: Arc<DashMap<PeerAddress, SocketAddr>>,
    verbindung: Mutex<Option<Verbindung>>,
}

impl UdpGroupTransport {
    /// Erstellt den Transport; der Socket wird erst mit `open` gebunden
    pub fn neu(einstellungen: UdpEinstellungen, deliveries: mpsc::Sender<Delivery>) -> Self {
        Self {
            adresse: PeerAddress::new(),
            einstellungen,
            deliveries,
            peers: Arc::new(DashMap::new()),
            verbindung: Mutex::new(None),
        }
    }

    fn codec(&self) -> GroupFrameCodec {
        GroupFrameCodec::with_max_size(
            self.einstellungen
                .max_datagramm
                .saturating_sub(LENGTH_FIELD_SIZE),
        )
    }

    /// Socket und Gruppe der offenen Verbindung (Lock wird sofort freigegeben)
    fn aktuell(&self) -> TransportResult<(Arc<UdpSocket>, ChannelName)> {
        self.verbindung
            .lock()
            .as_ref()
            .map(|v| (v.socket.clone(), v.gruppe.clone()))
            .ok_or(TransportError::NichtVerbunden)
    }

    async fn binden(&self) -> TransportResult<UdpSocket> {
        let e = &self.einstellungen;
        let socket = UdpSocket::bind(e.bind).await?;
        socket.join_multicast_v4(*e.gruppe.ip(), *e.bind.ip())?;
        socket.set_multicast_ttl_v4(e.ttl)?;
        socket.set_multicast_loop_v4(true)?;
        Ok(socket)
    }
}

/// Kodiert einen Frame in genau ein Datagramm
pub fn datagramm_kodieren(
    codec: &mut GroupFrameCodec,
    frame: GroupFrame,
) -> std::io::Result<BytesMut> {
    let mut puffer = BytesMut::new();
    codec.encode(frame, &mut puffer)?;
    Ok(puffer)
}

/// Liest einen Frame aus einem Datagramm, falls er fuer `node` in `gruppe` bestimmt ist
pub fn datagramm_lesen(
    codec: &mut GroupFrameCodec,
    daten: &[u8],
    node: &PeerAddress,
    gruppe: &ChannelName,
) -> Option<GroupFrame> {
    let mut puffer = BytesMut::from(daten);
    match codec.decode(&mut puffer) {
        Ok(Some(frame)) if frame.ist_fuer(node, gruppe) => Some(frame),
        Ok(Some(_)) => None,
        Ok(None) => {
            tracing::debug!(laenge = daten.len(), "Unvollstaendiges Datagramm verworfen");
            None
        }
        Err(e) => {
            tracing::debug!(fehler = %e, "Fehlerhaftes Datagramm verworfen");
            None
        }
    }
}

/// Wartezeit nach `folge` aufeinanderfolgenden Empfangsfehlern
///
/// Verdoppelt sich ab 50 ms und bleibt bei einer Sekunde stehen.
pub fn fehler_pause(folge: u32) -> Duration {
    const BASIS_MS: u64 = 50;
    const MAX_MS: u64 = 1000;
    let faktor = 1u64 << folge.saturating_sub(1).min(16);
    Duration::from_millis(BASIS_MS.saturating_mul(faktor).min(MAX_MS))
}

/// Empfangsschleife einer Gruppe; endet mit `abort()` beim Schliessen
async fn empfangen(
    socket: Arc<UdpSocket>,
    mut codec: GroupFrameCodec,
    max_datagramm: usize,
    node: PeerAddress,
    gruppe: ChannelName,
    peers: Arc<DashMap<PeerAddress, SocketAddr>>,
    deliveries: mpsc::Sender<Delivery>,
) {
    let mut puffer = vec![0u8; max_datagramm];
    let mut fehler_folge = 0u32;
    loop {
        let (laenge, quelle) = match socket.recv_from(&mut puffer).await {
            Ok(r) => {
                fehler_folge = 0;
                r
            }
            Err(e) => {
                fehler_folge = fehler_folge.saturating_add(1);
                let pause = fehler_pause(fehler_folge);
                tracing::warn!(
                    fehler = %e,
                    folge = fehler_folge,
                    pause_ms = pause.as_millis() as u64,
                    "UDP-Empfang fehlgeschlagen"
                );
                tokio::time::sleep(pause).await;
                continue;
            }
        };

        let Some(frame) = datagramm_lesen(&mut codec, &puffer[..laenge], &node, &gruppe) else {
            continue;
        };
        peers.insert(frame.sender, quelle);

        let delivery = Delivery {
            sender: frame.sender,
            payload: frame.payload,
        };
        match deliveries.try_send(delivery) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Delivery-Queue voll – Datagramm verworfen");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Delivery-Queue geschlossen, Empfang beendet");
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for UdpGroupTransport {
    async fn open(&self, group: &ChannelName) -> TransportResult<()> {
        self.close().await?;

        let socket = Arc::new(self.binden().await?);
        let empfang = tokio::spawn(empfangen(
            socket.clone(),
            self.codec(),
            self.einstellungen.max_datagramm,
            self.adresse,
            group.clone(),
            self.peers.clone(),
            self.deliveries.clone(),
        ));

        *self.verbindung.lock() = Some(Verbindung {
            gruppe: group.clone(),
            socket,
            empfang,
        });

        tracing::info!(
            gruppe = %group,
            multicast = %self.einstellungen.gruppe,
            adresse = %self.adresse,
            "Multicast-Gruppe geoeffnet"
        );
        Ok(())
    }

    async fn broadcast(&self, payload: Vec<u8>) -> TransportResult<()> {
        let (socket, gruppe) = self.aktuell()?;
        let frame = GroupFrame::broadcast(gruppe, self.adresse, payload);
        let datagramm = datagramm_kodieren(&mut self.codec(), frame)?;
        socket
            .send_to(&datagramm, SocketAddr::V4(self.einstellungen.gruppe))
            .await?;
        Ok(())
    }

    async fn send_to(&self, address: PeerAddress, payload: Vec<u8>) -> TransportResult<()> {
        let (socket, gruppe) = self.aktuell()?;
        let ziel = self
            .peers
            .get(&address)
            .map(|e| *e.value())
            .ok_or(TransportError::UnbekannterEmpfaenger(address))?;

        let frame = GroupFrame::direkt(gruppe, self.adresse, address, payload);
        let datagramm = datagramm_kodieren(&mut self.codec(), frame)?;
        socket.send_to(&datagramm, ziel).await?;
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        let alt = self.verbindung.lock().take();
        if let Some(v) = alt {
            v.empfang.abort();
            if let Err(e) =
                v.socket
                    .leave_multicast_v4(*self.einstellungen.gruppe.ip(), *self.einstellungen.bind.ip())
            {
                tracing::debug!(fehler = %e, "Multicast-Gruppe verlassen fehlgeschlagen");
            }
            tracing::info!(gruppe = %v.gruppe, "Multicast-Gruppe geschlossen");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.verbindung.lock().is_some()
    }

    fn local_address(&self) -> PeerAddress {
        self.adresse
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
