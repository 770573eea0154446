//! Wire-Format fuer die Gruppen-Transportschicht
//!
//! Jeder Umschlag reist in einem `GroupFrame`, der Gruppe, Absender und
//! optional einen einzelnen Empfaenger traegt. Ein Datagramm enthaelt genau
//! einen Frame: Length(u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | JSON-Frame |
//! +--------+--------+--------+--------+----...----+
//! ```

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use vouch_core::{ChannelName, PeerAddress};

use crate::serde_b64;

/// Aktuelle Version des Frame-Formats
pub const PROTOCOL_VERSION: u8 = 1;

/// Standard-maximale Frame-Groesse (passt in ein UDP-Datagramm)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 60 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Ein Umschlag unterwegs in einer Gruppe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFrame {
    pub version: u8,
    pub group: ChannelName,
    pub sender: PeerAddress,
    /// `None` = Broadcast an die ganze Gruppe
    pub recipient: Option<PeerAddress>,
    #[serde(with = "serde_b64::bytes")]
    pub payload: Vec<u8>,
}

impl GroupFrame {
    pub fn broadcast(group: ChannelName, sender: PeerAddress, payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            group,
            sender,
            recipient: None,
            payload,
        }
    }

    pub fn direkt(
        group: ChannelName,
        sender: PeerAddress,
        recipient: PeerAddress,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            group,
            sender,
            recipient: Some(recipient),
            payload,
        }
    }

    /// Ist dieser Frame fuer `node` in `group` bestimmt?
    ///
    /// Fremde Gruppen, eigene Frames und Direktnachrichten an andere Knoten
    /// werden verworfen.
    pub fn ist_fuer(&self, node: &PeerAddress, group: &ChannelName) -> bool {
        self.version == PROTOCOL_VERSION
            && &self.group == group
            && &self.sender != node
            && self.recipient.map_or(true, |r| &r == node)
    }
}

// ---------------------------------------------------------------------------
// GroupFrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer Gruppen-Frames
///
/// Passt zu `tokio_util::udp::UdpFramed`: jedes Datagramm wird einzeln
/// dekodiert.
#[derive(Debug, Clone)]
pub struct GroupFrameCodec {
    max_frame_size: usize,
}

impl GroupFrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for GroupFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for GroupFrameCodec {
    type Item = GroupFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        let frame: GroupFrame = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
            )
        })?;

        Ok(Some(frame))
    }
}

impl Encoder<GroupFrame> for GroupFrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: GroupFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
