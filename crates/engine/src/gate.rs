//! InteractionGate – Rendezvous zwischen Netzwerk- und Konsolen-Kontext
//!
//! Der Netzwerk-Kontext stellt eine Frage (`ask`) und wartet, bis der
//! Konsolen-Kontext eine Antwort veroeffentlicht (`publish`). Der Slot fasst
//! genau eine Antwort: sie geht nie verloren und wird genau einmal zugestellt.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use vouch_core::ConsoleEvent;

use crate::error::{EngineError, EngineResult};

pub struct InteractionGate {
    slot_tx: mpsc::Sender<String>,
    slot_rx: tokio::sync::Mutex<mpsc::Receiver<String>>,
    offene_frage: Mutex<Option<String>>,
    events: mpsc::UnboundedSender<ConsoleEvent>,
}

impl InteractionGate {
    pub fn neu(events: mpsc::UnboundedSender<ConsoleEvent>) -> Self {
        let (slot_tx, slot_rx) = mpsc::channel(1);
        Self {
            slot_tx,
            slot_rx: tokio::sync::Mutex::new(slot_rx),
            offene_frage: Mutex::new(None),
            events,
        }
    }

    /// Stellt eine Frage an den Bediener und wartet auf die Antwort
    ///
    /// Die Frage ist ab dem Aufruf ueber `pending_prompt` sichtbar, bevor das
    /// Prompt-Ereignis die Konsole erreicht.
    pub async fn ask(&self, frage: &str) -> EngineResult<String> {
        *self.offene_frage.lock() = Some(frage.to_string());
        let _ = self.events.send(ConsoleEvent::Prompt {
            frage: frage.to_string(),
        });
        let antwort = self.await_answer().await;
        *self.offene_frage.lock() = None;
        antwort
    }

    /// Wartet auf die naechste Antwort, verbraucht und leert den Slot
    pub async fn await_answer(&self) -> EngineResult<String> {
        let mut rx = self.slot_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| EngineError::Intern("InteractionGate geschlossen".to_string()))
    }

    /// Legt eine Antwort in den Slot und weckt genau einen Wartenden
    ///
    /// Ist der Slot noch belegt, wird die Antwort abgelehnt statt eine
    /// unverbrauchte Antwort zu ueberschreiben.
    pub fn publish(&self, antwort: impl Into<String>) -> EngineResult<()> {
        match self.slot_tx.try_send(antwort.into()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(EngineError::zustand(
                "Vorherige Antwort wurde noch nicht verarbeitet",
            )),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(EngineError::Intern("InteractionGate geschlossen".to_string()))
            }
        }
    }

    /// Aktuell offene Frage, falls der Netzwerk-Kontext wartet
    pub fn pending_prompt(&self) -> Option<String> {
        self.offene_frage.lock().clone()
    }
}
