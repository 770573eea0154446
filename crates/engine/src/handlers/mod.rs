//! Handler fuer die fuenf Umschlag-Varianten
//!
//! Jeder Handler prueft zuerst die Vorbedingung im Protokoll-Zustand und
//! verwirft unpassende Umschlaege als `StaleOrOutOfOrderEnvelope`, bevor
//! irgendeine Signatur oder ein MAC angefasst wird.

pub mod auth_acknowledge;
pub mod auth_request;
pub mod chat;
pub mod key;
pub mod key_exchange;
