//! Vertrauensliste und Blacklist
//!
//! Vertrauenseintraege (Fingerprint -> Adresse) und gesperrte Adressen
//! wachsen waehrend einer Sitzung nur an: ein Eintrag wird nach dem Anlegen
//! nie geaendert und erst mit dem Prozessende verworfen.
//!
//! Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.

use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use vouch_core::{Fingerprint, PeerAddress};

#[derive(Clone, Default)]
pub struct TrustStore {
    inner: Arc<TrustStoreInner>,
}

#[derive(Default)]
struct TrustStoreInner {
    vertraut: DashMap<Fingerprint, PeerAddress>,
    gesperrt: DashSet<PeerAddress>,
}

impl TrustStore {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen Vertrauenseintrag an
    ///
    /// Gibt `false` zurueck, wenn der Fingerprint schon vertraut war; der
    /// bestehende Eintrag bleibt dann unveraendert.
    pub fn trust(&self, fingerprint: Fingerprint, adresse: PeerAddress) -> bool {
        match self.inner.vertraut.entry(fingerprint) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(eintrag) => {
                eintrag.insert(adresse);
                tracing::info!(
                    fingerprint = %fingerprint.kurz(),
                    adresse = %adresse,
                    "Mitglied in Vertrauensliste aufgenommen"
                );
                true
            }
        }
    }

    pub fn is_trusted(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.vertraut.contains_key(fingerprint)
    }

    /// Netzwerk-Adresse, unter der ein Mitglied vertraut wurde
    pub fn address_of(&self, fingerprint: &Fingerprint) -> Option<PeerAddress> {
        self.inner.vertraut.get(fingerprint).map(|e| *e.value())
    }

    /// Sperrt eine Adresse dauerhaft
    pub fn ban(&self, adresse: PeerAddress) {
        if self.inner.gesperrt.insert(adresse) {
            tracing::info!(adresse = %adresse, "Absender dauerhaft gesperrt");
        }
    }

    pub fn is_banned(&self, adresse: &PeerAddress) -> bool {
        self.inner.gesperrt.contains(adresse)
    }

    /// Anzahl vertrauter Mitglieder
    pub fn len(&self) -> usize {
        self.inner.vertraut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.vertraut.is_empty()
    }

    pub fn gesperrt_anzahl(&self) -> usize {
        self.inner.gesperrt.len()
    }
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("vertraut", &self.len())
            .field("gesperrt", &self.gesperrt_anzahl())
            .finish()
    }
}
