//! Stromchiffre fuer Kanal-Nachrichten (ChaCha20, 96-Bit IV)
//!
//! Chiffretext ist exakt so lang wie der Klartext. Die Integritaet wird
//! separat ueber `mac::hmac` gesichert.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{Iv, IV_LEN, SYMMETRIC_KEY_LEN};

fn apply(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    if key.len() != SYMMETRIC_KEY_LEN {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: SYMMETRIC_KEY_LEN,
            erhalten: key.len(),
        });
    }
    if iv.len() != IV_LEN {
        return Err(CryptoError::UngueltigeIvLaenge {
            erwartet: IV_LEN,
            erhalten: iv.len(),
        });
    }
    let mut cipher = ChaCha20::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;
    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

/// Verschluesselt einen Klartext mit Kanal-Schluessel und frischem IV
pub fn stream_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    apply(key, iv, plaintext)
}

/// Entschluesselt einen Chiffretext
pub fn stream_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    apply(key, iv, ciphertext)
}

struct IvZustand {
    praefix: [u8; 8],
    zaehler: u32,
}

/// Prozessweiter IV-Generator
///
/// Aufbau: `[zufaelliges Praefix(8)] + [Zaehler(4, big-endian)]`. Das Praefix
/// wird einmal beim Start aus dem OS-Zufall gezogen und beim Ueberlauf des
/// Zaehlers neu gezogen, damit kein IV unter einem Schluessel doppelt vorkommt.
pub struct IvGenerator {
    zustand: Mutex<IvZustand>,
}

impl IvGenerator {
    pub fn new() -> Self {
        Self {
            zustand: Mutex::new(IvZustand {
                praefix: zufalls_praefix(),
                zaehler: 0,
            }),
        }
    }

    /// Liefert den naechsten, noch nie ausgegebenen IV
    pub fn next_iv(&self) -> Iv {
        let mut zustand = self.zustand.lock();
        let mut iv = [0u8; IV_LEN];
        iv[..8].copy_from_slice(&zustand.praefix);
        iv[8..].copy_from_slice(&zustand.zaehler.to_be_bytes());

        match zustand.zaehler.checked_add(1) {
            Some(naechster) => zustand.zaehler = naechster,
            None => {
                tracing::debug!("IV-Zaehler uebergelaufen, ziehe neues Praefix");
                zustand.praefix = zufalls_praefix();
                zustand.zaehler = 0;
            }
        }
        iv
    }
}

impl Default for IvGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn zufalls_praefix() -> [u8; 8] {
    let mut praefix = [0u8; 8];
    OsRng.fill_bytes(&mut praefix);
    praefix
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
