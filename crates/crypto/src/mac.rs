//! HMAC-SHA256 ueber Kanal-Chiffretexte
//!
//! Schluessel sind die rohen Bytes der Passphrase. Die Pruefung schlaegt
//! geschlossen fehl: ein Mismatch ist immer `CryptoError::IntegrityFailure`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::types::MacTag;

type HmacSha256 = Hmac<Sha256>;

fn mac_fuer(passphrase: &str) -> CryptoResult<HmacSha256> {
    HmacSha256::new_from_slice(passphrase.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// Berechnet den Tag ueber `data`
pub fn hmac(passphrase: &str, data: &[u8]) -> CryptoResult<MacTag> {
    let mut mac = mac_fuer(passphrase)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Prueft den Tag in konstanter Zeit
pub fn hmac_verify(passphrase: &str, tag: &[u8], data: &[u8]) -> CryptoResult<()> {
    let mut mac = mac_fuer(passphrase)?;
    mac.update(data);
    mac.verify_slice(tag)
        .map_err(|_| CryptoError::IntegrityFailure)
}
