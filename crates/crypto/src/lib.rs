//! # vouch-crypto
//!
//! Kryptografische Bausteine des Kanal-Protokolls. Alle Operationen sind
//! zustandslose Funktionen ueber Byte-Puffern (ausser dem IV-Generator).
//!
//! ## Module
//! - `keys` - Identitaet (secp256k1) und KeyCodec (komprimierte SEC1-Form, Base64)
//! - `signing` - ECDSA-Signaturen und die Signatur-Domaene (Felder + Passphrase)
//! - `key_wrap` - ECIES-aehnliches Einwickeln des Kanal-Schluessels
//! - `stream` - Stromchiffre (ChaCha20) und IV-Generator
//! - `mac` - HMAC ueber die Passphrase
//! - `types` - Gemeinsame Typen (SecretBytes, Iv, EcdsaSignature)
//! - `error` - Fehlertypen

pub mod error;
pub mod key_wrap;
pub mod keys;
pub mod mac;
pub mod signing;
pub mod stream;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use key_wrap::{generate_symmetric_key, hkdf_derive, unwrap_key, wrap_key};
pub use keys::{Identity, PublicKey};
pub use mac::{hmac, hmac_verify};
pub use signing::{sign, signing_domain, verify};
pub use stream::{stream_decrypt, stream_encrypt, IvGenerator};
pub use types::{EcdsaSignature, Iv, MacTag, SecretBytes, IV_LEN, SYMMETRIC_KEY_LEN};
