//! Base64-Darstellung der Byte-Felder in der JSON-Form der Umschlaege

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn decode<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(d)?;
    BASE64.decode(text.as_bytes()).map_err(D::Error::custom)
}

pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        decode(d)
    }
}

/// Feste Laenge (IV, MAC-Tag)
pub mod array {
    use super::*;

    pub fn serialize<S: Serializer, const N: usize>(v: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = decode(d)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::custom(format!("erwartet {N} Bytes, erhalten {len}")))
    }
}

/// Komprimierter SEC1-Punkt
pub mod public_key {
    use super::*;
    use vouch_crypto::PublicKey;

    pub fn serialize<S: Serializer>(v: &PublicKey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_base64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PublicKey, D::Error> {
        PublicKey::from_bytes(&decode(d)?).map_err(D::Error::custom)
    }
}

/// ECDSA-Signatur als Objekt `{ "r": .., "s": .. }`
pub mod signature {
    use super::*;
    use vouch_crypto::EcdsaSignature;

    #[derive(Serialize, Deserialize)]
    struct Skalare {
        #[serde(with = "super::array")]
        r: [u8; 32],
        #[serde(with = "super::array")]
        s: [u8; 32],
    }

    pub fn serialize<S: Serializer>(v: &EcdsaSignature, s: S) -> Result<S::Ok, S::Error> {
        Skalare { r: v.r, s: v.s }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EcdsaSignature, D::Error> {
        let Skalare { r, s } = Skalare::deserialize(d)?;
        Ok(EcdsaSignature { r, s })
    }
}
