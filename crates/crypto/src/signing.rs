//! ECDSA-Signaturen (secp256k1, SHA-256)
//!
//! Jede signierte Nachricht deckt die Verkettung ihrer Schluessel-Felder plus
//! die Passphrase ab. Die Passphrase wird nie uebertragen; ohne sie laesst
//! sich keine gueltige Signatur erzeugen oder pruefen.
//!
//! ```text
//! sign(priv, pubkey || [aux_bytes] || passphrase)
//! ```

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::Signature;

use crate::keys::{Identity, PublicKey};
use crate::types::EcdsaSignature;

/// Baut die Signatur-Domaene: alle Felder in Reihenfolge, dann die Passphrase
pub fn signing_domain(felder: &[&[u8]], passphrase: &str) -> Vec<u8> {
    let laenge = felder.iter().map(|f| f.len()).sum::<usize>() + passphrase.len();
    let mut data = Vec::with_capacity(laenge);
    for feld in felder {
        data.extend_from_slice(feld);
    }
    data.extend_from_slice(passphrase.as_bytes());
    data
}

/// Signiert Daten mit dem privaten Schluessel der Identity
pub fn sign(identity: &Identity, data: &[u8]) -> EcdsaSignature {
    let signature: Signature = identity.signing_key().sign(data);
    let (r, s) = signature.split_bytes();
    EcdsaSignature {
        r: r.into(),
        s: s.into(),
    }
}

/// Verifiziert eine Signatur mit einem oeffentlichen Schluessel
pub fn verify(public_key: &PublicKey, data: &[u8], signature: &EcdsaSignature) -> bool {
    let Ok(signature) = Signature::from_scalars(signature.r, signature.s) else {
        return false;
    };
    public_key.verifying_key().verify(data, &signature).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signieren_und_verifizieren() {
        let identity = Identity::generate();
        let pk = identity.public_key();
        let data = signing_domain(&[&pk.to_bytes()], "pw");

        let sig = sign(&identity, &data);
        assert!(verify(&pk, &data, &sig));
    }

    #[test]
    fn jedes_gekippte_datenbyte_wird_abgelehnt() {
        let identity = Identity::generate();
        let pk = identity.public_key();
        let data = signing_domain(&[&pk.to_bytes()], "geheim");
        let sig = sign(&identity, &data);

        for i in 0..data.len() {
            let mut manipuliert = data.clone();
            manipuliert[i] ^= 0x01;
            assert!(!verify(&pk, &manipuliert, &sig), "Byte {i} nicht erkannt");
        }
    }

    #[test]
    fn falsche_passphrase_wird_abgelehnt() {
        let identity = Identity::generate();
        let pk = identity.public_key();
        let sig = sign(&identity, &signing_domain(&[&pk.to_bytes()], "pw"));

        assert!(!verify(&pk, &signing_domain(&[&pk.to_bytes()], "pW"), &sig));
        assert!(!verify(&pk, &signing_domain(&[&pk.to_bytes()], ""), &sig));
    }

    #[test]
    fn anderer_public_key_wird_abgelehnt() {
        let a = Identity::generate();
        let b = Identity::generate();
        let data = signing_domain(&[&a.public_key().to_bytes()], "pw");
        let sig = sign(&a, &data);

        assert!(!verify(&b.public_key(), &data, &sig));
    }

    #[test]
    fn manipulierte_signatur_wird_abgelehnt() {
        let identity = Identity::generate();
        let pk = identity.public_key();
        let data = b"Testdaten";
        let mut sig = sign(&identity, data);
        sig.s[31] ^= 0xFF;
        assert!(!verify(&pk, data, &sig));

        let null = EcdsaSignature {
            r: [0u8; 32],
            s: [0u8; 32],
        };
        assert!(!verify(&pk, data, &null));
    }

    #[test]
    fn domaene_verkettet_in_reihenfolge() {
        let data = signing_domain(&[b"ab", b"cd"], "ef");
        assert_eq!(data, b"abcdef");
    }
}
