//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vouch_engine::EngineConfig;

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Eigene Identitaet
    pub identitaet: IdentitaetEinstellungen,
    /// Multicast-Gruppe und Socket
    pub netzwerk: NetzwerkEinstellungen,
    /// Fristen der Handshakes
    pub handshake: HandshakeEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Identitaet des Knotens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitaetEinstellungen {
    /// Anfangs-Nickname
    pub nick: String,
    /// Privater Schluessel (base64); leer = bei jedem Start neu erzeugen
    pub privater_schluessel: Option<String>,
}

impl Default for IdentitaetEinstellungen {
    fn default() -> Self {
        Self {
            nick: "anonymous".into(),
            privater_schluessel: None,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Multicast-Gruppenadresse
    pub gruppe: Ipv4Addr,
    /// UDP-Port der Gruppe
    pub port: u16,
    /// Lokale Bind-Adresse
    pub bind_adresse: Ipv4Addr,
    /// Multicast-TTL (1 = nur lokales Netz)
    pub ttl: u32,
    /// Maximale Datagramm-Groesse in Bytes
    pub max_datagramm: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            gruppe: Ipv4Addr::new(239, 255, 42, 99),
            port: 47011,
            bind_adresse: Ipv4Addr::UNSPECIFIED,
            ttl: 1,
            max_datagramm: 60 * 1024,
        }
    }
}

/// Fristen fuer Zugangs- und Schluesselanfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeEinstellungen {
    pub auth_timeout_secs: u64,
    pub key_timeout_secs: u64,
}

impl Default for HandshakeEinstellungen {
    fn default() -> Self {
        Self {
            auth_timeout_secs: 20,
            key_timeout_secs: 10,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Herkunft der geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    Datei,
    /// Datei fehlt; das Logging ist noch nicht initialisiert, der Aufrufer meldet es
    Standard,
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok((config, ConfigQuelle::Datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigQuelle::Standard))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    fn pruefen(&self) -> anyhow::Result<()> {
        if !self.netzwerk.gruppe.is_multicast() {
            anyhow::bail!("netzwerk.gruppe {} ist keine Multicast-Adresse", self.netzwerk.gruppe);
        }
        if self.netzwerk.max_datagramm == 0 || self.netzwerk.max_datagramm > 65_507 {
            anyhow::bail!("netzwerk.max_datagramm muss zwischen 1 und 65507 liegen");
        }
        if self.handshake.auth_timeout_secs == 0 || self.handshake.key_timeout_secs == 0 {
            anyhow::bail!("Handshake-Fristen muessen groesser als 0 sein");
        }
        Ok(())
    }

    /// Ziel-Adresse fuer Gruppen-Datagramme
    pub fn gruppen_adresse(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.netzwerk.gruppe, self.netzwerk.port)
    }

    /// Lokale Bind-Adresse des Sockets
    pub fn bind_adresse(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            auth_timeout: Duration::from_secs(self.handshake.auth_timeout_secs),
            key_timeout: Duration::from_secs(self.handshake.key_timeout_secs),
        }
    }
}
