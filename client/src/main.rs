//! vouch – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet die Konsole.

use anyhow::Result;
use vouch_client::config::{ClientConfig, ConfigQuelle};
use vouch_client::{logging, Client};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("VOUCH_CONFIG").unwrap_or_else(|_| "vouch.toml".into());

    let (config, quelle) = ClientConfig::laden(&config_pfad)?;

    logging::logging_initialisieren(&config.logging.level, &config.logging.format);
    if quelle == ConfigQuelle::Standard {
        tracing::warn!(
            pfad = %config_pfad,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }
    if !logging::log_format_gueltig(&config.logging.format) {
        tracing::warn!(format = %config.logging.format, "Unbekanntes Log-Format, verwende text");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "vouch wird initialisiert"
    );

    Client::neu(config).starten().await
}
