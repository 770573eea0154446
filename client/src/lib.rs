//! vouch-client – Konsolen-Client
//!
//! Verdrahtet Konfiguration, UDP-Multicast-Transport, Protokoll-Engine und
//! Zeilen-Konsole.

pub mod config;
pub mod console;
pub mod logging;
pub mod udp;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use vouch_crypto::Identity;
use vouch_engine::{ProtocolEngine, DELIVERY_QUEUE_GROESSE};

use config::ClientConfig;
use console::{ereignis_anzeigen, Fluss, Konsole};
use udp::{UdpEinstellungen, UdpGroupTransport};

/// Laufender Client
pub struct Client {
    pub config: ClientConfig,
}

impl Client {
    pub fn neu(config: ClientConfig) -> Self {
        Self { config }
    }

    fn identitaet(&self) -> Result<Identity> {
        match &self.config.identitaet.privater_schluessel {
            Some(text) => Identity::from_base64(text.trim())
                .context("identitaet.privater_schluessel ist ungueltig"),
            None => Ok(Identity::generate()),
        }
    }

    /// Startet Netzwerk-Task und Konsole; laeuft bis `/quit`, EOF oder Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let identitaet = self.identitaet()?;
        let oeffentlich = identitaet.public_key();

        let (tx, rx) = mpsc::channel(DELIVERY_QUEUE_GROESSE);
        let transport = Arc::new(UdpGroupTransport::neu(
            UdpEinstellungen {
                gruppe: self.config.gruppen_adresse(),
                bind: self.config.bind_adresse(),
                ttl: self.config.netzwerk.ttl,
                max_datagramm: self.config.netzwerk.max_datagramm,
            },
            tx,
        ));

        let (engine, mut events) =
            ProtocolEngine::neu(identitaet, transport, self.config.engine_config());
        engine.set_nick(&self.config.identitaet.nick)?;

        tracing::info!(
            gruppe = %self.config.gruppen_adresse(),
            fingerprint = %oeffentlich.fingerprint().kurz(),
            "Client startet"
        );
        println!("> Eigener Schluessel: {}", oeffentlich.to_base64());
        println!("> Fingerprint: {}", oeffentlich.fingerprint().kurz());

        let netzwerk = tokio::spawn(engine.clone().run(rx));
        let anzeige = tokio::spawn(async move {
            while let Some(ereignis) = events.recv().await {
                println!("{}", ereignis_anzeigen(&ereignis));
            }
        });

        let mut konsole = Konsole::neu(engine.clone());
        let mut zeilen = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{}", konsole.aufforderung());
            std::io::stdout().flush()?;

            tokio::select! {
                zeile = zeilen.next_line() => {
                    let Some(zeile) = zeile? else {
                        tracing::info!("Eingabe beendet");
                        break;
                    };
                    if konsole.zeile(&zeile).await == Fluss::Ende {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C empfangen, Client wird beendet");
                    break;
                }
            }
        }

        engine.quit().await?;
        netzwerk.abort();
        anzeige.abort();
        Ok(())
    }
}
