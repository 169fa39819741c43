//! Topology Composer CLI
//!
//! Composes the log-analytics deployment profile (and optionally the
//! bastion access profile) into one provider template.
//!
//! Run with: cargo run --bin composer -- [output.json]
//!
//! Configuration:
//! 1. COMPOSER_CONFIG: optional path to a JSON configuration file
//!    overriding the documented profile defaults
//! 2. COMPOSER_SCRIPTS_DIR: optional directory holding the per-tier boot
//!    scripts copied verbatim into instance payloads
//!
//! Without an output path the template is written to stdout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use topology_composer::profiles::{AccessProfile, AccessProfileConfig, BootstrapScripts, LoggingProfile, LoggingProfileConfig};
use topology_composer::{NetworkContext, Topology};

/// Top-level configuration for one composer run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ComposerConfig {
    /// Template description
    description: String,
    /// Base CIDR of the VPC the tiers deploy into
    vpc_base_cidr: String,
    /// Compose the bastion access tier into the same template
    include_access: bool,
    logging: LoggingProfileConfig,
    access: AccessProfileConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            description: "Log analytics environment".to_string(),
            vpc_base_cidr: "10.0.0.0/16".to_string(),
            include_access: false,
            logging: LoggingProfileConfig::default(),
            access: AccessProfileConfig::default(),
        }
    }
}

impl ComposerConfig {
    /// Load configuration from the COMPOSER_CONFIG file, if set.
    fn from_env() -> Result<Self> {
        match std::env::var("COMPOSER_CONFIG") {
            Ok(path) => {
                let body = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read configuration file {path}"))?;
                serde_json::from_str(&body)
                    .with_context(|| format!("failed to parse configuration file {path}"))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Read one boot script from the scripts directory, empty when absent.
fn read_script(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(&path).with_context(|| format!("failed to read boot script {}", path.display()))
}

/// Load the per-tier boot scripts from COMPOSER_SCRIPTS_DIR, if set.
fn scripts_from_env() -> Result<(BootstrapScripts, String)> {
    let dir = match std::env::var("COMPOSER_SCRIPTS_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return Ok((BootstrapScripts::default(), String::new())),
    };
    let scripts = BootstrapScripts {
        search: read_script(&dir, "elasticsearch.sh")?,
        dashboard: read_script(&dir, "kibana.sh")?,
        indexer: read_script(&dir, "logstash-indexer.sh")?,
        scheduler: read_script(&dir, "scheduler.sh")?,
        snapshot_tool: read_script(&dir, "elasticsearch.snapshot.py")?,
    };
    let bastion = read_script(&dir, "bastion.sh")?;
    Ok((scripts, bastion))
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ComposerConfig::from_env()?;
    let (scripts, bastion_script) = scripts_from_env()?;
    info!("🚀 Composing topology: {}", config.description);

    let mut topology = Topology::with_description(&config.description);
    let network = NetworkContext::from_parameters(&mut topology, &config.vpc_base_cidr)?;

    // The access tier composes first so the log-analytics tiers pair
    // against the bastion group resource instead of importing it.
    if config.include_access {
        let access = AccessProfile {
            config: config.access,
            bootstrap: bastion_script,
        };
        access.compose(&mut topology, &network)?;
        info!("✅ Composed bastion access tier");
    }

    let profile = LoggingProfile {
        config: config.logging,
        scripts,
    };
    let built = profile.compose(&mut topology, &network)?;
    info!("✅ Composed tiers: {}", built.tier_names().join(", "));

    let template = topology.to_json_string()?;
    match std::env::args().nth(1) {
        Some(path) => {
            fs::write(&path, &template)
                .with_context(|| format!("failed to write template to {path}"))?;
            info!("📝 Wrote template to {path}");
        }
        None => println!("{template}"),
    }
    Ok(())
}
