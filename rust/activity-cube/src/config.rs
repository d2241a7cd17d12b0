use crate::rules::{default_scenarios, TimeScenario};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub rule_scenarios: Vec<TimeScenario>,
    pub rules_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    activity_listen_addr: Option<String>,
    #[serde(default)]
    activity_listen_host: Option<String>,
    #[serde(default)]
    activity_listen_port: Option<u16>,
    #[serde(default)]
    activity_rule_scenarios: Option<String>,
    #[serde(default)]
    activity_rules_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse ACTIVITY_* environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.activity_listen_addr,
            raw.activity_listen_host,
            raw.activity_listen_port,
        )?;

        let rule_scenarios = match raw.activity_rule_scenarios.as_deref().map(str::trim) {
            Some(csv) if !csv.is_empty() => {
                TimeScenario::parse_list(csv).context("invalid ACTIVITY_RULE_SCENARIOS value")?
            }
            _ => default_scenarios(),
        };

        let rules_file = raw
            .activity_rules_file
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            listen_addr,
            rule_scenarios,
            rules_file,
        })
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid ACTIVITY_LISTEN_ADDR value")?
            .next()
            .context("ACTIVITY_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    let combined = format!("{}:{}", host, port);
    combined
        .to_socket_addrs()
        .context("invalid activity listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
