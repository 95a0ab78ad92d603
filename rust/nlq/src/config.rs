use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8490;
const DEFAULT_TABLE: &str = "incident";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub api_key: Option<String>,
    pub default_table: String,
    /// `None` accepts any well-formed table name.
    pub allowed_tables: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    nlq_listen_addr: Option<String>,
    #[serde(default)]
    nlq_listen_host: Option<String>,
    #[serde(default)]
    nlq_listen_port: Option<u16>,
    #[serde(default)]
    nlq_api_key: Option<String>,
    #[serde(default = "default_table")]
    nlq_default_table: String,
    #[serde(default)]
    nlq_allowed_tables: Option<String>,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse NLQ_* environment variables")?;
        Self::from_raw(raw)
    }

    /// Defaults for in-process use: loopback on an ephemeral port, no API key.
    pub fn embedded() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            api_key: None,
            default_table: default_table(),
            allowed_tables: None,
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.nlq_listen_addr,
            raw.nlq_listen_host,
            raw.nlq_listen_port,
        )?;

        let default_table = raw.nlq_default_table.trim().to_string();
        if default_table.is_empty() {
            anyhow::bail!("NLQ_DEFAULT_TABLE must not be empty");
        }

        let api_key = raw.nlq_api_key.filter(|key| !key.trim().is_empty());
        let allowed_tables = raw.nlq_allowed_tables.and_then(|csv| parse_csv(&csv));

        Ok(Self {
            listen_addr,
            api_key,
            default_table,
            allowed_tables,
        })
    }

    pub fn table_allowed(&self, table: &str) -> bool {
        self.allowed_tables
            .as_ref()
            .map_or(true, |tables| tables.iter().any(|allowed| allowed == table))
    }
}

fn parse_csv(csv: &str) -> Option<Vec<String>> {
    let entries: Vec<_> = csv
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();
    (!entries.is_empty()).then_some(entries)
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid NLQ_LISTEN_ADDR value")?
            .next()
            .context("NLQ_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = port.unwrap_or(DEFAULT_PORT);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid NLQ listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw() -> RawConfig {
        RawConfig {
            nlq_listen_addr: None,
            nlq_listen_host: None,
            nlq_listen_port: None,
            nlq_api_key: None,
            nlq_default_table: default_table(),
            nlq_allowed_tables: None,
        }
    }

    #[test]
    fn defaults() {
        let config = AppConfig::from_raw(raw()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8490".parse::<SocketAddr>().unwrap());
        assert_eq!(config.default_table, "incident");
        assert_eq!(config.api_key, None);
        assert!(config.table_allowed("anything"));
    }

    #[test]
    fn explicit_addr_wins_over_host_and_port() {
        let config = AppConfig::from_raw(RawConfig {
            nlq_listen_addr: Some("127.0.0.1:9000".into()),
            nlq_listen_port: Some(1234),
            ..raw()
        })
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let config = AppConfig::from_raw(RawConfig {
            nlq_listen_host: Some("127.0.0.1".into()),
            nlq_listen_port: Some(1234),
            ..raw()
        })
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:1234".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn allow_list_skips_blank_entries() {
        let config = AppConfig::from_raw(RawConfig {
            nlq_allowed_tables: Some(" incident, ,change_request,".into()),
            ..raw()
        })
        .unwrap();
        assert_eq!(
            config.allowed_tables,
            Some(vec!["incident".to_string(), "change_request".to_string()])
        );
        assert!(config.table_allowed("change_request"));
        assert!(!config.table_allowed("kb_knowledge"));

        let config = AppConfig::from_raw(RawConfig {
            nlq_allowed_tables: Some(" , ".into()),
            ..raw()
        })
        .unwrap();
        assert_eq!(config.allowed_tables, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_raw(RawConfig {
            nlq_default_table: "  ".into(),
            ..raw()
        })
        .is_err());
        assert!(AppConfig::from_raw(RawConfig {
            nlq_listen_addr: Some("not an address".into()),
            ..raw()
        })
        .is_err());
    }
}
