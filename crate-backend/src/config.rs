use std::{
    net::{IpAddr, Ipv4Addr},
    path::Path,
};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_rust_log")]
    pub rust_log: String,

    pub database_url: String,

    #[serde(default)]
    pub listen: ListenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Load configuration from a toml file, overridable through
    /// `LYCEUM_`-prefixed environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LYCEUM_").split("__"))
            .extract()?;
        Ok(config)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

fn default_rust_log() -> String {
    "info".to_owned()
}

fn default_address() -> IpAddr {
    Ipv4Addr::LOCALHOST.into()
}

fn default_port() -> u16 {
    4000
}
