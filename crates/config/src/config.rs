use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::default::{
    get_default_healthy, get_default_log, get_default_log_level, get_default_policy,
    get_default_version, get_default_weight,
};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default = "get_default_version")]
    pub version: u32,

    #[serde(default = "get_default_log")]
    pub log: Log,

    // key = director name
    #[serde(default)]
    pub directors: BTreeMap<String, Director>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Director {
    #[serde(default = "get_default_policy")]
    pub policy: String, // round-robin | least-connections | fallback

    // least-connections only, 0 = uncapped
    #[serde(default)]
    pub max_connections: u32,

    // fallback only
    #[serde(default)]
    pub sticky: bool,

    #[serde(default)]
    pub backends: Vec<Backend>,
}

impl Default for Director {
    fn default() -> Self {
        Self {
            policy: get_default_policy(),
            max_connections: 0,
            sticky: false,
            backends: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Backend {
    pub name: String,

    #[serde(default)]
    pub address: String, // "10.0.0.1:8080"

    #[serde(default = "get_default_weight")]
    pub weight: f64,

    // initial state of the in-memory backend
    #[serde(default = "get_default_healthy")]
    pub healthy: bool,

    // 0 = unlimited
    #[serde(default)]
    pub max_conns: u32,

    #[serde(default)]
    pub active: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Log {
    #[serde(default = "get_default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error", "off"

    #[serde(default)]
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        get_default_log()
    }
}
