//! Stanza core config loader (strict parsing).

pub mod schema;

use std::fs;

use crate::error::{Result, StanzaError};

pub use schema::{IdSection, StanzaConfig};

pub fn load_from_file(path: &str) -> Result<StanzaConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| StanzaError::BadConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<StanzaConfig> {
    let cfg: StanzaConfig = serde_yaml::from_str(s)
        .map_err(|e| StanzaError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    tracing::debug!(
        prefix = ?cfg.ids.prefix,
        prefix_len = cfg.ids.prefix_len,
        "stanza config loaded"
    );
    Ok(cfg)
}
