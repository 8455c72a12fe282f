use serde::Deserialize;

use crate::error::{Result, StanzaError};
use crate::id::{SequentialIdGenerator, DEFAULT_PREFIX_LEN};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StanzaConfig {
    pub version: u32,

    #[serde(default)]
    pub ids: IdSection,
}

impl StanzaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(StanzaError::UnsupportedVersion);
        }
        self.ids.validate()
    }

    /// Build the id generator described by the `ids` section.
    pub fn id_generator(&self) -> SequentialIdGenerator {
        match &self.ids.prefix {
            Some(prefix) => SequentialIdGenerator::with_prefix(prefix.clone()),
            None => SequentialIdGenerator::with_random_prefix(self.ids.prefix_len),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdSection {
    /// Fixed prefix; when absent a random one is drawn per generator.
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,
}

impl Default for IdSection {
    fn default() -> Self {
        Self {
            prefix: None,
            prefix_len: default_prefix_len(),
        }
    }
}

impl IdSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=32).contains(&self.prefix_len) {
            return Err(StanzaError::BadConfig(
                "ids.prefix_len must be between 1 and 32".into(),
            ));
        }
        if let Some(prefix) = &self.prefix {
            if prefix.is_empty() {
                return Err(StanzaError::BadConfig("ids.prefix must not be empty".into()));
            }
            // Ids end up in XML attributes verbatim.
            if prefix.contains(&['<', '>', '&', '\'', '"'][..]) {
                return Err(StanzaError::BadConfig(
                    "ids.prefix must not contain XML-sensitive characters".into(),
                ));
            }
        }
        Ok(())
    }
}

fn default_prefix_len() -> usize {
    DEFAULT_PREFIX_LEN
}
