//! Owner of the live configuration value.

use std::sync::Arc;

use {
    duplex_store::{KvStore, SETTING_KEY},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result, link, migrate,
    schema::{ConfigField, Configuration},
    validate::{ValidationErrors, validate},
};

/// Holds the configuration and persists it through a [`KvStore`].
///
/// Starts out empty; populate with [`ConfigManager::load`] before handing
/// credentials to the synchronizer or relay.
pub struct ConfigManager {
    store: Arc<dyn KvStore>,
    config: Configuration,
}

impl ConfigManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            config: Configuration::default(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Link override first, durable store second. Returns whether anything
    /// was loaded.
    pub fn load(&mut self, link: Option<&str>) -> bool {
        if let Some(link) = link
            && self.load_from_link(link).is_some()
        {
            return true;
        }
        self.load_from_store().is_some()
    }

    /// Install the configuration carried by a shareable link.
    ///
    /// The link wins over anything stored and is persisted right away, so it
    /// only has to be opened once.
    pub fn load_from_link(&mut self, link: &str) -> Option<&Configuration> {
        let Some(config) = link::from_link(link) else {
            debug!("link does not carry a complete configuration");
            return None;
        };
        if let Err(e) = self.persist(&config) {
            warn!(error = %e, "failed to persist configuration from link");
        }
        info!(name = %config.name, "configuration loaded from link");
        self.config = config;
        Some(&self.config)
    }

    /// Read and migrate the persisted record. Absent, malformed and
    /// unknown-version records all yield `None`.
    pub fn load_from_store(&mut self) -> Option<&Configuration> {
        let raw = match self.store.get(SETTING_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored configuration");
                return None;
            },
            Err(e) => {
                warn!(error = %e, "failed to read stored configuration");
                return None;
            },
        };

        match migrate::load_record(&raw) {
            Ok(config) => {
                self.config = config;
                Some(&self.config)
            },
            Err(Error::MalformedRecord { message }) => {
                debug!(%message, "ignoring malformed stored configuration");
                None
            },
            Err(e) => {
                warn!(error = %e, "ignoring stored configuration");
                None
            },
        }
    }

    /// Trim `value` and replace exactly that field.
    pub fn update(&mut self, field: ConfigField, value: &str) {
        self.config.set(field, value.trim());
    }

    pub fn validate(&self) -> ValidationErrors {
        validate(&self.config)
    }

    /// Persist at the current schema version, unless validation fails.
    pub fn save(&self) -> Result<()> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }
        self.persist(&self.config)
    }

    pub fn is_complete(&self) -> bool {
        self.config.is_complete()
    }

    pub fn to_shareable_link(&self, base_url: &str) -> Result<String> {
        link::to_shareable_link(&self.config, base_url)
    }

    fn persist(&self, config: &Configuration) -> Result<()> {
        let record = migrate::to_record(config)?;
        self.store.set(SETTING_KEY, &record)?;
        debug!("configuration saved");
        Ok(())
    }
}
