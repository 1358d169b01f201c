//! Configuration persistence.
//!
//! The controller asks the store to save after every configuration change
//! and does not care whether that succeeds. Loading happens once at
//! startup, before the controller is built.

pub mod propfile;

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ScaleConfig;

pub use propfile::{parse_config, parse_propfile, render_config, PropFileStore, CONFIG_FILE_NAME};

/// Errors from a configuration store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing storage for [`ScaleConfig`].
pub trait ConfigStore {
    /// Read the stored configuration, falling back to defaults when
    /// nothing has been stored yet.
    fn load(&mut self) -> StoreResult<ScaleConfig>;

    /// Persist `config`.
    fn save(&mut self, config: &ScaleConfig) -> StoreResult<()>;
}

/// Store that never persists anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl ConfigStore for NullStore {
    fn load(&mut self) -> StoreResult<ScaleConfig> {
        Ok(ScaleConfig::default())
    }

    fn save(&mut self, _config: &ScaleConfig) -> StoreResult<()> {
        Ok(())
    }
}

/// Shared record of every configuration a [`MemoryStore`] was asked to save.
pub type SaveHistory = Rc<RefCell<Vec<ScaleConfig>>>;

/// In-memory store. Keeps the last saved config and a save history that
/// can be inspected after the store has been handed to a controller.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: ScaleConfig,
    history: SaveHistory,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(config: ScaleConfig) -> Self {
        Self {
            config,
            history: SaveHistory::default(),
            fail_saves: false,
        }
    }

    /// Store whose saves always fail. Attempts are still recorded.
    pub fn failing(config: ScaleConfig) -> Self {
        Self {
            fail_saves: true,
            ..Self::new(config)
        }
    }

    pub fn history(&self) -> SaveHistory {
        Rc::clone(&self.history)
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> StoreResult<ScaleConfig> {
        Ok(self.config)
    }

    fn save(&mut self, config: &ScaleConfig) -> StoreResult<()> {
        self.history.borrow_mut().push(*config);
        if self.fail_saves {
            return Err(StoreError::Unavailable("memory store is read-only".to_string()));
        }
        self.config = *config;
        Ok(())
    }
}
