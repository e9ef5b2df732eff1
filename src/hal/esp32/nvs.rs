//! Configuration storage over NVS.
//!
//! All keys live in the `config` namespace (see [`crate::config::keys`]).
//! NVS commits each set/erase individually, which gives the per-key
//! atomicity the configuration record relies on.

use crate::config::keys;
use crate::traits::ConfigStore;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

/// [`ConfigStore`] backed by an NVS namespace handle.
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    /// Open the configuration namespace read-write.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be opened.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, keys::NAMESPACE, true)?;
        Ok(Self { nvs })
    }
}

impl ConfigStore for NvsStore {
    type Error = EspError;

    fn get_str(&self, key: &str) -> Result<Option<alloc::string::String>, EspError> {
        // The longest stored value is the broker URI at 128 bytes.
        let mut buf = [0u8; 160];
        Ok(self
            .nvs
            .get_str(key, &mut buf)?
            .map(alloc::string::ToString::to_string))
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), EspError> {
        self.nvs.set_str(key, value)
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>, EspError> {
        self.nvs.get_u8(key)
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), EspError> {
        self.nvs.set_u8(key, value)
    }

    fn erase(&mut self, key: &str) -> Result<(), EspError> {
        // remove() reports whether the key existed; absence is fine here.
        self.nvs.remove(key)?;
        Ok(())
    }
}
