use std::collections::HashMap;

use parking_lot::RwLock;

use super::{StoreError, WatermarkBackend};

/// Process-lifetime watermarks, for one-shot runs and tests
#[derive(Default)]
pub struct MemoryWatermarks {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryWatermarks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatermarkBackend for MemoryWatermarks {
    fn load(&self, account_key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(account_key).cloned())
    }

    fn save(&self, account_key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .insert(account_key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, account_key: &str) -> Result<(), StoreError> {
        self.values.write().remove(account_key);
        Ok(())
    }
}
