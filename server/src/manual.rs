use colorclock_types::ManualOverride;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Process-local manual result toggle. Lost on restart.
#[derive(Default)]
pub struct ManualOverrideCell {
    value: RwLock<ManualOverride>,
}

impl ManualOverrideCell {
    pub fn get(&self) -> ManualOverride {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: ManualOverride) {
        info!(enabled = value.enabled, "manual result override updated");
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}
