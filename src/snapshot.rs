use std::sync::{Arc, PoisonError, RwLock};

use crate::core::DisplayState;

/// Holds the latest [`DisplayState`], replaced whole on every update.
///
/// Readers get an `Arc` to an immutable value, so they never see a partial update
/// and never hold the lock for longer than a pointer copy.
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    current: RwLock<Arc<DisplayState>>,
}

impl StateCell {
    pub(crate) fn load(&self) -> Arc<DisplayState> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn store(&self, state: DisplayState) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Charset, ModuleStatus, Status};

    #[test]
    fn earlier_snapshots_unaffected() {
        let cell = StateCell::default();
        let before = cell.load();
        let status = Status {
            modules: vec![ModuleStatus::at_flap(1)],
            ..Status::default()
        };
        cell.store(DisplayState::new(status, &Charset::default()));
        assert_eq!(None, before.module_count());
        assert_eq!("a", cell.load().text());
    }
}
