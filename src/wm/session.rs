//! Session Module
//!
//! The WM_STATE record persisted on every lifecycle transition so that a
//! restarted manager can put windows back where they were.

use crate::wm::client_flags::LifecycleState;

/// Contents of the WM_STATE property: `[state, icon, workspace]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRecord {
    pub state: LifecycleState,
    pub icon: u32,
    pub workspace: u32,
}

/// A record read back from a client, possibly written by an older manager
/// that only stored the state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredState {
    pub state: u32,
    pub workspace: Option<u32>,
}

impl StateRecord {
    pub fn new(state: LifecycleState, workspace: usize) -> Self {
        Self {
            state,
            icon: 0,
            workspace: workspace as u32,
        }
    }

    pub fn to_words(&self) -> [u32; 3] {
        [self.state.to_icccm(), self.icon, self.workspace]
    }
}

impl StoredState {
    /// The workspace word is only trusted when the full record is present.
    pub fn from_words(words: &[u32]) -> Option<Self> {
        let state = *words.first()?;
        let workspace = if words.len() == 3 { Some(words[2]) } else { None };
        Some(Self { state, workspace })
    }

    /// Stored Normal or Iconic state, if that is what the record holds.
    pub fn restorable(&self) -> Option<LifecycleState> {
        match self.state {
            1 => Some(LifecycleState::Normal),
            3 => Some(LifecycleState::Iconic),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let record = StateRecord::new(LifecycleState::Iconic, 2);
        assert_eq!(record.to_words(), [3, 0, 2]);
    }

    #[test]
    fn test_short_record_has_no_workspace() {
        let stored = StoredState::from_words(&[1]).unwrap();
        assert_eq!(stored.workspace, None);
        assert_eq!(stored.restorable(), Some(LifecycleState::Normal));
        assert!(StoredState::from_words(&[]).is_none());
        assert_eq!(StoredState::from_words(&[0, 0, 1]).unwrap().restorable(), None);
    }
}
