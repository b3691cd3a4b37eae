//! Window Directory
//!
//! Maps every window handle the manager cares about (clients and their
//! decoration windows) to the managed window that owns it, plus window
//! groups to their first registered member. Holds identifiers only.

use std::collections::HashMap;

use tracing::debug;

use crate::wm::connection::Window;

/// Identifier of a managed window: the handle of the wrapped client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub Window);

impl ClientId {
    pub fn window(self) -> Window {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct WindowDirectory {
    windows: HashMap<Window, ClientId>,
    groups: HashMap<Window, ClientId>,
}

impl WindowDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, window: Window, id: ClientId) {
        self.windows.insert(window, id);
    }

    pub fn unregister(&mut self, window: Window) {
        self.windows.remove(&window);
    }

    pub fn lookup(&self, window: Window) -> Option<ClientId> {
        self.windows.get(&window).copied()
    }

    /// Register `id` as the representative of `group` unless the group
    /// already has one.
    pub fn register_group(&mut self, group: Window, id: ClientId) {
        self.groups.entry(group).or_insert_with(|| {
            debug!("Window {:#x} leads group {:#x}", id.0, group);
            id
        });
    }

    /// Group representative other than `asking`.
    pub fn group_leader(&self, group: Window, asking: ClientId) -> Option<ClientId> {
        self.groups.get(&group).copied().filter(|leader| *leader != asking)
    }

    /// Drop the group entry if `id` is its representative.
    pub fn remove_group(&mut self, group: Window, id: ClientId) {
        if self.groups.get(&group) == Some(&id) {
            self.groups.remove(&group);
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_has_one_representative() {
        let mut dir = WindowDirectory::new();
        dir.register_group(0x50, ClientId(1));
        dir.register_group(0x50, ClientId(2));
        assert_eq!(dir.group_leader(0x50, ClientId(2)), Some(ClientId(1)));
        assert_eq!(dir.group_leader(0x50, ClientId(1)), None);

        dir.remove_group(0x50, ClientId(2));
        assert_eq!(dir.group_leader(0x50, ClientId(2)), Some(ClientId(1)));
        dir.remove_group(0x50, ClientId(1));
        assert_eq!(dir.group_leader(0x50, ClientId(2)), None);
    }
}
