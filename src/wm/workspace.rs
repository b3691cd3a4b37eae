//! Workspace Module
//!
//! Workspace membership, per-workspace stacking order, sticky windows and
//! the icon list. Managed windows talk to it through [`WorkspaceHost`].

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::shared::Size;
use crate::wm::connection::Window;
use crate::wm::directory::ClientId;

/// Collaborator owning workspace membership and stacking.
pub trait WorkspaceHost {
    fn current_workspace(&self) -> usize;

    fn workspace_count(&self) -> usize;

    /// Add a window on top of `workspace`'s stack. Out of range indices fall
    /// back to the current workspace. Returns the workspace joined.
    fn join(&mut self, workspace: usize, id: ClientId, frame: Window) -> usize;

    fn leave(&mut self, id: ClientId);

    /// Move a window from `workspace` to the current workspace unless it is
    /// stuck. Returns the window's workspace afterwards.
    fn reassociate(&mut self, id: ClientId, workspace: usize, stuck: bool) -> usize;

    /// Raise within its workspace; returns that workspace's frames, top first.
    fn raise(&mut self, id: ClientId) -> Vec<Window>;

    /// Lower within its workspace; returns that workspace's frames, top first.
    fn lower(&mut self, id: ClientId) -> Vec<Window>;

    fn set_sticky(&mut self, id: ClientId, stuck: bool);

    fn screen_size(&self) -> Size;

    /// Height reserved at the bottom of the screen (toolbar).
    fn reserved_height(&self) -> u32;

    /// True while pre-existing windows are being adopted.
    fn starting_up(&self) -> bool;

    fn add_icon(&mut self, id: ClientId, label: &str);

    fn remove_icon(&mut self, id: ClientId);

    fn relabel_icon(&mut self, id: ClientId, label: &str);

    fn window_renamed(&mut self, id: ClientId, title: &str);
}

/// In-memory workspace host.
#[derive(Debug)]
pub struct Workspaces {
    current: usize,
    /// Per workspace: (window, frame), top of the stack first.
    stacks: Vec<Vec<(ClientId, Window)>>,
    sticky: HashSet<ClientId>,
    icons: Vec<(ClientId, String)>,
    screen: Size,
    reserved_height: u32,
    starting_up: bool,
}

impl Workspaces {
    pub fn new(count: usize, screen: Size, reserved_height: u32) -> Self {
        let count = count.max(1);
        Self {
            current: 0,
            stacks: vec![Vec::new(); count],
            sticky: HashSet::new(),
            icons: Vec::new(),
            screen,
            reserved_height,
            starting_up: true,
        }
    }

    pub fn finish_startup(&mut self) {
        self.starting_up = false;
    }

    /// Workspace a window currently belongs to.
    pub fn workspace_of(&self, id: ClientId) -> Option<usize> {
        self.stacks
            .iter()
            .position(|stack| stack.iter().any(|(member, _)| *member == id))
    }

    /// Frames of `workspace`, top of the stack first.
    pub fn stacking(&self, workspace: usize) -> Vec<Window> {
        self.stacks
            .get(workspace)
            .map(|stack| stack.iter().map(|(_, frame)| *frame).collect())
            .unwrap_or_default()
    }

    pub fn icons(&self) -> impl Iterator<Item = (ClientId, &str)> {
        self.icons.iter().map(|(id, label)| (*id, label.as_str()))
    }

    pub fn is_sticky(&self, id: ClientId) -> bool {
        self.sticky.contains(&id)
    }

    fn take(&mut self, id: ClientId) -> Option<(usize, (ClientId, Window))> {
        for (index, stack) in self.stacks.iter_mut().enumerate() {
            if let Some(pos) = stack.iter().position(|(member, _)| *member == id) {
                return Some((index, stack.remove(pos)));
            }
        }
        None
    }
}

impl WorkspaceHost for Workspaces {
    fn current_workspace(&self) -> usize {
        self.current
    }

    fn workspace_count(&self) -> usize {
        self.stacks.len()
    }

    fn join(&mut self, workspace: usize, id: ClientId, frame: Window) -> usize {
        let workspace = if workspace < self.stacks.len() {
            workspace
        } else {
            warn!("Invalid workspace index: {} (max: {})", workspace, self.stacks.len() - 1);
            self.current
        };
        self.take(id);
        self.stacks[workspace].insert(0, (id, frame));
        debug!("Window {:#x} joined workspace {}", id.0, workspace);
        workspace
    }

    fn leave(&mut self, id: ClientId) {
        self.take(id);
        self.sticky.remove(&id);
    }

    fn reassociate(&mut self, id: ClientId, workspace: usize, stuck: bool) -> usize {
        if stuck || workspace == self.current {
            return workspace;
        }
        match self.take(id) {
            Some((_, entry)) => {
                self.stacks[self.current].insert(0, entry);
                debug!("Window {:#x} reassociated with workspace {}", id.0, self.current);
                self.current
            }
            None => workspace,
        }
    }

    fn raise(&mut self, id: ClientId) -> Vec<Window> {
        match self.take(id) {
            Some((index, entry)) => {
                self.stacks[index].insert(0, entry);
                self.stacking(index)
            }
            None => Vec::new(),
        }
    }

    fn lower(&mut self, id: ClientId) -> Vec<Window> {
        match self.take(id) {
            Some((index, entry)) => {
                self.stacks[index].push(entry);
                self.stacking(index)
            }
            None => Vec::new(),
        }
    }

    fn set_sticky(&mut self, id: ClientId, stuck: bool) {
        if stuck {
            self.sticky.insert(id);
        } else {
            self.sticky.remove(&id);
        }
    }

    fn screen_size(&self) -> Size {
        self.screen
    }

    fn reserved_height(&self) -> u32 {
        self.reserved_height
    }

    fn starting_up(&self) -> bool {
        self.starting_up
    }

    fn add_icon(&mut self, id: ClientId, label: &str) {
        self.remove_icon(id);
        self.icons.push((id, label.to_string()));
    }

    fn remove_icon(&mut self, id: ClientId) {
        self.icons.retain(|(member, _)| *member != id);
    }

    fn relabel_icon(&mut self, id: ClientId, label: &str) {
        if let Some(entry) = self.icons.iter_mut().find(|(member, _)| *member == id) {
            entry.1 = label.to_string();
        }
    }

    fn window_renamed(&mut self, id: ClientId, title: &str) {
        debug!("Window {:#x} renamed to {:?}", id.0, title);
    }
}
