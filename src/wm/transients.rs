//! Transients Module
//!
//! Transient-for resolution and the owner/child link between managed
//! windows. Links are stored as [`ClientId`]s and checked against the
//! instance table before use.

use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

use crate::wm::client::ManagedWindow;
use crate::wm::client_flags::LifecycleState;
use crate::wm::connection::Window;
use crate::wm::directory::ClientId;
use crate::wm::Ctx;

/// Read-only view of the other managed windows.
pub trait Peers {
    fn is_stuck(&self, id: ClientId) -> Option<bool>;

    fn lifecycle(&self, id: ClientId) -> Option<LifecycleState>;
}

impl Peers for HashMap<ClientId, ManagedWindow> {
    fn is_stuck(&self, id: ClientId) -> Option<bool> {
        self.get(&id).map(ManagedWindow::is_stuck)
    }

    fn lifecycle(&self, id: ClientId) -> Option<LifecycleState> {
        self.get(&id).map(ManagedWindow::lifecycle)
    }
}

/// Find the managed window `client` is transient for.
///
/// The reference must name another window. It resolves through the
/// directory, or, when it names the client's own group, to the group's
/// representative.
pub fn resolve_owner(
    ctx: &mut Ctx<'_>,
    client: Window,
    group: Option<Window>,
    id: ClientId,
) -> Result<Option<ClientId>> {
    let Some(target) = ctx.conn.transient_for(client)? else {
        return Ok(None);
    };
    if target == client {
        return Ok(None);
    }

    let owner = match ctx.directory.lookup(target) {
        Some(owner) if owner != id => Some(owner),
        _ if Some(target) == group => ctx.directory.group_leader(target, id),
        _ => None,
    };
    debug!("Window {:#x} transient for {:#x} resolves to {:?}", client, target, owner);
    Ok(owner)
}

/// Make `owner` point back at `child`.
pub fn link(clients: &mut HashMap<ClientId, ManagedWindow>, child: ClientId, owner: ClientId) {
    if let Some(window) = clients.get_mut(&owner) {
        window.transient_child = Some(child);
    }
}

/// Clear every reference to `id` held by its owner and child.
pub fn unlink(
    clients: &mut HashMap<ClientId, ManagedWindow>,
    id: ClientId,
    owner: Option<ClientId>,
    child: Option<ClientId>,
) {
    if let Some(window) = owner.and_then(|owner| clients.get_mut(&owner)) {
        if window.transient_child == Some(id) {
            window.transient_child = None;
        }
    }
    if let Some(window) = child.and_then(|child| clients.get_mut(&child)) {
        if window.transient_owner == Some(id) {
            window.transient_owner = None;
        }
    }
}
