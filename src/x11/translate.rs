//! Translation of x11rb events into [`WmEvent`]s.

use x11rb::protocol::shape::SK;
use x11rb::protocol::xproto::{AtomEnum, ConfigWindow, NotifyDetail, NotifyMode};
use x11rb::protocol::Event;

use crate::wm::client_flags::Modifiers;
use crate::wm::connection::WindowChanges;
use crate::wm::events::{ButtonEvent, MotionEvent, PropertyKind, WmEvent};
use crate::x11::atoms::Atoms;

fn modifiers(state: impl Into<u16>) -> Modifiers {
    Modifiers::from_bits_truncate(u32::from(state.into()))
}

fn has(mask: ConfigWindow, flag: ConfigWindow) -> bool {
    u16::from(mask) & u16::from(flag) != 0
}

fn property_kind(atom: u32, atoms: &Atoms) -> PropertyKind {
    match atom {
        a if a == u32::from(AtomEnum::WM_HINTS) => PropertyKind::WmHints,
        a if a == u32::from(AtomEnum::WM_NORMAL_HINTS) => PropertyKind::NormalHints,
        a if a == u32::from(AtomEnum::WM_NAME) || a == atoms.net_wm_name => PropertyKind::Name,
        a if a == u32::from(AtomEnum::WM_ICON_NAME) => PropertyKind::IconName,
        a if a == atoms.wm_protocols => PropertyKind::Protocols,
        a if a == atoms.motif_wm_hints => PropertyKind::MotifHints,
        _ => PropertyKind::Other,
    }
}

/// The core's view of `event`, or `None` for events it does not handle.
///
/// Unmap and destroy notifications only count when reported on the window
/// itself; copies delivered to a parent through substructure selection
/// are dropped.
pub fn translate(event: &Event, atoms: &Atoms) -> Option<WmEvent> {
    let translated = match event {
        Event::MapRequest(e) => WmEvent::MapRequest { window: e.window },
        Event::MapNotify(e) => WmEvent::MapNotify {
            window: e.window,
            override_redirect: e.override_redirect,
        },
        Event::UnmapNotify(e) if e.event == e.window => WmEvent::UnmapNotify { window: e.window },
        Event::DestroyNotify(e) if e.event == e.window => WmEvent::DestroyNotify { window: e.window },
        Event::ConfigureRequest(e) => {
            let mask = e.value_mask;
            WmEvent::ConfigureRequest {
                window: e.window,
                changes: WindowChanges {
                    x: has(mask, ConfigWindow::X).then_some(i32::from(e.x)),
                    y: has(mask, ConfigWindow::Y).then_some(i32::from(e.y)),
                    width: has(mask, ConfigWindow::WIDTH).then_some(u32::from(e.width)),
                    height: has(mask, ConfigWindow::HEIGHT).then_some(u32::from(e.height)),
                    border_width: has(mask, ConfigWindow::BORDER_WIDTH).then_some(u32::from(e.border_width)),
                },
            }
        }
        Event::PropertyNotify(e) => WmEvent::PropertyNotify {
            window: e.window,
            property: property_kind(e.atom, atoms),
        },
        Event::ButtonPress(e) => WmEvent::ButtonPress(ButtonEvent {
            window: e.event,
            button: e.detail,
            x: i32::from(e.event_x),
            y: i32::from(e.event_y),
            root_x: i32::from(e.root_x),
            root_y: i32::from(e.root_y),
            state: modifiers(e.state),
        }),
        Event::ButtonRelease(e) => WmEvent::ButtonRelease(ButtonEvent {
            window: e.event,
            button: e.detail,
            x: i32::from(e.event_x),
            y: i32::from(e.event_y),
            root_x: i32::from(e.root_x),
            root_y: i32::from(e.root_y),
            state: modifiers(e.state),
        }),
        Event::MotionNotify(e) => WmEvent::Motion(MotionEvent {
            window: e.event,
            x: i32::from(e.event_x),
            y: i32::from(e.event_y),
            root_x: i32::from(e.root_x),
            root_y: i32::from(e.root_y),
            state: modifiers(e.state),
        }),
        Event::Expose(e) if e.count == 0 => WmEvent::Expose { window: e.window },
        Event::ShapeNotify(e) if e.shape_kind == SK::BOUNDING => WmEvent::ShapeNotify {
            window: e.affected_window,
            shaped: e.shaped,
        },
        Event::FocusIn(e) if e.detail != NotifyDetail::POINTER => WmEvent::FocusIn { window: e.event },
        Event::FocusOut(e) if e.detail != NotifyDetail::POINTER => WmEvent::FocusOut { window: e.event },
        Event::LeaveNotify(e) if e.mode == NotifyMode::GRAB || e.mode == NotifyMode::UNGRAB => {
            WmEvent::GrabLost { window: e.event }
        }
        _ => return None,
    };
    Some(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        ButtonPressEvent, ConfigureRequestEvent, KeyButMask, PropertyNotifyEvent, Property, StackMode,
        UnmapNotifyEvent,
    };

    fn atoms() -> Atoms {
        Atoms {
            wm_protocols: 300,
            wm_delete_window: 301,
            wm_take_focus: 302,
            wm_colormap_windows: 303,
            wm_state: 304,
            motif_wm_hints: 305,
            net_supporting_wm_check: 306,
            net_wm_name: 307,
            utf8_string: 308,
        }
    }

    #[test]
    fn test_configure_request_keeps_only_masked_fields() {
        let event = Event::ConfigureRequest(ConfigureRequestEvent {
            response_type: 23,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 0x400,
            sibling: 0,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 2,
            value_mask: ConfigWindow::X | ConfigWindow::WIDTH,
        });
        let Some(WmEvent::ConfigureRequest { window, changes }) = translate(&event, &atoms()) else {
            panic!("not a configure request");
        };
        assert_eq!(window, 0x400);
        assert_eq!(changes.x, Some(10));
        assert_eq!(changes.width, Some(300));
        assert_eq!((changes.y, changes.height, changes.border_width), (None, None, None));
    }

    #[test]
    fn test_unmap_reported_to_parent_is_dropped() {
        let unmap = |event| {
            Event::UnmapNotify(UnmapNotifyEvent {
                response_type: 18,
                sequence: 0,
                event,
                window: 0x400,
                from_configure: false,
            })
        };
        assert_eq!(translate(&unmap(0x400), &atoms()), Some(WmEvent::UnmapNotify { window: 0x400 }));
        assert_eq!(translate(&unmap(0x1), &atoms()), None);
    }

    #[test]
    fn test_property_atoms_map_to_kinds() {
        let property = |atom| {
            Event::PropertyNotify(PropertyNotifyEvent {
                response_type: 28,
                sequence: 0,
                window: 0x400,
                atom,
                time: 0,
                state: Property::NEW_VALUE,
            })
        };
        let kind = |atom| match translate(&property(atom), &atoms()) {
            Some(WmEvent::PropertyNotify { property, .. }) => property,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(kind(AtomEnum::WM_NAME.into()), PropertyKind::Name);
        assert_eq!(kind(307), PropertyKind::Name);
        assert_eq!(kind(300), PropertyKind::Protocols);
        assert_eq!(kind(305), PropertyKind::MotifHints);
        assert_eq!(kind(999), PropertyKind::Other);
    }

    #[test]
    fn test_button_press_carries_modifiers() {
        let event = Event::ButtonPress(ButtonPressEvent {
            response_type: 4,
            detail: 1,
            sequence: 0,
            time: 0,
            root: 1,
            event: 0x500,
            child: 0,
            root_x: 110,
            root_y: 220,
            event_x: 10,
            event_y: 20,
            state: KeyButMask::CONTROL | KeyButMask::BUTTON1,
            same_screen: true,
        });
        let Some(WmEvent::ButtonPress(button)) = translate(&event, &atoms()) else {
            panic!("not a button press");
        };
        assert_eq!(button.window, 0x500);
        assert_eq!((button.x, button.y, button.root_x, button.root_y), (10, 20, 110, 220));
        assert_eq!(button.state, Modifiers::CONTROL | Modifiers::BUTTON1);
    }
}
