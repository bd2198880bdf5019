//! Status-bar item rendering the menu model.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use tray_icon::menu::{
    CheckMenuItem, IsMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu,
};
use tray_icon::{TrayIcon, TrayIconBuilder};
use xwall_core::Waker;
use xwall_platform::Result;
use xwall_ui::{MenuAction, MenuEntry, MenuState, TRAY_TITLE, TRAY_TOOLTIP};

use crate::ffi::box_err;

pub struct Tray {
    icon: TrayIcon,
    actions: HashMap<MenuId, MenuAction>,
    shown: MenuState,
}

impl Tray {
    pub fn new(state: &MenuState) -> Result<Self> {
        let mut actions = HashMap::new();
        let menu = build_menu(&state.entries(), &mut actions)?;
        let icon = TrayIconBuilder::new()
            .with_title(TRAY_TITLE)
            .with_tooltip(TRAY_TOOLTIP)
            .with_menu(Box::new(menu))
            .build()
            .map_err(box_err)?;
        Ok(Self {
            icon,
            actions,
            shown: state.clone(),
        })
    }

    pub fn action(&self, id: &MenuId) -> Option<MenuAction> {
        self.actions.get(id).copied()
    }

    /// Rebuilds the menu when anything it shows has changed.
    pub fn refresh(&mut self, state: &MenuState) {
        if &self.shown == state {
            return;
        }
        let mut actions = HashMap::new();
        match build_menu(&state.entries(), &mut actions) {
            Ok(menu) => {
                self.icon.set_menu(Some(Box::new(menu)));
                self.actions = actions;
                self.shown = state.clone();
                debug!("menu rebuilt");
            }
            Err(err) => warn!("cannot rebuild the menu: {err}"),
        }
    }
}

/// Forwards clicked menu ids to the event loop.
pub fn forward_menu_events(tx: Sender<MenuId>, wake: Waker) {
    MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
        if tx.send(event.id).is_ok() {
            wake();
        }
    }));
}

fn build_menu(entries: &[MenuEntry], actions: &mut HashMap<MenuId, MenuAction>) -> Result<Menu> {
    let menu = Menu::new();
    for item in build_items(entries, actions) {
        menu.append(item.as_ref()).map_err(box_err)?;
    }
    Ok(menu)
}

fn build_items(
    entries: &[MenuEntry],
    actions: &mut HashMap<MenuId, MenuAction>,
) -> Vec<Box<dyn IsMenuItem>> {
    let mut items: Vec<Box<dyn IsMenuItem>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            MenuEntry::Item {
                label,
                action,
                enabled,
            } => {
                let item = MenuItem::new(label, *enabled, None);
                actions.insert(item.id().clone(), *action);
                items.push(Box::new(item));
            }
            MenuEntry::Check {
                label,
                action,
                checked,
            } => {
                let item = CheckMenuItem::new(label, true, *checked, None);
                actions.insert(item.id().clone(), *action);
                items.push(Box::new(item));
            }
            MenuEntry::Submenu { label, entries } => {
                let submenu = Submenu::new(label, true);
                for child in build_items(entries, actions) {
                    if let Err(err) = submenu.append(child.as_ref()) {
                        warn!("cannot add an item to {label}: {err}");
                    }
                }
                items.push(Box::new(submenu));
            }
            MenuEntry::Status(text) => items.push(Box::new(MenuItem::new(text, false, None))),
            MenuEntry::Separator => items.push(Box::new(PredefinedMenuItem::separator())),
        }
    }
    items
}
