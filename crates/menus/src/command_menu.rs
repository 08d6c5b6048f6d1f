//! The "selectable value with menu" state machine.

use host::{KeyValueStore, MenuItem, QuickPick, StatusBar, StatusItemHandle};
use parking_lot::Mutex;
use std::sync::Arc;

struct MenuState {
    menu: Vec<MenuItem>,
    selection: Option<MenuItem>,
    visible: bool,
}

/// One status-bar setting: an ordered menu, an optional selection, and a
/// visibility flag, with every selection change persisted to workspace
/// storage under the setting's key.
pub struct CommandMenu {
    key: &'static str,
    placeholder: &'static str,
    status_item: Arc<dyn StatusItemHandle>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<MenuState>,
}

impl CommandMenu {
    /// Create the menu with its status-bar item. The persisted prior
    /// selection (if any) becomes the initial selection verbatim — it need
    /// not be present in any menu.
    pub fn new(
        key: &'static str,
        placeholder: &'static str,
        priority: i32,
        status_bar: &dyn StatusBar,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let status_item = status_bar.create_item(key, priority);
        status_item.set_tooltip(placeholder);

        let selection = storage
            .get(key)
            .and_then(|value| serde_json::from_value::<MenuItem>(value).ok());

        let menu = Self {
            key,
            placeholder,
            status_item,
            storage,
            state: Mutex::new(MenuState {
                menu: Vec::new(),
                selection,
                visible: false,
            }),
        };
        menu.render();
        menu
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn selection(&self) -> Option<MenuItem> {
        self.state.lock().selection.clone()
    }

    pub fn selected_label(&self) -> Option<String> {
        self.state.lock().selection.as_ref().map(|s| s.label.clone())
    }

    pub fn menu(&self) -> Vec<MenuItem> {
        self.state.lock().menu.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Replace the menu.
    ///
    /// The prior selection survives only if its label is still present — and
    /// then it adopts the NEW menu entry (fresh description included). It
    /// otherwise falls back to the persisted prior selection if that is in
    /// the new menu, else to the first item, else to nothing.
    pub fn set_menu(&self, items: Vec<MenuItem>) {
        let mut state = self.state.lock();

        let by_label = |label: &str| items.iter().find(|item| item.label == label).cloned();

        let next = state
            .selection
            .as_ref()
            .and_then(|current| by_label(&current.label))
            .or_else(|| {
                self.storage
                    .get(self.key)
                    .and_then(|value| serde_json::from_value::<MenuItem>(value).ok())
                    .and_then(|persisted| by_label(&persisted.label))
            })
            .or_else(|| items.first().cloned());

        state.menu = items;
        self.select(&mut state, next, false);
    }

    /// Apply an externally-sourced value.
    ///
    /// `None` clears the selection. An empty label selects the first item of
    /// a non-empty menu. A label matching a menu entry selects that entry
    /// (with its attached description); any other label is accepted verbatim
    /// as an ad-hoc entry.
    pub fn set_value_from_string(&self, label: Option<&str>) {
        let mut state = self.state.lock();
        let next = match label {
            None => None,
            Some("") => state.menu.first().cloned(),
            Some(label) => Some(
                state
                    .menu
                    .iter()
                    .find(|item| item.label == label)
                    .cloned()
                    .unwrap_or_else(|| MenuItem::new(label)),
            ),
        };
        self.select(&mut state, next, false);
    }

    /// Show the menu as a quick-pick prompt and apply the user's choice.
    pub async fn prompt(&self, quick_pick: &dyn QuickPick) -> Option<MenuItem> {
        let items = self.menu();
        let picked = quick_pick.pick(self.placeholder, &items).await?;
        let mut state = self.state.lock();
        self.select(&mut state, Some(picked.clone()), true);
        Some(picked)
    }

    pub fn set_visible(&self, visible: bool) {
        let mut state = self.state.lock();
        if state.visible == visible {
            return;
        }
        state.visible = visible;
        if visible {
            self.status_item.show();
        } else {
            self.status_item.hide();
        }
    }

    pub fn dispose(&self) {
        self.status_item.dispose();
    }

    /// Apply a selection; redundant sets are no-ops (no storage write, no
    /// repaint). Only user-driven selections persist — tool-driven sync must
    /// not clobber the user's stored choice.
    fn select(&self, state: &mut MenuState, next: Option<MenuItem>, persist: bool) {
        if state.selection == next {
            return;
        }
        tracing::debug!(
            "{}: {:?} -> {:?}",
            self.key,
            state.selection.as_ref().map(|item| item.label.as_str()),
            next.as_ref().map(|item| item.label.as_str())
        );
        state.selection = next;
        if persist {
            let persisted = match &state.selection {
                Some(item) => serde_json::to_value(item).unwrap_or(serde_json::Value::Null),
                None => serde_json::Value::Null,
            };
            self.storage.set(self.key, Some(persisted));
        }
        self.render_state(state);
    }

    fn render(&self) {
        let state = self.state.lock();
        self.render_state(&state);
    }

    fn render_state(&self, state: &MenuState) {
        match &state.selection {
            Some(item) => self.status_item.set_text(&item.label),
            None => self.status_item.set_text(self.placeholder),
        }
    }
}
