use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::api::ApiClient;
use crate::cache::{EvictScope, Stores};
use crate::config::Config;
use crate::session::SessionState;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  /// Lower = shown first
  pub priority: u8,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Shared application state lent to views on every call
pub struct Context<'a> {
  pub session: &'a SessionState,
  pub stores: &'a Stores,
  pub api: &'a ApiClient,
  pub config: &'a Config,
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, prompts) and return actions
/// for the App to execute: App → View → Components.
///
/// Views that show remote data own a `Query` and `sync` it in `tick()` with
/// the session from the context; the shared stores keep the data.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent, ctx: &Context) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  fn breadcrumb_label(&self) -> String;

  /// Called on each tick and right after the view is pushed
  fn tick(&mut self, _ctx: &Context) {}

  /// Cache scopes this view populates, evicted on sign-out
  fn scopes(&self) -> Vec<EvictScope> {
    Vec::new()
  }

  /// Forget query bindings so the next tick binds (and fetches) afresh.
  /// Called when the view leaves the stack and after the cache is cleared.
  fn unbind(&mut self) {}

  /// Whether the view is capturing text (keys must not reach global bindings)
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
