use crate::api::ApiClient;
use crate::cache::{Evict, EvictScope, ResourceKey, ResourceKind, Stores};
use crate::commands::{self, Action, Invocation};
use crate::config::Config;
use crate::event::{Event, EventHandler, SessionEvent};
use crate::session::{SessionListener, SessionState};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::extract_host;
use crate::ui::view::{Context, ShortcutInfo, View, ViewAction};
use crate::ui::views::{AuditLogsView, ContactsView, QrAnalyticsView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  config: Config,
  api: ApiClient,
  /// Built once; every query shares these
  stores: Stores,
  session: SessionState,
  listener: SessionListener,
  signing_in: bool,
  status: Option<String>,
  event_tx: Option<mpsc::UnboundedSender<Event>>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api = ApiClient::new(&config)?;
    let stores = Stores::new();
    info!(
      api = %api.base_url(),
      freshness_secs = config.cache.policy().freshness().num_seconds(),
      "starting"
    );

    // Sign-out clears every kind, including ones no view has opened yet
    let mut listener = SessionListener::new();
    for kind in [ResourceKind::AuditLogs, ResourceKind::Contacts, ResourceKind::QrAnalytics] {
      listener.register(EvictScope::kind(kind));
    }

    let mut app = Self {
      view_stack: Vec::new(),
      command: CommandInput::new(),
      config,
      api,
      stores,
      session: SessionState::signed_out(),
      listener,
      signing_in: false,
      status: None,
      event_tx: None,
      should_quit: false,
    };
    let root = ContactsView::new(&app.context());
    app.push_view(Box::new(root));
    Ok(app)
  }

  fn context(&self) -> Context<'_> {
    Context {
      session: &self.session,
      stores: &self.stores,
      api: &self.api,
      config: &self.config,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);
    self.event_tx = Some(events.sender());

    self.sign_in();

    while !self.should_quit {
      self.tick();
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  /// Propagate session changes, then let the current view sync and poll
  fn tick(&mut self) {
    self.listener.observe(&self.session, &self.stores);

    let ctx = Context {
      session: &self.session,
      stores: &self.stores,
      api: &self.api,
      config: &self.config,
    };
    if let Some(view) = self.view_stack.last_mut() {
      view.tick(&ctx);
    }
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {} // tick() runs every loop iteration
      Event::Session(session_event) => self.handle_session_event(session_event),
    }
  }

  fn handle_session_event(&mut self, event: SessionEvent) {
    self.signing_in = false;
    match event {
      SessionEvent::SignedIn(user) => {
        info!(user = %user.email, admin = user.is_admin(), "signed in");
        self.status = Some(format!("Signed in as {}", user.display_name()));
        self.session = SessionState::signed_in(user);
      }
      SessionEvent::SignInFailed(error) => {
        warn!(error = %error, "sign-in failed");
        self.status = Some(format!("Sign-in failed: {}", error));
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.command.is_active() || !self.view_captures_input() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(line)) => {
          self.execute_command(&line);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let ctx = Context {
      session: &self.session,
      stores: &self.stores,
      api: &self.api,
      config: &self.config,
    };
    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key, &ctx),
      None => ViewAction::None,
    };
    self.apply_action(action);
  }

  fn view_captures_input(&self) -> bool {
    self
      .view_stack
      .last()
      .map(|view| view.is_capturing_input())
      .unwrap_or(false)
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.push_view(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          if let Some(mut view) = self.view_stack.pop() {
            view.unbind();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn push_view(&mut self, mut view: Box<dyn View>) {
    for scope in view.scopes() {
      self.listener.register(scope);
    }
    view.tick(&self.context());
    self.view_stack.push(view);
  }

  /// Replace the whole stack with a new root view
  fn set_root(&mut self, view: Box<dyn View>) {
    for mut old in self.view_stack.drain(..) {
      old.unbind();
    }
    self.push_view(view);
  }

  fn execute_command(&mut self, line: &str) {
    let Some(Invocation { action, argument }) = commands::resolve(line) else {
      let (word, _) = commands::split_command(line);
      self.status = Some(match commands::get_suggestions(word).first() {
        Some(cmd) => format!("Usage: {} {}", cmd.name, cmd.argument.unwrap_or_default()),
        None => format!("Unknown command: {}", word),
      });
      return;
    };

    self.status = None;
    match action {
      Action::Contacts => {
        let view = ContactsView::new(&self.context());
        self.set_root(Box::new(view));
      }
      Action::AuditLogs => {
        let view = AuditLogsView::new(&self.context());
        self.set_root(Box::new(view));
      }
      Action::Analytics => {
        if let Some(qr_id) = argument {
          let view = QrAnalyticsView::new(&self.context(), &qr_id);
          self.push_view(Box::new(view));
        }
      }
      Action::Clear => self.clear_cache(argument.as_deref()),
      Action::Login => self.sign_in(),
      Action::Logout => self.sign_out(),
      Action::Quit => self.should_quit = true,
    }
  }

  /// Drop cached data: everything, or the analytics of one QR code
  fn clear_cache(&mut self, qr_id: Option<&str>) {
    let scope = match qr_id {
      Some(id) => EvictScope::Key(ResourceKey::entity(ResourceKind::QrAnalytics, id)),
      None => EvictScope::All,
    };
    let removed = self.stores.evict(&scope);
    info!(removed, scope = ?scope, "cache cleared");
    for view in &mut self.view_stack {
      view.unbind();
    }
    self.status = Some(format!("Cleared {} cached entries", removed));
  }

  /// Resolve the token's user in the background
  fn sign_in(&mut self) {
    if self.signing_in || self.session.is_authenticated {
      return;
    }
    let Some(tx) = self.event_tx.clone() else {
      return;
    };
    self.signing_in = true;
    self.status = Some("Signing in...".to_string());

    let api = self.api.clone();
    tokio::spawn(async move {
      let event = match api.current_user().await {
        Ok(user) => SessionEvent::SignedIn(user),
        Err(error) => SessionEvent::SignInFailed(error),
      };
      let _ = tx.send(Event::Session(event));
    });
  }

  fn sign_out(&mut self) {
    if !self.session.is_authenticated {
      return;
    }
    self.session = SessionState::signed_out();
    let removed = self.listener.observe(&self.session, &self.stores);
    info!(removed, scopes = self.listener.scopes().count(), "signed out");
    self.status = Some("Signed out".to_string());
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.view_stack.last_mut().map(|view| view.as_mut())
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn session(&self) -> &SessionState {
    &self.session
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn title(&self) -> String {
    match &self.config.title {
      Some(title) => title.clone(),
      None => extract_host(self.api.base_url().as_str()).to_string(),
    }
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }
}
