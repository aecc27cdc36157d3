use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::api::types::{Contact, ContactDraft};
use crate::api::ApiClient;
use crate::cache::{EvictScope, ListParams, ResourceKey, ResourceKind, Store, MAX_PAGE_SIZE};
use crate::format::format_relative;
use crate::query::{Mutation, MutationState, PageChange, Query};
use crate::session::AccessGate;
use crate::ui::components::{InputResult, KeyResult, SearchEvent, SearchInput, TextInput};
use crate::ui::renderfns::{subscribed_color, truncate};
use crate::ui::view::{Context, ShortcutInfo, View, ViewAction};
use crate::ui::{ensure_valid_selection, list_title, load_failed_message, page_change_for};

const LIMIT_STEP: u32 = 10;

fn contacts_key() -> ResourceKey {
  ResourceKey::list(ResourceKind::Contacts)
}

/// The unfiltered first page in server order, where new contacts show up first
fn newest_first_page(params: &ListParams) -> bool {
  params.page == 1 && params.search.is_empty() && params.sort.is_none() && params.filters.is_empty()
}

/// Put a confirmed new contact at the top of the cached page, keeping the page
/// within its limit. Returns false when the cached page may not contain it.
fn place_created(store: &Store<Vec<Contact>, ListParams>, contact: &Contact) -> bool {
  let key = contacts_key();
  let limit = store
    .with_entry(&key, |entry| {
      newest_first_page(&entry.params).then_some(entry.params.limit as usize)
    })
    .flatten();
  let Some(limit) = limit else {
    return false;
  };
  let placed = store.mutate_local(&key, |rows| {
    rows.insert(0, contact.clone());
    rows.truncate(limit);
  });
  if placed {
    store.adjust_total(&key, 1);
  }
  placed
}

/// Editable one-line prompts
enum Prompt {
  Add(TextInput),
  Edit { original: Contact, input: TextInput },
  ConfirmDelete(Contact),
}

/// Paginated, searchable contact list with create/edit/delete
pub struct ContactsView {
  api: ApiClient,
  store: Store<Vec<Contact>, ListParams>,
  query: Query<Vec<Contact>, ListParams>,
  params: ListParams,
  list_state: ListState,
  search: SearchInput,
  prompt: Option<Prompt>,
  save: Mutation<Contact>,
  /// The pending save creates a contact
  creating: bool,
  remove: Mutation<String>,
  status: Option<String>,
}

impl ContactsView {
  pub fn new(ctx: &Context) -> Self {
    let api = ctx.api.clone();
    let store = ctx.stores.contacts.clone();

    let fetch_api = api.clone();
    let query = Query::new(
      store.clone(),
      ResourceKind::Contacts,
      AccessGate::Authenticated,
      ctx.config.cache.policy(),
      move |params: ListParams| {
        let api = fetch_api.clone();
        async move { api.fetch_contacts(&params).await }
      },
    );

    // Come back to the page that is cached, if any
    let params = store
      .get(&contacts_key())
      .map(|entry| entry.params)
      .unwrap_or_else(|| ListParams::with_limit(ctx.config.lists.page_size.clamp(1, MAX_PAGE_SIZE)));

    Self {
      api,
      store,
      query,
      params,
      list_state: ListState::default(),
      search: SearchInput::new(),
      prompt: None,
      save: Mutation::new(),
      creating: false,
      remove: Mutation::new(),
      status: None,
    }
  }

  fn selected_contact(&self) -> Option<Contact> {
    let idx = self.list_state.selected()?;
    self.query.view().data.get(idx).cloned()
  }

  fn change_page(&mut self, change: PageChange) {
    let pagination = self
      .store
      .with_entry(&contacts_key(), |entry| entry.pagination.clone())
      .flatten();
    let next = self.params.apply(change, pagination.as_ref());
    if next.page != self.params.page || next.search != self.params.search {
      self.list_state.select(Some(0));
    }
    self.params = next;
  }

  fn create(&mut self, draft: ContactDraft) {
    let api = self.api.clone();
    let store = self.store.clone();
    let started = self.save.run(
      async move { api.create_contact(&draft).await },
      move |contact| {
        place_created(&store, contact);
      },
    );
    if started {
      self.creating = true;
    }
    self.status = Some(if started { "Saving...".into() } else { "Another save is in progress".into() });
  }

  fn update(&mut self, id: String, draft: ContactDraft) {
    let api = self.api.clone();
    let store = self.store.clone();
    let started = self.save.run(
      async move { api.update_contact(&id, &draft).await },
      move |contact| {
        store.mutate_local(&contacts_key(), |rows| {
          if let Some(row) = rows.iter_mut().find(|row| row.id == contact.id) {
            *row = contact.clone();
          }
        });
      },
    );
    self.status = Some(if started { "Saving...".into() } else { "Another save is in progress".into() });
  }

  fn delete(&mut self, contact: Contact) {
    let api = self.api.clone();
    let store = self.store.clone();
    let id = contact.id;
    let started = self.remove.run(
      async move { api.delete_contact(&id).await.map(|()| id) },
      move |id| {
        let key = contacts_key();
        if store.mutate_local(&key, |rows| rows.retain(|row| &row.id != id)) {
          store.adjust_total(&key, -1);
        }
      },
    );
    if started {
      self.status = Some(format!("Deleting {}...", contact.name));
    }
  }

  fn toggle_subscribed(&mut self, contact: &Contact) {
    let mut draft = ContactDraft::from(contact);
    draft.subscribed = !contact.subscribed;
    self.update(contact.id.clone(), draft);
  }

  fn poll_mutations(&mut self) {
    if self.save.poll() {
      let created = std::mem::take(&mut self.creating);
      self.status = match self.save.state() {
        MutationState::Done(contact) => {
          // Search, sort, filters or a later page may place it elsewhere
          if created && !newest_first_page(&self.params) {
            self.query.refresh();
          }
          Some(format!("Saved {}", contact.name))
        }
        MutationState::Failed(error) => Some(format!("Save failed: {}", error)),
        _ => None,
      };
    }
    if self.remove.poll() {
      self.status = match self.remove.state() {
        MutationState::Done(_) => Some("Contact deleted".to_string()),
        MutationState::Failed(error) => Some(format!("Delete failed: {}", error)),
        _ => None,
      };
    }
  }

  fn handle_prompt(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let prompt = self.prompt.take()?;
    match prompt {
      Prompt::ConfirmDelete(contact) => {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
          self.delete(contact);
        } else {
          self.status = Some("Delete cancelled".into());
        }
      }
      Prompt::Add(mut input) => match input.handle_key(key) {
        InputResult::Submitted(line) => match ContactDraft::parse(&line) {
          Some(draft) => self.create(draft),
          None => {
            self.status = Some("Expected: Name <email> [phone]".into());
            self.prompt = Some(Prompt::Add(input));
          }
        },
        InputResult::Cancelled => {}
        InputResult::Consumed | InputResult::NotHandled => self.prompt = Some(Prompt::Add(input)),
      },
      Prompt::Edit { original, mut input } => match input.handle_key(key) {
        InputResult::Submitted(line) => match ContactDraft::parse(&line) {
          Some(mut draft) => {
            draft.subscribed = original.subscribed;
            draft.tags = original.tags.clone();
            self.update(original.id, draft);
          }
          None => {
            self.status = Some("Expected: Name <email> [phone]".into());
            self.prompt = Some(Prompt::Edit { original, input });
          }
        },
        InputResult::Cancelled => {}
        InputResult::Consumed | InputResult::NotHandled => {
          self.prompt = Some(Prompt::Edit { original, input })
        }
      },
    }
    Some(ViewAction::None)
  }

  fn handle_search(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key, &self.params.search) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Submitted(query)) => {
        self.change_page(PageChange::Search(query));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    if let Some(change) = page_change_for(key) {
      self.change_page(change);
      return Some(ViewAction::None);
    }
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('+') => {
        self.change_page(PageChange::Limit(self.params.limit.saturating_add(LIMIT_STEP)))
      }
      KeyCode::Char('-') => self.change_page(PageChange::Limit(
        self.params.limit.saturating_sub(LIMIT_STEP).max(1),
      )),
      KeyCode::Char('s') => self.change_page(PageChange::Sort("name".into())),
      KeyCode::Char('S') => self.change_page(PageChange::Sort("createdAt".into())),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refresh();
      }
      KeyCode::Char('a') => self.prompt = Some(Prompt::Add(TextInput::new())),
      KeyCode::Char('e') => {
        let contact = self.selected_contact()?;
        let line = match &contact.phone {
          Some(phone) => format!("{} <{}> {}", contact.name, contact.email, phone),
          None => format!("{} <{}>", contact.name, contact.email),
        };
        self.prompt = Some(Prompt::Edit {
          original: contact,
          input: TextInput::with_value(&line),
        });
      }
      KeyCode::Char('u') => {
        let contact = self.selected_contact()?;
        self.toggle_subscribed(&contact);
      }
      KeyCode::Char('d') => {
        let contact = self.selected_contact()?;
        self.prompt = Some(Prompt::ConfirmDelete(contact));
      }
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let view = self.query.view();
    ensure_valid_selection(&mut self.list_state, view.data.len());

    let block = Block::default()
      .title(list_title("Contacts", &view))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if view.data.is_empty() && !view.loading {
      let content = if !self.query.is_permitted() {
        "Signed out. Use :login to load contacts.".to_string()
      } else if let Some(error) = &view.error {
        load_failed_message("contacts", error)
      } else {
        "No contacts found.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = view
      .data
      .iter()
      .map(|contact| {
        let marker = if contact.subscribed { "●" } else { "○" };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{} ", marker),
            Style::default().fg(subscribed_color(contact.subscribed)),
          ),
          Span::styled(
            format!("{:<24}", truncate(&contact.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<32}", truncate(&contact.email, 32))),
          Span::raw(" "),
          Span::styled(
            format!("{:<16}", truncate(contact.phone.as_deref().unwrap_or("-"), 16)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(" "),
          Span::styled(
            format_relative(&contact.created_at, now),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_prompt(&self, frame: &mut Frame, area: Rect) {
    let (label, value, input) = match &self.prompt {
      Some(Prompt::Add(input)) => ("New contact (Name <email> [phone]): ", input.value().to_string(), Some(input)),
      Some(Prompt::Edit { input, .. }) => ("Edit contact: ", input.value().to_string(), Some(input)),
      Some(Prompt::ConfirmDelete(contact)) => ("Delete ", format!("{}? (y/n)", contact.name), None),
      None => match &self.status {
        Some(status) => ("", status.clone(), None),
        None => return,
      },
    };
    frame.render_widget(Clear, area);
    let line = Line::from(vec![
      Span::styled(label, Style::default().fg(Color::Yellow)),
      Span::raw(value),
    ]);
    frame.render_widget(Paragraph::new(line), area);
    if let Some(input) = input {
      frame.set_cursor_position(input.cursor_at(area, label.chars().count() as u16));
    }
  }
}

impl View for ContactsView {
  fn handle_key(&mut self, key: KeyEvent, _ctx: &Context) -> ViewAction {
    self
      .handle_prompt(key)
      .or_else(|| self.handle_search(key))
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);
    self.render_list(frame, chunks[0]);
    self.render_prompt(frame, chunks[1]);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Contacts".to_string()
  }

  fn tick(&mut self, ctx: &Context) {
    self
      .query
      .sync(ctx.session, contacts_key(), self.params.clone());
    self.poll_mutations();
  }

  fn scopes(&self) -> Vec<EvictScope> {
    vec![self.query.scope()]
  }

  fn unbind(&mut self) {
    self.query.unbind();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active() || self.prompt.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("a", "add").with_priority(40),
      ShortcutInfo::new("e", "edit").with_priority(41),
      ShortcutInfo::new("u", "subscribe").with_priority(42),
      ShortcutInfo::new("d", "delete").with_priority(43),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ]
  }
}
