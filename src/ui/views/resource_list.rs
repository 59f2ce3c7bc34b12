use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use labq::api::PageSource;
use labq::error::FilterError;
use labq::filter::FilterCriteria;
use labq::resource::{PagedResource, Refresher, ResourceSpec};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use serde_json::Value;
use tracing::debug;

use super::columns::{columns_for, Column};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{cell_text, draw_pager, status_color, truncate};

/// What the app should do after a key press on a list screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
  None,
  Quit,
}

/// Paged table over one lab collection
pub struct ResourceListView {
  resource: PagedResource<Value>,
  columns: &'static [Column],
  table_state: TableState,
  search: SearchInput,
}

impl ResourceListView {
  pub fn new(
    spec: ResourceSpec,
    source: Arc<dyn PageSource>,
    refresher: Refresher,
    search_debounce: Duration,
  ) -> Result<Self, FilterError> {
    let resource = PagedResource::passive(spec, FilterCriteria::default(), source, refresher)?
      .with_search_debounce(search_debounce);
    Ok(Self {
      resource,
      columns: columns_for(&spec),
      table_state: TableState::default(),
      search: SearchInput::new(),
    })
  }

  pub fn resource(&self) -> &PagedResource<Value> {
    &self.resource
  }

  pub fn title(&self) -> &'static str {
    self.resource().spec().title
  }

  pub fn is_searching(&self) -> bool {
    self.search.is_active()
  }

  /// Run the controller's synchronization pass; call on every tick
  pub fn tick(&mut self) {
    if self.resource.poll() {
      let len = self.resource.items().len();
      match self.table_state.selected() {
        _ if len == 0 => self.table_state.select(None),
        Some(i) if i >= len => self.table_state.select(Some(len - 1)),
        None => self.table_state.select(Some(0)),
        Some(_) => {}
      }
    }
  }

  fn step_page_size(&mut self, forward: bool) {
    let sizes = self.resource.page_sizes();
    let at = sizes
      .iter()
      .position(|size| *size == self.resource.page_size())
      .unwrap_or(0);
    let next = if forward {
      (at + 1) % sizes.len()
    } else {
      (at + sizes.len() - 1) % sizes.len()
    };
    self.resource.set_page_size(sizes[next]);
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.resource.set_search_string(text);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let page = self.resource.current_page();
    let pages = self.resource.pagination().total_pages;
    match key.code {
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return ViewAction::Quit
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
      KeyCode::Char('/') => {
        let current = self.resource.search_string().to_string();
        self.search.activate(&current);
      }
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right if page < pages => {
        self.resource.set_current_page(page + 1);
      }
      KeyCode::Char('p') | KeyCode::Left if page > 1 => {
        self.resource.set_current_page(page - 1);
      }
      KeyCode::Char(']') => self.step_page_size(true),
      KeyCode::Char('[') => self.step_page_size(false),
      KeyCode::Char('r') => {
        let refetched = self.resource.refresh();
        debug!(screen = self.resource.spec().name, refetched, "manual refresh");
      }
      _ => {}
    }
    ViewAction::None
  }

  fn title_line(&self) -> String {
    let spec = self.resource.spec();
    let total = self
      .resource
      .total_count()
      .map_or_else(String::new, |n| format!(" ({})", n));
    let search = match self.resource.search_string() {
      "" => String::new(),
      q => format!(" /{}", q),
    };
    match self.resource.error() {
      Some(err) => {
        let err = truncate(&err.to_string(), 60);
        format!(" {}{}{} [error: {}] ", spec.title, total, search, err)
      }
      None => format!(" {}{}{} ", spec.title, total, search),
    }
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [bar_area, table_area, pager_area] = Layout::vertical([
      Constraint::Length(1),
      Constraint::Min(1),
      Constraint::Length(1),
    ])
    .areas(area);

    let border = if self.resource.is_error() { Color::Red } else { Color::Blue };
    let block = Block::default()
      .title(self.title_line())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if self.resource.is_validating() && self.resource.loaded() {
      let bar = Paragraph::new("━━ refreshing").style(Style::default().fg(Color::Cyan));
      frame.render_widget(bar, bar_area);
    }

    if self.resource.is_loading() && !self.resource.loaded() {
      frame.render_widget(skeleton(block, table_area.height), table_area);
    } else if self.resource.items().is_empty() {
      let text = if self.resource.is_error() {
        "Failed to load. Press 'r' to retry."
      } else {
        "No items to display"
      };
      let tile = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
      frame.render_widget(tile, table_area);
    } else {
      let table = self.table(block);
      frame.render_stateful_widget(table, table_area, &mut self.table_state);
    }

    draw_pager(frame, pager_area, self.resource.pagination());
    self.search.render_overlay(frame, table_area);
  }

  fn table<'a>(&self, block: Block<'a>) -> Table<'a> {
    let header = Row::new(self.columns.iter().map(|c| Cell::from(c.title)))
      .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .resource
      .items()
      .iter()
      .map(|item| {
        Row::new(self.columns.iter().map(|column| {
          let text = truncate(&cell_text(item, column.pointer), column.width as usize);
          if column.status {
            let color = status_color(&text);
            Cell::from(text).style(Style::default().fg(color))
          } else {
            Cell::from(text)
          }
        }))
      })
      .collect();

    Table::new(rows, self.columns.iter().map(|c| Constraint::Length(c.width)))
      .header(header)
      .block(block)
      .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ")
  }
}

/// Placeholder rows shown until the first page arrives
fn skeleton(block: Block<'_>, height: u16) -> Paragraph<'_> {
  let lines: Vec<Line> = (0..height.saturating_sub(2))
    .map(|i| {
      let width = if i % 3 == 2 { 24 } else { 48 };
      Line::styled("░".repeat(width), Style::default().fg(Color::DarkGray))
    })
    .collect();
  Paragraph::new(lines).block(block)
}
