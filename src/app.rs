use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use crossterm::event::KeyEvent;
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use labq::api::{LabClient, PageSource};
use labq::cache::{RevalidationCache, SwrCache};
use labq::config::Config;
use labq::resource::screens::{find_screen, TEST_REQUESTS};
use labq::resource::{Refresher, ResourceSpec};
use ratatui::prelude::*;
use tracing::{info, warn};

use crate::commands::CommandAction;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::views::{ResourceListView, ViewAction};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  config: Config,
  source: Arc<dyn PageSource>,
  refresher: Refresher,
  view: ResourceListView,
  command: CommandInput,
  /// Last error worth showing in the status bar
  status: Option<String>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let source: Arc<dyn PageSource> = Arc::new(LabClient::new(&config.api)?);
    let cache: Arc<dyn RevalidationCache> = Arc::new(SwrCache::new());
    let refresher = Refresher::new(
      cache,
      config.controller.dashboard_metrics_path.clone(),
      config.controller.metrics_debounce(),
    );

    let screen = match config.default_screen.as_deref() {
      Some(name) => *find_screen(name).ok_or_else(|| eyre!("Unknown screen '{}'", name))?,
      None => TEST_REQUESTS,
    };
    let view = ResourceListView::new(
      screen,
      Arc::clone(&source),
      refresher.clone(),
      config.controller.search_debounce(),
    )?;

    Ok(Self {
      config,
      source,
      refresher,
      view,
      command: CommandInput::new(),
      status: None,
      should_quit: false,
    })
  }

  pub fn api_url(&self) -> &str {
    &self.config.api.url
  }

  pub fn view(&self) -> &ResourceListView {
    &self.view
  }

  pub fn view_mut(&mut self) -> &mut ResourceListView {
    &mut self.view
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    self.view.tick();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {}
        None => break,
      }
      self.view.tick();
    }
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    // the search prompt owns ':' while it is open
    if !self.view.is_searching() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(action)) => return self.run_command(action),
        KeyResult::Event(CommandEvent::Unknown) => {
          self.status = Some("Unknown command".to_string());
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    self.status = None;
    if self.view.handle_key(key) == ViewAction::Quit {
      self.should_quit = true;
    }
  }

  fn run_command(&mut self, action: CommandAction) {
    match action {
      CommandAction::Quit => self.should_quit = true,
      CommandAction::Open(spec) => self.open(*spec),
    }
  }

  /// Replace the current screen. Dropping the old view releases its cache
  /// subscription.
  fn open(&mut self, spec: ResourceSpec) {
    match ResourceListView::new(
      spec,
      Arc::clone(&self.source),
      self.refresher.clone(),
      self.config.controller.search_debounce(),
    ) {
      Ok(view) => {
        info!(screen = spec.name, "open screen");
        self.view = view;
        self.status = None;
      }
      Err(e) => {
        warn!(screen = spec.name, error = %e, "cannot open screen");
        self.status = Some(e.to_string());
      }
    }
  }
}
