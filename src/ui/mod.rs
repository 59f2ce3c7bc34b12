pub mod components;
pub mod renderfns;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, content, status] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  renderfns::draw_header(frame, header, app.api_url(), app.view().title());
  app.view_mut().render(frame, content);
  app.command().render_overlay(frame, content);
  draw_status_bar(frame, status, app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (text, color) = match app.status() {
    Some(message) => (format!(" {}", message), Color::Red),
    None => (
      " :screen  /search  j/k row  n/p page  [/] size  r refresh  q quit".to_string(),
      Color::DarkGray,
    ),
  };
  frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), area);
}
