use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: app name, server host, current screen and key hints
pub fn draw_header(frame: &mut Frame, area: Rect, api_url: &str, screen: &str) {
  let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
  let label = |l: &'static str| Span::styled(l, Style::default().fg(Color::DarkGray));
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let header = Line::from(vec![
    Span::styled(" labq ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", host(api_url)), Style::default().fg(Color::White)),
    sep(),
    Span::styled(format!(" {} ", screen), Style::default().fg(Color::Yellow).bold()),
    Span::raw("  "),
    key("<:>"),
    label(" screen  "),
    key("</>"),
    label(" search  "),
    key("<n/p>"),
    label(" page  "),
    key("<[/]>"),
    label(" size  "),
    key("<r>"),
    label(" refresh  "),
    key("<q>"),
    label(" quit"),
  ]);

  frame.render_widget(
    Paragraph::new(header).style(Style::default().bg(Color::Black)),
    area,
  );
}

/// Host (and port) of the configured API url
fn host(url: &str) -> &str {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url);
  rest.split('/').next().unwrap_or(rest)
}
