use labq::pagination::Pagination;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// "Page 2 of 7 · 11-20 of 64 · 10 per page"
pub fn pager_text(pagination: &Pagination) -> String {
  let pages = pagination.total_pages.max(1);
  let total = pagination
    .total_count
    .map_or_else(|| "?".to_string(), |n| n.to_string());
  format!(
    "Page {} of {} · {}-{} of {} · {} per page",
    pagination.current_page,
    pages,
    pagination.first_item,
    pagination.last_item,
    total,
    pagination.page_size
  )
}

pub fn draw_pager(frame: &mut Frame, area: Rect, pagination: &Pagination) {
  let prev = if pagination.has_previous() { Color::Cyan } else { Color::DarkGray };
  let next = if pagination.has_next() { Color::Cyan } else { Color::DarkGray };
  let line = Line::from(vec![
    Span::styled(" ‹p ", Style::default().fg(prev)),
    Span::raw(pager_text(pagination)),
    Span::styled(" n› ", Style::default().fg(next)),
  ]);
  frame.render_widget(Paragraph::new(line).alignment(Alignment::Right), area);
}
