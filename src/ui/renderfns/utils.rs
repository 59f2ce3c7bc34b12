use ratatui::prelude::Color;
use serde_json::Value;

/// Truncate to `max_len` characters, ending in "..." when shortened
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Colour for a lab workflow status
pub fn status_color(status: &str) -> Color {
  match status.to_ascii_uppercase().as_str() {
    "COMPLETED" | "APPROVED" | "ARCHIVED" => Color::Green,
    "IN_PROGRESS" | "PENDING" | "TESTED" | "COLLECTION" => Color::Yellow,
    "REJECTED" | "DISPOSED" | "CANCELLED" => Color::Red,
    "REFERRED_OUT_LAB" | "REFERRED_OUT_PROVIDER" => Color::Magenta,
    _ => Color::White,
  }
}

/// Text for one table cell: the value at JSON `pointer` in `row`.
///
/// OpenMRS references render through their `display` member.
pub fn cell_text(row: &Value, pointer: &str) -> String {
  match row.pointer(pointer) {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Bool(true)) => "yes".to_string(),
    Some(Value::Bool(false)) => "no".to_string(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Array(items)) => items.len().to_string(),
    Some(object @ Value::Object(_)) => object
      .get("display")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string(),
  }
}
