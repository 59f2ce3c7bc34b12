pub mod header;
pub mod pager;
pub mod utils;

pub use header::draw_header;
pub use pager::draw_pager;
pub use utils::{cell_text, status_color, truncate};
