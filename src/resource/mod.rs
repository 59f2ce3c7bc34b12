//! Paged resource controllers and the screens they serve.

pub mod actions;
pub mod controller;
pub mod refresh;
pub mod screens;

pub use actions::ResourceActions;
pub use controller::{FetchMode, PagedResource};
pub use refresh::Refresher;
pub use screens::ResourceSpec;
