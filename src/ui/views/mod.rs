mod columns;
mod resource_list;

pub use resource_list::{ResourceListView, ViewAction};
