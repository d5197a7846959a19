pub mod auth_cmd;
pub mod category;
pub mod common;
pub mod completions;
pub mod sync;
pub mod tasks;
