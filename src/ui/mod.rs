//! Interactive terminal view over the task list.

mod app;
mod form;
mod view;

pub use app::{run, AppState, StatusNotifier};
