pub mod app;
pub mod controller;
pub mod dialogs;
pub mod playback;
pub mod timeline;

#[cfg(test)]
mod controller_test;

pub use app::*;
