pub mod app;
pub mod audio;
pub mod automation;
pub mod clipboard;
pub mod config;
pub mod core;
pub mod download;
pub mod format;
pub mod library;
pub mod links;
pub mod logging;
pub mod model;
pub mod notify;
pub mod overlay;
pub mod player;
pub mod ui;
