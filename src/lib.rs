//! enMedD AI admin client
//!
//! Configuration wizards, paginated listings and typed REST access for the
//! enMedD AI admin API. The `ui` module holds headless screen state; the
//! `admin` module wires it to each backend resource.

pub mod admin;
pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod notifications;
pub mod session;
pub mod ui;

pub use session::Session;
