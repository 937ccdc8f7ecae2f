//! Gateway: the HTTP face of the bot.
//!
//! Serves the webhook handshake and event delivery, hands each event to the
//! assistant's dispatcher, and renders the webview pages reply buttons link to.

pub mod error;
pub mod pages;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    error::{Error, Result},
    server::{build_app, start_server},
    state::AppState,
};
