//! Core of the listen-along client: friend activity model, freshness rules,
//! the server client, the activity poller and the listen-session controller.

pub mod activity;
pub mod client;
pub mod config;
pub mod error;
pub mod freshness;
pub mod platform;
pub mod poller;
pub mod session;
