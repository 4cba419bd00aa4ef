pub mod config;
pub mod control;
pub mod error;
pub mod hardware;
pub mod messages;
pub mod runtime;
pub mod state;
