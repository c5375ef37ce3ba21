//! Marquee - on-demand streaming gateway for a personal movie library
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod library;
pub mod scanner;
pub mod server;
pub mod streaming;
