//! # remuco-client: terminal remote control
//!
//! Connects to a Remuco server, prints what the player is doing and
//! turns typed commands into controls, view activations and requests.

pub mod command;
pub mod config;
pub mod view;
