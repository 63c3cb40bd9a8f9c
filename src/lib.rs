//! Sokoban puzzle engine with a terminal frontend.
//!
//! `sim` holds the rules and session state and has no terminal
//! dependency; `ui` is the crossterm/rodio presentation layer driven
//! by the binary.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
pub mod ui;
