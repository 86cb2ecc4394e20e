//! Merge Cube: a tile-merge puzzle board engine.
//!
//! `domain` holds the pure rules, `sim` the stateful board and level
//! flow, `ui` the crossterm front-end used by the `mergecube` binary.

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
