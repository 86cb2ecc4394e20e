pub mod board;
pub mod controller;
pub mod detector;
pub mod drag;
pub mod event;
pub mod flow;
pub mod hooks;
pub mod level;
pub mod reveal;
pub mod stats;
