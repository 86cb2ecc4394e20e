pub mod grid;
pub mod merge;
pub mod spawn;
pub mod tile;
