pub mod connectivity;
pub mod coord;
pub mod grid;
pub mod pathfinding;
pub mod spiral;
pub mod tile;
pub mod visibility;
