pub mod capability;
pub mod creature;
pub mod light;
pub mod missile;
pub mod registry;
pub mod room;
pub mod trap;
