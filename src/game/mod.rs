pub mod goal;
pub mod notify;
pub mod seat;
pub mod turn;
pub mod world;
