use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Map allocation failed for {width}x{height} grid")]
    MapAllocation { width: u32, height: u32 },

    #[error("No seat assigned to the local player")]
    NoSeatForLocalPlayer,

    #[error("No seat with {0}")]
    SeatNotFound(crate::core::types::FactionColor),

    #[error("Invalid level data: {0}")]
    InvalidLevel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
