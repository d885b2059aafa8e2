use thiserror::Error;

use crate::core::types::{EntityKind, GameId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("village object not found: {0}")]
    ObjectNotFound(GameId),

    #[error("{0} is not a packed village object identifier")]
    InvalidGameId(i64),

    #[error("object {0} cannot be constructed")]
    NotBuildable(GameId),

    #[error("object {0} is not an obstacle")]
    NotAnObstacle(GameId),

    #[error("object is already under construction")]
    AlreadyConstructing,

    #[error("object is not under construction")]
    NotConstructing,

    #[error("object is maxed or town hall level too low")]
    NotUpgradeable,

    #[error("obstacle is already being cleared")]
    AlreadyClearing,

    #[error("obstacle is not being cleared")]
    NotClearing,

    #[error("village does not contain a town hall")]
    MissingTownHall,

    #[error("village already has a town hall: {existing}")]
    DuplicateTownHall { existing: GameId },

    #[error("no data group for kind {kind:?} with id {data_id}")]
    UnknownDataGroup { kind: EntityKind, data_id: u32 },

    #[error("data group {data_id} has no record for level {level}")]
    MissingLevelRecord { data_id: u32, level: i32 },

    #[error("coordinate {value} is outside 0..={max}")]
    CoordinateOutOfRange { value: i32, max: i32 },

    #[error("timer cannot start: {0}")]
    InvalidTimerStart(String),

    #[error("layout error: {0}")]
    MalformedLayout(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
