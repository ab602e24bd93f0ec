//! Entity persistence boundary: flat named-field records keyed by entity name

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::cloud::AreaEffectCloudType;
use super::entity::{Entity, EntityHandle, EntityType};
use super::lightning::LightningType;
use super::player::PlayerType;

/// Flat mapping of persisted field names to values
pub type EntityData = Map<String, Value>;

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid entity data: {0}")]
    InvalidData(#[from] serde_json::Error),

    #[error("entity data is not an object")]
    NotAnObject,

    #[error("unknown entity type {0}")]
    UnknownEntity(String),

    #[error("{0} is not persisted")]
    NotPersistent(&'static str),

    #[error("{0} does not fit its persisted field")]
    OutOfRange(&'static str),

    #[error("entity is not a {0}")]
    WrongType(&'static str),
}

/// Every entity type this server knows how to decode
static ENTITY_TYPES: [&dyn EntityType; 3] = [&AreaEffectCloudType, &LightningType, &PlayerType];

pub fn entity_type_by_name(name: &str) -> Option<&'static dyn EntityType> {
    ENTITY_TYPES
        .iter()
        .copied()
        .find(|t| t.encode_entity() == name)
}

/// Decode an entity from its encode name and persisted fields
pub fn decode_entity(name: &str, data: &EntityData) -> Result<EntityHandle, PersistError> {
    entity_type_by_name(name)
        .ok_or_else(|| PersistError::UnknownEntity(name.to_string()))?
        .decode(data)
}

/// Encode an entity through its own type descriptor
pub fn encode_entity(entity: &dyn Entity) -> Result<EntityData, PersistError> {
    entity.entity_type().encode(entity)
}

/// Serialize a typed record into flat entity data
pub(crate) fn to_data<T: Serialize>(record: &T) -> Result<EntityData, PersistError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(PersistError::NotAnObject),
    }
}

/// Deserialize flat entity data into a typed record
pub(crate) fn from_data<T: DeserializeOwned>(data: &EntityData) -> Result<T, PersistError> {
    Ok(serde_json::from_value(Value::Object(data.clone()))?)
}
