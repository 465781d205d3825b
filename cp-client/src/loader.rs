use std::io::Read;

use cp_resource::{Resource, ResourceError};
use cp_utils::{DEFINITION_EXTENSION, Identifier};
use dashmap::DashMap;
use thiserror::Error;

use crate::painting::{PaintingDefinition, PaintingDescriptor};

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("malformed painting definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("painting size {width}x{height} is out of range")]
    InvalidSize { width: i64, height: i64 },
    #[error("{0} is not a .json definition")]
    NotADefinition(Identifier),
}

/// `ns:client_paintings/foo.json` is registered as `ns:client_paintings/foo`.
pub fn descriptor_id(resource_id: &Identifier) -> Option<Identifier> {
    resource_id.strip_extension(DEFINITION_EXTENSION)
}

pub fn parse_definition(
    id: Identifier,
    reader: impl Read,
) -> Result<PaintingDescriptor, DefinitionError> {
    let definition: PaintingDefinition = serde_json::from_reader(reader)?;
    definition.into_descriptor(id)
}

/// Parses one definition file into `out`. Safe to call from many threads at once.
pub fn load_definition(
    resource_id: &Identifier,
    resource: &Resource,
    out: &DashMap<Identifier, PaintingDescriptor>,
) -> Result<(), DefinitionError> {
    let id = descriptor_id(resource_id)
        .ok_or_else(|| DefinitionError::NotADefinition(resource_id.clone()))?;
    let descriptor = parse_definition(id.clone(), resource.reader()?)?;
    out.insert(id, descriptor);
    Ok(())
}
