//! Client-side replacement art for painting entities.
//!
//! Paintings are described by `assets/<ns>/client_paintings/**.json` files in resource packs
//! and drawn from images under `assets/<ns>/textures/client_paintings/`. The
//! [`ClientPaintingManager`] rebuilds both on every resource reload and decides, per entity,
//! whether a user painting replaces the built-in one.

pub mod cli;
pub mod config;
pub mod loader;
pub mod manager;
pub mod painting;
pub mod reload;
pub mod selection;
pub mod state;

pub use config::{ClientPaintingsConfig, ConfigError};
pub use loader::{DefinitionError, load_definition, parse_definition};
pub use manager::ClientPaintingManager;
pub use painting::{PaintingDefinition, PaintingDescriptor};
pub use reload::{CancelFlag, ReloadError, ReloadSummary};
pub use selection::select_index;
pub use state::LiveState;

#[cfg(test)]
mod tests;
