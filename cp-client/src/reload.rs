use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cp_render::{AtlasStitcher, PreparedAtlas, StitchError, TextureManager, UploadError};
use cp_resource::{ResourceError, ResourceManager};
use cp_utils::{DEFINITION_EXTENSION, DEFINITIONS_DIR, Identifier, Timing};
use dashmap::DashMap;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, error, info};

use crate::loader::{DefinitionError, load_definition};
use crate::painting::PaintingDescriptor;
use crate::state::LiveState;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("could not enumerate painting definitions: {0}")]
    Resources(#[from] ResourceError),
    #[error("could not build the painting atlas: {0}")]
    Atlas(#[from] StitchError),
    #[error("could not upload the painting atlas: {0}")]
    Upload(#[from] UploadError),
    #[error("{fork} task failed: {source}")]
    Task {
        fork: &'static str,
        #[source]
        source: JoinError,
    },
    #[error("reload was cancelled")]
    Cancelled,
    #[error("reload {generation} finished after reload {published} was published")]
    Superseded { generation: u64, published: u64 },
    #[error("painting state lock is poisoned")]
    Poisoned,
}

/// Outcome of one successful reload. Mirrors what gets logged.
#[derive(Debug, Default)]
pub struct ReloadSummary {
    pub loaded: usize,
    pub skipped: Vec<(Identifier, DefinitionError)>,
    /// Paintings whose front image is not in the atlas. They render with the placeholder.
    pub missing_sprites: Vec<Identifier>,
    /// Paintings whose declared back image is not in the atlas.
    pub missing_back_sprites: Vec<Identifier>,
    pub sprites: usize,
    pub elapsed_ms: f32,
}

/// Shared between a reload and the loader tasks it spawned.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Cancels the flag when dropped unless disarmed first.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            flag: self.clone(),
            armed: true,
        }
    }
}

pub struct CancelOnDrop {
    flag: CancelFlag,
    armed: bool,
}

impl CancelOnDrop {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.cancel();
        }
    }
}

/// Everything the prepare phase produced. Nothing here is visible to readers yet.
pub(crate) struct Prepared {
    atlas: PreparedAtlas,
    definitions: DashMap<Identifier, PaintingDescriptor>,
    skipped: Vec<(Identifier, DefinitionError)>,
}

/// Runs both prepare forks on `prepare` and waits for both, even when one fails early.
pub(crate) async fn prepare(
    resources: Arc<dyn ResourceManager>,
    stitcher: Arc<dyn AtlasStitcher>,
    prepare: &Handle,
    cancel: &CancelFlag,
) -> Result<Prepared, ReloadError> {
    let (atlas, definitions) = tokio::join!(
        stitch_atlas(Arc::clone(&resources), stitcher, prepare, cancel),
        load_definitions(resources, prepare, cancel),
    );
    let atlas = atlas?;
    let (definitions, skipped) = definitions?;
    if cancel.is_cancelled() {
        return Err(ReloadError::Cancelled);
    }
    Ok(Prepared {
        atlas,
        definitions,
        skipped,
    })
}

async fn stitch_atlas(
    resources: Arc<dyn ResourceManager>,
    stitcher: Arc<dyn AtlasStitcher>,
    prepare: &Handle,
    cancel: &CancelFlag,
) -> Result<PreparedAtlas, ReloadError> {
    let timing = Timing::start("atlas");
    let cancel = cancel.clone();
    let atlas = prepare
        .spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Err(ReloadError::Cancelled);
            }
            Ok(stitcher.prepare(resources.as_ref())?)
        })
        .await
        .map_err(|source| ReloadError::Task {
            fork: "atlas",
            source,
        })??;
    debug!(
        "stitched {} sprites into {}x{}",
        atlas.atlas.len(),
        atlas.atlas.width(),
        atlas.atlas.height()
    );
    timing.finish();
    Ok(atlas)
}

type LoadedDefinitions = (
    DashMap<Identifier, PaintingDescriptor>,
    Vec<(Identifier, DefinitionError)>,
);

async fn load_definitions(
    resources: Arc<dyn ResourceManager>,
    prepare: &Handle,
    cancel: &CancelFlag,
) -> Result<LoadedDefinitions, ReloadError> {
    let timing = Timing::start("definitions");
    let found = prepare
        .spawn_blocking(move || {
            resources.find_resources(DEFINITIONS_DIR, &|id: &Identifier| {
                id.path().ends_with(DEFINITION_EXTENSION)
            })
        })
        .await
        .map_err(|source| ReloadError::Task {
            fork: "definitions",
            source,
        })??;

    let out = Arc::new(DashMap::with_capacity(found.len()));
    let tasks: Vec<_> = found
        .into_iter()
        .map(|(resource_id, resource)| {
            let out = Arc::clone(&out);
            let cancel = cancel.clone();
            let task_id = resource_id.clone();
            let task = prepare.spawn_blocking(move || {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                load_definition(&task_id, &resource, &out)
            });
            (resource_id, task)
        })
        .collect();

    let mut skipped = Vec::new();
    for (resource_id, task) in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!("Failed to load client painting {}: {}", resource_id, err);
                skipped.push((resource_id, err));
            }
            Err(source) => {
                return Err(ReloadError::Task {
                    fork: "definitions",
                    source,
                });
            }
        }
    }

    let definitions = Arc::try_unwrap(out).unwrap_or_else(|shared| shared.as_ref().clone());
    timing.finish();
    Ok((definitions, skipped))
}

/// Apply phase. Uploads the atlas, validates every painting against it and builds the
/// snapshot to publish. Runs to completion without yielding.
pub(crate) fn apply(
    prepared: Prepared,
    textures: &dyn TextureManager,
) -> Result<(LiveState, ReloadSummary), ReloadError> {
    let timing = Timing::start("apply");
    let Prepared {
        atlas: PreparedAtlas { atlas, image },
        definitions,
        skipped,
    } = prepared;

    textures.upload(atlas.id(), image)?;

    let state = LiveState::new(
        definitions.into_iter().map(|(_, painting)| painting),
        Some(Arc::new(atlas)),
    );
    let mut summary = ReloadSummary {
        loaded: state.len(),
        skipped,
        ..ReloadSummary::default()
    };

    if let Some(atlas) = state.atlas() {
        summary.sprites = atlas.len();
        for painting in state.iter() {
            if !atlas.contains(painting.texture()) {
                error!("Could not find sprite for painting {}", painting.id());
                summary.missing_sprites.push(painting.id().clone());
            }
            if let Some(back) = painting.declared_back()
                && !atlas.contains(back)
            {
                error!("Could not find back sprite for painting {}", painting.id());
                summary.missing_back_sprites.push(painting.id().clone());
            }
        }
    }

    timing.finish();
    Ok((state, summary))
}

pub(crate) fn log_published(summary: &ReloadSummary) {
    info!("Loaded {} client paintings", summary.loaded);
    if !summary.skipped.is_empty() {
        debug!("skipped {} painting definitions", summary.skipped.len());
    }
}
