use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use cp_render::{AtlasStitcher, TextureManager};
use cp_resource::ResourceManager;
use cp_utils::{DefaultPaintings, EntityUuid, Identifier, Timing, reload_listener_id};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::painting::PaintingDescriptor;
use crate::reload::{self, CancelFlag, Prepared, ReloadError, ReloadSummary};
use crate::selection;
use crate::state::LiveState;

/// Owns the published painting state and rebuilds it when resource packs change.
///
/// Readers (`pick`, `painting`, `snapshot`) never block: they see either the previous
/// generation or the next one, never a mix.
pub struct ClientPaintingManager {
    live: ArcSwap<LiveState>,
    /// Last generation handed out to a reload.
    started: AtomicU64,
    /// Generation of the published state. Held while storing so publishes are ordered.
    published: Mutex<u64>,
    defaults: DefaultPaintings,
    stitcher: Arc<dyn AtlasStitcher>,
    textures: Arc<dyn TextureManager>,
}

impl ClientPaintingManager {
    pub fn new(
        defaults: DefaultPaintings,
        stitcher: Arc<dyn AtlasStitcher>,
        textures: Arc<dyn TextureManager>,
    ) -> Self {
        Self {
            live: ArcSwap::from_pointee(LiveState::empty()),
            started: AtomicU64::new(0),
            published: Mutex::new(0),
            defaults,
            stitcher,
            textures,
        }
    }

    /// Name this manager registers under with the host's reload scheduler.
    pub fn listener_id(&self) -> Identifier {
        reload_listener_id()
    }

    pub fn snapshot(&self) -> Arc<LiveState> {
        self.live.load_full()
    }

    pub fn painting(&self, id: &Identifier) -> Option<Arc<PaintingDescriptor>> {
        self.live.load().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.live.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.load().is_empty()
    }

    pub fn atlas_id(&self) -> &Identifier {
        self.stitcher.atlas_id()
    }

    /// User painting to draw for the entity, or `None` to keep its built-in art.
    pub fn pick(
        &self,
        entity: EntityUuid,
        width: u32,
        height: u32,
    ) -> Option<Arc<PaintingDescriptor>> {
        self.pick_by_hash(entity.hash_code(), width, height)
    }

    pub fn pick_by_hash(
        &self,
        hash: i32,
        width: u32,
        height: u32,
    ) -> Option<Arc<PaintingDescriptor>> {
        selection::pick(&self.live.load(), &self.defaults, hash, width, height)
    }

    /// Rebuilds the painting state from `resources`.
    ///
    /// Discovery, parsing and stitching run on `prepare`. Upload, validation and publication
    /// run on `apply`, which also drives the returned task. Aborting the task stops pending
    /// loads and leaves the current state in place, as does any error. A reload that finishes
    /// after a later-started one has published fails with [`ReloadError::Superseded`].
    pub fn reload(
        self: &Arc<Self>,
        resources: Arc<dyn ResourceManager>,
        prepare: Handle,
        apply: Handle,
    ) -> JoinHandle<Result<ReloadSummary, ReloadError>> {
        let manager = Arc::clone(self);
        let generation = self.started.fetch_add(1, Ordering::AcqRel) + 1;
        apply.spawn(async move {
            let timing = Timing::start("reload");
            let cancel = CancelFlag::new();
            let guard = cancel.guard();

            let prepared =
                reload::prepare(resources, Arc::clone(&manager.stitcher), &prepare, &cancel).await?;
            let mut summary = manager.publish(generation, prepared)?;
            guard.disarm();

            summary.elapsed_ms = timing.finish();
            reload::log_published(&summary);
            Ok(summary)
        })
    }

    /// Uploads and publishes under the generation lock, so an older reload can neither
    /// replace the atlas texture nor the state of a newer one.
    fn publish(
        &self,
        generation: u64,
        prepared: Prepared,
    ) -> Result<ReloadSummary, ReloadError> {
        let mut published = self
            .published
            .lock()
            .map_err(|_| ReloadError::Poisoned)?;
        if *published > generation {
            return Err(ReloadError::Superseded {
                generation,
                published: *published,
            });
        }
        let (state, summary) = reload::apply(prepared, self.textures.as_ref())?;
        self.live.store(Arc::new(state));
        *published = generation;
        Ok(summary)
    }
}
