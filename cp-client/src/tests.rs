use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cp_render::{
    AtlasStitcher, HeadlessTextureManager, PreparedAtlas, SpriteStitcher, StitchError,
};
use cp_resource::{DirectoryPack, LayeredResourceManager, MemoryPack, ResourceManager};
use cp_utils::{
    DefaultPaintings, EntityUuid, Identifier, PaintingSize, PaintingVariant, sprite_atlas_id,
};
use image::{ImageFormat, Rgba, RgbaImage};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::*;

fn id(raw: &str) -> Identifier {
    raw.parse().unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn definition(texture: &str, width: i64, height: i64) -> Vec<u8> {
    format!(r#"{{"texture": "{texture}", "size": [{width}, {height}]}}"#).into_bytes()
}

/// Pack with one 16x16 image and one 2x2 definition per name.
fn gallery(name: &str, paintings: &[&str]) -> Arc<dyn ResourceManager> {
    let mut pack = MemoryPack::new(name);
    for painting in paintings {
        pack.insert(
            id(&format!("p:textures/client_paintings/{painting}.png")),
            png(16, 16),
        );
        pack.insert(
            id(&format!("p:client_paintings/{painting}.json")),
            definition(&format!("p:{painting}"), 2, 2),
        );
    }
    Arc::new(LayeredResourceManager::new().with_pack(pack))
}

fn two_by_two_defaults() -> DefaultPaintings {
    DefaultPaintings::from_variants(["v1", "v2"].map(|name| PaintingVariant {
        id: id(name),
        size: PaintingSize::new(2, 2).unwrap(),
    }))
}

fn manager_with(
    stitcher: impl AtlasStitcher + 'static,
) -> (Arc<ClientPaintingManager>, Arc<HeadlessTextureManager>) {
    let textures = Arc::new(HeadlessTextureManager::new());
    let manager = Arc::new(ClientPaintingManager::new(
        two_by_two_defaults(),
        Arc::new(stitcher),
        textures.clone(),
    ));
    (manager, textures)
}

async fn reload(
    manager: &Arc<ClientPaintingManager>,
    resources: Arc<dyn ResourceManager>,
) -> Result<ReloadSummary, ReloadError> {
    manager
        .reload(resources, Handle::current(), Handle::current())
        .await
        .unwrap()
}

fn ids(manager: &ClientPaintingManager) -> Vec<String> {
    manager.snapshot().ids().map(ToString::to_string).collect()
}

/// Blocks inside `prepare` until the test lets it through.
struct GatedStitcher {
    inner: SpriteStitcher,
    entered: UnboundedSender<()>,
    gate: Mutex<std_mpsc::Receiver<()>>,
    first_call_only: bool,
    calls: AtomicUsize,
}

impl GatedStitcher {
    fn new() -> (Self, std_mpsc::Sender<()>, UnboundedReceiver<()>) {
        let (gate_tx, gate_rx) = std_mpsc::channel();
        let (entered_tx, entered_rx) = unbounded_channel();
        let stitcher = Self {
            inner: SpriteStitcher::default(),
            entered: entered_tx,
            gate: Mutex::new(gate_rx),
            first_call_only: false,
            calls: AtomicUsize::new(0),
        };
        (stitcher, gate_tx, entered_rx)
    }

    /// Only the first `prepare` waits on the gate; later ones run straight through.
    fn first_call_only() -> (Self, std_mpsc::Sender<()>, UnboundedReceiver<()>) {
        let (mut stitcher, gate, entered) = Self::new();
        stitcher.first_call_only = true;
        (stitcher, gate, entered)
    }
}

impl AtlasStitcher for GatedStitcher {
    fn atlas_id(&self) -> &Identifier {
        self.inner.atlas_id()
    }

    fn prepare(&self, resources: &dyn ResourceManager) -> Result<PreparedAtlas, StitchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.send(());
        if (call == 0 || !self.first_call_only)
            && let Ok(gate) = self.gate.lock()
        {
            let _ = gate.recv();
        }
        self.inner.prepare(resources)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn picks_follow_slot_layout() {
    let (manager, _) = manager_with(SpriteStitcher::default());
    reload(&manager, gallery("base", &["a", "b"])).await.unwrap();

    // n = 2 user + 2 built-in slots.
    assert_eq!(manager.pick_by_hash(7, 2, 2), None);
    let hit = manager.pick_by_hash(5, 2, 2).unwrap();
    assert_eq!(hit.id(), &id("p:client_paintings/b"));
    assert_eq!(manager.pick_by_hash(5, 1, 1), None);

    let entity = EntityUuid::from_u128(5);
    assert_eq!(manager.pick(entity, 2, 2), Some(hit));
    assert_eq!(manager.pick(entity, 2, 2), manager.pick(entity, 2, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_manager_never_picks() {
    let (manager, _) = manager_with(SpriteStitcher::default());
    assert!(manager.is_empty());
    assert_eq!(manager.pick(EntityUuid::from_u128(5), 2, 2), None);

    reload(&manager, gallery("empty", &[])).await.unwrap();
    assert!(manager.is_empty());
    for hash in [i32::MIN, -5, 0, 5, i32::MAX] {
        assert_eq!(manager.pick_by_hash(hash, 2, 2), None);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_see_old_state_until_publish() {
    let (stitcher, gate, mut entered) = GatedStitcher::new();
    let (manager, _) = manager_with(stitcher);

    gate.send(()).unwrap();
    reload(&manager, gallery("first", &["a", "b"])).await.unwrap();
    entered.recv().await.unwrap();
    let first = manager.snapshot();

    let second = manager.reload(
        gallery("second", &["c"]),
        Handle::current(),
        Handle::current(),
    );
    entered.recv().await.unwrap();

    assert_eq!(ids(&manager), ["p:client_paintings/a", "p:client_paintings/b"]);
    assert_eq!(
        manager.pick_by_hash(5, 2, 2).unwrap().id(),
        &id("p:client_paintings/b")
    );

    gate.send(()).unwrap();
    let summary = second.await.unwrap().unwrap();
    assert_eq!(summary.loaded, 1);
    assert_eq!(ids(&manager), ["p:client_paintings/c"]);
    assert!(manager.painting(&id("p:client_paintings/a")).is_none());

    // A snapshot taken earlier stays whole.
    assert_eq!(first.len(), 2);
    assert!(first.atlas().unwrap().contains(&id("p:a")));
    assert!(!first.atlas().unwrap().contains(&id("p:c")));
    let current = manager.snapshot();
    assert!(current.atlas().unwrap().contains(&id("p:c")));
    assert!(!current.atlas().unwrap().contains(&id("p:a")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aborted_reload_publishes_nothing() {
    let (stitcher, gate, mut entered) = GatedStitcher::new();
    let (manager, textures) = manager_with(stitcher);

    gate.send(()).unwrap();
    reload(&manager, gallery("first", &["a", "b"])).await.unwrap();
    entered.recv().await.unwrap();
    let uploaded = textures.latest(&sprite_atlas_id()).unwrap();

    let second = manager.reload(
        gallery("second", &["c", "d", "e", "f", "g"]),
        Handle::current(),
        Handle::current(),
    );
    entered.recv().await.unwrap();
    second.abort();
    gate.send(()).unwrap();

    let err = second.await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(ids(&manager), ["p:client_paintings/a", "p:client_paintings/b"]);
    let latest = textures.latest(&sprite_atlas_id()).unwrap();
    assert!(Arc::ptr_eq(&uploaded, &latest));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_definitions_are_skipped() {
    let pack = MemoryPack::new("mixed")
        .with(id("p:textures/client_paintings/good.png"), png(16, 16))
        .with(id("p:client_paintings/good.json"), definition("p:good", 1, 1))
        .with(
            id("p:client_paintings/no_texture.json"),
            br#"{"size": [1, 1]}"#.as_slice(),
        )
        .with(id("p:client_paintings/zero.json"), definition("p:good", 0, 2));
    let (manager, _) = manager_with(SpriteStitcher::default());

    let summary = reload(&manager, Arc::new(LayeredResourceManager::new().with_pack(pack)))
        .await
        .unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(ids(&manager), ["p:client_paintings/good"]);
    let skipped: Vec<_> = summary.skipped.iter().map(|(id, _)| id.to_string()).collect();
    assert_eq!(
        skipped,
        ["p:client_paintings/no_texture.json", "p:client_paintings/zero.json"]
    );
    assert!(matches!(summary.skipped[0].1, DefinitionError::Json(_)));
    assert!(matches!(
        summary.skipped[1].1,
        DefinitionError::InvalidSize { width: 0, height: 2 }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_atlas_keeps_previous_state() {
    let (manager, _) = manager_with(SpriteStitcher::new(32));
    reload(&manager, gallery("small", &["a", "b"])).await.unwrap();

    let pack = MemoryPack::new("huge")
        .with(id("p:textures/client_paintings/huge.png"), png(64, 64))
        .with(id("p:client_paintings/huge.json"), definition("p:huge", 4, 4));
    let result = reload(&manager, Arc::new(LayeredResourceManager::new().with_pack(pack))).await;

    assert!(matches!(
        result,
        Err(ReloadError::Atlas(StitchError::TooLarge { max: 32, .. }))
    ));
    assert_eq!(ids(&manager), ["p:client_paintings/a", "p:client_paintings/b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_pack_fails_reload() {
    let (manager, _) = manager_with(SpriteStitcher::default());
    reload(&manager, gallery("base", &["a"])).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let missing = DirectoryPack::new(dir.path().join("gone"));
    let result = reload(
        &manager,
        Arc::new(LayeredResourceManager::new().with_pack(missing)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ReloadError::Atlas(_) | ReloadError::Resources(_))
    ));
    assert_eq!(ids(&manager), ["p:client_paintings/a"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_sprites_are_reported_but_kept() {
    let pack = MemoryPack::new("ghosts")
        .with(id("p:textures/client_paintings/real.png"), png(32, 16))
        .with(
            id("p:client_paintings/ghost.json"),
            br#"{"texture": "p:ghost", "back": "p:ghost_back", "size": [2, 1]}"#.as_slice(),
        )
        .with(
            id("p:client_paintings/real.json"),
            br#"{"texture": "p:real", "back": "p:real", "size": [2, 1]}"#.as_slice(),
        );
    let (manager, _) = manager_with(SpriteStitcher::default());

    let summary = reload(&manager, Arc::new(LayeredResourceManager::new().with_pack(pack)))
        .await
        .unwrap();

    let ghost_id = id("p:client_paintings/ghost");
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.missing_sprites, [ghost_id.clone()]);
    assert_eq!(summary.missing_back_sprites, [ghost_id.clone()]);

    let state = manager.snapshot();
    let atlas = state.atlas().unwrap();
    let ghost = state.get(&ghost_id).unwrap();
    assert_eq!(state.sprite(ghost), Some(atlas.missing()));
    assert_eq!(state.back_sprite(ghost), None);

    let real = state.get(&id("p:client_paintings/real")).unwrap();
    assert_eq!(state.sprite(real).unwrap().id, id("p:real"));
    assert_eq!(state.back_sprite(real).unwrap().id, id("p:real"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn directory_pack_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("gallery");
    let defs = root.join("assets/mypack/client_paintings/gallery");
    let textures_dir = root.join("assets/mypack/textures/client_paintings/gallery");
    std::fs::create_dir_all(&defs).unwrap();
    std::fs::create_dir_all(&textures_dir).unwrap();
    std::fs::write(defs.join("moon.json"), definition("mypack:gallery/moon", 1, 2)).unwrap();
    std::fs::write(textures_dir.join("moon.png"), png(16, 32)).unwrap();

    let (manager, textures) = manager_with(SpriteStitcher::default());
    let resources = LayeredResourceManager::from_paths(&[root]).unwrap();
    let summary = reload(&manager, Arc::new(resources)).await.unwrap();

    assert_eq!(summary.loaded, 1);
    assert!(summary.missing_sprites.is_empty());
    let moon = manager
        .painting(&id("mypack:client_paintings/gallery/moon"))
        .unwrap();
    assert_eq!((moon.width(), moon.height()), (1, 2));
    assert_eq!((moon.pixels_x(), moon.pixels_y()), (16, 32));
    assert_eq!(moon.back_texture(), id("minecraft:painting/back"));

    let state = manager.snapshot();
    let atlas = state.atlas().unwrap();
    let uploaded = textures.latest(&sprite_atlas_id()).unwrap();
    assert_eq!(uploaded.dimensions(), (atlas.width(), atlas.height()));
    assert_eq!(manager.atlas_id(), &sprite_atlas_id());
    assert_eq!(manager.listener_id(), id("clientpaintings:client_paintings"));
}

#[test]
fn cancel_guard_fires_unless_disarmed() {
    let flag = CancelFlag::new();
    flag.guard().disarm();
    assert!(!flag.is_cancelled());

    drop(flag.guard());
    assert!(flag.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn older_reload_never_replaces_newer_state() {
    let (stitcher, gate, mut entered) = GatedStitcher::first_call_only();
    let (manager, textures) = manager_with(stitcher);

    let slow = manager.reload(
        gallery("slow", &["a", "b"]),
        Handle::current(),
        Handle::current(),
    );
    entered.recv().await.unwrap();

    reload(&manager, gallery("fast", &["c"])).await.unwrap();
    assert_eq!(ids(&manager), ["p:client_paintings/c"]);
    let uploaded = textures.latest(&sprite_atlas_id()).unwrap();

    gate.send(()).unwrap();
    let result = slow.await.unwrap();
    assert!(matches!(
        result,
        Err(ReloadError::Superseded {
            generation: 1,
            published: 2
        })
    ));
    assert_eq!(ids(&manager), ["p:client_paintings/c"]);
    let latest = textures.latest(&sprite_atlas_id()).unwrap();
    assert!(Arc::ptr_eq(&uploaded, &latest));
    assert!(manager.snapshot().atlas().unwrap().contains(&id("p:c")));
}

/// Collects formatted log lines for one test.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut out) = self.0.lock() {
            out.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn error_lines(&self) -> Vec<String> {
        let out = self.0.lock().unwrap();
        String::from_utf8_lossy(&out)
            .lines()
            .filter(|line| line.contains("ERROR"))
            .map(str::to_owned)
            .collect()
    }

    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        let capture = self.clone();
        tracing_subscriber::fmt()
            .without_time()
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .with_writer(move || capture.clone())
            .finish()
    }
}

// Current-thread runtime: the pipeline's own logging happens on the test thread.
#[tokio::test]
async fn bad_definitions_and_missing_sprites_are_logged() {
    let capture = LogCapture::default();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let pack = MemoryPack::new("mixed")
        .with(id("p:textures/client_paintings/good.png"), png(16, 16))
        .with(id("p:client_paintings/good.json"), definition("p:good", 1, 1))
        .with(
            id("p:client_paintings/no_texture.json"),
            br#"{"size": [1, 1]}"#.as_slice(),
        )
        .with(id("p:client_paintings/zero.json"), definition("p:good", 0, 2));
    let (manager, _) = manager_with(SpriteStitcher::default());
    reload(&manager, Arc::new(LayeredResourceManager::new().with_pack(pack)))
        .await
        .unwrap();

    let errors = capture.error_lines();
    assert_eq!(errors.len(), 2, "{errors:#?}");
    assert!(errors[0].contains("p:client_paintings/no_texture.json"));
    assert!(errors[1].contains("p:client_paintings/zero.json"));

    let ghosts = MemoryPack::new("ghosts")
        .with(id("p:textures/client_paintings/real.png"), png(16, 16))
        .with(
            id("p:client_paintings/ghost.json"),
            br#"{"texture": "p:ghost", "back": "p:ghost_back", "size": [1, 1]}"#.as_slice(),
        );
    reload(&manager, Arc::new(LayeredResourceManager::new().with_pack(ghosts)))
        .await
        .unwrap();

    let errors = capture.error_lines();
    assert_eq!(errors.len(), 4, "{errors:#?}");
    assert!(errors[2].contains("Could not find sprite for painting p:client_paintings/ghost"));
    assert!(errors[3].contains("Could not find back sprite for painting p:client_paintings/ghost"));
}
