use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cp_client::cli::Cli;
use cp_client::{ClientPaintingManager, ClientPaintingsConfig, ConfigError, ReloadSummary};
use cp_render::{HeadlessTextureManager, SpriteStitcher};
use cp_resource::LayeredResourceManager;
use cp_utils::{DefaultPaintings, client_paintings_assets_root, default_config_path};
use tokio::runtime::Builder;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("cp-client: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Validated in load_config.
    let level = config.log_level().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_max_level(level)
        .init();

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientPaintingsConfig, ConfigError> {
    let assets_root = client_paintings_assets_root();
    let mut config = match &cli.config {
        Some(path) => ClientPaintingsConfig::load(path)?,
        None => ClientPaintingsConfig::load_or_default(default_config_path(&assets_root))?,
    };
    config.packs.extend(cli.packs.iter().cloned());
    if config.packs.is_empty() {
        config.packs.push(assets_root);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli, config: ClientPaintingsConfig) -> Result<(), Box<dyn Error>> {
    let resources = LayeredResourceManager::from_paths(&config.packs)?;
    info!(
        "Using resource packs: {}",
        resources.pack_names().collect::<Vec<_>>().join(", ")
    );

    let prepare = Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(config.reload.prepare_threads)
        .thread_name("cp-prepare")
        .build()?;
    let apply = Builder::new_current_thread().build()?;

    let textures = Arc::new(HeadlessTextureManager::new());
    let manager = Arc::new(ClientPaintingManager::new(
        DefaultPaintings::vanilla(),
        Arc::new(SpriteStitcher::new(config.atlas.max_size)),
        textures.clone(),
    ));
    info!("Reloading {}", manager.listener_id());

    let task = manager.reload(
        Arc::new(resources),
        prepare.handle().clone(),
        apply.handle().clone(),
    );
    let summary = apply.block_on(task)??;
    print_summary(&summary);

    if cli.list {
        for painting in manager.snapshot().iter() {
            println!(
                "{}  {}  texture={}  back={}",
                painting.id(),
                painting.size(),
                painting.texture(),
                painting.back_texture()
            );
        }
    }

    for request in &cli.picks {
        let size = request.size;
        match manager.pick(request.entity, size.width, size.height) {
            Some(painting) => println!("{} {} -> {}", request.entity, size, painting.id()),
            None => println!("{} {} -> built-in", request.entity, size),
        }
    }

    if let Some(path) = &cli.dump_atlas {
        let image = textures
            .latest(manager.atlas_id())
            .ok_or("no atlas was uploaded")?;
        image.save(path)?;
        println!("Wrote {}x{} atlas to {}", image.width(), image.height(), path.display());
    }

    Ok(())
}

fn print_summary(summary: &ReloadSummary) {
    println!(
        "Loaded {} client paintings, {} sprites in {:.1} ms",
        summary.loaded, summary.sprites, summary.elapsed_ms
    );
    for (id, err) in &summary.skipped {
        println!("  skipped {id}: {err}");
    }
    for id in &summary.missing_sprites {
        println!("  missing sprite for {id}");
    }
    for id in &summary.missing_back_sprites {
        println!("  missing back sprite for {id}");
    }
    if summary.loaded == 0 {
        warn!("No client paintings found");
    }
}
