use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use cp_utils::{EntityUuid, PaintingSize};

/// Loads client paintings from resource packs and reports what the renderer would see.
#[derive(Debug, Parser)]
#[command(name = "cp-client", version)]
pub struct Cli {
    /// Config file. Defaults to client_paintings.toml in the assets root.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resource pack directory or zip. Repeatable; later packs override earlier ones.
    #[arg(long = "pack", value_name = "PATH")]
    pub packs: Vec<PathBuf>,

    /// Report the painting drawn for an entity, e.g. `--pick 0000...0001@2x2`.
    #[arg(long = "pick", value_name = "UUID@WxH")]
    pub picks: Vec<PickRequest>,

    /// Write the stitched atlas to a PNG file.
    #[arg(long, value_name = "PATH")]
    pub dump_atlas: Option<PathBuf>,

    /// Overrides the configured log level.
    #[arg(long)]
    pub log_level: Option<String>,

    /// List every loaded painting.
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickRequest {
    pub entity: EntityUuid,
    pub size: PaintingSize,
}

impl FromStr for PickRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uuid, size) = s
            .split_once('@')
            .ok_or_else(|| format!("expected UUID@WxH, got {s:?}"))?;
        let entity = uuid.parse::<EntityUuid>().map_err(|e| e.to_string())?;
        let (width, height) = size
            .split_once('x')
            .ok_or_else(|| format!("expected WxH, got {size:?}"))?;
        let width = width.parse::<u32>().map_err(|e| e.to_string())?;
        let height = height.parse::<u32>().map_err(|e| e.to_string())?;
        let size = PaintingSize::new(width, height)
            .ok_or_else(|| format!("painting size must be at least 1x1, got {size}"))?;
        Ok(Self { entity, size })
    }
}
