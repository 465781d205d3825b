use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cp_utils::Identifier;
use thiserror::Error;
use tracing::debug;

mod pack;

pub use pack::{DirectoryPack, MemoryPack, ZipPack};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("resource pack `{pack}` is unavailable: {reason}")]
    Unavailable { pack: String, reason: String },
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}

#[derive(Clone)]
enum ResourceSource {
    File(PathBuf),
    ZipEntry { archive: Arc<Path>, entry: String },
    Memory(Arc<[u8]>),
}

/// Handle to one file inside one resource pack. Contents are read lazily.
#[derive(Clone)]
pub struct Resource {
    pack: Arc<str>,
    id: Identifier,
    source: ResourceSource,
}

impl Resource {
    pub fn pack_name(&self) -> &str {
        &self.pack
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn reader(&self) -> Result<Box<dyn BufRead + Send>, ResourceError> {
        match &self.source {
            ResourceSource::File(path) => {
                let file = File::open(path).map_err(|e| ResourceError::io(path, e))?;
                Ok(Box::new(BufReader::new(file)))
            }
            ResourceSource::ZipEntry { archive, entry } => {
                let bytes = read_zip_entry(archive, entry)?;
                Ok(Box::new(Cursor::new(bytes)))
            }
            ResourceSource::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        match &self.source {
            ResourceSource::File(path) => {
                std::fs::read(path).map_err(|e| ResourceError::io(path, e))
            }
            ResourceSource::ZipEntry { archive, entry } => read_zip_entry(archive, entry),
            ResourceSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("pack", &self.pack)
            .field("id", &self.id)
            .finish()
    }
}

fn read_zip_entry(archive: &Path, entry: &str) -> Result<Vec<u8>, ResourceError> {
    let file = File::open(archive).map_err(|e| ResourceError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ResourceError::zip(archive, e))?;
    let mut file = zip
        .by_name(entry)
        .map_err(|e| ResourceError::zip(archive, e))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| ResourceError::io(archive.join(entry), e))?;
    Ok(buf)
}

/// One layer of assets, laid out as `assets/<namespace>/<path>`.
pub trait ResourcePack: Send + Sync {
    fn name(&self) -> &str;

    /// Every resource whose path lies under `prefix`, across all namespaces.
    fn list(&self, prefix: &str) -> Result<Vec<Resource>, ResourceError>;

    fn open(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError>;
}

/// The host's view over the active pack stack.
pub trait ResourceManager: Send + Sync {
    fn find_resources(
        &self,
        prefix: &str,
        filter: &dyn Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Resource>, ResourceError>;

    fn resource(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError>;
}

/// Pack stack where later packs take priority over earlier ones.
#[derive(Default, Clone)]
pub struct LayeredResourceManager {
    packs: Vec<Arc<dyn ResourcePack>>,
}

impl LayeredResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pack: impl ResourcePack + 'static) {
        self.packs.push(Arc::new(pack));
    }

    pub fn with_pack(mut self, pack: impl ResourcePack + 'static) -> Self {
        self.push(pack);
        self
    }

    /// Opens folders as directory packs and anything else as a zip archive.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ResourceError> {
        let mut manager = Self::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                manager.push(DirectoryPack::new(path));
            } else {
                manager.push(ZipPack::open(path)?);
            }
        }
        Ok(manager)
    }

    pub fn pack_names(&self) -> impl Iterator<Item = &str> {
        self.packs.iter().map(|pack| pack.name())
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl ResourceManager for LayeredResourceManager {
    fn find_resources(
        &self,
        prefix: &str,
        filter: &dyn Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Resource>, ResourceError> {
        let mut found = BTreeMap::new();
        for pack in &self.packs {
            for resource in pack.list(prefix)? {
                if !filter(resource.id()) {
                    continue;
                }
                if let Some(shadowed) = found.insert(resource.id().clone(), resource) {
                    debug!(
                        "{} from {} shadowed by {}",
                        shadowed.id(),
                        shadowed.pack_name(),
                        pack.name()
                    );
                }
            }
        }
        Ok(found)
    }

    fn resource(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError> {
        for pack in self.packs.iter().rev() {
            if let Some(resource) = pack.open(id)? {
                return Ok(Some(resource));
            }
        }
        Ok(None)
    }
}
