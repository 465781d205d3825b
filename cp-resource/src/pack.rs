use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cp_utils::Identifier;
use tracing::warn;

use crate::{Resource, ResourceError, ResourcePack, ResourceSource};

const ASSETS_DIR: &str = "assets";

fn pack_name_for(path: &Path) -> Arc<str> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
        .into()
}

/// Splits an in-pack path like `assets/<ns>/<path>` into namespace and path.
fn split_asset_entry(entry: &str) -> Option<(&str, &str)> {
    let rest = entry.strip_prefix(ASSETS_DIR)?.strip_prefix('/')?;
    rest.split_once('/')
}

fn path_is_under(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Unpacked pack on disk.
pub struct DirectoryPack {
    name: Arc<str>,
    root: PathBuf,
}

impl DirectoryPack {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: pack_name_for(&root),
            root,
        }
    }

    fn walk(
        &self,
        namespace: &str,
        dir: &Path,
        out: &mut Vec<Resource>,
    ) -> Result<(), ResourceError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ResourceError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ResourceError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| ResourceError::io(&path, e))?;
            if file_type.is_dir() {
                self.walk(namespace, &path, out)?;
                continue;
            }
            let namespace_root = self.root.join(ASSETS_DIR).join(namespace);
            let Ok(relative) = path.strip_prefix(&namespace_root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match Identifier::new(namespace, &relative) {
                Ok(id) => out.push(Resource {
                    pack: Arc::clone(&self.name),
                    id,
                    source: ResourceSource::File(path),
                }),
                Err(err) => warn!("ignoring {:?} in pack {}: {err}", path, self.name),
            }
        }
        Ok(())
    }
}

impl ResourcePack for DirectoryPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<Resource>, ResourceError> {
        if !self.root.is_dir() {
            return Err(ResourceError::Unavailable {
                pack: self.name.to_string(),
                reason: format!("{:?} is not a directory", self.root),
            });
        }
        let assets = self.root.join(ASSETS_DIR);
        if !assets.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let namespaces = std::fs::read_dir(&assets).map_err(|e| ResourceError::io(&assets, e))?;
        for namespace in namespaces {
            let namespace = namespace.map_err(|e| ResourceError::io(&assets, e))?;
            let Some(name) = namespace.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let start = namespace.path().join(prefix);
            if start.is_dir() {
                self.walk(&name, &start, &mut out)?;
            }
        }
        Ok(out)
    }

    fn open(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError> {
        let path = self
            .root
            .join(ASSETS_DIR)
            .join(id.namespace())
            .join(id.path());
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Resource {
            pack: Arc::clone(&self.name),
            id: id.clone(),
            source: ResourceSource::File(path),
        }))
    }
}

/// Zipped pack. The archive is reopened per read so handles stay `Send + Sync`.
pub struct ZipPack {
    name: Arc<str>,
    archive: Arc<Path>,
    entries: Vec<String>,
}

impl ZipPack {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ResourceError::io(path, e))?;
        let zip = zip::ZipArchive::new(file).map_err(|e| ResourceError::zip(path, e))?;
        let entries = zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_owned)
            .collect();
        Ok(Self {
            name: pack_name_for(path),
            archive: Arc::from(path),
            entries,
        })
    }

    fn resource_for(&self, entry: &str, id: Identifier) -> Resource {
        Resource {
            pack: Arc::clone(&self.name),
            id,
            source: ResourceSource::ZipEntry {
                archive: Arc::clone(&self.archive),
                entry: entry.to_string(),
            },
        }
    }
}

impl ResourcePack for ZipPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<Resource>, ResourceError> {
        Ok(self
            .entries
            .iter()
            .filter_map(|entry| {
                let (namespace, path) = split_asset_entry(entry)?;
                if !path_is_under(path, prefix) {
                    return None;
                }
                match Identifier::new(namespace, path) {
                    Ok(id) => Some(self.resource_for(entry, id)),
                    Err(err) => {
                        warn!("ignoring {entry} in pack {}: {err}", self.name);
                        None
                    }
                }
            })
            .collect())
    }

    fn open(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError> {
        let entry = format!("{ASSETS_DIR}/{}/{}", id.namespace(), id.path());
        Ok(self
            .entries
            .iter()
            .any(|e| *e == entry)
            .then(|| self.resource_for(&entry, id.clone())))
    }
}

/// In-memory pack, for embedding hosts and tests.
pub struct MemoryPack {
    name: Arc<str>,
    files: BTreeMap<Identifier, Arc<[u8]>>,
}

impl MemoryPack {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: Identifier, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(id, bytes.into());
    }

    pub fn with(mut self, id: Identifier, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(id, bytes);
        self
    }

    fn resource_for(&self, id: &Identifier, bytes: &Arc<[u8]>) -> Resource {
        Resource {
            pack: Arc::clone(&self.name),
            id: id.clone(),
            source: ResourceSource::Memory(Arc::clone(bytes)),
        }
    }
}

impl ResourcePack for MemoryPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<Resource>, ResourceError> {
        Ok(self
            .files
            .iter()
            .filter(|(id, _)| id.is_under(prefix))
            .map(|(id, bytes)| self.resource_for(id, bytes))
            .collect())
    }

    fn open(&self, id: &Identifier) -> Result<Option<Resource>, ResourceError> {
        Ok(self.files.get(id).map(|bytes| self.resource_for(id, bytes)))
    }
}
