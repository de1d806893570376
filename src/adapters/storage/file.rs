use crate::core::registry::parse_options;
use crate::domain::model::{WriteReturns, Written};
use crate::domain::ports::{Adapter, Request, WriteRequest};
use crate::utils::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options shared by the local file adapters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Directory every filename is resolved against.
    #[serde(alias = "path_root")]
    pub path: PathBuf,
    pub create_missing_dirs: bool,
    pub write_returns: WriteReturns,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("files"),
            create_missing_dirs: true,
            write_returns: WriteReturns::Name,
        }
    }
}

impl FileOptions {
    /// `filename` below the root. Leading separators are ignored; a name
    /// that is empty or climbs out with `..` resolves to nothing, so no
    /// operation can reach the root itself or anything outside it.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let relative = Path::new(filename.trim_start_matches(['/', '\\']));
        let mut named = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    warn!(filename, "Filename escapes the configured root");
                    return None;
                }
            }
        }
        if !named {
            warn!(filename, "Filename does not name anything below the root");
            return None;
        }
        Some(self.path.join(relative))
    }
}

pub(crate) fn log_failure(operation: &str, path: &Path, error: &io::Error) {
    warn!(operation, path = %path.display(), error = %error, "File operation failed");
}

pub(crate) fn failed<T>(operation: &str, path: &Path, error: io::Error) -> Option<T> {
    log_failure(operation, path, &error);
    None
}

pub(crate) fn read_file(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Some(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not found");
            None
        }
        Err(e) => failed("read", path, e),
    }
}

/// Queries the filesystem on every call; nothing about a path is cached.
pub(crate) fn path_exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            log_failure("exists", path, &e);
            false
        }
    }
}

/// Removes an empty directory or a file at `path`, trying the directory
/// first. Returns false when nothing existed or nothing could be removed.
pub(crate) fn delete_path(path: &Path) -> bool {
    if !path_exists(path) {
        debug!(path = %path.display(), "Nothing to delete");
        return false;
    }
    if fs::remove_dir(path).is_ok() {
        return true;
    }
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            log_failure("delete", path, &e);
            false
        }
    }
}

/// Strict local file adapter.
///
/// Only writes byte payloads; an upload that no strategy resolved is a
/// failed write. The root directory is created up front when
/// `create_missing_dirs` is set, as are missing parents of each target.
#[derive(Debug, Clone)]
pub struct File {
    options: FileOptions,
}

impl File {
    pub fn new(options: FileOptions) -> Result<Self> {
        if options.create_missing_dirs {
            fs::create_dir_all(&options.path)?;
        }
        Ok(Self { options })
    }

    pub fn from_options(config: &str, options: &Map<String, Value>) -> Result<Arc<dyn Adapter>> {
        let options: FileOptions = parse_options(config, "File", options)?;
        Ok(Arc::new(Self::new(options)?))
    }

    pub fn root(&self) -> &Path {
        &self.options.path
    }
}

impl Adapter for File {
    fn write(&self, request: &WriteRequest<'_>) -> Option<Written> {
        let path = self.options.resolve(request.filename)?;
        let Some(data) = request.payload.as_bytes() else {
            warn!(
                config = request.config,
                path = %path.display(),
                "Refusing to write an unresolved upload; configure the UploadFilter strategy"
            );
            return None;
        };

        if self.options.create_missing_dirs {
            if let Some(parent) = path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return failed("write", &path, e);
                }
            }
        }

        if let Err(e) = fs::write(&path, data) {
            return failed("write", &path, e);
        }
        debug!(path = %path.display(), bytes = data.len(), "Wrote file");

        let mode = request.options.write_returns.unwrap_or(self.options.write_returns);
        Some(mode.written(request.filename, data.len() as u64))
    }

    fn read(&self, request: &Request<'_>) -> Option<Vec<u8>> {
        read_file(&self.options.resolve(request.filename)?)
    }

    fn delete(&self, request: &Request<'_>) -> bool {
        self.options
            .resolve(request.filename)
            .is_some_and(|path| delete_path(&path))
    }

    fn exists(&self, request: &Request<'_>) -> bool {
        self.options
            .resolve(request.filename)
            .is_some_and(|path| path_exists(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Options, Payload, Upload};
    use serde_json::json;
    use tempfile::TempDir;

    fn adapter(dir: &TempDir, write_returns: WriteReturns) -> File {
        File::new(FileOptions {
            path: dir.path().join("files"),
            create_missing_dirs: true,
            write_returns,
        })
        .unwrap()
    }

    fn request<'a>(filename: &'a str, options: &'a Options) -> Request<'a> {
        Request {
            config: "default",
            filename,
            options,
        }
    }

    fn write(file: &File, filename: &str, payload: &Payload, options: &Options) -> Option<Written> {
        file.write(&WriteRequest {
            config: "default",
            filename,
            payload,
            options,
        })
    }

    #[test]
    fn test_constructor_creates_root() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        assert!(file.root().is_dir());
    }

    #[test]
    fn test_write_read_exists_delete() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        let options = Options::default();

        assert!(!file.exists(&request("a.txt", &options)));
        assert_eq!(
            write(&file, "a.txt", &Payload::from("hello"), &options),
            Some(Written::Name("a.txt".to_string()))
        );
        assert!(file.exists(&request("a.txt", &options)));
        assert_eq!(file.read(&request("a.txt", &options)), Some(b"hello".to_vec()));
        assert!(file.delete(&request("a.txt", &options)));
        assert!(!file.exists(&request("a.txt", &options)));
        assert!(!file.delete(&request("a.txt", &options)));
        assert_eq!(file.read(&request("a.txt", &options)), None);
    }

    #[test]
    fn test_write_returns_size_from_config_or_call() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Size);
        let payload = Payload::from("hello");

        assert_eq!(
            write(&file, "a.txt", &payload, &Options::default()),
            Some(Written::Size(5))
        );
        assert_eq!(
            write(
                &file,
                "a.txt",
                &payload,
                &Options::default().returning(WriteReturns::Name)
            ),
            Some(Written::Name("a.txt".to_string()))
        );
    }

    #[test]
    fn test_nested_write_needs_create_missing_dirs() {
        let dir = TempDir::new().unwrap();
        let options = Options::default();
        let payload = Payload::from("x");

        let creating = adapter(&dir, WriteReturns::Name);
        assert!(write(&creating, "a/b/c.txt", &payload, &options).is_some());

        let strict = File::new(FileOptions {
            path: dir.path().to_path_buf(),
            create_missing_dirs: false,
            write_returns: WriteReturns::Name,
        })
        .unwrap();
        assert_eq!(write(&strict, "missing/c.txt", &payload, &options), None);
    }

    #[test]
    fn test_delete_removes_empty_directory() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        fs::create_dir_all(file.root().join("empty")).unwrap();

        assert!(file.delete(&request("empty", &Options::default())));
        assert!(!file.root().join("empty").exists());
    }

    #[test]
    fn test_leading_separator_stays_below_root() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        let options = Options::default();

        assert!(write(&file, "/abs.txt", &Payload::from("x"), &options).is_some());
        assert!(file.root().join("abs.txt").exists());
    }

    #[test]
    fn test_names_outside_the_root_are_failures() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        let options = Options::default();
        fs::write(dir.path().join("outside.txt"), b"keep").unwrap();

        for name in ["", "/", ".", "./"] {
            assert!(!file.exists(&request(name, &options)));
            assert!(!file.delete(&request(name, &options)));
            assert_eq!(file.read(&request(name, &options)), None);
        }
        assert!(file.root().is_dir());
        assert!(write(&file, "a.txt", &Payload::from("x"), &options).is_some());

        for name in ["../outside.txt", "a/../../outside.txt"] {
            assert!(!file.exists(&request(name, &options)));
            assert!(!file.delete(&request(name, &options)));
            assert_eq!(file.read(&request(name, &options)), None);
            assert_eq!(write(&file, name, &Payload::from("y"), &options), None);
        }
        assert_eq!(fs::read(dir.path().join("outside.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_unresolved_upload_fails() {
        let dir = TempDir::new().unwrap();
        let file = adapter(&dir, WriteReturns::Name);
        let payload = Payload::from(Upload::new("a.png", dir.path().join("tmp")));
        assert_eq!(write(&file, "a.png", &payload, &Options::default()), None);
    }

    #[test]
    fn test_options_from_config_map() {
        let dir = TempDir::new().unwrap();
        let mut map = Map::new();
        map.insert("path_root".to_string(), json!(dir.path().join("root")));
        map.insert("write_returns".to_string(), json!("size"));

        let options: FileOptions = parse_options("default", "File", &map).unwrap();
        assert_eq!(options.path, dir.path().join("root"));
        assert!(options.create_missing_dirs);
        assert_eq!(options.write_returns, WriteReturns::Size);

        map.insert("write_returns".to_string(), json!("bytes"));
        assert!(File::from_options("default", &map).is_err());
    }
}
