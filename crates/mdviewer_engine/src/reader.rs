use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use mdviewer_logging::viewer_trace;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ReadError::FileNotFound(path.to_path_buf())
        } else {
            ReadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Accessor for the current document's source text.
///
/// Called once per scheduled fetch. May be slow and may fail.
#[async_trait::async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read_document(&self) -> Result<String, ReadError>;
}

/// Reads the current document from disk.
///
/// Line endings are normalized to `\n`, and every line ends with one.
/// Without a path the document is empty.
#[derive(Debug, Default)]
pub struct FileReader {
    path: RwLock<Option<PathBuf>>,
}

impl FileReader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: RwLock::new(path),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Points the reader at another file. The file must exist.
    pub fn set_path(&self, path: impl AsRef<Path>) -> Result<(), ReadError> {
        let path = path.as_ref();
        ensure_exists(path)?;
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentReader for FileReader {
    async fn read_document(&self) -> Result<String, ReadError> {
        let Some(path) = self.path() else {
            return Ok(String::new());
        };

        let file = File::open(&path)
            .await
            .map_err(|err| ReadError::from_io(&path, err))?;
        let mut lines = BufReader::new(file).lines();
        let mut contents = String::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| ReadError::from_io(&path, err))?
        {
            contents.push_str(&line);
            contents.push('\n');
        }
        viewer_trace!("read {} bytes from {:?}", contents.len(), path);
        Ok(contents)
    }
}

/// Checks that `path` exists.
///
/// # Errors
///
/// `FileNotFound` when it does not, `Io` when the check itself fails.
pub(crate) fn ensure_exists(path: &Path) -> Result<(), ReadError> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(ReadError::FileNotFound(path.to_path_buf())),
        Err(source) => Err(ReadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
