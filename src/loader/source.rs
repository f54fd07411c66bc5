use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

/// Where weight files come from. Implementations are shared across the
/// loader's fetch threads, hence `Sync`.
pub trait WeightSource: Sync {
    /// Returns the raw bytes of the named file.
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Reads weight files from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSource { root: root.into() }
    }
}

impl WeightSource for DirSource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        // Names come from `tensor_file_name`, but reject anything that could
        // escape the root all the same.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid weight file name '{}'", name),
            ));
        }
        std::fs::read(self.root.join(name))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory file map, used for embedded weights and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    pub fn with(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl WeightSource for MemorySource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file '{}'", name))
        })
    }

    fn describe(&self) -> String {
        format!("memory ({} files)", self.files.len())
    }
}
