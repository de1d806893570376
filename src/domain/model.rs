use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Data handed to `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Upload(Upload),
}

/// A file received through a form upload: the name the client declared and
/// the temporary location its content was stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub tmp_path: PathBuf,
}

impl Upload {
    pub fn new(name: impl Into<String>, tmp_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            tmp_path: tmp_path.into(),
        }
    }
}

impl Payload {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Upload(_) => None,
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Bytes(text.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Bytes(text.into_bytes())
    }
}

impl From<Upload> for Payload {
    fn from(upload: Upload) -> Self {
        Payload::Upload(upload)
    }
}

/// Successful result of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Name(String),
    Size(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteReturns {
    #[default]
    Name,
    Size,
}

impl WriteReturns {
    pub fn written(self, filename: &str, size: u64) -> Written {
        match self {
            WriteReturns::Name => Written::Name(filename.to_string()),
            WriteReturns::Size => Written::Size(size),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// When false, every strategy is skipped and the raw filename and payload
    /// reach the adapter.
    pub strategies: bool,
    /// Overrides the adapter's configured `write_returns`.
    pub write_returns: Option<WriteReturns>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strategies: true,
            write_returns: None,
        }
    }
}

impl Options {
    pub fn without_strategies() -> Self {
        Self {
            strategies: false,
            ..Self::default()
        }
    }

    pub fn returning(mut self, mode: WriteReturns) -> Self {
        self.write_returns = Some(mode);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Read,
    Delete,
    Exists,
}

impl Operation {
    pub fn filename_phase(self) -> Phase {
        match self {
            Operation::Write => Phase::FilenameWrite,
            Operation::Read => Phase::FilenameRead,
            Operation::Delete => Phase::FilenameDelete,
            Operation::Exists => Phase::FilenameExists,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Write => "write",
            Operation::Read => "read",
            Operation::Delete => "delete",
            Operation::Exists => "exists",
        };
        f.write_str(name)
    }
}

/// The operation and target a strategy is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    FilenameWrite,
    Write,
    FilenameRead,
    FilenameDelete,
    FilenameExists,
}

impl Phase {
    pub fn is_filename(self) -> bool {
        !matches!(self, Phase::Write)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::FilenameWrite => "filenameWrite",
            Phase::Write => "write",
            Phase::FilenameRead => "filenameRead",
            Phase::FilenameDelete => "filenameDelete",
            Phase::FilenameExists => "filenameExists",
        };
        f.write_str(name)
    }
}

/// A named configuration: the adapter to use, its options, the ordered
/// strategy chain and the filters wrapped around every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpec {
    pub adapter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<StrategySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ConfigSpec {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            ..Self::default()
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn strategy(mut self, strategy: StrategySpec) -> Self {
        self.strategies.get_or_insert_with(Vec::new).push(strategy);
        self
    }

    pub fn filter(mut self, name: impl Into<String>) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(name.into());
        self
    }

    /// Overlays `other` on top of `self`: the adapter is always replaced,
    /// strategies and filters are replaced when `other` carries them, and
    /// adapter options are merged key by key.
    pub fn merge(mut self, other: ConfigSpec) -> ConfigSpec {
        self.adapter = other.adapter;
        if other.strategies.is_some() {
            self.strategies = other.strategies;
        }
        if other.filters.is_some() {
            self.filters = other.filters;
        }
        self.options.extend(other.options);
        self
    }
}

impl StrategySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
