use crate::domain::model::{Options, Payload, Upload, WriteReturns};
use crate::utils::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "filedispatch")]
#[command(about = "Read and write files through named storage configurations")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "filesystem.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip every configured strategy for this call
    #[arg(long, global = true)]
    pub no_strategies: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a file; content comes from --data, --input, --upload or stdin
    Write {
        name: String,
        filename: String,

        #[arg(long, conflicts_with_all = ["input", "upload"])]
        data: Option<String>,

        #[arg(long, conflicts_with = "upload")]
        input: Option<PathBuf>,

        /// Temporary file holding an upload
        #[arg(long, requires = "upload_name")]
        upload: Option<PathBuf>,

        /// Filename the uploader declared
        #[arg(long, requires = "upload")]
        upload_name: Option<String>,

        #[arg(long, value_enum)]
        returns: Option<ReturnsArg>,
    },
    /// Print a file's content to stdout, or save it with --output
    Read {
        name: String,
        filename: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Delete { name: String, filename: String },
    /// Exit with 0 when the file exists, 1 otherwise
    Exists { name: String, filename: String },
    /// List the configured filesystems
    Configs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReturnsArg {
    Name,
    Size,
}

impl From<ReturnsArg> for WriteReturns {
    fn from(arg: ReturnsArg) -> Self {
        match arg {
            ReturnsArg::Name => WriteReturns::Name,
            ReturnsArg::Size => WriteReturns::Size,
        }
    }
}

impl Cli {
    pub fn options(&self) -> Options {
        let mut options = if self.no_strategies {
            Options::without_strategies()
        } else {
            Options::default()
        };
        if let Command::Write {
            returns: Some(returns),
            ..
        } = &self.command
        {
            options = options.returning((*returns).into());
        }
        options
    }
}

impl Command {
    /// The payload of a `write`; `None` for every other command.
    pub fn payload(&self) -> Result<Option<Payload>> {
        let Command::Write {
            data,
            input,
            upload,
            upload_name,
            ..
        } = self
        else {
            return Ok(None);
        };

        let payload = match (data, input, upload, upload_name) {
            (Some(data), _, _, _) => Payload::from(data.as_str()),
            (_, Some(input), _, _) => Payload::Bytes(std::fs::read(input)?),
            (_, _, Some(upload), Some(name)) => Payload::Upload(Upload::new(name, upload)),
            _ => {
                let mut buffer = Vec::new();
                std::io::stdin().read_to_end(&mut buffer)?;
                Payload::Bytes(buffer)
            }
        };
        Ok(Some(payload))
    }
}
