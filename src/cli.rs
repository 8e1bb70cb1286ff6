use clap::{Args, Parser, Subcommand, ValueEnum};
use fi_core::{CodecKind, StreamDescriptor};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffinput")]
#[command(
    author,
    version,
    about = "Read the audio and subtitle streams of a media file in time-aligned steps"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe sources and list their streams
    Probe {
        /// Media files to probe ("-" reads standard input)
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read sources step by step, printing one line per block
    Read {
        /// Media files to read one after another ("-" reads standard input)
        #[arg(required = true)]
        inputs: Vec<String>,

        #[command(flatten)]
        select: SelectArgs,

        /// Step length in milliseconds (overrides the config)
        #[arg(long)]
        step_ms: Option<u64>,

        /// Stop after this many blocks per source
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Read a whole source and write each selected stream to a directory
    Dump {
        /// Media file to read ("-" reads standard input)
        input: String,

        /// Directory to write the streams to
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        select: SelectArgs,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}

/// Stream selection shared by the reading commands.
///
/// Without any filter every audio and subtitle stream is selected.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Select streams of these kinds
    #[arg(long = "kind", value_enum, value_delimiter = ',')]
    pub kinds: Vec<KindArg>,

    /// Select streams with these probe indices
    #[arg(long = "stream", value_delimiter = ',')]
    pub streams: Vec<u32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Audio,
    Subtitle,
    Video,
}

impl From<KindArg> for CodecKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Audio => CodecKind::Audio,
            KindArg::Subtitle => CodecKind::Subtitle,
            KindArg::Video => CodecKind::Video,
        }
    }
}

impl SelectArgs {
    pub fn matches(&self, stream: &StreamDescriptor) -> bool {
        let kind_ok = if self.kinds.is_empty() {
            !self.streams.is_empty() || stream.kind.is_readable()
        } else {
            self.kinds.iter().any(|&k| CodecKind::from(k) == stream.kind)
        };
        let index_ok = self.streams.is_empty() || self.streams.contains(&stream.index);
        kind_ok && index_ok
    }
}
