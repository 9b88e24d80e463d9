//! CLI argument definitions using clap
//!
//! - qmlpuppet <address> <mode>                      # serve a designer
//! - qmlpuppet --test                                # in-process self test
//! - qmlpuppet --readcapturedstream <file> [control] # replay a capture
//! - qmlpuppet --version

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use puppet_core::PuppetMode;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qmlpuppet")]
#[command(about = "Out-of-process QML worker for the visual designer")]
#[command(version)]
pub struct Cli {
    /// Run the built-in self test and exit
    #[arg(long, conflicts_with_all = ["read_captured_stream", "address"])]
    pub test: bool,

    /// Replay a captured command stream, optionally checked against a control stream
    #[arg(
        long = "readcapturedstream",
        num_args = 1..=2,
        value_names = ["FILE", "CONTROL"],
        conflicts_with = "address"
    )]
    pub read_captured_stream: Option<Vec<PathBuf>>,

    /// JSON configuration file (overrides QMLPUPPET_CONFIG)
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Address of the designer: a port or host:port
    pub address: Option<String>,

    /// editormode, rendermode or previewmode
    pub mode: Option<PuppetMode>,
}

/// What the process was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    SelfTest,
    ReadCaptured {
        stream: PathBuf,
        control: Option<PathBuf>,
    },
    Serve {
        address: String,
        mode: PuppetMode,
    },
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: RunMode,
    pub config_file: Option<PathBuf>,
}

/// Parse the command line; help and version requests come back as errors
/// of kind `DisplayHelp` or `DisplayVersion`
pub fn parse<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let config_file = cli.config_file;

    let mode = if cli.test {
        RunMode::SelfTest
    } else if let Some(mut files) = cli.read_captured_stream {
        let control = if files.len() > 1 { files.pop() } else { None };
        let stream = files.remove(0);
        RunMode::ReadCaptured { stream, control }
    } else {
        match (cli.address, cli.mode) {
            (Some(address), Some(mode)) => RunMode::Serve { address, mode },
            (None, _) => return Err(missing("the designer <ADDRESS>")),
            (Some(_), None) => return Err(missing("the puppet <MODE>")),
        }
    };
    Ok(Invocation { mode, config_file })
}

fn missing(what: &str) -> clap::Error {
    Cli::command().error(
        ErrorKind::MissingRequiredArgument,
        format!("{} is required unless --test or --readcapturedstream is given", what),
    )
}
