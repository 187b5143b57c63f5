use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CareLink: a terminal client for the health assistant.
#[derive(Parser, Debug)]
#[command(name = "carelink", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. `carelink=debug`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long, global = true)]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat with the assistant (default).
    Chat,
    /// Ask one question and print the answer.
    Ask {
        /// The question to send.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Scan a prescription image and list the medications found.
    Scan {
        image: PathBuf,
    },
    /// Turn text into speech through the backend.
    Speak {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Voice language (en-US, es-ES, fr-FR, de-DE, zh-CN, hi-IN).
        #[arg(long)]
        lang: Option<String>,
        /// Where to write the audio. Defaults to `speech.mp3`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Join the signaling relay and make or take a video call.
    Call,
}

pub fn parse() -> Args {
    Args::parse()
}
