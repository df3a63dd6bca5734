use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geisli::{Score, Seq2SeqOverrides};

#[derive(Parser)]
#[command(name = "geisli")]
#[command(about = "Geisli: beam search decoding from the command line", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Decode with a bigram model and print the ranked hypotheses
    Decode(DecodeArgs),

    /// Inspect configuration (show, path)
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show {
        /// Config file to read instead of the search path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the configuration files that are searched, in order
    Path,
}

#[derive(Args, Debug, PartialEq)]
pub struct DecodeArgs {
    /// Bigram model file (JSON). Defaults to [model] path in the config
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Config file to read instead of the search path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of beams for beam search
    #[arg(short = 'b', long)]
    pub num_beams: Option<usize>,

    /// Maximum output length in tokens, start token included
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Minimum output length in tokens
    #[arg(long)]
    pub min_length: Option<usize>,

    /// Length penalty for beam search (< 1 shorter, > 1 longer)
    #[arg(long)]
    pub length_penalty: Option<Score>,

    /// Stop once enough finished hypotheses are found
    #[arg(long)]
    pub early_stopping: bool,

    /// Block repeated n-grams of this size
    #[arg(long)]
    pub no_repeat_ngram: Option<usize>,

    /// Repetition penalty (1.0 = no penalty)
    #[arg(long)]
    pub repetition_penalty: Option<Score>,

    /// Words that must never be generated, e.g. --bad-word "sat on" (repeatable)
    #[arg(long = "bad-word")]
    pub bad_words: Vec<String>,

    /// Sample candidates instead of taking the best
    #[arg(long)]
    pub sample: bool,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<Score>,

    /// Top-K sampling (limits to K most likely tokens, at least 2 x num-beams)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Top-P (nucleus) sampling threshold
    #[arg(long)]
    pub top_p: Option<Score>,

    /// Min-P sampling threshold
    #[arg(long)]
    pub min_p: Option<Score>,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use greedy decoding (single beam)
    #[arg(long)]
    pub greedy: bool,

    /// Output format: text or json
    #[arg(short, long)]
    pub format: Option<String>,

    /// Hide hypothesis scores in text output
    #[arg(long)]
    pub no_scores: bool,

    /// Stop decoding after this many milliseconds and print what was found
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Suppress status messages
    #[arg(short, long)]
    pub quiet: bool,
}

impl DecodeArgs {
    /// Generation overrides given on the command line.
    ///
    /// Bad words need the model vocabulary and are resolved by the command.
    pub fn overrides(&self) -> Seq2SeqOverrides {
        let sampling_flag = self.temperature.is_some()
            || self.top_k.is_some()
            || self.top_p.is_some()
            || self.min_p.is_some();

        Seq2SeqOverrides {
            num_beams: if self.greedy { Some(1) } else { self.num_beams },
            max_length: self.max_length,
            min_length: self.min_length,
            length_penalty: self.length_penalty,
            early_stopping: self.early_stopping.then_some(true),
            no_repeat_ngram_size: self.no_repeat_ngram,
            repetition_penalty: self.repetition_penalty,
            do_sample: (self.sample || sampling_flag).then_some(true),
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            min_p: self.min_p,
            seed: self.seed,
            ..Default::default()
        }
    }
}

pub fn verbosity_to_log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
