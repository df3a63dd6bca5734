//! Decode command: beam search over a bigram model file

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use geisli::{
    BigramModel, CancellationToken, DecodeOutput, OutputFormat, Score, Seq2SeqGenerator,
    Seq2SeqModel,
};
use geisli_cli::DecodeArgs;

use super::display::{rank_label, score_label, separator, stop_reason_label};
use super::util::{load_file_config, resolve_format, resolve_model_path};

#[derive(Debug, Serialize)]
struct DecodeReport<'a> {
    model: &'a str,
    stop_reason: &'static str,
    steps: usize,
    hypotheses: Vec<HypothesisReport>,
}

#[derive(Debug, Serialize)]
struct HypothesisReport {
    rank: usize,
    text: String,
    tokens: Vec<u32>,
    score: Score,
}

pub async fn run(args: DecodeArgs) -> Result<()> {
    // 1. Resolve configuration
    let file_config = load_file_config(args.config.as_deref())?;
    let format = resolve_format(args.format.as_deref(), file_config.output.format)?;
    let show_scores = file_config.output.scores && !args.no_scores;
    if !file_config.output.color {
        colored::control::set_override(false);
    }

    // 2. Load model
    let model_path = resolve_model_path(args.model.as_deref(), &file_config)?;
    if !args.quiet {
        eprintln!("Loading model '{}'...", model_path.display());
    }
    let model = BigramModel::from_path(&model_path)?;

    // 3. Build overrides: CLI flags > config file > model defaults
    let mut cli_overrides = args.overrides();
    if !args.bad_words.is_empty() {
        let bad_words_ids = args
            .bad_words
            .iter()
            .map(|words| model.encode(words))
            .collect::<Result<Vec<_>>>()
            .context("Invalid --bad-word")?;
        cli_overrides.bad_words_ids = Some(bad_words_ids);
    }

    let generator = Seq2SeqGenerator::model_builder(model)
        .with_overrides(file_config.generation.clone())
        .build()?;

    let cancel = match args.timeout_ms {
        Some(ms) => CancellationToken::never().with_timeout(Duration::from_millis(ms)),
        None => CancellationToken::never(),
    };

    // 4. Decode
    let output = generator
        .generate_cancellable(&cli_overrides, &cancel)
        .await?;

    if !args.quiet {
        eprintln!(
            "Stopped ({}) after {} steps",
            stop_reason_label(output.stop_reason),
            output.steps
        );
    }

    // 5. Output
    match format {
        OutputFormat::Json => print_json(&generator, &output)?,
        OutputFormat::Text => print_text(&generator, &output, show_scores),
    }

    Ok(())
}

fn print_text<M: Seq2SeqModel + 'static>(
    generator: &Seq2SeqGenerator<M>,
    output: &DecodeOutput,
    show_scores: bool,
) {
    if output.is_empty() {
        eprintln!("No hypotheses.");
        return;
    }

    let width = 40;
    println!("{}", separator(width));
    for (i, (tokens, &score)) in output.sequences.iter().zip(&output.scores).enumerate() {
        let text = generator.detokenize(tokens);
        if show_scores {
            println!("{} {}  {}", rank_label(i + 1), score_label(score), text);
        } else {
            println!("{} {}", rank_label(i + 1), text);
        }
    }
    println!("{}", separator(width));
}

fn print_json<M: Seq2SeqModel + 'static>(
    generator: &Seq2SeqGenerator<M>,
    output: &DecodeOutput,
) -> Result<()> {
    let hypotheses = output
        .sequences
        .iter()
        .zip(&output.scores)
        .enumerate()
        .map(|(i, (tokens, &score))| HypothesisReport {
            rank: i + 1,
            text: generator.detokenize(tokens),
            tokens: tokens.clone(),
            score,
        })
        .collect();

    let report = DecodeReport {
        model: generator.model_name(),
        stop_reason: stop_reason_label(output.stop_reason),
        steps: output.steps,
        hypotheses,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
