//! Subcommand handlers

use crate::cli::args::{Args, Commands};
use crate::cli::input::InputHandler;
use crate::config::Settings;
use crate::model::{build_model, load_description, train_model, QaModel};
use crate::resources::check_resources;
use crate::types::ScoredAnswer;
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

/// Dispatch the parsed subcommand
pub fn run(args: &Args, settings: &Settings) -> Result<()> {
    match &args.command {
        Commands::Train { config } => train(config, settings),
        Commands::Ask {
            config,
            question,
            top_n,
        } => ask(config, question, top_n.unwrap_or(settings.qa.top_n), settings),
        Commands::Interact { config } => interact(config, settings),
        Commands::Check { config } => check(config, settings),
    }
}

fn train(config: &Path, settings: &Settings) -> Result<()> {
    let (_, report) = train_model(config, settings)
        .with_context(|| format!("Training {} failed", config.display()))?;

    for stage in &report.fit.stages {
        let saved = match &stage.saved_to {
            Some(path) => format!(" -> {}", path.display()),
            None => String::new(),
        };
        println!(
            "{} stage {} ({}) on {} examples{}",
            "✓".green(),
            stage.index,
            stage.component.bold(),
            stage.examples,
            saved
        );
    }
    if report.fit.is_empty() {
        println!("{}", "No trainable stages declared".yellow());
    }
    for score in &report.evaluation {
        println!(
            "  {} {}: {:.4} ({} examples)",
            score.split.cyan(),
            score.metric,
            score.value,
            score.examples
        );
    }
    Ok(())
}

fn ask(config: &Path, question: &str, top_n: usize, settings: &Settings) -> Result<()> {
    let model = load_model(config, settings)?;
    let question = settings.strip_prefix(question);
    print_answers(&model, question, top_n, settings)
}

fn interact(config: &Path, settings: &Settings) -> Result<()> {
    let model = load_model(config, settings)?;
    let mut input = InputHandler::with_history(settings.root_path().join("history"))?;

    println!(
        "{} {}",
        "Interactive mode.".bold().cyan(),
        "Ctrl-D to exit.".dimmed()
    );
    while let Some(line) = input.read_line()? {
        let question = settings.strip_prefix(&line);
        if question.is_empty() {
            continue;
        }
        if let Err(err) = print_answers(&model, question, settings.qa.top_n, settings) {
            println!("{} {:#}", "Error:".red().bold(), err);
        }
    }
    input.save_history()?;
    Ok(())
}

fn check(config: &Path, settings: &Settings) -> Result<()> {
    let description = load_description(config, settings)
        .with_context(|| format!("Failed to load {}", config.display()))?;

    let statuses = check_resources(&description);
    let mut missing = 0;
    for status in &statuses {
        if status.present {
            println!("{} {} ({})", "✓".green(), status.path.display(), status.origin);
        } else {
            missing += 1;
            println!("{} {} ({})", "✗".red(), status.path.display(), status.origin);
        }
    }

    if missing == 0 {
        println!("{}", "All resources present".green().bold());
        Ok(())
    } else {
        anyhow::bail!("{} of {} resources missing", missing, statuses.len())
    }
}

fn load_model(config: &Path, settings: &Settings) -> Result<QaModel> {
    build_model(config, settings).with_context(|| format!("Failed to build {}", config.display()))
}

fn print_answers(model: &QaModel, question: &str, top_n: usize, settings: &Settings) -> Result<()> {
    let answers = model.ask_top_n(question, top_n)?;
    for answer in &answers {
        println!("{}", format_answer(answer, settings.qa.min_score));
    }
    Ok(())
}

/// One answer line; answers below `min_score` are marked as not confident
pub fn format_answer(answer: &ScoredAnswer, min_score: Option<f32>) -> String {
    match min_score {
        Some(min_score) if !answer.is_confident(min_score) => format!(
            "{} (best: {})",
            "No confident answer".yellow(),
            answer
        ),
        _ => format!("{} {}", answer.label.green().bold(), format!("({:.3})", answer.score).dimmed()),
    }
}
