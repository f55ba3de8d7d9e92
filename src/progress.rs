//! Terminal progress and confirmation for apply/destroy

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyResult, ConfirmCallback, ProgressCallback};

/// Progress bar per dependency tier
pub struct TierProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl TierProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn result_symbol(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "○".dimmed().to_string(),
        ApplyResult::Created
        | ApplyResult::Modified
        | ApplyResult::Replaced
        | ApplyResult::Removed => "✓".green().to_string(),
        ApplyResult::Failed { .. } => "✗".red().to_string(),
        ApplyResult::Skipped { .. } => "⊘".yellow().to_string(),
    }
}

impl ProgressCallback for TierProgress {
    fn on_batch_start(&mut self, count: usize, tier: u8) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(count as u64);
        bar.set_style(bar_style());
        bar.set_message(format!("tier {tier}"));
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, _address: &str, description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(description.to_string());
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        let line = match result {
            ApplyResult::Failed { error } => {
                format!("  {} {} ({})", result_symbol(result), address, error.red())
            }
            _ => format!("  {} {}", result_symbol(result), address),
        };
        match &self.bar {
            Some(bar) => {
                bar.suspend(|| println!("{line}"));
                bar.inc(1);
            }
            None if !self.quiet || !result.is_success() => println!("{line}"),
            None => {}
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Interactive yes/no prompt
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}
