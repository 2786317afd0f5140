//! `drift watch` - re-score on file changes

use anyhow::Result;
use console::style;
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult, DebouncedEvent};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::warn;

use crate::config::ProjectConfig;
use crate::models::{file_label, AnalysisResults};
use crate::pipeline::{AnalysisPipeline, RerunMode};
use crate::scoring::{HealthScore, Scorer};

const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn run(config: ProjectConfig, incremental: bool) -> Result<()> {
    let mode = if incremental {
        RerunMode::Incremental
    } else {
        RerunMode::Full
    };
    let mut scorer = Scorer::from_config(&config);
    let pipeline = AnalysisPipeline::new(config);
    let repo_path = pipeline.root().to_path_buf();

    println!(
        "\nWatching {} ({}) for changes...\n",
        style(repo_path.display()).cyan(),
        pipeline.language()
    );
    println!("  {} Save a file to trigger a re-score", style("→").dim());
    println!("  {} Press Ctrl+C to stop\n", style("→").dim());

    // Last full aggregate; incremental partials are merged into it
    let mut current = pipeline.run()?;
    print_score(None, &scorer.calculate(&current));

    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
        forward(&tx, result);
    })?;

    debouncer.watch(&repo_path, RecursiveMode::Recursive)?;

    loop {
        match rx.recv() {
            Ok(events) => {
                // Sorted so a burst is handled in a stable order
                let changed: BTreeSet<PathBuf> = events
                    .iter()
                    .flat_map(|event| event.paths.iter())
                    .filter(|p| pipeline.is_relevant(p))
                    .cloned()
                    .collect();

                let Some(first) = changed.first() else {
                    continue;
                };

                match mode {
                    // One full run covers the whole burst
                    RerunMode::Full => {
                        rescore(&pipeline, &mut scorer, &mut current, first, mode, &repo_path)
                    }
                    RerunMode::Incremental => {
                        for path in &changed {
                            rescore(&pipeline, &mut scorer, &mut current, path, mode, &repo_path);
                        }
                    }
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

/// Pass event batches to the watch loop; watcher errors are logged and dropped.
fn forward(tx: &mpsc::Sender<Vec<DebouncedEvent>>, result: DebounceEventResult) -> usize {
    match result {
        Ok(events) => {
            let _ = tx.send(events);
            1
        }
        Err(errors) => {
            for e in &errors {
                warn!("Watch error: {}", e);
            }
            0
        }
    }
}

fn rescore(
    pipeline: &AnalysisPipeline,
    scorer: &mut Scorer,
    current: &mut AnalysisResults,
    path: &Path,
    mode: RerunMode,
    repo_path: &Path,
) {
    match pipeline.rerun(path, mode) {
        Ok(results) => {
            match mode {
                RerunMode::Full => *current = results,
                RerunMode::Incremental => current.merge_file(&file_label(path), results),
            }
            let rel = path.strip_prefix(repo_path).unwrap_or(path);
            print_score(Some(rel), &scorer.calculate(current));
        }
        Err(e) => warn!("Re-run after {} failed: {}", path.display(), e),
    }
}

fn print_score(changed: Option<&Path>, score: &HealthScore) {
    let time = chrono::Local::now().format("%H:%M:%S");
    let delta = if score.delta > 0.0 {
        style(format!("{:+.1}", score.delta)).green()
    } else if score.delta < 0.0 {
        style(format!("{:+.1}", score.delta)).red()
    } else {
        style(format!("{:+.1}", score.delta)).dim()
    };
    let source = match changed {
        Some(path) => path.display().to_string(),
        None => "initial".to_string(),
    };
    println!(
        "{} {} score {:.1} ({})",
        style(format!("[{}]", time)).dim(),
        style(source).cyan(),
        score.total,
        delta
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_sends_batches_and_drops_errors() {
        let (tx, rx) = mpsc::channel();

        assert_eq!(forward(&tx, Ok(Vec::new())), 1);
        assert_eq!(rx.try_recv().map(|events| events.len()), Ok(0));

        let errors = vec![notify::Error::generic("inotify limit reached")];
        assert_eq!(forward(&tx, Err(errors)), 0);
        assert!(rx.try_recv().is_err());
    }
}
