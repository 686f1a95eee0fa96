//! Fetch and parse the survey file with progress reporting.

use super::cache_manager;
use indicatif::{ProgressBar, ProgressStyle};
use pfd_data::{DataSource, FetchConfig, Fetcher, SurveyFrame};
use std::io::Write;
use std::time::Duration;
use tracing::warn;

/// Load `source`, going through the download cache for remote files when
/// `config.use_cache` is set. With `quiet`, nothing is printed to stdout.
pub(crate) async fn load_survey(
    source: &DataSource,
    config: &FetchConfig,
    quiet: bool,
) -> Result<SurveyFrame, Box<dyn std::error::Error>> {
    if !quiet {
        println!("Source: {}", source);
    }
    let cache = if config.use_cache && source.is_remote() {
        if !quiet {
            cache_manager::print_cache_info();
            if config.force_refresh {
                println!("  Mode: Force refresh (re-downloading)");
            }
        }
        match cache_manager::open_cache() {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "download cache unavailable");
                None
            }
        }
    } else {
        if source.is_remote() && !quiet {
            println!("  Cache: Disabled");
        }
        None
    };

    let fetcher = Fetcher::new(config.clone())?;

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .expect("valid template")
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Fetching survey data...");

    let report_pb = pb.clone();
    let report = move |received: u64, total: Option<u64>| {
        if let Some(total) = total {
            report_pb.set_length(total);
        }
        report_pb.set_position(received);
    };

    let bytes = match fetcher.fetch(source, cache.as_ref(), Some(&report)).await {
        Ok(bytes) => {
            pb.finish_with_message(format!("Fetched {:.1} MB", bytes.len() as f64 / 1_048_576.0));
            bytes
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(format!("Failed to fetch {}: {}", source, e).into());
        }
    };

    if quiet {
        return Ok(SurveyFrame::from_bytes(&bytes)?);
    }

    print!("Parsing survey table...");
    std::io::stdout().flush()?;
    let survey = SurveyFrame::from_bytes(&bytes)?;
    println!(" ✓ ({} rows)", survey.height());

    Ok(survey)
}
