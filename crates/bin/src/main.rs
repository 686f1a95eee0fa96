//! pfd CLI binary.
//!
//! Command-line interface for the Permanent Fund Dividend
//! difference-in-differences study.

mod integration;

use clap::{Parser, Subcommand, ValueEnum};
use integration::cache_manager;
use integration::loader::load_survey;
use pfd::primer;
use pfd::{DiffInDiff, StudyConfig, StudyResults};
use pfd_data::{DataSource, FetchConfig, SurveyFrame, columns};
use pfd_output::{
    CoefficientRow, DescribeTable, ExportFormat, Exporter, ModelSummary, RegressionTable,
};
use pfd_regress::{CovarianceType, DesignMatrix, Wls};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pfd")]
#[command(about = "Alaska Permanent Fund Dividend and SPM poverty: a survey-weighted DD study", long_about = None)]
#[command(version)]
struct Cli {
    /// Survey file URL or local path
    #[arg(long, global = true)]
    source: Option<String>,

    /// JSON study configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable caching (always download)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Force refresh of the cached download
    #[arg(long, global = true)]
    refresh: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary statistics of the survey table
    Describe,

    /// Per-group means or distinct values
    Groups {
        /// Grouping column (design columns such as `alaska` are available)
        #[arg(long)]
        by: String,

        /// Value column
        #[arg(long)]
        value: String,

        /// Weight the mean by the survey weight
        #[arg(long, conflicts_with = "unique")]
        weighted: bool,

        /// List distinct values instead of the mean
        #[arg(long)]
        unique: bool,
    },

    /// Fit both DD models and print the regression table
    Regress {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Export coefficient rows as CSV
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Heteroskedasticity-robust standard errors (hc0 or hc1)
        #[arg(long)]
        robust: Option<CovarianceType>,

        /// Also print the full summary of each model
        #[arg(long)]
        summary: bool,
    },

    /// Walk through the whole analysis step by step
    Tutorial,

    /// List and vector basics only
    Primer,

    /// Inspect or clear the download cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Delete every cached download
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Latex,
    Markdown,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = study_config(cli.source.as_deref(), cli.config.as_deref())?;
    let fetch = FetchConfig {
        use_cache: !cli.no_cache,
        force_refresh: cli.refresh,
        ..FetchConfig::default()
    };

    match cli.command {
        Commands::Describe => describe(&config, &fetch).await?,
        Commands::Groups {
            by,
            value,
            weighted,
            unique,
        } => groups(&config, &fetch, &by, &value, weighted, unique).await?,
        Commands::Regress {
            format,
            output,
            export_csv,
            robust,
            summary,
        } => {
            let mut config = config;
            if let Some(cov_type) = robust {
                config.cov_type = cov_type;
            }
            regress(
                config,
                &fetch,
                format,
                output.as_deref(),
                export_csv.as_deref(),
                summary,
            )
            .await?;
        }
        Commands::Tutorial => tutorial(config, &fetch).await?,
        Commands::Primer => print_primer(),
        Commands::Cache { stats, clear } => cache(stats, clear)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn study_config(
    source: Option<&str>,
    path: Option<&Path>,
) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => StudyConfig::from_file(path)?,
        None => StudyConfig::default(),
    };
    if let Some(source) = source {
        config.source = source.parse::<DataSource>()?;
    }
    Ok(config)
}

fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

fn section(title: &str) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn print_rates(survey: &SurveyFrame, weight: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(share) = survey.mean(columns::POOR)? {
        println!("  Share of records poor:  {:.2}%", share * 100.0);
    }
    if let Some(rate) = survey.weighted_mean(columns::POOR, weight)? {
        println!("  Weighted poverty rate:  {:.2}%", rate * 100.0);
    }
    Ok(())
}

async fn describe(
    config: &StudyConfig,
    fetch: &FetchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    banner("SURVEY SUMMARY");
    let survey = load_survey(&config.source, fetch, false).await?;

    section("DESCRIBE");
    println!("{}", survey.head(5));
    println!("\nRows: {}\n", survey.height());
    println!("{}", DescribeTable::new(survey.describe()?));

    section("RECORDS VS POPULATION");
    print_rates(&survey, &config.weight)?;
    println!("\n  The record share ignores survey weights; the population rate uses them.");

    Ok(())
}

async fn groups(
    config: &StudyConfig,
    fetch: &FetchConfig,
    by: &str,
    value: &str,
    weighted: bool,
    unique: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let survey = load_survey(&config.source, fetch, false)
        .await?
        .derive(&config.design_spec())?;

    let table = if unique {
        survey.group_unique(by, value)?
    } else if weighted {
        survey.group_weighted_mean(by, value, &config.weight)?
    } else {
        survey.group_mean(by, value)?
    };

    println!();
    println!("{}", table);
    Ok(())
}

async fn regress(
    config: StudyConfig,
    fetch: &FetchConfig,
    format: OutputFormat,
    output: Option<&Path>,
    export_csv: Option<&Path>,
    summary: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let quiet = format == OutputFormat::Json && output.is_none();
    let source = config.source.clone();
    let survey = load_survey(&source, fetch, quiet).await?;
    let results = DiffInDiff::new(config).run(&survey)?;

    let rendered = match format {
        OutputFormat::Text => render_text(&results, summary)?,
        OutputFormat::Latex => results.table().render_latex(),
        OutputFormat::Markdown => results.table().render_markdown(),
        OutputFormat::Json => results.report(&source, survey.height())?.to_json()?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }

    if let Some(path) = export_csv {
        results
            .coefficient_rows()?
            .export_to_file(path, ExportFormat::Csv)?;
        if !quiet {
            println!("Exported coefficients to {}", path.display());
        }
    }

    Ok(())
}

fn render_text(
    results: &StudyResults,
    summary: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut out = String::new();
    if summary {
        for (label, model) in ["(1)", "(2)"].iter().zip(results.models()) {
            out.push_str(&format!("\nModel {}\n", label));
            out.push_str(&ModelSummary::new(model)?.to_string());
        }
        out.push('\n');
    }
    out.push_str(&results.table().render_text());
    out.push_str(&format!(
        "\n\nDD estimate ({}): {:+.4} ({} observations)",
        results.interaction, results.dd_estimate, results.rows
    ));
    if let Some(with_controls) = results.dd_estimate_with_controls() {
        out.push_str(&format!("\nWith controls:       {:+.4}", with_controls));
    }
    Ok(out)
}

fn print_primer() {
    section("LISTS");
    let l = [1_i64, 3, 4];
    println!("l = {:?}", l);
    println!("l[0] = {:?}", primer::element(&l, 0));
    match primer::element(&l, 3) {
        Some(value) => println!("l[3] = {}", value),
        None => println!("List l cannot be accessed as l[3]"),
    }
    println!("Doubled: {:?}", primer::doubled(&l));

    section("VECTOR OPERATIONS");
    let values = [0.0, 1.0, 2.0];
    println!("exp({:?}) = {}", values, primer::exp(&values));
    println!("Sum: {:.6}", primer::exp_sum(&values));
    println!(
        "Investing $1 per year at 5% for 3 years: ${:.4} (term by term: ${:.4})",
        primer::compound_growth(0.05, 3),
        primer::compound_growth_loop(0.05, 3)
    );
}

async fn tutorial(
    config: StudyConfig,
    fetch: &FetchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    banner("PFD DIFFERENCE-IN-DIFFERENCES WALKTHROUGH");
    print_primer();

    section("LOADING THE SURVEY");
    let survey = load_survey(&config.source, fetch, false).await?;
    println!("{}", survey.head(5));
    println!();
    println!("{}", DescribeTable::new(survey.describe()?));
    print_rates(&survey, &config.weight)?;

    section("DERIVED COLUMNS");
    let spec = config.design_spec();
    let derived = survey.derive(&spec)?;
    println!(
        "{} by {}:",
        columns::STATEFIP,
        spec.treated_name
    );
    println!("{}", derived.group_unique(&spec.treated_name, columns::STATEFIP)?);
    println!("Unweighted share poor by year (first rows):");
    println!("{}", derived.group_mean(columns::YEAR, columns::POOR)?.head(Some(5)));

    section("FILTERING");
    let sample = derived.filter_years(&config.years)?;
    println!("Years {:?}: {} rows", config.years, sample.height());
    let treated = sample.filter_flag(&spec.treated_name)?;
    println!("Of which {}: {} rows", spec.treated_name, treated.height());

    section("REGRESSION");
    let interaction = spec.interaction_name();
    let core = [
        spec.treated_name.as_str(),
        columns::POST,
        interaction.as_str(),
    ];
    println!("Fitting with boolean regressors:");
    match DesignMatrix::from_frame(sample.frame(), &config.outcome, &core, &config.weight) {
        Ok(_) => println!("  (unexpectedly accepted)"),
        Err(e) => println!("  {}", e),
    }

    println!("\nCasting flags to 0/1 and fitting without a constant:");
    let numeric = sample.to_numeric()?;
    let no_constant = [
        interaction.as_str(),
        spec.treated_name.as_str(),
        columns::POST,
    ];
    let design =
        DesignMatrix::from_frame(&numeric, &config.outcome, &no_constant, &config.weight)?;
    let fit = Wls::new(design).fit_with(config.cov_type)?;
    println!("{}", ModelSummary::new(&fit)?);

    println!("Adding the constant and controls:");
    let results = DiffInDiff::new(config).run(&survey)?;
    for (label, model) in ["(1)", "(2)"].iter().zip(results.models()) {
        println!("\nModel {}", label);
        println!("{}", ModelSummary::new(model)?);
    }

    section("PUBLICATION TABLE");
    let table = RegressionTable::new(results.models());
    println!("{}", table);
    println!();
    println!("{}", table.render_latex());

    let rows = CoefficientRow::from_results("(1)", &results.baseline, 0.05)?;
    println!(
        "\nDD estimate: {:+.4} (95% CI {:+.4} to {:+.4})",
        results.dd_estimate,
        rows.first().map_or(f64::NAN, |r| r.ci_lower),
        rows.first().map_or(f64::NAN, |r| r.ci_upper)
    );

    Ok(())
}

fn cache(stats: bool, clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cache = cache_manager::open_cache()?;

    if clear {
        let before = cache.stats()?;
        cache.clear_all()?;
        println!("Cleared {} cached download(s)", before.entries);
    }

    if stats || !clear {
        cache_manager::print_cache_info();
    }

    Ok(())
}
