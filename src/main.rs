use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use pi_harness::api::http::DEFAULT_ENDPOINT;
use pi_harness::catalog::Category;
use pi_harness::engine::{self, RunOptions};
use pi_harness::report;

#[derive(Parser)]
#[command(name = "pi-harness")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Conformance test harness for the payment-instructions API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conformance catalog against an endpoint
    Run {
        /// Catalog fixture file (YAML or JSON). Uses the built-in catalog
        /// if not provided.
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Endpoint to test
        #[arg(short, long, env = "PI_HARNESS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Run a single case by id instead of the full catalog
        #[arg(long)]
        case: Option<u32>,

        /// Restrict the batch to one category (valid, invalid)
        #[arg(long)]
        category: Option<Category>,

        /// Inter-call delay between cases in a batch, in milliseconds
        #[arg(long, default_value = "500")]
        delay_ms: u64,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Generate reports (JSON, JUnit)
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// List the cases in the catalog
    List {
        /// Catalog fixture file (YAML or JSON)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Re-render a saved JSON report
    Report {
        /// Path to a saved report.json
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            catalog,
            endpoint,
            case,
            category,
            delay_ms,
            output,
            report,
        } => {
            println!(
                "{} Payment-instructions conformance run",
                "▶".green().bold()
            );
            println!("  Endpoint: {}", endpoint.cyan());
            if let Some(ref path) = catalog {
                println!("  Catalog: {}", path.display().to_string().cyan());
            }
            if let Some(id) = case {
                println!("  Case: {}", id.to_string().yellow());
            }
            if let Some(cat) = category {
                println!("  Category: {}", cat.as_str().yellow());
            }
            if report {
                println!("  Reports: {}", "Enabled".green());
                println!("  Output: {}", output.display().to_string().cyan());
            }

            let tally = engine::run_suite(RunOptions {
                catalog,
                endpoint,
                case,
                category,
                delay_ms,
                output,
                report,
            })
            .await?;

            if tally.failed > 0 {
                anyhow::bail!(
                    "{} case(s) failed ({} passed, {} pending)",
                    tally.failed,
                    tally.passed,
                    tally.pending
                );
            }
        }

        Commands::List { catalog } => {
            engine::list_catalog(catalog.as_deref())?;
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }
    }

    Ok(())
}
