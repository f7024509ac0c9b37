pub mod events;
pub mod executor;
pub mod state;
pub mod store;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use events::*;
pub use executor::{grade, EngineError, ExecutionEngine, DEFAULT_PACING};
pub use state::*;
pub use store::ResultStore;

use crate::api::HttpApiClient;
use crate::catalog::{CaseId, Category, TestCase, TestCatalog};

/// Options for one harness invocation
pub struct RunOptions {
    /// Catalog fixture file; the embedded default when absent
    pub catalog: Option<PathBuf>,
    pub endpoint: String,
    /// Run one case instead of a batch
    pub case: Option<CaseId>,
    /// Restrict a batch to one category
    pub category: Option<Category>,
    pub delay_ms: u64,
    pub output: PathBuf,
    pub report: bool,
}

/// Load the catalog, run the requested cases against the endpoint, and
/// optionally write reports. Returns the final tally.
pub async fn run_suite(opts: RunOptions) -> Result<Tally> {
    let catalog = match opts.catalog {
        Some(ref path) => TestCatalog::load(path)?,
        None => TestCatalog::builtin()?,
    };
    if catalog.is_empty() {
        anyhow::bail!("Catalog is empty");
    }

    let client = HttpApiClient::new(&opts.endpoint)?;
    let mut engine = ExecutionEngine::new(catalog, Box::new(client))
        .with_pacing(Duration::from_millis(opts.delay_ms));

    // Console listener runs in the background off the event channel
    tokio::spawn(ConsoleEventListener::listen(engine.subscribe()));

    let tally = match opts.case {
        Some(id) => {
            engine.run_single(id).await?;
            engine.tally()
        }
        None => engine.run_batch(opts.category).await?,
    };

    // Let the listener flush its final lines
    tokio::time::sleep(Duration::from_millis(200)).await;

    print_failure_details(&engine);

    if opts.report {
        std::fs::create_dir_all(&opts.output)?;
        let report = crate::report::build_report(
            &opts.endpoint,
            engine.catalog(),
            engine.store(),
            tally,
        );
        crate::report::json::write_report(&report, &opts.output)?;
        crate::report::junit::write_report(&report, &opts.output)?;
    }

    Ok(tally)
}

/// Print received-vs-expected details for every non-passing case, enough to
/// diagnose a mismatch without re-running.
fn print_failure_details(engine: &ExecutionEngine) {
    let mut header_printed = false;
    for case in engine.catalog().cases() {
        let Some(result) = engine.store().get(case.id) else {
            continue;
        };
        if result.passed() != Some(false) {
            continue;
        }
        if !header_printed {
            println!("\n{} Failure details", "✗".red().bold());
            header_printed = true;
        }
        print_case_detail(case, result);
    }
}

fn print_case_detail(case: &TestCase, result: &CaseResult) {
    println!(
        "  [{}] {} (expected {} · {})",
        case.id,
        case.name.white().bold(),
        case.expected_status,
        case.expected_code
    );
    match result {
        CaseResult::Complete {
            status_code,
            response,
            ..
        } => {
            let received_code = response
                .get("status_code")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("N/A");
            println!(
                "      Received: {} · {}",
                status_code.to_string().red(),
                received_code.red()
            );
            if let Ok(pretty) = serde_json::to_string_pretty(response) {
                for line in pretty.lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }
        CaseResult::Error { message, .. } => {
            println!("      Transport error: {}", message.yellow());
        }
        CaseResult::Running => {}
    }
}

/// Print the catalog in definition order, grouped by category
pub fn list_catalog(path: Option<&Path>) -> Result<()> {
    let catalog = match path {
        Some(p) => TestCatalog::load(p)?,
        None => TestCatalog::builtin()?,
    };

    for category in [Category::Valid, Category::Invalid] {
        let cases = catalog.by_category(category);
        if cases.is_empty() {
            continue;
        }
        let label = match category {
            Category::Valid => "Valid test cases".green().bold(),
            Category::Invalid => "Invalid test cases".red().bold(),
        };
        println!("\n{} ({})", label, cases.len());
        for case in cases {
            println!(
                "  [{}] {} · expect {} {}",
                case.id.to_string().cyan(),
                case.name,
                case.expected_status,
                case.expected_code
            );
        }
    }
    Ok(())
}
