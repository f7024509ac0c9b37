pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

use crate::catalog::TestCatalog;
use crate::engine::state::Tally;
use crate::engine::store::ResultStore;

pub use types::{CaseReport, RunReport};

/// Assemble a report snapshot from the engine's state, in catalog order
pub fn build_report(
    endpoint: &str,
    catalog: &TestCatalog,
    store: &ResultStore,
    tally: Tally,
) -> RunReport {
    let cases = catalog
        .cases()
        .iter()
        .map(|case| CaseReport {
            id: case.id,
            name: case.name.clone(),
            category: case.category,
            expected_status: case.expected_status,
            expected_code: case.expected_code.clone(),
            result: store.get(case.id).cloned(),
        })
        .collect();

    RunReport {
        session_id: Uuid::new_v4().to_string(),
        endpoint: endpoint.to_string(),
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        cases,
        tally,
    }
}

/// Re-render a saved JSON report in another format
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(results_path)?;
    let report: RunReport = serde_json::from_str(&content)?;

    match format {
        "json" => json::generate(&report, output),
        "junit" => junit::generate(&report, output),
        _ => anyhow::bail!("Unknown format: {} (expected json|junit)", format),
    }
}
