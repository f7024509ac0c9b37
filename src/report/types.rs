use crate::catalog::{CaseId, Category};
use crate::engine::state::{CaseResult, Tally};
use serde::{Deserialize, Serialize};

/// Snapshot of one harness run for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub session_id: String,
    pub endpoint: String,
    pub generated_at: String,
    pub cases: Vec<CaseReport>,
    pub tally: Tally,
}

/// One catalog entry with its recorded result, in catalog order.
/// `result` is absent for cases that were never run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub id: CaseId,
    pub name: String,
    pub category: Category,
    pub expected_status: u16,
    pub expected_code: String,
    pub result: Option<CaseResult>,
}
