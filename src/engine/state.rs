use crate::catalog::{CaseId, TestCatalog};
use crate::engine::store::ResultStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result state machine for one test case. A case is absent from the store
/// until a run starts, then moves `Running` -> exactly one terminal state.
/// A later run of the same id fully replaces the entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseResult {
    Running,
    /// The API responded; `passed` is the grading verdict, `response` the
    /// raw decoded body
    Complete {
        passed: bool,
        status_code: u16,
        response: Value,
        duration_ms: u64,
    },
    /// The request never produced a decodable response
    Error { message: String, duration_ms: u64 },
}

impl CaseResult {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseResult::Complete { .. } | CaseResult::Error { .. })
    }

    /// Grading verdict. `false` for error results, `None` while running.
    pub fn passed(&self) -> Option<bool> {
        match self {
            CaseResult::Running => None,
            CaseResult::Complete { passed, .. } => Some(*passed),
            CaseResult::Error { .. } => Some(false),
        }
    }
}

/// Process-wide run flags. At most one case is in flight at any instant;
/// `active` is set immediately before dispatch and cleared immediately
/// after the terminal transition, on both paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub active: Option<CaseId>,
    pub batch_running: bool,
}

impl EngineState {
    pub fn is_busy(&self) -> bool {
        self.active.is_some() || self.batch_running
    }
}

/// Aggregate counts over the catalog, for the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub passed: u32,
    pub failed: u32,
    pub pending: u32,
}

/// Derive pass/fail/pending counts from the store and catalog size.
/// Failed counts logical failures and transport errors alike; anything not
/// yet terminal (absent or still running) is pending.
pub fn aggregate(catalog: &TestCatalog, store: &ResultStore) -> Tally {
    let mut passed = 0u32;
    let mut failed = 0u32;

    for result in store.get_all().values() {
        match result.passed() {
            Some(true) => passed += 1,
            Some(false) => failed += 1,
            None => {}
        }
    }

    Tally {
        passed,
        failed,
        pending: (catalog.len() as u32).saturating_sub(passed + failed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!CaseResult::Running.is_terminal());
        assert!(CaseResult::Complete {
            passed: true,
            status_code: 200,
            response: serde_json::json!({}),
            duration_ms: 10,
        }
        .is_terminal());
        assert!(CaseResult::Error {
            message: "connection refused".to_string(),
            duration_ms: 10,
        }
        .is_terminal());
    }

    #[test]
    fn test_error_counts_as_failed() {
        let result = CaseResult::Error {
            message: "timeout".to_string(),
            duration_ms: 5,
        };
        assert_eq!(result.passed(), Some(false));
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let result = CaseResult::Complete {
            passed: false,
            status_code: 400,
            response: serde_json::json!({"status_code": "AC01"}),
            duration_ms: 42,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["passed"], false);
        assert_eq!(json["status_code"], 400);
    }

    #[test]
    fn test_aggregate_empty_store_is_all_pending() {
        let catalog = TestCatalog::builtin().unwrap();
        let store = ResultStore::new();
        let tally = aggregate(&catalog, &store);
        assert_eq!(
            tally,
            Tally {
                passed: 0,
                failed: 0,
                pending: catalog.len() as u32,
            }
        );
    }

    #[test]
    fn test_aggregate_counts_running_as_pending() {
        let catalog = TestCatalog::builtin().unwrap();
        let mut store = ResultStore::new();
        store.set(1, CaseResult::Running);
        store.set(
            2,
            CaseResult::Complete {
                passed: true,
                status_code: 200,
                response: serde_json::json!({"status_code": "AP02"}),
                duration_ms: 7,
            },
        );
        store.set(
            3,
            CaseResult::Error {
                message: "dns failure".to_string(),
                duration_ms: 3,
            },
        );

        let tally = aggregate(&catalog, &store);
        assert_eq!(tally.passed, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.pending, catalog.len() as u32 - 2);
    }
}
