use crate::api::traits::{InstructionApi, Outcome};
use crate::catalog::{CaseId, Category, TestCase, TestCatalog};
use crate::engine::events::{EventEmitter, TestEvent};
use crate::engine::state::{aggregate, CaseResult, EngineState, Tally};
use crate::engine::store::ResultStore;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Inter-call spacing within a batch. Rate limiting against the remote
/// endpoint, not a correctness requirement of the grading.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// Typed rejections for engine operations. The harness serializes all
/// traffic to the external API, so conflicting operations are refused
/// rather than queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine is busy (case in flight or batch running)")]
    Busy,
    #[error("Unknown test case id: {0}")]
    UnknownCase(CaseId),
}

/// Drives test cases through the API client and records outcomes. All
/// mutation goes through `&mut self`, so the single-writer discipline is
/// enforced by construction; `EngineState` guards re-entry across the
/// await points.
pub struct ExecutionEngine {
    catalog: TestCatalog,
    api: Box<dyn InstructionApi>,
    store: ResultStore,
    state: EngineState,
    emitter: EventEmitter,
    pacing: Duration,
}

impl ExecutionEngine {
    pub fn new(catalog: TestCatalog, api: Box<dyn InstructionApi>) -> Self {
        Self {
            catalog,
            api,
            store: ResultStore::new(),
            state: EngineState::default(),
            emitter: EventEmitter::default(),
            pacing: DEFAULT_PACING,
        }
    }

    /// Override the inter-call delay (tests run with zero pacing)
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TestEvent> {
        self.emitter.subscribe()
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    /// Snapshot of all recorded results
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Current run flags, for disabling controls in a presentation layer
    pub fn engine_state(&self) -> &EngineState {
        &self.state
    }

    /// Aggregate counts, recomputed on demand
    pub fn tally(&self) -> Tally {
        aggregate(&self.catalog, &self.store)
    }

    /// Run one case to its terminal state. Rejected while anything else is
    /// in flight; only one run of any case is permitted system-wide.
    pub async fn run_single(&mut self, id: CaseId) -> Result<(), EngineError> {
        if self.state.is_busy() {
            return Err(EngineError::Busy);
        }
        let case = self
            .catalog
            .get(id)
            .ok_or(EngineError::UnknownCase(id))?
            .clone();

        self.dispatch(&case).await;
        Ok(())
    }

    /// Run every catalog entry (or one category's subsequence) in catalog
    /// order, each to its terminal state, with the inter-call delay between
    /// cases. Per-case failures and errors never abort the batch.
    pub async fn run_batch(&mut self, category: Option<Category>) -> Result<Tally, EngineError> {
        if self.state.is_busy() {
            return Err(EngineError::Busy);
        }

        let selection: Vec<TestCase> = match category {
            Some(cat) => self.catalog.by_category(cat).into_iter().cloned().collect(),
            None => self.catalog.cases().to_vec(),
        };

        self.state.batch_running = true;
        let started = Instant::now();
        self.emitter.emit(TestEvent::BatchStarted {
            total: selection.len(),
        });

        let last = selection.len().saturating_sub(1);
        for (i, case) in selection.iter().enumerate() {
            self.dispatch(case).await;
            if i < last {
                tokio::time::sleep(self.pacing).await;
            }
        }

        self.state.batch_running = false;
        let tally = self.tally();
        self.emitter.emit(TestEvent::BatchFinished {
            tally,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(tally)
    }

    /// Run the full catalog
    pub async fn run_all(&mut self) -> Result<Tally, EngineError> {
        self.run_batch(None).await
    }

    /// Empty the store, back to the pre-run state. Refused while a case or
    /// batch is in flight; clearing mid-batch would desynchronize it.
    pub fn clear_results(&mut self) -> Result<(), EngineError> {
        if self.state.is_busy() {
            return Err(EngineError::Busy);
        }
        self.store.clear();
        self.emitter.emit(TestEvent::ResultsCleared);
        Ok(())
    }

    /// Drive one case through the client: record `Running`, await the
    /// outcome, record exactly one terminal state. `active` covers the
    /// whole window, on both paths.
    async fn dispatch(&mut self, case: &TestCase) {
        self.store.set(case.id, CaseResult::Running);
        self.state.active = Some(case.id);
        self.emitter.emit(TestEvent::CaseStarted {
            id: case.id,
            name: case.name.clone(),
            expected_status: case.expected_status,
            expected_code: case.expected_code.clone(),
        });

        let started = Instant::now();
        let outcome = self.api.execute(&case.payload).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Outcome::Responded { http_status, body } => {
                let passed = grade(case, http_status, &body);
                if passed {
                    self.emitter.emit(TestEvent::CasePassed {
                        id: case.id,
                        status_code: http_status,
                        duration_ms,
                    });
                } else {
                    self.emitter.emit(TestEvent::CaseFailed {
                        id: case.id,
                        status_code: http_status,
                        received_code: body
                            .get("status_code")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        duration_ms,
                    });
                }
                self.store.set(
                    case.id,
                    CaseResult::Complete {
                        passed,
                        status_code: http_status,
                        response: body,
                        duration_ms,
                    },
                );
            }
            Outcome::TransportFailed { message } => {
                self.emitter.emit(TestEvent::CaseErrored {
                    id: case.id,
                    message: message.clone(),
                    duration_ms,
                });
                self.store
                    .set(case.id, CaseResult::Error { message, duration_ms });
            }
        }

        self.state.active = None;
    }
}

/// Grade one transport response against a case's expectations. Passed iff
/// both the transport status and the application-level `status_code` match.
/// Deterministic and side-effect-free; a missing or non-string
/// `status_code` simply never matches.
pub fn grade(case: &TestCase, http_status: u16, body: &Value) -> bool {
    http_status == case.expected_status
        && body.get("status_code").and_then(Value::as_str) == Some(case.expected_code.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Account, Payload};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn case(id: CaseId, expected_status: u16, expected_code: &str) -> TestCase {
        TestCase {
            id,
            name: format!("Case {}", id),
            category: if expected_status == 200 {
                Category::Valid
            } else {
                Category::Invalid
            },
            expected_status,
            expected_code: expected_code.to_string(),
            payload: Payload {
                accounts: vec![
                    Account {
                        id: "a".to_string(),
                        balance: 500.0,
                        currency: "USD".to_string(),
                    },
                    Account {
                        id: "b".to_string(),
                        balance: 200.0,
                        currency: "USD".to_string(),
                    },
                ],
                instruction: "DEBIT 100 USD FROM ACCOUNT a FOR CREDIT TO ACCOUNT b".to_string(),
            },
        }
    }

    /// Scripted client: maps instruction text to a canned outcome and logs
    /// the order in which payloads arrive.
    struct ScriptedApi {
        outcomes: HashMap<String, Outcome>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedApi {
        fn new(outcomes: Vec<(&str, Outcome)>) -> Self {
            Self {
                outcomes: outcomes
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
            self.seen.clone()
        }
    }

    #[async_trait]
    impl InstructionApi for ScriptedApi {
        async fn execute(&self, payload: &Payload) -> Outcome {
            self.seen.lock().unwrap().push(payload.instruction.clone());
            self.outcomes
                .get(&payload.instruction)
                .cloned()
                .unwrap_or(Outcome::TransportFailed {
                    message: "no scripted outcome".to_string(),
                })
        }
    }

    /// Client that always responds the same way
    struct FixedApi(Outcome);

    #[async_trait]
    impl InstructionApi for FixedApi {
        async fn execute(&self, _payload: &Payload) -> Outcome {
            self.0.clone()
        }
    }

    fn engine_with(cases: Vec<TestCase>, api: impl InstructionApi + 'static) -> ExecutionEngine {
        let catalog = TestCatalog::from_cases(cases).unwrap();
        ExecutionEngine::new(catalog, Box::new(api)).with_pacing(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_matching_response_passes() {
        // Scenario A: expected (200, AP00), API returns (200, AP00)
        let api = FixedApi(Outcome::Responded {
            http_status: 200,
            body: json!({"status_code": "AP00"}),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        engine.run_single(1).await.unwrap();

        match engine.store().get(1).unwrap() {
            CaseResult::Complete {
                passed,
                status_code,
                ..
            } => {
                assert!(passed);
                assert_eq!(*status_code, 200);
            }
            other => panic!("expected complete result, got {:?}", other),
        }
        assert_eq!(engine.engine_state().active, None);
    }

    #[tokio::test]
    async fn test_expected_rejection_passes() {
        // Scenario B: a 400 with the right code is a pass, not a failure
        let api = FixedApi(Outcome::Responded {
            http_status: 400,
            body: json!({"status_code": "AC01", "message": "insufficient funds"}),
        });
        let mut engine = engine_with(vec![case(1, 400, "AC01")], api);

        engine.run_single(1).await.unwrap();

        match engine.store().get(1).unwrap() {
            CaseResult::Complete {
                passed,
                status_code,
                response,
                ..
            } => {
                assert!(passed);
                assert_eq!(*status_code, 400);
                assert_eq!(response["message"], "insufficient funds");
            }
            other => panic!("expected complete result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_code_mismatch_is_logical_failure() {
        // Scenario D: right transport status, wrong application code
        let api = FixedApi(Outcome::Responded {
            http_status: 200,
            body: json!({"status_code": "AP02"}),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        engine.run_single(1).await.unwrap();

        match engine.store().get(1).unwrap() {
            CaseResult::Complete { passed, .. } => assert!(!passed),
            other => panic!("mismatch must grade as complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_result() {
        // Scenario C: network failure is captured, never propagated
        let api = FixedApi(Outcome::TransportFailed {
            message: "connection refused".to_string(),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        engine.run_single(1).await.unwrap();

        match engine.store().get(1).unwrap() {
            CaseResult::Error { message, .. } => {
                assert_eq!(message, "connection refused");
            }
            other => panic!("expected error result, got {:?}", other),
        }
        assert_eq!(engine.store().get(1).unwrap().passed(), Some(false));
        assert_eq!(engine.engine_state().active, None);
    }

    #[tokio::test]
    async fn test_run_single_unknown_case() {
        let api = FixedApi(Outcome::TransportFailed {
            message: "unused".to_string(),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        assert_eq!(
            engine.run_single(42).await.unwrap_err(),
            EngineError::UnknownCase(42)
        );
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_run_all_visits_every_case_in_order() {
        let mut cases = Vec::new();
        let mut outcomes = Vec::new();
        for id in 1..=5u32 {
            let mut c = case(id, 200, "AP00");
            c.payload.instruction = format!("INSTR {}", id);
            cases.push(c);
            outcomes.push((
                format!("INSTR {}", id),
                Outcome::Responded {
                    http_status: 200,
                    body: json!({"status_code": "AP00"}),
                },
            ));
        }
        let api = ScriptedApi::new(
            outcomes
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect(),
        );
        let call_log = api.call_log();
        let mut engine = engine_with(cases, api);

        let tally = engine.run_all().await.unwrap();

        assert_eq!(tally.passed, 5);
        assert_eq!(tally.failed, 0);
        assert_eq!(tally.pending, 0);
        assert_eq!(engine.store().len(), engine.catalog().len());
        assert!(!engine.engine_state().batch_running);

        // Strict catalog-order dispatch, each case exactly once
        let seen = call_log.lock().unwrap();
        assert_eq!(
            *seen,
            (1..=5).map(|i| format!("INSTR {}", i)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_run_all_dispatch_order_and_continuation() {
        // Case 2 suffers a transport failure; the batch must still reach 3
        let api = ScriptedApi::new(vec![
            (
                "INSTR 1",
                Outcome::Responded {
                    http_status: 200,
                    body: json!({"status_code": "AP00"}),
                },
            ),
            (
                "INSTR 2",
                Outcome::TransportFailed {
                    message: "timed out".to_string(),
                },
            ),
            (
                "INSTR 3",
                Outcome::Responded {
                    http_status: 400,
                    body: json!({"status_code": "CU01"}),
                },
            ),
        ]);

        let mut cases = Vec::new();
        for (id, expected) in [(1u32, (200, "AP00")), (2, (200, "AP00")), (3, (400, "CU01"))] {
            let mut c = case(id, expected.0, expected.1);
            c.payload.instruction = format!("INSTR {}", id);
            cases.push(c);
        }

        let catalog = TestCatalog::from_cases(cases).unwrap();
        let mut engine =
            ExecutionEngine::new(catalog, Box::new(api)).with_pacing(Duration::ZERO);

        let tally = engine.run_all().await.unwrap();

        assert_eq!(tally.passed, 2);
        assert_eq!(tally.failed, 1);
        assert!(matches!(
            engine.store().get(2).unwrap(),
            CaseResult::Error { .. }
        ));
        // Every terminal, none left running
        for id in 1..=3 {
            assert!(engine.store().get(id).unwrap().is_terminal());
        }
    }

    #[tokio::test]
    async fn test_batch_filtered_by_category() {
        let api = FixedApi(Outcome::Responded {
            http_status: 400,
            body: json!({"status_code": "AC01"}),
        });
        let mut engine = engine_with(
            vec![case(1, 200, "AP00"), case(2, 400, "AC01"), case(3, 400, "AC01")],
            api,
        );

        engine.run_batch(Some(Category::Invalid)).await.unwrap();

        assert!(engine.store().get(1).is_none());
        assert!(engine.store().get(2).is_some());
        assert!(engine.store().get(3).is_some());
    }

    #[tokio::test]
    async fn test_clear_results_resets_tally() {
        let api = FixedApi(Outcome::Responded {
            http_status: 200,
            body: json!({"status_code": "AP00"}),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00"), case(2, 200, "AP00")], api);

        engine.run_all().await.unwrap();
        assert_eq!(engine.store().len(), 2);

        engine.clear_results().unwrap();
        assert!(engine.store().is_empty());
        assert_eq!(
            engine.tally(),
            Tally {
                passed: 0,
                failed: 0,
                pending: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_rerun_replaces_prior_result() {
        let api = FixedApi(Outcome::Responded {
            http_status: 200,
            body: json!({"status_code": "AP00"}),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        engine.run_single(1).await.unwrap();
        engine.run_single(1).await.unwrap();

        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.tally().passed, 1);
    }

    #[tokio::test]
    async fn test_operations_rejected_while_batch_running() {
        let api = FixedApi(Outcome::Responded {
            http_status: 200,
            body: json!({"status_code": "AP00"}),
        });
        let mut engine = engine_with(vec![case(1, 200, "AP00")], api);

        engine.state.batch_running = true;
        assert_eq!(engine.run_single(1).await.unwrap_err(), EngineError::Busy);
        assert_eq!(engine.run_all().await.unwrap_err(), EngineError::Busy);
        assert_eq!(engine.clear_results().unwrap_err(), EngineError::Busy);

        engine.state.batch_running = false;
        engine.state.active = Some(1);
        assert_eq!(engine.run_single(1).await.unwrap_err(), EngineError::Busy);
    }

    #[test]
    fn test_grading_is_deterministic() {
        let c = case(1, 200, "AP00");
        let body = json!({"status_code": "AP00", "extra": "ignored"});
        assert!(grade(&c, 200, &body));
        assert!(grade(&c, 200, &body));
        assert!(!grade(&c, 201, &body));
        assert!(!grade(&c, 200, &json!({"status_code": "AP02"})));
        // Case-sensitive comparison, non-string codes never match
        assert!(!grade(&c, 200, &json!({"status_code": "ap00"})));
        assert!(!grade(&c, 200, &json!({"status_code": 200})));
        assert!(!grade(&c, 200, &json!({})));
    }
}
