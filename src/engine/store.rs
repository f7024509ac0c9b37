use crate::catalog::CaseId;
use crate::engine::state::CaseResult;
use std::collections::HashMap;

/// Mapping id -> current result. A write for an id fully replaces any prior
/// entry; absence means "never run or cleared", which is distinct from any
/// result state. Iteration order for display is supplied externally by
/// catalog order.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: HashMap<CaseId, CaseResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CaseId) -> Option<&CaseResult> {
        self.results.get(&id)
    }

    pub fn get_all(&self) -> &HashMap<CaseId, CaseResult> {
        &self.results
    }

    pub fn set(&mut self, id: CaseId, result: CaseResult) {
        self.results.insert(id, result);
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
