pub mod types;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub use types::*;

/// Default catalog shipped with the binary, mirroring the published
/// conformance fixture set.
const BUILTIN_CATALOG: &str = include_str!("../../fixtures/catalog.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    cases: Vec<TestCase>,
}

/// Read-only ordered sequence of test cases. Loaded once at startup;
/// definition order is the canonical "run all" order.
#[derive(Debug, Clone)]
pub struct TestCatalog {
    cases: Vec<TestCase>,
}

impl TestCatalog {
    /// Build a catalog, validating id uniqueness
    pub fn from_cases(cases: Vec<TestCase>) -> Result<Self> {
        let mut seen = HashSet::new();
        for case in &cases {
            if case.id == 0 {
                anyhow::bail!("Test case id must be positive (case '{}')", case.name);
            }
            if !seen.insert(case.id) {
                anyhow::bail!("Duplicate test case id {} in catalog", case.id);
            }
        }
        Ok(Self { cases })
    }

    /// Parse the embedded default catalog
    pub fn builtin() -> Result<Self> {
        Self::parse_yaml(BUILTIN_CATALOG)
    }

    /// Load a catalog from a YAML or JSON fixture file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            let file: CatalogFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
            Self::from_cases(file.cases)
        } else {
            Self::parse_yaml(&content)
                .with_context(|| format!("Failed to parse catalog: {}", path.display()))
        }
    }

    fn parse_yaml(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        Self::from_cases(file.cases)
    }

    /// All cases in definition order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Cases of one category, preserving relative order
    pub fn by_category(&self, category: Category) -> Vec<&TestCase> {
        self.cases
            .iter()
            .filter(|c| c.category == category)
            .collect()
    }

    /// Lookup by id
    pub fn get(&self, id: CaseId) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
