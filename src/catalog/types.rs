use serde::{Deserialize, Serialize};

/// Stable identifier for a test case. Unique and positive within a catalog.
pub type CaseId = u32;

/// Catalog section a case belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Valid,
    Invalid,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Valid => "valid",
            Category::Invalid => "invalid",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "valid" => Ok(Category::Valid),
            "invalid" => Ok(Category::Invalid),
            other => anyhow::bail!("Unknown category: {} (expected valid|invalid)", other),
        }
    }
}

/// Account record sent as part of a request payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub balance: f64,
    pub currency: String,
}

/// Request body forwarded verbatim to the payment-instructions endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    pub accounts: Vec<Account>,
    pub instruction: String,
}

/// One fixture pairing a request payload with its expected transport status
/// and expected application-level outcome code (e.g. "AP00").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub id: CaseId,
    pub name: String,
    pub category: Category,
    pub expected_status: u16,
    pub expected_code: String,
    pub payload: Payload,
}
