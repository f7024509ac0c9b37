pub mod api;
pub mod catalog;
pub mod engine;
pub mod report;

// Re-export common items
pub use catalog::TestCatalog;
pub use engine::{run_suite, ExecutionEngine};
pub use report::generate_report;
