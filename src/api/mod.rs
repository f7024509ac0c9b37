pub mod http;
pub mod traits;

pub use http::HttpApiClient;
pub use traits::{InstructionApi, Outcome};
