pub mod api_types;
pub mod client;
pub mod error;
pub mod types;

pub use api_types::{FetchResult, Fetched};
pub use client::ApiClient;
pub use error::ErrorInfo;
