//! HTTP gateway to the Mealie API.

mod client;
mod error;
mod retry;

pub use client::ApiClient;
pub use error::ApiError;
pub use retry::RetryPolicy;
