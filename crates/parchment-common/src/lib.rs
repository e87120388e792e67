//! parchment-common: backend API access shared by the parchment crates.
//!
//! - `ApiClient` - request normalization, bearer auth and error-response handling
//! - `ApiImageService` - the editor's upload/delete services over the API
//! - `SessionStore` - token and auth-flag storage
//! - `telemetry` - tracing subscriber setup (feature `telemetry`)

pub mod client;
pub mod config;
pub mod error;
pub mod images;
pub mod navigation;
pub mod request;
pub mod response;
pub mod storage;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, ParchmentError};
pub use images::{ApiImageService, ImageEndpoints};
pub use navigation::{MemoryNavigator, Navigator};
pub use request::{ApiRequest, Body, FormValue};
pub use response::{FailureAction, classify_failure};
pub use storage::{MemoryStorage, SessionStore, Storage};

pub type Result<T> = std::result::Result<T, ParchmentError>;
