pub mod api;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;

pub use api::{ApiError, LegacyApiClient, StakePayload, VotePayload};
pub use config::{AppConfig, InjectedAccountConfig, validate_url};
pub use demo::{DemoDefaults, HomeDemo, LockPreset, MintDemo, StakeDemo, VoteDemo};
pub use error::{BtcvoteError, ErrorCategory};
