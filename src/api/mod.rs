//! Nitrapi transport module
//!
//! Everything needed to talk to the Nitrado REST API: the access token, the
//! HTTP client, request parameters and error types.
//!
//! # Module Structure
//!
//! - [`auth`] - Access token handling
//! - [`client`] - Main client, path resolution and response unwrapping
//! - [`error`] - Error taxonomy shared by every call
//! - [`http`] - HTTP utilities for REST API calls
//! - [`params`] - Named query/form parameters
//!
//! # Example
//!
//! ```ignore
//! use nitrapi::api::{auth::AccessToken, client::Nitrapi, params::Params};
//!
//! async fn example() -> nitrapi::Result<()> {
//!     let api = Nitrapi::new(AccessToken::new("my-token")?)?;
//!     let data = api.data_get("services/42/gameservers", &Params::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod params;
