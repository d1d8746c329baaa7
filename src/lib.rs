//! Typed client for the Nitrado REST API (Nitrapi).
//!
//! Resources are represented by handles that start out holding only their
//! service id and are filled by an explicit `refresh`:
//!
//! ```ignore
//! use nitrapi::{AccessToken, Gameserver, Nitrapi};
//!
//! #[tokio::main]
//! async fn main() -> nitrapi::Result<()> {
//!     let api = Nitrapi::new(AccessToken::new("my-token")?)?;
//!     let mut server = Gameserver::new(api, 1234567);
//!     assert!(server.game().is_none());
//!
//!     server.refresh().await?;
//!     println!("{:?} on {:?}", server.game(), server.gameserver_status());
//!
//!     server.install_game("cs2", None).await?;
//!     server.refresh().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod resource;
pub mod service;
pub mod value;

pub use api::auth::AccessToken;
pub use api::client::Nitrapi;
pub use api::error::{format_api_error, Error, Result};
pub use api::params::Params;
pub use resource::cloud_server::{CloudServer, CloudServerStatus};
pub use resource::gameserver::{Gameserver, GameserverStatus, Query};
pub use resource::{Action, Hydration, Resource};
pub use service::{Service, ServiceStatus};
pub use value::Scope;
