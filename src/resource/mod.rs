//! Resource handles
//!
//! A handle stands in for one remote resource. It is created from a service id
//! alone (unhydrated) and only holds data after a successful `refresh`, which
//! swaps in a whole new snapshot. Accessors never fetch; they return `None`
//! until the handle has been hydrated.
//!
//! # Architecture
//!
//! - [`Hydration`] - The absent/present snapshot slot every handle owns
//! - [`Resource`] - Where a handle's snapshot lives and which key wraps it
//! - [`Action`] - Declares verb and required scope of each mutating call
//! - [`cloud_server`] - Cloud server handle
//! - [`gameserver`] - Gameserver handle
//!
//! # Example
//!
//! ```ignore
//! use nitrapi::resource::cloud_server::CloudServer;
//!
//! async fn hostname(api: nitrapi::Nitrapi) -> nitrapi::Result<Option<String>> {
//!     let mut server = CloudServer::new(api, 42);
//!     server.refresh().await?;
//!     Ok(server.hostname().map(str::to_string))
//! }
//! ```

pub mod cloud_server;
pub mod gameserver;

use crate::api::client::{extract, Nitrapi};
use crate::api::error::Result;
use crate::api::params::Params;
use crate::value::Scope;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Snapshot slot of a handle
#[derive(Debug)]
pub enum Hydration<S> {
    /// Never fetched
    Unhydrated,
    /// Point-in-time view from the last successful refresh
    Hydrated(Arc<S>),
}

impl<S> Hydration<S> {
    pub fn is_hydrated(&self) -> bool {
        matches!(self, Hydration::Hydrated(_))
    }

    pub fn snapshot(&self) -> Option<&S> {
        match self {
            Hydration::Hydrated(snapshot) => Some(snapshot.as_ref()),
            Hydration::Unhydrated => None,
        }
    }

    /// Install a freshly decoded snapshot, dropping the previous one
    pub fn replace(&mut self, snapshot: S) {
        *self = Hydration::Hydrated(Arc::new(snapshot));
    }
}

impl<S> Default for Hydration<S> {
    fn default() -> Self {
        Hydration::Unhydrated
    }
}

impl<S> Clone for Hydration<S> {
    fn clone(&self) -> Self {
        match self {
            Hydration::Unhydrated => Hydration::Unhydrated,
            Hydration::Hydrated(snapshot) => Hydration::Hydrated(Arc::clone(snapshot)),
        }
    }
}

/// A remote resource that lives under `services/{id}/{PATH}`
pub trait Resource {
    /// Path suffix below `services/{id}/`
    const PATH: &'static str;
    /// Top-level response key wrapping the snapshot
    const KEY: &'static str;
    type Snapshot: DeserializeOwned;
}

/// `services/{id}/{suffix}`
pub fn service_path(id: u64, suffix: &str) -> String {
    if suffix.is_empty() {
        format!("services/{}", id)
    } else {
        format!("services/{}/{}", id, suffix)
    }
}

/// Fetch and decode a fresh snapshot. Installing it is up to the caller, so a
/// failure here leaves whatever the handle held untouched.
pub async fn fetch_snapshot<R: Resource>(api: &Nitrapi, id: u64) -> Result<R::Snapshot> {
    let data = api
        .data_get(&service_path(id, R::PATH), &Params::new())
        .await?;
    extract(&data, R::KEY)
}

/// A side-effecting call a handle can issue
pub trait Action: std::fmt::Debug + Copy {
    /// POST or DELETE
    fn method(self) -> Method;

    /// Scope the token needs, `None` when the API documents no dedicated role
    fn scope(self) -> Option<Scope>;
}

/// Issue a mutating call under `services/{id}/{suffix}`.
/// The handle's snapshot is not touched; call `refresh` to observe the effect.
pub async fn dispatch<A: Action>(
    api: &Nitrapi,
    id: u64,
    action: A,
    suffix: &str,
    params: &Params,
) -> Result<Value> {
    let path = service_path(id, suffix);
    tracing::info!(
        "dispatch: action={:?}, service={}, scope={}",
        action,
        id,
        action.scope().as_ref().map(Scope::as_str).unwrap_or("-")
    );

    if action.method() == Method::DELETE {
        api.data_delete(&path, params).await
    } else {
        api.data_post(&path, params).await
    }
}

/// Percent-encode a caller supplied path segment (backup id, IP address)
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Lenient field decoders for values whose wire format varies between endpoints
pub(crate) mod de {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or Unix seconds. Anything else
    /// decodes to `None`.
    pub fn opt_datetime<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => parse_datetime(&s),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        })
    }

    pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Identifiers are sometimes numbers, sometimes strings
    pub fn opt_string_or_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}
