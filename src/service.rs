//! Service descriptors
//!
//! A service is the billing-level wrapper around a cloud server or a
//! gameserver. Its coarse status decides whether a handle is worth hydrating.

use crate::value::string_value;
use chrono::{DateTime, Utc};
use serde::Deserialize;

string_value! {
    /// Lifecycle status of a service
    pub struct ServiceStatus {
        /// Still being provisioned
        INSTALLING = "installing",
        ACTIVE = "active",
        /// Not paid, can be reactivated on the website
        SUSPENDED = "suspended",
        ADMIN_LOCKED = "admin_locked",
        ADMIN_LOCKED_SUSPENDED = "admin_locked_suspended",
        /// Scheduled for or already deleted
        DELETED = "deleted",
    }
}

/// Short summary the service list carries for every entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDetails {
    pub address: Option<String>,
    pub name: Option<String>,
    pub game: Option<String>,
    pub folder_short: Option<String>,
    pub slots: Option<u32>,
}

/// One entry of `GET services`
#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub id: u64,
    pub status: Option<ServiceStatus>,
    /// Machine readable type, e.g. `gameserver` or `cloud_server`
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub type_human: Option<String>,
    pub username: Option<String>,
    pub comment: Option<String>,
    pub location_id: Option<u32>,
    #[serde(default, deserialize_with = "crate::resource::de::opt_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::resource::de::opt_datetime")]
    pub suspend_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::resource::de::opt_datetime")]
    pub delete_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub details: ServiceDetails,
}

impl Service {
    /// Handles built from this service fetch their data right away only when
    /// the service is active or suspended. Other states may not have any
    /// resource data on the remote side yet.
    pub fn should_hydrate(&self) -> bool {
        matches!(
            &self.status,
            Some(s) if *s == ServiceStatus::ACTIVE || *s == ServiceStatus::SUSPENDED
        )
    }

    pub fn is_cloud_server(&self) -> bool {
        self.service_type.as_deref() == Some("cloud_server")
    }

    pub fn is_gameserver(&self) -> bool {
        self.service_type.as_deref() == Some("gameserver")
    }
}
