//! Cloud Server
//!
//! Handle for a cloud server (virtual machine) service, its snapshot types and
//! the operations that act on the machine.

use super::{de, dispatch, fetch_snapshot, segment, service_path, Action, Hydration, Resource};
use crate::api::client::{extract, Nitrapi};
use crate::api::error::Result;
use crate::api::params::Params;
use crate::service::Service;
use crate::value::{string_value, Scope};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

string_value! {
    /// Status of the virtual machine
    pub struct CloudServerStatus {
        RUNNING = "running",
        STOPPED = "stopped",
        /// First installation, can take some minutes
        INSTALLING = "installing",
        REINSTALLING = "reinstalling",
        /// Up- or downgrade in progress
        FLAVOUR_CHANGE = "flavour_change",
        /// Backup restore in progress
        RESTORING = "restoring",
        /// Up- or downgrade failed, support has been informed
        ERROR_FC = "error_fc",
        ERROR_DELETE = "error_delete",
        ERROR_INSTALL = "error_install",
        ERROR_REINSTALL = "error_reinstall",
        RESCUE = "rescue",
    }
}

/// Point-in-time view of a cloud server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudServerInfo {
    pub status: Option<CloudServerStatus>,
    pub hostname: Option<String>,
    pub dynamic: Option<bool>,
    pub hardware: Option<Hardware>,
    pub ips: Option<Vec<Ip>>,
    pub image: Option<Image>,
    pub daemon_available: Option<bool>,
    pub password_available: Option<bool>,
    pub bandwidth_limited: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hardware {
    pub cpu: Option<u32>,
    /// GB
    pub ram: Option<u32>,
    pub windows: Option<bool>,
    /// GB
    pub ssd: Option<u32>,
    pub ipv4: Option<u32>,
    /// High speed traffic in TB
    pub traffic: Option<u32>,
    pub backup: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ip {
    pub address: Option<String>,
    /// 4 or 6
    pub version: Option<u8>,
    pub main_ip: Option<bool>,
    pub mac: Option<String>,
    pub ptr: Option<String>,
}

/// Operating system image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub is_windows: Option<bool>,
    #[serde(rename = "default")]
    pub is_default: Option<bool>,
    pub has_daemon: Option<bool>,
    pub is_daemon_compatible: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Backup {
    #[serde(default, deserialize_with = "de::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One sample of `cloud_servers/resources`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Firewall {
    pub enabled: Option<bool>,
    #[serde(default)]
    pub rules: Vec<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportAuthorization {
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub id: Option<u32>,
    pub name: Option<String>,
}

/// System user from `/etc/passwd`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub username: Option<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
    pub id: Option<u32>,
    pub home: Option<String>,
}

/// Traffic in MB
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentMonth {
    pub used: Option<u64>,
    pub available: Option<u64>,
}

/// Traffic in MB
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub incoming: Option<u64>,
    pub outgoing: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficStatistics {
    pub current_month: Option<CurrentMonth>,
    /// Keyed by day
    #[serde(default)]
    pub last_31_days: HashMap<String, TrafficEntry>,
}

/// Mutating calls on a cloud server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudServerAction {
    CreateBackup,
    RestoreBackup,
    DeleteBackup,
    Boot,
    ChangeHostname,
    ChangePtrEntry,
    Reinstall,
    Reboot,
    HardReset,
    Shutdown,
    Rescue,
    Unrescue,
    CreateSupportAuthorization,
    DeleteSupportAuthorization,
}

impl Action for CloudServerAction {
    fn method(self) -> Method {
        match self {
            CloudServerAction::DeleteBackup | CloudServerAction::DeleteSupportAuthorization => {
                Method::DELETE
            }
            _ => Method::POST,
        }
    }

    fn scope(self) -> Option<Scope> {
        match self {
            CloudServerAction::CreateSupportAuthorization
            | CloudServerAction::DeleteSupportAuthorization => Some(Scope::SUPPORT_AUTHORIZATION),
            _ => None,
        }
    }
}

/// Handle for a cloud server service
#[derive(Debug, Clone)]
pub struct CloudServer {
    api: Nitrapi,
    id: u64,
    info: Hydration<CloudServerInfo>,
}

impl Resource for CloudServer {
    const PATH: &'static str = "cloud_servers";
    const KEY: &'static str = "cloud_server";
    type Snapshot = CloudServerInfo;
}

impl CloudServer {
    /// Unhydrated handle for a service id
    pub fn new(api: Nitrapi, id: u64) -> Self {
        Self {
            api,
            id,
            info: Hydration::Unhydrated,
        }
    }

    /// Handle for a listed service, hydrated right away when the service is
    /// active or suspended
    pub async fn load(api: Nitrapi, service: &Service) -> Result<Self> {
        let mut server = Self::new(api, service.id);
        if service.should_hydrate() {
            server.refresh().await?;
        } else {
            tracing::debug!(
                "Skipping initial load of cloud server {} (status {:?})",
                service.id,
                service.status
            );
        }
        Ok(server)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_hydrated(&self) -> bool {
        self.info.is_hydrated()
    }

    /// The whole snapshot, `None` before the first refresh
    pub fn snapshot(&self) -> Option<&CloudServerInfo> {
        self.info.snapshot()
    }

    /// Fetch a new snapshot and replace the current one. On error the
    /// previous snapshot stays in place.
    pub async fn refresh(&mut self) -> Result<()> {
        let info = fetch_snapshot::<Self>(&self.api, self.id).await?;
        self.info.replace(info);
        Ok(())
    }

    // =========================================================================
    // Snapshot accessors
    // =========================================================================

    pub fn cloud_server_status(&self) -> Option<&CloudServerStatus> {
        self.snapshot()?.status.as_ref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.snapshot()?.hostname.as_deref()
    }

    pub fn is_dynamic(&self) -> Option<bool> {
        self.snapshot()?.dynamic
    }

    pub fn hardware(&self) -> Option<&Hardware> {
        self.snapshot()?.hardware.as_ref()
    }

    pub fn ips(&self) -> Option<&[Ip]> {
        self.snapshot()?.ips.as_deref()
    }

    /// The address flagged as main IP
    pub fn main_ip(&self) -> Option<&Ip> {
        self.ips()?.iter().find(|ip| ip.main_ip == Some(true))
    }

    /// The currently installed image
    pub fn image(&self) -> Option<&Image> {
        self.snapshot()?.image.as_ref()
    }

    /// True if the machine runs a Nitrapi daemon instance
    pub fn is_daemon_available(&self) -> Option<bool> {
        self.snapshot()?.daemon_available
    }

    pub fn is_password_available(&self) -> Option<bool> {
        self.snapshot()?.password_available
    }

    pub fn is_bandwidth_limited(&self) -> Option<bool> {
        self.snapshot()?.bandwidth_limited
    }

    // =========================================================================
    // Requests
    // =========================================================================

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        suffix: &str,
        params: &Params,
        key: &str,
    ) -> Result<T> {
        let data = self.api.data_get(&service_path(self.id, suffix), params).await?;
        extract(&data, key)
    }

    async fn act(&self, action: CloudServerAction, suffix: &str, params: Params) -> Result<()> {
        dispatch(&self.api, self.id, action, suffix, &params).await?;
        Ok(())
    }

    pub async fn backups(&self) -> Result<Vec<Backup>> {
        self.get("cloud_servers/backups", &Params::new(), "backups").await
    }

    pub async fn create_backup(&self) -> Result<()> {
        self.act(CloudServerAction::CreateBackup, "cloud_servers/backups", Params::new()).await
    }

    pub async fn restore_backup(&self, backup_id: &str) -> Result<()> {
        let suffix = format!("cloud_servers/backups/{}/restore", segment(backup_id));
        self.act(CloudServerAction::RestoreBackup, &suffix, Params::new()).await
    }

    pub async fn delete_backup(&self, backup_id: &str) -> Result<()> {
        let suffix = format!("cloud_servers/backups/{}", segment(backup_id));
        self.act(CloudServerAction::DeleteBackup, &suffix, Params::new()).await
    }

    pub async fn boot(&self) -> Result<()> {
        self.act(CloudServerAction::Boot, "cloud_servers/boot", Params::new()).await
    }

    pub async fn change_hostname(&self, hostname: &str) -> Result<()> {
        self.act(
            CloudServerAction::ChangeHostname,
            "cloud_servers/hostname",
            Params::new().with("hostname", hostname),
        )
        .await
    }

    /// Set the reverse DNS entry of one of the server's addresses
    pub async fn change_ptr_entry(&self, ip_address: &str, hostname: &str) -> Result<()> {
        let suffix = format!("cloud_servers/ptr/{}", segment(ip_address));
        self.act(
            CloudServerAction::ChangePtrEntry,
            &suffix,
            Params::new().with("hostname", hostname),
        )
        .await
    }

    pub async fn reinstall(&self, image_id: u32) -> Result<()> {
        self.act(
            CloudServerAction::Reinstall,
            "cloud_servers/reinstall",
            Params::new().with("image_id", image_id),
        )
        .await
    }

    pub async fn reboot(&self) -> Result<()> {
        self.act(CloudServerAction::Reboot, "cloud_servers/reboot", Params::new()).await
    }

    /// Power the machine off instantly. Can cause data loss or file system
    /// corruption; only for instances that ignore a normal reboot.
    pub async fn hard_reset(&self) -> Result<()> {
        self.act(CloudServerAction::HardReset, "cloud_servers/hard_reset", Params::new()).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.act(CloudServerAction::Shutdown, "cloud_servers/shutdown", Params::new()).await
    }

    /// Reboot into rescue mode. Might result in data loss.
    pub async fn rescue(&self) -> Result<()> {
        self.act(CloudServerAction::Rescue, "cloud_servers/rescue", Params::new()).await
    }

    /// Leave rescue mode and reboot. Might result in data loss.
    pub async fn unrescue(&self) -> Result<()> {
        self.act(CloudServerAction::Unrescue, "cloud_servers/unrescue", Params::new()).await
    }

    /// Resource stats. `time` is passed through as-is; the API accepts
    /// `1h`, `4h`, `1d` and `7d`.
    pub async fn resource_usage(&self, time: &str) -> Result<Vec<ResourceUsage>> {
        self.get(
            "cloud_servers/resources",
            &Params::new().with("time", time),
            "resources",
        )
        .await
    }

    pub async fn console_logs(&self, lines: u32) -> Result<String> {
        self.get(
            "cloud_servers/console_logs",
            &Params::new().with("lines", lines),
            "console_logs",
        )
        .await
    }

    pub async fn novnc_url(&self) -> Result<String> {
        self.get("cloud_servers/console", &Params::new(), "console.url").await
    }

    pub async fn initial_password(&self) -> Result<String> {
        self.get("cloud_servers/password", &Params::new(), "password").await
    }

    pub async fn firewall(&self) -> Result<Firewall> {
        self.get("cloud_servers/firewall", &Params::new(), "firewall").await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.get("cloud_servers/user", &Params::new(), "users.users").await
    }

    /// Daily traffic usage of the last 30 days
    pub async fn traffic_statistics(&self) -> Result<TrafficStatistics> {
        self.get("cloud_servers/traffic", &Params::new(), "traffic").await
    }

    /// The existing support authorization, an API error if there is none
    pub async fn support_authorization(&self) -> Result<SupportAuthorization> {
        self.get("support_authorization", &Params::new(), "support_authorization").await
    }

    pub async fn create_support_authorization(&self) -> Result<()> {
        self.act(
            CloudServerAction::CreateSupportAuthorization,
            "support_authorization",
            Params::new(),
        )
        .await
    }

    pub async fn delete_support_authorization(&self) -> Result<()> {
        self.act(
            CloudServerAction::DeleteSupportAuthorization,
            "support_authorization",
            Params::new(),
        )
        .await
    }
}
