//! Gameserver
//!
//! Handle for a gameserver service. Besides the usual refresh cycle, the
//! gameserver's status and query data are also pushed over the websocket feed;
//! those two fields live in a small mutable cell next to the immutable
//! snapshot and are the only thing that changes between refreshes.

use super::{de, dispatch, fetch_snapshot, service_path, Action, Hydration, Resource};
use crate::api::client::{extract, Nitrapi};
use crate::api::error::{Error, Result};
use crate::api::params::Params;
use crate::service::Service;
use crate::value::{string_value, Scope};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Time range used by [`Gameserver::stats`] when the caller has no preference
pub const DEFAULT_STATS_HOURS: u32 = 24;

string_value! {
    /// Product line of a gameserver
    pub struct GameserverType {
        GAMESERVER = "Gameserver",
        GAMESERVER_BASIC = "Gameserver_Basic",
        GAMESERVER_EPS = "Gameserver_EPS",
    }
}

string_value! {
    pub struct MemoryType {
        STANDARD = "Standard",
        ADVANCED = "Advanced",
        PROFESSIONAL = "Professional",
        ULTIMATE = "Ultimate",
    }
}

string_value! {
    /// Runtime status of a gameserver
    pub struct GameserverStatus {
        /// Currently running
        STARTED = "started",
        STOPPED = "stopped",
        STOPPING = "stopping",
        RESTARTING = "restarting",
        /// Needs to be reactivated on the website
        SUSPENDED = "suspended",
        /// Outside the allowed guardian times
        GUARDIAN_LOCKED = "guardian_locked",
        /// Game switch in progress
        GS_INSTALLATION = "gs_installation",
        BACKUP_RESTORE = "backup_restore",
        BACKUP_CREATION = "backup_creation",
        /// Minecraft only
        CHUNKFIX = "chunkfix",
        /// Minecraft only
        OVERVIEWMAP_RENDER = "overviewmap_render",
        /// The host is unreachable
        HOST_DOWN = "hostdown",
        UPDATING = "updating",
    }
}

string_value! {
    pub struct UpdateStatus {
        UP_TO_DATE = "up_to_date",
        IN_PROGRESS = "update_in_progress",
    }
}

/// Point-in-time view of a gameserver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameserverInfo {
    /// Status as fetched; see [`Gameserver::gameserver_status`] for the live value
    pub status: Option<GameserverStatus>,
    pub websocket_token: Option<String>,
    pub minecraft_mode: Option<bool>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub query_port: Option<u16>,
    pub rcon_port: Option<u16>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub server_type: Option<GameserverType>,
    pub memory: Option<MemoryType>,
    pub memory_mb: Option<u32>,
    /// Folder short of the running game
    pub game: Option<String>,
    #[serde(rename = "game_human")]
    pub game_readable: Option<String>,
    pub game_specific: Option<GameSpecific>,
    pub modpacks: Option<HashMap<String, Modpack>>,
    pub slots: Option<u32>,
    /// ISO short of the hosting country
    pub location: Option<String>,
    pub credentials: Option<HashMap<String, Credentials>>,
    /// Customer settings, read-only
    pub settings: Option<Value>,
    pub quota: Option<Quota>,
    /// Query data as fetched; see [`Gameserver::query`] for the live value
    pub query: Option<Query>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameSpecific {
    pub path: Option<String>,
    pub path_available: Option<bool>,
    pub update_status: Option<UpdateStatus>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub last_update: Option<DateTime<Utc>>,
    pub features: Option<Features>,
    pub log_files: Option<Vec<String>>,
    pub config_files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Features {
    pub has_backups: Option<bool>,
    pub has_application_server: Option<bool>,
    pub has_file_browser: Option<bool>,
    pub has_ftp: Option<bool>,
    pub has_expert_mode: Option<bool>,
    pub has_plugin_system: Option<bool>,
    pub has_restart_message_support: Option<bool>,
    pub has_database: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modpack {
    pub name: Option<String>,
    pub modpack_version: Option<String>,
    pub game_version: Option<String>,
    pub modpack_file: Option<String>,
}

/// Access data for an attached service (`ftp`, `mysql`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// Disk quota, blocks in KB
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quota {
    pub block_usage: Option<u64>,
    pub block_softlimit: Option<u64>,
    pub block_hardlimit: Option<u64>,
    pub file_usage: Option<u64>,
    pub file_softlimit: Option<u64>,
    pub file_hardlimit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub bot: Option<bool>,
    pub score: Option<i64>,
    pub frags: Option<i64>,
    pub deaths: Option<i64>,
    pub time: Option<u64>,
    pub ping: Option<u32>,
}

/// Result of the game's query protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub server_name: Option<String>,
    pub connect_ip: Option<String>,
    pub map: Option<String>,
    pub version: Option<String>,
    pub player_current: Option<u32>,
    pub player_max: Option<u32>,
    pub players: Option<Vec<Player>>,
}

impl Query {
    /// Merge a pushed update: fields present in `update` overwrite, absent
    /// fields keep their current value.
    pub fn update(&mut self, update: Query) {
        let Query {
            server_name,
            connect_ip,
            map,
            version,
            player_current,
            player_max,
            players,
        } = update;

        if server_name.is_some() {
            self.server_name = server_name;
        }
        if connect_ip.is_some() {
            self.connect_ip = connect_ip;
        }
        if map.is_some() {
            self.map = map;
        }
        if version.is_some() {
            self.version = version;
        }
        if player_current.is_some() {
            self.player_current = player_current;
        }
        if player_max.is_some() {
            self.player_max = player_max;
        }
        if players.is_some() {
            self.players = players;
        }
    }
}

/// Usage statistics, series keyed by metric name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(flatten)]
    pub series: Map<String, Value>,
}

/// Response of `gameservers/games`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameList {
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdosAttack {
    #[serde(default, deserialize_with = "de::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields the websocket feed may change between refreshes
#[derive(Debug, Clone, Default)]
struct LiveState {
    status: Option<GameserverStatus>,
    query: Option<Query>,
}

/// Mutating calls on a gameserver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameserverAction {
    Restart,
    Stop,
    ChangeFtpPassword,
    ChangeMysqlPassword,
    ResetMysqlDatabase,
    InstallGame,
    UninstallGame,
    StartGame,
    SendCommand,
}

impl Action for GameserverAction {
    fn method(self) -> Method {
        match self {
            GameserverAction::UninstallGame => Method::DELETE,
            _ => Method::POST,
        }
    }

    fn scope(self) -> Option<Scope> {
        Some(match self {
            GameserverAction::Restart | GameserverAction::Stop | GameserverAction::SendCommand => {
                Scope::WEBINTERFACE_GENERAL_CONTROL
            }
            GameserverAction::ChangeFtpPassword => Scope::WEBINTERFACE_FTP_CREDENTIALS_WRITE,
            GameserverAction::ChangeMysqlPassword | GameserverAction::ResetMysqlDatabase => {
                Scope::WEBINTERFACE_MYSQL_CREDENTIALS_WRITE
            }
            GameserverAction::InstallGame
            | GameserverAction::UninstallGame
            | GameserverAction::StartGame => Scope::GAMESERVER_CHANGE_GAME,
        })
    }
}

/// Handle for a gameserver service
#[derive(Debug, Clone)]
pub struct Gameserver {
    api: Nitrapi,
    id: u64,
    info: Hydration<GameserverInfo>,
    live: Option<LiveState>,
}

impl Resource for Gameserver {
    const PATH: &'static str = "gameservers";
    const KEY: &'static str = "gameserver";
    type Snapshot = GameserverInfo;
}

impl Gameserver {
    /// Unhydrated handle for a service id
    pub fn new(api: Nitrapi, id: u64) -> Self {
        Self {
            api,
            id,
            info: Hydration::Unhydrated,
            live: None,
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
                "Skipping initial load of gameserver {} (status {:?})",
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

    /// The snapshot from the last refresh, without pushed updates
    pub fn snapshot(&self) -> Option<&GameserverInfo> {
        self.info.snapshot()
    }

    /// Fetch a new snapshot and replace the current one, resetting pushed
    /// status and query to the fetched values. On error nothing changes.
    pub async fn refresh(&mut self) -> Result<()> {
        let info = fetch_snapshot::<Self>(&self.api, self.id).await?;
        self.install(info);
        Ok(())
    }

    fn install(&mut self, info: GameserverInfo) {
        self.live = Some(LiveState {
            status: info.status.clone(),
            query: info.query.clone(),
        });
        self.info.replace(info);
    }

    // =========================================================================
    // Push updates
    // =========================================================================

    /// Apply a status received over the websocket feed.
    /// Ignored while the handle is unhydrated.
    pub fn update_status(&mut self, status: GameserverStatus) {
        if let Some(live) = self.live.as_mut() {
            live.status = Some(status);
        }
    }

    /// Merge query data received over the websocket feed.
    /// Ignored while the handle is unhydrated.
    pub fn update_query(&mut self, query: Query) {
        if let Some(live) = self.live.as_mut() {
            match live.query.as_mut() {
                Some(current) => current.update(query),
                None => live.query = Some(query),
            }
        }
    }

    // =========================================================================
    // Snapshot accessors
    // =========================================================================

    /// Current status, including pushed updates
    pub fn gameserver_status(&self) -> Option<&GameserverStatus> {
        self.live.as_ref()?.status.as_ref()
    }

    /// Current query data, including pushed updates
    pub fn query(&self) -> Option<&Query> {
        self.live.as_ref()?.query.as_ref()
    }

    /// Token needed to connect to the websocket feed
    pub fn websocket_token(&self) -> Option<&str> {
        self.snapshot()?.websocket_token.as_deref()
    }

    /// Backend flag; does not imply a Minecraft game is installed
    pub fn is_minecraft_mode(&self) -> Option<bool> {
        self.snapshot()?.minecraft_mode
    }

    /// Whether the running game is one of the Minecraft Java editions
    pub fn is_minecraft_game(&self) -> bool {
        self.game()
            .is_some_and(|game| game.starts_with("mcr") && game != "mcrpocket")
    }

    pub fn ip(&self) -> Option<&str> {
        self.snapshot()?.ip.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.snapshot()?.port
    }

    pub fn query_port(&self) -> Option<u16> {
        self.snapshot()?.query_port
    }

    pub fn rcon_port(&self) -> Option<u16> {
        self.snapshot()?.rcon_port
    }

    /// Needed together with the token to connect to the websocket feed
    pub fn label(&self) -> Option<&str> {
        self.snapshot()?.label.as_deref()
    }

    pub fn server_type(&self) -> Option<&GameserverType> {
        self.snapshot()?.server_type.as_ref()
    }

    pub fn memory_type(&self) -> Option<&MemoryType> {
        self.snapshot()?.memory.as_ref()
    }

    pub fn memory_mb(&self) -> Option<u32> {
        self.snapshot()?.memory_mb
    }

    pub fn game(&self) -> Option<&str> {
        self.snapshot()?.game.as_deref()
    }

    pub fn game_readable(&self) -> Option<&str> {
        self.snapshot()?.game_readable.as_deref()
    }

    fn game_specific(&self) -> Option<&GameSpecific> {
        self.snapshot()?.game_specific.as_ref()
    }

    fn features(&self) -> Option<&Features> {
        self.game_specific()?.features.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.game_specific()?.path.as_deref()
    }

    pub fn is_path_available(&self) -> Option<bool> {
        self.game_specific()?.path_available
    }

    pub fn game_update_status(&self) -> Option<&UpdateStatus> {
        self.game_specific()?.update_status.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.game_specific()?.last_update
    }

    pub fn has_backups(&self) -> Option<bool> {
        self.features()?.has_backups
    }

    pub fn has_application_server(&self) -> Option<bool> {
        self.features()?.has_application_server
    }

    pub fn has_file_browser(&self) -> Option<bool> {
        self.features()?.has_file_browser
    }

    pub fn has_ftp(&self) -> Option<bool> {
        self.features()?.has_ftp
    }

    pub fn has_expert_mode(&self) -> Option<bool> {
        self.features()?.has_expert_mode
    }

    pub fn has_plugin_system(&self) -> Option<bool> {
        self.features()?.has_plugin_system
    }

    pub fn has_restart_message_support(&self) -> Option<bool> {
        self.features()?.has_restart_message_support
    }

    pub fn has_database(&self) -> Option<bool> {
        self.features()?.has_database
    }

    pub fn log_files(&self) -> Option<&[String]> {
        self.game_specific()?.log_files.as_deref()
    }

    pub fn config_files(&self) -> Option<&[String]> {
        self.game_specific()?.config_files.as_deref()
    }

    pub fn modpacks(&self) -> Option<&HashMap<String, Modpack>> {
        self.snapshot()?.modpacks.as_ref()
    }

    pub fn slots(&self) -> Option<u32> {
        self.snapshot()?.slots
    }

    pub fn location(&self) -> Option<&str> {
        self.snapshot()?.location.as_deref()
    }

    /// Credentials of an attached service such as `ftp` or `mysql`.
    /// Unknown or blank types yield `None`.
    pub fn credentials(&self, kind: &str) -> Option<&Credentials> {
        self.snapshot()?.credentials.as_ref()?.get(kind)
    }

    pub fn customer_settings(&self) -> Option<&Value> {
        self.snapshot()?.settings.as_ref()
    }

    pub fn quota(&self) -> Option<&Quota> {
        self.snapshot()?.quota.as_ref()
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

    async fn act(&self, action: GameserverAction, suffix: &str, params: Params) -> Result<()> {
        dispatch(&self.api, self.id, action, suffix, &params).await?;
        Ok(())
    }

    /// Start or restart the server, optionally announcing `message` to players
    pub async fn restart(&self, message: Option<&str>) -> Result<()> {
        let params = Params::new().with_opt("restart_message", message).with(
            "message",
            format!("Server restart requested ({})", self.api.application_name()),
        );
        self.act(GameserverAction::Restart, "gameservers/restart", params).await
    }

    /// Stop the server, optionally announcing `message` to players
    pub async fn stop(&self, message: Option<&str>) -> Result<()> {
        let params = Params::new().with_opt("stop_message", message).with(
            "message",
            format!("Server stop requested ({})", self.api.application_name()),
        );
        self.act(GameserverAction::Stop, "gameservers/stop", params).await
    }

    pub async fn change_ftp_password(&self, password: &str) -> Result<()> {
        self.act(
            GameserverAction::ChangeFtpPassword,
            "gameservers/ftp/password",
            Params::new().with("password", password),
        )
        .await
    }

    pub async fn change_mysql_password(&self, password: &str) -> Result<()> {
        self.act(
            GameserverAction::ChangeMysqlPassword,
            "gameservers/mysql/password",
            Params::new().with("password", password),
        )
        .await
    }

    /// Truncate the MySQL database
    pub async fn reset_mysql_database(&self) -> Result<()> {
        self.act(
            GameserverAction::ResetMysqlDatabase,
            "gameservers/mysql/reset",
            Params::new(),
        )
        .await
    }

    /// Every game available to this server
    pub async fn games(&self) -> Result<GameList> {
        let data = self
            .api
            .data_get(&service_path(self.id, "gameservers/games"), &Params::new())
            .await?;
        GameList::deserialize(&data).map_err(|source| Error::Decode {
            key: "games".to_string(),
            source,
        })
    }

    /// Install a game by folder short, optionally with a modpack file.
    /// The cached snapshot is not updated; refresh to see the new game.
    pub async fn install_game(&self, game: &str, modpack: Option<&str>) -> Result<()> {
        self.act(
            GameserverAction::InstallGame,
            "gameservers/games/install",
            Params::new().with("game", game).with_opt("modpack", modpack),
        )
        .await
    }

    pub async fn uninstall_game(&self, game: &str) -> Result<()> {
        self.act(
            GameserverAction::UninstallGame,
            "gameservers/games/uninstall",
            Params::new().with("game", game),
        )
        .await
    }

    /// Switch to an already installed game
    pub async fn start_game(&self, game: &str) -> Result<()> {
        self.act(
            GameserverAction::StartGame,
            "gameservers/games/start",
            Params::new().with("game", game),
        )
        .await
    }

    pub async fn ddos_history(&self) -> Result<Vec<DdosAttack>> {
        self.get("ddos", &Params::new(), "history").await
    }

    /// Usage statistics over the last `hours` (the API accepts 1 to 24;
    /// other values are rejected remotely)
    pub async fn stats(&self, hours: u32) -> Result<Stats> {
        self.get("gameservers/stats", &Params::new().with("hours", hours), "stats").await
    }

    /// Send a console command. Output goes to the websocket feed.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.act(
            GameserverAction::SendCommand,
            "gameservers/app_server/command",
            Params::new().with("command", command),
        )
        .await
    }
}
