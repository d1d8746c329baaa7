use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use nitrapi::config::Config;
use nitrapi::resource::gameserver::DEFAULT_STATS_HOURS;
use nitrapi::{format_api_error, CloudServer, Gameserver, Nitrapi, Service};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command line client for the Nitrado API
#[derive(Parser, Debug)]
#[command(name = "nitrapi", version, about, long_about = None)]
struct Args {
    /// Access token (overrides NITRAPI_ACCESS_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API endpoint
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store an access token in the config file
    Login { token: String },
    /// List services
    Services {
        /// Also load every active cloud server and gameserver
        #[arg(long)]
        load: bool,
    },
    /// Cloud server operations
    Cloud {
        /// Service id (defaults to the configured service)
        #[arg(long)]
        id: Option<u64>,
        #[command(subcommand)]
        action: CloudCommand,
    },
    /// Gameserver operations
    Gameserver {
        /// Service id (defaults to the configured service)
        #[arg(long)]
        id: Option<u64>,
        #[command(subcommand)]
        action: GameserverCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CloudCommand {
    Show,
    Backups,
    BackupCreate,
    BackupRestore { backup_id: String },
    BackupDelete { backup_id: String },
    Boot,
    Reboot,
    /// Instant power off, may corrupt the file system
    Reset,
    Shutdown,
    Rescue,
    Unrescue,
    Hostname { hostname: String },
    Ptr { ip: String, hostname: String },
    Reinstall { image_id: u32 },
    /// Resource usage, time is one of 1h, 4h, 1d, 7d
    Resources { time: String },
    ConsoleLogs {
        #[arg(default_value_t = 100)]
        lines: u32,
    },
    Vnc,
    Password,
    Firewall,
    Traffic,
    Users,
    /// Show the support authorization
    SupportAuth,
    /// Allow support staff to access the machine
    SupportAuthCreate,
    SupportAuthDelete,
}

#[derive(Subcommand, Debug)]
enum GameserverCommand {
    Show,
    Restart { message: Option<String> },
    Stop { message: Option<String> },
    Install {
        game: String,
        #[arg(long)]
        modpack: Option<String>,
    },
    Uninstall { game: String },
    StartGame { game: String },
    Games,
    Stats {
        #[arg(long, default_value_t = DEFAULT_STATS_HOURS)]
        hours: u32,
    },
    Command { command: String },
    Ddos,
    FtpPassword { password: String },
    MysqlPassword { password: String },
    MysqlReset,
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("nitrapi started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("nitrapi").join("nitrapi.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".nitrapi").join("nitrapi.log");
    }
    PathBuf::from("nitrapi.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        match err.downcast_ref::<nitrapi::Error>() {
            Some(api_err) => eprintln!("Error: {}", format_api_error(api_err)),
            None => eprintln!("Error: {err:?}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    let command = match args.command {
        Command::Login { token } => {
            let path = config.set_access_token(&token)?;
            println!("Token saved to {}", path.display());
            return Ok(());
        }
        other => other,
    };

    let token = config.effective_token(args.token.as_deref())?;
    let base_url = config.effective_base_url(args.url.as_deref());
    let mut api = Nitrapi::new(token)?.with_base_url(&base_url)?;
    if let Some(name) = &config.application_name {
        api = api.with_application_name(name);
    }

    match command {
        Command::Login { .. } => Ok(()),
        Command::Services { load } => list_services(&api, load).await,
        Command::Cloud { id, action } => {
            let id = service_id(id, &config)?;
            run_cloud(CloudServer::new(api, id), action).await
        }
        Command::Gameserver { id, action } => {
            let id = service_id(id, &config)?;
            run_gameserver(Gameserver::new(api, id), action).await
        }
    }
}

fn service_id(cli: Option<u64>, config: &Config) -> Result<u64> {
    cli.or(config.default_service)
        .context("No service id given. Use --id or set default_service in the config")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn done(what: &str) -> Result<()> {
    println!("{} requested", what);
    Ok(())
}

async fn list_services(api: &Nitrapi, load: bool) -> Result<()> {
    let services = api.services().await.context("Failed to list services")?;

    if !load {
        for service in &services {
            println!(
                "{:>10}  {:<14} {:<12} {}",
                service.id,
                service.service_type.as_deref().unwrap_or("-"),
                service.status.as_ref().map(|s| s.as_str()).unwrap_or("-"),
                service.details.name.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    let summaries = join_all(services.iter().map(|service| summarize(api, service))).await;
    for (service, summary) in services.iter().zip(summaries) {
        match summary {
            Ok(line) => println!("{:>10}  {}", service.id, line),
            Err(e) => {
                tracing::warn!("Failed to load service {}: {}", service.id, e);
                println!("{:>10}  <{}>", service.id, format_api_error(&e));
            }
        }
    }
    Ok(())
}

async fn summarize(api: &Nitrapi, service: &Service) -> nitrapi::Result<String> {
    if service.is_cloud_server() {
        let server = CloudServer::load(api.clone(), service).await?;
        Ok(format!(
            "cloud_server   {:<12} {}",
            server.cloud_server_status().map(|s| s.as_str()).unwrap_or("-"),
            server.hostname().unwrap_or("-")
        ))
    } else if service.is_gameserver() {
        let server = Gameserver::load(api.clone(), service).await?;
        Ok(format!(
            "gameserver     {:<12} {} {}:{}",
            server.gameserver_status().map(|s| s.as_str()).unwrap_or("-"),
            server.game_readable().unwrap_or("-"),
            server.ip().unwrap_or("-"),
            server.port().map(|p| p.to_string()).unwrap_or_else(|| "-".into())
        ))
    } else {
        Ok(service.service_type.clone().unwrap_or_else(|| "-".into()))
    }
}

async fn run_cloud(mut server: CloudServer, action: CloudCommand) -> Result<()> {
    match action {
        CloudCommand::Show => {
            server.refresh().await?;
            print_json(&server.snapshot())
        }
        CloudCommand::Backups => print_json(&server.backups().await?),
        CloudCommand::BackupCreate => {
            server.create_backup().await?;
            done("Backup creation")
        }
        CloudCommand::BackupRestore { backup_id } => {
            server.restore_backup(&backup_id).await?;
            done("Backup restore")
        }
        CloudCommand::BackupDelete { backup_id } => {
            server.delete_backup(&backup_id).await?;
            done("Backup deletion")
        }
        CloudCommand::Boot => {
            server.boot().await?;
            done("Boot")
        }
        CloudCommand::Reboot => {
            server.reboot().await?;
            done("Reboot")
        }
        CloudCommand::Reset => {
            server.hard_reset().await?;
            done("Hard reset")
        }
        CloudCommand::Shutdown => {
            server.shutdown().await?;
            done("Shutdown")
        }
        CloudCommand::Rescue => {
            server.rescue().await?;
            done("Rescue mode")
        }
        CloudCommand::Unrescue => {
            server.unrescue().await?;
            done("Leaving rescue mode")
        }
        CloudCommand::Hostname { hostname } => {
            server.change_hostname(&hostname).await?;
            done("Hostname change")
        }
        CloudCommand::Ptr { ip, hostname } => {
            server.change_ptr_entry(&ip, &hostname).await?;
            done("PTR change")
        }
        CloudCommand::Reinstall { image_id } => {
            server.reinstall(image_id).await?;
            done("Reinstall")
        }
        CloudCommand::Resources { time } => print_json(&server.resource_usage(&time).await?),
        CloudCommand::ConsoleLogs { lines } => {
            println!("{}", server.console_logs(lines).await?);
            Ok(())
        }
        CloudCommand::Vnc => {
            println!("{}", server.novnc_url().await?);
            Ok(())
        }
        CloudCommand::Password => {
            println!("{}", server.initial_password().await?);
            Ok(())
        }
        CloudCommand::Firewall => print_json(&server.firewall().await?),
        CloudCommand::Traffic => print_json(&server.traffic_statistics().await?),
        CloudCommand::Users => print_json(&server.users().await?),
        CloudCommand::SupportAuth => print_json(&server.support_authorization().await?),
        CloudCommand::SupportAuthCreate => {
            server.create_support_authorization().await?;
            done("Support authorization")
        }
        CloudCommand::SupportAuthDelete => {
            server.delete_support_authorization().await?;
            done("Support authorization removal")
        }
    }
}

async fn run_gameserver(mut server: Gameserver, action: GameserverCommand) -> Result<()> {
    match action {
        GameserverCommand::Show => {
            server.refresh().await?;
            print_json(&server.snapshot())
        }
        GameserverCommand::Restart { message } => {
            server.restart(message.as_deref()).await?;
            done("Restart")
        }
        GameserverCommand::Stop { message } => {
            server.stop(message.as_deref()).await?;
            done("Stop")
        }
        GameserverCommand::Install { game, modpack } => {
            server.install_game(&game, modpack.as_deref()).await?;
            done("Game installation")
        }
        GameserverCommand::Uninstall { game } => {
            server.uninstall_game(&game).await?;
            done("Game removal")
        }
        GameserverCommand::StartGame { game } => {
            server.start_game(&game).await?;
            done("Game start")
        }
        GameserverCommand::Games => print_json(&server.games().await?),
        GameserverCommand::Stats { hours } => print_json(&server.stats(hours).await?),
        GameserverCommand::Command { command } => {
            server.send_command(&command).await?;
            done("Command")
        }
        GameserverCommand::Ddos => print_json(&server.ddos_history().await?),
        GameserverCommand::FtpPassword { password } => {
            server.change_ftp_password(&password).await?;
            done("FTP password change")
        }
        GameserverCommand::MysqlPassword { password } => {
            server.change_mysql_password(&password).await?;
            done("MySQL password change")
        }
        GameserverCommand::MysqlReset => {
            server.reset_mysql_database().await?;
            done("MySQL reset")
        }
    }
}
