//! Floating Dock CLI
//!
//! Talks to the dock daemon over its socket, starting it in the background
//! first when needed.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dock_rpc::client::{RpcClient, socket_path};
use dock_rpc::protocol::LaunchParams;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;

const DAEMON_BINARY: &str = "floating-dock-daemon";

/// Find a binary, preferring one next to the current executable
fn find_binary(name: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let sibling = dir.join(name);
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from(name)
}

/// Floating Dock CLI
#[derive(Parser)]
#[command(name = "floating-dock")]
#[command(about = "Control the floating dock")]
#[command(version)]
#[command(after_help = "\
Examples:
  floating-dock toggle                       Show or hide the dock
  floating-dock launch /Applications/Foo.app Launch an application through the dock
  floating-dock status                       Check daemon and dock status
  floating-dock daemon                       Run daemon in foreground

Keybinding example (Hyprland):
  bind = SUPER, D, exec, floating-dock toggle
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in foreground
    Daemon,

    /// Show the dock if hidden, hide it if shown
    Toggle,

    /// Launch an application the way a dock entry would
    Launch {
        /// Application bundle or executable
        path: PathBuf,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Check daemon status
    Status,

    /// Stop the daemon
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => run_daemon(),
        Commands::Toggle => run_toggle().await,
        Commands::Launch { path, name } => run_launch(&path, name).await,
        Commands::Status => run_status().await,
        Commands::Shutdown => run_shutdown().await,
    }
}

fn run_daemon() -> Result<()> {
    let binary = find_binary(DAEMON_BINARY);
    let status = Command::new(&binary)
        .status()
        .with_context(|| format!("Failed to start {}. Is it installed?", binary.display()))?;
    if !status.success() {
        bail!("{DAEMON_BINARY} exited with status: {status}");
    }
    Ok(())
}

async fn ensure_daemon_running() -> Result<RpcClient> {
    if let Ok(client) = RpcClient::connect().await {
        return Ok(client);
    }

    eprintln!("Starting daemon...");
    let binary = find_binary(DAEMON_BINARY);
    Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to spawn {}. Is it installed?", binary.display()))?;

    wait_for_daemon(Duration::from_secs(5))
        .await
        .context("Daemon failed to start within 5 seconds")
}

async fn wait_for_daemon(timeout: Duration) -> Option<RpcClient> {
    let start = std::time::Instant::now();
    let poll_interval = Duration::from_millis(100);

    while start.elapsed() < timeout {
        if let Ok(client) = RpcClient::connect().await {
            return Some(client);
        }
        sleep(poll_interval).await;
    }

    None
}

async fn connect() -> Result<RpcClient> {
    let socket = socket_path();
    if !socket.exists() {
        bail!(
            "Daemon not running (socket {} not found). Start it with `floating-dock daemon`.",
            socket.display()
        );
    }
    RpcClient::connect()
        .await
        .with_context(|| format!("Failed to connect to {}", socket.display()))
}

async fn run_toggle() -> Result<()> {
    let client = ensure_daemon_running().await?;
    let status = client.toggle().await.context("Toggle command failed")?;
    println!("Dock {}", if status.window_open { "shown" } else { "hidden" });
    Ok(())
}

async fn run_launch(path: &Path, name: Option<String>) -> Result<()> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;

    let client = ensure_daemon_running().await?;
    let params = LaunchParams {
        path: path.clone(),
        name,
    };
    client.launch(params).await.context("Launch command failed")?;

    // The outcome is reported in the daemon log
    println!("Launch of {} requested", path.display());
    Ok(())
}

async fn run_status() -> Result<()> {
    let socket = socket_path();

    if !socket.exists() {
        println!("Status: Not running");
        println!("Socket: {} (not found)", socket.display());
        return Ok(());
    }

    match RpcClient::connect().await {
        Ok(client) => {
            let status = client.status().await.context("Status request failed")?;
            println!("Status: Running");
            println!("Socket: {}", socket.display());
            println!("Dock: {}", if status.window_open { "shown" } else { "hidden" });
            println!(
                "Launch in progress: {}",
                if status.launch_in_flight { "yes" } else { "no" }
            );
        }
        Err(e) => {
            println!("Status: Error");
            println!(
                "Socket: {} (exists but connection failed)",
                socket.display()
            );
            println!("Error: {e}");
        }
    }

    Ok(())
}

async fn run_shutdown() -> Result<()> {
    let client = connect().await?;
    client.shutdown().await.context("Shutdown command failed")?;
    println!("Daemon shutting down");
    Ok(())
}
