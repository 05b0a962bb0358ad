mod daemon;
mod ipc;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "raven-dock")]
#[command(about = "Multi-screen dock and panel daemon for Raven Desktop")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run as daemon (default)
    Daemon,
    /// Show screens, layouts and views as JSON
    Status,
    /// List loaded layouts, current ones marked with *
    Layouts,
    /// Make a layout current
    SwitchLayout {
        /// Layout name
        name: String,
    },
    /// Set the visibility mode of a view
    Visibility {
        view: u32,
        /// always-visible, auto-hide, dodge-active, dodge-maximized,
        /// dodge-all-windows, windows-go-below, windows-can-cover,
        /// windows-always-cover or sidebar
        mode: String,
    },
    /// Show or hide the view on a screen edge
    Toggle {
        screen: i32,
        /// top, bottom, left or right
        edge: String,
    },
    /// Move a view to another screen edge
    Edge { view: u32, edge: String },
    /// Move a view to a screen id, or "primary" to follow the primary screen
    Screen { view: u32, screen: String },
    /// Tell the daemon the current activity
    Activity { name: String },
    /// Recompute the geometry of every view
    Sync,
    /// Save layouts, settings and the screen pool
    Save,
    /// Reload settings.json
    ReloadConfig,
    /// Report a connected output
    ScreenAdd {
        /// Connector name, e.g. HDMI-A-1
        name: String,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// Report a disconnected output
    ScreenRemove { name: String },
    /// Report the primary output
    Primary { name: String },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("raven_dock=info".parse()?)
                .add_directive("raven_dock_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let cmd = match cli.command {
        Some(Command::Daemon) | None => {
            info!("Starting Raven Dock daemon");
            return daemon::run();
        }
        Some(Command::Status) => "status".to_string(),
        Some(Command::Layouts) => "layouts".to_string(),
        Some(Command::SwitchLayout { name }) => format!("switch-layout {}", name),
        Some(Command::Visibility { view, mode }) => format!("visibility {} {}", view, mode),
        Some(Command::Toggle { screen, edge }) => format!("toggle {} {}", screen, edge),
        Some(Command::Edge { view, edge }) => format!("edge {} {}", view, edge),
        Some(Command::Screen { view, screen }) => format!("screen {} {}", view, screen),
        Some(Command::Activity { name }) => format!("activity {}", name),
        Some(Command::Sync) => "sync".to_string(),
        Some(Command::Save) => "save".to_string(),
        Some(Command::ReloadConfig) => "reload-config".to_string(),
        Some(Command::ScreenAdd {
            name,
            x,
            y,
            width,
            height,
        }) => format!("screen-add {} {} {} {} {}", name, x, y, width, height),
        Some(Command::ScreenRemove { name }) => format!("screen-remove {}", name),
        Some(Command::Primary { name }) => format!("primary {}", name),
    };

    ipc::send(&cmd)
}
