use parking_lot::RwLock;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use raven_dock_core::services::read_settings;
use raven_dock_core::{ConfigPaths, DockEvent, DockStatus, ServiceHub};

use crate::ipc::{self, Request};

/// What a connection handler needs from the hub
#[derive(Clone)]
struct IpcContext {
    events: async_channel::Sender<DockEvent>,
    status: Arc<RwLock<DockStatus>>,
    paths: ConfigPaths,
}

/// Run the dock daemon
pub fn run() -> anyhow::Result<()> {
    info!("Initializing Raven Dock daemon");

    let paths = ConfigPaths::new();
    let services = ServiceHub::new(paths.clone())?;

    let ctx = IpcContext {
        events: services.event_sender(),
        status: services.status_handle(),
        paths,
    };
    let commands = services.command_receiver();

    services.runtime().block_on(async move {
        // No renderer attached yet; commands are only logged
        tokio::spawn(async move {
            while let Ok(command) = commands.recv().await {
                info!("Dock command: {:?}", command);
            }
        });

        serve(ctx).await
    })
}

async fn serve(ctx: IpcContext) -> anyhow::Result<()> {
    let path = ipc::socket_path();
    if path.exists() {
        debug!("Removing stale socket {:?}", path);
        tokio::fs::remove_file(&path).await?;
    }

    let listener = UnixListener::bind(&path)?;
    info!("Listening on {:?}", path);

    loop {
        let (stream, _) = listener.accept().await?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, ctx).await {
                warn!("IPC connection error: {}", e);
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, ctx: IpcContext) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await?;

    let response = match ipc::parse_request(&line) {
        Ok(request) => respond(request, &ctx).await,
        Err(e) => format!("error: {}", e),
    };

    writer.write_all(response.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.shutdown().await?;
    Ok(())
}

async fn respond(request: Request, ctx: &IpcContext) -> String {
    match request {
        Request::Status => {
            let status = ctx.status.read().clone();
            serde_json::to_string_pretty(&status).unwrap_or_else(|e| format!("error: {}", e))
        }
        Request::Layouts => {
            let status = ctx.status.read().clone();
            status
                .loaded_layouts
                .iter()
                .map(|name| {
                    let current = status.current_layouts.contains(name);
                    format!("{}{}", if current { "* " } else { "  " }, name)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Request::ReloadConfig => match read_settings(&ctx.paths).await {
            Some(settings) => forward(ctx, DockEvent::SettingsReloaded(settings)).await,
            None => format!("error: could not read {:?}", ctx.paths.settings),
        },
        Request::Event(event) => forward(ctx, event).await,
    }
}

async fn forward(ctx: &IpcContext, event: DockEvent) -> String {
    match ctx.events.send(event).await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            error!("Dock service is gone: {}", e);
            "error: dock service is not running".to_string()
        }
    }
}
