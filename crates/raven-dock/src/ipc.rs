use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use raven_dock_core::{DockEvent, Edge, Rect, ScreenId, ViewId, VisibilityMode};

/// Get the IPC socket path
pub fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("raven-dock.sock")
}

/// A parsed IPC line
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Status,
    Layouts,
    ReloadConfig,
    Event(DockEvent),
}

/// Parse one request line, e.g. `visibility 3 auto-hide`
pub fn parse_request(line: &str) -> anyhow::Result<Request> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        anyhow::bail!("Empty request");
    };
    let args: Vec<&str> = words.collect();

    let request = match (command, args.as_slice()) {
        ("status", []) => Request::Status,
        ("layouts", []) => Request::Layouts,
        ("reload-config", []) => Request::ReloadConfig,
        ("sync", []) => Request::Event(DockEvent::SyncGeometry),
        ("save", []) => Request::Event(DockEvent::SaveAll),

        // Layout names may contain spaces
        ("switch-layout", [_, ..]) => Request::Event(DockEvent::SwitchLayout(args.join(" ").into())),
        ("activity", [activity]) => Request::Event(DockEvent::ActivityChanged((*activity).into())),

        ("visibility", [view, mode]) => Request::Event(DockEvent::SetVisibilityMode {
            view: parse_view(view)?,
            mode: parse_mode(mode)?,
        }),
        ("toggle", [screen, edge]) => Request::Event(DockEvent::ToggleHiddenState {
            screen: parse_screen(screen)?,
            edge: parse_edge(edge)?,
        }),
        ("edge", [view, edge]) => Request::Event(DockEvent::SetViewEdge {
            view: parse_view(view)?,
            edge: parse_edge(edge)?,
        }),
        ("screen", [view, screen]) => Request::Event(DockEvent::SetViewScreen {
            view: parse_view(view)?,
            screen: match *screen {
                "primary" => None,
                id => Some(parse_screen(id)?),
            },
        }),

        ("screen-add", [name, x, y, width, height]) => {
            let geometry = Rect::new(x.parse()?, y.parse()?, width.parse()?, height.parse()?);
            Request::Event(DockEvent::ScreenAdded {
                name: (*name).into(),
                geometry,
                available_geometry: geometry,
            })
        }
        ("screen-remove", [name]) => Request::Event(DockEvent::ScreenRemoved { name: (*name).into() }),
        ("primary", [name]) => Request::Event(DockEvent::PrimaryScreenChanged { name: (*name).into() }),

        _ => anyhow::bail!("Unknown request: {}", line.trim()),
    };

    Ok(request)
}

fn parse_view(s: &str) -> anyhow::Result<ViewId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid view id: {}", s))
}

fn parse_screen(s: &str) -> anyhow::Result<ScreenId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid screen id: {}", s))
}

fn parse_edge(s: &str) -> anyhow::Result<Edge> {
    Edge::from_str(s).ok_or_else(|| anyhow::anyhow!("Unknown edge: {}", s))
}

fn parse_mode(s: &str) -> anyhow::Result<VisibilityMode> {
    VisibilityMode::from_str(s).ok_or_else(|| anyhow::anyhow!("Unknown visibility mode: {}", s))
}

/// Send a command to the daemon via IPC
fn send_command(cmd: &str) -> anyhow::Result<String> {
    let path = socket_path();

    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Raven Dock daemon is not running (socket not found at {:?})",
            path
        ));
    }

    let mut stream = UnixStream::connect(&path)?;
    stream.write_all(cmd.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;

    Ok(response)
}

/// Validate a request locally, send it and print the answer
pub fn send(cmd: &str) -> anyhow::Result<()> {
    parse_request(cmd)?;
    let response = send_command(cmd)?;
    println!("{}", response.trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queries() {
        assert_eq!(parse_request("status").unwrap(), Request::Status);
        assert_eq!(parse_request("  layouts \n").unwrap(), Request::Layouts);
        assert!(parse_request("").is_err());
        assert!(parse_request("status now").is_err());
    }

    #[test]
    fn test_parse_view_requests() {
        assert_eq!(
            parse_request("visibility 3 auto-hide").unwrap(),
            Request::Event(DockEvent::SetVisibilityMode {
                view: 3,
                mode: VisibilityMode::AutoHide
            })
        );
        assert_eq!(
            parse_request("screen 3 primary").unwrap(),
            Request::Event(DockEvent::SetViewScreen { view: 3, screen: None })
        );
        assert!(parse_request("visibility 3 sometimes").is_err());
        assert!(parse_request("edge three top").is_err());
    }

    #[test]
    fn test_parse_layout_with_spaces() {
        assert_eq!(
            parse_request("switch-layout My Layout").unwrap(),
            Request::Event(DockEvent::SwitchLayout("My Layout".into()))
        );
    }

    #[test]
    fn test_parse_screen_add() {
        let Request::Event(DockEvent::ScreenAdded { name, geometry, .. }) =
            parse_request("screen-add HDMI-1 1920 0 2560 1440").unwrap()
        else {
            panic!("expected a screen event");
        };
        assert_eq!(name, "HDMI-1");
        assert_eq!(geometry, Rect::new(1920, 0, 2560, 1440));
    }
}
