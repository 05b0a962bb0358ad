use serde::{Deserialize, Serialize};

/// Stable screen identifier handed out by the screen registry
pub type ScreenId = i32;

/// View identity: the id of the containment the view renders
pub type ViewId = u32;

/// Window identifier as reported by the window system
pub type WindowId = u64;

/// Screen edge a view is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    pub fn is_vertical(&self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }

    pub fn form_factor(&self) -> FormFactor {
        if self.is_vertical() {
            FormFactor::Vertical
        } else {
            FormFactor::Horizontal
        }
    }

    /// Parse from string (for IPC commands)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactor {
    Horizontal,
    Vertical,
}

/// Alignment of a view along its edge.
///
/// `Left`/`Right` apply to horizontal views, `Top`/`Bottom` to vertical ones.
/// An alignment that doesn't fit the form factor behaves like `Center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
    Top,
    Bottom,
    Justify,
}

/// Visibility policy of a view.
///
/// `None` and `NormalWindow` are sentinels: they never occupy screen space
/// and can never be set as the active mode of a visibility manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityMode {
    None,
    NormalWindow,
    AlwaysVisible,
    AutoHide,
    #[default]
    DodgeActive,
    DodgeMaximized,
    DodgeAllWindows,
    WindowsGoBelow,
    WindowsCanCover,
    WindowsAlwaysCover,
    SideBar,
}

impl VisibilityMode {
    /// Parse from string (for IPC commands)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always-visible" | "always" => Some(Self::AlwaysVisible),
            "auto-hide" | "autohide" => Some(Self::AutoHide),
            "dodge-active" => Some(Self::DodgeActive),
            "dodge-maximized" => Some(Self::DodgeMaximized),
            "dodge-all-windows" | "dodge-all" => Some(Self::DodgeAllWindows),
            "windows-go-below" => Some(Self::WindowsGoBelow),
            "windows-can-cover" => Some(Self::WindowsCanCover),
            "windows-always-cover" => Some(Self::WindowsAlwaysCover),
            "sidebar" | "side-bar" => Some(Self::SideBar),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NormalWindow => "normal-window",
            Self::AlwaysVisible => "always-visible",
            Self::AutoHide => "auto-hide",
            Self::DodgeActive => "dodge-active",
            Self::DodgeMaximized => "dodge-maximized",
            Self::DodgeAllWindows => "dodge-all-windows",
            Self::WindowsGoBelow => "windows-go-below",
            Self::WindowsCanCover => "windows-can-cover",
            Self::WindowsAlwaysCover => "windows-always-cover",
            Self::SideBar => "sidebar",
        }
    }

    /// Sentinels are never valid as an active mode
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::None | Self::NormalWindow)
    }

    /// Modes that hide the view with a sliding animation
    pub fn is_dodge(&self) -> bool {
        matches!(
            self,
            Self::DodgeActive | Self::DodgeMaximized | Self::DodgeAllWindows
        )
    }
}

/// How layouts are kept in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryUsage {
    /// One layout is loaded and current at a time
    #[default]
    Single,
    /// Layouts are loaded per activity, one current per activity
    Multiple,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_factor_follows_edge() {
        assert_eq!(Edge::Top.form_factor(), FormFactor::Horizontal);
        assert_eq!(Edge::Bottom.form_factor(), FormFactor::Horizontal);
        assert_eq!(Edge::Left.form_factor(), FormFactor::Vertical);
        assert_eq!(Edge::Right.form_factor(), FormFactor::Vertical);
    }

    #[test]
    fn test_visibility_mode_parse() {
        assert_eq!(VisibilityMode::from_str("Auto-Hide"), Some(VisibilityMode::AutoHide));
        assert_eq!(VisibilityMode::from_str("none"), None);
        assert!(!VisibilityMode::NormalWindow.is_valid());

        let json = serde_json::to_string(&VisibilityMode::WindowsCanCover).unwrap();
        assert_eq!(json, "\"windows-can-cover\"");
    }
}
