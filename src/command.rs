//! Commands and types used throughout tabtangle.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action the dispatcher can perform, and
//! [`Bounds`] / [`WindowInfo`] / [`TabInfo`] / [`GestureFrame`] provide the
//! supporting data types.
//!
//! Commands are tagged by an `action` field so that the browser extension
//! can send the same objects it would pass to `runtime.sendMessage`:
//!
//! ```json
//! {"action":"organize_windows"}
//! {"action":"collapse_tabs","targetWindowId":3,"trigger":"popup"}
//! {"action":"CLEAR_CHAOS","trigger":"gesture"}
//! {"action":"update_finger_position","x":0.4,"y":0.2}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser window identifier.
pub type WindowId = i64;

/// Browser tab identifier.
pub type TabId = i64;

/// Which behavior new tabs get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    None,
    /// Grid tiling.
    Useful,
    /// Shrinking scatter ending in a burst.
    Useless,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::None => write!(f, "none"),
            Mode::Useful => write!(f, "useful"),
            Mode::Useless => write!(f, "useless"),
        }
    }
}

/// Where a command originated.  Gesture-triggered clears do extra work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Popup,
    Gesture,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Popup => write!(f, "popup"),
            Trigger::Gesture => write!(f, "gesture"),
        }
    }
}

/// A screen rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Display state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

impl WindowState {
    /// Whether the host window manager controls the geometry in this state.
    pub fn is_expanded(self) -> bool {
        matches!(self, WindowState::Maximized | WindowState::Fullscreen)
    }
}

/// Browser window type.  Only normal windows are tiled or collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Normal,
    Popup,
}

/// One open tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    /// Whether this tab has `page` loaded (substring match on the URL).
    pub fn shows(&self, page: &str) -> bool {
        self.url.as_deref().is_some_and(|u| u.contains(page))
    }
}

/// One open window as reported by the host, always with its tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub bounds: Bounds,
    #[serde(default)]
    pub state: WindowState,
    #[serde(default)]
    pub kind: WindowKind,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

impl WindowInfo {
    /// Whether any tab in this window has `page` loaded.
    pub fn hosts(&self, page: &str) -> bool {
        self.tabs.iter().any(|t| t.shows(page))
    }
}

/// A physical display and its usable area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    #[serde(default)]
    pub is_primary: bool,
    pub work_area: Bounds,
}

/// What a newly created window shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowSource {
    /// Detach an existing tab into the new window.
    Tab(TabId),
    /// Open a fresh tab loading this URL.
    Url(String),
}

/// Parameters for creating a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWindow {
    pub source: WindowSource,
    pub bounds: Bounds,
    #[serde(default)]
    pub kind: WindowKind,
    #[serde(default)]
    pub focused: bool,
}

impl CreateWindow {
    pub fn from_tab(tab: TabId, bounds: Bounds) -> Self {
        Self {
            source: WindowSource::Tab(tab),
            bounds,
            kind: WindowKind::Normal,
            focused: false,
        }
    }

    pub fn from_url(url: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            source: WindowSource::Url(url.into()),
            bounds,
            kind: WindowKind::Normal,
            focused: false,
        }
    }

    pub fn popup(mut self) -> Self {
        self.kind = WindowKind::Popup;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

/// Partial update of a window.  `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<WindowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
}

impl WindowUpdate {
    /// Move and resize, forcing the normal state.
    pub fn place(bounds: Bounds) -> Self {
        Self {
            left: Some(bounds.left),
            top: Some(bounds.top),
            width: Some(bounds.width),
            height: Some(bounds.height),
            state: Some(WindowState::Normal),
            focused: None,
        }
    }

    /// Move without resizing.
    pub fn move_to(left: i32, top: i32) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            ..Self::default()
        }
    }

    pub fn state(state: WindowState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn focus(mut self) -> Self {
        self.focused = Some(true);
        self
    }
}

/// A normalized landmark point (`0.0..=1.0` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

/// One detected hand in a classifier frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandResult {
    /// Top gesture category name (e.g. `"Open_Palm"`).
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

/// The classifier output for one video frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureFrame {
    pub timestamp_ms: f64,
    #[serde(default)]
    pub hands: Vec<HandResult>,
}

/// Every action the dispatcher can perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and by the gesture state machine, and consumed by the
/// [`ActionDispatcher`](crate::dispatcher::ActionDispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    /// Tile every tab of every normal window into a grid.
    #[serde(rename = "organize_windows")]
    OrganizeWindows,

    /// Run the chaos step over every tab that is already open.
    #[serde(rename = "activate_useless_mode")]
    ActivateUselessMode,

    /// Merge every tab into one window and maximize it.
    #[serde(rename = "collapse_tabs", rename_all = "camelCase")]
    CollapseTabs {
        #[serde(default)]
        target_window_id: Option<WindowId>,
        #[serde(default)]
        trigger: Trigger,
    },

    /// Close every registered junk window except the camera.
    #[serde(rename = "CLEAR_CHAOS")]
    ClearChaos {
        #[serde(default)]
        trigger: Trigger,
    },

    /// Normalized fingertip position; junk windows follow it.
    #[serde(rename = "update_finger_position")]
    UpdateFingerPosition { x: f64, y: f64 },

    /// Persist the new-tab behavior.
    #[serde(rename = "set_mode")]
    SetMode { mode: Mode },

    /// Open the camera page centered in the work area.
    #[serde(rename = "open_camera")]
    OpenCamera,

    /// The browser created a tab.
    #[serde(rename = "tab_created")]
    TabCreated { tab: TabInfo },

    /// One frame of classifier output from the camera page.
    #[serde(rename = "gesture_frame")]
    GestureFrame { frame: GestureFrame },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::OrganizeWindows => write!(f, "organize_windows"),
            Command::ActivateUselessMode => write!(f, "activate_useless_mode"),
            Command::CollapseTabs { .. } => write!(f, "collapse_tabs"),
            Command::ClearChaos { .. } => write!(f, "clear_chaos"),
            Command::UpdateFingerPosition { .. } => write!(f, "update_finger_position"),
            Command::SetMode { mode } => write!(f, "set_mode {}", mode),
            Command::OpenCamera => write!(f, "open_camera"),
            Command::TabCreated { tab } => write!(f, "tab_created {}", tab.id),
            Command::GestureFrame { .. } => write!(f, "gesture_frame"),
        }
    }
}

/// How a command went.
///
/// Host rejections are not errors: they are counted and the command keeps
/// going with the remaining items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every host call succeeded.
    Done,
    /// Some host calls failed and were skipped.
    Partial { failed: usize, attempted: usize },
    /// Nothing was attempted.
    Skipped(&'static str),
}

impl Outcome {
    /// Build an outcome from a failure count.
    pub fn from_counts(failed: usize, attempted: usize) -> Self {
        if failed == 0 {
            Outcome::Done
        } else {
            Outcome::Partial { failed, attempted }
        }
    }

    /// Combine two outcomes of consecutive steps of the same command.
    pub fn merge(self, other: Outcome) -> Outcome {
        let counts = |o: &Outcome| match o {
            Outcome::Partial { failed, attempted } => (*failed, *attempted),
            _ => (0, 0),
        };
        match (&self, &other) {
            (Outcome::Skipped(_), _) => other,
            (_, Outcome::Skipped(_)) => self,
            _ => {
                let (f1, a1) = counts(&self);
                let (f2, a2) = counts(&other);
                Outcome::from_counts(f1 + f2, a1 + a2)
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => write!(f, "done"),
            Outcome::Partial { failed, attempted } => {
                write!(f, "partial ({} of {} host calls failed)", failed, attempted)
            }
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extension_messages() {
        let cmd: Command = serde_json::from_str(r#"{"action":"organize_windows"}"#).unwrap();
        assert_eq!(cmd, Command::OrganizeWindows);

        let cmd: Command =
            serde_json::from_str(r#"{"action":"collapse_tabs","targetWindowId":7,"trigger":"popup"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::CollapseTabs {
                target_window_id: Some(7),
                trigger: Trigger::Popup
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"action":"update_finger_position","x":0.25,"y":0.5}"#).unwrap();
        assert_eq!(cmd, Command::UpdateFingerPosition { x: 0.25, y: 0.5 });
    }

    #[test]
    fn clear_chaos_trigger_defaults_to_popup() {
        let cmd: Command = serde_json::from_str(r#"{"action":"CLEAR_CHAOS"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::ClearChaos {
                trigger: Trigger::Popup
            }
        );
        let cmd: Command =
            serde_json::from_str(r#"{"action":"CLEAR_CHAOS","trigger":"gesture"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::ClearChaos {
                trigger: Trigger::Gesture
            }
        );
    }

    #[test]
    fn collapse_without_target() {
        let cmd: Command = serde_json::from_str(r#"{"action":"collapse_tabs"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::CollapseTabs {
                target_window_id: None,
                trigger: Trigger::Popup
            }
        );
    }

    #[test]
    fn parses_tab_created_and_mode() {
        let cmd: Command = serde_json::from_str(
            r#"{"action":"tab_created","tab":{"id":12,"windowId":3,"url":"https://a.example"}}"#,
        )
        .unwrap();
        match cmd {
            Command::TabCreated { tab } => {
                assert_eq!(tab.id, 12);
                assert_eq!(tab.window_id, 3);
                assert!(!tab.active);
            }
            other => panic!("unexpected {:?}", other),
        }

        let cmd: Command =
            serde_json::from_str(r#"{"action":"set_mode","mode":"useless"}"#).unwrap();
        assert_eq!(cmd, Command::SetMode { mode: Mode::Useless });
    }

    #[test]
    fn parses_gesture_frame() {
        let json = r#"{"action":"gesture_frame","frame":{"timestampMs":16.5,
            "hands":[{"label":"Open_Palm","score":0.9,"landmarks":[{"x":0.1,"y":0.2,"z":0.0}]}]}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::GestureFrame { frame } => {
                assert_eq!(frame.timestamp_ms, 16.5);
                assert_eq!(frame.hands[0].label.as_deref(), Some("Open_Palm"));
                assert_eq!(frame.hands[0].landmarks[0], Landmark { x: 0.1, y: 0.2 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"action":"EXPLODE"}"#).is_err());
    }

    #[test]
    fn window_update_omits_untouched_fields() {
        let json = serde_json::to_value(WindowUpdate::state(WindowState::Maximized)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "maximized"}));
    }

    #[test]
    fn outcome_merge_sums_failures() {
        let a = Outcome::from_counts(1, 3);
        let b = Outcome::from_counts(2, 4);
        assert_eq!(a.merge(b), Outcome::Partial { failed: 3, attempted: 7 });
        assert_eq!(Outcome::Done.merge(Outcome::Skipped("x")), Outcome::Done);
        assert_eq!(Outcome::Skipped("x").merge(Outcome::Done), Outcome::Done);
        assert_eq!(Outcome::Done.merge(Outcome::Done), Outcome::Done);
    }

    #[test]
    fn tab_shows_page() {
        let tab = TabInfo {
            id: 1,
            window_id: 1,
            url: Some("chrome-extension://abc/camera.html".into()),
            active: true,
        };
        assert!(tab.shows("camera.html"));
        assert!(!tab.shows("gif.html"));
    }
}
