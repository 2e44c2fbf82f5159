//! Cleanup: merge every tab into one window, and close the junk windows a
//! burst left behind.

use crate::command::{Outcome, Trigger, WindowId, WindowInfo, WindowKind, WindowState, WindowUpdate};
use crate::config::PageConfig;
use crate::dispatcher::DispatchError;
use crate::pause;
use crate::store::Store;
use crate::traits::WindowHost;
use log::{debug, info, warn};

/// Move every tab of every other normal window to the end of `target`, then
/// focus and maximize it.
///
/// Without a target the focused normal window is used, or the first one.
pub fn collapse_tabs<H: WindowHost>(
    host: &H,
    target: Option<WindowId>,
) -> Result<Outcome, DispatchError> {
    let windows = host.windows().map_err(DispatchError::host)?;
    let normal: Vec<&WindowInfo> = windows
        .iter()
        .filter(|w| w.kind == WindowKind::Normal)
        .collect();
    let target = match target.or_else(|| default_target(&normal)) {
        Some(id) => id,
        None => return Ok(Outcome::Skipped("no normal windows")),
    };

    let mut failed = 0;
    let mut attempted = 0;
    let tabs: Vec<_> = normal
        .iter()
        .filter(|w| w.id != target)
        .flat_map(|w| w.tabs.iter().map(|t| t.id))
        .collect();
    info!("collapsing {} tab(s) into window {}", tabs.len(), target);
    for tab in tabs {
        attempted += 1;
        if let Err(e) = host.move_tab(tab, target) {
            warn!("error moving tab {}: {}", tab, e);
            failed += 1;
        }
    }

    let updates = [
        WindowUpdate::state(WindowState::Normal).focus(),
        WindowUpdate::state(WindowState::Maximized),
    ];
    for update in &updates {
        attempted += 1;
        if let Err(e) = host.update_window(target, update) {
            warn!("could not focus/maximize window {}: {}", target, e);
            failed += 1;
        }
    }

    Ok(Outcome::from_counts(failed, attempted))
}

fn default_target(normal: &[&WindowInfo]) -> Option<WindowId> {
    normal
        .iter()
        .find(|w| w.focused)
        .or_else(|| normal.first())
        .map(|w| w.id)
}

/// Close every registered junk window that is still open and not showing
/// the camera page, then empty the registry.
///
/// Windows that are not in the registry are never touched.  A gesture
/// trigger additionally collapses all tabs into the focused window and
/// brings the camera tab back to the front.
pub fn clear_chaos<H: WindowHost, S: Store>(
    host: &H,
    store: &mut S,
    pages: &PageConfig,
    close_delay_ms: u64,
    trigger: Trigger,
) -> Result<Outcome, DispatchError> {
    let registry = store.junk_windows()?;
    let windows = host.windows().map_err(DispatchError::host)?;

    let to_close: Vec<WindowId> = registry
        .iter()
        .copied()
        .filter(|id| match windows.iter().find(|w| w.id == *id) {
            Some(w) if w.hosts(&pages.camera) => {
                debug!("keeping window {}: it hosts the camera", id);
                false
            }
            Some(_) => true,
            None => {
                debug!("junk window {} is already gone", id);
                false
            }
        })
        .collect();

    info!(
        "clearing chaos: closing {} of {} registered window(s)",
        to_close.len(),
        registry.len()
    );
    let mut failed = 0;
    for (i, id) in to_close.iter().enumerate() {
        if let Err(e) = host.remove_window(*id) {
            warn!("could not close window {}: {}", id, e);
            failed += 1;
        }
        if i + 1 < to_close.len() {
            pause(close_delay_ms);
        }
    }
    store.set_junk_windows(&[])?;

    let mut outcome = Outcome::from_counts(failed, to_close.len());
    if trigger == Trigger::Gesture {
        outcome = outcome.merge(collapse_tabs(host, None)?);
        outcome = outcome.merge(refocus_camera(host, pages)?);
    }
    Ok(outcome)
}

/// Activate the tab showing the camera page, if there is one.
fn refocus_camera<H: WindowHost>(host: &H, pages: &PageConfig) -> Result<Outcome, DispatchError> {
    let windows = host.windows().map_err(DispatchError::host)?;
    let camera = windows
        .iter()
        .flat_map(|w| w.tabs.iter())
        .find(|t| t.shows(&pages.camera));
    match camera {
        Some(tab) => match host.activate_tab(tab.id) {
            Ok(()) => Ok(Outcome::Done),
            Err(e) => {
                warn!("could not re-activate camera tab {}: {}", tab.id, e);
                Ok(Outcome::from_counts(1, 1))
            }
        },
        None => Ok(Outcome::Skipped("no camera tab")),
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Bounds;
    use crate::host::memory::MemoryHost;
    use crate::store::MemoryStore;

    fn b() -> Bounds {
        Bounds::new(20, 20, 600, 400)
    }

    #[test]
    fn collapse_into_target_and_maximize() {
        let host = MemoryHost::new();
        let a = host.add_window(b(), &["a1", "a2"]);
        let c = host.add_window(b(), &["c1"]);
        let d = host.add_window(b(), &["d1", "d2", "d3"]);

        let outcome = collapse_tabs(&host, Some(a)).unwrap();
        assert_eq!(outcome, Outcome::Done);

        let win = host.window(a).unwrap();
        assert_eq!(win.tabs.len(), 6);
        assert!(win.focused);
        assert_eq!(win.state, WindowState::Maximized);
        assert!(host.window(c).is_none());
        assert!(host.window(d).is_none());
        let urls: Vec<_> = win.tabs.iter().filter_map(|t| t.url.clone()).collect();
        assert_eq!(urls, vec!["a1", "a2", "c1", "d1", "d2", "d3"]);
    }

    #[test]
    fn collapse_defaults_to_focused_window() {
        let host = MemoryHost::new();
        host.add_window(b(), &["a1"]);
        let c = host.add_window(b(), &["c1"]);
        host.set_focused(c);

        collapse_tabs(&host, None).unwrap();
        assert_eq!(host.window(c).unwrap().tabs.len(), 2);
    }

    #[test]
    fn collapse_skips_failing_tabs() {
        let host = MemoryHost::new();
        let a = host.add_window(b(), &["a1"]);
        let c = host.add_window(b(), &["c1", "c2"]);
        let c1 = host.window(c).unwrap().tabs[0].id;
        host.fail_tab(c1);

        let outcome = collapse_tabs(&host, Some(a)).unwrap();
        assert_eq!(outcome, Outcome::Partial { failed: 1, attempted: 4 });
        assert_eq!(host.window(a).unwrap().tabs.len(), 2);
        assert_eq!(host.window(c).unwrap().tabs.len(), 1);
    }

    #[test]
    fn collapse_without_windows_is_skipped() {
        let host = MemoryHost::new();
        assert_eq!(
            collapse_tabs(&host, None).unwrap(),
            Outcome::Skipped("no normal windows")
        );
    }

    #[test]
    fn clear_chaos_closes_only_registered_non_camera_windows() {
        let host = MemoryHost::new();
        let user = host.add_window(b(), &["https://work.example"]);
        let junk1 = host.add_popup(b(), &["gif.html"]);
        let junk2 = host.add_popup(b(), &["gif.html"]);
        let camera = host.add_window(b(), &["chrome-extension://x/camera.html"]);
        let unregistered = host.add_popup(b(), &["gif.html"]);
        let mut store = MemoryStore::new();
        store.set_junk_windows(&[junk1, camera, 999, junk2]).unwrap();

        let outcome =
            clear_chaos(&host, &mut store, &PageConfig::default(), 0, Trigger::Popup).unwrap();
        assert_eq!(outcome, Outcome::Done);

        assert_eq!(host.removed(), vec![junk1, junk2]);
        assert!(host.window(user).is_some());
        assert!(host.window(camera).is_some());
        assert!(host.window(unregistered).is_some());
        assert!(store.junk_windows().unwrap().is_empty());
    }

    #[test]
    fn clear_chaos_continues_past_failures() {
        let host = MemoryHost::new();
        let junk1 = host.add_popup(b(), &["gif.html"]);
        let junk2 = host.add_popup(b(), &["gif.html"]);
        host.fail_window(junk1);
        let mut store = MemoryStore::new();
        store.set_junk_windows(&[junk1, junk2]).unwrap();

        let outcome =
            clear_chaos(&host, &mut store, &PageConfig::default(), 0, Trigger::Popup).unwrap();
        assert_eq!(outcome, Outcome::Partial { failed: 1, attempted: 2 });
        assert_eq!(host.removed(), vec![junk2]);
        assert!(store.junk_windows().unwrap().is_empty());
    }

    #[test]
    fn gesture_clear_collapses_and_refocuses_camera() {
        let host = MemoryHost::new();
        let main = host.add_window(b(), &["a", "b"]);
        let camera = host.add_window(b(), &["camera.html"]);
        let other = host.add_window(b(), &["c"]);
        let junk = host.add_popup(b(), &["gif.html"]);
        host.set_focused(main);
        let mut store = MemoryStore::new();
        store.set_junk_windows(&[junk]).unwrap();

        clear_chaos(&host, &mut store, &PageConfig::default(), 0, Trigger::Gesture).unwrap();

        assert!(host.window(junk).is_none());
        assert!(host.window(camera).is_none());
        assert!(host.window(other).is_none());
        let main = host.window(main).unwrap();
        assert_eq!(main.tabs.len(), 4);
        assert_eq!(main.state, WindowState::Maximized);
        let active: Vec<_> = main.tabs.iter().filter(|t| t.active).collect();
        assert_eq!(active.len(), 1);
        assert!(active[0].shows("camera.html"));
    }
}
