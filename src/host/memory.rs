//! In-memory [`WindowHost`] implementation.
//!
//! [`MemoryHost`] keeps a small desktop model (displays, windows, tabs) and
//! applies every call the way a browser would: detaching the last tab of a
//! window closes it, maximizing snaps to the work area, focusing one window
//! unfocuses the rest.  Individual windows, tabs or window creation can be
//! made to fail so callers' skip-and-continue behavior can be exercised.

use crate::command::{
    Bounds, CreateWindow, DisplayInfo, TabId, TabInfo, WindowId, WindowInfo, WindowKind,
    WindowSource, WindowState, WindowUpdate,
};
use crate::traits::WindowHost;
use log::debug;
use std::cell::RefCell;
use std::collections::HashSet;

/// Error returned by the simulated host.
#[derive(Debug, thiserror::Error)]
#[error("memory host error: {0}")]
pub struct MemoryHostError(String);

#[derive(Debug, Default)]
struct Desktop {
    displays: Vec<DisplayInfo>,
    windows: Vec<WindowInfo>,
    next_id: i64,
    /// Successful creations left before `create_window` starts failing.
    create_budget: Option<usize>,
    failing_windows: HashSet<WindowId>,
    failing_tabs: HashSet<TabId>,
    displays_fail: bool,
    /// Tabs opened by URL, in creation order.
    opened_tabs: Vec<TabId>,
    removed: Vec<WindowId>,
}

impl Desktop {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut WindowInfo, MemoryHostError> {
        self.windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| MemoryHostError(format!("no window with id {}", id)))
    }

    fn check_window(&self, id: WindowId) -> Result<(), MemoryHostError> {
        if self.failing_windows.contains(&id) {
            return Err(MemoryHostError(format!("window {} rejected the call", id)));
        }
        Ok(())
    }

    fn work_area(&self) -> Bounds {
        self.displays
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| self.displays.first())
            .map(|d| d.work_area)
            .unwrap_or_default()
    }

    fn focus(&mut self, id: WindowId) {
        for w in &mut self.windows {
            w.focused = w.id == id;
        }
    }

    /// Remove `tab` from whichever window holds it, closing that window if
    /// it becomes empty.
    fn take_tab(&mut self, tab: TabId) -> Result<TabInfo, MemoryHostError> {
        let pos = self
            .windows
            .iter()
            .position(|w| w.tabs.iter().any(|t| t.id == tab))
            .ok_or_else(|| MemoryHostError(format!("no tab with id {}", tab)))?;
        let window = &mut self.windows[pos];
        let idx = window.tabs.iter().position(|t| t.id == tab).unwrap_or(0);
        let taken = window.tabs.remove(idx);
        if window.tabs.is_empty() {
            self.windows.remove(pos);
        } else if taken.active {
            if let Some(first) = window.tabs.first_mut() {
                first.active = true;
            }
        }
        Ok(taken)
    }
}

/// A simulated browser desktop.
pub struct MemoryHost {
    inner: RefCell<Desktop>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// An empty desktop with one primary 1500×900 display.
    pub fn new() -> Self {
        Self::with_work_area(Bounds::new(0, 0, 1500, 900))
    }

    /// An empty desktop with one primary display of the given work area.
    pub fn with_work_area(work_area: Bounds) -> Self {
        Self {
            inner: RefCell::new(Desktop {
                displays: vec![DisplayInfo {
                    is_primary: true,
                    work_area,
                }],
                ..Desktop::default()
            }),
        }
    }

    /// Replace the display list.
    pub fn set_displays(&self, displays: Vec<DisplayInfo>) {
        self.inner.borrow_mut().displays = displays;
    }

    /// Add a normal window with one tab per URL; returns the window id.
    pub fn add_window(&self, bounds: Bounds, urls: &[&str]) -> WindowId {
        self.add(bounds, WindowKind::Normal, urls)
    }

    /// Add a popup window with one tab per URL; returns the window id.
    pub fn add_popup(&self, bounds: Bounds, urls: &[&str]) -> WindowId {
        self.add(bounds, WindowKind::Popup, urls)
    }

    fn add(&self, bounds: Bounds, kind: WindowKind, urls: &[&str]) -> WindowId {
        let mut d = self.inner.borrow_mut();
        let id = d.alloc_id();
        let mut tabs = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let tab_id = d.alloc_id();
            tabs.push(TabInfo {
                id: tab_id,
                window_id: id,
                url: Some(url.to_string()),
                active: i == 0,
            });
        }
        d.windows.push(WindowInfo {
            id,
            bounds,
            state: WindowState::Normal,
            kind,
            focused: false,
            tabs,
        });
        id
    }

    /// Snapshot of one window.
    pub fn window(&self, id: WindowId) -> Option<WindowInfo> {
        self.inner.borrow().windows.iter().find(|w| w.id == id).cloned()
    }

    /// Snapshot of every window.
    pub fn snapshot(&self) -> Vec<WindowInfo> {
        self.inner.borrow().windows.clone()
    }

    /// Set a window's state directly (as the user would).
    pub fn set_state(&self, id: WindowId, state: WindowState) {
        if let Ok(w) = self.inner.borrow_mut().window_mut(id) {
            w.state = state;
        }
    }

    /// Focus a window directly (as the user would).
    pub fn set_focused(&self, id: WindowId) {
        self.inner.borrow_mut().focus(id);
    }

    /// Let `n` more window creations succeed, then reject the rest.
    pub fn fail_creates_after(&self, n: usize) {
        self.inner.borrow_mut().create_budget = Some(n);
    }

    /// Reject every call that targets this window.
    pub fn fail_window(&self, id: WindowId) {
        self.inner.borrow_mut().failing_windows.insert(id);
    }

    /// Reject every move of this tab.
    pub fn fail_tab(&self, id: TabId) {
        self.inner.borrow_mut().failing_tabs.insert(id);
    }

    /// Make `displays` fail.
    pub fn fail_displays(&self) {
        self.inner.borrow_mut().displays_fail = true;
    }

    /// Tabs opened by URL, in creation order.
    pub fn opened_tabs(&self) -> Vec<TabId> {
        self.inner.borrow().opened_tabs.clone()
    }

    /// Windows closed through `remove_window`, in order.
    pub fn removed(&self) -> Vec<WindowId> {
        self.inner.borrow().removed.clone()
    }
}

impl WindowHost for MemoryHost {
    type Error = MemoryHostError;

    fn displays(&self) -> Result<Vec<DisplayInfo>, MemoryHostError> {
        let d = self.inner.borrow();
        if d.displays_fail {
            return Err(MemoryHostError("display query rejected".into()));
        }
        Ok(d.displays.clone())
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, MemoryHostError> {
        Ok(self.inner.borrow().windows.clone())
    }

    fn create_window(&self, spec: &CreateWindow) -> Result<WindowInfo, MemoryHostError> {
        let mut d = self.inner.borrow_mut();
        if let Some(n) = d.create_budget.as_mut() {
            if *n == 0 {
                return Err(MemoryHostError("window creation rejected".into()));
            }
            *n -= 1;
        }
        let tab = match &spec.source {
            WindowSource::Tab(tab) => {
                if d.failing_tabs.contains(tab) {
                    return Err(MemoryHostError(format!("tab {} rejected the call", tab)));
                }
                d.take_tab(*tab)?
            }
            WindowSource::Url(url) => {
                let id = d.alloc_id();
                d.opened_tabs.push(id);
                TabInfo {
                    id,
                    window_id: 0,
                    url: Some(url.clone()),
                    active: true,
                }
            }
        };
        let id = d.alloc_id();
        let window = WindowInfo {
            id,
            bounds: spec.bounds,
            state: WindowState::Normal,
            kind: spec.kind,
            focused: false,
            tabs: vec![TabInfo {
                window_id: id,
                active: true,
                ..tab
            }],
        };
        d.windows.push(window);
        if spec.focused {
            d.focus(id);
        }
        debug!("memory host: created window {}", id);
        d.window_mut(id).map(|w| w.clone())
    }

    fn update_window(&self, id: WindowId, update: &WindowUpdate) -> Result<(), MemoryHostError> {
        let mut d = self.inner.borrow_mut();
        d.check_window(id)?;
        let work_area = d.work_area();
        let w = d.window_mut(id)?;
        if let Some(left) = update.left {
            w.bounds.left = left;
        }
        if let Some(top) = update.top {
            w.bounds.top = top;
        }
        if let Some(width) = update.width {
            w.bounds.width = width;
        }
        if let Some(height) = update.height {
            w.bounds.height = height;
        }
        if let Some(state) = update.state {
            w.state = state;
            if state.is_expanded() {
                w.bounds = work_area;
            }
        }
        if update.focused == Some(true) {
            d.focus(id);
        }
        Ok(())
    }

    fn remove_window(&self, id: WindowId) -> Result<(), MemoryHostError> {
        let mut d = self.inner.borrow_mut();
        d.check_window(id)?;
        let pos = d
            .windows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| MemoryHostError(format!("no window with id {}", id)))?;
        d.windows.remove(pos);
        d.removed.push(id);
        Ok(())
    }

    fn move_tab(&self, tab: TabId, window: WindowId) -> Result<(), MemoryHostError> {
        let mut d = self.inner.borrow_mut();
        d.check_window(window)?;
        if d.failing_tabs.contains(&tab) {
            return Err(MemoryHostError(format!("tab {} rejected the call", tab)));
        }
        let target = d.window_mut(window)?;
        if let Some(idx) = target.tabs.iter().position(|t| t.id == tab) {
            let same = target.tabs.remove(idx);
            target.tabs.push(same);
            return Ok(());
        }
        let moved = d.take_tab(tab)?;
        d.window_mut(window)?.tabs.push(TabInfo {
            window_id: window,
            active: false,
            ..moved
        });
        Ok(())
    }

    fn activate_tab(&self, tab: TabId) -> Result<(), MemoryHostError> {
        let mut d = self.inner.borrow_mut();
        let window = d
            .windows
            .iter_mut()
            .find(|w| w.tabs.iter().any(|t| t.id == tab))
            .ok_or_else(|| MemoryHostError(format!("no tab with id {}", tab)))?;
        for t in &mut window.tabs {
            t.active = t.id == tab;
        }
        Ok(())
    }
}

//  Tests
