//! Useless mode: every new tab gets its own, slightly smaller window until
//! the windows get too small, at which point a burst of junk popups fires.
//!
//! # Shrink / burst
//!
//! [`ShrinkState`] holds the size of the last spawned window.  While that
//! size is above the floor, each triggering tab is detached into a window
//! one ratio step smaller (`⌊base · ratio^k⌋`) at a jittered position.  The
//! first tab that finds the size at or below the floor resets it to the
//! base size and runs a burst instead:
//!
//! 1. the triggering tab gets a base-size window,
//! 2. `burst_size` popups loading the filler page appear one by one at
//!    random sizes and positions, each recorded in the junk registry,
//! 3. one camera window opens.
//!
//! # Re-entrancy
//!
//! A burst creates tabs, and the browser reports every created tab back as
//! a `tab_created` command.  [`SpawnGuard`] drops those: every event while
//! a burst is running, and afterwards any event for a tab the burst itself
//! opened.

use crate::camera::camera_bounds;
use crate::command::{Bounds, CreateWindow, Outcome, TabId, TabInfo, WindowKind, WindowUpdate};
use crate::config::{ChaosConfig, Config, PageConfig};
use crate::dispatcher::DispatchError;
use crate::pause;
use crate::store::Store;
use crate::traits::WindowHost;
use crate::workarea::primary_work_area;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// What one triggering tab does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosStep {
    /// Detach the tab into a window of this size.
    Shrink { width: u32, height: u32 },
    /// Size was reset; spawn the junk burst.
    Burst,
}

/// Size of the most recently spawned chaos window.
///
/// The size after `k` shrink steps is `⌊base · ratio^k⌋`, computed from the
/// base each time so rounding never accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkState {
    steps: u32,
    width: u32,
    height: u32,
}

impl ShrinkState {
    /// Start at the base size.
    pub fn new(config: &ChaosConfig) -> Self {
        Self {
            steps: 0,
            width: config.base_width,
            height: config.base_height,
        }
    }

    /// Current `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn reset(&mut self, config: &ChaosConfig) {
        *self = Self::new(config);
    }

    /// Advance by one triggering tab.
    ///
    /// While the current width is above `floor_width` the window shrinks.
    /// Once it is at or below the floor the state resets to the base size
    /// and a burst is reported instead.
    pub fn step(&mut self, config: &ChaosConfig) -> ChaosStep {
        if self.width <= config.floor_width || self.height == 0 {
            self.reset(config);
            return ChaosStep::Burst;
        }
        self.steps += 1;
        self.width = scaled(config.base_width, config.shrink_ratio, self.steps);
        self.height = scaled(config.base_height, config.shrink_ratio, self.steps);
        ChaosStep::Shrink {
            width: self.width,
            height: self.height,
        }
    }
}

/// `⌊base · ratio^steps⌋`, tolerant of values like `810.0000000000001` or
/// `809.9999999999999` that should be exactly 810.
fn scaled(base: u32, ratio: f64, steps: u32) -> u32 {
    let exact = base as f64 * ratio.powi(steps as i32);
    (exact + 1e-6).floor() as u32
}

/// Whether a burst is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Idle,
    Bursting,
}

/// Re-entrancy guard for the burst.
///
/// Not a lock: a trigger that arrives while bursting is dropped, not queued.
#[derive(Debug, Default)]
pub struct SpawnGuard {
    state: GuardState,
    spawned: HashSet<TabId>,
}

impl SpawnGuard {
    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_bursting(&self) -> bool {
        self.state == GuardState::Bursting
    }

    /// Move to `Bursting`.  Returns `false` (and changes nothing) if a burst
    /// is already running.
    pub fn try_enter(&mut self) -> bool {
        if self.is_bursting() {
            return false;
        }
        self.state = GuardState::Bursting;
        true
    }

    pub fn release(&mut self) {
        self.state = GuardState::Idle;
    }

    /// Remember a tab opened by the burst so its creation event is dropped.
    pub fn remember(&mut self, tab: TabId) {
        self.spawned.insert(tab);
    }

    /// Number of burst tabs whose creation event has not been seen yet.
    pub fn remembered(&self) -> usize {
        self.spawned.len()
    }

    /// Drop every remembered tab.
    pub fn forget_all(&mut self) {
        self.spawned.clear();
    }

    /// Whether a `tab_created` event for `tab` must be ignored.
    ///
    /// Remembered tabs are forgotten once their event has been seen.
    pub fn should_ignore(&mut self, tab: TabId) -> bool {
        self.is_bursting() || self.spawned.remove(&tab)
    }
}

/// Shrink/burst state plus everything needed to act on it.
pub struct ChaosEngine {
    config: ChaosConfig,
    pages: PageConfig,
    fallback: Bounds,
    shrink: ShrinkState,
    guard: SpawnGuard,
    rng: StdRng,
}

impl ChaosEngine {
    pub fn new(config: &Config) -> Self {
        let rng = match config.chaos.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config: config.chaos.clone(),
            pages: config.pages.clone(),
            fallback: config.layout.fallback_work_area,
            shrink: ShrinkState::new(&config.chaos),
            guard: SpawnGuard::default(),
            rng,
        }
    }

    pub fn shrink_state(&self) -> &ShrinkState {
        &self.shrink
    }

    pub fn guard(&self) -> &SpawnGuard {
        &self.guard
    }

    /// Back to the base size (after chaos is cleared).
    ///
    /// Burst tabs whose creation event never arrived are forgotten too.
    pub fn reset(&mut self) {
        self.shrink.reset(&self.config);
        self.guard.forget_all();
    }

    /// React to a tab the browser just created.
    ///
    /// Only acts in [`Mode::Useless`](crate::command::Mode::Useless), and
    /// never on tabs the burst opened itself.
    pub fn on_tab_created<H: WindowHost, S: Store>(
        &mut self,
        host: &H,
        store: &mut S,
        tab: &TabInfo,
    ) -> Result<Outcome, DispatchError> {
        if self.guard.should_ignore(tab.id) {
            debug!("ignoring tab {} created by a burst", tab.id);
            return Ok(Outcome::Skipped("tab created by a burst"));
        }
        if store.mode()? != crate::command::Mode::Useless {
            return Ok(Outcome::Skipped("not in useless mode"));
        }
        self.apply(host, store, tab.id).map(|(outcome, _)| outcome)
    }

    /// Run the step over every tab already open in a normal window, one at
    /// a time, stopping as soon as a burst has run.
    pub fn trigger_immediate<H: WindowHost, S: Store>(
        &mut self,
        host: &H,
        store: &mut S,
    ) -> Result<Outcome, DispatchError> {
        let windows = host.windows().map_err(DispatchError::host)?;
        let tabs: Vec<TabId> = windows
            .iter()
            .filter(|w| w.kind == WindowKind::Normal)
            .flat_map(|w| w.tabs.iter().map(|t| t.id))
            .collect();
        if tabs.is_empty() {
            return Ok(Outcome::Skipped("no open tabs"));
        }

        info!("dealing {} tab(s) into chaos", tabs.len());
        let mut outcome = Outcome::Done;
        for (i, tab) in tabs.iter().enumerate() {
            if self.guard.is_bursting() {
                break;
            }
            let (step_outcome, step) = self.apply(host, store, *tab)?;
            outcome = outcome.merge(step_outcome);
            if step == ChaosStep::Burst {
                debug!("burst ran, leaving {} tab(s) alone", tabs.len() - i - 1);
                break;
            }
            if i + 1 < tabs.len() {
                pause(self.config.deal_delay_ms);
            }
        }
        Ok(outcome)
    }

    /// Move every registered junk window so it is centered on the
    /// normalized point `(x, y)`, cascading them slightly.
    ///
    /// `x` is mirrored, matching the mirrored camera preview.
    pub fn follow_pointer<H: WindowHost, S: Store>(
        &self,
        host: &H,
        store: &S,
        x: f64,
        y: f64,
    ) -> Result<Outcome, DispatchError> {
        let junk = store.junk_windows()?;
        if junk.is_empty() {
            return Ok(Outcome::Skipped("no junk windows"));
        }
        let windows = host.windows().map_err(DispatchError::host)?;
        let area = primary_work_area(host, self.fallback);
        let px = area.left + ((1.0 - x.clamp(0.0, 1.0)) * area.width as f64) as i32;
        let py = area.top + (y.clamp(0.0, 1.0) * area.height as f64) as i32;

        let mut failed = 0;
        let mut attempted = 0;
        let targets = junk
            .iter()
            .filter_map(|id| windows.iter().find(|w| w.id == *id))
            .filter(|w| !w.hosts(&self.pages.camera));
        for (i, w) in targets.enumerate() {
            let cascade = i as i32 * self.config.follow_cascade;
            let left = clamp_axis(
                px - (w.bounds.width / 2) as i32 + cascade,
                w.bounds.width,
                area.left,
                area.width,
            );
            let top = clamp_axis(
                py - (w.bounds.height / 2) as i32 + cascade,
                w.bounds.height,
                area.top,
                area.height,
            );
            attempted += 1;
            if let Err(e) = host.update_window(w.id, &WindowUpdate::move_to(left, top)) {
                debug!("junk window {} did not follow: {}", w.id, e);
                failed += 1;
            }
        }
        Ok(Outcome::from_counts(failed, attempted))
    }

    /// One shrink-or-burst step for `tab`.
    fn apply<H: WindowHost, S: Store>(
        &mut self,
        host: &H,
        store: &mut S,
        tab: TabId,
    ) -> Result<(Outcome, ChaosStep), DispatchError> {
        let area = primary_work_area(host, self.fallback);
        let step = self.shrink.step(&self.config);
        let outcome = match step {
            ChaosStep::Shrink { width, height } => {
                let bounds = self.jittered(area, width, height);
                debug!("tab {} shrinks to {}x{}", tab, width, height);
                match host.create_window(&CreateWindow::from_tab(tab, bounds).focused()) {
                    Ok(_) => Outcome::Done,
                    Err(e) => {
                        warn!("tab detach failed (likely already closed): {}", e);
                        Outcome::from_counts(1, 1)
                    }
                }
            }
            ChaosStep::Burst => {
                if !self.guard.try_enter() {
                    return Ok((Outcome::Skipped("burst already running"), step));
                }
                let result = self.burst(host, store, tab, area);
                self.guard.release();
                result?
            }
        };
        Ok((outcome, step))
    }

    fn burst<H: WindowHost, S: Store>(
        &mut self,
        host: &H,
        store: &mut S,
        tab: TabId,
        area: Bounds,
    ) -> Result<Outcome, DispatchError> {
        info!("burst: spawning {} junk window(s)", self.config.burst_size);
        let mut failed = 0;
        let mut attempted = 1;

        let (base_w, base_h) = self.shrink.size();
        let bounds = self.jittered(area, base_w, base_h);
        if let Err(e) = host.create_window(&CreateWindow::from_tab(tab, bounds).focused()) {
            warn!("tab detach failed (likely already closed): {}", e);
            failed += 1;
        }

        let mut registry = store.junk_windows()?;
        for i in 0..self.config.burst_size {
            let bounds = self.junk_bounds(area);
            let spec = CreateWindow::from_url(self.pages.filler.clone(), bounds)
                .popup()
                .focused();
            attempted += 1;
            match host.create_window(&spec) {
                Ok(window) => {
                    for t in &window.tabs {
                        self.guard.remember(t.id);
                    }
                    registry.push(window.id);
                    if let Err(e) = store.set_junk_windows(&registry) {
                        warn!("could not record junk window {}: {}", window.id, e);
                        failed += 1;
                    }
                }
                Err(e) => {
                    warn!("junk window {} of {} failed: {}", i + 1, self.config.burst_size, e);
                    failed += 1;
                }
            }
            if i + 1 < self.config.burst_size {
                pause(self.config.spawn_delay_ms);
            }
        }

        attempted += 1;
        let spec = CreateWindow::from_url(self.pages.camera.clone(), camera_bounds(area, &self.pages))
            .focused();
        match host.create_window(&spec) {
            Ok(window) => {
                for t in &window.tabs {
                    self.guard.remember(t.id);
                }
            }
            Err(e) => {
                warn!("could not open camera window: {}", e);
                failed += 1;
            }
        }

        Ok(Outcome::from_counts(failed, attempted))
    }

    fn jittered(&mut self, area: Bounds, width: u32, height: u32) -> Bounds {
        let offset = self.config.jitter_offset as i32;
        Bounds {
            left: area.left + offset + roll(&mut self.rng, 0, self.config.jitter_x) as i32,
            top: area.top + offset + roll(&mut self.rng, 0, self.config.jitter_y) as i32,
            width,
            height,
        }
    }

    fn junk_bounds(&mut self, area: Bounds) -> Bounds {
        let c = &self.config;
        let (min_w, max_w, min_h, max_h) =
            (c.burst_min_width, c.burst_max_width, c.burst_min_height, c.burst_max_height);
        let (spread_x, spread_y) = (c.burst_spread_x, c.burst_spread_y);
        Bounds {
            left: area.left + roll(&mut self.rng, 0, spread_x) as i32,
            top: area.top + roll(&mut self.rng, 0, spread_y) as i32,
            width: roll(&mut self.rng, min_w, max_w),
            height: roll(&mut self.rng, min_h, max_h),
        }
    }
}

/// Uniform draw from `[low, high)`; `low` when the range is empty.
fn roll(rng: &mut StdRng, low: u32, high: u32) -> u32 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..high)
    }
}

/// Keep a window of `size` inside `[start, start + extent)` on one axis.
fn clamp_axis(pos: i32, size: u32, start: i32, extent: u32) -> i32 {
    let max = start + extent as i32 - size as i32;
    pos.min(max).max(start)
}

//  Tests
