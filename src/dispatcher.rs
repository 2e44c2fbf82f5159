//! The orchestrator that routes [`Command`]s to the engines.
//!
//! [`ActionDispatcher`] owns the host, the store and all mutable engine
//! state (shrink size, spawn guard, stable gesture).  Commands are handled
//! one at a time, to completion, in the order they arrive.

use crate::camera::open_camera;
use crate::chaos::ChaosEngine;
use crate::collapse::{clear_chaos, collapse_tabs};
use crate::command::{Command, Outcome};
use crate::config::Config;
use crate::gesture::GestureStateMachine;
use crate::layout::organize_windows;
use crate::store::{Store, StoreError};
use crate::traits::WindowHost;
use crate::workarea::primary_work_area;
use log::{debug, info, warn};
use std::fmt;

/// A command that could not even begin.
///
/// Per-window or per-tab rejections are not errors; they are reported
/// through [`Outcome::Partial`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The host refused a call the command cannot do without.
    #[error("host error: {0}")]
    Host(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub fn host(e: impl fmt::Display) -> Self {
        DispatchError::Host(e.to_string())
    }
}

/// Routes commands to the layout, chaos, cleanup and gesture engines.
///
/// Generic over any [`WindowHost`] and [`Store`], so the same dispatcher
/// drives the browser bridge and the in-memory desktop.
pub struct ActionDispatcher<H: WindowHost, S: Store> {
    host: H,
    store: S,
    config: Config,
    chaos: ChaosEngine,
    gestures: GestureStateMachine,
}

impl<H: WindowHost, S: Store> ActionDispatcher<H, S> {
    pub fn new(host: H, store: S, config: Config) -> Self {
        Self {
            chaos: ChaosEngine::new(&config),
            gestures: GestureStateMachine::new(config.gestures.clone()),
            host,
            store,
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chaos(&self) -> &ChaosEngine {
        &self.chaos
    }

    /// Handle one command to completion.
    pub fn handle(&mut self, cmd: Command) -> Result<Outcome, DispatchError> {
        match cmd {
            Command::OrganizeWindows => {
                info!("organize windows");
                organize_windows(&self.host, &self.config.layout).map_err(DispatchError::host)
            }

            Command::ActivateUselessMode => {
                info!("activate useless mode");
                self.chaos.trigger_immediate(&self.host, &mut self.store)
            }

            Command::CollapseTabs {
                target_window_id,
                trigger,
            } => {
                info!("collapse tabs ({})", trigger);
                collapse_tabs(&self.host, target_window_id)
            }

            Command::ClearChaos { trigger } => {
                info!("clear chaos ({})", trigger);
                let outcome = clear_chaos(
                    &self.host,
                    &mut self.store,
                    &self.config.pages,
                    self.config.chaos.close_delay_ms,
                    trigger,
                );
                self.chaos.reset();
                outcome
            }

            Command::UpdateFingerPosition { x, y } => {
                self.chaos.follow_pointer(&self.host, &self.store, x, y)
            }

            Command::SetMode { mode } => {
                info!("mode is now {}", mode);
                self.store.set_mode(mode)?;
                Ok(Outcome::Done)
            }

            Command::OpenCamera => {
                let area = primary_work_area(&self.host, self.config.layout.fallback_work_area);
                open_camera(&self.host, &self.config.pages, area).map_err(DispatchError::host)
            }

            Command::TabCreated { tab } => {
                debug!("tab {} created in window {}", tab.id, tab.window_id);
                self.chaos.on_tab_created(&self.host, &mut self.store, &tab)
            }

            Command::GestureFrame { frame } => {
                let emitted = self.gestures.process(&frame);
                if emitted.is_empty() {
                    return Ok(Outcome::Skipped("no gesture"));
                }
                let mut outcome = Outcome::Skipped("no gesture");
                for cmd in emitted {
                    debug!("gesture emitted {}", cmd);
                    let name = cmd.to_string();
                    match self.handle(cmd) {
                        Ok(o) => outcome = outcome.merge(o),
                        Err(e) => warn!("gesture command {} failed: {}", name, e),
                    }
                }
                Ok(outcome)
            }
        }
    }
}

//  Tests
