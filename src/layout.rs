//! Useful mode: tile every tab of every normal window into a grid.
//!
//! Windows that own exactly one tab are moved in place; tabs that share a
//! window are detached into new windows at their cell.  Maximized and
//! fullscreen windows are first returned to normal and given time to settle
//! so that the host's own animation does not overwrite the new bounds.

use crate::command::{
    Bounds, CreateWindow, Outcome, TabId, WindowId, WindowKind, WindowState, WindowUpdate,
};
use crate::config::LayoutConfig;
use crate::grid::GridLayout;
use crate::pause;
use crate::traits::WindowHost;
use crate::workarea::primary_work_area;
use log::{debug, info, warn};

/// One tab to place, with the shape of the window that currently owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handle {
    tab: TabId,
    window: WindowId,
    alone: bool,
}

/// Tile every tab of every normal window over the primary work area.
///
/// Returns `Err` only when the window list cannot be fetched; individual
/// placement failures are counted in the [`Outcome`].
pub fn organize_windows<H: WindowHost>(host: &H, config: &LayoutConfig) -> Result<Outcome, H::Error> {
    let mut failed = 0;
    let mut attempted = 0;

    let windows = host.windows()?;
    let expanded: Vec<WindowId> = windows
        .iter()
        .filter(|w| w.kind == WindowKind::Normal && w.state.is_expanded())
        .map(|w| w.id)
        .collect();
    if !expanded.is_empty() {
        for id in &expanded {
            attempted += 1;
            if let Err(e) = host.update_window(*id, &WindowUpdate::state(WindowState::Normal)) {
                warn!("could not restore window {}: {}", id, e);
                failed += 1;
            }
        }
        debug!("restored {} window(s), waiting for them to settle", expanded.len());
        pause(config.settle_delay_ms);
    }

    let windows = if expanded.is_empty() {
        windows
    } else {
        host.windows()?
    };

    let handles: Vec<Handle> = windows
        .iter()
        .filter(|w| w.kind == WindowKind::Normal)
        .flat_map(|w| {
            let alone = w.tabs.len() == 1;
            w.tabs.iter().map(move |t| Handle {
                tab: t.id,
                window: w.id,
                alone,
            })
        })
        .collect();

    let area = primary_work_area(host, config.fallback_work_area);
    let Some(grid) = GridLayout::new(handles.len(), area) else {
        debug!("no tabs to organize");
        return Ok(Outcome::from_counts(failed, attempted));
    };
    let (cols, rows) = grid.dimensions();
    info!("tiling {} tab(s) as {}x{} over {:?}", handles.len(), cols, rows, area);

    for (handle, cell) in handles.iter().zip(grid.cells()) {
        attempted += 1;
        if let Err(e) = place(host, handle, cell) {
            warn!("could not place tab {}: {}", handle.tab, e);
            failed += 1;
        }
    }

    Ok(Outcome::from_counts(failed, attempted))
}

fn place<H: WindowHost>(host: &H, handle: &Handle, cell: Bounds) -> Result<(), H::Error> {
    if handle.alone {
        host.update_window(handle.window, &WindowUpdate::place(cell))
    } else {
        host.create_window(&CreateWindow::from_tab(handle.tab, cell))
            .map(|_| ())
    }
}

//  Tests
