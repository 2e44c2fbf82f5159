//! The camera window: where the gesture pipeline runs.
//!
//! It is opened centered in the work area and is the one window that
//! clear-chaos never closes.

use crate::command::{Bounds, CreateWindow, Outcome, WindowState, WindowUpdate};
use crate::config::PageConfig;
use crate::traits::WindowHost;
use log::{info, warn};

/// Preferred camera size clamped to `area`, centered inside it.
pub fn camera_bounds(area: Bounds, pages: &PageConfig) -> Bounds {
    let width = pages.camera_width.min(area.width);
    let height = pages.camera_height.min(area.height);
    Bounds {
        left: area.left + ((area.width - width) / 2) as i32,
        top: area.top + ((area.height - height) / 2) as i32,
        width,
        height,
    }
}

/// Open the camera page, then take every other fullscreen window out of
/// fullscreen so the camera stays visible.  Maximized windows are kept.
pub fn open_camera<H: WindowHost>(
    host: &H,
    pages: &PageConfig,
    area: Bounds,
) -> Result<Outcome, H::Error> {
    let bounds = camera_bounds(area, pages);
    let camera = host.create_window(&CreateWindow::from_url(pages.camera.clone(), bounds).focused())?;
    info!("opened camera window {} at {:?}", camera.id, bounds);

    let mut failed = 0;
    let mut attempted = 0;
    match host.windows() {
        Ok(windows) => {
            for w in windows
                .iter()
                .filter(|w| w.id != camera.id && w.state == WindowState::Fullscreen)
            {
                attempted += 1;
                if let Err(e) = host.update_window(w.id, &WindowUpdate::state(WindowState::Normal)) {
                    warn!("could not exit fullscreen for window {}: {}", w.id, e);
                    failed += 1;
                }
            }
        }
        Err(e) => warn!("could not list windows after opening camera: {}", e),
    }
    Ok(Outcome::from_counts(failed, attempted))
}
