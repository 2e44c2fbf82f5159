//! Usable screen area of the primary display.

use crate::command::Bounds;
use crate::traits::WindowHost;
use log::warn;

/// Return the work area of the primary display (or the first display if
/// none is marked primary).  Falls back to `fallback` when the host cannot
/// answer or reports no displays.
pub fn primary_work_area<H: WindowHost>(host: &H, fallback: Bounds) -> Bounds {
    match host.displays() {
        Ok(displays) => {
            let primary = displays
                .iter()
                .find(|d| d.is_primary)
                .or_else(|| displays.first());
            match primary {
                Some(d) if d.work_area.width > 0 && d.work_area.height > 0 => d.work_area,
                _ => {
                    warn!("no usable display reported, falling back to {:?}", fallback);
                    fallback
                }
            }
        }
        Err(e) => {
            warn!("falling back to default screen size: {}", e);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DisplayInfo;
    use crate::host::memory::MemoryHost;

    const FALLBACK: Bounds = Bounds {
        left: 0,
        top: 0,
        width: 1500,
        height: 900,
    };

    #[test]
    fn picks_primary_display() {
        let host = MemoryHost::new();
        host.set_displays(vec![
            DisplayInfo {
                is_primary: false,
                work_area: Bounds::new(1920, 0, 1280, 1024),
            },
            DisplayInfo {
                is_primary: true,
                work_area: Bounds::new(0, 25, 1920, 1055),
            },
        ]);
        assert_eq!(primary_work_area(&host, FALLBACK), Bounds::new(0, 25, 1920, 1055));
    }

    #[test]
    fn first_display_when_none_primary() {
        let host = MemoryHost::new();
        host.set_displays(vec![DisplayInfo {
            is_primary: false,
            work_area: Bounds::new(0, 0, 800, 600),
        }]);
        assert_eq!(primary_work_area(&host, FALLBACK), Bounds::new(0, 0, 800, 600));
    }

    #[test]
    fn falls_back_on_error_or_empty() {
        let host = MemoryHost::new();
        host.set_displays(Vec::new());
        assert_eq!(primary_work_area(&host, FALLBACK), FALLBACK);

        let host = MemoryHost::with_work_area(Bounds::new(0, 0, 640, 480));
        host.fail_displays();
        assert_eq!(primary_work_area(&host, FALLBACK), FALLBACK);
    }
}
