//! Countdown widget geometry and visibility policy

use crate::constants::{CORNER_MARGIN_X, CORNER_MARGIN_Y, LAST_MINUTE_SECONDS};
use crate::preferences::{Preferences, WindowPosition, WindowSize};

/// Format seconds as `MM:SS` (minutes are not capped at 59)
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Geometry the front end applies to the countdown widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub position: WindowPosition,
    pub size: WindowSize,
    pub font_size_px: u32,
}

impl DisplayGeometry {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            position: prefs.window_position,
            size: prefs.window_size(),
            font_size_px: prefs.font_size_px,
        }
    }
}

/// Bottom-right placement on a screen of the given size, never negative
pub fn corner_position(screen_width: u32, screen_height: u32, size: WindowSize) -> WindowPosition {
    let x = screen_width as i64 - size.width as i64 - CORNER_MARGIN_X as i64;
    let y = screen_height as i64 - size.height as i64 - CORNER_MARGIN_Y as i64;
    WindowPosition::new(x.max(0) as i32, y.max(0) as i32)
}

/// Saved position, or the screen corner when none was saved yet
pub fn resolve_position(
    saved: WindowPosition,
    screen_width: u32,
    screen_height: u32,
    size: WindowSize,
) -> WindowPosition {
    if saved.is_unset() {
        corner_position(screen_width, screen_height, size)
    } else {
        saved
    }
}

/// Should the widget be visible for this much remaining work time?
pub fn widget_visible(hide_until_last_minute: bool, remaining_secs: u64) -> bool {
    !hide_until_last_minute || remaining_secs <= LAST_MINUTE_SECONDS
}
