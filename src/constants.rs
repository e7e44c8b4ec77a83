//! Centralized constants for Standup
//!
//! This module contains all configurable numerical values used throughout
//! the application. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// SESSION DURATIONS
// ============================================================================

/// Default work period when no preferences exist.
/// Unit: minutes
/// Recommended range: 25-90
pub const WORK_DEFAULT_MINUTES: u32 = 60;

/// Default rest period when no preferences exist.
/// Unit: minutes
/// Recommended range: 5-15
pub const BREAK_DEFAULT_MINUTES: u32 = 10;

/// Minimum work or rest period accepted from the settings surface.
/// Unit: minutes
/// Range: Fixed minimum, a zero-length period would loop immediately
pub const DURATION_MIN_MINUTES: u32 = 1;

/// Step applied by the widget's +/- buttons.
/// Unit: seconds
/// Range: Fixed (10 minutes)
pub const ADJUST_STEP_SECONDS: u64 = 600;

/// Remaining time at or below which a hidden widget reappears.
/// Unit: seconds
/// Range: Fixed (the "last minute")
pub const LAST_MINUTE_SECONDS: u64 = 60;

// ============================================================================
// TICKING
// ============================================================================

/// Interval between countdown ticks.
/// Unit: milliseconds
/// Range: Fixed, one tick equals one second of countdown
pub const TICK_INTERVAL_MS: u64 = 1000;

/// Default length of an overlay preview started from the settings surface.
/// Unit: seconds
/// Recommended range: 3-10
pub const PREVIEW_DEFAULT_SECONDS: u64 = 5;

// ============================================================================
// WIDGET GEOMETRY
// ============================================================================

/// Default widget width.
/// Unit: pixels
pub const WIDGET_DEFAULT_WIDTH: u32 = 140;

/// Default widget height.
/// Unit: pixels
pub const WIDGET_DEFAULT_HEIGHT: u32 = 100;

/// Minimum widget width or height.
/// Unit: pixels
pub const WIDGET_MIN_SIDE: u32 = 100;

/// Maximum widget width or height.
/// Unit: pixels
pub const WIDGET_MAX_SIDE: u32 = 500;

/// Default countdown font size.
/// Unit: pixels
pub const FONT_DEFAULT_PX: u32 = 25;

/// Minimum countdown font size.
/// Unit: pixels
pub const FONT_MIN_PX: u32 = 12;

/// Maximum countdown font size.
/// Unit: pixels
pub const FONT_MAX_PX: u32 = 72;

/// Gap between the widget and the right edge of the primary display.
/// Unit: pixels
pub const CORNER_MARGIN_X: i32 = 20;

/// Gap between the widget and the bottom edge of the primary display.
/// Unit: pixels
/// Recommended range: 30-60 (clears most task bars and docks)
pub const CORNER_MARGIN_Y: i32 = 40;

// ============================================================================
// OVERLAY APPEARANCE
// ============================================================================

/// Default overlay tint (pale yellow-green, half transparent).
/// Unit: RGBA, 0-255 per channel
pub const OVERLAY_DEFAULT_COLOR: [u8; 4] = [144, 238, 144, 128];

/// Alpha applied when a color is written as "#RRGGBB" without alpha.
/// Unit: 0-255
pub const OVERLAY_HEX_DEFAULT_ALPHA: u8 = 128;

/// Default overlay opacity multiplier.
/// Unit: percent (0-100)
pub const OVERLAY_DEFAULT_OPACITY: u8 = 100;

/// Maximum overlay opacity.
/// Unit: percent
pub const OVERLAY_MAX_OPACITY: u8 = 100;

// ============================================================================
// NOTIFICATION TIMEOUTS
// ============================================================================

/// Standard notification display duration.
/// Unit: milliseconds
/// Recommended range: 2000-5000 (long enough to read, short enough to not annoy)
pub const NOTIFICATION_TIMEOUT_MS: u32 = 3000;

/// Error notification display duration (longer for important messages).
/// Unit: milliseconds
/// Recommended range: 4000-10000 (errors need more attention)
pub const NOTIFICATION_ERROR_TIMEOUT_MS: u32 = 5000;

// ============================================================================
// FILES
// ============================================================================

/// Preferences file name, resolved against the working directory.
pub const PREFERENCES_FILE_NAME: &str = "standup.toml";

/// Environment variable that overrides the preferences file location.
pub const PREFERENCES_ENV_VAR: &str = "STANDUP_CONFIG";

/// Name used for autostart entries.
pub const APP_NAME: &str = "Standup";

/// Reverse-DNS label for the macOS LaunchAgent.
pub const LAUNCH_AGENT_LABEL: &str = "com.standup.reminder";

// ============================================================================
// TRAY APP
// ============================================================================

/// Longest the tray event loop sleeps before polling menu and hotkey events.
/// Unit: milliseconds
/// Recommended range: 50-250 (menu clicks feel instant below ~200 ms)
pub const MENU_POLL_INTERVAL_MS: u64 = 100;

/// Side of the generated tray icon.
/// Unit: pixels
pub const TRAY_ICON_SIZE: u32 = 32;

/// Side of one bitmap glyph before scaling.
/// Unit: pixels
/// Range: Fixed by the 8x8 font
pub const GLYPH_SIZE_PX: u32 = 8;

/// Text size of the rest label on the primary display.
/// Unit: pixels
/// Recommended range: 32-64 (shrinks further to fit narrow displays)
pub const OVERLAY_LABEL_FONT_PX: u32 = 48;
