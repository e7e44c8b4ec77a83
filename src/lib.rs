// Library interface for Standup
// Shared by the terminal and tray front ends, and by the integration tests

pub mod autostart;
pub mod config;
pub mod constants;
pub mod countdown;
pub mod display;
pub mod hotkeys;
pub mod notifications;
pub mod overlay;
pub mod preferences;
pub mod render;
pub mod session;
pub mod settings;
pub mod ticker;

pub use autostart::{Autostart, SystemAutostart};
pub use countdown::{Adjustment, Countdown};
pub use overlay::{CloseReason, OverlayAppearance, OverlayCommand, OverlaySurface};
pub use preferences::{Preferences, PreferencesStore, SettingsError};
pub use session::{Session, SessionEvent, SessionListener, SessionPhase};
pub use settings::{apply_settings, SettingsForm};
pub use ticker::Ticker;

use log::info;

/// Load preferences and build a session around the given overlay surface
pub fn load_session(store: &PreferencesStore, surface: Box<dyn OverlaySurface>) -> Session {
    info!("Loading preferences from {}", store.path().display());
    Session::new(store.load(), surface)
}
