//! Rest overlay controller
//!
//! The controller owns the rest countdown and drives an [`OverlaySurface`]:
//! `present` when opened, `set_label` on every tick, `destroy` exactly once
//! when it closes. Pointer clicks never close it; only the countdown reaching
//! zero or the interrupt key do.

use crate::countdown::Countdown;
use crate::display::format_clock;
use crate::preferences::{OverlayColor, Preferences};
use log::{debug, info};
use std::sync::mpsc::Sender;

/// Key that ends a rest early
pub const INTERRUPT_KEY_NAME: &str = "ESC";

/// Text shown in the middle of the primary display
pub fn rest_label(remaining_secs: u64) -> String {
    format!(
        "Rest time: {}, press {} to end the break",
        format_clock(remaining_secs),
        INTERRUPT_KEY_NAME
    )
}

/// What the surface needs to draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayAppearance {
    /// Tint with the opacity percentage already folded into alpha
    pub tint: OverlayColor,
    pub label: String,
}

impl OverlayAppearance {
    pub fn from_preferences(prefs: &Preferences, remaining_secs: u64) -> Self {
        Self {
            tint: OverlayColor {
                a: prefs.effective_overlay_alpha(),
                ..prefs.overlay_color
            },
            label: rest_label(remaining_secs),
        }
    }
}

/// Full-screen surface covering every display
pub trait OverlaySurface {
    /// Show above all windows on all displays; clicks pass through unhandled
    fn present(&mut self, appearance: &OverlayAppearance);
    fn set_label(&mut self, label: &str);
    /// Hide and release the surface
    fn destroy(&mut self);
}

/// Surface calls forwarded to the thread that owns the real windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    Present(OverlayAppearance),
    Label(String),
    Destroy,
}

impl OverlaySurface for Sender<OverlayCommand> {
    fn present(&mut self, appearance: &OverlayAppearance) {
        if self.send(OverlayCommand::Present(appearance.clone())).is_err() {
            debug!("Overlay receiver dropped; present ignored");
        }
    }

    fn set_label(&mut self, label: &str) {
        if self.send(OverlayCommand::Label(label.to_string())).is_err() {
            debug!("Overlay receiver dropped; label ignored");
        }
    }

    fn destroy(&mut self) {
        if self.send(OverlayCommand::Destroy).is_err() {
            debug!("Overlay receiver dropped; destroy ignored");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The rest countdown reached zero
    Elapsed,
    /// The interrupt key was pressed
    Interrupted,
    /// Torn down by the session (stop or shutdown)
    Dismissed,
}

/// Outcome of one overlay tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTick {
    Remaining(u64),
    Closed(CloseReason),
}

#[derive(Debug)]
pub struct OverlayController {
    countdown: Countdown,
    open: bool,
}

impl OverlayController {
    /// Present the surface and start the rest countdown
    pub fn open(surface: &mut dyn OverlaySurface, seconds: u64, prefs: &Preferences) -> Self {
        let mut countdown = Countdown::new();
        countdown.start_seconds(seconds);

        surface.present(&OverlayAppearance::from_preferences(prefs, seconds));
        info!("Overlay opened for {}", format_clock(seconds));

        Self {
            countdown,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    /// Advance the rest countdown. Returns `None` once closed.
    pub fn tick(&mut self, surface: &mut dyn OverlaySurface) -> Option<OverlayTick> {
        if !self.open {
            return None;
        }

        let tick = self.countdown.tick()?;
        if tick.finished {
            self.close(surface, CloseReason::Elapsed);
            Some(OverlayTick::Closed(CloseReason::Elapsed))
        } else {
            surface.set_label(&rest_label(tick.remaining_secs));
            Some(OverlayTick::Remaining(tick.remaining_secs))
        }
    }

    /// Interrupt key pressed. Returns the close reason the first time only.
    pub fn interrupt(&mut self, surface: &mut dyn OverlaySurface) -> Option<CloseReason> {
        self.close(surface, CloseReason::Interrupted)
    }

    /// Close without it counting as the end of a rest
    pub fn dismiss(&mut self, surface: &mut dyn OverlaySurface) -> Option<CloseReason> {
        self.close(surface, CloseReason::Dismissed)
    }

    /// Pointer clicks are swallowed so a stray click cannot end the rest
    pub fn pointer_click(&self) {
        debug!("Click on overlay ignored");
    }

    fn close(&mut self, surface: &mut dyn OverlaySurface, reason: CloseReason) -> Option<CloseReason> {
        if !self.open {
            return None;
        }
        self.open = false;
        self.countdown.stop();
        surface.destroy();
        info!("Overlay closed ({:?})", reason);
        Some(reason)
    }
}
