//! Session state machine: Working → Resting → Working
//!
//! ```text
//! Working --finished--> Resting --overlay closed--> Working
//! Working --pause-->    Paused  --resume-->         Working
//! ```
//!
//! Everything runs on the caller's dispatch queue. Front ends call
//! [`Session::tick`] once per second (see [`crate::ticker::Ticker`]) and
//! forward user input to the control methods. State changes are reported to
//! subscribed [`SessionListener`]s as typed [`SessionEvent`]s.

use crate::constants::PREVIEW_DEFAULT_SECONDS;
use crate::countdown::{Adjustment, Countdown};
use crate::display::{widget_visible, DisplayGeometry};
use crate::overlay::{CloseReason, OverlayAppearance, OverlayController, OverlaySurface, OverlayTick};
use crate::preferences::{Preferences, PreferencesStore, SettingsError, WindowPosition};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Working,
    Resting,
    /// Paused from Working (or stopped)
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Work countdown (Working/Paused) or rest countdown (Resting) changed
    RemainingChanged {
        phase: SessionPhase,
        remaining_secs: u64,
    },
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    /// Countdown widget shown or hidden
    DisplayVisibility(bool),
    /// Widget position, size or font changed
    DisplayReconfigured(DisplayGeometry),
    OverlayOpened {
        seconds: u64,
        preview: bool,
    },
    OverlayClosed {
        reason: CloseReason,
        preview: bool,
    },
    /// The settings surface asked to preview the overlay
    PreviewOverlay {
        seconds: u64,
    },
}

/// Receives session events on the dispatch queue
pub trait SessionListener {
    fn on_event(&mut self, event: &SessionEvent);
}

impl SessionListener for Sender<SessionEvent> {
    fn on_event(&mut self, event: &SessionEvent) {
        if self.send(event.clone()).is_err() {
            debug!("Session event receiver dropped");
        }
    }
}

struct ActiveOverlay {
    controller: OverlayController,
    preview: bool,
}

pub struct Session {
    prefs: Preferences,
    phase: SessionPhase,
    work: Countdown,
    overlay: Option<ActiveOverlay>,
    surface: Box<dyn OverlaySurface>,
    listeners: Vec<Box<dyn SessionListener>>,
    widget_visible: bool,
}

impl Session {
    /// Enter Working with a fresh work countdown
    pub fn new(prefs: Preferences, surface: Box<dyn OverlaySurface>) -> Self {
        let mut work = Countdown::new();
        work.start(prefs.work_duration_minutes);
        let visible = widget_visible(prefs.hide_timer_until_last_minute, work.remaining_secs());

        info!(
            "Session started: work {} min, break {} min",
            prefs.work_duration_minutes, prefs.break_duration_minutes
        );

        Self {
            prefs,
            phase: SessionPhase::Working,
            work,
            overlay: None,
            surface,
            listeners: Vec::new(),
            widget_visible: visible,
        }
    }

    /// Add a listener and bring it up to date with the current state
    pub fn subscribe(&mut self, mut listener: Box<dyn SessionListener>) {
        listener.on_event(&SessionEvent::DisplayReconfigured(DisplayGeometry::from_preferences(
            &self.prefs,
        )));
        listener.on_event(&SessionEvent::DisplayVisibility(self.widget_visible));
        listener.on_event(&SessionEvent::RemainingChanged {
            phase: self.phase,
            remaining_secs: self.remaining_secs(),
        });
        self.listeners.push(listener);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Remaining seconds of whichever countdown the phase is showing
    pub fn remaining_secs(&self) -> u64 {
        match (self.phase, &self.overlay) {
            (SessionPhase::Resting, Some(active)) => active.controller.remaining_secs(),
            _ => self.work.remaining_secs(),
        }
    }

    pub fn work_remaining_secs(&self) -> u64 {
        self.work.remaining_secs()
    }

    pub fn is_widget_visible(&self) -> bool {
        self.widget_visible
    }

    pub fn is_overlay_open(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn is_previewing(&self) -> bool {
        self.overlay.as_ref().is_some_and(|a| a.preview)
    }

    // ── Controls ─────────────────────────────────────────────────────

    /// Restart the work countdown, ending any rest or preview in progress.
    /// `minutes` overrides the work duration for this countdown only.
    pub fn start_session(&mut self, minutes: Option<u32>) {
        self.dismiss_overlay();

        let minutes = minutes
            .filter(|m| *m > 0)
            .unwrap_or(self.prefs.work_duration_minutes);
        self.work.start(minutes);
        info!("Work countdown started: {} min", minutes);

        self.set_phase(SessionPhase::Working);
        self.emit_remaining();
        self.refresh_visibility();
    }

    pub fn pause_session(&mut self) {
        if self.phase != SessionPhase::Working {
            debug!("Pause ignored in {:?}", self.phase);
            return;
        }
        self.work.pause();
        self.set_phase(SessionPhase::Paused);
        info!("Session paused with {} seconds left", self.work.remaining_secs());
    }

    pub fn resume_session(&mut self) {
        if self.phase != SessionPhase::Paused {
            debug!("Resume ignored in {:?}", self.phase);
            return;
        }

        if self.work.resume() {
            self.set_phase(SessionPhase::Working);
            info!("Session resumed with {} seconds left", self.work.remaining_secs());
        } else {
            // Decreased to zero while paused: rest starts straight from Paused
            self.begin_rest();
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.phase {
            SessionPhase::Working => self.pause_session(),
            SessionPhase::Paused => self.resume_session(),
            SessionPhase::Resting => debug!("Pause toggle ignored while resting"),
        }
    }

    /// Halt the work countdown and remove any overlay without resuming work
    pub fn stop_session(&mut self) {
        self.dismiss_overlay();
        if self.work.remaining_secs() == 0 {
            self.work.start(self.prefs.work_duration_minutes);
        }
        self.work.stop();
        self.set_phase(SessionPhase::Paused);
        self.emit_remaining();
        self.refresh_visibility();
        info!("Session stopped");
    }

    /// Widget +/- buttons
    pub fn adjust(&mut self, adjustment: Adjustment) {
        if self.phase == SessionPhase::Resting {
            debug!("Adjustment ignored while resting");
            return;
        }
        let remaining = self.work.adjust(adjustment);
        debug!("Work countdown adjusted ({:?}) to {} seconds", adjustment, remaining);
        self.emit_remaining();
        self.refresh_visibility();
    }

    /// Advance one second
    pub fn tick(&mut self) {
        match self.phase {
            SessionPhase::Resting => self.tick_overlay(),
            SessionPhase::Working => {
                // Only a preview can be open here
                self.tick_overlay();
                self.tick_work();
            }
            SessionPhase::Paused => self.tick_overlay(),
        }
    }

    /// Reserved interrupt key. Returns whether an overlay was closed.
    pub fn interrupt(&mut self) -> bool {
        let Some(active) = self.overlay.as_mut() else {
            debug!("Interrupt ignored: no overlay open");
            return false;
        };
        let preview = active.preview;
        match active.controller.interrupt(&mut *self.surface) {
            Some(reason) => {
                self.overlay_closed(reason, preview);
                true
            }
            None => false,
        }
    }

    /// Clicks on the overlay are ignored
    pub fn overlay_clicked(&self) {
        if let Some(active) = &self.overlay {
            active.controller.pointer_click();
        }
    }

    /// Show the overlay for `seconds` without touching the phase
    pub fn preview_overlay(&mut self, seconds: u64) -> bool {
        if self.overlay.is_some() {
            warn!("Preview refused: an overlay is already open");
            return false;
        }

        let seconds = if seconds == 0 {
            PREVIEW_DEFAULT_SECONDS
        } else {
            seconds
        };
        self.emit(SessionEvent::PreviewOverlay { seconds });

        let controller = OverlayController::open(&mut *self.surface, seconds, &self.prefs);
        self.overlay = Some(ActiveOverlay {
            controller,
            preview: true,
        });
        self.emit(SessionEvent::OverlayOpened {
            seconds,
            preview: true,
        });
        true
    }

    /// Apply saved settings. Durations take effect at the next countdown start.
    pub fn update_preferences(&mut self, prefs: Preferences) -> Result<(), SettingsError> {
        prefs.validate()?;

        let old_geometry = DisplayGeometry::from_preferences(&self.prefs);
        let new_geometry = DisplayGeometry::from_preferences(&prefs);
        let appearance_changed = prefs.overlay_color != self.prefs.overlay_color
            || prefs.overlay_opacity_percent != self.prefs.overlay_opacity_percent;

        self.prefs = prefs;
        info!("Preferences updated");

        if old_geometry != new_geometry {
            self.emit(SessionEvent::DisplayReconfigured(new_geometry));
        }

        if appearance_changed {
            if let Some(active) = &self.overlay {
                let appearance = OverlayAppearance::from_preferences(
                    &self.prefs,
                    active.controller.remaining_secs(),
                );
                self.surface.present(&appearance);
            }
        }

        self.refresh_visibility();
        Ok(())
    }

    /// Record where the user dragged the widget
    pub fn window_moved(&mut self, position: WindowPosition) {
        self.prefs.window_position = position;
    }

    /// Persist the window position and release everything
    pub fn shutdown(
        mut self,
        store: &PreferencesStore,
        position: Option<WindowPosition>,
    ) -> Result<Preferences> {
        if let Some(position) = position {
            self.prefs.window_position = position;
        }

        self.dismiss_overlay();
        self.work.stop();

        store
            .save(&self.prefs)
            .context("Failed to save preferences on shutdown")?;
        info!("Session shut down");
        Ok(self.prefs)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn tick_work(&mut self) {
        let Some(tick) = self.work.tick() else {
            return;
        };

        self.emit_remaining();
        self.refresh_visibility();

        if tick.finished {
            self.begin_rest();
        }
    }

    fn tick_overlay(&mut self) {
        let Some(active) = self.overlay.as_mut() else {
            return;
        };
        let preview = active.preview;

        match active.controller.tick(&mut *self.surface) {
            Some(OverlayTick::Remaining(remaining_secs)) if !preview => {
                self.emit(SessionEvent::RemainingChanged {
                    phase: SessionPhase::Resting,
                    remaining_secs,
                });
            }
            Some(OverlayTick::Closed(reason)) => self.overlay_closed(reason, preview),
            _ => {}
        }
    }

    fn begin_rest(&mut self) {
        self.dismiss_overlay();
        self.work.stop();

        self.set_phase(SessionPhase::Resting);
        self.refresh_visibility();

        let seconds = u64::from(self.prefs.break_duration_minutes) * 60;
        let controller = OverlayController::open(&mut *self.surface, seconds, &self.prefs);
        self.overlay = Some(ActiveOverlay {
            controller,
            preview: false,
        });
        info!("Work period finished, resting for {} min", self.prefs.break_duration_minutes);

        self.emit(SessionEvent::OverlayOpened {
            seconds,
            preview: false,
        });
        self.emit(SessionEvent::RemainingChanged {
            phase: SessionPhase::Resting,
            remaining_secs: seconds,
        });
    }

    fn overlay_closed(&mut self, reason: CloseReason, preview: bool) {
        self.overlay = None;
        self.emit(SessionEvent::OverlayClosed { reason, preview });

        if !preview && reason != CloseReason::Dismissed && self.phase == SessionPhase::Resting {
            self.work.start(self.prefs.work_duration_minutes);
            info!(
                "Rest over ({:?}), back to work for {} min",
                reason, self.prefs.work_duration_minutes
            );
            self.set_phase(SessionPhase::Working);
            self.emit_remaining();
            self.refresh_visibility();
        }
    }

    fn dismiss_overlay(&mut self) {
        let Some(mut active) = self.overlay.take() else {
            return;
        };
        if let Some(reason) = active.controller.dismiss(&mut *self.surface) {
            self.emit(SessionEvent::OverlayClosed {
                reason,
                preview: active.preview,
            });
        }
    }

    fn set_phase(&mut self, to: SessionPhase) {
        let from = self.phase;
        if from != to {
            self.phase = to;
            debug!("Phase {:?} -> {:?}", from, to);
            self.emit(SessionEvent::PhaseChanged { from, to });
        }
    }

    fn emit_remaining(&mut self) {
        let event = SessionEvent::RemainingChanged {
            phase: self.phase,
            remaining_secs: self.remaining_secs(),
        };
        self.emit(event);
    }

    /// Display policy, not a phase: only reports actual changes
    fn refresh_visibility(&mut self) {
        let visible = match self.phase {
            SessionPhase::Resting => false,
            SessionPhase::Working | SessionPhase::Paused => widget_visible(
                self.prefs.hide_timer_until_last_minute,
                self.work.remaining_secs(),
            ),
        };
        if visible != self.widget_visible {
            self.widget_visible = visible;
            self.emit(SessionEvent::DisplayVisibility(visible));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayCommand;
    use std::sync::mpsc::{self, Receiver};

    fn session_with(prefs: Preferences) -> (Session, Receiver<SessionEvent>, Receiver<OverlayCommand>) {
        let (overlay_tx, overlay_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let mut session = Session::new(prefs, Box::new(overlay_tx));
        session.subscribe(Box::new(event_tx));
        // Drop the catch-up events sent on subscribe
        let _: Vec<_> = event_rx.try_iter().collect();
        (session, event_rx, overlay_rx)
    }

    fn short_prefs() -> Preferences {
        Preferences {
            work_duration_minutes: 1,
            break_duration_minutes: 1,
            ..Preferences::default()
        }
    }

    #[test]
    fn test_initial_state_is_working() {
        let (session, _, _) = session_with(short_prefs());
        assert_eq!(session.phase(), SessionPhase::Working);
        assert_eq!(session.remaining_secs(), 60);
        assert!(session.is_widget_visible());
        assert!(!session.is_overlay_open());
    }

    #[test]
    fn test_subscribe_sends_current_state() {
        let (overlay_tx, _overlay_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let mut session = Session::new(short_prefs(), Box::new(overlay_tx));
        session.subscribe(Box::new(event_tx));

        let events: Vec<_> = event_rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(events.contains(&SessionEvent::RemainingChanged {
            phase: SessionPhase::Working,
            remaining_secs: 60
        }));
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let (mut session, _, _) = session_with(short_prefs());
        session.tick();
        session.pause_session();
        session.pause_session();
        assert_eq!(session.phase(), SessionPhase::Paused);

        for _ in 0..10 {
            session.tick();
        }
        assert_eq!(session.remaining_secs(), 59);

        session.resume_session();
        assert_eq!(session.phase(), SessionPhase::Working);
        session.tick();
        assert_eq!(session.remaining_secs(), 58);
    }

    #[test]
    fn test_resume_when_working_is_noop() {
        let (mut session, events, _) = session_with(short_prefs());
        session.resume_session();
        assert_eq!(session.phase(), SessionPhase::Working);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_resume_at_zero_starts_rest() {
        let (mut session, events, _) = session_with(short_prefs());
        session.pause_session();
        session.adjust(Adjustment::Decrease);
        let _: Vec<_> = events.try_iter().collect();

        session.resume_session();
        assert_eq!(session.phase(), SessionPhase::Resting);
        assert!(session.is_overlay_open());

        let phases: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, SessionEvent::PhaseChanged { .. }))
            .collect();
        assert_eq!(
            phases,
            vec![SessionEvent::PhaseChanged {
                from: SessionPhase::Paused,
                to: SessionPhase::Resting
            }],
            "No intermediate Working phase"
        );
    }

    #[test]
    fn test_hide_toggle_while_running_changes_visibility_once() {
        let (mut session, events, _) = session_with(short_prefs());
        session.adjust(Adjustment::Increase);
        assert!(session.remaining_secs() > crate::constants::LAST_MINUTE_SECONDS);
        let _: Vec<_> = events.try_iter().collect();

        let hidden = Preferences {
            hide_timer_until_last_minute: true,
            ..short_prefs()
        };
        session.update_preferences(hidden.clone()).unwrap();
        let visibility: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, SessionEvent::DisplayVisibility(_)))
            .collect();
        assert_eq!(visibility, vec![SessionEvent::DisplayVisibility(false)]);
        assert!(!session.is_widget_visible());

        // Same preferences again: nothing changes
        session.update_preferences(hidden).unwrap();
        assert!(events
            .try_iter()
            .all(|e| !matches!(e, SessionEvent::DisplayVisibility(_))));

        session.update_preferences(short_prefs()).unwrap();
        let visibility: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, SessionEvent::DisplayVisibility(_)))
            .collect();
        assert_eq!(visibility, vec![SessionEvent::DisplayVisibility(true)]);
    }

    #[test]
    fn test_settings_change_applies_to_next_start() {
        let (mut session, _, _) = session_with(short_prefs());
        session.tick();

        let updated = Preferences {
            work_duration_minutes: 30,
            ..short_prefs()
        };
        session.update_preferences(updated).unwrap();
        assert_eq!(session.remaining_secs(), 59, "Running countdown untouched");

        session.start_session(None);
        assert_eq!(session.remaining_secs(), 30 * 60);
    }

    #[test]
    fn test_update_preferences_rejects_invalid() {
        let (mut session, _, _) = session_with(short_prefs());
        let invalid = Preferences {
            window_width: 50,
            ..short_prefs()
        };
        assert!(session.update_preferences(invalid).is_err());
        assert_eq!(session.preferences().window_width, 140);
    }

    #[test]
    fn test_geometry_change_is_reported() {
        let (mut session, events, _) = session_with(short_prefs());
        let updated = Preferences {
            font_size_px: 40,
            ..short_prefs()
        };
        session.update_preferences(updated).unwrap();

        let reconfigured: Vec<_> = events
            .try_iter()
            .filter_map(|e| match e {
                SessionEvent::DisplayReconfigured(g) => Some(g),
                _ => None,
            })
            .collect();
        assert_eq!(reconfigured.len(), 1);
        assert_eq!(reconfigured[0].font_size_px, 40);
    }

    #[test]
    fn test_color_change_repaints_open_overlay() {
        let (mut session, _, overlay) = session_with(short_prefs());
        session.preview_overlay(5);
        let _: Vec<_> = overlay.try_iter().collect();

        let updated = Preferences {
            overlay_opacity_percent: 50,
            ..short_prefs()
        };
        session.update_preferences(updated).unwrap();

        match overlay.try_recv().unwrap() {
            OverlayCommand::Present(appearance) => assert_eq!(appearance.tint.a, 64),
            other => panic!("Expected Present, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_does_not_change_phase() {
        let (mut session, events, _) = session_with(short_prefs());
        assert!(session.preview_overlay(2));
        assert!(!session.preview_overlay(2), "Second preview refused");

        session.tick();
        session.tick();
        assert!(!session.is_overlay_open());
        assert_eq!(session.phase(), SessionPhase::Working);
        assert_eq!(session.remaining_secs(), 58, "Work kept ticking");

        let events: Vec<_> = events.try_iter().collect();
        assert!(events.contains(&SessionEvent::PreviewOverlay { seconds: 2 }));
        assert!(events.contains(&SessionEvent::OverlayClosed {
            reason: CloseReason::Elapsed,
            preview: true
        }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::PhaseChanged { .. })));
    }

    #[test]
    fn test_stop_during_rest_dismisses_without_resuming() {
        let (mut session, _, _) = session_with(short_prefs());
        for _ in 0..60 {
            session.tick();
        }
        assert_eq!(session.phase(), SessionPhase::Resting);

        session.stop_session();
        assert_eq!(session.phase(), SessionPhase::Paused);
        assert!(!session.is_overlay_open());
        assert_eq!(session.remaining_secs(), 60);

        session.resume_session();
        assert_eq!(session.phase(), SessionPhase::Working);
    }

    #[test]
    fn test_adjust_ignored_while_resting() {
        let (mut session, _, _) = session_with(short_prefs());
        for _ in 0..60 {
            session.tick();
        }
        session.adjust(Adjustment::Increase);
        assert_eq!(session.remaining_secs(), 60);
    }

    #[test]
    fn test_click_on_overlay_is_ignored() {
        let (mut session, _, _) = session_with(short_prefs());
        for _ in 0..60 {
            session.tick();
        }
        session.overlay_clicked();
        assert!(session.is_overlay_open());
        assert_eq!(session.phase(), SessionPhase::Resting);
    }
}
