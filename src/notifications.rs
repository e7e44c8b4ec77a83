//! Desktop notifications when a rest begins and ends

use crate::constants::{APP_NAME, NOTIFICATION_ERROR_TIMEOUT_MS, NOTIFICATION_TIMEOUT_MS};
use crate::display::format_clock;
use crate::overlay::CloseReason;
use crate::session::{SessionEvent, SessionListener};
use log::debug;
use notify_rust::{Notification, Timeout};

/// Body text for events worth a notification. Previews stay silent.
pub fn notification_text(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::OverlayOpened {
            seconds,
            preview: false,
        } => Some(format!("Time to stand up! Rest for {}", format_clock(*seconds))),
        SessionEvent::OverlayClosed {
            reason: CloseReason::Elapsed,
            preview: false,
        } => Some("Break is over, back to work".to_string()),
        SessionEvent::OverlayClosed {
            reason: CloseReason::Interrupted,
            preview: false,
        } => Some("Break ended early, back to work".to_string()),
        _ => None,
    }
}

fn show(body: &str, timeout_ms: u32) {
    if let Err(e) = Notification::new()
        .summary(APP_NAME)
        .body(body)
        .timeout(Timeout::Milliseconds(timeout_ms))
        .show()
    {
        debug!("Failed to show notification: {}", e);
    }
}

/// Show an error that the user should not miss
pub fn show_error(message: &str) {
    show(message, NOTIFICATION_ERROR_TIMEOUT_MS);
}

/// Session listener that posts desktop notifications
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl SessionListener for DesktopNotifier {
    fn on_event(&mut self, event: &SessionEvent) {
        if let Some(body) = notification_text(event) {
            show(&body, NOTIFICATION_TIMEOUT_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_start_and_end_are_announced() {
        assert_eq!(
            notification_text(&SessionEvent::OverlayOpened {
                seconds: 600,
                preview: false
            }),
            Some("Time to stand up! Rest for 10:00".to_string())
        );
        assert!(notification_text(&SessionEvent::OverlayClosed {
            reason: CloseReason::Elapsed,
            preview: false
        })
        .is_some());
        assert!(notification_text(&SessionEvent::OverlayClosed {
            reason: CloseReason::Interrupted,
            preview: false
        })
        .is_some());
    }

    #[test]
    fn test_previews_and_dismissals_are_silent() {
        assert_eq!(
            notification_text(&SessionEvent::OverlayOpened {
                seconds: 5,
                preview: true
            }),
            None
        );
        assert_eq!(
            notification_text(&SessionEvent::OverlayClosed {
                reason: CloseReason::Dismissed,
                preview: false
            }),
            None
        );
        assert_eq!(notification_text(&SessionEvent::DisplayVisibility(true)), None);
    }
}
