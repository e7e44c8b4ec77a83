use anyhow::{Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey},
    GlobalHotKeyManager,
};
use log::{info, warn};

/// System-wide Escape binding, held only while an overlay is visible so the
/// key keeps working in other apps the rest of the time
pub struct InterruptHotkey {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
    armed: bool,
}

impl InterruptHotkey {
    pub fn new() -> Result<Self> {
        let manager =
            GlobalHotKeyManager::new().context("Failed to create global hotkey manager")?;

        Ok(Self {
            manager,
            hotkey: HotKey::new(None, Code::Escape),
            armed: false,
        })
    }

    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        match self.manager.register(self.hotkey) {
            Ok(()) => {
                self.armed = true;
                info!("Interrupt hotkey registered: Escape");
            }
            // The overlay window still handles Escape while focused
            Err(e) => warn!("Failed to register interrupt hotkey: {}", e),
        }
    }

    pub fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.manager.unregister(self.hotkey) {
            warn!("Failed to unregister interrupt hotkey: {}", e);
        }
        self.armed = false;
    }

    pub fn is_interrupt(&self, event_id: u32) -> bool {
        self.armed && self.hotkey.id() == event_id
    }
}
