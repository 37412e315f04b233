use crate::notify::{Notice, Notifier};
use std::sync::Arc;

/// The floating share button. While enabled, the `g` hotkey runs the automation.
pub struct FloatingButton {
    enabled: bool,
    notifier: Arc<dyn Notifier>,
}

impl FloatingButton {
    pub fn new(enabled: bool, notifier: Arc<dyn Notifier>) -> Self {
        let button = Self { enabled, notifier };
        if enabled {
            button.announce();
        }
        button
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.announce();
        }
    }

    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            log::info!("floating button disabled");
        }
    }

    pub fn toggle(&mut self) -> bool {
        if self.enabled {
            self.disable();
        } else {
            self.enable();
        }
        self.enabled
    }

    pub fn status_text(&self) -> &'static str {
        if self.enabled {
            "Floating Button: ON"
        } else {
            "Floating Button: OFF"
        }
    }

    fn announce(&self) {
        log::info!("floating button enabled");
        self.notifier.post(&Notice::OverlayActive);
    }
}
