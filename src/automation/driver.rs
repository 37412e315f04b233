use super::gestures::Swipe;
use super::tree::{UiNode, UiTree};
use anyhow::Result;

/// What the automation needs from the device: read the screen, act on it.
pub trait UiDriver: Send {
    fn snapshot(&mut self) -> Result<UiTree>;

    /// `Ok(false)` when the device refused the action.
    fn click(&mut self, node: &UiNode) -> Result<bool>;

    fn scroll_forward(&mut self, node: &UiNode) -> Result<bool>;

    fn swipe(&mut self, swipe: &Swipe) -> Result<bool>;

    /// Package of the focused window when the device can tell without a dump.
    fn focused_package(&mut self) -> Result<Option<String>> {
        Ok(None)
    }
}
