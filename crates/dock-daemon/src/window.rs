//! Dock window used when the daemon runs without a UI attached.
//!
//! It only tracks identity and logs transitions; prompts anchored to it are
//! answered by the configured consent policy.

use dock_core::{DockWindow, WindowFactory};
use dock_types::WindowId;
use tracing::info;

#[derive(Debug)]
pub struct HeadlessWindow {
    id: WindowId,
    visible: bool,
}

impl HeadlessWindow {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl DockWindow for HeadlessWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn show(&mut self) {
        self.visible = true;
        info!("Dock window {} shown", self.id);
    }

    fn close(&mut self) {
        self.visible = false;
        info!("Dock window {} closed", self.id);
    }
}

#[derive(Debug, Default)]
pub struct HeadlessFactory {
    next_id: u64,
}

impl WindowFactory for HeadlessFactory {
    type Window = HeadlessWindow;

    fn create(&mut self) -> HeadlessWindow {
        self.next_id += 1;
        HeadlessWindow {
            id: WindowId(self.next_id),
            visible: false,
        }
    }
}
