//! Dock window lifecycle.
//!
//! The dock has exactly one window at a time, or none. Which window type is
//! used is up to the embedding application through [`WindowFactory`]; this
//! module only tracks whether it exists and drives its show/close calls.

use dock_types::WindowId;
use tracing::debug;

/// A dock window owned by the controller.
pub trait DockWindow {
    fn id(&self) -> WindowId;

    fn show(&mut self);

    fn close(&mut self);
}

/// Builds a fresh dock window each time the dock opens.
pub trait WindowFactory {
    type Window: DockWindow;

    fn create(&mut self) -> Self::Window;
}

/// What can happen to the dock window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockAction {
    /// Open when closed, close when open
    Toggle,
    /// Close if open, nothing otherwise
    Close,
}

/// The dock is either closed or open with exactly one window.
#[derive(Debug)]
pub enum DockState<W> {
    Closed,
    Open(W),
}

impl<W: DockWindow> DockState<W> {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, DockState::Open(_))
    }

    /// Window to attach prompts to, if any
    #[must_use]
    pub fn anchor(&self) -> Option<WindowId> {
        match self {
            DockState::Open(window) => Some(window.id()),
            DockState::Closed => None,
        }
    }

    /// Apply `action`, creating a window through `create` only when opening.
    #[must_use]
    pub fn transition(self, action: DockAction, create: impl FnOnce() -> W) -> Self {
        match (self, action) {
            (DockState::Closed, DockAction::Toggle) => {
                let mut window = create();
                window.show();
                debug!("Dock window {} opened", window.id());
                DockState::Open(window)
            }
            (DockState::Open(mut window), DockAction::Toggle | DockAction::Close) => {
                window.close();
                debug!("Dock window {} closed", window.id());
                DockState::Closed
            }
            (DockState::Closed, DockAction::Close) => DockState::Closed,
        }
    }
}

/// Window factory paired with the current dock state.
pub struct Dock<F: WindowFactory> {
    factory: F,
    state: DockState<F::Window>,
}

impl<F: WindowFactory> Dock<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: DockState::Closed,
        }
    }

    pub fn apply(&mut self, action: DockAction) {
        let factory = &mut self.factory;
        let state = std::mem::replace(&mut self.state, DockState::Closed);
        self.state = state.transition(action, || factory.create());
    }

    pub fn toggle(&mut self) {
        self.apply(DockAction::Toggle);
    }

    pub fn close(&mut self) {
        self.apply(DockAction::Close);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    #[must_use]
    pub fn anchor(&self) -> Option<WindowId> {
        self.state.anchor()
    }
}
