//! The dock controller.
//!
//! [`ToggleController`] owns the dock window and drives launches. It lives on
//! its home context: every method that takes `&mut self` is meant to run
//! there, either directly by the owner or as a job dispatched through a
//! [`ControllerHandle`]. Bus events and launch outcomes arrive as jobs too,
//! so window state is never touched concurrently.

use std::sync::Arc;

use dock_types::{DockEvent, DockStatus, LaunchTarget};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::home::{HomeContext, HomeQueue};
use crate::pipeline::{Continuations, LaunchPipeline};
use crate::window::{Dock, WindowFactory};

/// Receives launch failures that nobody else handles.
pub trait FailureReporter: Send + Sync {
    fn report(&self, target: &LaunchTarget, error: &LaunchError);
}

/// Reports failures to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, target: &LaunchTarget, error: &LaunchError) {
        error!("Failed to launch {:?}: {error}", target.location());
    }
}

/// Controller behaviour that is not part of the window or the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Let a launch start while another one is still in flight
    pub allow_overlapping: bool,
}

impl From<&LaunchConfig> for ControllerOptions {
    fn from(config: &LaunchConfig) -> Self {
        Self {
            allow_overlapping: config.allow_overlapping,
        }
    }
}

pub struct ToggleController<F: WindowFactory + 'static> {
    dock: Dock<F>,
    pipeline: LaunchPipeline,
    reporter: Arc<dyn FailureReporter>,
    bus: Arc<dyn EventBus>,
    subscription: Option<SubscriptionId>,
    home: HomeContext<Self>,
    queue: HomeQueue<Self>,
    options: ControllerOptions,
    in_flight: usize,
    shutdown: bool,
}

impl<F: WindowFactory + 'static> ToggleController<F> {
    pub fn new(
        factory: F,
        pipeline: LaunchPipeline,
        bus: Arc<dyn EventBus>,
        reporter: Arc<dyn FailureReporter>,
        options: ControllerOptions,
    ) -> Self {
        let (home, queue) = HomeContext::channel();
        Self {
            dock: Dock::new(factory),
            pipeline,
            reporter,
            bus,
            subscription: None,
            home,
            queue,
            options,
            in_flight: 0,
            shutdown: false,
        }
    }

    /// Subscribe to the event bus. Calling it twice keeps one subscription.
    pub fn start(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        let home = self.home.clone();
        let id = self.bus.subscribe(Box::new(move |event: &DockEvent| {
            let event = event.clone();
            if !home.dispatch(move |controller: &mut Self| controller.handle_event(event)) {
                warn!("Dock controller is gone, dropping bus event");
            }
        }));
        self.subscription = Some(id);
        info!("Dock controller started");
    }

    /// Unsubscribe from the event bus. Launches already running still finish.
    pub fn stop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
            info!("Dock controller stopped");
        }
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Open the dock if it is closed, close it if it is open.
    pub fn toggle(&mut self) {
        self.dock.toggle();
        debug!("Dock toggled, open: {}", self.dock.is_open());
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.dock.is_open()
    }

    #[must_use]
    pub fn launch_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    #[must_use]
    pub fn status(&self) -> DockStatus {
        DockStatus {
            window_open: self.is_open(),
            launch_in_flight: self.launch_in_flight(),
        }
    }

    #[cfg(test)]
    pub(crate) fn dock(&self) -> &Dock<F> {
        &self.dock
    }

    #[must_use]
    pub fn handle(&self) -> ControllerHandle<F> {
        ControllerHandle {
            home: self.home.clone(),
        }
    }

    fn handle_event(&mut self, event: DockEvent) {
        match event {
            DockEvent::OpenApp { entry } => {
                debug!("Launch requested for dock entry {:?}", entry.name);
                self.on_launch_requested(LaunchTarget::from(entry));
            }
        }
    }

    /// Launch `target`; failures go to the reporter, success closes the dock.
    pub fn on_launch_requested(&mut self, target: LaunchTarget) {
        let reporter = self.reporter.clone();
        let reported = target.clone();
        self.launch_application(
            target,
            Continuations::<Self>::new(|_| {}, move |_, err| reporter.report(&reported, &err)),
        );
    }

    /// Launch `target` with caller supplied continuations.
    ///
    /// On success the caller's `on_success` runs first, then the dock is
    /// closed. On failure only `on_failure` runs and the dock is left as is.
    pub fn launch_application(&mut self, target: LaunchTarget, continuations: Continuations<Self>) {
        if self.in_flight > 0 && !self.options.allow_overlapping {
            info!(
                "Rejecting launch of {:?}, another launch is in flight",
                target.location()
            );
            let queued = self.home.dispatch(move |controller: &mut Self| {
                continuations.fail(controller, LaunchError::InFlight);
            });
            if !queued {
                warn!("Home context closed, launch rejection dropped");
            }
            return;
        }

        self.in_flight += 1;
        let (on_success, on_failure) = continuations.into_parts();
        let finish = Continuations::new(
            move |controller: &mut Self| {
                controller.in_flight -= 1;
                on_success(controller);
                controller.dock.close();
            },
            move |controller: &mut Self, err| {
                controller.in_flight -= 1;
                on_failure(controller, err);
            },
        );
        self.pipeline
            .launch(target, self.dock.anchor(), &self.home, finish);
    }

    /// Run the next queued job, waiting for one if necessary.
    ///
    /// Returns false once the controller has been shut down.
    pub async fn process_next(&mut self) -> bool {
        if self.shutdown {
            return false;
        }
        if let Some(job) = self.queue.next().await {
            job(self);
        }
        !self.shutdown
    }

    /// Run every job that is already queued. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while !self.shutdown {
            let Some(job) = self.queue.try_next() else {
                break;
            };
            job(self);
            ran += 1;
        }
        ran
    }

    /// Drain jobs until [`ControllerHandle::shutdown`] is called.
    pub async fn run(mut self) {
        while self.process_next().await {}
        self.stop();
        self.dock.close();
        info!("Dock controller finished");
    }
}

impl<F: WindowFactory + 'static> Drop for ToggleController<F> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Posts work onto a controller's home context from anywhere.
pub struct ControllerHandle<F: WindowFactory + 'static> {
    home: HomeContext<ToggleController<F>>,
}

impl<F: WindowFactory + 'static> Clone for ControllerHandle<F> {
    fn clone(&self) -> Self {
        Self {
            home: self.home.clone(),
        }
    }
}

impl<F: WindowFactory + 'static> ControllerHandle<F> {
    /// Returns false if the controller is gone.
    pub fn toggle(&self) -> bool {
        self.home.dispatch(ToggleController::toggle)
    }

    /// Returns false if the controller is gone.
    pub fn request_launch(&self, target: LaunchTarget) -> bool {
        self.home.dispatch(move |controller: &mut ToggleController<F>| {
            controller.on_launch_requested(target);
        })
    }

    /// Current status, or `None` if the controller is gone.
    pub async fn status(&self) -> Option<DockStatus> {
        let (tx, rx) = oneshot::channel();
        let queued = self.home.dispatch(move |controller: &mut ToggleController<F>| {
            let _ = tx.send(controller.status());
        });
        if !queued {
            return None;
        }
        rx.await.ok()
    }

    /// Stop the controller's run loop after the jobs queued before this one.
    pub fn shutdown(&self) -> bool {
        self.home.dispatch(|controller: &mut ToggleController<F>| {
            controller.stop();
            controller.shutdown = true;
        })
    }
}
