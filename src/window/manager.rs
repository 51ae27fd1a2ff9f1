use std::sync::mpsc::{self, Receiver, Sender};

use super::host::{pick_output_display, DisplayHost, SurfaceHandle, SurfaceSpec, WindowError};
use crate::transport::{LifecycleEvent, SurfaceId, SurfaceMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Created(SurfaceId),
    AlreadyOpen(SurfaceId),
}

/// Owns the single output surface handle and the lifecycle back-channel.
pub struct WindowManager<H: DisplayHost> {
    host: H,
    output: Option<SurfaceHandle>,
    events_tx: Sender<LifecycleEvent>,
    events_rx: Receiver<LifecycleEvent>,
    next_id: SurfaceId,
}

impl<H: DisplayHost> WindowManager<H> {
    pub fn new(host: H) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            host,
            output: None,
            events_tx,
            events_rx,
            next_id: 1,
        }
    }

    /// Make sure an output surface exists. Calling this while one is open
    /// does nothing.
    pub fn open_output(&mut self) -> Result<OpenOutcome, WindowError> {
        if let Some(output) = &self.output {
            return Ok(OpenOutcome::AlreadyOpen(output.id));
        }

        let displays = self.host.displays();
        let display = pick_output_display(&displays)
            .cloned()
            .ok_or(WindowError::NoDisplay)?;
        let id = self.next_id;
        self.next_id += 1;

        let spec = SurfaceSpec {
            id,
            display,
            borderless: true,
            fullscreen: true,
        };
        let handle = self.host.create_surface(spec, self.events_tx.clone())?;
        tracing::info!(surface = id, display = handle.display, "output surface opened");
        self.output = Some(handle);
        Ok(OpenOutcome::Created(id))
    }

    /// Close the output surface if there is one. Returns whether a surface
    /// was closed.
    pub fn close_output(&mut self) -> bool {
        match self.output.take() {
            Some(handle) => {
                let id = handle.id;
                handle.shutdown();
                tracing::info!(surface = id, "output surface closed by operator");
                true
            }
            None => false,
        }
    }

    /// Drain lifecycle events. A `Destroyed` for the current surface releases
    /// the handle so the surface can be opened again.
    pub fn poll_events(&mut self) -> Vec<LifecycleEvent> {
        let events: Vec<_> = self.events_rx.try_iter().collect();
        for event in &events {
            if let LifecycleEvent::Destroyed(id) = event {
                if self.output.as_ref().is_some_and(|output| output.id == *id) {
                    if let Some(handle) = self.output.take() {
                        handle.shutdown();
                    }
                    tracing::info!(surface = id, "output surface closed externally");
                }
            }
        }
        events
    }

    pub fn is_output_open(&self) -> bool {
        self.output.is_some()
    }

    pub fn output_id(&self) -> Option<SurfaceId> {
        self.output.as_ref().map(|output| output.id)
    }

    /// Inbox of the current output surface, if any.
    pub fn output_sender(&self) -> Option<&Sender<SurfaceMessage>> {
        self.output.as_ref().map(SurfaceHandle::sender)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: DisplayHost> Drop for WindowManager<H> {
    fn drop(&mut self) {
        self.close_output();
    }
}
