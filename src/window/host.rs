use std::io;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::transport::{LifecycleEvent, SurfaceId, SurfaceMessage};

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("no display available for the output surface")]
    NoDisplay,
    #[error("failed to create output surface on {display}")]
    Host {
        display: String,
        #[source]
        source: io::Error,
    },
}

/// A screen the host can place a surface on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub index: usize,
    pub name: String,
    pub primary: bool,
}

/// How the output surface should be created.
#[derive(Debug, Clone)]
pub struct SurfaceSpec {
    pub id: SurfaceId,
    pub display: DisplayInfo,
    pub borderless: bool,
    pub fullscreen: bool,
}

/// The owned handle to a running output surface: its inbox and its thread.
#[derive(Debug)]
pub struct SurfaceHandle {
    pub id: SurfaceId,
    pub display: usize,
    pub(crate) sender: Sender<SurfaceMessage>,
    pub(crate) thread: Option<JoinHandle<()>>,
}

impl SurfaceHandle {
    pub fn sender(&self) -> &Sender<SurfaceMessage> {
        &self.sender
    }

    /// Ask the surface to close and wait for its thread to finish.
    pub(crate) fn shutdown(mut self) {
        let _ = self.sender.send(SurfaceMessage::Close);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(surface = self.id, "output surface thread panicked");
            }
        }
    }
}

/// The platform seam: enumerates displays and creates output surfaces.
pub trait DisplayHost {
    fn displays(&self) -> Vec<DisplayInfo>;

    /// Create a surface described by `spec`. The surface reports its
    /// lifecycle on `events`.
    fn create_surface(
        &mut self,
        spec: SurfaceSpec,
        events: Sender<LifecycleEvent>,
    ) -> Result<SurfaceHandle, WindowError>;
}

/// The first non-primary display when there is more than one, otherwise the
/// only (or first) display.
pub fn pick_output_display(displays: &[DisplayInfo]) -> Option<&DisplayInfo> {
    if displays.len() > 1 {
        if let Some(secondary) = displays.iter().find(|display| !display.primary) {
            return Some(secondary);
        }
    }
    displays.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(index: usize, primary: bool) -> DisplayInfo {
        DisplayInfo {
            index,
            name: format!("display-{index}"),
            primary,
        }
    }

    #[test]
    fn prefers_first_secondary() {
        let displays = vec![display(0, true), display(1, false), display(2, false)];
        assert_eq!(pick_output_display(&displays).map(|d| d.index), Some(1));
    }

    #[test]
    fn single_display_is_used() {
        let displays = vec![display(0, true)];
        assert_eq!(pick_output_display(&displays).map(|d| d.index), Some(0));
    }

    #[test]
    fn no_displays_means_none() {
        assert!(pick_output_display(&[]).is_none());
    }
}
