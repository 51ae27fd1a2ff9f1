use std::sync::mpsc::Sender;

use super::host::{DisplayHost, DisplayInfo, SurfaceHandle, SurfaceSpec, WindowError};
use super::render::{BufferRenderer, SurfaceProbe, SurfaceRenderer, TerminalRenderer};
use super::surface::spawn_surface;
use crate::config::DisplayConfig;
use crate::transport::LifecycleEvent;

const PRIMARY_COLUMNS: u16 = 80;
const PRIMARY_ROWS: u16 = 24;

/// Display host for terminal sessions.
///
/// Display 0 is the control terminal. The control UI owns it, so a surface
/// placed there renders off-screen and only shows up in the preview pane.
/// Every configured terminal device is an extra, non-primary display.
pub struct TerminalHost {
    outputs: Vec<DisplayConfig>,
    primary_probe: SurfaceProbe,
}

impl TerminalHost {
    pub fn new(outputs: Vec<DisplayConfig>) -> Self {
        Self {
            outputs,
            primary_probe: SurfaceProbe::default(),
        }
    }
}

impl DisplayHost for TerminalHost {
    fn displays(&self) -> Vec<DisplayInfo> {
        let primary = DisplayInfo {
            index: 0,
            name: "control terminal".to_string(),
            primary: true,
        };
        std::iter::once(primary)
            .chain(self.outputs.iter().enumerate().map(|(idx, output)| DisplayInfo {
                index: idx + 1,
                name: output.path.display().to_string(),
                primary: false,
            }))
            .collect()
    }

    fn create_surface(
        &mut self,
        spec: SurfaceSpec,
        events: Sender<LifecycleEvent>,
    ) -> Result<SurfaceHandle, WindowError> {
        let display = spec.display.name.clone();
        let renderer: Box<dyn SurfaceRenderer> = match spec.display.index.checked_sub(1) {
            None => Box::new(
                BufferRenderer::new(PRIMARY_COLUMNS, PRIMARY_ROWS, self.primary_probe.clone())
                    .map_err(|source| WindowError::Host {
                        display: display.clone(),
                        source,
                    })?,
            ),
            Some(idx) => {
                let output = self.outputs.get(idx).ok_or(WindowError::NoDisplay)?;
                Box::new(
                    TerminalRenderer::open(&output.path, output.columns, output.rows).map_err(
                        |source| WindowError::Host {
                            display: display.clone(),
                            source,
                        },
                    )?,
                )
            }
        };

        spawn_surface(&spec, renderer, events).map_err(|source| WindowError::Host { display, source })
    }
}
