use std::collections::HashMap;
use std::io;
use std::sync::mpsc::Sender;

use super::host::{DisplayHost, DisplayInfo, SurfaceHandle, SurfaceSpec, WindowError};
use super::render::{BufferRenderer, SurfaceProbe};
use super::surface::spawn_surface;
use crate::transport::{LifecycleEvent, SurfaceId, SurfaceMessage};

const DEFAULT_COLUMNS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// A display host with virtual displays. Surfaces draw into memory buffers
/// that can be inspected through their probes.
#[derive(Debug)]
pub struct HeadlessHost {
    displays: Vec<DisplayInfo>,
    columns: u16,
    rows: u16,
    probes: HashMap<SurfaceId, SurfaceProbe>,
    // Second handle on each surface inbox, used to close it behind the
    // manager's back the way a window manager would.
    backdoors: HashMap<SurfaceId, Sender<SurfaceMessage>>,
    placements: Vec<(SurfaceId, usize)>,
    fail_next: bool,
}

impl HeadlessHost {
    /// `count` virtual displays; the first one is primary.
    pub fn new(count: usize) -> Self {
        let displays = (0..count)
            .map(|index| DisplayInfo {
                index,
                name: format!("virtual-{index}"),
                primary: index == 0,
            })
            .collect();
        Self {
            displays,
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            probes: HashMap::new(),
            backdoors: HashMap::new(),
            placements: Vec::new(),
            fail_next: false,
        }
    }

    pub fn with_size(mut self, columns: u16, rows: u16) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    pub fn probe(&self, id: SurfaceId) -> Option<SurfaceProbe> {
        self.probes.get(&id).cloned()
    }

    /// Probe of the most recently created surface.
    pub fn latest_probe(&self) -> Option<SurfaceProbe> {
        let (id, _) = self.placements.last()?;
        self.probe(*id)
    }

    /// Surfaces created so far, with the display index each landed on.
    pub fn placements(&self) -> &[(SurfaceId, usize)] {
        &self.placements
    }

    /// Close a surface as if the user closed its window. Returns `false`
    /// when the surface is unknown or already gone.
    pub fn close_externally(&mut self, id: SurfaceId) -> bool {
        self.backdoors
            .remove(&id)
            .is_some_and(|backdoor| backdoor.send(SurfaceMessage::Close).is_ok())
    }

    /// Make the next `create_surface` call fail with a host error.
    pub fn fail_next_surface(&mut self) {
        self.fail_next = true;
    }
}

impl DisplayHost for HeadlessHost {
    fn displays(&self) -> Vec<DisplayInfo> {
        self.displays.clone()
    }

    fn create_surface(
        &mut self,
        spec: SurfaceSpec,
        events: Sender<LifecycleEvent>,
    ) -> Result<SurfaceHandle, WindowError> {
        let display = spec.display.name.clone();
        if std::mem::take(&mut self.fail_next) {
            return Err(WindowError::Host {
                display,
                source: io::Error::other("simulated surface failure"),
            });
        }

        let probe = SurfaceProbe::default();
        let handle = BufferRenderer::new(self.columns, self.rows, probe.clone())
            .and_then(|renderer| spawn_surface(&spec, Box::new(renderer), events))
            .map_err(|source| WindowError::Host { display, source })?;

        self.probes.insert(spec.id, probe);
        self.backdoors.insert(spec.id, handle.sender().clone());
        self.placements.push((spec.id, spec.display.index));
        Ok(handle)
    }
}
