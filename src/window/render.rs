use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::presentation::{render_presentation, PresentationState};

/// Draws presentation state somewhere. Implementations run on the output
/// surface thread.
pub trait SurfaceRenderer: Send {
    fn render(&mut self, state: &PresentationState) -> io::Result<()>;

    /// Called once when the surface is going away.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// What a headless surface last drew.
#[derive(Debug, Clone, Default)]
pub struct ProbeFrame {
    pub state: PresentationState,
    pub screen: String,
    pub renders: u64,
    pub closed: bool,
}

/// Shared view into a headless surface, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct SurfaceProbe {
    inner: Arc<(Mutex<ProbeFrame>, Condvar)>,
}

impl SurfaceProbe {
    pub fn snapshot(&self) -> ProbeFrame {
        let (lock, _) = &*self.inner;
        lock.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Block until `accept` holds for the latest frame or `timeout` elapses.
    pub fn wait_until(
        &self,
        timeout: Duration,
        accept: impl Fn(&ProbeFrame) -> bool,
    ) -> Option<ProbeFrame> {
        let (lock, signal) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |frame| !accept(frame))
            .unwrap_or_else(PoisonError::into_inner);
        accept(&guard).then(|| guard.clone())
    }

    fn update(&self, change: impl FnOnce(&mut ProbeFrame)) {
        let (lock, signal) = &*self.inner;
        let mut frame = lock.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut frame);
        signal.notify_all();
    }
}

/// Renders into an in-memory buffer and publishes each frame to a probe.
pub struct BufferRenderer {
    terminal: Terminal<TestBackend>,
    probe: SurfaceProbe,
}

impl BufferRenderer {
    pub fn new(columns: u16, rows: u16, probe: SurfaceProbe) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(TestBackend::new(columns, rows))?,
            probe,
        })
    }
}

impl SurfaceRenderer for BufferRenderer {
    fn render(&mut self, state: &PresentationState) -> io::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            render_presentation(frame, area, state);
        })?;

        let buffer = self.terminal.backend().buffer();
        let width = usize::from(buffer.area.width.max(1));
        let screen = buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        self.probe.update(|frame| {
            frame.state = state.clone();
            frame.screen = screen;
            frame.renders += 1;
        });
        Ok(())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.probe.update(|frame| frame.closed = true);
        Ok(())
    }
}

/// Renders full-screen onto a separate terminal device such as `/dev/pts/3`.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<File>>,
}

impl TerminalRenderer {
    /// The device size is not queried because crossterm would ask the
    /// control terminal; it comes from configuration instead.
    pub fn open(path: &Path, columns: u16, rows: u16) -> io::Result<Self> {
        let mut device = OpenOptions::new().read(true).write(true).open(path)?;
        execute!(device, EnterAlternateScreen, Hide)?;
        let terminal = Terminal::with_options(
            CrosstermBackend::new(device),
            TerminalOptions {
                viewport: Viewport::Fixed(Rect::new(0, 0, columns, rows)),
            },
        )?;
        Ok(Self { terminal })
    }
}

impl SurfaceRenderer for TerminalRenderer {
    fn render(&mut self, state: &PresentationState) -> io::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            render_presentation(frame, area, state);
        })?;
        Ok(())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::PresentationPayload;
    use std::thread;

    #[test]
    fn buffer_renderer_publishes_frames() {
        let probe = SurfaceProbe::default();
        let mut renderer = BufferRenderer::new(30, 5, probe.clone()).unwrap();
        let mut state = PresentationState::new();
        state.apply(PresentationPayload::present("Holy holy holy", None));
        renderer.render(&state).unwrap();

        let frame = probe.snapshot();
        assert_eq!(frame.renders, 1);
        assert!(frame.screen.contains("Holy holy holy"));
        assert_eq!(frame.state.text(), Some("Holy holy holy"));

        renderer.shutdown().unwrap();
        assert!(probe.snapshot().closed);
    }

    #[test]
    fn wait_until_wakes_on_update() {
        let probe = SurfaceProbe::default();
        let writer = probe.clone();
        let handle = thread::spawn(move || writer.update(|frame| frame.renders = 7));

        let frame = probe.wait_until(Duration::from_secs(5), |frame| frame.renders == 7);
        handle.join().unwrap();
        assert_eq!(frame.map(|f| f.renders), Some(7));
    }

    #[test]
    fn wait_until_times_out() {
        let probe = SurfaceProbe::default();
        assert!(probe
            .wait_until(Duration::from_millis(20), |frame| frame.closed)
            .is_none());
    }
}
