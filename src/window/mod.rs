//! Output surface lifecycle: display hosts, the surface thread and the
//! manager that guarantees at most one output surface at a time.

mod headless;
mod host;
mod manager;
mod render;
mod surface;
mod terminal;

pub use headless::HeadlessHost;
pub use host::{pick_output_display, DisplayHost, DisplayInfo, SurfaceHandle, SurfaceSpec, WindowError};
pub use manager::{OpenOutcome, WindowManager};
pub use render::{BufferRenderer, ProbeFrame, SurfaceProbe, SurfaceRenderer, TerminalRenderer};
pub use terminal::TerminalHost;
