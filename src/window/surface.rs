use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::host::{SurfaceHandle, SurfaceSpec};
use super::render::SurfaceRenderer;
use crate::presentation::PresentationState;
use crate::transport::{LifecycleEvent, SurfaceId, SurfaceMessage};

/// Start the output surface loop on its own thread. The surface owns its
/// presentation state, which always starts idle.
pub(crate) fn spawn_surface(
    spec: &SurfaceSpec,
    renderer: Box<dyn SurfaceRenderer>,
    events: Sender<LifecycleEvent>,
) -> io::Result<SurfaceHandle> {
    let (sender, inbox) = mpsc::channel();
    let id = spec.id;
    tracing::info!(
        surface = id,
        display = %spec.display.name,
        borderless = spec.borderless,
        fullscreen = spec.fullscreen,
        "creating output surface"
    );

    let thread = thread::Builder::new()
        .name(format!("output-surface-{id}"))
        .spawn(move || run_surface(id, renderer, inbox, events))?;

    Ok(SurfaceHandle {
        id,
        display: spec.display.index,
        sender,
        thread: Some(thread),
    })
}

fn run_surface(
    id: SurfaceId,
    mut renderer: Box<dyn SurfaceRenderer>,
    inbox: Receiver<SurfaceMessage>,
    events: Sender<LifecycleEvent>,
) {
    let mut state = PresentationState::new();
    let _ = events.send(LifecycleEvent::Created(id));

    if let Err(err) = renderer.render(&state) {
        tracing::error!(surface = id, error = %err, "initial render failed");
    } else {
        'surface: while let Ok(message) = inbox.recv() {
            let mut pending = Some(message);
            // Apply everything already queued, then draw once.
            while let Some(message) = pending.take() {
                match message {
                    SurfaceMessage::Payload(payload) => state.apply(payload),
                    SurfaceMessage::Close => break 'surface,
                }
                pending = inbox.try_recv().ok();
            }
            if let Err(err) = renderer.render(&state) {
                tracing::error!(surface = id, error = %err, "render failed, closing surface");
                break;
            }
        }
    }

    if let Err(err) = renderer.shutdown() {
        tracing::warn!(surface = id, error = %err, "surface teardown failed");
    }
    tracing::info!(surface = id, "output surface closed");
    let _ = events.send(LifecycleEvent::Destroyed(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::PresentationPayload;
    use crate::window::host::DisplayInfo;
    use crate::window::render::{BufferRenderer, SurfaceProbe};
    use std::time::Duration;

    fn spec() -> SurfaceSpec {
        SurfaceSpec {
            id: 9,
            display: DisplayInfo {
                index: 0,
                name: "virtual-0".to_string(),
                primary: true,
            },
            borderless: true,
            fullscreen: true,
        }
    }

    #[test]
    fn surface_reports_lifecycle_and_applies_payloads() {
        let probe = SurfaceProbe::default();
        let renderer = BufferRenderer::new(40, 6, probe.clone()).unwrap();
        let (events_tx, events_rx) = mpsc::channel();
        let handle = spawn_surface(&spec(), Box::new(renderer), events_tx).unwrap();

        handle
            .sender()
            .send(SurfaceMessage::Payload(PresentationPayload::present(
                "Be still my soul",
                None,
            )))
            .unwrap();
        let frame = probe
            .wait_until(Duration::from_secs(5), |f| f.state.text() == Some("Be still my soul"))
            .unwrap();
        assert!(frame.screen.contains("Be still my soul"));

        handle.shutdown();
        let events: Vec<_> = events_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![LifecycleEvent::Created(9), LifecycleEvent::Destroyed(9)]
        );
        assert!(probe.snapshot().closed);
    }

    #[test]
    fn queued_payloads_end_on_the_last_one() {
        let probe = SurfaceProbe::default();
        let renderer = BufferRenderer::new(40, 6, probe.clone()).unwrap();
        let (events_tx, _events_rx) = mpsc::channel();
        let handle = spawn_surface(&spec(), Box::new(renderer), events_tx).unwrap();

        for text in ["one", "two", "three"] {
            handle
                .sender()
                .send(SurfaceMessage::Payload(PresentationPayload::present(text, None)))
                .unwrap();
        }
        handle
            .sender()
            .send(SurfaceMessage::Payload(PresentationPayload::blackout()))
            .unwrap();

        let frame = probe
            .wait_until(Duration::from_secs(5), |f| f.state.is_blacked_out())
            .unwrap();
        assert_eq!(
            frame.state.current_payload(),
            Some(&PresentationPayload::blackout())
        );
        handle.shutdown();
    }
}
