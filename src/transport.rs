//! One-way delivery of presentation payloads from the control surface to the
//! output surface, plus the lifecycle back-channel the output surface uses to
//! report when it appears and disappears.

use std::sync::mpsc::Sender;

use crate::presentation::PresentationPayload;

pub type SurfaceId = u64;

/// What an output surface can receive.
#[derive(Debug, Clone)]
pub enum SurfaceMessage {
    Payload(PresentationPayload),
    Close,
}

/// Reported by output surfaces on the back-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(SurfaceId),
    Destroyed(SurfaceId),
}

/// Outcome of a send. A dropped payload is not an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Dropped,
}

/// Sender side of the payload channel. Delivery is at-most-once and FIFO;
/// nothing is acknowledged.
#[derive(Debug, Default)]
pub struct Channel {
    queued: u64,
    dropped: u64,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `payload` for `target`. No target, or a target whose receiver
    /// is gone, drops the payload.
    pub fn send(
        &mut self,
        target: Option<&Sender<SurfaceMessage>>,
        payload: PresentationPayload,
    ) -> Delivery {
        let kind = payload.kind();
        let Some(target) = target else {
            self.dropped += 1;
            tracing::debug!(?kind, "no output surface, payload dropped");
            return Delivery::Dropped;
        };

        match target.send(SurfaceMessage::Payload(payload)) {
            Ok(()) => {
                self.queued += 1;
                tracing::trace!(?kind, "payload queued");
                Delivery::Queued
            }
            Err(_) => {
                self.dropped += 1;
                tracing::warn!(?kind, "output surface went away, payload dropped");
                Delivery::Dropped
            }
        }
    }

    pub fn queued(&self) -> u64 {
        self.queued
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn send_without_target_is_dropped() {
        let mut channel = Channel::new();
        assert_eq!(
            channel.send(None, PresentationPayload::clear()),
            Delivery::Dropped
        );
        assert_eq!(channel.dropped(), 1);
    }

    #[test]
    fn payloads_arrive_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut channel = Channel::new();
        channel.send(Some(&tx), PresentationPayload::present("one", None));
        channel.send(Some(&tx), PresentationPayload::blackout());
        channel.send(Some(&tx), PresentationPayload::present("two", None));

        let texts: Vec<_> = rx
            .try_iter()
            .map(|message| match message {
                SurfaceMessage::Payload(payload) => payload.text().map(str::to_string),
                SurfaceMessage::Close => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![Some("one".to_string()), None, Some("two".to_string())]
        );
        assert_eq!(channel.queued(), 3);
    }

    #[test]
    fn disconnected_receiver_drops() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut channel = Channel::new();
        assert_eq!(
            channel.send(Some(&tx), PresentationPayload::present("late", None)),
            Delivery::Dropped
        );
    }
}
