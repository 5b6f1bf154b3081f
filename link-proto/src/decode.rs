//! Receive-side link framer.
//!
//! [`LinkDecoder`] turns a byte stream into report writes and control frames.
//! It is resumable: bytes may arrive in any chunking, and a frame that is only
//! partially available simply leaves the decoder mid-state until the next
//! call.
//!
//! Report bytes are not buffered. They are written straight through to an
//! [`EndpointSink`] as they arrive, mirroring how the USB endpoint FIFO on the
//! bridge side is filled, and the endpoint is committed when the frame ends.

use crate::frame::{ControlFrame, ControlKind, FrameMarker};
use crate::ring::ByteSource;
use crate::router::{self, Endpoint, Route};

/// Destination for report bytes, normally the USB device stack.
pub trait EndpointSink {
    /// Make `endpoint` the target of subsequent writes.
    fn select(&mut self, endpoint: Endpoint);

    /// Append one byte to the selected endpoint.
    fn write(&mut self, byte: u8);

    /// Hand the accumulated bytes to the host (clear the IN bank).
    fn commit(&mut self, endpoint: Endpoint);

    /// Whether `endpoint` can take another report.
    fn is_ready(&self, endpoint: Endpoint) -> bool;
}

/// Sink for links that never carry report frames towards this side.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl EndpointSink for DiscardSink {
    fn select(&mut self, _endpoint: Endpoint) {}

    fn write(&mut self, _byte: u8) {}

    fn commit(&mut self, _endpoint: Endpoint) {}

    fn is_ready(&self, _endpoint: Endpoint) -> bool {
        true
    }
}

/// Something complete came off the link.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A report frame was written to `endpoint` and committed.
    Report { id: u8, endpoint: Endpoint },
    /// A feature read or write arrived.
    Control(ControlFrame),
    /// The peer's endpoint is ready for more data.
    PeerReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum DecodeState {
    Idle,
    Length,
    ReportId,
    Payload,
}

/// What the frame currently being decoded is delivering to.
#[derive(Clone, Debug)]
enum Target {
    /// Report frame; `None` means an unknown id whose bytes are dropped.
    Report { id: u8, route: Option<Route> },
    /// Feature frame being collected. `overflow` drops it at the end.
    Control { frame: ControlFrame, overflow: bool },
}

/// Resumable frame decoder.
#[derive(Clone, Debug)]
pub struct LinkDecoder {
    state: DecodeState,
    marker: FrameMarker,
    remaining: u8,
    target: Target,
}

impl LinkDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DecodeState::Idle,
            marker: FrameMarker::Report,
            remaining: 0,
            target: Target::Report { id: 0, route: None },
        }
    }

    /// Abandon any partial frame.
    pub fn reset(&mut self) {
        self.state = DecodeState::Idle;
        self.remaining = 0;
    }

    /// `true` if no frame is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Idle
    }

    /// Drain available bytes from `source` until one event completes or the
    /// source runs dry.
    pub fn poll<B, S>(&mut self, source: &mut B, sink: &mut S) -> Option<LinkEvent>
    where
        B: ByteSource,
        S: EndpointSink,
    {
        while let Some(byte) = source.next_byte() {
            if let Some(event) = self.feed(byte, sink) {
                return Some(event);
            }
        }
        None
    }

    /// Advance the state machine by one byte.
    pub fn feed<S: EndpointSink>(&mut self, byte: u8, sink: &mut S) -> Option<LinkEvent> {
        match self.state {
            DecodeState::Idle => match FrameMarker::from_byte(byte) {
                Some(FrameMarker::Done) => Some(LinkEvent::PeerReady),
                Some(marker) => {
                    self.marker = marker;
                    self.state = DecodeState::Length;
                    None
                }
                None => None,
            },
            DecodeState::Length => {
                self.remaining = byte;
                self.state = if byte == 0 {
                    DecodeState::Idle
                } else {
                    DecodeState::ReportId
                };
                None
            }
            DecodeState::ReportId => {
                self.remaining -= 1;
                self.target = match self.marker {
                    FrameMarker::FeatureWrite => Target::Control {
                        frame: ControlFrame::new(ControlKind::Write, byte),
                        overflow: false,
                    },
                    FrameMarker::FeatureRead => Target::Control {
                        frame: ControlFrame::new(ControlKind::Read, byte),
                        overflow: false,
                    },
                    _ => {
                        let route = router::route(byte);
                        if let Some(route) = route {
                            sink.select(route.endpoint);
                            if route.forward_id {
                                sink.write(byte);
                            }
                        }
                        Target::Report { id: byte, route }
                    }
                };
                self.state = DecodeState::Payload;
                if self.remaining == 0 {
                    self.finish(sink)
                } else {
                    None
                }
            }
            DecodeState::Payload => {
                self.remaining -= 1;
                match &mut self.target {
                    Target::Report { route: Some(_), .. } => sink.write(byte),
                    Target::Report { route: None, .. } => {}
                    Target::Control { frame, overflow } => {
                        if frame.payload.push(byte).is_err() {
                            *overflow = true;
                        }
                    }
                }
                if self.remaining == 0 {
                    self.finish(sink)
                } else {
                    None
                }
            }
        }
    }

    fn finish<S: EndpointSink>(&mut self, sink: &mut S) -> Option<LinkEvent> {
        self.state = DecodeState::Idle;
        let target = core::mem::replace(&mut self.target, Target::Report { id: 0, route: None });
        match target {
            Target::Report {
                id,
                route: Some(route),
            } => {
                sink.commit(route.endpoint);
                Some(LinkEvent::Report {
                    id,
                    endpoint: route.endpoint,
                })
            }
            Target::Report { route: None, .. } => None,
            Target::Control {
                overflow: false,
                frame,
            } => Some(LinkEvent::Control(frame)),
            Target::Control { overflow: true, .. } => None,
        }
    }
}

impl Default for LinkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
