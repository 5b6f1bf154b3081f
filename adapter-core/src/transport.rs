//! Link transports.
//!
//! [`Transport`] is what the controller's poll loop talks to: it sends a
//! report and hands back any command the peer queued for it. [`WiredLink`]
//! implements it over the UART to the USB bridge; the radio version lives in
//! [`crate::rf`]. [`ReportRelay`] is the bridge end of the wired link.

use core::future::Future;

use embedded_io::Write;
use link_proto::{
    write_control, write_done, write_report, ByteSource, ControlFrame, DiscardSink, EncodeError,
    Endpoint, EndpointSink, LinkDecoder, LinkEvent, ReportId, SharedRing,
};

/// The controller's view of the link to the USB side.
pub trait Transport {
    /// Send one report. Returns a command the peer had pending, if any.
    fn transmit(
        &mut self,
        id: ReportId,
        report: &[u8],
    ) -> impl Future<Output = Option<ControlFrame>>;

    /// Send a command reply back to the peer.
    fn reply(&mut self, frame: &ControlFrame) -> impl Future<Output = ()>;

    /// A command that arrived without a transmission, for links where the
    /// peer can talk first.
    fn poll_command(&mut self) -> Option<ControlFrame> {
        None
    }

    /// Power the link down before sleeping.
    fn suspend(&mut self) -> impl Future<Output = ()> {
        async {}
    }

    /// Bring the link back after [`Transport::suspend`].
    fn resume(&mut self) -> impl Future<Output = ()> {
        async {}
    }
}

/// Wired link: frames out through a blocking writer, frames in through the
/// receive ring filled by the UART.
///
/// Reports from the controller are not gated on the bridge's ready marker;
/// the ring only carries feature frames and [`LinkEvent::PeerReady`] in this
/// direction.
pub struct WiredLink<'a, W, const N: usize> {
    rx: &'a SharedRing<N>,
    tx: W,
    decoder: LinkDecoder,
    peer_ready: bool,
}

impl<'a, W: Write, const N: usize> WiredLink<'a, W, N> {
    pub fn new(rx: &'a SharedRing<N>, tx: W) -> Self {
        Self {
            rx,
            tx,
            decoder: LinkDecoder::new(),
            peer_ready: false,
        }
    }

    /// Whether the bridge has signalled readiness since the last report.
    #[must_use]
    pub fn peer_ready(&self) -> bool {
        self.peer_ready
    }

    pub fn writer(&self) -> &W {
        &self.tx
    }

    fn drain(&mut self) -> Option<ControlFrame> {
        let mut rx = self.rx;
        while let Some(event) = self.decoder.poll(&mut rx, &mut DiscardSink) {
            match event {
                LinkEvent::Control(frame) => return Some(frame),
                LinkEvent::PeerReady => self.peer_ready = true,
                LinkEvent::Report { id, .. } => trace!("ignoring report {} from bridge", id),
            }
        }
        None
    }
}

impl<W: Write, const N: usize> Transport for WiredLink<'_, W, N> {
    async fn transmit(&mut self, id: ReportId, report: &[u8]) -> Option<ControlFrame> {
        if let Err(e) = write_report(&mut self.tx, id, report) {
            warn!("report write failed: {}", e);
        }
        self.peer_ready = false;
        self.drain()
    }

    async fn reply(&mut self, frame: &ControlFrame) {
        if let Err(e) = write_control(&mut self.tx, frame) {
            warn!("reply write failed: {}", e);
        }
    }

    fn poll_command(&mut self) -> Option<ControlFrame> {
        self.drain()
    }
}

/// Bridge end of the wired link.
///
/// Reports are decoded straight into the USB endpoints. After a report, the
/// relay watches the endpoint that received it and sends the ready marker
/// once the host has taken the data and no frame is half-received. Replies
/// from the controller are kept for the host's next GET_REPORT.
///
/// A fresh relay already watches `endpoint`, so the controller gets its first
/// ready marker as soon as USB is up.
pub struct ReportRelay<S, W> {
    sink: S,
    tx: W,
    decoder: LinkDecoder,
    awaiting: Option<Endpoint>,
    last_reply: Option<ControlFrame>,
}

impl<S: EndpointSink, W: Write> ReportRelay<S, W> {
    pub fn new(sink: S, tx: W, endpoint: Endpoint) -> Self {
        Self {
            sink,
            tx,
            decoder: LinkDecoder::new(),
            awaiting: Some(endpoint),
            last_reply: None,
        }
    }

    /// Drain `source`, relaying everything that completed. Returns the
    /// number of reports delivered.
    pub fn poll<B: ByteSource>(&mut self, source: &mut B) -> usize {
        let mut reports = 0;
        while let Some(event) = self.decoder.poll(source, &mut self.sink) {
            match event {
                LinkEvent::Report { endpoint, .. } => {
                    self.awaiting = Some(endpoint);
                    reports += 1;
                }
                LinkEvent::Control(frame) => self.last_reply = Some(frame),
                LinkEvent::PeerReady => {}
            }
        }

        if let Some(endpoint) = self.awaiting {
            if self.decoder.is_idle() && self.sink.is_ready(endpoint) {
                match write_done(&mut self.tx) {
                    Ok(()) => self.awaiting = None,
                    Err(e) => warn!("ready marker write failed: {}", e),
                }
            }
        }
        reports
    }

    /// Pass a host feature request to the controller.
    ///
    /// # Errors
    ///
    /// [`EncodeError`] if the frame cannot be written.
    pub fn forward(&mut self, frame: &ControlFrame) -> Result<(), EncodeError> {
        write_control(&mut self.tx, frame)
    }

    /// Most recent reply from the controller.
    #[must_use]
    pub fn last_reply(&self) -> Option<&ControlFrame> {
        self.last_reply.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn writer(&self) -> &W {
        &self.tx
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testutil::block_on;
    use core::convert::Infallible;
    use link_proto::{encode_control, encode_report, ControlKind, FrameMarker, MAX_FRAME_LEN};
    use std::vec::Vec;

    #[derive(Default)]
    struct VecWriter(Vec<u8>);

    impl embedded_io::ErrorType for VecWriter {
        type Error = Infallible;
    }

    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// USB endpoints that collect committed reports and can be held busy.
    #[derive(Default)]
    struct MockUsb {
        current: Vec<u8>,
        committed: Vec<(Endpoint, Vec<u8>)>,
        busy: bool,
    }

    impl EndpointSink for MockUsb {
        fn select(&mut self, _endpoint: Endpoint) {
            self.current.clear();
        }

        fn write(&mut self, byte: u8) {
            self.current.push(byte);
        }

        fn commit(&mut self, endpoint: Endpoint) {
            self.committed.push((endpoint, core::mem::take(&mut self.current)));
        }

        fn is_ready(&self, _endpoint: Endpoint) -> bool {
            !self.busy
        }
    }

    fn push_control(ring: &SharedRing<64>, frame: &ControlFrame) {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_control(frame, &mut buf).unwrap();
        ring.push_slice(&buf[..len]);
    }

    #[test]
    fn test_wired_transmit_writes_frame_and_returns_command() {
        let ring = SharedRing::<64>::new();
        let mut link = WiredLink::new(&ring, VecWriter::default());
        let cmd = ControlFrame::with_payload(ControlKind::Write, 0x35, &[4]).unwrap();
        ring.push(FrameMarker::Done.byte());
        push_control(&ring, &cmd);

        let got = block_on(link.transmit(ReportId::XInput, &[1, 2, 3]));
        assert_eq!(got, Some(cmd));
        assert!(link.peer_ready());
        assert_eq!(link.writer().0, [0x7E, 4, 1, 1, 2, 3]);
        assert_eq!(link.poll_command(), None);
    }

    #[test]
    fn test_wired_command_split_across_polls() {
        let ring = SharedRing::<64>::new();
        let mut link = WiredLink::new(&ring, VecWriter::default());
        let cmd = ControlFrame::with_payload(ControlKind::Read, 0x32, &[0, 0, 8]).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_control(&cmd, &mut buf).unwrap();

        ring.push_slice(&buf[..2]);
        assert_eq!(link.poll_command(), None);
        ring.push_slice(&buf[2..len]);
        assert_eq!(link.poll_command(), Some(cmd));
    }

    #[test]
    fn test_wired_reply_is_feature_read() {
        let ring = SharedRing::<64>::new();
        let mut link = WiredLink::new(&ring, VecWriter::default());
        let reply = ControlFrame::with_payload(ControlKind::Read, 0x32, &[0, 9]).unwrap();
        block_on(link.reply(&reply));
        assert_eq!(link.writer().0, [0x7C, 3, 0x32, 0, 9]);
    }

    #[test]
    fn test_relay_sends_done_when_endpoint_ready() {
        let mut usb = MockUsb::default();
        usb.busy = true;
        let mut relay = ReportRelay::new(usb, VecWriter::default(), Endpoint::Hid);
        let mut rx = link_proto::Ring::<128>::new();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_report(ReportId::Gamepad, &[5, 6], &mut buf).unwrap();
        for &b in &buf[..len] {
            rx.push(b);
        }

        assert_eq!(relay.poll(&mut rx), 1);
        // Gamepad reports go out without their id byte.
        assert_eq!(relay.sink().committed, [(Endpoint::Hid, std::vec![5, 6])]);
        assert!(relay.writer().0.is_empty());

        relay.sink_mut().busy = false;
        assert_eq!(relay.poll(&mut rx), 0);
        assert_eq!(relay.writer().0, [FrameMarker::Done.byte()]);
        // Only once per report.
        relay.poll(&mut rx);
        assert_eq!(relay.writer().0.len(), 1);
    }

    #[test]
    fn test_relay_holds_done_mid_frame() {
        let mut usb = MockUsb::default();
        usb.busy = true;
        let mut relay = ReportRelay::new(usb, VecWriter::default(), Endpoint::XInput);
        let mut rx = link_proto::Ring::<128>::new();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_report(ReportId::XInput, &[0x00, 0x14, 7], &mut buf).unwrap();
        for &b in &buf[..len] {
            rx.push(b);
        }
        // Start of the next frame.
        rx.push(FrameMarker::Report.byte());
        relay.sink_mut().busy = false;

        assert_eq!(relay.poll(&mut rx), 1);
        assert!(relay.writer().0.is_empty());
    }

    #[test]
    fn test_relay_caches_reply_and_forwards_requests() {
        let mut relay = ReportRelay::new(MockUsb::default(), VecWriter::default(), Endpoint::XInput);
        let mut rx = link_proto::Ring::<128>::new();
        let reply = ControlFrame::with_payload(ControlKind::Read, 0x32, &[0, 1, 2]).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_control(&reply, &mut buf).unwrap();
        for &b in &buf[..len] {
            rx.push(b);
        }
        relay.poll(&mut rx);
        assert_eq!(relay.last_reply(), Some(&reply));

        // The idle link got its startup ready marker.
        assert_eq!(relay.writer().0, [FrameMarker::Done.byte()]);

        let request = ControlFrame::new(ControlKind::Write, 0x30);
        relay.forward(&request).unwrap();
        let read = ControlFrame::with_payload(ControlKind::Read, 0x32, &[0, 0, 4]).unwrap();
        relay.forward(&read).unwrap();
        assert_eq!(
            relay.writer().0,
            [0x7F, 0x7D, 1, 0x30, 0x7C, 4, 0x32, 0, 0, 4]
        );
    }

    #[test]
    fn test_fresh_relay_sends_done_once_usb_is_ready() {
        let mut usb = MockUsb::default();
        usb.busy = true;
        let mut relay = ReportRelay::new(usb, VecWriter::default(), Endpoint::XInput);
        let mut rx = link_proto::Ring::<128>::new();

        assert_eq!(relay.poll(&mut rx), 0);
        assert!(relay.writer().0.is_empty());

        relay.sink_mut().busy = false;
        relay.poll(&mut rx);
        assert_eq!(relay.writer().0, [FrameMarker::Done.byte()]);
        relay.poll(&mut rx);
        relay.poll(&mut rx);
        assert_eq!(relay.writer().0.len(), 1);
    }

    #[test]
    fn test_relay_xinput_report_reaches_host_unprefixed() {
        let mut relay = ReportRelay::new(MockUsb::default(), VecWriter::default(), Endpoint::XInput);
        let mut rx = link_proto::Ring::<128>::new();
        let mut report = [0u8; 20];
        report[1] = 0x14;
        report[2] = 0x10;
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_report(ReportId::XInput, &report, &mut buf).unwrap();
        for &b in &buf[..len] {
            rx.push(b);
        }

        assert_eq!(relay.poll(&mut rx), 1);
        let (endpoint, bytes) = &relay.sink().committed[0];
        assert_eq!(*endpoint, Endpoint::XInput);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..3], &[0x00, 0x14, 0x10]);
    }
}
