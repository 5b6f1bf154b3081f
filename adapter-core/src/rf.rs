//! Wireless transport.
//!
//! Every report goes out as one RF packet and the radio's automatic
//! acknowledgement comes back with a payload the receiver preloaded. That
//! payload is how commands reach the controller: the receiver holds one
//! pending command and attaches it to the next acknowledgement. There are no
//! sequence numbers or retries; the retransmit gate re-sends state every
//! [`crate::consts::RETRANSMIT_INTERVAL_MS`] anyway, and a duplicated or lost
//! packet is superseded by the next one.

use core::future::Future;

use heapless::Vec;
use link_proto::{
    route, ControlFrame, ControlKind, Endpoint, EndpointSink, Pairing, ReportId, RfError,
    RfPacket, MAX_RF_PACKET, MAX_RF_PAYLOAD,
};

use crate::transport::Transport;

/// Error type for radio operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// The peer never acknowledged.
    NoAck,
    /// Talking to the radio itself failed.
    Bus,
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoAck => write!(f, "no acknowledgement"),
            Self::Bus => write!(f, "radio bus error"),
        }
    }
}

/// Packet radio with payload-carrying acknowledgements (nRF24-style).
pub trait Radio {
    /// Configure the pipe addresses and enter standby.
    fn power_up(
        &mut self,
        tx_id: u32,
        rx_id: u32,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Enter the lowest power state.
    fn power_down(&mut self) -> impl Future<Output = ()>;

    /// Send one encoded packet and wait for the acknowledgement. Returns the
    /// number of ack bytes written to `ack`; zero for an empty ack.
    fn send(
        &mut self,
        packet: &[u8],
        ack: &mut [u8],
    ) -> impl Future<Output = Result<usize, RadioError>>;
}

/// Controller side of the wireless link.
pub struct RfTransport<R> {
    radio: R,
    pairing: Pairing,
    /// Command that arrived on the ack to a reply.
    queued: Option<ControlFrame>,
}

impl<R: Radio> RfTransport<R> {
    /// The radio is left as is; call [`Transport::resume`] to power it up.
    pub fn new(radio: R, pairing: Pairing) -> Self {
        Self {
            radio,
            pairing,
            queued: None,
        }
    }

    #[must_use]
    pub fn pairing(&self) -> Pairing {
        self.pairing
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    async fn exchange(&mut self, packet: &RfPacket) -> Option<ControlFrame> {
        let mut out = [0u8; MAX_RF_PACKET];
        let len = match packet.encode(&mut out) {
            Ok(len) => len,
            Err(e) => {
                warn!("rf encode failed: {}", e);
                return None;
            }
        };

        let mut ack = [0u8; MAX_RF_PACKET];
        let ack_len = match self.radio.send(&out[..len], &mut ack).await {
            Ok(0) => return None,
            Ok(n) => n.min(ack.len()),
            Err(e) => {
                warn!("rf send failed: {}", e);
                return None;
            }
        };

        let reply = match RfPacket::decode(&ack[..ack_len]) {
            Ok(reply) => reply,
            Err(e) => {
                trace!("rf ack dropped: {}", e);
                return None;
            }
        };
        if !reply.is_for(self.pairing.tx_id) {
            trace!("rf ack for {} dropped", reply.rx_id);
            return None;
        }
        reply.ack_command()
    }
}

impl<R: Radio> Transport for RfTransport<R> {
    async fn transmit(&mut self, id: ReportId, report: &[u8]) -> Option<ControlFrame> {
        let Pairing { tx_id, rx_id } = self.pairing;
        let packet = match RfPacket::report(tx_id, rx_id, id.byte(), report) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("report does not fit a packet: {}", e);
                return None;
            }
        };
        self.exchange(&packet).await
    }

    /// Replies ride on the control report id as `[cmd, payload...]`.
    async fn reply(&mut self, frame: &ControlFrame) {
        let mut body: Vec<u8, MAX_RF_PAYLOAD> = Vec::new();
        if body.push(frame.cmd).is_err() || body.extend_from_slice(&frame.payload).is_err() {
            warn!("reply does not fit a packet");
            return;
        }
        let Pairing { tx_id, rx_id } = self.pairing;
        let packet = match RfPacket::report(tx_id, rx_id, ReportId::Control.byte(), &body) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("reply does not fit a packet: {}", e);
                return;
            }
        };
        if let Some(next) = self.exchange(&packet).await {
            self.queued = Some(next);
        }
    }

    fn poll_command(&mut self) -> Option<ControlFrame> {
        self.queued.take()
    }

    async fn suspend(&mut self) {
        debug!("rf power down");
        self.radio.power_down().await;
    }

    async fn resume(&mut self) {
        debug!("rf power up, tx {} rx {}", self.pairing.tx_id, self.pairing.rx_id);
        if let Err(e) = self.radio.power_up(self.pairing.tx_id, self.pairing.rx_id).await {
            warn!("rf power up failed: {}", e);
        }
    }
}

/// What an accepted packet carried.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// A report, written to `endpoint` and committed.
    Report { id: u8, endpoint: Endpoint },
    /// A command reply from the controller.
    Reply(ControlFrame),
}

/// Bridge side of the wireless link.
///
/// Holds a single pending command; queuing another replaces it.
pub struct RfReceiver {
    pairing: Pairing,
    pending: Option<ControlFrame>,
}

impl RfReceiver {
    /// `pairing` is this node's view: its own id first.
    #[must_use]
    pub const fn new(pairing: Pairing) -> Self {
        Self {
            pairing,
            pending: None,
        }
    }

    /// Queue a command for the next acknowledgement.
    ///
    /// # Errors
    ///
    /// [`RfError::PayloadTooLong`] if it cannot fit in an ack.
    pub fn queue(&mut self, frame: ControlFrame) -> Result<(), RfError> {
        RfPacket::ack(self.pairing.tx_id, self.pairing.rx_id, &frame)?;
        if self.pending.replace(frame).is_some() {
            debug!("pending rf command replaced");
        }
        Ok(())
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Encode the acknowledgement to preload for the next packet, taking the
    /// pending command if there is one.
    ///
    /// # Errors
    ///
    /// [`RfError::BufferTooSmall`] if `buf` cannot hold the ack.
    pub fn ack_packet(&mut self, buf: &mut [u8]) -> Result<usize, RfError> {
        let packet = match &self.pending {
            Some(frame) => RfPacket::ack(self.pairing.tx_id, self.pairing.rx_id, frame)?,
            None => RfPacket::empty(self.pairing.tx_id, self.pairing.rx_id),
        };
        let len = packet.encode(buf)?;
        self.pending = None;
        Ok(len)
    }

    /// Accept a received packet. Packets addressed elsewhere, malformed
    /// packets and unknown report ids produce nothing.
    pub fn receive<S: EndpointSink>(&mut self, bytes: &[u8], sink: &mut S) -> Option<Received> {
        let packet = RfPacket::decode(bytes).ok()?;
        if !packet.is_for(self.pairing.tx_id) {
            trace!("rf packet for {} dropped", packet.rx_id);
            return None;
        }
        let (&id, body) = packet.payload.split_first()?;

        if id == ReportId::Control.byte() {
            let (&cmd, data) = body.split_first()?;
            return ControlFrame::with_payload(ControlKind::Read, cmd, data).map(Received::Reply);
        }

        let route = route(id)?;
        sink.select(route.endpoint);
        if route.forward_id {
            sink.write(id);
        }
        for &b in body {
            sink.write(b);
        }
        sink.commit(route.endpoint);
        Some(Received::Report {
            id,
            endpoint: route.endpoint,
        })
    }
}
