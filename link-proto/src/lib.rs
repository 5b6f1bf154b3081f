//! Wire protocol for the controller link.
//!
//! One ordered byte channel (a UART between the two MCUs, or a radio link to
//! a wireless peer) carries several HID report streams plus a feature-report
//! control channel. This crate holds everything both ends agree on:
//!
//! - **Framing**: [`LinkDecoder`] (resumable receive state machine) and
//!   [`encode_report`] / [`encode_control`] / [`encode_done`] on the send side
//! - **Routing**: [`route`] maps a report id to its USB [`Endpoint`]
//! - **Receive ring**: [`SharedRing`] hands bytes from the UART producer to the
//!   framer
//! - **RF packets**: [`RfPacket`] with its address header and piggybacked ack
//! - **Pairing**: [`Pairing`] ids derived from the chip unique id
//!
//! # Frame Format
//!
//! ```text
//! <marker> <length> <id> <payload...>
//! ```
//!
//! | marker | byte | id is |
//! |--------|------|-------|
//! | Report | `0x7E` | report id |
//! | FeatureWrite | `0x7D` | command opcode |
//! | FeatureRead | `0x7C` | command opcode |
//! | Done | `0x7F` | (bare byte, no header) |
//!
//! `length` counts the id byte and the payload.
//!
//! # Example
//!
//! ```
//! use link_proto::{encode_report, DiscardSink, LinkDecoder, LinkEvent, Endpoint, ReportId, Ring};
//!
//! let mut buf = [0u8; link_proto::MAX_FRAME_LEN];
//! let len = encode_report(ReportId::Midi, &[0x09, 0x90, 60, 127], &mut buf).unwrap();
//!
//! let mut ring: Ring<64> = Ring::new();
//! for &b in &buf[..len] {
//!     ring.push(b);
//! }
//!
//! let mut decoder = LinkDecoder::new();
//! let event = decoder.poll(&mut ring, &mut DiscardSink);
//! assert_eq!(event, Some(LinkEvent::Report { id: 5, endpoint: Endpoint::Midi }));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`embedded-io`**: Enable `write_*` helpers for I/O peripherals

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod decode;
pub mod encode;
pub mod frame;
pub mod pairing;
pub mod rf;
pub mod ring;
pub mod router;

pub use decode::{DiscardSink, EndpointSink, LinkDecoder, LinkEvent};
#[cfg(feature = "embedded-io")]
pub use encode::{write_control, write_done, write_report};
pub use encode::{encode_control, encode_done, encode_frame, encode_report, EncodeError};
pub use frame::{
    ControlFrame, ControlKind, FrameMarker, ReportId, FRAME_HEADER_LEN, MAX_CONTROL_PAYLOAD,
    MAX_FRAME_LEN, MAX_REPORT_PAYLOAD,
};
pub use pairing::{derive_id, Pairing};
pub use rf::{RfError, RfPacket, MAX_ACK_DATA, MAX_RF_PACKET, MAX_RF_PAYLOAD, RF_HEADER_LEN};
pub use ring::{ByteSource, Ring, SharedRing};
pub use router::{route, route_of, Endpoint, Route};
