// #![warn(missing_docs)]

//! Streaming websocket wire-protocol engine.
//!
//! This crate owns the [RFC 6455](https://datatracker.ietf.org/doc/html/rfc6455)
//! wire format and nothing else: the host application owns the socket, the
//! buffers and the event loop, and feeds received bytes to
//! [`engine::consume`] in whatever chunks the transport produced. The engine
//! reassembles frame boundaries across chunks, unmasks payloads in place,
//! and hands every payload slice to an [`engine::FrameHandler`].
//!
//! Outbound frames are built with [`frame::format_message`].
//!
//! The engine never allocates and never blocks. Per-connection progress
//! lives in a caller-owned [`engine::ConnState`].

mod bleed;

pub mod close;
pub mod engine;
pub mod error;
pub mod frame;
pub mod role;
pub mod utf8;
