//! Utilities for exercising `h4frame` transports in tests.
//!
//! [`MockDriver`] stands in for a serial driver: it records every read and
//! write request and lets a test inject completions. [`RecordingHandler`]
//! captures the packets a transport delivers upward, and [`feed_stream`]
//! pushes raw controller bytes through a transport in exactly the chunk
//! sizes it asks for.
//!
//! ```rust
//! use h4frame::{H4Transport, HciTransport, PacketType, TransportConfig};
//! use h4frame_testing::{MockDriver, RecordingHandler, feed_stream};
//!
//! let mut transport = H4Transport::new(MockDriver::default());
//! let handler = RecordingHandler::default();
//! transport.init(Some(&TransportConfig::uart(115_200))).unwrap();
//! transport.register_packet_handler(Box::new(handler.clone()));
//! transport.open().unwrap();
//!
//! feed_stream(&mut transport, &[0x04, 0x0e, 0x00]);
//! assert_eq!(handler.packets(), vec![(PacketType::Event, vec![0x0e, 0x00])]);
//! ```

pub mod driver;
pub mod handler;
pub mod logging;

pub use driver::{MockDriver, feed_stream};
pub use handler::RecordingHandler;
pub use logging::{LoggerHandle, logger};
