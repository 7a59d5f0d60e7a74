//! Network subsystem for multicast reception

pub mod interface;
pub mod multicast;

pub use interface::Interface;
pub use multicast::{DatagramSource, MulticastOpener, MulticastSocket, SourceOpener};
