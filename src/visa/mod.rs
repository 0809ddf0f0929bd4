pub mod interface;
pub mod socket;

pub use interface::{InstrumentBus, InstrumentLink};
pub use socket::{SocketBus, SocketLink};
