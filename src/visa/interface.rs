use std::time::Duration;

use crate::error::ScopeError;

/// Universal instrument-link interface: one synchronous request/response
/// channel to a single physical or virtual instrument.
///
/// This trait abstracts the instrumentation bus using the operations every
/// message-based transport offers (write, query, timeout, close) rather than
/// transport-specific details. Each transport (raw TCP socket, USBTMC,
/// VXI-11, ...) can implement this trait by mapping these operations to its
/// own protocol.
///
/// # Design Philosophy
/// - Byte-level reliability is the transport's problem; callers see text
/// - Self-documenting through type safety
/// - Enable testing through mock implementations
pub trait InstrumentLink: Send {
    /// Send a command with no response expected
    fn write(&mut self, command: &str) -> Result<(), ScopeError>;

    /// Send a command and read one textual response
    ///
    /// The response is returned as received; trailing terminators are the
    /// caller's to trim.
    fn query(&mut self, command: &str) -> Result<String, ScopeError>;

    /// Set the response timeout for subsequent operations
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError>;

    /// Close the link. Further operations on a closed link fail.
    fn close(&mut self) -> Result<(), ScopeError>;
}

/// Resource discovery and link opening for one instrumentation bus.
pub trait InstrumentBus: Send {
    /// Locators of the resources this bus knows about
    fn list_resources(&self) -> Result<Vec<String>, ScopeError>;

    /// Open a link to the instrument behind `locator`
    fn open(&self, locator: &str) -> Result<Box<dyn InstrumentLink>, ScopeError>;
}
