use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ScopeError;
use crate::types::{Identity, InstrumentInfo, SettleStrategy};
use crate::visa::{InstrumentBus, InstrumentLink};

pub mod axes;
pub mod measure;
pub mod raw;
pub mod waveform;

struct ActiveLink {
    link: Box<dyn InstrumentLink>,
    resource: String,
    identity: String,
}

/// High-level client for one oscilloscope on an instrumentation bus.
///
/// `ScopeClient` owns at most one open link at a time. Every operation takes
/// `&mut self`, so exclusive access is visible in the type system instead of
/// hiding behind a process-wide connection slot; callers that need sharing
/// across threads wrap the client themselves.
///
/// # Connection Lifecycle
///
/// A client starts disconnected. [`connect`](Self::connect) opens the link,
/// applies the session timeout and captures the instrument identity;
/// [`disconnect`](Self::disconnect) closes it. Operations issued while
/// disconnected fail with [`ScopeError::NotConnected`] without touching the
/// bus.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use rusty_scope::{ScopeClient, SocketBus};
///
/// let bus = SocketBus::new(
///     vec!["TCPIP0::192.168.1.5::5025::SOCKET".to_string()],
///     Duration::from_secs(5),
/// );
/// let mut client = ScopeClient::new(Box::new(bus));
///
/// let identity = client.connect("TCPIP0::192.168.1.5::5025::SOCKET")?;
/// println!("connected to {}", identity.idn);
///
/// let waveform = client.get_waveform(1)?;
/// println!("{} points", waveform.points);
/// # Ok::<(), rusty_scope::ScopeError>(())
/// ```
pub struct ScopeClient {
    bus: Box<dyn InstrumentBus>,
    active: Option<ActiveLink>,
    probe_timeout: Duration,
    session_timeout: Duration,
    settle: SettleStrategy,
}

/// Builder for [`ScopeClient`] instances with non-default timeouts or a
/// custom auto-scale settle strategy.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use rusty_scope::{ScopeClient, SettleStrategy, SocketBus};
///
/// let bus = SocketBus::new(vec![], Duration::from_secs(5));
/// let mut client = ScopeClient::builder(Box::new(bus))
///     .session_timeout(Duration::from_secs(10))
///     .settle(SettleStrategy::OperationComplete {
///         timeout: Duration::from_secs(5),
///         interval: Duration::from_millis(100),
///     })
///     .build();
/// ```
pub struct ScopeClientBuilder {
    bus: Box<dyn InstrumentBus>,
    probe_timeout: Duration,
    session_timeout: Duration,
    settle: SettleStrategy,
}

impl ScopeClientBuilder {
    fn new(bus: Box<dyn InstrumentBus>) -> Self {
        Self {
            bus,
            probe_timeout: Duration::from_secs(1),
            session_timeout: Duration::from_secs(5),
            settle: SettleStrategy::default(),
        }
    }

    /// Timeout for identity probes during discovery
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Timeout applied to the link once connected
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// How auto-scale waits for the instrument to settle
    pub fn settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    pub fn build(self) -> ScopeClient {
        ScopeClient {
            bus: self.bus,
            active: None,
            probe_timeout: self.probe_timeout,
            session_timeout: self.session_timeout,
            settle: self.settle,
        }
    }
}

impl ScopeClient {
    /// Create a client with default timeouts (1 s probe, 5 s session) and
    /// the default 2 s fixed auto-scale settle.
    pub fn new(bus: Box<dyn InstrumentBus>) -> Self {
        Self::builder(bus).build()
    }

    pub fn builder(bus: Box<dyn InstrumentBus>) -> ScopeClientBuilder {
        ScopeClientBuilder::new(bus)
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Locator of the currently connected instrument, if any
    pub fn resource(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.resource.as_str())
    }

    /// Identity captured at connect time, if connected
    pub fn identity(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.identity.as_str())
    }

    pub(crate) fn settle(&self) -> SettleStrategy {
        self.settle
    }

    pub(crate) fn link(&mut self) -> Result<&mut dyn InstrumentLink, ScopeError> {
        match self.active.as_mut() {
            Some(active) => Ok(active.link.as_mut()),
            None => Err(ScopeError::NotConnected),
        }
    }

    /// Query and parse a single floating-point reply.
    pub(crate) fn query_f64(&mut self, command: &str) -> Result<f64, ScopeError> {
        let reply = self.link()?.query(command)?;
        let trimmed = reply.trim();
        trimmed
            .parse::<f64>()
            .map_err(|_| ScopeError::Parse(format!("Non-numeric reply to {command}: {trimmed:?}")))
    }

    /// Connect to the instrument behind `resource`.
    ///
    /// Opens the link, applies the session timeout and queries `*IDN?` to
    /// confirm the instrument responds. Any prior connection is closed first
    /// rather than silently replaced.
    ///
    /// # Errors
    /// On any failure the attempted handle is closed and the client stays
    /// disconnected; no half-open link survives a failed connect.
    pub fn connect(&mut self, resource: &str) -> Result<Identity, ScopeError> {
        if let Some(mut old) = self.active.take() {
            warn!("Replacing open connection to {}", old.resource);
            if let Err(e) = old.link.close() {
                debug!("Ignoring close failure on replaced link: {e}");
            }
        }

        info!("Connecting to {resource}");
        let mut link = self.bus.open(resource)?;

        match Self::handshake(link.as_mut(), self.session_timeout) {
            Ok(idn) => {
                info!("Connected to {resource}: {idn}");
                self.active = Some(ActiveLink {
                    link,
                    resource: resource.to_string(),
                    identity: idn.clone(),
                });
                Ok(Identity {
                    resource: resource.to_string(),
                    idn,
                })
            }
            Err(e) => {
                // A failed attempt must not leave a half-open handle behind
                if let Err(close_err) = link.close() {
                    debug!("Ignoring close failure after failed connect: {close_err}");
                }
                Err(e)
            }
        }
    }

    fn handshake(link: &mut dyn InstrumentLink, timeout: Duration) -> Result<String, ScopeError> {
        link.set_timeout(timeout)?;
        let idn = link.query("*IDN?")?;
        Ok(idn.trim().to_string())
    }

    /// Close the active link.
    ///
    /// The connection slot is cleared even if the close itself fails.
    pub fn disconnect(&mut self) -> Result<(), ScopeError> {
        match self.active.take() {
            Some(mut active) => {
                info!("Disconnecting from {}", active.resource);
                active.link.close()
            }
            None => Err(ScopeError::NotConnected),
        }
    }

    /// Re-query the instrument identity to confirm the link is still live.
    ///
    /// The identity captured at connect is not reused; a dead link surfaces
    /// here as an error, not as a stale success.
    pub fn status(&mut self) -> Result<Identity, ScopeError> {
        let active = self.active.as_mut().ok_or(ScopeError::NotConnected)?;
        let idn = active.link.query("*IDN?")?.trim().to_string();
        Ok(Identity {
            resource: active.resource.clone(),
            idn,
        })
    }

    /// Probe every resource the bus knows about.
    ///
    /// Each probe opens the resource with the short probe timeout, asks
    /// `*IDN?` and closes again. A failed identity query downgrades to
    /// `"Unknown"`; a failed open is captured per row so one dead endpoint
    /// does not fail the whole sweep.
    pub fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, ScopeError> {
        let mut found = Vec::new();
        for resource in self.bus.list_resources()? {
            match self.bus.open(&resource) {
                Ok(mut link) => {
                    let idn = link
                        .set_timeout(self.probe_timeout)
                        .and_then(|_| link.query("*IDN?"))
                        .map(|reply| reply.trim().to_string())
                        .unwrap_or_else(|e| {
                            debug!("Identity probe failed for {resource}: {e}");
                            "Unknown".to_string()
                        });
                    if let Err(e) = link.close() {
                        debug!("Ignoring close failure after probe of {resource}: {e}");
                    }
                    found.push(InstrumentInfo {
                        resource,
                        idn: Some(idn),
                        error: None,
                    });
                }
                Err(e) => {
                    debug!("Could not open {resource}: {e}");
                    found.push(InstrumentInfo {
                        resource,
                        idn: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::error::ScopeError;
    use crate::visa::{InstrumentBus, InstrumentLink};

    /// Everything a mock link observed, shared between the bus, its links
    /// and the test body.
    #[derive(Default)]
    pub struct LinkLog {
        pub writes: Vec<String>,
        pub queries: Vec<String>,
        pub timeouts: Vec<Duration>,
        pub closes: usize,
    }

    pub type SharedLog = Arc<Mutex<LinkLog>>;
    pub type Replies = Arc<Mutex<VecDeque<Result<String, String>>>>;

    pub fn push_reply(replies: &Replies, reply: &str) {
        replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(replies: &Replies, message: &str) {
        replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub struct MockBus {
        pub log: SharedLog,
        pub replies: Replies,
        pub resources: Vec<String>,
        pub fail_open: bool,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(LinkLog::default())),
                replies: Arc::new(Mutex::new(VecDeque::new())),
                resources: vec!["TCPIP0::10.0.0.2::5025::SOCKET".to_string()],
                fail_open: false,
            }
        }
    }

    impl InstrumentBus for MockBus {
        fn list_resources(&self) -> Result<Vec<String>, ScopeError> {
            Ok(self.resources.clone())
        }

        fn open(&self, locator: &str) -> Result<Box<dyn InstrumentLink>, ScopeError> {
            if self.fail_open {
                return Err(ScopeError::Protocol(format!("open refused: {locator}")));
            }
            Ok(Box::new(MockLink {
                log: self.log.clone(),
                replies: self.replies.clone(),
            }))
        }
    }

    pub struct MockLink {
        log: SharedLog,
        replies: Replies,
    }

    impl InstrumentLink for MockLink {
        fn write(&mut self, command: &str) -> Result<(), ScopeError> {
            self.log.lock().unwrap().writes.push(command.to_string());
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<String, ScopeError> {
            self.log.lock().unwrap().queries.push(command.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(ScopeError::Protocol(message)),
                None => Err(ScopeError::Protocol(format!("unscripted query: {command}"))),
            }
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
            self.log.lock().unwrap().timeouts.push(timeout);
            Ok(())
        }

        fn close(&mut self) -> Result<(), ScopeError> {
            self.log.lock().unwrap().closes += 1;
            Ok(())
        }
    }
}
