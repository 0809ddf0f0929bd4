pub mod config;
pub mod error;
pub mod scope;
pub mod service;
pub mod types;
pub mod utils;
pub mod visa;

pub use error::ScopeError;
pub use scope::raw::is_query;
pub use scope::waveform::MAX_PREVIEW_POINTS;
pub use scope::{ScopeClient, ScopeClientBuilder};
pub use service::{Reply, Request, dispatch, handle_line};
pub use types::{
    Channel, ChannelScaleReadback, CommandOutcome, Identity, InstrumentInfo, MeasurementKind,
    MeasurementValue, SettleStrategy, TimebaseReadback, WaveformData,
};
pub use visa::{InstrumentBus, InstrumentLink, SocketBus, SocketLink};
