use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ScopeError;

/// Oscilloscope input channel (1-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel(u8);

impl Channel {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 4;

    /// Validate a raw channel number before any protocol traffic is sent.
    pub fn new(index: i32) -> Result<Self, ScopeError> {
        if (Self::MIN..=Self::MAX).contains(&index) {
            Ok(Channel(index as u8))
        } else {
            Err(ScopeError::InvalidChannel(index))
        }
    }

    pub fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Measurement keywords understood by the `:MEAS` subsystem.
///
/// Parsed case-insensitively; the SCPI keyword sent on the wire is the
/// uppercase form (`:MEAS:VPP?`, `:MEAS:PERIOD?`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Vpp,
    Freq,
    Period,
    Duty,
    Rise,
    Fall,
    Max,
    Min,
    Vamp,
    Vtop,
    Vbase,
}

impl MeasurementKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            MeasurementKind::Vpp => "VPP",
            MeasurementKind::Freq => "FREQ",
            MeasurementKind::Period => "PERIOD",
            MeasurementKind::Duty => "DUTY",
            MeasurementKind::Rise => "RISE",
            MeasurementKind::Fall => "FALL",
            MeasurementKind::Max => "MAX",
            MeasurementKind::Min => "MIN",
            MeasurementKind::Vamp => "VAMP",
            MeasurementKind::Vtop => "VTOP",
            MeasurementKind::Vbase => "VBASE",
        }
    }
}

impl FromStr for MeasurementKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vpp" => Ok(MeasurementKind::Vpp),
            "freq" => Ok(MeasurementKind::Freq),
            "period" => Ok(MeasurementKind::Period),
            "duty" => Ok(MeasurementKind::Duty),
            "rise" => Ok(MeasurementKind::Rise),
            "fall" => Ok(MeasurementKind::Fall),
            "max" => Ok(MeasurementKind::Max),
            "min" => Ok(MeasurementKind::Min),
            "vamp" => Ok(MeasurementKind::Vamp),
            "vtop" => Ok(MeasurementKind::Vtop),
            "vbase" => Ok(MeasurementKind::Vbase),
            _ => Err(ScopeError::InvalidMeasurement(s.to_string())),
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword().to_ascii_lowercase())
    }
}

/// How [`auto_scale`](crate::ScopeClient::auto_scale) waits for the
/// instrument's auto-scale routine to finish.
///
/// The instrument acknowledges `:AUT` before the routine completes, so some
/// settle wait is unavoidable. `Fixed` is a flat sleep with no completion
/// signal; the routine may finish earlier or still be running when the wait
/// expires. `OperationComplete` polls `*OPC?` instead, on instruments that
/// support it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettleStrategy {
    Fixed { wait: Duration },
    OperationComplete { timeout: Duration, interval: Duration },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed {
            wait: Duration::from_secs(2),
        }
    }
}

/// Identity of a connected instrument, as reported by `*IDN?`.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub resource: String,
    pub idn: String,
}

/// One row of a bus discovery sweep.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentInfo {
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decoded waveform trace in engineering units.
///
/// `time` and `voltage` are capped to the first 100 points; `points` always
/// reports the full parsed sample count.
#[derive(Debug, Clone, Serialize)]
pub struct WaveformData {
    pub channel: Channel,
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    pub points: usize,
    pub x_increment: f64,
    pub y_increment: f64,
}

/// Timebase readback after a set. Instruments clamp to supported steps, so
/// `actual_scale` is authoritative, not `requested_scale`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimebaseReadback {
    pub requested_scale: f64,
    pub actual_scale: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelScaleReadback {
    pub channel: Channel,
    pub requested_scale: f64,
    pub actual_scale: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasurementValue {
    pub channel: Channel,
    pub measurement: MeasurementKind,
    pub value: f64,
}

/// Outcome of a raw command. `response` is present only when the command was
/// routed to the query path.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        for index in 1..=4 {
            assert!(Channel::new(index).is_ok());
        }
        for index in [0, 5, -1, 99] {
            assert!(matches!(
                Channel::new(index),
                Err(ScopeError::InvalidChannel(i)) if i == index
            ));
        }
    }

    #[test]
    fn test_measurement_kind_case_insensitive() {
        assert_eq!("vpp".parse::<MeasurementKind>().unwrap(), MeasurementKind::Vpp);
        assert_eq!("VPP".parse::<MeasurementKind>().unwrap(), MeasurementKind::Vpp);
        assert_eq!("Period".parse::<MeasurementKind>().unwrap(), MeasurementKind::Period);
        assert_eq!("vBaSe".parse::<MeasurementKind>().unwrap(), MeasurementKind::Vbase);
    }

    #[test]
    fn test_measurement_kind_unknown() {
        assert!(matches!(
            "rms".parse::<MeasurementKind>(),
            Err(ScopeError::InvalidMeasurement(s)) if s == "rms"
        ));
    }

    #[test]
    fn test_measurement_keyword() {
        assert_eq!(MeasurementKind::Vpp.keyword(), "VPP");
        assert_eq!(MeasurementKind::Period.keyword(), "PERIOD");
        assert_eq!(MeasurementKind::Vbase.keyword(), "VBASE");
    }
}
