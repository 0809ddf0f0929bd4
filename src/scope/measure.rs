use super::ScopeClient;
use crate::error::ScopeError;
use crate::types::{Channel, MeasurementKind, MeasurementValue};

impl ScopeClient {
    /// Run one automatic measurement on `channel`.
    ///
    /// `measurement_type` is matched case-insensitively against the
    /// [`MeasurementKind`] keywords. Channel and kind are both validated
    /// before any command is sent, so a malformed request has no side
    /// effects on the instrument. The channel is selected as measurement
    /// source, then the keyword is queried.
    pub fn get_measurement(
        &mut self,
        channel: i32,
        measurement_type: &str,
    ) -> Result<MeasurementValue, ScopeError> {
        let channel = Channel::new(channel)?;
        let kind: MeasurementKind = measurement_type.parse()?;

        self.link()?.write(&format!(":MEAS:SOUR CHAN{channel}"))?;
        let value = self.query_f64(&format!(":MEAS:{}?", kind.keyword()))?;

        Ok(MeasurementValue {
            channel,
            measurement: kind,
            value,
        })
    }
}
