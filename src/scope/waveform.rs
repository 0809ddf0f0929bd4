use log::debug;

use super::ScopeClient;
use crate::error::ScopeError;
use crate::types::{Channel, WaveformData};

/// Cap on the `time`/`voltage` vectors returned to callers. Full traces run
/// to millions of points; `points` still reports the untruncated count.
pub const MAX_PREVIEW_POINTS: usize = 100;

/// Calibration scalars fetched immediately before each data block. Valid for
/// that block only, so they are re-queried on every fetch.
#[derive(Debug, Clone, Copy)]
struct Calibration {
    x_increment: f64,
    x_origin: f64,
    y_increment: f64,
    y_origin: f64,
}

impl ScopeClient {
    /// Fetch one waveform trace from `channel` and rescale it into
    /// engineering units.
    ///
    /// Selects the channel as waveform source, requests ASCII data, queries
    /// the four calibration scalars and decodes the data block:
    /// `time[i] = x_origin + i * x_increment`,
    /// `voltage[i] = (raw[i] - y_origin) * y_increment`.
    ///
    /// # Errors
    /// Fails without any protocol traffic on an invalid channel. A
    /// non-numeric scalar or sample, or a malformed block header, fails the
    /// whole call; no partial trace is returned.
    pub fn get_waveform(&mut self, channel: i32) -> Result<WaveformData, ScopeError> {
        let channel = Channel::new(channel)?;

        let link = self.link()?;
        link.write(&format!(":WAV:SOUR CHAN{channel}"))?;
        link.write(":WAV:FORM ASCII")?;

        let calibration = Calibration {
            x_increment: self.query_f64(":WAV:XINC?")?,
            x_origin: self.query_f64(":WAV:XOR?")?,
            y_increment: self.query_f64(":WAV:YINC?")?,
            y_origin: self.query_f64(":WAV:YOR?")?,
        };

        let reply = self.link()?.query(":WAV:DATA?")?;
        let samples = parse_ascii_block(reply.trim_end())?;
        debug!("Decoded {} samples from CHAN{channel}", samples.len());

        Ok(rescale(channel, calibration, &samples))
    }
}

/// Decode an ASCII waveform block into raw sample codes.
///
/// Instruments prefix the block with `#<d><len>`, where `<d>` is a single
/// decimal digit naming how many characters follow it encode the payload
/// length; the payload starts after exactly `2 + d` characters. A reply
/// without the `#` prefix is treated as bare payload.
fn parse_ascii_block(reply: &str) -> Result<Vec<f64>, ScopeError> {
    let payload = strip_block_header(reply)?;
    payload
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f64>()
                .map_err(|_| ScopeError::Parse(format!("Non-numeric waveform sample: {token:?}")))
        })
        .collect()
}

fn strip_block_header(reply: &str) -> Result<&str, ScopeError> {
    let Some(rest) = reply.strip_prefix('#') else {
        return Ok(reply);
    };
    let digit = rest
        .chars()
        .next()
        .ok_or_else(|| ScopeError::Protocol("Truncated waveform block header".to_string()))?;
    let length_digits = digit
        .to_digit(10)
        .ok_or_else(|| {
            ScopeError::Protocol(format!("Invalid waveform block header digit: {digit:?}"))
        })? as usize;
    // '#', the digit itself, then `length_digits` characters of length field
    reply
        .get(2 + length_digits..)
        .ok_or_else(|| ScopeError::Protocol("Waveform block shorter than its header".to_string()))
}

fn rescale(channel: Channel, calibration: Calibration, samples: &[f64]) -> WaveformData {
    let preview = samples.len().min(MAX_PREVIEW_POINTS);
    let time = (0..preview)
        .map(|i| calibration.x_origin + i as f64 * calibration.x_increment)
        .collect();
    let voltage = samples
        .iter()
        .take(preview)
        .map(|raw| (raw - calibration.y_origin) * calibration.y_increment)
        .collect();

    WaveformData {
        channel,
        time,
        voltage,
        points: samples.len(),
        x_increment: calibration.x_increment,
        y_increment: calibration.y_increment,
    }
}
