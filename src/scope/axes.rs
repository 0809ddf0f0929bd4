use super::ScopeClient;
use crate::error::ScopeError;
use crate::types::{Channel, ChannelScaleReadback, TimebaseReadback};

impl ScopeClient {
    /// Set the horizontal timebase in seconds per division.
    ///
    /// The instrument clamps to its supported steps, so the applied scale is
    /// read back after the write; `actual_scale` is authoritative.
    pub fn set_timebase(&mut self, scale: f64) -> Result<TimebaseReadback, ScopeError> {
        self.link()?.write(&format!(":TIM:SCAL {scale}"))?;
        let actual = self.query_f64(":TIM:SCAL?")?;
        Ok(TimebaseReadback {
            requested_scale: scale,
            actual_scale: actual,
        })
    }

    /// Set the vertical scale of `channel` in volts per division, with the
    /// same write-then-readback contract as [`set_timebase`](Self::set_timebase).
    pub fn set_channel_scale(
        &mut self,
        channel: i32,
        scale: f64,
    ) -> Result<ChannelScaleReadback, ScopeError> {
        let channel = Channel::new(channel)?;
        self.link()?.write(&format!(":CHAN{channel}:SCAL {scale}"))?;
        let actual = self.query_f64(&format!(":CHAN{channel}:SCAL?"))?;
        Ok(ChannelScaleReadback {
            channel,
            requested_scale: scale,
            actual_scale: actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::scope::ScopeClient;

    fn connected() -> (ScopeClient, SharedLog, Replies) {
        let bus = MockBus::new();
        let log = bus.log.clone();
        let replies = bus.replies.clone();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");
        let mut client = ScopeClient::new(Box::new(bus));
        client.connect("TCPIP0::10.0.0.2::5025::SOCKET").unwrap();
        (client, log, replies)
    }

    #[test]
    fn test_set_timebase_readback_is_authoritative() {
        let (mut client, log, replies) = connected();
        // instrument clamps 2.5e-3 to the nearest supported step
        push_reply(&replies, "2e-3\n");

        let readback = client.set_timebase(2.5e-3).unwrap();
        assert_eq!(readback.requested_scale, 2.5e-3);
        assert_eq!(readback.actual_scale, 2e-3);

        let log = log.lock().unwrap();
        assert_eq!(log.writes, vec![":TIM:SCAL 0.0025".to_string()]);
        assert_eq!(log.queries.last().unwrap(), ":TIM:SCAL?");
    }

    #[test]
    fn test_set_channel_scale_addresses_channel() {
        let (mut client, log, replies) = connected();
        push_reply(&replies, "0.1\n");

        let readback = client.set_channel_scale(2, 0.1).unwrap();
        assert_eq!(readback.channel, Channel::new(2).unwrap());
        assert_eq!(readback.actual_scale, 0.1);

        let log = log.lock().unwrap();
        assert_eq!(log.writes, vec![":CHAN2:SCAL 0.1".to_string()]);
        assert_eq!(log.queries.last().unwrap(), ":CHAN2:SCAL?");
    }

    #[test]
    fn test_set_channel_scale_rejects_bad_channel_before_traffic() {
        let (mut client, log, _) = connected();

        assert!(matches!(
            client.set_channel_scale(0, 0.1),
            Err(ScopeError::InvalidChannel(0))
        ));

        let log = log.lock().unwrap();
        assert!(log.writes.is_empty());
        assert_eq!(log.queries.len(), 1); // connect handshake only
    }
}
