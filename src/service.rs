use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::scope::ScopeClient;
use crate::types::{
    ChannelScaleReadback, CommandOutcome, InstrumentInfo, MeasurementValue, TimebaseReadback,
    WaveformData,
};

/// One request on the stdio wire, tagged by operation name.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListInstruments,
    ConnectOscilloscope { resource: String },
    DisconnectOscilloscope,
    GetOscilloscopeStatus,
    GetWaveform { channel: i32 },
    SetTimebase { scale: f64 },
    SetChannelScale { channel: i32, scale: f64 },
    GetMeasurement { channel: i32, measurement_type: String },
    SendCommand { command: String },
    AutoScale,
}

/// Reply envelope. Every reply carries a `status` field; success payloads
/// are flattened beside it.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Connected { resource: String, idn: String },
    Disconnected,
    NotConnected,
    Success {
        #[serde(flatten)]
        payload: Payload,
    },
    Error { message: String },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Instruments { instruments: Vec<InstrumentInfo> },
    Waveform(WaveformData),
    Timebase(TimebaseReadback),
    ChannelScale(ChannelScaleReadback),
    Measurement(MeasurementValue),
    Command(CommandOutcome),
    Empty {},
}

fn error_reply(e: ScopeError) -> Reply {
    Reply::Error {
        message: e.to_string(),
    }
}

/// Execute one request against the client and fold every outcome into the
/// status envelope. Nothing panics across this boundary.
///
/// `disconnect` and `status` report a missing connection as the
/// `not_connected` status; every other operation reports it as a plain
/// error, matching the per-operation contracts.
pub fn dispatch(client: &mut ScopeClient, request: Request) -> Reply {
    debug!("Dispatching {request:?}");
    match request {
        Request::ListInstruments => match client.list_instruments() {
            Ok(instruments) => Reply::Success {
                payload: Payload::Instruments { instruments },
            },
            Err(e) => error_reply(e),
        },
        Request::ConnectOscilloscope { resource } => match client.connect(&resource) {
            Ok(identity) => Reply::Connected {
                resource: identity.resource,
                idn: identity.idn,
            },
            Err(e) => error_reply(e),
        },
        Request::DisconnectOscilloscope => match client.disconnect() {
            Ok(()) => Reply::Disconnected,
            Err(ScopeError::NotConnected) => Reply::NotConnected,
            Err(e) => error_reply(e),
        },
        Request::GetOscilloscopeStatus => match client.status() {
            Ok(identity) => Reply::Connected {
                resource: identity.resource,
                idn: identity.idn,
            },
            Err(ScopeError::NotConnected) => Reply::NotConnected,
            Err(e) => error_reply(e),
        },
        Request::GetWaveform { channel } => match client.get_waveform(channel) {
            Ok(waveform) => Reply::Success {
                payload: Payload::Waveform(waveform),
            },
            Err(e) => error_reply(e),
        },
        Request::SetTimebase { scale } => match client.set_timebase(scale) {
            Ok(readback) => Reply::Success {
                payload: Payload::Timebase(readback),
            },
            Err(e) => error_reply(e),
        },
        Request::SetChannelScale { channel, scale } => {
            match client.set_channel_scale(channel, scale) {
                Ok(readback) => Reply::Success {
                    payload: Payload::ChannelScale(readback),
                },
                Err(e) => error_reply(e),
            }
        }
        Request::GetMeasurement {
            channel,
            measurement_type,
        } => match client.get_measurement(channel, &measurement_type) {
            Ok(value) => Reply::Success {
                payload: Payload::Measurement(value),
            },
            Err(e) => error_reply(e),
        },
        Request::SendCommand { command } => match client.send_command(&command) {
            Ok(outcome) => Reply::Success {
                payload: Payload::Command(outcome),
            },
            Err(e) => error_reply(e),
        },
        Request::AutoScale => match client.auto_scale() {
            Ok(()) => Reply::Success {
                payload: Payload::Empty {},
            },
            Err(e) => error_reply(e),
        },
    }
}

/// Parse one request line and dispatch it. A malformed line is an error
/// reply, never a crash of the service loop.
pub fn handle_line(client: &mut ScopeClient, line: &str) -> Reply {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(client, request),
        Err(e) => Reply::Error {
            message: format!("Invalid request: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::*;
    use serde_json::{Value, json};

    const RESOURCE: &str = "TCPIP0::10.0.0.2::5025::SOCKET";

    fn client() -> (ScopeClient, SharedLog, Replies) {
        let bus = MockBus::new();
        let log = bus.log.clone();
        let replies = bus.replies.clone();
        (ScopeClient::new(Box::new(bus)), log, replies)
    }

    fn to_json(reply: &Reply) -> Value {
        serde_json::to_value(reply).unwrap()
    }

    #[test]
    fn test_connect_reply_shape() {
        let (mut client, _, replies) = client();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");

        let reply = handle_line(
            &mut client,
            &json!({"op": "connect_oscilloscope", "resource": RESOURCE}).to_string(),
        );
        assert_eq!(
            to_json(&reply),
            json!({"status": "connected", "resource": RESOURCE, "idn": "MOCK,SCOPE,0,1"})
        );
    }

    #[test]
    fn test_disconnect_and_status_report_not_connected() {
        let (mut client, _, _) = client();

        let reply = handle_line(&mut client, r#"{"op": "disconnect_oscilloscope"}"#);
        assert_eq!(to_json(&reply), json!({"status": "not_connected"}));

        let reply = handle_line(&mut client, r#"{"op": "get_oscilloscope_status"}"#);
        assert_eq!(to_json(&reply), json!({"status": "not_connected"}));
    }

    #[test]
    fn test_connected_only_ops_report_plain_error() {
        let (mut client, log, _) = client();

        let reply = handle_line(&mut client, r#"{"op": "set_timebase", "scale": 1e-3}"#);
        assert_eq!(
            to_json(&reply),
            json!({"status": "error", "message": "Not connected to oscilloscope"})
        );
        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn test_invalid_channel_message() {
        let (mut client, _, replies) = client();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");
        client.connect(RESOURCE).unwrap();

        let reply = handle_line(&mut client, r#"{"op": "get_waveform", "channel": 9}"#);
        assert_eq!(
            to_json(&reply),
            json!({"status": "error", "message": "Invalid channel: 9"})
        );
    }

    #[test]
    fn test_measurement_success_payload_is_flattened() {
        let (mut client, _, replies) = client();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");
        client.connect(RESOURCE).unwrap();
        push_reply(&replies, "0.5\n");

        let reply = handle_line(
            &mut client,
            r#"{"op": "get_measurement", "channel": 1, "measurement_type": "VPP"}"#,
        );
        assert_eq!(
            to_json(&reply),
            json!({
                "status": "success",
                "channel": 1,
                "measurement": "vpp",
                "value": 0.5
            })
        );
    }

    #[test]
    fn test_auto_scale_success_is_bare_status() {
        use crate::types::SettleStrategy;
        use std::time::Duration;

        let bus = MockBus::new();
        let replies = bus.replies.clone();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");
        // zero settle keeps the test instant
        let mut client = ScopeClient::builder(Box::new(bus))
            .settle(SettleStrategy::Fixed {
                wait: Duration::from_millis(0),
            })
            .build();
        client.connect(RESOURCE).unwrap();

        let reply = handle_line(&mut client, r#"{"op": "auto_scale"}"#);
        assert_eq!(to_json(&reply), json!({"status": "success"}));
    }

    #[test]
    fn test_malformed_request_line() {
        let (mut client, _, _) = client();
        let reply = handle_line(&mut client, "{not json");
        assert!(matches!(reply, Reply::Error { .. }));
    }

    #[test]
    fn test_send_command_write_path_has_no_response_field() {
        let (mut client, _, replies) = client();
        push_reply(&replies, "MOCK,SCOPE,0,1\n");
        client.connect(RESOURCE).unwrap();

        let reply = handle_line(&mut client, r#"{"op": "send_command", "command": ":RUN"}"#);
        assert_eq!(
            to_json(&reply),
            json!({"status": "success", "command": ":RUN"})
        );
    }
}
