use core::any::Any;

use alloc::{
    format,
    string::{String, ToString},
};

use crate::stand_hal::TelemetryFrame;

pub const MAX_PACKET_SIZE: usize = 256;
pub const DEFAULT_NETWORK_TAG: &str = "DC=";

pub const COMMAND_PREFIX: &str = "CMD:";
pub const ACK_PREFIX: &str = "ACK:";
pub const TELEMETRY_PREFIX: &str = "TLM:";
pub const PING_PAYLOAD: &str = "PING";

pub type SequenceNumber = u32;

/// Payload carried inside one radio packet, after the network tag is stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Command {
        body: String,
        sequence: SequenceNumber,
    },
    Ack {
        sequence: SequenceNumber,
    },
    /// Any payload starting with `T`, kept whole (e.g. `TLM:{...}`).
    Telemetry {
        body: String,
    },
    Ping,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    MissingSequence,
    BadSequence,
}

impl Message {
    pub fn decode(payload: &str) -> Result<Message, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Empty);
        }

        if let Some(rest) = payload.strip_prefix(COMMAND_PREFIX) {
            let (body, sequence) = split_sequence(rest)?;

            return Ok(Message::Command {
                body: body.to_string(),
                sequence,
            });
        }

        if let Some(rest) = payload.strip_prefix(ACK_PREFIX) {
            let (_, sequence) = split_sequence(rest)?;

            return Ok(Message::Ack { sequence });
        }

        if payload == PING_PAYLOAD {
            return Ok(Message::Ping);
        }

        if payload.starts_with('T') {
            return Ok(Message::Telemetry {
                body: payload.to_string(),
            });
        }

        Ok(Message::Other(payload.to_string()))
    }

    pub fn encode(&self) -> String {
        match self {
            Message::Command { body, sequence } => format!("{COMMAND_PREFIX}{body}#{sequence}"),
            Message::Ack { sequence } => format!("{ACK_PREFIX}#{sequence}"),
            Message::Telemetry { body } => body.clone(),
            Message::Ping => PING_PAYLOAD.to_string(),
            Message::Other(text) => text.clone(),
        }
    }
}

// Sequence is whatever follows the last '#', so bodies may contain '#' themselves.
fn split_sequence(text: &str) -> Result<(&str, SequenceNumber), DecodeError> {
    let (body, sequence) = text.rsplit_once('#').ok_or(DecodeError::MissingSequence)?;
    let sequence = sequence
        .parse::<SequenceNumber>()
        .map_err(|_| DecodeError::BadSequence)?;

    Ok((body, sequence))
}

/// Line written to the wired link for a command body.
pub fn command_line(body: &str) -> String {
    format!("{COMMAND_PREFIX}{body}")
}

pub fn telemetry_line(frame: &TelemetryFrame) -> Option<String> {
    serde_json::to_string(frame)
        .ok()
        .map(|json| format!("{TELEMETRY_PREFIX}{json}"))
}

pub fn parse_telemetry_line(line: &str) -> Option<TelemetryFrame> {
    let json = line.trim().strip_prefix(TELEMETRY_PREFIX)?;

    serde_json::from_str(json).ok()
}

/// Newline-delimited serial link between the relay and the actuator controller.
pub trait WiredLink {
    /// Writes one line; the implementation appends the terminator.
    fn write_line(&mut self, line: &str);

    /// Returns the next complete line without its terminator, if one has arrived.
    fn read_line(&mut self) -> Option<String>;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}
