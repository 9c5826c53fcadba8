use alloc::string::{String, ToString};

use shared::{
    comms_hal::COMMAND_PREFIX,
    stand_hal::{StandCommand, ValveId, ValvePosition},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    InvalidValve(String),
    InvalidFormat(String),
    Unrecognized(String),
}

/// Decodes one wired command line, with or without its `CMD:` prefix. Bodies are
/// matched by prefix, so `IGNITE` ignites and `CLOSE_ALL_NOW` closes everything.
pub fn decode_command(line: &str) -> Result<StandCommand, CommandError> {
    let line = line.trim();
    let body = line.strip_prefix(COMMAND_PREFIX).unwrap_or(line);

    if body.is_empty() {
        Err(CommandError::Empty)
    } else if body.starts_with("IGN") {
        Ok(StandCommand::Ignite)
    } else if body.starts_with("OPEN_ALL") {
        Ok(StandCommand::OpenAll)
    } else if body.starts_with("CLOSE_ALL") {
        Ok(StandCommand::CloseAll)
    } else if body.starts_with('V') {
        decode_valve_command(body)
    } else {
        Err(CommandError::Unrecognized(body.to_string()))
    }
}

// V<digit>:<TOKEN>
fn decode_valve_command(body: &str) -> Result<StandCommand, CommandError> {
    let bytes = body.as_bytes();

    let valve = bytes
        .get(1)
        .filter(|byte| byte.is_ascii_digit())
        .and_then(|digit| ValveId::from_number((digit - b'0') as u32))
        .ok_or_else(|| CommandError::InvalidValve(body.to_string()))?;

    if bytes.get(2) != Some(&b':') || bytes.len() < 4 {
        return Err(CommandError::InvalidFormat(body.to_string()));
    }

    let position = match &body[3..] {
        "OPEN" => ValvePosition::Open,
        "CLOSE" => ValvePosition::Closed,
        _ => ValvePosition::Neutral,
    };

    Ok(StandCommand::SetValve { valve, position })
}
