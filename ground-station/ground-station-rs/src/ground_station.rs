use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use log::{debug, info, warn};
use radio_link::{interface::RadioInterface, serdes::frame_len, RadioLink, RadioLinkError};
use serde::{Deserialize, Serialize};
use shared::{
    comms_hal::{Message, SequenceNumber, COMMAND_PREFIX, DEFAULT_NETWORK_TAG, MAX_PACKET_SIZE},
    util::{elapsed_ms, IntervalTimer},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundStationConfig {
    pub network_tag: String,
    pub retransmit_interval_ms: u32,
    pub ping_interval_ms: u32,
    pub heartbeat_interval_ms: u32,
}

impl Default for GroundStationConfig {
    fn default() -> Self {
        Self {
            network_tag: DEFAULT_NETWORK_TAG.to_string(),
            retransmit_interval_ms: 500,
            ping_interval_ms: 1000,
            heartbeat_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationMode {
    Idle,
    AwaitingAck {
        body: String,
        sequence: SequenceNumber,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    MissingPrefix,
    EmptyCommand,
    EmbeddedNewline,
    CommandInFlight,
    PacketTooLong,
}

impl core::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let reason = match self {
            SubmitError::MissingPrefix => "commands must start with CMD:",
            SubmitError::EmptyCommand => "empty command",
            SubmitError::EmbeddedNewline => "command contains a line break",
            SubmitError::CommandInFlight => "previous command not acknowledged yet",
            SubmitError::PacketTooLong => "command does not fit in one packet",
        };

        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorEvent {
    Acknowledged {
        body: String,
        sequence: SequenceNumber,
    },
    Dropped {
        body: String,
        sequence: SequenceNumber,
    },
    Telemetry(String),
    Message(String),
    Heartbeat {
        since_last_reception_ms: Option<u32>,
    },
}

/// Operator side of the link: one command in flight, resent until acknowledged.
pub struct GroundStation<'a> {
    pub config: GroundStationConfig,
    pub radio: RadioLink<'a>,
    sequence: SequenceNumber,
    mode: StationMode,
    last_sent_at: Option<u32>,
    last_reception_at: Option<u32>,
    heartbeat_timer: IntervalTimer,
    events: Vec<OperatorEvent>,
}

impl<'a> GroundStation<'a> {
    pub fn new(
        config: GroundStationConfig,
        interface: &'a mut dyn RadioInterface,
        now_ms: u32,
    ) -> Result<Self, RadioLinkError> {
        let radio = RadioLink::new(&config.network_tag, interface)?;

        Ok(Self {
            heartbeat_timer: IntervalTimer::started_at(config.heartbeat_interval_ms, now_ms),
            config,
            radio,
            sequence: 0,
            mode: StationMode::Idle,
            last_sent_at: None,
            last_reception_at: None,
            events: Vec::new(),
        })
    }

    /// Queues an operator line like `CMD:V1:OPEN` and sends it right away.
    pub fn submit(&mut self, line: &str, now_ms: u32) -> Result<SequenceNumber, SubmitError> {
        let line = line.trim();

        let Some(body) = line.strip_prefix(COMMAND_PREFIX) else {
            warn!("Not a command, expected '{}': '{}'", COMMAND_PREFIX, line);
            return Err(SubmitError::MissingPrefix);
        };

        if body.is_empty() {
            warn!("Empty command");
            return Err(SubmitError::EmptyCommand);
        }

        if body.contains('\n') {
            warn!("Command contains a line break: {:?}", body);
            return Err(SubmitError::EmbeddedNewline);
        }

        if let StationMode::AwaitingAck { body, sequence } = &self.mode {
            warn!("Command '{}' #{} still awaiting ack", body, sequence);
            return Err(SubmitError::CommandInFlight);
        }

        let message = Message::Command {
            body: body.to_string(),
            sequence: self.sequence,
        };

        if frame_len(self.radio.tag(), &message.encode()) > MAX_PACKET_SIZE {
            warn!("Command '{}' does not fit in one packet", body);
            return Err(SubmitError::PacketTooLong);
        }

        info!("Sending '{}' #{}", body, self.sequence);
        self.mode = StationMode::AwaitingAck {
            body: body.to_string(),
            sequence: self.sequence,
        };
        self.send_pending(now_ms);

        Ok(self.sequence)
    }

    pub fn update(&mut self, now_ms: u32) {
        if let Some(message) = self.radio.recv_message() {
            self.handle_message(message, now_ms);
        }

        match self.mode {
            StationMode::AwaitingAck { .. } => {
                if self.send_due(now_ms, self.config.retransmit_interval_ms) {
                    debug!("Retransmitting #{}", self.sequence);
                    self.send_pending(now_ms);
                }
            }
            StationMode::Idle => {
                if self.send_due(now_ms, self.config.ping_interval_ms) {
                    let _ = self.radio.send_message(&Message::Ping);
                    self.last_sent_at = Some(now_ms);
                }
            }
        }

        if self.heartbeat_timer.should_update(now_ms) {
            self.events.push(OperatorEvent::Heartbeat {
                since_last_reception_ms: self
                    .last_reception_at
                    .map(|received_at| elapsed_ms(now_ms, received_at)),
            });
        }
    }

    fn send_due(&self, now_ms: u32, interval_ms: u32) -> bool {
        self.last_sent_at
            .map_or(true, |sent_at| elapsed_ms(now_ms, sent_at) >= interval_ms)
    }

    fn send_pending(&mut self, now_ms: u32) {
        let StationMode::AwaitingAck { body, sequence } = &self.mode else {
            return;
        };

        let message = Message::Command {
            body: body.clone(),
            sequence: *sequence,
        };
        self.last_sent_at = Some(now_ms);

        if let Err(err) = self.radio.send_message(&message) {
            if err.is_packet_too_long() {
                if let StationMode::AwaitingAck { body, sequence } =
                    core::mem::replace(&mut self.mode, StationMode::Idle)
                {
                    warn!("Dropping '{}' #{}: packet too long", body, sequence);
                    self.events.push(OperatorEvent::Dropped { body, sequence });
                }
            }
        }
    }

    fn handle_message(&mut self, message: Message, now_ms: u32) {
        self.last_reception_at = Some(now_ms);

        match message {
            Message::Ack { sequence } => self.handle_ack(sequence),
            Message::Telemetry { body } => self.events.push(OperatorEvent::Telemetry(body)),
            Message::Ping => {}
            other => self.events.push(OperatorEvent::Message(other.encode())),
        }
    }

    fn handle_ack(&mut self, acked: SequenceNumber) {
        match &self.mode {
            StationMode::AwaitingAck { sequence, .. } if *sequence == acked => {
                if let StationMode::AwaitingAck { body, sequence } =
                    core::mem::replace(&mut self.mode, StationMode::Idle)
                {
                    info!("'{}' #{} acknowledged", body, sequence);
                    self.sequence = self.sequence.wrapping_add(1);
                    self.events
                        .push(OperatorEvent::Acknowledged { body, sequence });
                }
            }
            _ => debug!("Ignoring ack #{}", acked),
        }
    }

    pub fn take_events(&mut self) -> Vec<OperatorEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn mode(&self) -> &StationMode {
        &self.mode
    }

    pub fn set_sequence(&mut self, sequence: SequenceNumber) {
        self.sequence = sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radio_link::interface::{mock_interface::MockRadio, RadioError};

    fn mock_radio<'b>(station: &'b mut GroundStation) -> &'b mut MockRadio {
        station
            .radio
            .interface()
            .as_mut_any()
            .unwrap()
            .downcast_mut::<MockRadio>()
            .unwrap()
    }

    fn receive(station: &mut GroundStation, now_ms: u32, payload: &str) {
        let packet = format!("DC={}\n", payload);
        mock_radio(station).add_recv_payload(packet.as_bytes());
        station.update(now_ms);
    }

    fn sent_payloads(station: &mut GroundStation) -> Vec<String> {
        mock_radio(station)
            .sent_packets
            .drain(..)
            .map(|packet| String::from_utf8(packet).unwrap())
            .collect()
    }

    #[test]
    fn first_ping_on_first_update() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();

        station.update(0);
        station.update(999);
        assert_eq!(sent_payloads(&mut station), vec!["DC=PING\n"]);

        station.update(1000);
        assert_eq!(sent_payloads(&mut station), vec!["DC=PING\n"]);
    }

    #[test]
    fn submit_sends_and_retransmits_until_acked() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();

        assert_eq!(station.submit("CMD:V3:OPEN", 0), Ok(0));
        assert_eq!(sent_payloads(&mut station), vec!["DC=CMD:V3:OPEN#0\n"]);

        station.update(499);
        assert!(sent_payloads(&mut station).is_empty());

        station.update(500);
        station.update(1000);
        assert_eq!(
            sent_payloads(&mut station),
            vec!["DC=CMD:V3:OPEN#0\n", "DC=CMD:V3:OPEN#0\n"]
        );

        receive(&mut station, 1100, "ACK:#0");
        assert_eq!(station.sequence(), 1);
        assert_eq!(station.mode(), &StationMode::Idle);
        assert_eq!(
            station.take_events(),
            vec![OperatorEvent::Acknowledged {
                body: "V3:OPEN".to_string(),
                sequence: 0
            }]
        );

        // Extra acks from the burst change nothing
        receive(&mut station, 1200, "ACK:#0");
        receive(&mut station, 1300, "ACK:#0");
        assert_eq!(station.sequence(), 1);
        assert!(station.take_events().is_empty());
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();
        station.set_sequence(5);

        station.submit("CMD:IGN", 0).unwrap();
        receive(&mut station, 10, "ACK:#4");

        assert_eq!(station.sequence(), 5);
        assert!(matches!(station.mode(), StationMode::AwaitingAck { sequence: 5, .. }));
    }

    #[test]
    fn rejected_submissions() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();

        assert_eq!(station.submit("V1:OPEN", 0), Err(SubmitError::MissingPrefix));
        assert_eq!(station.submit("CMD:", 0), Err(SubmitError::EmptyCommand));
        assert_eq!(
            station.submit("CMD:V1:OPEN\nV2:OPEN", 0),
            Err(SubmitError::EmbeddedNewline)
        );
        assert_eq!(station.mode(), &StationMode::Idle);

        let long = format!("CMD:{}", "V".repeat(MAX_PACKET_SIZE));
        assert_eq!(station.submit(&long, 0), Err(SubmitError::PacketTooLong));
        assert!(sent_payloads(&mut station).is_empty());

        station.submit("CMD:V1:OPEN", 0).unwrap();
        assert_eq!(
            station.submit("CMD:V2:OPEN", 10),
            Err(SubmitError::CommandInFlight)
        );
        assert_eq!(sent_payloads(&mut station), vec!["DC=CMD:V1:OPEN#0\n"]);
    }

    #[test]
    fn radio_packet_too_long_drops_command() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();
        mock_radio(&mut station).fail_send = Some(RadioError::PacketTooLong);

        station.submit("CMD:OPEN_ALL", 0).unwrap();

        assert_eq!(station.mode(), &StationMode::Idle);
        assert_eq!(station.sequence(), 0);
        assert_eq!(
            station.take_events(),
            vec![OperatorEvent::Dropped {
                body: "OPEN_ALL".to_string(),
                sequence: 0
            }]
        );
    }

    #[test]
    fn transmit_failure_retries_on_next_tick() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();
        mock_radio(&mut station).fail_send = Some(RadioError::TransmitFailure(-1));

        station.submit("CMD:IGN", 0).unwrap();
        assert!(sent_payloads(&mut station).is_empty());

        mock_radio(&mut station).fail_send = None;
        station.update(500);
        assert_eq!(sent_payloads(&mut station), vec!["DC=CMD:IGN#0\n"]);
    }

    #[test]
    fn incoming_traffic_becomes_operator_events() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();

        receive(&mut station, 10, r#"TLM:{"psi_fuel":1.0,"psi_ox":2.0}"#);
        receive(&mut station, 20, "stand rebooted");

        assert_eq!(
            station.take_events(),
            vec![
                OperatorEvent::Telemetry(r#"TLM:{"psi_fuel":1.0,"psi_ox":2.0}"#.to_string()),
                OperatorEvent::Message("stand rebooted".to_string()),
            ]
        );
    }

    #[test]
    fn heartbeat_reports_silence() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();

        station.update(5000);
        assert_eq!(
            station.take_events(),
            vec![OperatorEvent::Heartbeat {
                since_last_reception_ms: None
            }]
        );

        receive(&mut station, 6000, "PING");
        station.update(9999);
        assert!(station.take_events().is_empty());

        station.update(10_000);
        assert_eq!(
            station.take_events(),
            vec![OperatorEvent::Heartbeat {
                since_last_reception_ms: Some(4000)
            }]
        );
    }

    #[test]
    fn sequence_wraps() {
        let mut radio = MockRadio::new();
        let mut station = GroundStation::new(GroundStationConfig::default(), &mut radio, 0).unwrap();
        station.set_sequence(u32::MAX);

        station.submit("CMD:IGN", 0).unwrap();
        receive(&mut station, 10, &format!("ACK:#{}", u32::MAX));

        assert_eq!(station.sequence(), 0);
    }
}
