use alloc::string::{String, ToString};

use log::{debug, info, trace, warn};
use radio_link::{interface::RadioInterface, RadioLink, RadioLinkError};
use serde::{Deserialize, Serialize};
use shared::{
    comms_hal::{
        command_line, Message, SequenceNumber, WiredLink, DEFAULT_NETWORK_TAG, TELEMETRY_PREFIX,
    },
    util::elapsed_ms,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub network_tag: String,
    pub link_timeout_ms: u32,
    pub ack_repeat_count: u8,
    pub ack_spacing_ms: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network_tag: DEFAULT_NETWORK_TAG.to_string(),
            link_timeout_ms: 3000,
            ack_repeat_count: 3,
            ack_spacing_ms: 200,
        }
    }
}

/// Repeated acks for the last forwarded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckBurst {
    pub sequence: SequenceNumber,
    pub remaining: u8,
    pub last_sent_at: u32,
}

pub struct RadioRelay<'a> {
    pub config: RelayConfig,
    pub radio: RadioLink<'a>,
    pub wired: &'a mut dyn WiredLink,
    last_valid_reception_at: u32,
    link_assumed_down: bool,
    ack_burst: Option<AckBurst>,
}

impl<'a> RadioRelay<'a> {
    pub fn new(
        config: RelayConfig,
        interface: &'a mut dyn RadioInterface,
        wired: &'a mut dyn WiredLink,
        now_ms: u32,
    ) -> Result<Self, RadioLinkError> {
        let radio = RadioLink::new(&config.network_tag, interface)?;

        Ok(Self {
            config,
            radio,
            wired,
            last_valid_reception_at: now_ms,
            link_assumed_down: false,
            ack_burst: None,
        })
    }

    pub fn update(&mut self, now_ms: u32) {
        if let Some(message) = self.radio.recv_message() {
            self.handle_message(message, now_ms);
        }

        if let Some(line) = self.wired.read_line() {
            self.handle_wired_line(line.trim());
        }

        self.update_ack_burst(now_ms);
        self.check_link(now_ms);
    }

    fn handle_message(&mut self, message: Message, now_ms: u32) {
        self.last_valid_reception_at = now_ms;

        if self.link_assumed_down {
            info!("Radio link restored");
            self.link_assumed_down = false;
        }

        match message {
            Message::Command { body, sequence } => {
                info!("Forwarding command '{}' #{}", body, sequence);
                self.wired.write_line(&command_line(&body));
                self.start_ack_burst(sequence, now_ms);
            }
            Message::Ping => {
                trace!("Ping");
            }
            other => {
                self.wired.write_line(&other.encode());
            }
        }
    }

    fn handle_wired_line(&mut self, line: &str) {
        if line.starts_with(TELEMETRY_PREFIX) {
            let _ = self.radio.send_payload(line);
        } else if !line.is_empty() {
            debug!("Actuator: {}", line);
        }
    }

    fn start_ack_burst(&mut self, sequence: SequenceNumber, now_ms: u32) {
        if let Some(burst) = self.ack_burst {
            if burst.sequence != sequence {
                debug!("Ack burst #{} replaced by #{}", burst.sequence, sequence);
            }
        }

        self.ack_burst = None;

        if self.config.ack_repeat_count == 0 {
            return;
        }

        self.send_ack(sequence);
        self.ack_burst = Some(AckBurst {
            sequence,
            remaining: self.config.ack_repeat_count - 1,
            last_sent_at: now_ms,
        })
        .filter(|burst| burst.remaining > 0);
    }

    fn update_ack_burst(&mut self, now_ms: u32) {
        let Some(mut burst) = self.ack_burst else {
            return;
        };

        if elapsed_ms(now_ms, burst.last_sent_at) < self.config.ack_spacing_ms {
            return;
        }

        self.send_ack(burst.sequence);
        burst.remaining -= 1;
        burst.last_sent_at = now_ms;

        self.ack_burst = Some(burst).filter(|burst| burst.remaining > 0);
    }

    fn send_ack(&mut self, sequence: SequenceNumber) {
        let _ = self.radio.send_message(&Message::Ack { sequence });
    }

    // Edge-triggered: one CLOSE_ALL per outage.
    fn check_link(&mut self, now_ms: u32) {
        if self.link_assumed_down {
            return;
        }

        let silent_ms = elapsed_ms(now_ms, self.last_valid_reception_at);

        if silent_ms >= self.config.link_timeout_ms {
            warn!("No valid packet for {} ms, closing all valves", silent_ms);
            self.wired.write_line(&command_line("CLOSE_ALL"));
            self.link_assumed_down = true;
        }
    }

    pub fn link_assumed_down(&self) -> bool {
        self.link_assumed_down
    }

    pub fn last_valid_reception_at(&self) -> u32 {
        self.last_valid_reception_at
    }

    pub fn ack_burst(&self) -> Option<AckBurst> {
        self.ack_burst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radio_link::interface::mock_interface::MockRadio;
    use shared::stand_mock::WiredLinkMock;

    fn mock_radio<'b>(relay: &'b mut RadioRelay) -> &'b mut MockRadio {
        relay
            .radio
            .interface()
            .as_mut_any()
            .unwrap()
            .downcast_mut::<MockRadio>()
            .unwrap()
    }

    fn mock_wired<'b>(relay: &'b mut RadioRelay) -> &'b mut WiredLinkMock {
        relay
            .wired
            .as_mut_any()
            .downcast_mut::<WiredLinkMock>()
            .unwrap()
    }

    fn receive(relay: &mut RadioRelay, now_ms: u32, payload: &str) {
        let packet = format!("DC={}\n", payload);
        mock_radio(relay).add_recv_payload(packet.as_bytes());
        relay.update(now_ms);
    }

    fn sent_payloads(relay: &mut RadioRelay) -> Vec<String> {
        mock_radio(relay)
            .sent_packets
            .drain(..)
            .map(|packet| String::from_utf8(packet).unwrap())
            .collect()
    }

    #[test]
    fn command_forwarded_then_acked_three_times() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        receive(&mut relay, 100, "CMD:V3:OPEN#0");
        assert_eq!(mock_wired(&mut relay).take_written(), vec!["CMD:V3:OPEN"]);
        assert_eq!(sent_payloads(&mut relay), vec!["DC=ACK:#0\n"]);

        relay.update(299);
        assert!(sent_payloads(&mut relay).is_empty());

        relay.update(300);
        relay.update(400);
        relay.update(500);
        assert_eq!(sent_payloads(&mut relay), vec!["DC=ACK:#0\n", "DC=ACK:#0\n"]);
        assert_eq!(relay.ack_burst(), None);

        relay.update(900);
        assert!(sent_payloads(&mut relay).is_empty());
        assert!(mock_wired(&mut relay).written().is_empty());
    }

    #[test]
    fn ack_carries_forwarded_sequence() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        receive(&mut relay, 10, "CMD:V2:OPEN#7");
        assert_eq!(mock_wired(&mut relay).take_written(), vec!["CMD:V2:OPEN"]);

        let sent = sent_payloads(&mut relay);
        assert_eq!(sent, vec!["DC=ACK:#7\n"]);

        let payload = sent[0].strip_prefix("DC=").unwrap().trim_end();
        assert_eq!(Message::decode(payload), Ok(Message::Ack { sequence: 7 }));
    }

    #[test]
    fn new_command_replaces_ack_burst() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        receive(&mut relay, 0, "CMD:V1:OPEN#4");
        receive(&mut relay, 100, "CMD:V2:OPEN#5");
        relay.update(300);
        relay.update(500);
        relay.update(700);

        assert_eq!(
            sent_payloads(&mut relay),
            vec!["DC=ACK:#4\n", "DC=ACK:#5\n", "DC=ACK:#5\n", "DC=ACK:#5\n"]
        );
    }

    #[test]
    fn pings_keep_link_alive_without_forwarding() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        for now_ms in (1000..=10_000).step_by(1000) {
            receive(&mut relay, now_ms, "PING");
        }

        assert!(!relay.link_assumed_down());
        assert!(mock_wired(&mut relay).written().is_empty());
        assert!(sent_payloads(&mut relay).is_empty());
    }

    #[test]
    fn link_loss_closes_all_once_per_outage() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        relay.update(2999);
        assert!(mock_wired(&mut relay).written().is_empty());

        relay.update(3000);
        relay.update(4000);
        relay.update(10_000);
        assert!(relay.link_assumed_down());
        assert_eq!(mock_wired(&mut relay).take_written(), vec!["CMD:CLOSE_ALL"]);

        receive(&mut relay, 11_000, "PING");
        assert!(!relay.link_assumed_down());

        relay.update(13_999);
        assert!(mock_wired(&mut relay).written().is_empty());
        relay.update(14_000);
        assert_eq!(mock_wired(&mut relay).take_written(), vec!["CMD:CLOSE_ALL"]);
    }

    #[test]
    fn malformed_packets_do_not_count_as_reception() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        receive(&mut relay, 1000, "CMD:IGN#notanumber");
        mock_radio(&mut relay).add_recv_payload(b"DIET_COKE=PING\n");
        relay.update(2000);

        assert_eq!(relay.last_valid_reception_at(), 0);
        relay.update(3000);
        assert_eq!(mock_wired(&mut relay).take_written(), vec!["CMD:CLOSE_ALL"]);
        assert!(sent_payloads(&mut relay).is_empty());
    }

    #[test]
    fn telemetry_goes_out_diagnostics_stay_local() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        wired.push_incoming(r#"TLM:{"psi_fuel":1.0,"psi_ox":2.0}"#);
        wired.push_incoming("Valve V1 Open");
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        relay.update(10);
        relay.update(20);

        assert_eq!(
            sent_payloads(&mut relay),
            vec!["DC=TLM:{\"psi_fuel\":1.0,\"psi_ox\":2.0}\n"]
        );
    }

    #[test]
    fn other_messages_forwarded_verbatim() {
        let mut radio = MockRadio::new();
        let mut wired = WiredLinkMock::new();
        let mut relay =
            RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).unwrap();

        receive(&mut relay, 10, "ACK:#9");
        receive(&mut relay, 20, "hello stand");

        assert_eq!(
            mock_wired(&mut relay).take_written(),
            vec!["ACK:#9", "hello stand"]
        );
        assert!(sent_payloads(&mut relay).is_empty());
    }

    #[test]
    fn radio_init_failure_is_fatal() {
        let mut radio = MockRadio::new();
        radio.fail_init = true;
        let mut wired = WiredLinkMock::new();

        assert!(RadioRelay::new(RelayConfig::default(), &mut radio, &mut wired, 0).is_err());
    }
}
