use alloc::string::{String, ToString};

use log::{trace, warn};
use shared::comms_hal::{Message, MAX_PACKET_SIZE};

use crate::{
    interface::{RadioError, RadioInterface},
    serdes::{deserialize_frame, serialize_frame, FrameError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioLinkError {
    Frame(FrameError),
    Radio(RadioError),
}

impl From<FrameError> for RadioLinkError {
    fn from(err: FrameError) -> Self {
        RadioLinkError::Frame(err)
    }
}

impl From<RadioError> for RadioLinkError {
    fn from(err: RadioError) -> Self {
        RadioLinkError::Radio(err)
    }
}

impl RadioLinkError {
    /// Oversize packets can never be sent, no matter how often they are retried.
    pub fn is_packet_too_long(&self) -> bool {
        matches!(
            self,
            RadioLinkError::Frame(FrameError::PacketTooLong)
                | RadioLinkError::Radio(RadioError::PacketTooLong)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u32,
    pub send_failures: u32,
    pub received: u32,
    pub discarded: u32,
}

/// Tagged text packets over a radio interface.
pub struct RadioLink<'a> {
    tag: String,
    interface: &'a mut dyn RadioInterface,
    working_buffer: [u8; MAX_PACKET_SIZE],
    stats: LinkStats,
}

impl<'a> RadioLink<'a> {
    /// Brings the radio up. A failure here is the only fatal error a node has.
    pub fn new(tag: &str, interface: &'a mut dyn RadioInterface) -> Result<Self, RadioLinkError> {
        interface.init()?;

        Ok(Self {
            tag: tag.to_string(),
            interface,
            working_buffer: [0_u8; MAX_PACKET_SIZE],
            stats: LinkStats::default(),
        })
    }

    pub fn send_message(&mut self, message: &Message) -> Result<(), RadioLinkError> {
        self.send_payload(&message.encode())
    }

    pub fn send_payload(&mut self, payload: &str) -> Result<(), RadioLinkError> {
        let result = self.transmit(payload);

        match &result {
            Ok(()) => {
                self.stats.sent = self.stats.sent.wrapping_add(1);
                trace!("TX {}{}", self.tag, payload);
            }
            Err(err) => {
                self.stats.send_failures = self.stats.send_failures.wrapping_add(1);
                warn!("Failed to send '{}': {:?}", payload, err);
            }
        }

        result
    }

    fn transmit(&mut self, payload: &str) -> Result<(), RadioLinkError> {
        let size = serialize_frame(&self.tag, payload, &mut self.working_buffer)?;
        self.interface.send(&self.working_buffer[..size])?;

        Ok(())
    }

    /// Takes whatever packet is waiting and decodes it. Foreign, malformed and
    /// undecodable packets are dropped here and never reach the node.
    pub fn recv_message(&mut self) -> Option<Message> {
        let size = match self.interface.try_receive(&mut self.working_buffer) {
            Ok(Some(size)) => size,
            Ok(None) => return None,
            Err(err) => {
                warn!("Radio receive failed: {:?}", err);
                return None;
            }
        };

        let payload = match deserialize_frame(&self.tag, &self.working_buffer[..size]) {
            Ok(payload) => payload,
            Err(err) => {
                self.stats.discarded = self.stats.discarded.wrapping_add(1);
                trace!("Discarding {} byte packet: {:?}", size, err);
                return None;
            }
        };

        match Message::decode(payload) {
            Ok(message) => {
                self.stats.received = self.stats.received.wrapping_add(1);
                trace!("RX {}{}", self.tag, payload);
                Some(message)
            }
            Err(err) => {
                self.stats.discarded = self.stats.discarded.wrapping_add(1);
                trace!("Discarding undecodable payload '{}': {:?}", payload, err);
                None
            }
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn interface(&mut self) -> &mut dyn RadioInterface {
        self.interface
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::interface::mock_interface::MockRadio;

    #[test]
    fn init_failure_is_returned() {
        let mut radio = MockRadio::new();
        radio.fail_init = true;

        assert_eq!(
            RadioLink::new("DC=", &mut radio).err(),
            Some(RadioLinkError::Radio(RadioError::InitFailure(-2)))
        );
    }

    #[test]
    fn send_frames_message() {
        let mut radio = MockRadio::new();
        let mut link = RadioLink::new("DC=", &mut radio).unwrap();

        link.send_message(&Message::Ack { sequence: 3 }).unwrap();
        assert_eq!(link.stats().sent, 1);

        assert_eq!(radio.sent_packets, vec![b"DC=ACK:#3\n".to_vec()]);
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let mut radio = MockRadio::new();
        let mut link = RadioLink::new("DC=", &mut radio).unwrap();

        let err = link.send_payload(&"x".repeat(300)).unwrap_err();
        assert!(err.is_packet_too_long());
        assert_eq!(link.stats().send_failures, 1);
    }

    #[test]
    fn discards_foreign_and_malformed_packets() {
        let mut radio = MockRadio::new();
        radio.add_recv_payload(b"DIET_COKE=PING\n");
        {
            let mut link = RadioLink::new("DC=", &mut radio).unwrap();
            assert_eq!(link.recv_message(), None);
            assert_eq!(link.stats().discarded, 1);
        }

        radio.add_recv_payload(b"DC=CMD:IGN#abc\n");
        {
            let mut link = RadioLink::new("DC=", &mut radio).unwrap();
            assert_eq!(link.recv_message(), None);
        }

        radio.add_recv_payload(b"DC=PING\n");
        let mut link = RadioLink::new("DC=", &mut radio).unwrap();
        assert_eq!(link.recv_message(), Some(Message::Ping));
        assert_eq!(link.stats().received, 1);
        assert_eq!(link.recv_message(), None);
    }
}
