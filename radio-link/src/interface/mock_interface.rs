use std::sync::{Arc, Mutex};

use shared::comms_hal::MAX_PACKET_SIZE;

use crate::mailbox::Mailbox;

use super::{mock_topology::MockAir, RadioError, RadioInterface};

pub struct MockRadio {
    pub sent_packets: Vec<Vec<u8>>,
    pub received_packets: Vec<Vec<u8>>,
    pub fail_init: bool,
    pub fail_send: Option<RadioError>,
    pub radio_id: usize,
    initialized: bool,
    pending_recv_packet: Mailbox<Vec<u8>>,
    air: Option<Arc<Mutex<MockAir>>>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            sent_packets: Vec::new(),
            received_packets: Vec::new(),
            fail_init: false,
            fail_send: None,
            radio_id: 0,
            initialized: false,
            pending_recv_packet: Mailbox::new(),
            air: None,
        }
    }

    pub fn new_on_air(air: Arc<Mutex<MockAir>>) -> Self {
        let radio_id = air
            .lock()
            .expect("Failed to lock mock air for radio init")
            .register_radio();

        Self {
            radio_id,
            air: Some(air),
            ..Self::new()
        }
    }

    pub fn add_recv_payload(&mut self, data: &[u8]) {
        if self.air.is_some() {
            panic!("When using mocked air, you should not add packets to the radio directly. Instead, send from another radio on the same air.");
        }

        self.pending_recv_packet.post(data.to_vec());
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioInterface for MockRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        if self.fail_init {
            return Err(RadioError::InitFailure(-2));
        }

        self.initialized = true;

        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), RadioError> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(RadioError::PacketTooLong);
        }

        if let Some(err) = self.fail_send {
            return Err(err);
        }

        self.sent_packets.push(data.to_vec());

        if let Some(air) = &self.air {
            air.lock()
                .expect("Failed to lock mock air to transmit")
                .transmit(self.radio_id, data);
        }

        Ok(())
    }

    fn try_receive(&mut self, data: &mut [u8]) -> Result<Option<usize>, RadioError> {
        let packet = if let Some(air) = &self.air {
            air.lock()
                .expect("Failed to lock mock air to receive")
                .take(self.radio_id)
        } else {
            self.pending_recv_packet.take()
        };

        match packet {
            Some(packet) if packet.len() > data.len() => Err(RadioError::ReceiveFailure(-7)),
            Some(packet) => {
                data[..packet.len()].copy_from_slice(&packet);
                self.received_packets.push(packet.clone());
                Ok(Some(packet.len()))
            }
            None => Ok(None),
        }
    }

    fn as_mut_any(&mut self) -> Option<&mut dyn core::any::Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_receive_keeps_latest_packet() {
        let mut radio = MockRadio::new();
        let mut buffer = [0_u8; MAX_PACKET_SIZE];

        radio.add_recv_payload(b"DC=first\n");
        radio.add_recv_payload(b"DC=second\n");

        assert_eq!(radio.try_receive(&mut buffer), Ok(Some(10)));
        assert_eq!(&buffer[..10], b"DC=second\n");
        assert_eq!(radio.try_receive(&mut buffer), Ok(None));
    }

    #[test]
    fn send_enforces_packet_ceiling() {
        let mut radio = MockRadio::new();

        assert_eq!(
            radio.send(&[b'x'; MAX_PACKET_SIZE + 1]),
            Err(RadioError::PacketTooLong)
        );
        assert!(radio.send(&[b'x'; MAX_PACKET_SIZE]).is_ok());

        radio.fail_send = Some(RadioError::TransmitFailure(-1));
        assert_eq!(radio.send(b"DC=PING\n"), Err(RadioError::TransmitFailure(-1)));
        assert_eq!(radio.sent_packets.len(), 1);
    }
}
