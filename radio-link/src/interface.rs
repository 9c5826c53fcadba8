#[cfg(feature = "std")]
pub mod mock_interface;

#[cfg(feature = "std")]
pub mod mock_topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    PacketTooLong,
    InitFailure(i16),
    TransmitFailure(i16),
    ReceiveFailure(i16),
}

/// Half-duplex packet transceiver. Reception is a single slot: a packet that is not
/// taken before the next one arrives is lost.
pub trait RadioInterface {
    fn init(&mut self) -> Result<(), RadioError>;

    fn send(&mut self, data: &[u8]) -> Result<(), RadioError>;
    fn try_receive(&mut self, data: &mut [u8]) -> Result<Option<usize>, RadioError>;

    fn as_mut_any(&mut self) -> Option<&mut dyn core::any::Any>;
}
