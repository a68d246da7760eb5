use super::EthernetAddress;
use crate::Result;

/// The Ethernet controller driver, as seen by the stack.
///
/// Frames passed in and out are complete Ethernet II frames without the FCS.
/// Padding short frames to the 60 byte minimum is left to the controller.
pub trait Device {
    /// Program the station address and bring the controller up.
    fn init(&mut self, mac: EthernetAddress);

    // Err(TransmitFailed) when the controller reports an aborted transmission
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    // copies one pending frame into `buffer`, 0 when none is waiting
    fn recv(&mut self, buffer: &mut [u8]) -> usize;

    fn is_link_up(&mut self) -> bool;
}
