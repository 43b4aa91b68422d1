use serde::{Deserialize, Serialize};

use super::hub_error::HubErrorCode;

/// Used to communicate with the sensor hub over its serial link.
/// Every request names the hub port it is about and every response echoes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Packet {
    RequestAttach(RequestAttachPacket),
    Attached(AttachedPacket),
    RequestVoltage(RequestVoltagePacket),
    ReportVoltage(ReportVoltagePacket),
    ReportError(ReportErrorPacket),
}

/// Ask the hub to bring up the channel on a hub port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestAttachPacket {
    pub hub_port: u8,
}

/// The hub found a device on the hub port and it is ready to be read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttachedPacket {
    pub hub_port: u8,
}

/// Ask the hub for the latest analog reading on a hub port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestVoltagePacket {
    pub hub_port: u8,
}

/// Latest analog reading of a hub port. This is the raw signal voltage,
/// sensor specific scaling happens on the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportVoltagePacket {
    pub hub_port: u8,
    pub volts: f32,
}

/// The hub failed to serve a request for a hub port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportErrorPacket {
    pub hub_port: u8,
    pub code: HubErrorCode,
}

impl Packet {
    /// Hub port the packet is about.
    pub fn hub_port(&self) -> u8 {
        match self {
            Packet::RequestAttach(p) => p.hub_port,
            Packet::Attached(p) => p.hub_port,
            Packet::RequestVoltage(p) => p.hub_port,
            Packet::ReportVoltage(p) => p.hub_port,
            Packet::ReportError(p) => p.hub_port,
        }
    }
}
