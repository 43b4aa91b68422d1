use std::{
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::{Duration, Instant},
};

use serialport::{SerialPort, SerialPortInfo};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::models::{
    hub_error::{HubError, HubErrorCode},
    packet::{Packet, RequestAttachPacket, RequestVoltagePacket},
};

use super::services::{SensorType, VoltageInput};

const PRODUCT_NAME: &str = "Analog Sensor Hub";
const SERIAL_NUMBER: &str = "4821";
const BAUD_RATE: u32 = 9600;

/// Bound on a single blocking read of the serial port.
const PORT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Bound on waiting for the answer to a voltage request.
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

const DISCOVERY_INTERVAL: Duration = Duration::from_millis(500);

/// Open serial port to the hub plus the bytes received but not decoded yet.
/// The buffer lives as long as the port so bytes of a following packet that
/// arrived in the same read are kept for the next one.
struct HubConnection {
    port: Box<dyn SerialPort>,
    buffer: Vec<u8>,
}

impl HubConnection {
    fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            buffer: vec![],
        }
    }
}

type SharedConnection = Arc<Mutex<Option<HubConnection>>>;

/// Sensor hub connected over USB serial. The serial port is found and opened
/// by the first channel that attaches and is shared by all channels.
/// Channel calls block the calling thread, discovery sleeps between polls and
/// reads wait on the serial port timeout.
pub struct SerialSensorHub {
    connection: SharedConnection,
}

/// One analog channel of a `SerialSensorHub`.
pub struct SerialVoltageInput {
    connection: SharedConnection,
    hub_port: Option<u8>,
    sensor_type: SensorType,
    attached: bool,
}

impl SerialSensorHub {
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a new, unbound channel handle on this hub.
    pub fn channel(&self) -> SerialVoltageInput {
        SerialVoltageInput {
            connection: self.connection.clone(),
            hub_port: None,
            sensor_type: SensorType::default(),
            attached: false,
        }
    }
}

impl Default for SerialSensorHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a port is the sensor hub.
/// Checks both the serial number and product name of the port.
#[instrument(skip_all)]
fn is_port_for_sensor_hub(port: &SerialPortInfo) -> bool {
    trace!("Checking port '{}'.", port.port_name);

    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            if let Some(serial_number) = &usb_info.serial_number {
                if serial_number != SERIAL_NUMBER {
                    debug!("Wrong serial number!");
                    return false;
                }
            } else {
                debug!("Failed to get serial number from port.");
                return false;
            }
            if let Some(product_name) = &usb_info.product {
                if product_name != PRODUCT_NAME {
                    debug!("Wrong product name!");
                    return false;
                }
            } else {
                debug!("Failed to get product name from port.");
                return false;
            }
        }
        _ => {
            debug!("Wrong port type.");
            return false;
        }
    }
    debug!("This port is the sensor hub.");
    true
}

#[instrument(skip_all)]
fn find_hub_port() -> Option<SerialPortInfo> {
    let ports = match serialport::available_ports() {
        Err(e) => {
            error!("Failed to get any ports! Error: {}", e);
            return None;
        }
        Ok(ports) => ports,
    };

    trace!("Found {} ports to check.", ports.len());

    ports.into_iter().find(is_port_for_sensor_hub)
}

/// Poll the port list until the hub shows up or `deadline` passed.
/// Blocks the calling thread between polls.
#[instrument(skip_all)]
fn wait_for_hub_port(deadline: Instant) -> Result<SerialPortInfo, HubError> {
    loop {
        trace!("Looking for hub port.");
        if let Some(port_info) = find_hub_port() {
            return Ok(port_info);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(HubError::timeout(
                "No sensor hub found on any serial port.",
            ));
        }
        trace!("Sleeping briefly before checking again.");
        thread::sleep(DISCOVERY_INTERVAL.min(deadline - now));
    }
}

fn open_hub_port(deadline: Instant) -> Result<Box<dyn SerialPort>, HubError> {
    let port_info = wait_for_hub_port(deadline)?;
    info!("Found the sensor hub! Name: {}", port_info.port_name);

    serialport::new(&port_info.port_name, BAUD_RATE)
        .timeout(PORT_TIMEOUT)
        .open()
        .map_err(|e| {
            error!("Failed to open port to sensor hub. Error: {}", e);
            HubError::io(format!("Failed to open '{}': {}", port_info.port_name, e))
        })
}

fn lock_connection(
    connection: &SharedConnection,
) -> Result<MutexGuard<'_, Option<HubConnection>>, HubError> {
    connection
        .lock()
        .map_err(|_| HubError::io("Sensor hub connection was poisoned by a panic."))
}

/// Send a single packet to the sensor hub.
#[instrument(skip_all)]
fn write_packet_to_port(port: &mut Box<dyn SerialPort>, packet: &Packet) -> Result<usize, HubError> {
    let buffer = postcard::to_vec::<Packet, 64>(packet).map_err(|e| {
        warn!("Failed to encode packet to byte array. Error: {}", e);
        HubError::protocol(format!("Failed to encode {:?}: {}", packet, e))
    })?;

    port.write_all(buffer.as_slice()).map_err(|e| {
        error!("Failed to write byte buffer to port. Error: {}", e);
        HubError::io(format!("Failed to write to the sensor hub: {}", e))
    })?;
    debug!("Successfully wrote {} bytes to port.", buffer.len());
    Ok(buffer.len())
}

/// Decode one packet from the front of a buffer.
/// Returns the packet and how many bytes it used, or `None` if the buffer
/// doesn't hold a complete packet yet.
fn decode_packet_from_buffer(buffer: &[u8]) -> Result<Option<(Packet, usize)>, HubError> {
    match postcard::take_from_bytes::<Packet>(buffer) {
        Ok((packet, remaining)) => Ok(Some((packet, buffer.len() - remaining.len()))),
        Err(postcard::Error::DeserializeUnexpectedEnd) => Ok(None),
        Err(e) => {
            warn!("Didn't decode a packet from {} bytes!", buffer.len());
            Err(HubError::protocol(format!(
                "Failed to decode response from the sensor hub: {}",
                e
            )))
        }
    }
}

/// Take the next packet out of the connection buffer, reading more bytes
/// until one is complete or `deadline` passed. Bytes after the packet stay
/// buffered.
#[instrument(skip_all)]
fn read_packet_from_port(
    connection: &mut HubConnection,
    deadline: Instant,
) -> Result<Packet, HubError> {
    let mut read_buffer: [u8; 64] = [0; 64];

    loop {
        match decode_packet_from_buffer(&connection.buffer) {
            Ok(Some((packet, used))) => {
                connection.buffer.drain(..used);
                if !connection.buffer.is_empty() {
                    trace!("Keeping {} bytes after the packet.", connection.buffer.len());
                }
                return Ok(packet);
            }
            Ok(None) => {}
            Err(e) => {
                // The stream can't be resynchronised, start over with the next read.
                connection.buffer.clear();
                return Err(e);
            }
        }

        if Instant::now() >= deadline {
            return Err(HubError::timeout("No response from the sensor hub."));
        }

        match connection.port.read(&mut read_buffer) {
            Ok(0) => {
                trace!("Read nothing.");
                thread::sleep(Duration::from_millis(10));
            }
            Ok(bytes_read) => {
                trace!("Received {} bytes", bytes_read);
                connection
                    .buffer
                    .extend_from_slice(&read_buffer[0..bytes_read]);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                trace!("Timed out waiting on bytes.");
            }
            Err(e) => {
                warn!("Failed to read from port. Error: {}", e);
                return Err(HubError::io(format!(
                    "Failed to read from the sensor hub: {}",
                    e
                )));
            }
        }
    }
}

impl SerialVoltageInput {
    /// Send a request and wait for the response about the same hub port.
    fn transact(&self, request: Packet, timeout: Duration) -> Result<Packet, HubError> {
        let hub_port = request.hub_port();
        let deadline = Instant::now() + timeout;

        let mut guard = lock_connection(&self.connection)?;
        let connection = guard
            .as_mut()
            .ok_or_else(|| HubError::not_attached("The sensor hub isn't open."))?;

        write_packet_to_port(&mut connection.port, &request)?;
        loop {
            let packet = read_packet_from_port(connection, deadline)?;
            if packet.hub_port() == hub_port {
                return Ok(packet);
            }
            debug!("Ignoring packet for hub port {}.", packet.hub_port());
        }
    }

    fn ensure_attached(&self) -> Result<u8, HubError> {
        match self.hub_port {
            Some(hub_port) if self.attached => Ok(hub_port),
            Some(hub_port) => Err(HubError::not_attached(format!(
                "Hub port {} isn't attached.",
                hub_port
            ))),
            None => Err(HubError::not_attached("Channel isn't bound to a hub port.")),
        }
    }
}

impl VoltageInput for SerialVoltageInput {
    fn set_hub_port(&mut self, hub_port: u8) {
        self.hub_port = Some(hub_port);
        self.attached = false;
    }

    #[instrument(skip(self))]
    fn open_wait_for_attachment(&mut self, timeout: Duration) -> Result<(), HubError> {
        let hub_port = self
            .hub_port
            .ok_or_else(|| HubError::not_attached("Channel isn't bound to a hub port."))?;
        let deadline = Instant::now() + timeout;

        {
            let mut guard = lock_connection(&self.connection)?;
            if guard.is_none() {
                *guard = Some(HubConnection::new(open_hub_port(deadline)?));
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.transact(
            Packet::RequestAttach(RequestAttachPacket { hub_port }),
            remaining,
        ) {
            Ok(Packet::Attached(_)) => {
                info!("Hub port {} attached.", hub_port);
                self.attached = true;
                Ok(())
            }
            Ok(Packet::ReportError(report)) => Err(HubError::new(
                report.code,
                format!("Hub port {} failed to attach.", hub_port),
            )),
            Ok(other) => Err(HubError::protocol(format!(
                "Unexpected response to attach request: {:?}",
                other
            ))),
            Err(e) if e.code == HubErrorCode::Timeout => {
                Err(HubError::timeout(format!(
                    "Hub port {} didn't attach within {} ms.",
                    hub_port,
                    timeout.as_millis()
                )))
            }
            Err(e) => Err(e),
        }
    }

    fn set_sensor_type(&mut self, sensor_type: SensorType) -> Result<(), HubError> {
        let hub_port = self.ensure_attached()?;
        debug!("Hub port {} sensor type set to {:?}.", hub_port, sensor_type);
        self.sensor_type = sensor_type;
        Ok(())
    }

    #[instrument(skip(self))]
    fn voltage(&mut self) -> Result<f64, HubError> {
        let hub_port = self.ensure_attached()?;

        match self.transact(
            Packet::RequestVoltage(RequestVoltagePacket { hub_port }),
            RESPONSE_TIMEOUT,
        )? {
            Packet::ReportVoltage(report) => {
                let raw = report.volts as f64;
                if !raw.is_finite() {
                    return Err(HubError::protocol(format!(
                        "Hub port {} reported a non finite voltage.",
                        hub_port
                    )));
                }
                trace!("Hub port {} raw voltage {}.", hub_port, raw);
                Ok(self.sensor_type.convert(raw))
            }
            Packet::ReportError(report) => Err(HubError::new(
                report.code,
                format!("Hub port {} failed to report a voltage.", hub_port),
            )),
            other => Err(HubError::protocol(format!(
                "Unexpected response to voltage request: {:?}",
                other
            ))),
        }
    }
}
