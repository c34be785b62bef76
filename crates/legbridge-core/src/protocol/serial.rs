//! Serial port handling
//!
//! Opens the controller board's serial device for async use and lists the
//! ports available on this machine.

use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use super::{LinkConfig, ProtocolError};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyAMA0" or "COM3")
    pub name: String,

    /// USB product name (if USB device)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let product = match info.port_type {
            SerialPortType::UsbPort(usb_info) => usb_info.product,
            _ => None,
        };

        Self {
            name: info.port_name,
            product,
        }
    }
}

/// Sort key so that on-board UARTs (ttyAMA*, ttyS*) come first, then
/// USB adapters (ttyACM*, ttyUSB*), each ordered numerically by suffix.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let prefixes = ["ttyAMA", "ttyS", "ttyACM", "ttyUSB"];
    for (rank, prefix) in prefixes.iter().enumerate() {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank as u8, num, basename.to_string());
        }
    }
    (prefixes.len() as u8, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // The Pi's on-board UART is not always reported by the enumeration API
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyAMA") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone()).or_insert_with(|| PortInfo {
                        name: full,
                        product: None,
                    });
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open the configured serial port, 8N1 without flow control.
///
/// Must be called from within a tokio runtime.
pub fn open_port(config: &LinkConfig) -> Result<SerialStream, ProtocolError> {
    let port = tokio_serial::new(&config.port_name, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()?;
    info!(port = %config.port_name, baud = config.baud_rate, "serial port opened");
    Ok(port)
}
