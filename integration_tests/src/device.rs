//! Bridged serial port client.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;

/// List the serial ports the host can see.
pub fn list_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}

/// Client for the bridged UART of one link-serial device.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    name: String,
}

impl DeviceClient {
    /// Open the bridged port of a device.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(50))
            .open()?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drain all pending data from the serial port.
    /// Reads until the line has been quiet for `quiet`.
    pub fn drain_buffer(&mut self, quiet: Duration) -> Result<usize> {
        self.port.clear(serialport::ClearBuffer::All)?;

        let mut drained = 0;
        let mut buf = [0u8; 256];
        let mut last_byte = Instant::now();
        while last_byte.elapsed() < quiet {
            match self.port.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    drained += n;
                    last_byte = Instant::now();
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(drained)
    }

    /// Write bytes into the bridge.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read exactly `len` bytes, failing if they do not all arrive within
    /// `timeout`.
    pub fn receive(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        let mut buf = [0u8; 256];
        let start = Instant::now();

        while data.len() < len && start.elapsed() < timeout {
            let want = (len - data.len()).min(buf.len());
            match self.port.read(&mut buf[..want]) {
                Ok(n) => data.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if data.len() < len {
            anyhow::bail!(
                "Timeout on {}: expected {} bytes, got {}: {:02x?}",
                self.name,
                len,
                data.len(),
                &data[..data.len().min(32)]
            );
        }

        Ok(data)
    }

    /// Check nothing arrives for `period`.
    pub fn expect_silence(&mut self, period: Duration) -> Result<()> {
        let mut buf = [0u8; 64];
        let start = Instant::now();

        while start.elapsed() < period {
            match self.port.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => anyhow::bail!(
                    "Unexpected {} bytes on {}: {:02x?}",
                    n,
                    self.name,
                    &buf[..n]
                ),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}
