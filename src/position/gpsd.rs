//! gpsd client speaking the JSON watch protocol over TCP.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use super::{FixRecord, FixSource};
use crate::error::{Error, Result};

/// Default gpsd listening address
pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// Fix stream from a local gpsd instance
pub struct GpsdSource {
    reader: BufReader<TcpStream>,
    address: String,
    //bytes of a report that has not been terminated yet
    partial: Vec<u8>,
}

impl GpsdSource {
    /// Connect and enable watch mode
    pub fn connect(address: &str) -> Result<Self> {
        let mut stream = TcpStream::connect(address).map_err(|e| Error::connection(address, e))?;
        stream
            .write_all(WATCH_COMMAND)
            .map_err(|e| Error::connection(address, e))?;

        log::info!("Watching gpsd at {}", address);

        Ok(Self {
            reader: BufReader::new(stream),
            address: address.to_string(),
            partial: Vec::new(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn has_line(&self) -> bool {
        self.partial.last() == Some(&b'\n')
    }

    // read_until keeps whatever it consumed before a timeout, so a report
    // split across waits is completed by the next call
    fn fill_line(&mut self) -> io::Result<usize> {
        self.reader.read_until(b'\n', &mut self.partial)
    }
}

impl FixSource for GpsdSource {
    fn has_data(&mut self, timeout: Duration) -> bool {
        if self.has_line() {
            return true;
        }

        //zero would mean "block forever" to the socket
        let timeout = timeout.max(Duration::from_millis(1));
        if let Err(e) = self.reader.get_ref().set_read_timeout(Some(timeout)) {
            log::warn!("gpsd {}: cannot set read timeout: {}", self.address, e);
            return false;
        }

        match self.fill_line() {
            // eof: let next_fix report the closed connection
            Ok(0) => true,
            Ok(_) => self.has_line(),
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                false
            }
            Err(e) => {
                log::warn!("gpsd {}: read failed: {}", self.address, e);
                false
            }
        }
    }

    fn next_fix(&mut self) -> Result<FixRecord> {
        if !self.has_line() {
            // read_until only stops short of a newline at eof
            self.fill_line()?;
            if !self.has_line() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "gpsd closed the connection",
                )));
            }
        }

        let line = std::mem::take(&mut self.partial);
        let line = String::from_utf8_lossy(&line);
        log::trace!("gpsd: {}", line.trim_end());
        serde_json::from_str(line.trim()).map_err(Error::from)
    }
}
