pub mod protocol;
pub mod codec;
pub use protocol::*;
pub use codec::CommandCodec;

use std::io::{self, Read, Write};
use std::time::Duration;
use parking_lot::Mutex;
use serialport::{ClearBuffer, SerialPort};
use crate::error::{Error, Result};

pub const DEFAULT_BAUD: u32 = 115200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_LINE_LEN: usize = 256;

//anything the link can talk through: a real serial port or a test double
pub trait Port: Read + Write + Send{
    //drop whatever is sitting unread in the receive buffer
    fn clear_input(&mut self) -> io::Result<()>;
}

impl Port for Box<dyn SerialPort>{
    fn clear_input(&mut self) -> io::Result<()>{
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

//stands in for a released port; every operation fails
struct ClosedPort;

fn not_connected() -> io::Error{
    io::Error::new(io::ErrorKind::NotConnected, "serial link closed")
}

impl Read for ClosedPort{
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize>{
        Err(not_connected())
    }
}

impl Write for ClosedPort{
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize>{
        Err(not_connected())
    }

    fn flush(&mut self) -> io::Result<()>{
        Err(not_connected())
    }
}

impl Port for ClosedPort{
    fn clear_input(&mut self) -> io::Result<()>{
        Err(not_connected())
    }
}

/// Line-based request/response channel to the microcontroller.
///
/// Every access goes through one mutex, so at most one exchange is on the
/// wire at a time no matter how many threads share the link.
pub struct SerialLink{
    port: Mutex<Box<dyn Port>>,
    name: String,
}

impl SerialLink{
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self>{
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| Error::connection(port_name, e))?;

        log::info!("Opened serial port {} at {} baud", port_name, baud_rate);
        Ok(Self::from_port(port_name, Box::new(port)))
    }

    pub fn from_port(name: &str, port: Box<dyn Port>) -> Self{
        SerialLink{
            port: Mutex::new(port),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str{
        &self.name
    }

    /// One complete exchange: flush stale input, send `command` plus a
    /// newline, block for one response line.
    pub fn exchange(&self, command: &str) -> Result<String>{
        let mut port = self.port.lock();

        port.clear_input()?;

        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(b'\n');
        port.write_all(&frame)?;
        port.flush()?;

        let line = read_line_from(&mut **port)?;
        log::debug!("{}: {:?} -> {:?}", self.name, command, line);
        Ok(line)
    }

    /// Release the underlying port. Later exchanges fail with `Error::Io`,
    /// including through clones of a codec that still share this link.
    pub fn close(&self){
        let old = std::mem::replace(&mut *self.port.lock(), Box::new(ClosedPort));
        drop(old);
        log::info!("Closed serial port {}", self.name);
    }

    /// Read one unsolicited line without sending anything.
    pub fn read_line(&self) -> Result<String>{
        let mut port = self.port.lock();
        let line = read_line_from(&mut **port)?;
        log::trace!("{}: unsolicited {:?}", self.name, line);
        Ok(line)
    }
}

//byte at a time so nothing past the terminator gets swallowed
fn read_line_from(port: &mut dyn Port) -> Result<String>{
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];

    loop{
        match port.read(&mut byte){
            Ok(0) =>{
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial port closed mid-line"
                )));
            }
            Ok(_) =>{
                match byte[0]{
                    b'\n' => break,
                    b'\r' => {}
                    b => line.push(b),
                }
                if line.len() > MAX_LINE_LEN{
                    return Err(Error::Protocol(format!(
                        "response line exceeds {} bytes", MAX_LINE_LEN
                    )));
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => return Err(Error::Timeout),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }

    String::from_utf8(line).map_err(|e| Error::Protocol(format!("non-UTF-8 response: {}", e)))
}

#[cfg(test)]
mod tests{
    use super::*;
    use crate::testing::MockPort;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_exchange_writes_terminated_command(){
        let port = MockPort::echo();
        let written = port.written();
        let link = SerialLink::from_port("mock", Box::new(port));

        let line = link.exchange("c").unwrap();
        assert_eq!(line, r#"{"echo": "c"}"#);
        assert_eq!(&*written.lock(), b"c\n");
    }

    #[test]
    fn test_exchange_discards_stale_input(){
        let port = MockPort::echo();
        port.push_stale(b"{\"compass\": 999}\n");
        let link = SerialLink::from_port("mock", Box::new(port));

        let line = link.exchange("p").unwrap();
        assert_eq!(line, r#"{"echo": "p"}"#);
    }

    #[test]
    fn test_timeout_is_distinct_outcome(){
        let link = SerialLink::from_port("mock", Box::new(MockPort::silent()));
        assert!(matches!(link.exchange("c"), Err(Error::Timeout)));
    }

    #[test]
    fn test_crlf_is_stripped(){
        let port = MockPort::scripted(vec![b"{\"roll\": 2}\r\n".to_vec()]);
        let link = SerialLink::from_port("mock", Box::new(port));
        assert_eq!(link.exchange("&").unwrap(), r#"{"roll": 2}"#);
    }

    #[test]
    fn test_read_line_unsolicited(){
        let port = MockPort::silent();
        port.push_stale(b"hello\n");
        let link = SerialLink::from_port("mock", Box::new(port));
        assert_eq!(link.read_line().unwrap(), "hello");
    }

    #[test]
    fn test_close_releases_port(){
        let port = MockPort::echo();
        let written = port.written();
        let link = SerialLink::from_port("mock", Box::new(port));
        assert_eq!(Arc::strong_count(&written), 2);

        link.close();
        assert_eq!(Arc::strong_count(&written), 1);
        assert!(matches!(link.exchange("c"), Err(Error::Io(_))));
        assert!(matches!(link.read_line(), Err(Error::Io(_))));
    }

    #[test]
    fn test_concurrent_exchanges_never_interleave(){
        let link = Arc::new(SerialLink::from_port("mock", Box::new(MockPort::echo())));

        let handles: Vec<_> = ["r1500", "s1800"].iter().map(|cmd|{
            let link = Arc::clone(&link);
            let cmd = cmd.to_string();
            thread::spawn(move ||{
                for _ in 0..500{
                    let line = link.exchange(&cmd).unwrap();
                    assert_eq!(line, format!(r#"{{"echo": "{}"}}"#, cmd));
                }
            })
        }).collect();

        for handle in handles{
            handle.join().unwrap();
        }
    }
}
