use std::sync::Arc;
use super::{SerialLink, Command, Opcode, Response};
use crate::error::Result;

/// Typed operations over the line protocol: one encode/decode pair per
/// opcode the firmware understands.
#[derive(Clone)]
pub struct CommandCodec{
    link: Arc<SerialLink>,
}

impl CommandCodec{
    pub fn new(link: Arc<SerialLink>) -> Self{
        CommandCodec{ link }
    }

    pub fn link(&self) -> &SerialLink{
        &self.link
    }

    //length check happens before the link is touched
    fn send(&self, command: Command) -> Result<f64>{
        let text = command.encode()?;
        let line = self.link.exchange(&text)?;
        Response::decode(&line)?.require(command.opcode.field())
    }

    /// Heading from the compass in degrees.
    pub fn get_heading(&self) -> Result<f64>{
        self.send(Command::query(Opcode::Compass))
    }

    pub fn get_pitch(&self) -> Result<f64>{
        self.send(Command::query(Opcode::Pitch))
    }

    pub fn get_roll(&self) -> Result<f64>{
        self.send(Command::query(Opcode::Roll))
    }

    /// Wind angle relative to the bow, as read by the vane.
    pub fn get_wind(&self) -> Result<f64>{
        self.send(Command::query(Opcode::Wind))
    }

    /// Apply a rudder PWM value; returns the value the firmware echoed.
    pub fn set_rudder(&self, value: i32) -> Result<i32>{
        self.send(Command::with_arg(Opcode::Rudder, value)).map(|v| v.round() as i32)
    }

    /// Apply a winch PWM value; returns the value the firmware echoed.
    pub fn set_sail(&self, value: i32) -> Result<i32>{
        self.send(Command::with_arg(Opcode::Sail, value)).map(|v| v.round() as i32)
    }

    /// Decode the next line the firmware sends without issuing a command.
    pub fn read_response(&self) -> Result<Response>{
        let line = self.link.read_line()?;
        Response::decode(&line)
    }
}

#[cfg(test)]
mod tests{
    use super::*;
    use crate::error::Error;
    use crate::testing::MockPort;

    fn codec_with(port: MockPort) -> CommandCodec{
        CommandCodec::new(Arc::new(SerialLink::from_port("mock", Box::new(port))))
    }

    #[test]
    fn test_sensor_queries(){
        let codec = codec_with(MockPort::boat(271.0, 45.0));
        assert_eq!(codec.get_heading().unwrap(), 271.0);
        assert_eq!(codec.get_wind().unwrap(), 45.0);
        assert_eq!(codec.get_pitch().unwrap(), 2.5);
        assert_eq!(codec.get_roll().unwrap(), -4.0);
    }

    #[test]
    fn test_rudder_echo_round_trip(){
        let port = MockPort::boat(0.0, 0.0);
        let written = port.written();
        let codec = codec_with(port);

        assert_eq!(codec.set_rudder(1511).unwrap(), 1511);
        assert_eq!(&*written.lock(), b"r1511\n");
    }

    #[test]
    fn test_too_long_is_never_sent(){
        let port = MockPort::boat(0.0, 0.0);
        let written = port.written();
        let codec = codec_with(port);

        assert!(matches!(codec.set_sail(123456789), Err(Error::CommandTooLong{ .. })));
        assert!(written.lock().is_empty());
    }

    #[test]
    fn test_wrong_field_is_protocol_error(){
        let codec = codec_with(MockPort::scripted(vec![b"{\"sail\": 1500}\n".to_vec()]));
        assert!(matches!(codec.set_rudder(1500), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unparsable_line_is_protocol_error(){
        let codec = codec_with(MockPort::scripted(vec![b"compass=12\n".to_vec()]));
        assert!(matches!(codec.get_heading(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_read_response(){
        let port = MockPort::silent();
        port.push_stale(b"{\"compass\": 12}\n");
        let codec = codec_with(port);
        assert_eq!(codec.read_response().unwrap().compass, Some(12.0));
    }
}
