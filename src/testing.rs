//! In-memory doubles for the serial port and the fix source.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use parking_lot::Mutex;

use crate::link::Port;
use crate::position::{FixRecord, FixSource};

type Responder = Box<dyn FnMut(&str) -> Option<Vec<u8>> + Send>;

struct PortState{
    rx: VecDeque<u8>,
    pending: Vec<u8>,
}

/// Fake serial port. Each full line written is passed to a responder whose
/// reply is queued for reading; reads on an empty queue time out.
pub struct MockPort{
    state: Arc<Mutex<PortState>>,
    written: Arc<Mutex<Vec<u8>>>,
    responder: Responder,
}

impl MockPort{
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Option<Vec<u8>> + Send + 'static,
    {
        MockPort{
            state: Arc::new(Mutex::new(PortState{ rx: VecDeque::new(), pending: Vec::new() })),
            written: Arc::new(Mutex::new(Vec::new())),
            responder: Box::new(responder),
        }
    }

    pub fn echo() -> Self{
        Self::with_responder(|cmd| Some(format!("{{\"echo\": \"{}\"}}\n", cmd).into_bytes()))
    }

    pub fn silent() -> Self{
        Self::with_responder(|_| None)
    }

    pub fn scripted(lines: Vec<Vec<u8>>) -> Self{
        let mut lines: VecDeque<Vec<u8>> = lines.into();
        Self::with_responder(move |_| lines.pop_front())
    }

    /// Answers like the rig firmware: fixed sensor values, setters echo.
    pub fn boat(heading: f64, wind: f64) -> Self{
        Self::with_responder(move |cmd|{
            let (op, arg) = cmd.split_at(1);
            let reply = match op{
                "c" => format!("{{\"compass\": {}}}", heading),
                "w" => format!("{{\"wind\": {}}}", wind),
                "p" => "{\"pitch\": 2.5}".to_string(),
                "&" => "{\"roll\": -4.0}".to_string(),
                "r" => format!("{{\"rudder\": {}}}", arg),
                "s" => format!("{{\"sail\": {}}}", arg),
                _ => return None,
            };
            Some(format!("{}\n", reply).into_bytes())
        })
    }

    pub fn push_stale(&self, bytes: &[u8]){
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    pub fn written(&self) -> Arc<Mutex<Vec<u8>>>{
        Arc::clone(&self.written)
    }
}

impl Read for MockPort{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>{
        let mut state = self.state.lock();
        if state.rx.is_empty(){
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timed out"));
        }
        let mut n = 0;
        while n < buf.len(){
            match state.rx.pop_front(){
                Some(b) =>{
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockPort{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>{
        self.written.lock().extend_from_slice(buf);

        let mut state = self.state.lock();
        for &b in buf{
            if b == b'\n'{
                let line = String::from_utf8_lossy(&state.pending).into_owned();
                state.pending.clear();
                if let Some(reply) = (self.responder)(&line){
                    state.rx.extend(reply);
                }
            }else{
                state.pending.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>{
        Ok(())
    }
}

impl Port for MockPort{
    fn clear_input(&mut self) -> io::Result<()>{
        self.state.lock().rx.clear();
        Ok(())
    }
}

/// Scripted fix stream. `None` entries model a wait that times out.
pub struct ScriptedFixes{
    events: VecDeque<Option<FixRecord>>,
    consumed: Arc<AtomicUsize>,
}

impl ScriptedFixes{
    pub fn new(events: Vec<Option<FixRecord>>) -> Self{
        ScriptedFixes{
            events: events.into(),
            consumed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn consumed(&self) -> Arc<AtomicUsize>{
        Arc::clone(&self.consumed)
    }
}

impl FixSource for ScriptedFixes{
    fn has_data(&mut self, _timeout: Duration) -> bool{
        match self.events.front(){
            Some(Some(_)) => true,
            Some(None) =>{
                self.events.pop_front();
                false
            }
            None => false,
        }
    }

    fn next_fix(&mut self) -> crate::error::Result<FixRecord>{
        match self.events.pop_front(){
            Some(Some(fix)) =>{
                self.consumed.fetch_add(1, Ordering::SeqCst);
                Ok(fix)
            }
            _ => Err(crate::error::Error::Protocol("no scripted fix".to_string())),
        }
    }
}

pub fn tpv(lat: f64, lon: f64) -> FixRecord{
    FixRecord{ class: "TPV".to_string(), mode: Some(3), lat: Some(lat), lon: Some(lon) }
}

pub fn sky() -> FixRecord{
    FixRecord{ class: "SKY".to_string(), mode: None, lat: None, lon: None }
}
