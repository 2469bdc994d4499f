use std::fmt;
use serde::Deserialize;
use crate::error::{Error, Result};

//the arduino input buffer holds 9 bytes, newline included
pub const MAX_COMMAND_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode{
    Compass,
    Pitch,
    Roll,
    Wind,
    Rudder,
    Sail,
}

impl Opcode{
    pub fn token(&self) -> char{
        match self{
            Opcode::Compass => 'c',
            Opcode::Pitch => 'p',
            Opcode::Roll => '&',
            Opcode::Wind => 'w',
            Opcode::Rudder => 'r',
            Opcode::Sail => 's',
        }
    }

    pub fn from_token(token: char) -> Option<Self>{
        match token{
            'c' => Some(Opcode::Compass),
            'p' => Some(Opcode::Pitch),
            '&' => Some(Opcode::Roll),
            'w' => Some(Opcode::Wind),
            'r' => Some(Opcode::Rudder),
            's' => Some(Opcode::Sail),
            _ => None,
        }
    }

    //response field that carries the answer to this opcode
    pub fn field(&self) -> Field{
        match self{
            Opcode::Compass => Field::Compass,
            Opcode::Pitch => Field::Pitch,
            Opcode::Roll => Field::Roll,
            Opcode::Wind => Field::Wind,
            Opcode::Rudder => Field::Rudder,
            Opcode::Sail => Field::Sail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field{
    Compass,
    Pitch,
    Roll,
    Rudder,
    Sail,
    Wind,
}

impl Field{
    pub fn name(&self) -> &'static str{
        match self{
            Field::Compass => "compass",
            Field::Pitch => "pitch",
            Field::Roll => "roll",
            Field::Rudder => "rudder",
            Field::Sail => "sail",
            Field::Wind => "wind",
        }
    }
}

/// Outbound request: opcode plus an optional integer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command{
    pub opcode: Opcode,
    pub arg: Option<i32>,
}

impl Command{
    pub fn query(opcode: Opcode) -> Self{
        Command{ opcode, arg: None }
    }

    pub fn with_arg(opcode: Opcode, arg: i32) -> Self{
        Command{ opcode, arg: Some(arg) }
    }

    /// Wire text without the terminator, checked against the input buffer limit.
    pub fn encode(&self) -> Result<String>{
        let text = self.to_string();
        let len = text.len() + 1;
        if len > MAX_COMMAND_LEN{
            return Err(Error::CommandTooLong{ command: text, len });
        }
        Ok(text)
    }
}

impl fmt::Display for Command{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        match self.arg{
            Some(arg) => write!(f, "{}{}", self.opcode.token(), arg),
            None => write!(f, "{}", self.opcode.token()),
        }
    }
}

/// One decoded response line. The firmware only fills the field matching the
/// command it answered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response{
    pub compass: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub rudder: Option<f64>,
    pub sail: Option<f64>,
    pub wind: Option<f64>,
}

impl Response{
    pub fn decode(line: &str) -> Result<Self>{
        serde_json::from_str(line.trim())
            .map_err(|e| Error::Protocol(format!("cannot decode {:?}: {}", line, e)))
    }

    pub fn get(&self, field: Field) -> Option<f64>{
        match field{
            Field::Compass => self.compass,
            Field::Pitch => self.pitch,
            Field::Roll => self.roll,
            Field::Rudder => self.rudder,
            Field::Sail => self.sail,
            Field::Wind => self.wind,
        }
    }

    pub fn require(&self, field: Field) -> Result<f64>{
        self.get(field).ok_or_else(|| Error::Protocol(format!(
            "response is missing field {:?}", field.name()
        )))
    }
}
