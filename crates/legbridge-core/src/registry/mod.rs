//! Command Registry
//!
//! Maps command names to the frame they produce and to the way the board's
//! answer is rendered. The table is built once at startup and only read
//! afterwards.

mod catalog;
mod conversion;

pub use catalog::{register, standard};
pub use conversion::{map_range, Conversion, ParamError};

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::protocol::{Frame, ProtocolError, ReturnData, DATA_LEN};

/// A named parameter and its conversion to a data byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Key the caller supplies the value under
    pub name: String,
    /// How the value becomes a data byte
    pub conversion: Conversion,
}

impl ParamSpec {
    /// Parameter `name` converted with `conversion`
    pub fn new(name: impl Into<String>, conversion: Conversion) -> Self {
        Self {
            name: name.into(),
            conversion,
        }
    }
}

/// What gets sent for a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Command byte followed by constant data bytes
    Fixed {
        /// Command byte first, then the data bytes
        bytes: Vec<u8>,
    },
    /// Command byte followed by one converted byte per parameter, in order
    Parameterized {
        /// Command byte
        register: u8,
        /// Parameters in wire order
        params: Vec<ParamSpec>,
    },
}

/// How the board's answer is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoder {
    /// Literal "ok"
    #[default]
    Ack,
    /// First two return values as a big-endian u16, in decimal
    ChargeLevel,
    /// First return value as "true"/"false"
    Flag,
}

impl Decoder {
    /// Render the return data of a successful response
    pub fn decode(&self, data: &ReturnData) -> String {
        match self {
            Decoder::Ack => "ok".to_string(),
            Decoder::ChargeLevel => BigEndian::read_u16(&data.values()[..2]).to_string(),
            Decoder::Flag => (data.values()[0] != 0).to_string(),
        }
    }
}

/// A registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    /// Bytes sent for the command
    pub payload: Payload,
    /// Rendering of the answer, `"ok"` unless given
    #[serde(default)]
    pub decoder: Decoder,
}

impl CommandDefinition {
    /// Constant payload: command byte plus up to four data bytes
    pub fn fixed(bytes: &[u8]) -> Self {
        Self {
            payload: Payload::Fixed {
                bytes: bytes.to_vec(),
            },
            decoder: Decoder::Ack,
        }
    }

    /// Payload built from named parameters
    pub fn parameterized(register: u8, params: Vec<ParamSpec>) -> Self {
        Self {
            payload: Payload::Parameterized { register, params },
            decoder: Decoder::Ack,
        }
    }

    /// Replace the default `"ok"` decoder
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Names of the parameters this command requires, in wire order
    pub fn param_names(&self) -> Vec<&str> {
        match &self.payload {
            Payload::Fixed { .. } => Vec::new(),
            Payload::Parameterized { params, .. } => {
                params.iter().map(|p| p.name.as_str()).collect()
            }
        }
    }

    /// Build the request frame for the given caller parameters.
    ///
    /// Every required parameter is checked for presence before any value is
    /// converted. Extra parameters are ignored.
    pub fn resolve(&self, params: &HashMap<String, String>) -> Result<Frame, ProtocolError> {
        match &self.payload {
            Payload::Fixed { bytes } => Ok(Frame::from_payload(bytes)),
            Payload::Parameterized {
                register,
                params: specs,
            } => {
                let values = specs
                    .iter()
                    .map(|spec| {
                        params
                            .get(&spec.name)
                            .ok_or_else(|| ProtocolError::MissingParameter(spec.name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let data = specs
                    .iter()
                    .zip(values)
                    .map(|(spec, value)| {
                        spec.conversion.convert(value).map_err(|source| {
                            ProtocolError::InvalidParameterValue {
                                name: spec.name.clone(),
                                source,
                            }
                        })
                    })
                    .collect::<Result<Vec<u8>, _>>()?;

                Ok(Frame::encode(*register, &data))
            }
        }
    }

    fn check(&self) -> Result<(), String> {
        match &self.payload {
            Payload::Fixed { bytes } if bytes.is_empty() || bytes.len() > DATA_LEN + 1 => Err(
                format!("fixed payload must be 1 to {} bytes", DATA_LEN + 1),
            ),
            Payload::Parameterized { params, .. } if params.len() > DATA_LEN => {
                Err(format!("at most {} parameters fit in a frame", DATA_LEN))
            }
            Payload::Parameterized { params, .. } => params.iter().try_for_each(check_param),
            Payload::Fixed { .. } => Ok(()),
        }
    }
}

fn check_param(spec: &ParamSpec) -> Result<(), String> {
    let Conversion::Range {
        in_start,
        in_end,
        out_start,
        out_end,
    } = spec.conversion
    else {
        return Ok(());
    };
    if in_start >= in_end {
        return Err(format!(
            "param {}: input range {in_start}..={in_end} is empty",
            spec.name
        ));
    }
    let byte = 0..=i64::from(u8::MAX);
    if !byte.contains(&out_start) || !byte.contains(&out_end) {
        return Err(format!(
            "param {}: output range {out_start}..={out_end} does not fit in a byte",
            spec.name
        ));
    }
    Ok(())
}

/// Immutable name → definition table
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDefinition>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for the stock controller board firmware
    pub fn standard() -> Self {
        standard()
    }

    /// Add or replace a command
    pub fn with(mut self, name: impl Into<String>, definition: CommandDefinition) -> Self {
        self.commands.insert(name.into(), definition);
        self
    }

    /// Load commands from a JSON object of name → definition
    pub fn from_json(content: &str) -> Result<Self, ProtocolError> {
        let commands: BTreeMap<String, CommandDefinition> =
            serde_json::from_str(content).map_err(|e| ProtocolError::Config(e.to_string()))?;
        for (name, definition) in &commands {
            definition
                .check()
                .map_err(|e| ProtocolError::Config(format!("command {name}: {e}")))?;
        }
        Ok(Self { commands })
    }

    /// Add every command of `other`, replacing same-named ones
    pub fn merge(mut self, other: CommandRegistry) -> Self {
        self.commands.extend(other.commands);
        self
    }

    /// Look up a command by name
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    /// Iterate commands in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandDefinition)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no command is defined
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
