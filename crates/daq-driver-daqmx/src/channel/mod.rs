//! Logical channel kinds.
//!
//! Each kind has a typed API for direct use and implements [`Channel`] so the
//! [`ChannelHost`](crate::host::ChannelHost) can drive it from command lines:
//!
//! - [`device`] - `nidev`, a board with its shared analog input task
//! - [`analog_input`] - `niai`, one slot of a device's shared task
//! - [`analog_output`] - `niao`, private analog output task
//! - [`digital_output`] - `nido`, private digital line task
//! - [`counter`] - `nicounter`, private edge counting task
//! - [`pwm`] - `nipwm`, private pulse train task
//!
//! Setup arguments are positional. Too few arguments make a command a no-op.
//! Device references are resolved before anything is changed, so a setup
//! that names an unknown device leaves the channel as it was.

pub mod analog_input;
pub mod analog_output;
pub mod counter;
pub mod device;
pub mod digital_output;
pub mod pwm;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use analog_input::AnalogInputChannel;
pub use analog_output::AnalogOutputChannel;
pub use counter::CounterChannel;
pub use device::DeviceChannel;
pub use digital_output::DigitalOutputChannel;
pub use pwm::PwmChannel;

use crate::config::Timeouts;
use crate::driver::DaqmxDriver;
use crate::error::{DaqmxError, Result};
use crate::links::LinkGraph;
use crate::registry::{DeviceRegistry, SharedDevice};

/// Host-assigned channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Wrap a raw id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One command argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Token that parses as an integer
    Int(i64),
    /// Token that parses as a float
    Float(f64),
    /// Anything else
    Text(String),
}

impl Param {
    /// Classify a command token as integer, float or text.
    pub fn parse(token: &str) -> Self {
        if let Ok(i) = token.parse::<i64>() {
            Self::Int(i)
        } else if let Ok(f) = token.parse::<f64>() {
            Self::Float(f)
        } else {
            Self::Text(token.to_string())
        }
    }

    /// Numeric value of argument `index`.
    pub fn as_f64(&self, index: usize) -> Result<f64> {
        match self {
            Self::Int(i) => Ok(*i as f64),
            Self::Float(f) => Ok(*f),
            Self::Text(s) => s.trim().parse().map_err(|_| DaqmxError::InvalidArgument {
                index,
                message: format!("expected a number, got '{}'", s),
            }),
        }
    }

    /// Integer value of argument `index`. Floats are truncated.
    pub fn as_i64(&self, index: usize) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Float(f) => Ok(f.trunc() as i64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64))
                    .map_err(|_| DaqmxError::InvalidArgument {
                        index,
                        message: format!("expected an integer, got '{}'", s),
                    })
            }
        }
    }

    /// Textual value, as typed.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Reply of a channel command.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty reply
    #[default]
    None,
    /// Integer reply
    Int(i64),
    /// Single measurement or setpoint
    Float(f64),
    /// Rendered as each value followed by a space
    Floats(Vec<f64>),
    /// Help text
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Floats(values) => values.iter().try_for_each(|v| write!(f, "{} ", v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Result of a write: the reply, plus the arguments passed on to linked
/// channels, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteOutcome {
    /// Reply to the caller
    pub reply: Value,
    /// Arguments written to linked channels
    pub forward: Option<Vec<Param>>,
}

impl WriteOutcome {
    /// Nothing written, nothing forwarded.
    pub fn none() -> Self {
        Self::default()
    }

    /// Reply without forwarding.
    pub fn reply(reply: Value) -> Self {
        Self {
            reply,
            forward: None,
        }
    }

    /// Reply and forward `forward` to linked channels.
    pub fn forwarded(reply: Value, forward: Vec<Param>) -> Self {
        Self {
            reply,
            forward: Some(forward),
        }
    }
}

/// What a channel can reach while handling a command.
pub struct ChannelContext<'a> {
    /// Id of the channel handling the command
    pub id: ChannelId,
    /// Name of the channel handling the command
    pub name: &'a str,
    /// Driver shared by every channel
    pub driver: &'a Arc<dyn DaqmxDriver>,
    /// Devices by id
    pub devices: &'a DeviceRegistry,
    /// Write links between channels
    pub links: &'a mut LinkGraph,
    /// Channel ids by name
    pub names: &'a HashMap<String, ChannelId>,
    /// Driver call timeouts
    pub timeouts: &'a Timeouts,
}

impl ChannelContext<'_> {
    /// Resolve a device given by channel name or numeric id.
    pub fn resolve_device(&self, reference: &Param) -> Result<SharedDevice> {
        let id = match reference {
            Param::Int(i) => u32::try_from(*i).ok().map(ChannelId::new),
            Param::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(ChannelId::new(*f as u32)),
            Param::Float(_) => None,
            Param::Text(name) => self.names.get(name).copied(),
        };
        id.and_then(|id| self.devices.find_by_id(id))
            .ok_or_else(|| DaqmxError::DeviceNotFound {
                reference: reference.to_string(),
            })
    }
}

/// A logical channel driven by the host.
pub trait Channel: Send {
    /// Class of this channel.
    fn kind(&self) -> ChannelKind;

    /// Configure the channel from positional arguments.
    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value>;

    /// Write to the channel. The outcome may carry values for linked channels.
    fn write(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<WriteOutcome>;

    /// Read the channel's current value.
    fn read(&mut self, ctx: &mut ChannelContext<'_>) -> Result<Value>;
}

/// Channel classes known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// `nidev`: shared acquisition task
    Device,
    /// `niai`: one slot of a device acquisition
    AnalogInput,
    /// `niao`
    AnalogOutput,
    /// `nido`
    DigitalOutput,
    /// `nicounter`: rising edge counter
    Counter,
    /// `nipwm`: continuous pulse train
    Pwm,
}

impl ChannelKind {
    /// Every class, in help order.
    pub const ALL: [ChannelKind; 6] = [
        Self::Device,
        Self::AnalogInput,
        Self::AnalogOutput,
        Self::DigitalOutput,
        Self::Counter,
        Self::Pwm,
    ];

    /// Class name used by `create`.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Device => "nidev",
            Self::AnalogInput => "niai",
            Self::AnalogOutput => "niao",
            Self::DigitalOutput => "nido",
            Self::Counter => "nicounter",
            Self::Pwm => "nipwm",
        }
    }

    /// Look up a class by name.
    pub fn from_class(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.class_name() == name)
    }

    /// Command grammar of the class.
    pub fn help(self) -> &'static str {
        match self {
            Self::Device => {
                "help for niai device. Commands:\r\n\
                 create nidev newname \r\n\
                 setup newname device_name | sample_rate | samples \r\n\
                 write newname do one measurement\r\n"
            }
            Self::AnalogInput => {
                "help for niai - NI analog input\r\n \
                 create niai newname\r\n \
                 setup newname ni_device_channel | terminal\r\n               \
                 | term_cfg(RSE NRSE Diff PseudoDiff) \r\n               \
                 | minVal maxVal\r\n \
                 read newname #read latest analog value \r\n \
                 link newname linked_ch #link output to channel \r\n"
            }
            Self::AnalogOutput => {
                "help for niao.\r\n \
                 create niao newname\r\n \
                 setup newname device_channel terminal | minVal maxVal\r\n \
                 write newname value\r\n"
            }
            Self::DigitalOutput => {
                "help for nido.\r\n\
                 create nido newname\r\n\
                 setup newname device_channel port line\r\n\
                 write newname value\r\n\
                 read newname\r\n\
                 example: setup do1 NI1 port0 line1\r\n"
            }
            Self::Counter => {
                "help for nicounter.\r\n\
                 create nicounter ch_name\r\n\
                 setup ch_name device_channel counter | terminal\r\n\
                 read counter\r\n \
                 write counter\r\n   \
                 #read and reset\r\n  \
                 #sends value before reset to linked channels\r\n"
            }
            Self::Pwm => {
                "help for nipwm\r\n\
                 create nipwm ch_name\r\n\
                 setup ch_name frequency device_channel counter_resource              \
                 | idle_state\r\n   \
                 #Example: setup pwm1 1000 Dev1 ctr0 0\r\n\
                 write ch_name duty_cycle\r\n   \
                 #set duty and send applied duty to linked channels\r\n\
                 read ch_name \r\n"
            }
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Argument `index` as text, or `None` if absent.
pub(crate) fn text_arg(params: &[Param], index: usize) -> Option<String> {
    params.get(index).map(Param::as_text)
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::device::Device;
    use crate::mock::MockDriver;

    /// Host state for driving a single channel without a host.
    pub struct Fixture {
        pub mock: Arc<MockDriver>,
        pub driver: Arc<dyn DaqmxDriver>,
        pub devices: DeviceRegistry,
        pub links: LinkGraph,
        pub names: HashMap<String, ChannelId>,
        pub timeouts: Timeouts,
        next_id: u32,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mock = Arc::new(MockDriver::new());
            let driver: Arc<dyn DaqmxDriver> = mock.clone();
            Self {
                mock,
                driver,
                devices: DeviceRegistry::new(),
                links: LinkGraph::new(),
                names: HashMap::new(),
                timeouts: Timeouts::default(),
                next_id: 1,
            }
        }

        /// Reserve an id for a channel named `name`.
        pub fn channel(&mut self, name: &str) -> ChannelId {
            let id = ChannelId::new(self.next_id);
            self.next_id += 1;
            self.names.insert(name.to_string(), id);
            id
        }

        /// Register a device named `name` on board `resource`.
        pub fn device(&mut self, name: &str, resource: &str, rate: f64, samples: usize) -> SharedDevice {
            let id = self.channel(name);
            let mut device = Device::create(id, Arc::clone(&self.driver));
            device.setup(resource, Some(rate), Some(samples)).unwrap();
            self.devices.register(device)
        }

        pub fn ctx(&mut self, id: ChannelId) -> ChannelContext<'_> {
            ChannelContext {
                id,
                name: "test",
                driver: &self.driver,
                devices: &self.devices,
                links: &mut self.links,
                names: &self.names,
                timeouts: &self.timeouts,
            }
        }
    }
}
