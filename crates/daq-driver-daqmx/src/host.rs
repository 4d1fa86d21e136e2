//! Command host for DAQmx channels.
//!
//! [`ChannelHost`] owns every channel, the device registry and the link
//! graph. It understands one command per line:
//!
//! ```text
//! create <class> <name>
//! setup <name> <args...>
//! write <name> <args...>
//! read <name>
//! help <class|name>
//! link <from> <to>
//! ```
//!
//! Text after `#` is a comment. [`ChannelHost::execute`] never fails: errors
//! are logged and produce an empty reply, so a script keeps running past a
//! bad line. The typed methods return the error instead.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use daq_driver_daqmx::{ChannelHost, DaqmxConfig};
//! use daq_driver_daqmx::mock::MockDriver;
//!
//! let mock = Arc::new(MockDriver::new());
//! mock.set_voltage("Dev1/ai0", 1.25);
//!
//! let mut host = ChannelHost::new(mock, DaqmxConfig::default());
//! host.execute("create nidev NI1");
//! host.execute("setup NI1 Dev1 100 5");
//! host.execute("create niai ch0");
//! host.execute("setup ch0 NI1 ai0");
//! host.execute("write NI1");
//! assert_eq!(host.execute("read ch0"), "1.25");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channel::{
    AnalogInputChannel, AnalogOutputChannel, Channel, ChannelContext, ChannelId, ChannelKind,
    CounterChannel, DeviceChannel, DigitalOutputChannel, Param, PwmChannel, Value,
};
use crate::config::DaqmxConfig;
use crate::device::Device;
use crate::driver::DaqmxDriver;
use crate::error::{DaqmxError, Result};
use crate::links::LinkGraph;
use crate::registry::{DeviceRegistry, SharedDevice};

/// Nesting limit for forwarding writes along links.
pub const MAX_BROADCAST_DEPTH: usize = 16;

struct Entry {
    name: String,
    channel: Box<dyn Channel>,
}

/// Registry and dispatcher of named channels.
pub struct ChannelHost {
    driver: Arc<dyn DaqmxDriver>,
    config: DaqmxConfig,
    devices: DeviceRegistry,
    names: HashMap<String, ChannelId>,
    channels: BTreeMap<ChannelId, Entry>,
    links: LinkGraph,
    next_id: u32,
}

impl ChannelHost {
    /// Create an empty host.
    pub fn new(driver: Arc<dyn DaqmxDriver>, config: DaqmxConfig) -> Self {
        info!(version = env!("CARGO_PKG_VERSION"), "NIDAQ module");
        Self {
            driver,
            config,
            devices: DeviceRegistry::new(),
            names: HashMap::new(),
            channels: BTreeMap::new(),
            links: LinkGraph::new(),
            next_id: 1,
        }
    }

    /// Create a channel of class `class` named `name`.
    pub fn create(&mut self, class: &str, name: &str) -> Result<ChannelId> {
        let kind = ChannelKind::from_class(class).ok_or_else(|| DaqmxError::UnknownClass {
            name: class.to_string(),
        })?;
        if self.names.contains_key(name) {
            return Err(DaqmxError::DuplicateChannel {
                name: name.to_string(),
            });
        }

        let id = ChannelId::new(self.next_id);
        self.next_id += 1;

        let channel: Box<dyn Channel> = match kind {
            ChannelKind::Device => {
                let device = Device::create(id, Arc::clone(&self.driver));
                Box::new(DeviceChannel::new(self.devices.register(device)))
            }
            ChannelKind::AnalogInput => Box::new(AnalogInputChannel::new()),
            ChannelKind::AnalogOutput => Box::new(AnalogOutputChannel::new()),
            ChannelKind::DigitalOutput => Box::new(DigitalOutputChannel::new()),
            ChannelKind::Counter => Box::new(CounterChannel::new()),
            ChannelKind::Pwm => Box::new(PwmChannel::new()),
        };

        self.names.insert(name.to_string(), id);
        self.channels.insert(
            id,
            Entry {
                name: name.to_string(),
                channel,
            },
        );
        debug!(channel = name, id = %id, class, "Channel created");
        Ok(id)
    }

    /// Configure channel `name`.
    pub fn setup(&mut self, name: &str, params: &[Param]) -> Result<Value> {
        let id = self.lookup(name)?;
        self.dispatch(id, |channel, ctx| channel.setup(ctx, params))
    }

    /// Write to channel `name` and forward the outcome along its links.
    pub fn write(&mut self, name: &str, params: &[Param]) -> Result<Value> {
        let id = self.lookup(name)?;
        let outcome = self.dispatch(id, |channel, ctx| channel.write(ctx, params))?;
        if let Some(forward) = outcome.forward {
            self.broadcast(id, &forward, 1);
        }
        Ok(outcome.reply)
    }

    /// Read channel `name`.
    pub fn read(&mut self, name: &str) -> Result<Value> {
        let id = self.lookup(name)?;
        self.dispatch(id, |channel, ctx| channel.read(ctx))
    }

    /// Help text of a class, or of the class of channel `target`.
    pub fn help(&self, target: &str) -> Result<&'static str> {
        if let Some(kind) = ChannelKind::from_class(target) {
            return Ok(kind.help());
        }
        let id = self.lookup(target)?;
        self.channels
            .get(&id)
            .map(|entry| entry.channel.kind().help())
            .ok_or_else(|| DaqmxError::UnknownChannel {
                name: target.to_string(),
            })
    }

    /// Forward writes of `from` to `to`. Returns false if already linked.
    pub fn link(&mut self, from: &str, to: &str) -> Result<bool> {
        let from = self.lookup(from)?;
        let to = self.lookup(to)?;
        Ok(self.links.link(from, to))
    }

    /// Run one command line and render its reply.
    pub fn execute(&mut self, line: &str) -> String {
        match self.try_execute(line) {
            Ok(value) => value.to_string(),
            Err(e) => {
                error!(command = line.trim(), error = %e, "Command failed");
                String::new()
            }
        }
    }

    /// Run one command line.
    pub fn try_execute(&mut self, line: &str) -> Result<Value> {
        let line = line.split('#').next().unwrap_or_default();
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            return Ok(Value::None);
        };
        let args: Vec<&str> = tokens.collect();

        let missing = |what: &str| DaqmxError::InvalidCommand {
            message: format!("'{}' needs {}", command, what),
        };
        let params = |rest: &[&str]| rest.iter().map(|t| Param::parse(t)).collect::<Vec<_>>();

        match command {
            "create" => match args.as_slice() {
                [class, name, ..] => self.create(class, name).map(|_| Value::None),
                _ => Err(missing("a class and a name")),
            },
            "setup" => match args.split_first() {
                Some((name, rest)) => self.setup(name, &params(rest)),
                None => Err(missing("a channel name")),
            },
            "write" => match args.split_first() {
                Some((name, rest)) => self.write(name, &params(rest)),
                None => Err(missing("a channel name")),
            },
            "read" => match args.first() {
                Some(name) => self.read(name),
                None => Err(missing("a channel name")),
            },
            "help" => match args.first() {
                Some(target) => self.help(target).map(|text| Value::Text(text.to_string())),
                None => Err(missing("a class or channel name")),
            },
            "link" => match args.as_slice() {
                [from, to, ..] => self.link(from, to).map(|_| Value::None),
                _ => Err(missing("two channel names")),
            },
            other => Err(DaqmxError::InvalidCommand {
                message: format!("unknown command '{}'", other),
            }),
        }
    }

    /// Id of channel `name`.
    pub fn id_of(&self, name: &str) -> Option<ChannelId> {
        self.names.get(name).copied()
    }

    /// Class of channel `name`.
    pub fn kind_of(&self, name: &str) -> Option<ChannelKind> {
        let id = self.id_of(name)?;
        self.channels.get(&id).map(|entry| entry.channel.kind())
    }

    /// Shared device behind the `nidev` channel `name`.
    pub fn device(&self, name: &str) -> Option<SharedDevice> {
        self.id_of(name).and_then(|id| self.devices.find_by_id(id))
    }

    /// Channels receiving writes of `name`, by name.
    pub fn linked(&self, name: &str) -> Vec<String> {
        let Some(id) = self.id_of(name) else {
            return Vec::new();
        };
        self.links
            .linked(id)
            .iter()
            .filter_map(|target| self.channels.get(target).map(|e| e.name.clone()))
            .collect()
    }

    /// Active configuration.
    pub fn config(&self) -> &DaqmxConfig {
        &self.config
    }

    fn lookup(&self, name: &str) -> Result<ChannelId> {
        self.id_of(name).ok_or_else(|| DaqmxError::UnknownChannel {
            name: name.to_string(),
        })
    }

    fn dispatch<T>(
        &mut self,
        id: ChannelId,
        f: impl FnOnce(&mut dyn Channel, &mut ChannelContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let Self {
            driver,
            config,
            devices,
            names,
            channels,
            links,
            ..
        } = self;
        let Entry { name, channel } =
            channels
                .get_mut(&id)
                .ok_or_else(|| DaqmxError::UnknownChannel {
                    name: id.to_string(),
                })?;

        let mut ctx = ChannelContext {
            id,
            name,
            driver,
            devices,
            links,
            names,
            timeouts: &config.timeouts,
        };
        f(channel.as_mut(), &mut ctx)
    }

    fn broadcast(&mut self, from: ChannelId, params: &[Param], depth: usize) {
        if depth > MAX_BROADCAST_DEPTH {
            warn!(source = %from, depth, "Link chain too deep, dropping forwarded write");
            return;
        }

        let targets = self.links.linked(from).to_vec();
        for target in targets {
            match self.dispatch(target, |channel, ctx| channel.write(ctx, params)) {
                Ok(outcome) => {
                    if let Some(forward) = outcome.forward {
                        self.broadcast(target, &forward, depth + 1);
                    }
                }
                Err(e) => warn!(source = %from, target = %target, error = %e, "Forwarded write failed"),
            }
        }
    }
}
