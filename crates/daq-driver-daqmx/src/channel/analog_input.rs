//! `niai`: one analog input slot of a device's shared task.
//!
//! Setup grammar: `<device> <terminal> | <term_cfg> | <min> <max>`. The
//! range only applies when both bounds follow a terminal configuration.
//! The channel does not sample on its own; it receives the value vector of
//! every acquisition its device runs and keeps the entry at its slot.

use tracing::{debug, warn};

use super::{text_arg, Channel, ChannelContext, ChannelId, ChannelKind, Param, Value, WriteOutcome};
use crate::device::Attachment;
use crate::driver::{TerminalConfig, VoltageRange};
use crate::error::Result;

/// Analog input bound to a device slot.
#[derive(Debug, Default)]
pub struct AnalogInputChannel {
    device: Option<ChannelId>,
    channel_index: usize,
    value: f64,
}

impl AnalogInputChannel {
    /// Unattached input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the device named by `device`.
    ///
    /// Links the device to this channel so acquisitions reach it. When moving
    /// from another device the old link and notification entry are removed.
    pub fn attach(
        &mut self,
        ctx: &mut ChannelContext<'_>,
        device: &Param,
        terminal: &str,
        config: TerminalConfig,
        range: VoltageRange,
    ) -> Result<Attachment> {
        let shared = ctx.resolve_device(device)?;
        let (device_id, attachment) = {
            let mut device = shared.lock();
            let attachment = device.attach_analog_input(ctx.id, terminal, config, range)?;
            (device.id(), attachment)
        };

        if let Some(previous) = self.device.filter(|p| *p != device_id) {
            ctx.links.unlink(previous, ctx.id);
            if let Some(old) = ctx.devices.find_by_id(previous) {
                old.lock().detach(ctx.id);
            }
        }
        ctx.links.link(device_id, ctx.id);
        self.device = Some(device_id);

        if let Some(e) = &attachment.error {
            warn!(channel = ctx.name, error = %e, "Analog input slot claimed but not configured");
        }
        self.channel_index = attachment.channel_index;
        debug!(channel = ctx.name, channel_index = self.channel_index, "Analog input ready");
        Ok(attachment)
    }

    /// Slot in the device's value vector.
    pub fn channel_index(&self) -> usize {
        self.channel_index
    }

    /// Device this channel is attached to.
    pub fn device(&self) -> Option<ChannelId> {
        self.device
    }

    /// Last received value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Channel for AnalogInputChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::AnalogInput
    }

    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let (Some(device), Some(terminal)) = (params.first(), text_arg(params, 1)) else {
            return Ok(Value::None);
        };
        let config = text_arg(params, 2)
            .and_then(|name| TerminalConfig::from_name(&name))
            .unwrap_or_default();
        let range = match (params.get(3), params.get(4)) {
            (Some(min), Some(max)) => VoltageRange::new(min.as_f64(3)?, max.as_f64(4)?),
            _ => VoltageRange::default(),
        };

        let attachment = self.attach(ctx, device, &terminal, config, range)?;
        Ok(Value::Int(attachment.channel_index as i64))
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<WriteOutcome> {
        let Some(param) = params.get(self.channel_index) else {
            return Ok(WriteOutcome::none());
        };
        let value = param.as_f64(self.channel_index)?;
        self.value = value;
        debug!(channel = ctx.name, value, "Analog input updated");
        Ok(WriteOutcome::forwarded(
            Value::Float(value),
            vec![Param::Float(value)],
        ))
    }

    fn read(&mut self, _ctx: &mut ChannelContext<'_>) -> Result<Value> {
        Ok(Value::Float(self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::fixture::Fixture;
    use crate::error::DaqmxError;
    use crate::mock::MockChannel;

    fn params(tokens: &[&str]) -> Vec<Param> {
        tokens.iter().map(|t| Param::parse(t)).collect()
    }

    #[test]
    fn test_setup_assigns_sequential_slots() {
        let mut fx = Fixture::new();
        let device = fx.device("NI1", "Dev1", 100.0, 5);
        let a = fx.channel("ch0");
        let b = fx.channel("ch1");

        let mut ch0 = AnalogInputChannel::new();
        let mut ch1 = AnalogInputChannel::new();
        assert_eq!(
            ch0.setup(&mut fx.ctx(a), &params(&["NI1", "ai0"])).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            ch1.setup(&mut fx.ctx(b), &params(&["NI1", "ai1"])).unwrap(),
            Value::Int(1)
        );

        let device = device.lock();
        assert_eq!(device.channel_count(), 2);
        assert_eq!(device.attached(), &[a, b]);
        assert_eq!(fx.links.linked(device.id()), &[a, b]);
    }

    #[test]
    fn test_range_needs_term_cfg_position() {
        let mut fx = Fixture::new();
        let device = fx.device("NI1", "Dev1", 10.0, 1);
        let id = fx.channel("ch0");

        let mut ch = AnalogInputChannel::new();
        ch.setup(&mut fx.ctx(id), &params(&["NI1", "ai0", "Diff", "-1", "1"]))
            .unwrap();

        let handle = device.lock().task_handle().unwrap();
        let task = fx.mock.task(handle).unwrap();
        assert_eq!(
            task.channels[0],
            MockChannel::AnalogInput {
                physical: "Dev1/ai0".to_string(),
                terminal: TerminalConfig::Diff,
                range: VoltageRange::new(-1.0, 1.0),
            }
        );
    }

    #[test]
    fn test_unknown_device_leaves_channel_untouched() {
        let mut fx = Fixture::new();
        fx.device("NI1", "Dev1", 10.0, 1);
        let id = fx.channel("ch0");

        let mut ch = AnalogInputChannel::new();
        let err = ch
            .setup(&mut fx.ctx(id), &params(&["NI9", "ai0"]))
            .unwrap_err();
        assert!(matches!(err, DaqmxError::DeviceNotFound { .. }));
        assert_eq!(ch.device(), None);
        assert_eq!(ch.channel_index(), 0);
    }

    #[test]
    fn test_too_few_arguments_is_noop() {
        let mut fx = Fixture::new();
        fx.device("NI1", "Dev1", 10.0, 1);
        let id = fx.channel("ch0");

        let mut ch = AnalogInputChannel::new();
        assert_eq!(ch.setup(&mut fx.ctx(id), &params(&["NI1"])).unwrap(), Value::None);
        assert_eq!(ch.device(), None);
    }

    #[test]
    fn test_write_picks_own_slot() {
        let mut fx = Fixture::new();
        fx.device("NI1", "Dev1", 10.0, 1);
        let a = fx.channel("ch0");
        let b = fx.channel("ch1");
        let mut ch0 = AnalogInputChannel::new();
        let mut ch1 = AnalogInputChannel::new();
        ch0.setup(&mut fx.ctx(a), &params(&["NI1", "ai0"])).unwrap();
        ch1.setup(&mut fx.ctx(b), &params(&["NI1", "ai1"])).unwrap();

        let outcome = ch1
            .write(&mut fx.ctx(b), &[Param::Float(0.5), Param::Float(2.5)])
            .unwrap();
        assert_eq!(outcome.forward, Some(vec![Param::Float(2.5)]));
        assert_eq!(ch1.value(), 2.5);

        // A vector that does not reach the slot is ignored
        let outcome = ch1.write(&mut fx.ctx(b), &[Param::Float(9.0)]).unwrap();
        assert_eq!(outcome, WriteOutcome::none());
        assert_eq!(ch1.value(), 2.5);
    }

    #[test]
    fn test_moving_to_another_device_unlinks_old_one() {
        let mut fx = Fixture::new();
        let first = fx.device("NI1", "Dev1", 10.0, 1);
        let second = fx.device("NI2", "Dev2", 10.0, 1);
        let id = fx.channel("ch0");

        let mut ch = AnalogInputChannel::new();
        ch.setup(&mut fx.ctx(id), &params(&["NI1", "ai0"])).unwrap();
        ch.setup(&mut fx.ctx(id), &params(&["NI2", "ai3"])).unwrap();

        let first_id = first.lock().id();
        let second_id = second.lock().id();
        assert!(fx.links.linked(first_id).is_empty());
        assert!(first.lock().attached().is_empty());
        assert_eq!(fx.links.linked(second_id), &[id]);
        assert_eq!(ch.device(), Some(second_id));
        assert_eq!(ch.channel_index(), 0);
    }
}
