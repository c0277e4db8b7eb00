//! Per-channel capture processing.
//!
//! Backends turn a hardware capture into a [`Capture`]; the channel's
//! [`Runtime`] then runs the routine selected by the measurement mode.

use super::config::{ChannelConfig, MeasurementMode, SignalProperty, TimestampBuffer};
use super::{DutyCycleValues, Event, InputState, Notify};
use crate::state::ChannelState;

/// Level of the input right after the captured edge
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Level {
    Low,
    High,
}

/// One captured edge as reported by a backend
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) struct Capture {
    /// Counter value at the edge
    pub value: u32,
    /// Input level after the edge, if the backend can tell
    pub level: Option<Level>,
    /// Last value of the counter before it wraps to 0
    pub modulo: u32,
}

/// What the backend has to do after a capture was processed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Reaction {
    /// Keep capturing
    Continue,
    /// Stop capturing; the channel went idle
    Stop,
}

/// Ticks from `from` to `to` on a counter that wraps after `modulo`.
pub(super) fn elapsed(from: u32, to: u32, modulo: u32) -> u32 {
    if to >= from {
        to - from
    } else {
        (modulo - from).wrapping_add(to).wrapping_add(1)
    }
}

pub(super) struct Timestamps<'a> {
    pub buffer: &'a mut [u32],
    pub index: usize,
    pub wrapped: bool,
    pub notify_interval: u16,
    pub since_notification: u16,
}

#[derive(Default)]
pub(super) struct Signal {
    /// Capture of the edge that starts the measured interval
    pub start: Option<u32>,
    /// Falling edge inside a duty cycle period
    pub falling: Option<u32>,
    /// Last completed high time, low time or period
    pub elapsed: Option<u32>,
    /// Last completed duty cycle
    pub duty_cycle: Option<DutyCycleValues>,
}

impl Signal {
    /// Forgets the edges of an unfinished measurement; completed results
    /// stay readable.
    pub fn discard_pending(&mut self) {
        self.start = None;
        self.falling = None;
    }
}

/// Run time state of one ICU channel
pub(super) struct Runtime<'a> {
    pub state: ChannelState,
    pub edge: super::ActivationEdge,
    pub notification: bool,
    pub wakeup: bool,
    pub wakeup_event: bool,
    pub input_state: InputState,
    pub edge_count: u32,
    pub timestamps: Option<Timestamps<'a>>,
    pub signal: Signal,
}

impl<'a> Runtime<'a> {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            state: ChannelState::Idle,
            edge: config.edge,
            notification: false,
            wakeup: false,
            wakeup_event: false,
            input_state: InputState::Idle,
            edge_count: 0,
            timestamps: None,
            signal: Signal::default(),
        }
    }

    /// Dispatches `capture` to the routine of the channel's measurement mode.
    pub fn process<N: Notify>(
        &mut self,
        channel: usize,
        config: &ChannelConfig,
        capture: Capture,
        notify: &mut N,
    ) -> Reaction {
        match config.mode {
            MeasurementMode::EdgeDetect => self.edge_detected(channel, notify),
            MeasurementMode::Timestamp => {
                self.timestamp(channel, config.timestamp_buffer, capture.value, notify)
            }
            MeasurementMode::SignalMeasurement => {
                self.signal_edge(channel, config.signal_property, capture, notify)
            }
            MeasurementMode::EdgeCounter => {
                self.edge_count = self.edge_count.wrapping_add(1);
                Reaction::Continue
            }
        }
    }

    fn edge_detected<N: Notify>(&mut self, channel: usize, notify: &mut N) -> Reaction {
        self.input_state = InputState::Active;
        if self.notification {
            notify.notify(channel, Event::SignalEdge);
        }
        Reaction::Continue
    }

    fn timestamp<N: Notify>(
        &mut self,
        channel: usize,
        kind: TimestampBuffer,
        value: u32,
        notify: &mut N,
    ) -> Reaction {
        let Some(ts) = self.timestamps.as_mut() else {
            return Reaction::Continue;
        };
        // `index` is below the length while capturing is running
        if let Some(slot) = ts.buffer.get_mut(ts.index) {
            *slot = value;
        }
        ts.index += 1;

        let mut full = false;
        if ts.index >= ts.buffer.len() {
            match kind {
                TimestampBuffer::Linear => full = true,
                TimestampBuffer::Circular => {
                    ts.index = 0;
                    ts.wrapped = true;
                }
            }
        }

        let mut interval_reached = false;
        if ts.notify_interval != 0 {
            ts.since_notification += 1;
            if ts.since_notification >= ts.notify_interval {
                ts.since_notification = 0;
                interval_reached = true;
            }
        }

        if interval_reached && self.notification {
            notify.notify(channel, Event::TimestampNotification);
        }
        if full {
            self.state = ChannelState::Idle;
            if self.notification {
                notify.notify(channel, Event::TimestampBufferFull);
            }
            Reaction::Stop
        } else {
            Reaction::Continue
        }
    }

    fn signal_edge<N: Notify>(
        &mut self,
        channel: usize,
        property: SignalProperty,
        capture: Capture,
        notify: &mut N,
    ) -> Reaction {
        let now = capture.value;
        let span = |from| elapsed(from, now, capture.modulo);
        let rising = capture.level.map(|level| level == Level::High);
        let signal = &mut self.signal;

        let completed = match (property, rising) {
            (SignalProperty::Period, _) => match signal.start.replace(now) {
                Some(start) => {
                    signal.elapsed = Some(span(start));
                    true
                }
                None => false,
            },
            (SignalProperty::HighTime, Some(true)) | (SignalProperty::LowTime, Some(false)) => {
                signal.start = Some(now);
                false
            }
            (SignalProperty::HighTime, Some(false)) | (SignalProperty::LowTime, Some(true)) => {
                match signal.start.take() {
                    Some(start) => {
                        signal.elapsed = Some(span(start));
                        true
                    }
                    None => false,
                }
            }
            (SignalProperty::DutyCycle, Some(true)) => {
                let completed = match (signal.start, signal.falling) {
                    (Some(start), Some(falling)) => {
                        signal.duty_cycle = Some(DutyCycleValues {
                            active_time: elapsed(start, falling, capture.modulo),
                            period_time: span(start),
                        });
                        true
                    }
                    _ => false,
                };
                signal.start = Some(now);
                signal.falling = None;
                completed
            }
            (SignalProperty::DutyCycle, Some(false)) => {
                if signal.start.is_some() {
                    signal.falling = Some(now);
                }
                false
            }
            // Level dependent properties are rejected for backends without level
            (_, None) => false,
        };

        if completed {
            self.input_state = InputState::Active;
            if self.notification {
                notify.notify(channel, Event::SignalMeasured);
            }
        }
        Reaction::Continue
    }
}

#[cfg(test)]
mod test {
    use super::super::config::{Backend, FtmModule};
    use super::super::test::Recorder;
    use super::*;
    use std::vec::Vec;

    fn config(mode: MeasurementMode) -> ChannelConfig {
        ChannelConfig::new(
            Backend::Ftm {
                module: FtmModule::Ftm0,
                channel: 0,
            },
            mode,
        )
    }

    fn edge(value: u32, level: Level) -> Capture {
        Capture {
            value,
            level: Some(level),
            modulo: 0xFFFF,
        }
    }

    #[test]
    fn elapsed_handles_counter_wrap() {
        assert_eq!(elapsed(100, 250, 0xFFFF), 150);
        assert_eq!(elapsed(0xFFF0, 0x10, 0xFFFF), 0x20);
        assert_eq!(elapsed(5, 5, 0xFFFF), 0);
        assert_eq!(elapsed(u32::MAX - 1, 1, u32::MAX), 3);
    }

    #[test]
    fn edge_detect_notifies_only_when_enabled() {
        let config = config(MeasurementMode::EdgeDetect);
        let mut runtime = Runtime::new(&config);
        let mut notify = Recorder::default();

        runtime.process(3, &config, edge(1, Level::High), &mut notify);
        assert_eq!(runtime.input_state, InputState::Active);

        runtime.notification = true;
        runtime.process(3, &config, edge(2, Level::Low), &mut notify);
        assert_eq!(notify.0, [(3, Event::SignalEdge)]);
    }

    #[test]
    fn linear_timestamp_buffer_stops_when_full() {
        let config = config(MeasurementMode::Timestamp);
        let mut runtime = Runtime::new(&config);
        let mut buffer = [0u32; 3];
        runtime.state = ChannelState::Busy;
        runtime.notification = true;
        runtime.timestamps = Some(Timestamps {
            buffer: &mut buffer,
            index: 0,
            wrapped: false,
            notify_interval: 2,
            since_notification: 0,
        });
        let mut notify = Recorder::default();

        let reactions: Vec<_> = [10, 20, 30]
            .into_iter()
            .map(|v| runtime.process(0, &config, edge(v, Level::High), &mut notify))
            .collect();

        assert_eq!(reactions, [Reaction::Continue, Reaction::Continue, Reaction::Stop]);
        assert_eq!(runtime.state, ChannelState::Idle);
        assert_eq!(runtime.timestamps.as_ref().unwrap().index, 3);
        assert_eq!(
            notify.events(),
            [Event::TimestampNotification, Event::TimestampBufferFull]
        );
        drop(runtime);
        assert_eq!(buffer, [10, 20, 30]);
    }

    #[test]
    fn circular_timestamp_buffer_wraps() {
        let config = ChannelConfig {
            timestamp_buffer: TimestampBuffer::Circular,
            ..config(MeasurementMode::Timestamp)
        };
        let mut runtime = Runtime::new(&config);
        let mut buffer = [0u32; 2];
        runtime.state = ChannelState::Busy;
        runtime.timestamps = Some(Timestamps {
            buffer: &mut buffer,
            index: 0,
            wrapped: false,
            notify_interval: 0,
            since_notification: 0,
        });

        for value in [1, 2, 3] {
            let reaction = runtime.process(0, &config, edge(value, Level::High), &mut Recorder::default());
            assert_eq!(reaction, Reaction::Continue);
        }
        let ts = runtime.timestamps.as_ref().unwrap();
        assert_eq!(ts.index, 1);
        assert!(ts.wrapped);
        assert_eq!(runtime.state, ChannelState::Busy);
        drop(runtime);
        assert_eq!(buffer, [3, 2]);
    }

    #[test]
    fn high_time_measures_rising_to_falling() {
        let config = ChannelConfig {
            signal_property: SignalProperty::HighTime,
            ..config(MeasurementMode::SignalMeasurement)
        };
        let mut runtime = Runtime::new(&config);
        let mut notify = Recorder::default();
        // A falling edge without a preceding rising edge is ignored
        runtime.process(0, &config, edge(50, Level::Low), &mut notify);
        assert_eq!(runtime.signal.elapsed, None);

        runtime.process(0, &config, edge(100, Level::High), &mut notify);
        runtime.process(0, &config, edge(400, Level::Low), &mut notify);
        assert_eq!(runtime.signal.elapsed, Some(300));
        assert_eq!(runtime.input_state, InputState::Active);
    }

    #[test]
    fn low_time_measures_falling_to_rising_across_wrap() {
        let config = ChannelConfig {
            signal_property: SignalProperty::LowTime,
            ..config(MeasurementMode::SignalMeasurement)
        };
        let mut runtime = Runtime::new(&config);
        let mut notify = Recorder::default();
        runtime.process(0, &config, edge(0xFF00, Level::Low), &mut notify);
        runtime.process(0, &config, edge(0x0100, Level::High), &mut notify);
        assert_eq!(runtime.signal.elapsed, Some(0x200));
    }

    #[test]
    fn period_is_measured_between_consecutive_edges() {
        let config = config(MeasurementMode::SignalMeasurement);
        let mut runtime = Runtime::new(&config);
        let mut notify = Recorder::default();
        let capture = |value| Capture {
            value,
            level: None,
            modulo: u32::MAX,
        };
        runtime.process(0, &config, capture(1000), &mut notify);
        assert_eq!(runtime.signal.elapsed, None);
        runtime.process(0, &config, capture(3500), &mut notify);
        assert_eq!(runtime.signal.elapsed, Some(2500));
        runtime.process(0, &config, capture(4000), &mut notify);
        assert_eq!(runtime.signal.elapsed, Some(500));
    }

    #[test]
    fn duty_cycle_completes_on_second_rising_edge() {
        let config = ChannelConfig {
            signal_property: SignalProperty::DutyCycle,
            ..config(MeasurementMode::SignalMeasurement)
        };
        let mut runtime = Runtime::new(&config);
        runtime.notification = true;
        let mut notify = Recorder::default();

        runtime.process(0, &config, edge(100, Level::High), &mut notify);
        runtime.process(0, &config, edge(130, Level::Low), &mut notify);
        assert_eq!(runtime.signal.duty_cycle, None);
        runtime.process(0, &config, edge(200, Level::High), &mut notify);
        assert_eq!(
            runtime.signal.duty_cycle,
            Some(DutyCycleValues {
                active_time: 30,
                period_time: 100,
            })
        );
        assert_eq!(notify.events(), [Event::SignalMeasured]);
    }

    #[test]
    fn edge_counter_wraps() {
        let config = config(MeasurementMode::EdgeCounter);
        let mut runtime = Runtime::new(&config);
        runtime.edge_count = u32::MAX;
        runtime.process(0, &config, edge(0, Level::High), &mut Recorder::default());
        assert_eq!(runtime.edge_count, 0);
    }
}
