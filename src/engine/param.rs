//! Parameter automation
//!
//! Sample-accurate automation tracks for voice gains and oscillator
//! frequencies. Times are absolute engine seconds.

/// How a gain ramp approaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Linear,
    /// Constant ratio per unit time; both endpoints must be positive
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    /// Jump to `value` at `time`
    Set,
    /// Ramp from the previous event, reaching `value` at `time`
    Ramp(Ramp),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParamEvent {
    time: f64,
    value: f64,
    kind: EventKind,
}

/// Gain automation track with set and ramp events
#[derive(Debug, Clone)]
pub struct GainParam {
    default: f64,
    events: Vec<ParamEvent>,
}

impl GainParam {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent {
            time,
            value,
            kind: EventKind::Set,
        });
    }

    /// Ramp from the preceding event so that `value` is reached at `end_time`
    pub fn ramp_to_value_at(&mut self, value: f64, end_time: f64, ramp: Ramp) {
        self.insert(ParamEvent {
            time: end_time,
            value,
            kind: EventKind::Ramp(ramp),
        });
    }

    /// Drop every event at or after `time`
    pub fn cancel_from(&mut self, time: f64) {
        let keep = self.events.partition_point(|e| e.time < time);
        self.events.truncate(keep);
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Value at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        let next = self.events.partition_point(|e| e.time <= time);
        self.evaluate(next, time)
    }

    /// Cursor for evaluating increasing times in a render loop
    pub fn cursor(&self) -> GainCursor<'_> {
        self.cursor_from(f64::NEG_INFINITY)
    }

    /// Cursor positioned for evaluation at or after `time`
    pub fn cursor_from(&self, time: f64) -> GainCursor<'_> {
        GainCursor {
            param: self,
            next: self.events.partition_point(|e| e.time < time),
        }
    }

    fn insert(&mut self, event: ParamEvent) {
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
    }

    /// Evaluate with `next` = number of events whose time is `<= time`
    fn evaluate(&self, next: usize, time: f64) -> f64 {
        let (t0, v0) = match next.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => (f64::NEG_INFINITY, self.default),
        };

        match self.events.get(next) {
            Some(ParamEvent {
                time: t1,
                value: v1,
                kind: EventKind::Ramp(ramp),
            }) if t0.is_finite() && *t1 > t0 => {
                let progress = (time - t0) / (t1 - t0);
                interpolate(*ramp, v0, *v1, progress)
            }
            _ => v0,
        }
    }
}

fn interpolate(ramp: Ramp, v0: f64, v1: f64, progress: f64) -> f64 {
    match ramp {
        Ramp::Linear => v0 + (v1 - v0) * progress,
        Ramp::Exponential => {
            if v0 > 0.0 && v1 > 0.0 {
                v0 * (v1 / v0).powf(progress)
            } else {
                // Undefined for non-positive endpoints; hold the start value
                v0
            }
        }
    }
}

/// Forward-only evaluator over a [`GainParam`]
pub struct GainCursor<'a> {
    param: &'a GainParam,
    next: usize,
}

impl GainCursor<'_> {
    /// Value at `time`; `time` must not decrease between calls
    pub fn value_at(&mut self, time: f64) -> f64 {
        let events = &self.param.events;
        while self.next < events.len() && events[self.next].time <= time {
            self.next += 1;
        }
        self.param.evaluate(self.next, time)
    }
}

/// Piecewise-constant frequency track with closed-form phase
///
/// Oscillator phase is the integral of frequency since the first event, so
/// it depends only on the event list and the evaluation time. Two renders of
/// the same track agree sample for sample no matter where they start.
#[derive(Debug, Clone)]
pub struct FrequencyTrack {
    default: f64,
    /// `(time, hz)`, sorted by time
    events: Vec<(f64, f64)>,
    /// Cycles accumulated from the first event to each event
    cycles_at: Vec<f64>,
}

impl FrequencyTrack {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            events: Vec::new(),
            cycles_at: Vec::new(),
        }
    }

    /// Switch to `hz` at `time`
    ///
    /// Appending the frequency already in effect is a no-op.
    pub fn set_value_at(&mut self, hz: f64, time: f64) {
        let at = self.events.partition_point(|&(t, _)| t <= time);
        if at == self.events.len() && at > 0 && self.events[at - 1].1 == hz {
            return;
        }
        self.events.insert(at, (time, hz));
        self.rebuild_from(at);
    }

    /// Drop every event at or after `time`
    pub fn cancel_from(&mut self, time: f64) {
        let keep = self.events.partition_point(|&(t, _)| t < time);
        self.events.truncate(keep);
        self.cycles_at.truncate(keep);
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Frequency in effect at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        let next = self.events.partition_point(|&(t, _)| t <= time);
        match next.checked_sub(1) {
            Some(i) => self.events[i].1,
            None => self.default,
        }
    }

    /// Cycles elapsed since the first event at `time`
    pub fn cycles_at(&self, time: f64) -> f64 {
        let next = self.events.partition_point(|&(t, _)| t <= time);
        self.cycles_with(next, time)
    }

    pub fn cursor(&self) -> PhaseCursor<'_> {
        self.cursor_from(f64::NEG_INFINITY)
    }

    /// Cursor positioned for evaluation at or after `time`
    pub fn cursor_from(&self, time: f64) -> PhaseCursor<'_> {
        PhaseCursor {
            track: self,
            next: self.events.partition_point(|&(t, _)| t < time),
        }
    }

    fn cycles_with(&self, next: usize, time: f64) -> f64 {
        match next.checked_sub(1) {
            Some(i) => {
                let (t, hz) = self.events[i];
                self.cycles_at[i] + hz * (time - t)
            }
            None => match self.events.first() {
                Some(&(t0, _)) => self.default * (time - t0),
                None => self.default * time,
            },
        }
    }

    fn rebuild_from(&mut self, index: usize) {
        self.cycles_at.truncate(index);
        for i in index..self.events.len() {
            let cycles = match i.checked_sub(1) {
                Some(prev) => {
                    let (t_prev, hz_prev) = self.events[prev];
                    self.cycles_at[prev] + hz_prev * (self.events[i].0 - t_prev)
                }
                None => 0.0,
            };
            self.cycles_at.push(cycles);
        }
    }
}

/// Forward-only phase evaluator over a [`FrequencyTrack`]
pub struct PhaseCursor<'a> {
    track: &'a FrequencyTrack,
    next: usize,
}

impl PhaseCursor<'_> {
    /// Sine output at `time`; `time` must not decrease between calls
    pub fn sine_at(&mut self, time: f64) -> f64 {
        let events = &self.track.events;
        while self.next < events.len() && events[self.next].0 <= time {
            self.next += 1;
        }
        let cycles = self.track.cycles_with(self.next, time);
        (std::f64::consts::TAU * cycles.rem_euclid(1.0)).sin()
    }
}
