use std::time::Duration;

use crate::error::CadenceError;

// Every duration fires independently from the loop start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    intervals: Vec<Duration>,
}

impl Cadence {
    pub fn parse<S: AsRef<str>>(times: &[S]) -> Result<Self, CadenceError> {
        if times.is_empty() {
            return Err(CadenceError::Empty);
        }

        let mut intervals = times
            .iter()
            .map(|raw| parse_duration(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        intervals.sort();
        intervals.dedup();

        Ok(Self { intervals })
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    pub fn next_delay_ms(&self, elapsed_ms: u64) -> u64 {
        self.intervals
            .iter()
            .map(|interval| {
                let period = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
                period - elapsed_ms % period
            })
            .min()
            .unwrap_or(u64::MAX)
    }
}

// PnW or P[nD][T[nH][nM][nS]]. Years and months have no fixed length.
pub fn parse_duration(raw: &str) -> Result<Duration, CadenceError> {
    let invalid = || CadenceError::InvalidDuration(raw.to_string());

    let body = raw.trim().strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }

    let mut seconds: f64 = 0.0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    let mut saw_time_component = false;

    for ch in body.chars() {
        match ch {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if ch == ',' { '.' } else { ch }),
            unit => {
                let value: f64 = number.parse().map_err(|_| invalid())?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'W') => 7.0 * 86_400.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return Err(invalid()),
                };
                seconds += value * scale;
                saw_component = true;
                saw_time_component |= in_time;
            }
        }
    }

    if !number.is_empty() || !saw_component || (in_time && !saw_time_component) {
        return Err(invalid());
    }
    if seconds <= 0.0 {
        return Err(CadenceError::ZeroDuration(raw.to_string()));
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}
