//! Run identifier generation.
//!
//! Run ids have the form `YYYYMMDD-HHMMSS-NNNNN`: UTC wall clock plus a
//! 5-digit per-second counter. Within a process the generator is strictly
//! monotonic, even across clock retrograde, so lexicographic order on the id
//! equals creation order.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Process-wide monotonic run id source.
#[derive(Debug)]
pub struct RunIdGenerator {
    state: Mutex<GeneratorState>,
}

#[derive(Debug)]
struct GeneratorState {
    second: DateTime<Utc>,
    counter: u32,
}

const COUNTER_MAX: u32 = 99_999;

impl RunIdGenerator {
    /// Creates a generator seeded from the current wall clock.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GeneratorState {
                second: floor_to_second(Utc::now()) - Duration::seconds(1),
                counter: COUNTER_MAX,
            }),
        }
    }

    /// Returns the next run id.
    pub fn next_id(&self) -> String {
        let mut state = self.state.lock().expect("run id state poisoned");
        let now = floor_to_second(Utc::now());
        if now > state.second {
            state.second = now;
            state.counter = 0;
        } else if state.counter < COUNTER_MAX {
            state.counter += 1;
        } else {
            // Counter exhausted within one second: borrow the next second so
            // the sequence stays strictly increasing.
            state.second = state.second + Duration::seconds(1);
            state.counter = 0;
        }
        format_run_id(state.second, state.counter)
    }
}

impl Default for RunIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn floor_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

fn format_run_id(second: DateTime<Utc>, counter: u32) -> String {
    format!("{}-{:05}", second.format("%Y%m%d-%H%M%S"), counter)
}

/// Returns true when the string has the `YYYYMMDD-HHMMSS-NNNNN` shape.
pub fn is_run_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 21 {
        return false;
    }
    bytes.iter().enumerate().all(|(idx, b)| match idx {
        8 | 15 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}
