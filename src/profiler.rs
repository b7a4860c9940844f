// Scoped profiler recording cumulative time per evolution section (field
// generation, force accumulation, gather publish/wait, frame rendering).
// Compiled to a no-op unless the `profiling` feature is enabled.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct Profiler {
    timings: HashMap<&'static str, Duration>,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        let elapsed = guard.start.elapsed();
        *self.timings.entry(guard.name).or_default() += elapsed;
    }

    pub fn report_sorted(&self) -> Vec<(&'static str, Duration)> {
        let mut v: Vec<_> = self.timings.iter().map(|(n, d)| (*n, *d)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }

    pub fn print_and_clear(&mut self) {
        let total: Duration = self.timings.values().sum();
        for (name, dur) in self.report_sorted() {
            let share = if total.is_zero() {
                0.0
            } else {
                100.0 * dur.as_secs_f64() / total.as_secs_f64()
            };
            println!("{name:<22} {dur:>12.2?} {share:5.1}%");
        }
        self.timings.clear();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProfilerGuard {
    name: &'static str,
    start: Instant,
}

/// Start a profiling section. The guard updates the global profiler on drop.
pub fn start(name: &'static str) -> ProfilerGuard {
    ProfilerGuard {
        name,
        start: Instant::now(),
    }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Time a scope only when the `profiling` feature is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($name);
    };
}
