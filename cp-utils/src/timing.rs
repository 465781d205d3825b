use std::time::Instant;

use tracing::debug;

/// Profiler hook for reload phases. Compiles to a no-op clock without `perf_timing`.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    phase: &'static str,
    started: Option<Instant>,
}

impl Timing {
    #[inline]
    pub fn start(phase: &'static str) -> Self {
        #[cfg(feature = "perf_timing")]
        let started = Some(Instant::now());
        #[cfg(not(feature = "perf_timing"))]
        let started = None;
        Self { phase, started }
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    #[inline]
    pub fn ms(&self) -> f32 {
        self.started
            .map(|t| t.elapsed().as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Logs the elapsed time for this phase and returns it.
    pub fn finish(self) -> f32 {
        let ms = self.ms();
        debug!(phase = self.phase, ms, "phase finished");
        ms
    }
}
