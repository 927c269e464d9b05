use std::time::Duration;

/// Per-run statistics (§4.7, §10.6), mirroring the reference's
/// `gslv->time.{e_solver,f_solver,synth,qinst}` and `stats.refinements`
/// fields verbatim in shape (one wall-clock duration per phase, plus the
/// refinement and iteration counters) rather than collapsing them into a
/// single aggregate, since the reference's own per-phase breakdown is the
/// whole point of keeping them (diagnosing *where* a run spent its time).
#[derive(Clone, Copy, Debug, Default)]
pub struct EfStats {
    pub e_solver_time: Duration,
    pub f_solver_time: Duration,
    pub synth_time: Duration,
    pub instantiate_time: Duration,
    /// The refinement counter of SPEC_FULL.md §3/§5: incremented exactly
    /// once per counterexample asserted to the E-solver.
    pub refinements: u32,
    pub iterations: u32,
}

impl EfStats {
    pub fn total_time(&self) -> Duration {
        self.e_solver_time + self.f_solver_time + self.synth_time + self.instantiate_time
    }
}
