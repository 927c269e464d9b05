/// Number base used when rendering model values downstream (§6.4, §6.5).
/// `Bin` is the reference's default (`OUTPUT_NUMBER_FORMAT` = 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberFormat {
    Bin,
    Dec,
    Hex,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Bin
    }
}

/// The options the core recognizes (§6.5), mirroring the shape of the
/// teacher's `SolverChoice` (`examples/nikomatsakis-chalk/chalk-solve/src/lib.rs`):
/// a small, `Copy`-friendly configuration struct with a `Default` giving the
/// reference's own defaults, constructed through a builder rather than
/// field-by-field struct literals at every call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverOptions {
    /// `EF_DUAL_SOLVER`: recognized but inert (§9 Design Notes — "Dual
    /// solver").
    pub dual_solver: bool,
    /// `EF_SYNTH`: attempt symbolic synthesis before the concrete fallback.
    pub synth_enabled: bool,
    pub number_format: NumberFormat,
    /// Optional cap on CEGIS iterations (crate addition, §4.7); hitting it
    /// is reported as `EfResult::Unknown`, distinct from a ground-solver
    /// `Unknown`.
    pub max_iterations: Option<u32>,
    /// Initial per-symbol enumeration budget for the synthesizer (§4.6),
    /// doubled on each iteration a symbol's previous candidate was not a
    /// full match.
    pub synth_initial_limit: u64,
    /// Bottom-up enumeration depth passed to `ef_synth::synthesize_fun`.
    pub synth_level: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            dual_solver: false,
            synth_enabled: true,
            number_format: NumberFormat::Bin,
            max_iterations: None,
            synth_initial_limit: ef_synth::DEFAULT_SYNTH_LIMIT,
            synth_level: 4,
        }
    }
}

impl SolverOptions {
    pub fn builder() -> SolverOptionsBuilder {
        SolverOptionsBuilder::default()
    }
}

/// Builder for `SolverOptions`, in the teacher's `SolverChoice`-adjacent
/// construction style but generalized to a standalone builder since
/// `SolverOptions` (unlike `SolverChoice`) is not itself an enum of solver
/// strategies.
#[derive(Default)]
pub struct SolverOptionsBuilder {
    options: SolverOptions,
}

impl SolverOptionsBuilder {
    pub fn dual_solver(mut self, value: bool) -> Self {
        self.options.dual_solver = value;
        self
    }

    pub fn synth_enabled(mut self, value: bool) -> Self {
        self.options.synth_enabled = value;
        self
    }

    pub fn number_format(mut self, value: NumberFormat) -> Self {
        self.options.number_format = value;
        self
    }

    pub fn max_iterations(mut self, value: Option<u32>) -> Self {
        self.options.max_iterations = value;
        self
    }

    pub fn synth_initial_limit(mut self, value: u64) -> Self {
        self.options.synth_initial_limit = value;
        self
    }

    pub fn synth_level(mut self, value: u32) -> Self {
        self.options.synth_level = value;
        self
    }

    pub fn build(self) -> SolverOptions {
        self.options
    }
}
