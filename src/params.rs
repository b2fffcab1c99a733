//! Parameter surface
//!
//! The 18 host-facing controls, their symbols, units, defaults, and
//! inclusive ranges, plus the dB/percent conversions used when mapping a
//! control value onto a filter or gain coefficient.

use serde::{Deserialize, Serialize};

/// Number of host-facing parameters
pub const PARAM_COUNT: usize = 18;

/// Parameter identifiers, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamId {
    /// Input low-pass amount in percent
    InputLpf,
    /// Pre-model gain in dB
    PreGain,
    /// Bypass the neural model stage
    NetBypass,
    /// Bypass the tone stack
    EqBypass,
    /// Tone stack position relative to the model stage
    EqPosition,
    BassGain,
    BassFreq,
    MidGain,
    MidFreq,
    MidQ,
    /// Mid stage behavior: parametric peak or band-pass voicing
    MidType,
    TrebleGain,
    TrebleFreq,
    Depth,
    Presence,
    MasterGain,
    /// Bypass flag consumed by the cabinet convolution stage (outside this core)
    CabSimBypass,
    /// Host-level global bypass (outside this core)
    GlobalBypass,
}

impl ParamId {
    /// All parameters in table order
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::InputLpf,
        ParamId::PreGain,
        ParamId::NetBypass,
        ParamId::EqBypass,
        ParamId::EqPosition,
        ParamId::BassGain,
        ParamId::BassFreq,
        ParamId::MidGain,
        ParamId::MidFreq,
        ParamId::MidQ,
        ParamId::MidType,
        ParamId::TrebleGain,
        ParamId::TrebleFreq,
        ParamId::Depth,
        ParamId::Presence,
        ParamId::MasterGain,
        ParamId::CabSimBypass,
        ParamId::GlobalBypass,
    ];

    /// Index into the static table / a [`ParameterSet`]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub id: ParamId,
    pub symbol: &'static str,
    pub unit: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
}

/// The fixed parameter table
///
/// Out-of-range values are the caller's responsibility; the ranges here
/// are what a host is expected to enforce.
pub const PARAMETERS: [ParamSpec; PARAM_COUNT] = [
    ParamSpec { id: ParamId::InputLpf, symbol: "INLPF", unit: "%", default: 50.0, min: 25.0, max: 99.0 },
    ParamSpec { id: ParamId::PreGain, symbol: "PREGAIN", unit: "dB", default: -6.0, min: -12.0, max: 0.0 },
    ParamSpec { id: ParamId::NetBypass, symbol: "NETBYPASS", unit: "", default: 0.0, min: 0.0, max: 1.0 },
    ParamSpec { id: ParamId::EqBypass, symbol: "EQBYPASS", unit: "", default: 0.0, min: 0.0, max: 1.0 },
    ParamSpec { id: ParamId::EqPosition, symbol: "EQPOS", unit: "", default: 0.0, min: 0.0, max: 1.0 },
    ParamSpec { id: ParamId::BassGain, symbol: "BASS", unit: "dB", default: 0.0, min: -8.0, max: 8.0 },
    ParamSpec { id: ParamId::BassFreq, symbol: "BFREQ", unit: "Hz", default: 305.0, min: 75.0, max: 600.0 },
    ParamSpec { id: ParamId::MidGain, symbol: "MID", unit: "dB", default: 0.0, min: -8.0, max: 8.0 },
    ParamSpec { id: ParamId::MidFreq, symbol: "MFREQ", unit: "Hz", default: 750.0, min: 150.0, max: 5000.0 },
    ParamSpec { id: ParamId::MidQ, symbol: "MIDQ", unit: "", default: 0.707, min: 0.2, max: 5.0 },
    ParamSpec { id: ParamId::MidType, symbol: "MTYPE", unit: "", default: 0.0, min: 0.0, max: 1.0 },
    ParamSpec { id: ParamId::TrebleGain, symbol: "TREBLE", unit: "dB", default: 0.0, min: -8.0, max: 8.0 },
    ParamSpec { id: ParamId::TrebleFreq, symbol: "TFREQ", unit: "Hz", default: 2000.0, min: 1000.0, max: 4000.0 },
    ParamSpec { id: ParamId::Depth, symbol: "DEPTH", unit: "dB", default: 0.0, min: -8.0, max: 8.0 },
    ParamSpec { id: ParamId::Presence, symbol: "PRESENCE", unit: "dB", default: 0.0, min: -8.0, max: 8.0 },
    ParamSpec { id: ParamId::MasterGain, symbol: "MASTER", unit: "dB", default: 0.0, min: -15.0, max: 15.0 },
    ParamSpec { id: ParamId::CabSimBypass, symbol: "CABSIMBYPASS", unit: "", default: 0.0, min: 0.0, max: 1.0 },
    ParamSpec { id: ParamId::GlobalBypass, symbol: "GLOBALBYPASS", unit: "", default: 0.0, min: 0.0, max: 1.0 },
];

/// Current values for all 18 parameters
#[derive(Debug, Clone)]
pub struct ParameterSet {
    values: [f32; PARAM_COUNT],
}

impl Default for ParameterSet {
    fn default() -> Self {
        let mut values = [0.0; PARAM_COUNT];
        for (value, spec) in values.iter_mut().zip(PARAMETERS.iter()) {
            *value = spec.default;
        }
        Self { values }
    }
}

impl ParameterSet {
    /// All parameters at their table defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a parameter
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()]
    }

    /// Store a parameter value (no clamping beyond host-level enforcement)
    #[inline]
    pub fn set(&mut self, id: ParamId, value: f32) {
        self.values[id.index()] = value;
    }

    /// Interpret a parameter as a boolean switch
    #[inline]
    pub fn is_on(&self, id: ParamId) -> bool {
        self.get(id) > 0.5
    }

    /// Look up the static spec for a parameter
    pub fn spec(id: ParamId) -> &'static ParamSpec {
        &PARAMETERS[id.index()]
    }

    /// Look up a parameter by its table symbol
    pub fn id_for_symbol(symbol: &str) -> Option<ParamId> {
        PARAMETERS
            .iter()
            .find(|spec| spec.symbol.eq_ignore_ascii_case(symbol))
            .map(|spec| spec.id)
    }
}

/// Convert a gain in dB to a linear coefficient, with a silence floor
/// below -90 dB
#[inline]
pub fn db_to_coefficient(gain_db: f32) -> f32 {
    if gain_db > -90.0 {
        10.0_f32.powf(gain_db * 0.05)
    } else {
        0.0
    }
}

/// Scale a percentage control to a [0, 1] coefficient
#[inline]
pub fn percent_to_coefficient(percent: f32) -> f32 {
    if percent < 100.0 {
        percent / 100.0
    } else {
        1.0
    }
}
