use crate::effect::{EffectParam, EffectType};

/// Result alias carrying [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The effect family name is not one of the nine supported families.
    #[error("unknown effect type '{0}'")]
    UnknownEffectType(String),

    /// The parameter name does not belong to the effect family.
    #[error("{effect} has no parameter '{name}'")]
    UnknownParameter { effect: EffectType, name: String },

    /// The parameter exists but is fixed at build time.
    #[error("{effect} parameter '{param}' cannot be changed without rebuilding the graph")]
    ParameterNotAutomatable {
        effect: EffectType,
        param: EffectParam,
    },

    /// Audition requested with no lives left, no puzzle, or no graph.
    #[error("audition refused: {0}")]
    InvalidAuditionState(String),

    /// The output device could not start rendering.
    #[error("playback failed to start: {0}")]
    PlaybackFailure(String),

    #[error("no sample loaded")]
    NoSampleLoaded,

    /// The sample was recorded at a different rate than the engine runs at.
    #[error("sample rate {sample} Hz does not match engine rate {engine} Hz")]
    SampleRateMismatch { sample: u32, engine: f64 },

    #[error("no effect graph has been built")]
    NoGraph,

    #[error("invalid puzzle: {0}")]
    InvalidPuzzle(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("audio engine is closed")]
    EngineClosed,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}
