use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The landmark set does not contain a landmark the operation depends on.
    #[error("landmark set has {len} landmarks, but index {required} is required")]
    TooFewLandmarks { len: usize, required: usize },

    /// Two feature vectors of different length were compared.
    #[error("cannot compare feature vectors of length {live} and {reference}")]
    LengthMismatch { live: usize, reference: usize },

    /// The landmark detector failed on a frame.
    #[error("landmark detection failed: {0}")]
    Detection(#[source] anyhow::Error),

    /// A frame was submitted after the session was stopped.
    #[error("session has been stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;
