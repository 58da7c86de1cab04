use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocoderControlError {
    #[error("Slot error: {0}")]
    Slot(#[from] crate::map::SlotError),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeocoderControlError>;
