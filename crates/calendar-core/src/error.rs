use thiserror::Error;

/// Errors produced by the calendar engine.
///
/// Date-arithmetic errors are surfaced directly to the caller. Store
/// failures (`StoreUnavailable`) are caught and logged at the
/// `DayFactory` boundary instead of failing the whole `Day` — see
/// `day::DayFactory::build`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("civil year {year} is out of the supported range [2001, 2099]")]
    OutOfRange { year: i32 },

    #[error("could not parse scripture reference '{reference}'")]
    ReferenceParseError { reference: String },

    #[error("store query failed: {message}")]
    StoreUnavailable { message: String },

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
