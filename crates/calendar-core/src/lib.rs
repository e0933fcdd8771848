pub mod cancel;
pub mod dateops;
pub mod day;
pub mod error;
pub mod scripture;
pub mod store;
pub mod types;
pub mod year;

pub use cancel::CancellationToken;
pub use day::DayFactory;
pub use error::{Error, Result};
pub use types::Day;
pub use year::YearContext;
