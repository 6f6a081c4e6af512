pub mod categories;
pub mod trend;
pub mod formatter;

pub use categories::*;
pub use trend::*;
pub use formatter::*;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Date out of range: {months} months before {from}")]
    DateOutOfRange { from: NaiveDate, months: u32 },
}
