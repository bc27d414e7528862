// Exact rational time and the standard heptatonic pitch system: the
// arithmetic layer under the counterpoint engine. No knowledge of scores or
// rules lives here.

pub mod interval;
pub mod pitch;
pub mod scale;
pub mod time;

pub use interval::{Interval, Sign};
pub use pitch::Pitch;
pub use scale::{Degree, Scale};
pub use time::{Time, time, whole};

use thiserror::Error;

/// Failure to parse a pitch, interval, or accidental expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid pitch expression {0:?}")]
    Pitch(String),
    #[error("invalid interval expression {0:?}")]
    Interval(String),
    #[error("invalid accidental expression {0:?}")]
    Accidental(String),
}
