//! # Error Types
//!
//! Every fallible operation in the crate returns [`ReduceError`].
//!
//! ## Error Types
//! - `InvalidParameter` - bad `max_chords` or trim ratio, rejected up front
//! - `StructuralMismatch` - voices fed to the synchronizer that do not line up
//! - `NumericInstability` - an offset/duration adjustment produced a non-positive length
//! - `Parse` - MusicXML, MXL or file access failures
//! - `InMeasure` - any of the above, tagged with the measure index by the driver
//!
//! An empty measure is not an error: it reduces to a single rest.
//!
//! ## Usage
//! ```rust,no_run
//! use scorereduce::{reduce_file, ReduceError, ReduceOptions};
//!
//! match reduce_file("song.musicxml", &ReduceOptions::default()) {
//!     Ok(part) => println!("{} measures", part.measures.len()),
//!     Err(ReduceError::InMeasure { index, source }) => {
//!         eprintln!("measure {index}: {source}");
//!     }
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReduceError {
    /// A reduction parameter is out of range.
    ///
    /// # Example
    /// ```
    /// # use scorereduce::ReduceError;
    /// let err = ReduceError::InvalidParameter("max_chords must be at least 1".to_string());
    /// assert_eq!(err.to_string(), "Invalid parameter: max_chords must be at least 1");
    /// ```
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Voices handed to the vertical synchronizer have different total
    /// lengths, or a voice has holes between its events.
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    /// An adjustment left an event with a negative or zero duration.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// The input document could not be read or parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An error raised while reducing one measure.
    ///
    /// # Example
    /// ```
    /// # use scorereduce::ReduceError;
    /// let err = ReduceError::InMeasure {
    ///     index: 3,
    ///     source: Box::new(ReduceError::NumericInstability("negative duration".to_string())),
    /// };
    /// assert_eq!(err.to_string(), "Error in measure 3: Numeric instability: negative duration");
    /// ```
    #[error("Error in measure {index}: {source}")]
    InMeasure {
        index: usize,
        #[source]
        source: Box<ReduceError>,
    },
}

impl ReduceError {
    /// Wrap this error with the index of the measure being reduced.
    pub fn in_measure(self, index: usize) -> Self {
        match self {
            already @ ReduceError::InMeasure { .. } => already,
            other => ReduceError::InMeasure {
                index,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ReduceError>;
