//! Fragment Store
//!
//! Splits monolithic EEG arrays into numbered fragment files and reassembles
//! them into a `(subjects, samples, channels)` recording with its label vector.

mod error;
mod fragment;
mod loader;
mod npy;
mod splitter;

pub use error::{LoadError, SplitError};
pub use fragment::{FragmentFormat, FragmentKind, FragmentLayout};
pub use loader::{ChunkedLoader, EpochShape, Recording};
pub use splitter::{chunk_bounds, Archive, ArchiveEntry, ArchiveKeys, SplitSummary, Splitter};
