//! Archive Splitter
//!
//! Produces the fragment sets consumed by [`crate::ChunkedLoader`]. Slices are
//! contiguous along axis 0 with a floor-division chunk size; the last slice
//! absorbs the remainder.

use crate::error::SplitError;
use crate::fragment::{write_fragment, FragmentKind, FragmentLayout};
use crate::npy::{decode_npy, encode_npy, read_npz, write_npz};
use ndarray::{ArrayD, Axis, Slice};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, warn};

/// One numeric array, as stored in an archive or fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchiveEntry {
    /// Floating-point values, widened to `f64`
    Float(ArrayD<f64>),
    /// Integer values, widened to `i64`
    Int(ArrayD<i64>),
}

impl ArchiveEntry {
    /// Number of axes
    pub fn ndim(&self) -> usize {
        match self {
            Self::Float(a) => a.ndim(),
            Self::Int(a) => a.ndim(),
        }
    }

    /// Values as `f64`
    pub fn into_float(self) -> ArrayD<f64> {
        match self {
            Self::Float(a) => a,
            Self::Int(a) => a.mapv(|v| v as f64),
        }
    }

    /// Values as `i64`; the first non-integral float is returned as the error
    pub fn into_int(self) -> Result<ArrayD<i64>, f64> {
        match self {
            Self::Int(a) => Ok(a),
            Self::Float(a) => {
                if let Some(&bad) = a.iter().find(|v| v.fract() != 0.0 || !v.is_finite()) {
                    return Err(bad);
                }
                Ok(a.mapv(|v| v as i64))
            }
        }
    }
}

/// Monolithic source array, optionally wrapped in a key-value container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Archive {
    /// Feature tensor only, no labels
    Bare(ArrayD<f64>),
    /// Named arrays, looked up through [`ArchiveKeys`]
    Keyed(BTreeMap<String, ArchiveEntry>),
}

impl Archive {
    /// Decode an archive file.
    ///
    /// `.npy` holds a bare feature array and `.npz` a keyed container (as
    /// written by `numpy.save` / `numpy.savez`); any other extension is read
    /// as a postcard-encoded [`Archive`].
    pub fn read(path: &Path) -> Result<Self, SplitError> {
        let io_err = |source: std::io::Error| SplitError::Io {
            path: path.to_path_buf(),
            source,
        };
        let decode_err = |reason: String| SplitError::Decode {
            path: path.to_path_buf(),
            reason,
        };

        match archive_extension(path).as_deref() {
            Some("npy") => {
                let bytes = std::fs::read(path).map_err(io_err)?;
                let entry = decode_npy(&bytes).map_err(|e| decode_err(e.to_string()))?;
                Ok(Self::Bare(entry.into_float()))
            }
            Some("npz") => {
                let file = File::open(path).map_err(io_err)?;
                let entries = read_npz(file).map_err(|e| decode_err(e.to_string()))?;
                Ok(Self::Keyed(entries))
            }
            _ => {
                let bytes = std::fs::read(path).map_err(io_err)?;
                postcard::from_bytes(&bytes).map_err(|e| decode_err(e.to_string()))
            }
        }
    }

    /// Encode this archive to `path`, choosing the format by extension as in [`Archive::read`]
    pub fn write(&self, path: &Path) -> Result<(), SplitError> {
        let encode_err = |reason: String| SplitError::Encode {
            path: path.to_path_buf(),
            reason,
        };
        let io_err = |source: std::io::Error| SplitError::Io {
            path: path.to_path_buf(),
            source,
        };

        match (archive_extension(path).as_deref(), self) {
            (Some("npz"), Self::Keyed(entries)) => {
                let file = File::create(path).map_err(io_err)?;
                write_npz(file, entries).map_err(|e| encode_err(e.to_string()))
            }
            (Some("npy"), Self::Bare(features)) => {
                let bytes = encode_npy(features).map_err(|e| encode_err(e.to_string()))?;
                std::fs::write(path, bytes).map_err(io_err)
            }
            (Some("npy"), Self::Keyed(_)) | (Some("npz"), Self::Bare(_)) => Err(encode_err(
                "use .npy for a bare array and .npz for a keyed archive".to_string(),
            )),
            _ => {
                let bytes = postcard::to_allocvec(self).map_err(|e| encode_err(e.to_string()))?;
                std::fs::write(path, bytes).map_err(io_err)
            }
        }
    }
}

fn archive_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Conventional key names inside a keyed archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveKeys {
    /// Key of the feature tensor (default `input`)
    pub features: String,
    /// Key of the label vector (default `label`)
    pub labels: String,
}

impl Default for ArchiveKeys {
    fn default() -> Self {
        Self {
            features: "input".to_string(),
            labels: "label".to_string(),
        }
    }
}

/// Outcome of a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    /// Fragments written per array
    pub chunks: usize,
    /// Length of the feature array's axis 0
    pub subjects: usize,
    /// Whether label fragments were written
    pub labels_written: bool,
}

/// Axis-0 ranges for `chunks` slices of `total` rows
pub fn chunk_bounds(total: usize, chunks: usize) -> Vec<Range<usize>> {
    if chunks == 0 {
        return Vec::new();
    }
    let size = total / chunks;
    (0..chunks)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 < chunks { start + size } else { total };
            start..end
        })
        .collect()
}

/// Splits archives into numbered fragment files
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    layout: FragmentLayout,
    keys: ArchiveKeys,
}

impl Splitter {
    /// Create a splitter writing names per `layout`
    pub fn new(layout: FragmentLayout, keys: ArchiveKeys) -> Self {
        Self { layout, keys }
    }

    /// Read an archive file and split it into `out_dir`
    pub fn split_file(
        &self,
        archive_path: &Path,
        out_dir: &Path,
        chunks: usize,
    ) -> Result<SplitSummary, SplitError> {
        let archive = Archive::read(archive_path)?;
        self.split(&archive, out_dir, chunks)
    }

    /// Split an in-memory archive into `chunks` fragment pairs under `out_dir`
    pub fn split(
        &self,
        archive: &Archive,
        out_dir: &Path,
        chunks: usize,
    ) -> Result<SplitSummary, SplitError> {
        if chunks == 0 {
            return Err(SplitError::NoChunks);
        }

        let (features, labels) = self.unpack(archive)?;
        if features.ndim() == 0 {
            return Err(SplitError::Unsplittable);
        }

        std::fs::create_dir_all(out_dir).map_err(|source| SplitError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let subjects = features.len_of(Axis(0));
        info!(
            "Splitting feature array {:?} into {} chunks of {} rows",
            features.shape(),
            chunks,
            subjects / chunks
        );
        self.write_slices(&features, out_dir, FragmentKind::Features, chunks)?;

        let labels_written = match labels {
            Some(labels) if labels.ndim() > 0 => {
                self.write_slices(&labels, out_dir, FragmentKind::Labels, chunks)?;
                true
            }
            Some(_) => {
                warn!("Label array is zero-dimensional; writing feature fragments only");
                false
            }
            None => {
                warn!("Archive has no label array; writing feature fragments only");
                false
            }
        };

        Ok(SplitSummary {
            chunks,
            subjects,
            labels_written,
        })
    }

    fn unpack(&self, archive: &Archive) -> Result<(ArrayD<f64>, Option<ArrayD<i64>>), SplitError> {
        match archive {
            Archive::Bare(features) => Ok((features.clone(), None)),
            Archive::Keyed(entries) => {
                let features = entries
                    .get(&self.keys.features)
                    .cloned()
                    .map(ArchiveEntry::into_float)
                    .ok_or_else(|| SplitError::MissingKey(self.keys.features.clone()))?;
                let labels = entries
                    .get(&self.keys.labels)
                    .cloned()
                    .map(ArchiveEntry::into_int)
                    .transpose()
                    .map_err(SplitError::NonIntegerLabel)?;
                Ok((features, labels))
            }
        }
    }

    fn write_slices<T>(
        &self,
        array: &ArrayD<T>,
        out_dir: &Path,
        kind: FragmentKind,
        chunks: usize,
    ) -> Result<(), SplitError>
    where
        T: Clone + Serialize,
        ArrayD<T>: WriteNpyExt,
    {
        for (i, range) in chunk_bounds(array.len_of(Axis(0)), chunks).into_iter().enumerate() {
            let slice = array.slice_axis(Axis(0), Slice::from(range)).to_owned();
            let path = self.layout.path(out_dir, kind, i);
            write_fragment(&path, self.layout.format(), &slice)?;
            debug!("Wrote {} with shape {:?}", path.display(), slice.shape());
        }
        Ok(())
    }
}
