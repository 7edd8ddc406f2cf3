//! Fragment naming and encoding
//!
//! A fragment is one array holding a contiguous run of subjects, stored as
//! NumPy `.npy` or as a postcard-encoded `ndarray::ArrayD`. Its ordinal index
//! is embedded in the file name.

use crate::error::{LoadError, SplitError};
use crate::npy::{decode_npy, encode_npy};
use crate::splitter::ArchiveEntry;
use ndarray::ArrayD;
use ndarray_npy::WriteNpyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which array a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Slice of the (subjects, samples, channels) feature tensor
    Features,
    /// Slice of the per-subject label vector
    Labels,
}

/// On-disk encoding of a fragment, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentFormat {
    /// NumPy `.npy`
    Npy,
    /// postcard-encoded `ndarray::ArrayD`
    Postcard,
}

/// File naming convention for fragment sets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentLayout {
    /// Common file name prefix (e.g. `train`)
    pub stem: String,
    /// Key identifying feature fragments (e.g. `X`)
    pub feature_key: String,
    /// Key identifying label fragments (e.g. `y`)
    pub label_key: String,
    /// File extension without the dot; `npy` selects NumPy encoding
    pub extension: String,
}

impl Default for FragmentLayout {
    fn default() -> Self {
        Self {
            stem: "train".to_string(),
            feature_key: "X".to_string(),
            label_key: "y".to_string(),
            extension: "npy".to_string(),
        }
    }
}

impl FragmentLayout {
    /// Encoding implied by `extension`
    pub fn format(&self) -> FragmentFormat {
        if self.extension.eq_ignore_ascii_case("npy") {
            FragmentFormat::Npy
        } else {
            FragmentFormat::Postcard
        }
    }

    /// File name of fragment `index`, e.g. `train_X_part_3.npy`
    pub fn file_name(&self, kind: FragmentKind, index: usize) -> String {
        let key = match kind {
            FragmentKind::Features => &self.feature_key,
            FragmentKind::Labels => &self.label_key,
        };
        format!("{}_{}_part_{}.{}", self.stem, key, index, self.extension)
    }

    /// Full path of fragment `index` inside `dir`
    pub fn path(&self, dir: &Path, kind: FragmentKind, index: usize) -> PathBuf {
        dir.join(self.file_name(kind, index))
    }

    /// Count contiguous feature fragments present in `dir`, starting at 0
    pub fn discover(&self, dir: &Path) -> usize {
        (0..)
            .take_while(|&i| self.path(dir, FragmentKind::Features, i).is_file())
            .count()
    }
}

/// Decode one fragment file.
///
/// NumPy fragments may hold any supported dtype; postcard fragments hold
/// `f64` features or `i64` labels.
pub(crate) fn read_fragment(path: &Path, format: FragmentFormat, kind: FragmentKind) -> Result<ArchiveEntry, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::MissingFragment {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let malformed = |reason: String| LoadError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let entry = match (format, kind) {
        (FragmentFormat::Npy, _) => decode_npy(&bytes).map_err(|e| malformed(e.to_string()))?,
        (FragmentFormat::Postcard, FragmentKind::Features) => {
            ArchiveEntry::Float(decode_postcard(&bytes).map_err(malformed)?)
        }
        (FragmentFormat::Postcard, FragmentKind::Labels) => {
            ArchiveEntry::Int(decode_postcard(&bytes).map_err(malformed)?)
        }
    };

    if entry.ndim() == 0 {
        return Err(malformed("zero-dimensional array".to_string()));
    }
    Ok(entry)
}

fn decode_postcard<T: DeserializeOwned>(bytes: &[u8]) -> Result<ArrayD<T>, String> {
    postcard::from_bytes(bytes).map_err(|e| e.to_string())
}

/// Encode one fragment file, replacing any existing file
pub(crate) fn write_fragment<T>(path: &Path, format: FragmentFormat, array: &ArrayD<T>) -> Result<(), SplitError>
where
    T: Serialize,
    ArrayD<T>: WriteNpyExt,
{
    let bytes = match format {
        FragmentFormat::Npy => encode_npy(array).map_err(|e| e.to_string()),
        FragmentFormat::Postcard => postcard::to_allocvec(array).map_err(|e| e.to_string()),
    }
    .map_err(|reason| SplitError::Encode {
        path: path.to_path_buf(),
        reason,
    })?;

    std::fs::write(path, bytes).map_err(|source| SplitError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npy::tests::numpy_v1;
    use ndarray::IxDyn;

    #[test]
    fn test_default_file_names() {
        let layout = FragmentLayout::default();
        assert_eq!(layout.file_name(FragmentKind::Features, 0), "train_X_part_0.npy");
        assert_eq!(layout.file_name(FragmentKind::Labels, 9), "train_y_part_9.npy");
        assert_eq!(layout.format(), FragmentFormat::Npy);
    }

    #[test]
    fn test_other_extensions_use_postcard() {
        let layout = FragmentLayout {
            extension: "frag".to_string(),
            ..Default::default()
        };
        assert_eq!(layout.format(), FragmentFormat::Postcard);
    }

    #[test]
    fn test_discover_stops_at_gap() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FragmentLayout::default();
        let array = ArrayD::<f64>::zeros(IxDyn(&[1, 2]));

        for i in [0, 1, 2, 4] {
            write_fragment(&layout.path(dir.path(), FragmentKind::Features, i), layout.format(), &array).unwrap();
        }

        assert_eq!(layout.discover(dir.path()), 3);
    }

    #[test]
    fn test_postcard_fragment_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.frag");
        let labels = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1i64, 0, 1]).unwrap();
        write_fragment(&path, FragmentFormat::Postcard, &labels).unwrap();

        let entry = read_fragment(&path, FragmentFormat::Postcard, FragmentKind::Labels).unwrap();
        assert_eq!(entry, ArchiveEntry::Int(labels));
    }

    #[test]
    fn test_reads_numpy_written_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train_y_part_0.npy");
        let data: Vec<u8> = [1.0f64, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(&path, numpy_v1("<f8", &[2], &data)).unwrap();

        let entry = read_fragment(&path, FragmentFormat::Npy, FragmentKind::Labels).unwrap();
        assert_eq!(entry.into_int().unwrap().iter().copied().collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn test_missing_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_fragment(&dir.path().join("absent.npy"), FragmentFormat::Npy, FragmentKind::Features).unwrap_err();
        assert!(matches!(err, LoadError::MissingFragment { .. }));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.npy");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();

        for format in [FragmentFormat::Npy, FragmentFormat::Postcard] {
            let err = read_fragment(&path, format, FragmentKind::Features).unwrap_err();
            assert!(matches!(err, LoadError::Malformed { .. }));
        }
    }

    #[test]
    fn test_zero_dimensional_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.npy");
        write_fragment(&path, FragmentFormat::Npy, &ArrayD::from_elem(IxDyn(&[]), 1.0f64)).unwrap();

        let err = read_fragment(&path, FragmentFormat::Npy, FragmentKind::Features).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }
}
