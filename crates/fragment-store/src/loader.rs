//! Chunked Recording Loader

use crate::error::LoadError;
use crate::fragment::{read_fragment, FragmentKind, FragmentLayout};
use crate::splitter::ArchiveEntry;
use ndarray::{concatenate, s, Array3, ArrayD, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Fixed per-subject epoch dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochShape {
    /// Samples per epoch (time axis)
    pub samples: usize,
    /// Electrode channels
    pub channels: usize,
}

impl Default for EpochShape {
    fn default() -> Self {
        Self {
            samples: 256,
            channels: 64,
        }
    }
}

impl EpochShape {
    /// Elements per subject (samples x channels)
    pub fn elements(&self) -> usize {
        self.samples * self.channels
    }
}

/// Multi-subject EEG recording with one label per subject
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Tensor indexed `[subject, sample, channel]`
    pub data: Array3<f64>,
    /// Raw label value per subject
    pub labels: Vec<i64>,
}

impl Recording {
    /// Build a recording, checking that every subject has a label
    pub fn new(data: Array3<f64>, labels: Vec<i64>) -> Result<Self, LoadError> {
        let subjects = data.len_of(Axis(0));
        if labels.len() != subjects {
            return Err(LoadError::LabelCountMismatch {
                labels: labels.len(),
                subjects,
            });
        }
        Ok(Self { data, labels })
    }

    /// Number of subjects
    pub fn subjects(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Epoch dimensions shared by all subjects
    pub fn shape(&self) -> EpochShape {
        let (_, samples, channels) = self.data.dim();
        EpochShape { samples, channels }
    }

    /// Time series of one channel of one subject
    pub fn channel(&self, subject: usize, channel: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![subject, .., channel])
    }
}

/// Reassembles a [`Recording`] from numbered fragment files
#[derive(Debug, Clone, Default)]
pub struct ChunkedLoader {
    layout: FragmentLayout,
    shape: EpochShape,
}

impl ChunkedLoader {
    /// Create a loader for the given naming convention and epoch shape
    pub fn new(layout: FragmentLayout, shape: EpochShape) -> Self {
        Self { layout, shape }
    }

    /// Naming convention in use
    pub fn layout(&self) -> &FragmentLayout {
        &self.layout
    }

    /// Load `chunk_count` feature and label fragments from `dir`.
    ///
    /// Fragments are concatenated along the subject axis in ascending index
    /// order, then the features are reshaped to `(subjects, samples, channels)`.
    pub fn load(&self, dir: &Path, chunk_count: usize) -> Result<Recording, LoadError> {
        if chunk_count == 0 {
            return Err(LoadError::NoFragments);
        }
        let per_subject = self.shape.elements();
        if per_subject == 0 {
            return Err(LoadError::EmptyEpochShape {
                samples: self.shape.samples,
                channels: self.shape.channels,
            });
        }

        let features = self
            .read_all(dir, FragmentKind::Features, chunk_count)?
            .into_iter()
            .map(|(_, entry)| entry.into_float())
            .collect::<Vec<_>>();
        let labels = self
            .read_all(dir, FragmentKind::Labels, chunk_count)?
            .into_iter()
            .map(|(i, entry)| {
                entry.into_int().map_err(|bad| LoadError::Malformed {
                    path: self.layout.path(dir, FragmentKind::Labels, i),
                    reason: format!("non-integer label {bad}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let features = concat_subjects(&features)?;
        let labels = concat_subjects(&labels)?;

        let elements = features.len();
        if elements % per_subject != 0 {
            return Err(LoadError::IncompleteSubject {
                elements,
                per_subject,
            });
        }
        let subjects = elements / per_subject;

        let data = Array3::from_shape_vec(
            (subjects, self.shape.samples, self.shape.channels),
            features.iter().copied().collect(),
        )
        .map_err(|e| LoadError::ShapeMismatch(e.to_string()))?;

        let recording = Recording::new(data, labels.iter().copied().collect())?;

        info!(
            "Loaded {} subjects ({} samples x {} channels) from {} fragment pairs in {}",
            subjects,
            self.shape.samples,
            self.shape.channels,
            chunk_count,
            dir.display()
        );

        Ok(recording)
    }

    /// Load every contiguous fragment pair found in `dir`
    pub fn load_discovered(&self, dir: &Path) -> Result<Recording, LoadError> {
        self.load(dir, self.layout.discover(dir))
    }

    fn read_all(&self, dir: &Path, kind: FragmentKind, chunk_count: usize) -> Result<Vec<(usize, ArchiveEntry)>, LoadError> {
        let format = self.layout.format();
        (0..chunk_count)
            .map(|i| {
                let path = self.layout.path(dir, kind, i);
                let entry = read_fragment(&path, format, kind)?;
                debug!("Read {:?} fragment {} ({:?}, {} axes)", kind, i, format, entry.ndim());
                Ok((i, entry))
            })
            .collect()
    }
}

fn concat_subjects<T: Clone>(parts: &[ArrayD<T>]) -> Result<ArrayD<T>, LoadError> {
    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| LoadError::ShapeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::write_fragment;
    use ndarray::{Array, IxDyn};

    fn write_pair(dir: &Path, index: usize, features: ArrayD<f64>, labels: ArrayD<i64>) {
        let layout = FragmentLayout::default();
        write_fragment(&layout.path(dir, FragmentKind::Features, index), layout.format(), &features).unwrap();
        write_fragment(&layout.path(dir, FragmentKind::Labels, index), layout.format(), &labels).unwrap();
    }

    fn small_loader() -> ChunkedLoader {
        ChunkedLoader::new(
            FragmentLayout::default(),
            EpochShape {
                samples: 4,
                channels: 2,
            },
        )
    }

    #[test]
    fn test_load_preserves_subject_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = Array::from_shape_fn(IxDyn(&[2, 4, 2]), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64);
        let second = Array::from_shape_fn(IxDyn(&[1, 4, 2]), |ix| (1000 + ix[1] * 10 + ix[2]) as f64);
        write_pair(dir.path(), 0, first, ArrayD::from_shape_vec(IxDyn(&[2]), vec![1, 0]).unwrap());
        write_pair(dir.path(), 1, second, ArrayD::from_shape_vec(IxDyn(&[1]), vec![1]).unwrap());

        let recording = small_loader().load(dir.path(), 2).unwrap();

        assert_eq!(recording.subjects(), 3);
        assert_eq!(recording.labels, vec![1, 0, 1]);
        assert_eq!(recording.data[[1, 3, 1]], 131.0);
        assert_eq!(recording.data[[2, 0, 1]], 1001.0);
        assert_eq!(recording.shape(), EpochShape { samples: 4, channels: 2 });
    }

    #[test]
    fn test_flat_fragments_are_reshaped() {
        let dir = tempfile::tempdir().unwrap();
        let flat = Array::from_shape_fn(IxDyn(&[2, 8]), |ix| (ix[0] * 8 + ix[1]) as f64);
        write_pair(dir.path(), 0, flat, ArrayD::from_shape_vec(IxDyn(&[2]), vec![0, 0]).unwrap());

        let recording = small_loader().load(dir.path(), 1).unwrap();

        assert_eq!(recording.data.dim(), (2, 4, 2));
        assert_eq!(recording.data[[1, 0, 0]], 8.0);
        assert_eq!(recording.data[[0, 3, 1]], 7.0);
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let features = Array::from_shape_fn(IxDyn(&[3, 4, 2]), |ix| ix[1] as f64 * 0.5);
        write_pair(dir.path(), 0, features, ArrayD::from_shape_vec(IxDyn(&[3]), vec![0, 1, 0]).unwrap());

        let loader = small_loader();
        assert_eq!(loader.load(dir.path(), 1).unwrap(), loader.load(dir.path(), 1).unwrap());
    }

    #[test]
    fn test_missing_label_fragment_fails() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FragmentLayout::default();
        let features = ArrayD::<f64>::zeros(IxDyn(&[1, 4, 2]));
        write_fragment(&layout.path(dir.path(), FragmentKind::Features, 0), layout.format(), &features).unwrap();

        let err = small_loader().load(dir.path(), 1).unwrap_err();
        assert!(matches!(err, LoadError::MissingFragment { .. }));
    }

    #[test]
    fn test_incomplete_subject_fails() {
        let dir = tempfile::tempdir().unwrap();
        let features = ArrayD::<f64>::zeros(IxDyn(&[1, 7]));
        write_pair(dir.path(), 0, features, ArrayD::from_shape_vec(IxDyn(&[1]), vec![1]).unwrap());

        let err = small_loader().load(dir.path(), 1).unwrap_err();
        assert!(matches!(
            err,
            LoadError::IncompleteSubject {
                elements: 7,
                per_subject: 8
            }
        ));
    }

    #[test]
    fn test_mismatched_trailing_shape_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(
            dir.path(),
            0,
            ArrayD::<f64>::zeros(IxDyn(&[1, 4, 2])),
            ArrayD::from_shape_vec(IxDyn(&[1]), vec![1]).unwrap(),
        );
        write_pair(
            dir.path(),
            1,
            ArrayD::<f64>::zeros(IxDyn(&[1, 8])),
            ArrayD::from_shape_vec(IxDyn(&[1]), vec![0]).unwrap(),
        );

        let err = small_loader().load(dir.path(), 2).unwrap_err();
        assert!(matches!(err, LoadError::ShapeMismatch(_)));
    }

    #[test]
    fn test_label_count_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(
            dir.path(),
            0,
            ArrayD::<f64>::zeros(IxDyn(&[2, 4, 2])),
            ArrayD::from_shape_vec(IxDyn(&[1]), vec![1]).unwrap(),
        );

        let err = small_loader().load(dir.path(), 1).unwrap_err();
        assert!(matches!(
            err,
            LoadError::LabelCountMismatch {
                labels: 1,
                subjects: 2
            }
        ));
    }

    #[test]
    fn test_float_label_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FragmentLayout::default();
        write_fragment(
            &layout.path(dir.path(), FragmentKind::Features, 0),
            layout.format(),
            &ArrayD::<f64>::zeros(IxDyn(&[2, 4, 2])),
        )
        .unwrap();
        let labels_path = layout.path(dir.path(), FragmentKind::Labels, 0);

        write_fragment(&labels_path, layout.format(), &ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 0.0]).unwrap()).unwrap();
        assert_eq!(small_loader().load(dir.path(), 1).unwrap().labels, vec![1, 0]);

        write_fragment(&labels_path, layout.format(), &ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 0.5]).unwrap()).unwrap();
        assert!(matches!(
            small_loader().load(dir.path(), 1),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            small_loader().load(dir.path(), 0),
            Err(LoadError::NoFragments)
        ));
    }
}
