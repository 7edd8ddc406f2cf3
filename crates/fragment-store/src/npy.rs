//! NumPy `.npy` / `.npz` decoding
//!
//! Float arrays (`<f8`, `<f4`) decode to [`ArchiveEntry::Float`] and integer
//! arrays (`<i8`, `<i4`) to [`ArchiveEntry::Int`]. Object arrays (pickled
//! dicts) are not readable; keyed data must be stored as `.npz`.

use crate::splitter::ArchiveEntry;
use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpyError, ReadNpyExt, ReadNpzError, WriteNpyError, WriteNpyExt, WriteNpzError};
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

/// Decode one `.npy` image, trying each supported dtype in turn
pub(crate) fn decode_npy(bytes: &[u8]) -> Result<ArchiveEntry, ReadNpyError> {
    match ArrayD::<f64>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return other.map(ArchiveEntry::Float),
    }
    match ArrayD::<f32>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return other.map(|a| ArchiveEntry::Float(a.mapv(f64::from))),
    }
    match ArrayD::<i64>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return other.map(ArchiveEntry::Int),
    }
    ArrayD::<i32>::read_npy(bytes).map(|a| ArchiveEntry::Int(a.mapv(i64::from)))
}

/// Encode an array as a `.npy` image
pub(crate) fn encode_npy<T>(array: &ArrayD<T>) -> Result<Vec<u8>, WriteNpyError>
where
    ArrayD<T>: WriteNpyExt,
{
    let mut bytes = Vec::new();
    array.write_npy(&mut bytes)?;
    Ok(bytes)
}

/// Read every array of an `.npz` container, keyed by name without the `.npy` suffix
pub(crate) fn read_npz<R: Read + Seek>(reader: R) -> Result<BTreeMap<String, ArchiveEntry>, ReadNpzError> {
    let mut npz = NpzReader::new(reader)?;
    let mut entries = BTreeMap::new();
    for name in npz.names()? {
        let entry = npz_entry(&mut npz, &name)?;
        let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();
        entries.insert(key, entry);
    }
    Ok(entries)
}

/// Write named arrays as an `.npz` container
pub(crate) fn write_npz<W: Write + Seek>(
    writer: W,
    entries: &BTreeMap<String, ArchiveEntry>,
) -> Result<(), WriteNpzError> {
    let mut npz = NpzWriter::new(writer);
    for (name, entry) in entries {
        match entry {
            ArchiveEntry::Float(a) => npz.add_array(name.as_str(), a)?,
            ArchiveEntry::Int(a) => npz.add_array(name.as_str(), a)?,
        }
    }
    npz.finish()?;
    Ok(())
}

fn npz_entry<R: Read + Seek>(npz: &mut NpzReader<R>, name: &str) -> Result<ArchiveEntry, ReadNpzError> {
    match npz.by_name::<OwnedRepr<f64>, IxDyn>(name) {
        Err(e) if wrong_dtype(&e) => {}
        other => return other.map(ArchiveEntry::Float),
    }
    match npz.by_name::<OwnedRepr<f32>, IxDyn>(name) {
        Err(e) if wrong_dtype(&e) => {}
        other => return other.map(|a| ArchiveEntry::Float(a.mapv(f64::from))),
    }
    match npz.by_name::<OwnedRepr<i64>, IxDyn>(name) {
        Err(e) if wrong_dtype(&e) => {}
        other => return other.map(ArchiveEntry::Int),
    }
    npz.by_name::<OwnedRepr<i32>, IxDyn>(name)
        .map(|a| ArchiveEntry::Int(a.mapv(i64::from)))
}

fn wrong_dtype(err: &ReadNpzError) -> bool {
    matches!(err, ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_)))
}
