use rmp_serde::{decode, encode};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};
use thiserror::Error;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    config::SearchConfig,
    dataset::{Dataset, DatasetFile, DatasetIdentity},
    search::SearchOutcome,
};

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    RMPWriteError(#[from] encode::Error),
    #[error(transparent)]
    RMPReadError(#[from] decode::Error),
}

/// Reads JSON, falling back to MessagePack when the file is not JSON.
pub fn load_file<T>(path: impl AsRef<Path>) -> Result<T, FileError>
where
    T: DeserializeOwned,
{
    use serde_json::error::Category;

    let path = path.as_ref();
    let file = File::open(path)?;
    let buf_reader = BufReader::new(file);

    let json_result: Result<T, _> = serde_json::from_reader(buf_reader);

    json_result.or_else(|err| match err.classify() {
        Category::Io | Category::Eof => Err(err.into()),
        _ => {
            let file = File::open(path)?;
            let buf_reader = BufReader::new(file);
            let res: Result<T, _> = decode::from_read(buf_reader);
            res.map_err(|x| x.into())
        }
    })
}

pub fn write_file<T>(path: impl AsRef<Path>, object: &T, use_rmp: bool) -> Result<(), FileError>
where
    T: Serialize,
{
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);

    if use_rmp {
        encode::write_named(&mut buf, object)?;
    } else {
        serde_json::to_writer_pretty(buf, object)?;
    }

    Ok(())
}

/// Every dataset in the file, named by key, or by the file stem for a single dataset.
pub fn load_datasets(path: impl AsRef<Path>) -> Result<Vec<(String, Dataset)>, FileError> {
    let path = path.as_ref();
    let file: DatasetFile = load_file(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(file.into_named(&stem))
}

/// Enough to rerun the search that produced an outcome,
/// unless the dataset was written by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputIdentity {
    pub dataset_name: String,
    pub dataset_identity: DatasetIdentity,
    pub config: SearchConfig,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementOutput {
    pub identity: OutputIdentity,
    pub outcome: SearchOutcome,
}

impl PlacementOutput {
    pub fn new(name: &str, dataset: &Dataset, config: &SearchConfig, outcome: SearchOutcome) -> Self {
        Self {
            identity: OutputIdentity {
                dataset_name: name.to_owned(),
                dataset_identity: dataset.identity.clone(),
                config: config.clone(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            outcome,
        }
    }
}
