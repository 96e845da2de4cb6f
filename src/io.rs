use std::{
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{IoError, SurgeError, SurgeResult};

/// Default size of read and write buffers, 128 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

// ================================================================================================
// Storage Location
// ================================================================================================

/// Storage location for policies and reports.
///
/// Note: The `path` must be a **directory path only**.
/// Do **not** include the file name; it will be determined automatically.
#[derive(Debug, Clone, Copy)]
pub enum StorageLocation<'a> {
    /// Local storage location (directory only, not a file path).
    Local(&'a Path),
}

impl<'a> StorageLocation<'a> {
    pub fn path(&self) -> &'a Path {
        match self {
            Self::Local(path) => path,
        }
    }

    pub(crate) fn writer(
        &self,
        file_name: &str,
        buffer_size: usize,
    ) -> SurgeResult<Box<dyn Write + Send>> {
        match self {
            Self::Local(path) => {
                if !path.exists() {
                    std::fs::create_dir_all(path).map_err(|e| {
                        SurgeError::Io(IoError::WriterCreation(format!(
                            "Failed to create directory {:?}: {}",
                            path, e
                        )))
                    })?;
                }

                let full_path = path.join(file_name);
                std::fs::File::create(full_path)
                    .map(|file| {
                        Box::new(BufWriter::with_capacity(buffer_size, file))
                            as Box<dyn Write + Send>
                    })
                    .map_err(|e| SurgeError::Io(IoError::WriterCreation(e.to_string())))
            }
        }
    }

    /// Returns a reader and the file size in bytes.
    pub(crate) fn reader_with_size(
        &self,
        file_name: &str,
        buffer_size: usize,
    ) -> SurgeResult<(Box<dyn Read + Send>, u64)> {
        match self {
            Self::Local(path) => {
                let full_path = path.join(file_name);
                let metadata = std::fs::metadata(&full_path)
                    .map_err(|e| SurgeError::Io(IoError::ReaderCreation(e.to_string())))?;
                let size = metadata.len();

                let file = std::fs::File::open(full_path)
                    .map_err(|e| SurgeError::Io(IoError::ReaderCreation(e.to_string())))?;

                Ok((
                    Box::new(BufReader::with_capacity(buffer_size, file)) as Box<dyn Read + Send>,
                    size,
                ))
            }
        }
    }

    /// Serializes `value` into `<dir>/<stem>.<format>`.
    pub(crate) fn write_value<T: Serialize>(
        &self,
        stem: &str,
        format: SerdeFormat,
        value: &T,
    ) -> SurgeResult<()> {
        let file_name = format.file_name(stem);
        let mut writer = self.writer(&file_name, DEFAULT_BUFFER_SIZE)?;
        match format {
            SerdeFormat::Postcard => {
                let bytes = postcard::to_stdvec(value).map_err(IoError::Postcard)?;
                writer.write_all(&bytes).map_err(IoError::Io)?;
            }
            SerdeFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, value).map_err(IoError::Json)?;
            }
        }
        writer.flush().map_err(IoError::Io)?;
        Ok(())
    }

    /// Reads a value written by [`StorageLocation::write_value`].
    pub(crate) fn read_value<T: DeserializeOwned>(
        &self,
        stem: &str,
        format: SerdeFormat,
    ) -> SurgeResult<T> {
        let file_name = format.file_name(stem);
        let (mut reader, size) = self.reader_with_size(&file_name, DEFAULT_BUFFER_SIZE)?;
        match format {
            SerdeFormat::Postcard => {
                let mut bytes = Vec::with_capacity(size as usize);
                reader.read_to_end(&mut bytes).map_err(IoError::Io)?;
                Ok(postcard::from_bytes(&bytes).map_err(IoError::Postcard)?)
            }
            SerdeFormat::Json => Ok(serde_json::from_reader(reader).map_err(IoError::Json)?),
        }
    }
}

// ================================================================================================
// Serde Formats
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Eq,
    Hash,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    IntoStaticStr,
    Default,
)]
#[strum(serialize_all = "lowercase")]
pub enum SerdeFormat {
    #[default]
    Postcard,
    Json,
}

impl SerdeFormat {
    pub fn from_path(path: &str) -> SurgeResult<Self> {
        match path
            .rsplit_once('.')
            .ok_or_else(|| err(path, true))?
            .1
            .to_lowercase()
            .as_str()
        {
            "postcard" => Ok(Self::Postcard),
            "json" => Ok(Self::Json),
            ext => Err(err(ext, false)),
        }
    }

    pub fn file_name(self, stem: &str) -> String {
        let ext: &'static str = self.into();
        format!("{stem}.{ext}")
    }
}

fn err(s: &str, missing_extension: bool) -> SurgeError {
    let msg = if missing_extension {
        format!("Unsupported file format: missing or invalid extension in path '{s}'")
    } else {
        format!("Unsupported file format: '{s}'")
    };
    IoError::UnsupportedFormat(msg).into()
}
