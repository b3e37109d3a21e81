use crate::mem::DataSet;
use crate::{OpenFileSnafu, ReadError};
use dicomkit_core::DataDictionary;
use dicomkit_dictionary_std::StandardDataDictionary;
use dicomkit_encoding::TransferSyntax;
use dicomkit_parser::DEFAULT_MAX_DEPTH;
use snafu::ResultExt;
use std::path::Path;

/// Create a DICOM object by reading a file.
///
/// This function assumes the standard file encoding structure: 128-byte
/// preamble, `DICM` magic code, file meta group, and the rest of the data set.
pub fn open_file<P>(path: P) -> Result<DataSet, ReadError>
where
    P: AsRef<Path>,
{
    ReadOptions::new().open_file(path)
}

/// A builder type for loading a DICOM object with additional options.
///
/// # Example
///
/// ```no_run
/// # use dicomkit_object::ReadOptions;
/// let obj = ReadOptions::new()
///     .validate(true)
///     .max_depth(16)
///     .open_file("path/to/file.dcm")?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ReadOptions<D = StandardDataDictionary> {
    pub(crate) dictionary: D,
    pub(crate) read_header: bool,
    pub(crate) validate: bool,
    pub(crate) max_depth: usize,
    pub(crate) transfer_syntax: TransferSyntax,
}

impl Default for ReadOptions<StandardDataDictionary> {
    fn default() -> Self {
        ReadOptions {
            dictionary: StandardDataDictionary,
            read_header: true,
            validate: false,
            max_depth: DEFAULT_MAX_DEPTH,
            transfer_syntax: TransferSyntax::implicit_vr_le(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        ReadOptions::default()
    }
}

impl<D> ReadOptions<D> {
    /// Set whether the source starts with
    /// a preamble, the `DICM` magic code and the file meta group.
    ///
    /// This is the default.
    pub fn read_header(mut self, read_header: bool) -> Self {
        self.read_header = read_header;
        self
    }

    /// Set whether to reject data sets
    /// whose transfer syntax or SOP class the dictionary does not support.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Set the maximum nesting of sequences.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the transfer syntax of a source without file header.
    /// Defaults to Implicit VR Little Endian.
    pub fn transfer_syntax(mut self, transfer_syntax: TransferSyntax) -> Self {
        self.transfer_syntax = transfer_syntax;
        self
    }

    /// Set the data element dictionary to use when reading.
    pub fn dictionary<Di>(self, dictionary: Di) -> ReadOptions<Di>
    where
        Di: DataDictionary,
    {
        ReadOptions {
            dictionary,
            read_header: self.read_header,
            validate: self.validate,
            max_depth: self.max_depth,
            transfer_syntax: self.transfer_syntax,
        }
    }

    /// Load a DICOM object from its bytes.
    pub fn load(self, bytes: &[u8]) -> Result<DataSet<D>, ReadError>
    where
        D: DataDictionary,
    {
        DataSet::load_with_options(bytes, self)
    }

    /// Load the file at the given path.
    pub fn open_file<P>(self, path: P) -> Result<DataSet<D>, ReadError>
    where
        P: AsRef<Path>,
        D: DataDictionary,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(OpenFileSnafu { filename: path })?;
        self.load(&bytes)
    }
}
