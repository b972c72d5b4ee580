use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::classifier::LinearModel;
use crate::dictionary::Dictionary;
use crate::errors::{Result, SeverityError};
use crate::selection::SelectionMask;

const MODEL_MAGIC: &[u8; 4] = b"SVCM";

/// Version of the artifact layout written by [`TrainedModel::write()`].
pub const FORMAT_VERSION: u32 = 1;

/// Trained model: the frozen dictionary, the selected attributes and the
/// classifier parameters.
///
/// The artifact is laid out as follows (little endian):
///
/// ```text
/// magic "SVCM" | u32 version
/// u32 n_tokens | n_tokens × (u32 len | UTF-8 bytes)      in index order
/// u32 n_mask   | n_mask × u32 dictionary index           ascending
/// classifier parameters                                  see LinearModel
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    pub(crate) dictionary: Dictionary,
    pub(crate) mask: SelectionMask,
    pub(crate) classifier: LinearModel,
}

impl TrainedModel {
    /// Bundles the parts of a model.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if the mask refers to
    /// tokens outside the dictionary or its length differs from the number of
    /// classifier attributes.
    pub fn new(
        dictionary: Dictionary,
        mask: SelectionMask,
        classifier: LinearModel,
    ) -> Result<Self> {
        if let Some(&last) = mask.indices().last() {
            if usize::try_from(last)? >= dictionary.len() {
                return Err(SeverityError::invalid_model(format!(
                    "selected attribute {last} is out of range for a dictionary of {} tokens",
                    dictionary.len()
                )));
            }
        }
        if mask.len() != classifier.n_features() {
            return Err(SeverityError::invalid_model(format!(
                "{} attributes are selected, but the classifier expects {}",
                mask.len(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            dictionary,
            mask,
            classifier,
        })
    }

    pub const fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub const fn selection_mask(&self) -> &SelectionMask {
        &self.mask
    }

    pub const fn classifier(&self) -> &LinearModel {
        &self.classifier
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// [`SeverityError::Training`] will be returned if `wtr` fails, since the
    /// trained model is then lost.
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.write_inner(&mut wtr).map_err(|e| match e {
            SeverityError::IOError(e) => {
                SeverityError::training(format!("failed to write the model: {e}"))
            }
            e => e,
        })
    }

    fn write_inner<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        wtr.write_u32::<LittleEndian>(FORMAT_VERSION)?;

        wtr.write_u32::<LittleEndian>(self.dictionary.len().try_into()?)?;
        for token in self.dictionary.tokens() {
            wtr.write_u32::<LittleEndian>(token.len().try_into()?)?;
            wtr.write_all(token.as_bytes())?;
        }

        wtr.write_u32::<LittleEndian>(self.mask.len().try_into()?)?;
        for &i in self.mask.indices() {
            wtr.write_u32::<LittleEndian>(i)?;
        }

        self.classifier.serialize(&mut *wtr)?;
        wtr.flush()?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if the data is not a
    /// model of a supported version, is truncated, or is inconsistent.
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        Self::read_inner(&mut rdr).map_err(|e| match e {
            SeverityError::IOError(e) => {
                SeverityError::invalid_model(format!("failed to read the model: {e}"))
            }
            SeverityError::UTF8Error(e) => {
                SeverityError::invalid_model(format!("invalid dictionary token: {e}"))
            }
            e => e,
        })
    }

    fn read_inner<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; 4];
        rdr.read_exact(&mut magic)?;
        if &magic != MODEL_MAGIC {
            return Err(SeverityError::invalid_model("not a severity model"));
        }
        let version = rdr.read_u32::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(SeverityError::invalid_model(format!(
                "unsupported model version: {version}"
            )));
        }

        let n_tokens = rdr.read_u32::<LittleEndian>()?;
        let mut tokens = vec![];
        for _ in 0..n_tokens {
            let token_size = rdr.read_u32::<LittleEndian>()?;
            let mut token_bytes = vec![0; token_size.try_into()?];
            rdr.read_exact(&mut token_bytes)?;
            tokens.push(String::from_utf8(token_bytes)?);
        }
        let dictionary = Dictionary::from_tokens(tokens)?;

        let n_mask = rdr.read_u32::<LittleEndian>()?;
        let mut indices = vec![];
        for _ in 0..n_mask {
            indices.push(rdr.read_u32::<LittleEndian>()?);
        }
        let mask = SelectionMask::new(indices)?;

        let classifier = LinearModel::deserialize(rdr)?;
        Self::new(dictionary, mask, classifier)
    }
}
