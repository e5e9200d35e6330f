//! One model's complete parameter set and its on-disk layout.

use std::io::{Read, Write};

use rand::Rng;

use super::error::NetworkError;
use super::feature_transformer::FeatureTransformer;
use super::layers::LayerStack;
use super::serialize::{expect_eof, read_u32, write_u32};
use super::{LAYER_STACKS, MAX_DESCRIPTION_LEN, NNUE_VERSION};

/// Feature transformer plus one layer stack per material bucket.
///
/// Layout (little-endian):
///
/// ```text
/// u32 version, u32 hash, u32 desc_len, desc
/// u32 ft_hash, ft biases/weights/psqt
/// LAYER_STACKS x (u32 stack_hash, fc0, fc1, fc2)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkParams<const L1: usize> {
    pub description: String,
    pub feature_transformer: FeatureTransformer<L1>,
    pub stacks: Vec<LayerStack<L1>>,
}

impl<const L1: usize> Default for NetworkParams<L1> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const L1: usize> NetworkParams<L1> {
    /// Header hash of the whole architecture
    pub const HASH: u32 = FeatureTransformer::<L1>::HASH ^ LayerStack::<L1>::HASH;

    #[must_use]
    pub fn zeroed() -> Self {
        NetworkParams {
            description: String::new(),
            feature_transformer: FeatureTransformer::zeroed(),
            stacks: (0..LAYER_STACKS).map(|_| LayerStack::zeroed()).collect(),
        }
    }

    /// Zero every parameter and drop the description.
    pub fn clear(&mut self) {
        self.description.clear();
        self.feature_transformer.clear();
        for stack in &mut self.stacks {
            stack.clear();
        }
    }

    /// Deterministic pseudo-random parameters for a given rng state.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.feature_transformer.randomize(rng);
        for stack in &mut self.stacks {
            stack.randomize(rng);
        }
    }

    #[must_use]
    pub fn random<R: Rng + ?Sized>(rng: &mut R, description: &str) -> Self {
        let mut params = Self::zeroed();
        params.description = description.to_string();
        params.randomize(rng);
        params
    }

    /// Replace the parameters with the contents of `reader`.
    ///
    /// Everything is zeroed first, so a failed read leaves a cleared set
    /// rather than the previous one.
    pub fn read<R: Read>(&mut self, reader: &mut R) -> Result<(), NetworkError> {
        self.clear();

        let version = read_u32(reader)?;
        if version != NNUE_VERSION {
            return Err(NetworkError::VersionMismatch {
                expected: NNUE_VERSION,
                found: version,
            });
        }
        let hash = read_u32(reader)?;
        let desc_len = read_u32(reader)? as usize;
        if desc_len > MAX_DESCRIPTION_LEN {
            return Err(NetworkError::DescriptionTooLong { len: desc_len });
        }
        let mut desc = vec![0u8; desc_len];
        reader.read_exact(&mut desc)?;
        let description = String::from_utf8(desc).map_err(|_| NetworkError::InvalidDescription)?;
        if hash != Self::HASH {
            return Err(NetworkError::HashMismatch {
                section: "header",
                expected: Self::HASH,
                found: hash,
            });
        }

        check_section(reader, "feature transformer", FeatureTransformer::<L1>::HASH)?;
        self.feature_transformer.read_parameters(reader)?;
        for stack in &mut self.stacks {
            check_section(reader, "layer stack", LayerStack::<L1>::HASH)?;
            stack.read_parameters(reader)?;
        }
        expect_eof(reader)?;

        self.description = description;
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        let desc = self.description.as_bytes();
        if desc.len() > MAX_DESCRIPTION_LEN {
            return Err(NetworkError::DescriptionTooLong { len: desc.len() });
        }
        write_u32(writer, NNUE_VERSION)?;
        write_u32(writer, Self::HASH)?;
        write_u32(writer, desc.len() as u32)?;
        writer.write_all(desc)?;

        write_u32(writer, FeatureTransformer::<L1>::HASH)?;
        self.feature_transformer.write_parameters(writer)?;
        for stack in &self.stacks {
            write_u32(writer, LayerStack::<L1>::HASH)?;
            stack.write_parameters(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn check_section<R: Read>(
    reader: &mut R,
    section: &'static str,
    expected: u32,
) -> Result<(), NetworkError> {
    let found = read_u32(reader)?;
    if found == expected {
        Ok(())
    } else {
        Err(NetworkError::HashMismatch {
            section,
            expected,
            found,
        })
    }
}
