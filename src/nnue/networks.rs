//! The big and small models side by side, with load/save entry points.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use super::accumulator::AccumulatorSlot;
use super::aligned::CacheAligned;
use super::error::NetworkError;
use super::network::NetworkParams;
use super::{material_bucket, NetSize, Value, BIG_L1, SMALL_L1};
use crate::board::{Position, StateInfo};

/// Raw network output before blending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetOutput {
    pub psqt: Value,
    /// Zero when only the PSQT lanes were evaluated
    pub positional: Value,
}

/// A parameter set together with the name it was loaded under.
#[derive(Clone, Debug, Default)]
pub struct Network<const L1: usize> {
    name: Option<String>,
    params: NetworkParams<L1>,
}

impl<const L1: usize> Network<L1>
where
    StateInfo: AccumulatorSlot<L1>,
{
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.name.is_some()
    }

    #[must_use]
    pub fn params(&self) -> &NetworkParams<L1> {
        &self.params
    }

    /// Install an in-memory parameter set under `name`.
    pub fn install(&mut self, name: &str, params: NetworkParams<L1>) {
        self.name = Some(name.to_string());
        self.params = params;
    }

    fn load<R: Read>(&mut self, name: &str, reader: &mut R) -> Result<(), NetworkError> {
        match self.params.read(reader) {
            Ok(()) => {
                self.name = Some(name.to_string());
                Ok(())
            }
            Err(err) => {
                self.name = None;
                Err(err)
            }
        }
    }

    fn save<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        if self.name.is_none() {
            return Err(NetworkError::NotLoaded);
        }
        self.params.write(writer)
    }

    /// Evaluate with the layer stack chosen by the material bucket.
    pub fn evaluate(&self, pos: &mut Position, psqt_only: bool) -> NetOutput {
        let bucket = material_bucket(pos.count_all());
        let mut transformed = CacheAligned([0u8; L1]);
        let psqt = self
            .params
            .feature_transformer
            .transform(pos, &mut transformed[..], bucket, psqt_only);
        let positional = if psqt_only {
            0
        } else {
            self.params.stacks[bucket].propagate(&transformed[..])
        };
        NetOutput { psqt, positional }
    }

    /// Evaluate every bucket's split for the current position.
    pub fn evaluate_all_buckets(&self, pos: &mut Position) -> Vec<NetOutput> {
        let mut transformed = CacheAligned([0u8; L1]);
        (0..self.params.stacks.len())
            .map(|bucket| {
                let psqt = self
                    .params
                    .feature_transformer
                    .transform(pos, &mut transformed[..], bucket, false);
                let positional = self.params.stacks[bucket].propagate(&transformed[..]);
                NetOutput { psqt, positional }
            })
            .collect()
    }

    pub fn hint_common_access(&self, pos: &mut Position, psqt_only: bool) {
        self.params.feature_transformer.hint_common_access(pos, psqt_only);
    }
}

/// Both models. A size that failed to load has no name and reports
/// `NotLoaded` on save.
#[derive(Clone, Debug, Default)]
pub struct Networks {
    pub big: Network<BIG_L1>,
    pub small: Network<SMALL_L1>,
}

impl Networks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Both sizes filled with pseudo-random parameters, registered under
    /// the default names.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut networks = Networks::new();
        networks.big.install(
            NetSize::Big.default_name(),
            NetworkParams::random(rng, "random big network"),
        );
        networks.small.install(
            NetSize::Small.default_name(),
            NetworkParams::random(rng, "random small network"),
        );
        networks
    }

    #[must_use]
    pub fn name(&self, size: NetSize) -> Option<&str> {
        match size {
            NetSize::Big => self.big.name(),
            NetSize::Small => self.small.name(),
        }
    }

    #[must_use]
    pub fn description(&self, size: NetSize) -> &str {
        match size {
            NetSize::Big => &self.big.params.description,
            NetSize::Small => &self.small.params.description,
        }
    }

    #[must_use]
    pub fn is_loaded(&self, size: NetSize) -> bool {
        self.name(size).is_some()
    }

    /// Load `size` from `reader`; `false` on any failure.
    pub fn load<R: Read>(&mut self, name: &str, reader: &mut R, size: NetSize) -> bool {
        self.try_load(name, reader, size).is_ok()
    }

    pub fn try_load<R: Read>(
        &mut self,
        name: &str,
        reader: &mut R,
        size: NetSize,
    ) -> Result<(), NetworkError> {
        match size {
            NetSize::Big => self.big.load(name, reader),
            NetSize::Small => self.small.load(name, reader),
        }
    }

    /// Load from a file, registering it under the file's name.
    pub fn try_load_file(&mut self, path: &Path, size: NetSize) -> Result<(), NetworkError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut reader = BufReader::new(File::open(path)?);
        self.try_load(&name, &mut reader, size)
    }

    pub fn save<W: Write>(&self, writer: &mut W, size: NetSize) -> bool {
        self.try_save(writer, size).is_ok()
    }

    pub fn try_save<W: Write>(&self, writer: &mut W, size: NetSize) -> Result<(), NetworkError> {
        match size {
            NetSize::Big => self.big.save(writer),
            NetSize::Small => self.small.save(writer),
        }
    }

    pub fn save_file(&self, filename: Option<&Path>, size: NetSize) -> bool {
        self.try_save_file(filename, size).is_ok()
    }

    /// Save to `filename`, or to the default file name when none is given.
    ///
    /// Without an explicit name only the default network may be saved.
    /// Returns the path written.
    pub fn try_save_file(
        &self,
        filename: Option<&Path>,
        size: NetSize,
    ) -> Result<PathBuf, NetworkError> {
        let name = self.name(size).ok_or(NetworkError::NotLoaded)?;
        let path = match filename {
            Some(path) => path.to_path_buf(),
            None if name == size.default_name() => PathBuf::from(name),
            None => {
                return Err(NetworkError::NonDefaultNetwork {
                    name: name.to_string(),
                })
            }
        };
        let mut writer = BufWriter::new(File::create(&path)?);
        self.try_save(&mut writer, size)?;
        Ok(path)
    }

    pub fn evaluate(&self, size: NetSize, pos: &mut Position, psqt_only: bool) -> NetOutput {
        match size {
            NetSize::Big => self.big.evaluate(pos, psqt_only),
            NetSize::Small => self.small.evaluate(pos, psqt_only),
        }
    }

    pub fn hint_common_access(&self, size: NetSize, pos: &mut Position, psqt_only: bool) {
        match size {
            NetSize::Big => self.big.hint_common_access(pos, psqt_only),
            NetSize::Small => self.small.hint_common_access(pos, psqt_only),
        }
    }
}
