//! Engine-facing owner of the networks, options and shared weights.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::eval::{EvalContext, Evaluator};
use crate::logger::{logger_for, EvalLogger};
use crate::nnue::{NetSize, NetworkError, Networks};
use crate::options::{parse_setoption, EvalOptions, OptionAction};
use crate::sync::SharedStrategyWeights;

/// Holds the loaded networks behind a lock that is only taken for writing
/// between searches. Workers take an `Evaluator` snapshot and their own
/// `EvalContext` at the start of a search and never touch the lock again.
pub struct EvalService {
    networks: RwLock<Arc<Networks>>,
    options: RwLock<EvalOptions>,
    shared: SharedStrategyWeights,
    logger: RwLock<Arc<dyn EvalLogger>>,
}

impl EvalService {
    #[must_use]
    pub fn new(options: EvalOptions) -> Self {
        Self::with_networks(Networks::new(), options)
    }

    #[must_use]
    pub fn with_networks(networks: Networks, options: EvalOptions) -> Self {
        let shared = SharedStrategyWeights::new(options.manual_strategy());
        let logger = logger_for(options.debug_blend);
        EvalService {
            networks: RwLock::new(Arc::new(networks)),
            options: RwLock::new(options),
            shared,
            logger: RwLock::new(logger),
        }
    }

    /// Replace the event sink used for load and save outcomes.
    pub fn set_logger(&self, logger: Arc<dyn EvalLogger>) {
        *self.logger.write() = logger;
    }

    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(Arc::clone(&*self.networks.read()))
    }

    /// Fresh per-worker state under the current options
    #[must_use]
    pub fn worker_context(&self) -> EvalContext {
        EvalContext::new(self.options.read().clone(), self.shared.clone())
    }

    #[must_use]
    pub fn options(&self) -> EvalOptions {
        self.options.read().clone()
    }

    #[must_use]
    pub fn shared_weights(&self) -> &SharedStrategyWeights {
        &self.shared
    }

    #[must_use]
    pub fn networks(&self) -> Arc<Networks> {
        Arc::clone(&*self.networks.read())
    }

    /// Load `size` from `reader`. Evaluators handed out earlier keep the
    /// previous networks. On failure the size is left unloaded.
    pub fn load_network<R: Read>(&self, name: &str, reader: &mut R, size: NetSize) -> bool {
        let mut next = Networks::clone(&**self.networks.read());
        let result = next.try_load(name, reader, size);
        let logger = Arc::clone(&*self.logger.read());
        match &result {
            Ok(()) => logger.network_loaded(size, name, next.description(size)),
            Err(err) => logger.network_rejected(size, name, err),
        }
        *self.networks.write() = Arc::new(next);
        result.is_ok()
    }

    pub fn load_network_file(&self, path: &Path, size: NetSize) -> bool {
        match std::fs::File::open(path) {
            Ok(file) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.load_network(&name, &mut std::io::BufReader::new(file), size)
            }
            Err(err) => {
                let err = NetworkError::from(err);
                self.logger
                    .read()
                    .network_rejected(size, &path.display().to_string(), &err);
                false
            }
        }
    }

    pub fn save_network<W: Write>(&self, writer: &mut W, size: NetSize) -> bool {
        self.networks.read().save(writer, size)
    }

    /// Save to `filename`, or to the default name if the default network is
    /// loaded.
    pub fn save_network_file(&self, filename: Option<&Path>, size: NetSize) -> bool {
        let networks = self.networks();
        let logger = Arc::clone(&*self.logger.read());
        match networks.try_save_file(filename, size) {
            Ok(path) => {
                logger.network_saved(size, &path.display().to_string());
                true
            }
            Err(err) => {
                let name = networks.name(size).unwrap_or_default().to_string();
                logger.network_rejected(size, &name, &err);
                false
            }
        }
    }

    /// Apply one option. Manual weights and logger changes take effect
    /// here; a network reload is left to the caller.
    pub fn apply_setoption(&self, name: &str, value: Option<&str>) -> Option<OptionAction> {
        let action = self.options.write().apply_setoption(name, value);
        match &action {
            Some(OptionAction::PublishManualWeights(weights)) => self.shared.store(*weights),
            Some(OptionAction::ReselectLogger(debug)) => self.set_logger(logger_for(*debug)),
            Some(OptionAction::ReloadNetwork(..)) | None => {}
        }
        action
    }

    /// Apply a full `setoption name .. value ..` line.
    pub fn apply_setoption_line(&self, line: &str) -> Option<OptionAction> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (name, value) = parse_setoption(&parts)?;
        self.apply_setoption(&name, value.as_deref())
    }
}

impl Default for EvalService {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::StrategyWeights;
    use rand::prelude::*;
    use std::io::Cursor;

    fn service() -> EvalService {
        EvalService::with_networks(
            Networks::random(&mut StdRng::seed_from_u64(17)),
            EvalOptions::default(),
        )
    }

    #[test]
    fn test_reload_does_not_disturb_existing_evaluators() {
        let svc = service();
        let before = svc.evaluator();
        assert!(!svc.load_network("bad", &mut Cursor::new(vec![0u8; 8]), NetSize::Big));
        assert!(before.networks().is_loaded(NetSize::Big));
        assert!(!svc.evaluator().networks().is_loaded(NetSize::Big));
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let svc = service();
        let mut bytes = Vec::new();
        assert!(svc.save_network(&mut bytes, NetSize::Small));
        assert!(svc.load_network("again.nnue", &mut Cursor::new(&bytes), NetSize::Small));
        assert_eq!(svc.networks().name(NetSize::Small), Some("again.nnue"));
    }

    #[test]
    fn test_manual_weights_reach_workers() {
        let svc = service();
        svc.apply_setoption_line("setoption name NNUE StrategyMaterialWeight value 22");
        let action = svc.apply_setoption_line("setoption name NNUE ManualWeights value true");
        assert_eq!(
            action,
            Some(OptionAction::PublishManualWeights(StrategyWeights::new(22, 15)))
        );
        let ctx = svc.worker_context();
        assert_eq!(ctx.strategy_weights(), StrategyWeights::new(22, 15));
    }

    #[derive(Default)]
    struct SavedPaths(parking_lot::Mutex<Vec<String>>);

    impl EvalLogger for SavedPaths {
        fn network_saved(&self, _size: NetSize, target: &str) {
            self.0.lock().push(target.to_string());
        }
    }

    #[test]
    fn test_save_file_reports_to_logger() {
        let svc = service();
        let saved = Arc::new(SavedPaths::default());
        svc.set_logger(saved.clone());
        let target = std::env::temp_dir().join(format!("style_nnue_svc_{}.nnue", std::process::id()));
        assert!(svc.save_network_file(Some(target.as_path()), NetSize::Small));
        assert!(svc.load_network_file(&target, NetSize::Small));
        let _ = std::fs::remove_file(&target);
        assert_eq!(*saved.0.lock(), vec![target.display().to_string()]);
    }

    #[test]
    fn test_shared_weights_are_the_workers_store() {
        let svc = EvalService::with_networks(
            Networks::random(&mut StdRng::seed_from_u64(17)),
            EvalOptions {
                manual_weights: true,
                ..EvalOptions::default()
            },
        );
        let ctx = svc.worker_context();
        svc.shared_weights().store(StrategyWeights::new(12, 28));
        assert_eq!(ctx.strategy_weights(), StrategyWeights::new(12, 28));
    }

    #[test]
    fn test_missing_file_fails_cleanly() {
        let svc = service();
        assert!(!svc.load_network_file(Path::new("/nonexistent/dir/net.nnue"), NetSize::Small));
        assert!(svc.networks().is_loaded(NetSize::Small));
    }
}
