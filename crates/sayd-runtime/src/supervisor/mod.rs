//! The module table and the output port implementation.

mod fallback;

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use sayd_core::{
    DaemonConfig, FALLBACK_MODULE, ModuleConfig, ModuleEvent, ModuleInfo, OutputError,
    SpeechOutput, SpeechRequest, Voice,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::module::{LoadOptions, OutputModule};
pub use fallback::FallbackModule;

/// One configured module and, if loading succeeded, its worker.
struct ModuleSlot {
    config: ModuleConfig,
    loaded: Option<Arc<OutputModule>>,
}

impl ModuleSlot {
    fn is_working(&self) -> bool {
        self.loaded.as_ref().is_some_and(|m| m.is_working())
    }

    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.config.name.clone(),
            working: self.is_working(),
            voice_count: self.loaded.as_ref().map_or(0, |m| m.voices().len()),
        }
    }
}

/// Owns every worker process and implements [`SpeechOutput`] over them.
///
/// The table lock is never held across an await: callers clone the
/// module's `Arc` out and talk to it afterwards.
pub struct ModuleSupervisor {
    slots: RwLock<Vec<ModuleSlot>>,
    default_module: Option<String>,
    options: LoadOptions,
    debug_dir: PathBuf,
    events: mpsc::UnboundedSender<ModuleEvent>,
    fallback: FallbackModule,
}

impl ModuleSupervisor {
    /// Load every configured module. Modules that fail to load stay in the
    /// table as not working until a reload succeeds.
    pub async fn start(config: &DaemonConfig, events: mpsc::UnboundedSender<ModuleEvent>) -> Self {
        let options = LoadOptions::from_config(config);
        let mut slots = Vec::with_capacity(config.modules.len());
        for module in &config.modules {
            let loaded = OutputModule::load(module.clone(), &options, events.clone())
                .await
                .ok()
                .map(Arc::new);
            slots.push(ModuleSlot {
                config: module.clone(),
                loaded,
            });
        }
        let working = slots.iter().filter(|s| s.is_working()).count();
        info!(configured = slots.len(), working, "Output modules started");

        Self {
            slots: RwLock::new(slots),
            default_module: config.default_module.clone(),
            options,
            debug_dir: config.effective_debug_dir(),
            fallback: FallbackModule::new(events.clone()),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ModuleSlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(&self, name: &str) -> Result<Arc<OutputModule>, OutputError> {
        self.read()
            .iter()
            .find(|s| s.config.name == name)
            .and_then(|s| s.loaded.clone())
            .filter(|m| m.is_working())
            .ok_or_else(|| OutputError::Unavailable(name.to_string()))
    }

    fn working_modules(&self) -> Vec<Arc<OutputModule>> {
        self.read()
            .iter()
            .filter(|s| s.is_working())
            .filter_map(|s| s.loaded.clone())
            .collect()
    }

    /// Replace a slot's worker.
    fn install(&self, name: &str, loaded: Option<Arc<OutputModule>>) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.iter_mut().find(|s| s.config.name == name) {
            slot.loaded = loaded;
        }
    }
}

#[async_trait]
impl SpeechOutput for ModuleSupervisor {
    fn resolve_module(&self, requested: Option<&str>) -> String {
        let slots = self.read();
        let working = |name: &str| slots.iter().any(|s| s.config.name == name && s.is_working());

        if let Some(requested) = requested {
            if requested == FALLBACK_MODULE || working(requested) {
                return requested.to_string();
            }
            debug!(module = requested, "Requested output module not available");
        }
        if let Some(default) = self.default_module.as_deref() {
            if working(default) {
                return default.to_string();
            }
        }
        if let Some(slot) = slots.iter().find(|s| s.is_working()) {
            return slot.config.name.clone();
        }
        FALLBACK_MODULE.to_string()
    }

    async fn speak(&self, module: &str, request: SpeechRequest) -> Result<(), OutputError> {
        if module == FALLBACK_MODULE {
            self.fallback.speak(&request);
            return Ok(());
        }
        let worker = self.loaded(module)?;
        worker
            .speak(&request)
            .await
            .map_err(|e| e.into_output(module))
    }

    async fn stop(&self, module: &str) -> Result<(), OutputError> {
        if module == FALLBACK_MODULE {
            return Ok(());
        }
        let worker = self.loaded(module)?;
        worker.stop().await.map_err(|e| e.into_output(module))
    }

    async fn pause(&self, module: &str) -> Result<(), OutputError> {
        if module == FALLBACK_MODULE {
            return Ok(());
        }
        let worker = self.loaded(module)?;
        worker.pause().await.map_err(|e| e.into_output(module))
    }

    async fn list_modules(&self) -> Vec<ModuleInfo> {
        let mut modules: Vec<_> = self.read().iter().map(ModuleSlot::info).collect();
        modules.push(ModuleInfo {
            name: FALLBACK_MODULE.to_string(),
            working: true,
            voice_count: 0,
        });
        modules
    }

    async fn list_voices(&self, module: &str) -> Result<Vec<Voice>, OutputError> {
        if module == FALLBACK_MODULE {
            return Ok(Vec::new());
        }
        let worker = self.loaded(module)?;
        Ok(worker.voices().to_vec())
    }

    async fn set_debug(&self, enabled: bool) -> Result<(), OutputError> {
        if enabled {
            if let Err(e) = tokio::fs::create_dir_all(&self.debug_dir).await {
                warn!(dir = %self.debug_dir.display(), error = %e, "Cannot create debug directory");
            }
        }
        let mut first_error = None;
        for worker in self.working_modules() {
            let path = enabled.then(|| self.debug_dir.join(format!("{}.log", worker.name())));
            if let Err(e) = worker.set_debug(path).await {
                warn!(module = %worker.name(), error = %e, "Failed to toggle worker debugging");
                first_error.get_or_insert(e.into_output(worker.name()));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn reload(&self) -> Vec<ModuleInfo> {
        let stale: Vec<(ModuleConfig, Option<Arc<OutputModule>>)> = self
            .read()
            .iter()
            .filter(|s| !s.is_working())
            .map(|s| (s.config.clone(), s.loaded.clone()))
            .collect();
        info!(modules = stale.len(), "Reloading output modules");

        for (_, old) in &stale {
            if let Some(old) = old {
                old.reap().await;
            }
        }
        for (config, _) in stale {
            let name = config.name.clone();
            let loaded = OutputModule::load(config, &self.options, self.events.clone())
                .await
                .ok()
                .map(Arc::new);
            self.install(&name, loaded);
        }
        self.list_modules().await
    }

    async fn shutdown(&self) {
        let loaded: Vec<Arc<OutputModule>> = self
            .read()
            .iter()
            .filter_map(|s| s.loaded.clone())
            .collect();
        for worker in loaded {
            info!(module = %worker.name(), "Shutting down output module");
            worker.shutdown().await;
            let name = worker.name().to_string();
            self.install(&name, None);
        }
    }
}
