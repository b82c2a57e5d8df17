//! Observable server configuration.
//!
//! Settings arrive as JSON in `initializationOptions` and
//! `workspace/didChangeConfiguration`. They live in a [`ConfigStore`]; every
//! operation reads the current value with [`ConfigStore::get`] instead of
//! keeping a copy, and subscribers are told whenever a part is replaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use choicescript_validate::{LintOptions, SpellcheckOptions, ValidationOptions};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Diagnostics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsOptions {
    /// Whether structural validation runs.
    pub validate: bool,
    /// Per-rule levels.
    pub lint: LintOptions,
    /// Spell checking.
    pub spellcheck: SpellcheckOptions,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            validate: true,
            lint: LintOptions::default(),
            spellcheck: SpellcheckOptions::default(),
        }
    }
}

impl DiagnosticsOptions {
    /// The structural part, as the validator takes it.
    pub fn validation(&self) -> ValidationOptions {
        ValidationOptions {
            validate: self.validate,
            lint: self.lint.clone(),
        }
    }
}

/// Which language features are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeConfiguration {
    /// Completion.
    pub completion_items: bool,
    /// Hover.
    pub hovers: bool,
    /// Document symbols.
    pub document_symbols: bool,
    /// Go to definition.
    pub definitions: bool,
    /// Find references.
    pub references: bool,
    /// Document highlights.
    pub document_highlights: bool,
    /// Folding ranges.
    pub folding_ranges: bool,
    /// Published diagnostics.
    pub diagnostics: bool,
    /// Typographic replacements while typing.
    pub auto_format: bool,
}

impl Default for ModeConfiguration {
    fn default() -> Self {
        Self {
            completion_items: true,
            hovers: true,
            document_symbols: true,
            definitions: true,
            references: true,
            document_highlights: false,
            folding_ranges: false,
            diagnostics: true,
            auto_format: true,
        }
    }
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChoiceScriptSettings {
    /// Diagnostics settings.
    pub diagnostics: DiagnosticsOptions,
    /// Enabled features.
    pub mode: ModeConfiguration,
}

impl ChoiceScriptSettings {
    /// Read settings from a client payload.
    ///
    /// Accepts the settings object itself or one nested under a
    /// `"choicescript"` key. A payload that does not parse yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let value = value.get("choicescript").unwrap_or(value);
        match serde_json::from_value(value.clone()) {
            Ok(settings) => Some(settings),
            Err(err) => {
                tracing::warn!("Ignoring invalid settings: {}", err);
                None
            }
        }
    }
}

/// What a configuration change replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChange {
    /// Diagnostics options changed.
    pub diagnostics: bool,
    /// Mode configuration changed.
    pub mode: bool,
}

impl ConfigChange {
    fn between(old: &ChoiceScriptSettings, new: &ChoiceScriptSettings) -> Self {
        Self {
            diagnostics: old.diagnostics != new.diagnostics,
            mode: old.mode != new.mode,
        }
    }

    /// Whether anything changed.
    pub const fn is_empty(&self) -> bool {
        !self.diagnostics && !self.mode
    }
}

/// Identifies a subscription for [`ConfigStore::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ConfigChange) + Send + Sync>;

/// Process-wide observable settings holder.
#[derive(Default)]
pub struct ConfigStore {
    current: RwLock<Arc<ChoiceScriptSettings>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &*self.current.read())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl ConfigStore {
    /// Create a store holding `settings`.
    pub fn new(settings: ChoiceScriptSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
            ..Self::default()
        }
    }

    /// The current settings.
    pub fn get(&self) -> Arc<ChoiceScriptSettings> {
        Arc::clone(&self.current.read())
    }

    /// Replace the diagnostics options.
    pub fn set_diagnostics_options(&self, diagnostics: DiagnosticsOptions) {
        let mut settings = (*self.get()).clone();
        settings.diagnostics = diagnostics;
        self.replace(settings);
    }

    /// Replace the mode configuration.
    pub fn set_mode_configuration(&self, mode: ModeConfiguration) {
        let mut settings = (*self.get()).clone();
        settings.mode = mode;
        self.replace(settings);
    }

    /// Replace all settings and notify subscribers of what changed.
    ///
    /// Replacing settings with an equal value notifies no one.
    pub fn replace(&self, settings: ChoiceScriptSettings) {
        let change = {
            let mut current = self.current.write();
            let change = ConfigChange::between(&current, &settings);
            *current = Arc::new(settings);
            change
        };
        if change.is_empty() {
            return;
        }

        tracing::debug!(?change, "configuration changed");
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&change);
        }
    }

    /// Call `listener` after every change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ConfigChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Stop notifying a subscriber. Returns whether it was subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
