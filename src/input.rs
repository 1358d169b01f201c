//! Settings key binding.
//!
//! The host registers one binding that opens the settings surface. Key
//! presses are queued as they arrive and drained once per client tick.

/// GLFW key code for `O`, the default settings key.
pub const KEY_O: i32 = 79;

/// Translation key of the settings binding.
pub const SETTINGS_TRANSLATION_KEY: &str = "key.resolutioncontrol.settings";

/// Category the settings binding is listed under.
pub const SETTINGS_CATEGORY: &str = "key.categories.misc";

/// A rebindable key with a queue of unhandled presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    translation_key: &'static str,
    category: &'static str,
    default_key: i32,
    bound_key: i32,
    pending: u32,
}

impl KeyBinding {
    pub fn new(translation_key: &'static str, default_key: i32, category: &'static str) -> Self {
        Self {
            translation_key,
            category,
            default_key,
            bound_key: default_key,
            pending: 0,
        }
    }

    /// The binding that opens the settings surface.
    pub fn settings() -> Self {
        Self::new(SETTINGS_TRANSLATION_KEY, KEY_O, SETTINGS_CATEGORY)
    }

    pub fn translation_key(&self) -> &'static str {
        self.translation_key
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn default_key(&self) -> i32 {
        self.default_key
    }

    pub fn bound_key(&self) -> i32 {
        self.bound_key
    }

    /// Rebind to another key. Pending presses are dropped.
    pub fn rebind(&mut self, keycode: i32) {
        self.bound_key = keycode;
        self.pending = 0;
    }

    /// Feed a key-down event. Returns whether it matched this binding.
    pub fn handle_key_down(&mut self, keycode: i32) -> bool {
        if keycode != self.bound_key {
            return false;
        }
        self.pending = self.pending.saturating_add(1);
        true
    }

    /// Consume one queued press.
    pub fn was_pressed(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}

/// End-of-tick hook that opens the settings surface for each queued press.
#[derive(Debug, Clone)]
pub struct SettingsKeyHook {
    binding: KeyBinding,
}

impl Default for SettingsKeyHook {
    fn default() -> Self {
        Self::new(KeyBinding::settings())
    }
}

impl SettingsKeyHook {
    pub fn new(binding: KeyBinding) -> Self {
        Self { binding }
    }

    pub fn binding(&self) -> &KeyBinding {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut KeyBinding {
        &mut self.binding
    }

    /// Drain queued presses, calling `open_settings` once per press.
    /// Returns the number of times it was called.
    pub fn on_end_tick(&mut self, mut open_settings: impl FnMut()) -> u32 {
        let mut opened = 0;
        while self.binding.was_pressed() {
            open_settings();
            opened += 1;
        }
        opened
    }
}
