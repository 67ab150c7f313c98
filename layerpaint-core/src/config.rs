//! Engine configuration, stored as TOML in the user's preferences.

const DOCUMENTATION: &str = r"# Layerpaint engine settings. You may edit this file, but be aware that formatting and comments
# will not be preserved.

# width, height: size in pixels of newly created layers, each between 1 and 16384.
# max_layers: adding an empty layer fails once the stack holds this many.
# history_limit: number of undoable commands kept. Older ones are forgotten.

";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no preferences directory available")]
    NoPreferencesDir,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
    #[error("layer size {width}x{height} outside of 1x1 to {max}x{max}", max = EngineConfig::MAX_DIMENSION)]
    InvalidSize { width: u32, height: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub max_layers: usize,
    pub history_limit: usize,
}
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            max_layers: 100,
            history_limit: 64,
        }
    }
}
impl EngineConfig {
    const FILENAME: &'static str = "layerpaint.toml";
    /// Largest accepted layer width or height.
    pub const MAX_DIMENSION: u32 = 16384;
    /// Where the config lives by default, if the platform has a preferences directory.
    #[must_use]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let mut path = dirs::preference_dir()?;
        path.push("layerpaint");
        path.push(Self::FILENAME);
        Some(path)
    }
    /// Read and validate the config at `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let string = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&string)?;
        config.validate()?;
        Ok(config)
    }
    /// Check that layers of the configured size can actually be allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |dimension: u32| (1..=Self::MAX_DIMENSION).contains(&dimension);
        if in_range(self.width) && in_range(self.height) {
            Ok(())
        } else {
            Err(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            })
        }
    }
    /// Load from `path`, falling back on defaults if it can't be read or parsed.
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Engine config at {path:?} unavailable, defaulting: {e}");
                Self::default()
            }
        }
    }
    /// Write to `path`, prefixed with some documentation.
    /// The parent directory is created if missing, but not recursively.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            // Ignore errors (could already exist). Real problems surface on write.
            let _ = std::fs::DirBuilder::new().create(parent);
        }
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(path, string)?;
        Ok(())
    }
    /// Save to [`Self::default_path`].
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoPreferencesDir)?;
        self.save(&path)
    }
}
