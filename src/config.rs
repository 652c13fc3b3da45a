use crate::{
    error::ConfigError, tree::DEFAULT_COLUMN_WIDTHS, utils, APPLICATION, ORGANIZATION, QUALIFIER,
};
use eframe::egui::{Key, KeyboardShortcut, Modifiers};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const MOD_ALT: &str = "alt";
const MOD_SHIFT: &str = "shift";
const MOD_CTRL: &str = "ctrl";
const MOD_MAC_CMD: &str = "mac_cmd";
const MOD_CMD: &str = "cmd";

const CONFIG_FILE: &str = "config.json";

#[derive(Deserialize, Serialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub shortcuts: ShortcutConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_text_scaling")]
    pub text_scaling: f32,
    #[serde(default = "default_thumbnails")]
    pub thumbnails: bool,
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_watch_folder")]
    pub watch_folder: bool,
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
    #[serde(default)]
    pub last_folder: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct TreeConfig {
    #[serde(default = "default_column_widths")]
    pub column_widths: [f32; 4],
    /// Longest value shown in a row, 0 shows everything.
    #[serde(default = "default_max_value_chars")]
    pub max_value_chars: usize,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ShortcutConfig {
    #[serde(default = "default_sc_exit")]
    pub sc_exit: Shortcut,
    #[serde(default = "default_sc_open_folder")]
    pub sc_open_folder: Shortcut,
    #[serde(default = "default_sc_focus_path")]
    pub sc_focus_path: Shortcut,
    #[serde(default = "default_sc_rescan")]
    pub sc_rescan: Shortcut,
    #[serde(default = "default_sc_expand_all")]
    pub sc_expand_all: Shortcut,
    #[serde(default = "default_sc_collapse_all")]
    pub sc_collapse_all: Shortcut,
    #[serde(default = "default_sc_focus_filter")]
    pub sc_focus_filter: Shortcut,
    #[serde(default = "default_sc_watch_folder")]
    pub sc_watch_folder: Shortcut,
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(from = "ShortcutData")]
pub struct Shortcut {
    pub key: String,
    pub modifiers: Vec<String>,
    #[serde(skip)]
    #[serde(default = "default_shortcut")]
    pub kbd_shortcut: KeyboardShortcut,
}

#[derive(Deserialize, Serialize)]
pub struct ShortcutData {
    pub key: String,
    pub modifiers: Vec<String>,
}

impl Shortcut {
    fn from(key: &str, modifiers: &[&str]) -> Shortcut {
        let modifiers: Vec<String> = modifiers.iter().map(|x| x.to_string()).collect();
        Shortcut {
            kbd_shortcut: build_keyboard_shortcut(&modifiers, key),
            key: key.to_string(),
            modifiers,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            text_scaling: default_text_scaling(),
            thumbnails: default_thumbnails(),
            thumbnail_size: default_thumbnail_size(),
            watch_folder: default_watch_folder(),
            watch_debounce_ms: default_watch_debounce_ms(),
            last_folder: None,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            column_widths: default_column_widths(),
            max_value_chars: default_max_value_chars(),
        }
    }
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        ShortcutConfig {
            sc_exit: default_sc_exit(),
            sc_open_folder: default_sc_open_folder(),
            sc_focus_path: default_sc_focus_path(),
            sc_rescan: default_sc_rescan(),
            sc_expand_all: default_sc_expand_all(),
            sc_collapse_all: default_sc_collapse_all(),
            sc_focus_filter: default_sc_focus_filter(),
            sc_watch_folder: default_sc_watch_folder(),
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Self::fetch_cfg()
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads the user config, falling back to defaults on any failure.
    pub fn fetch_cfg() -> Config {
        let cfg_path = match Self::config_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                return Config::default();
            }
        };

        tracing::info!("Reading config -> {}", cfg_path.display());

        match Self::load_from(&cfg_path) {
            Ok(cfg) => cfg,
            Err(ConfigError::Io(e, _)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file, using defaults");
                Config::default()
            }
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let config_json =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;
        let cfg = serde_json::from_str(&config_json)?;
        Ok(cfg)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io(e, dir.to_path_buf()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;
        tracing::debug!("Saved config -> {}", path.display());

        Ok(())
    }
}

pub fn default_text_scaling() -> f32 {
    1.25
}

pub fn default_thumbnails() -> bool {
    true
}

pub fn default_thumbnail_size() -> u32 {
    64
}

pub fn default_watch_folder() -> bool {
    false
}

pub fn default_watch_debounce_ms() -> u64 {
    500
}

//Tree
pub fn default_column_widths() -> [f32; 4] {
    DEFAULT_COLUMN_WIDTHS
}

pub fn default_max_value_chars() -> usize {
    200
}

//Shortcuts
pub fn default_sc_exit() -> Shortcut {
    Shortcut::from("q", &[MOD_CTRL])
}

pub fn default_sc_open_folder() -> Shortcut {
    Shortcut::from("o", &[MOD_CTRL])
}

pub fn default_sc_focus_path() -> Shortcut {
    Shortcut::from("l", &[MOD_CTRL])
}

pub fn default_sc_rescan() -> Shortcut {
    Shortcut::from("F5", &[])
}

pub fn default_sc_expand_all() -> Shortcut {
    Shortcut::from("e", &[MOD_CTRL])
}

pub fn default_sc_collapse_all() -> Shortcut {
    Shortcut::from("e", &[MOD_CTRL, MOD_SHIFT])
}

pub fn default_sc_focus_filter() -> Shortcut {
    Shortcut::from("f", &[MOD_CTRL])
}

pub fn default_sc_watch_folder() -> Shortcut {
    Shortcut::from("w", &[MOD_CTRL])
}

pub fn default_shortcut() -> KeyboardShortcut {
    //Bogus shortcut as default so we don't have to use option
    //We use F20 as most users don't have it and all modifiers
    let modi = Modifiers {
        alt: true,
        ctrl: true,
        shift: true,
        command: true,
        mac_cmd: false,
    };

    KeyboardShortcut::new(modi, Key::F20)
}

impl From<ShortcutData> for Shortcut {
    fn from(data: ShortcutData) -> Self {
        Shortcut {
            kbd_shortcut: build_keyboard_shortcut(&data.modifiers, &data.key),
            key: data.key,
            modifiers: data.modifiers,
        }
    }
}

pub fn build_keyboard_shortcut(mods: &[String], key: &str) -> KeyboardShortcut {
    let mut modifiers = Modifiers::default();
    for modi in mods {
        match modi.as_str() {
            MOD_ALT => modifiers.alt = true,
            MOD_CTRL => modifiers.ctrl = true,
            MOD_SHIFT => modifiers.shift = true,
            MOD_CMD => modifiers.command = true,
            MOD_MAC_CMD => modifiers.mac_cmd = true,
            _ => {
                tracing::warn!("Invalid modifier({}) in configuration", modi.as_str())
            }
        }
    }

    match Key::from_name(&utils::capitalize_first_char(key)) {
        Some(key) => KeyboardShortcut {
            logical_key: key,
            modifiers,
        },
        None => {
            tracing::warn!("Invalid shortcut key: {key}");
            default_shortcut()
        } //uses default unreachable shortcut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let json = r#"{
            "general": { "thumbnails": false, "last_folder": "/photos" },
            "tree": { "max_value_chars": 0 }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();

        assert!(!cfg.general.thumbnails);
        assert_eq!(cfg.general.last_folder, Some(PathBuf::from("/photos")));
        assert_eq!(cfg.general.thumbnail_size, 64);
        assert_eq!(cfg.tree.max_value_chars, 0);
        assert_eq!(cfg.tree.column_widths, [300., 300., 100., 50.]);
        assert_eq!(cfg.shortcuts.sc_exit.key, "q");
    }

    #[test]
    fn shortcuts_from_json() {
        let json = r#"{ "shortcuts": {
            "sc_rescan": { "key": "r", "modifiers": ["ctrl", "shift"] },
            "sc_exit": { "key": "NotAKey", "modifiers": [] }
        } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();

        let rescan = cfg.shortcuts.sc_rescan.kbd_shortcut;
        assert_eq!(rescan.logical_key, Key::R);
        assert!(rescan.modifiers.ctrl && rescan.modifiers.shift);
        assert!(!rescan.modifiers.alt);

        assert_eq!(cfg.shortcuts.sc_exit.kbd_shortcut, default_shortcut());
        assert_eq!(
            cfg.shortcuts.sc_focus_filter.kbd_shortcut.logical_key,
            Key::F
        );
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut cfg = Config::default();
        cfg.general.last_folder = Some(dir.path().to_path_buf());
        cfg.general.watch_folder = true;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.general.last_folder, cfg.general.last_folder);
        assert!(loaded.general.watch_folder);
        assert_eq!(
            loaded.shortcuts.sc_collapse_all.kbd_shortcut,
            default_sc_collapse_all().kbd_shortcut
        );
    }

    #[test]
    fn broken_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.json")),
            Err(ConfigError::Io(..))
        ));
    }
}
