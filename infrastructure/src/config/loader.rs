//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["colloquy.toml", ".colloquy.toml"];

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `COLLOQUY_` environment variables (`COLLOQUY_SETTINGS__MAX_MESSAGES=20`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./colloquy.toml` or `./.colloquy.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/colloquy/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path, Self::project_config_path().as_deref())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: Option<&PathBuf>, project: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = project {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("COLLOQUY_").split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/colloquy/config.toml if set,
    /// otherwise falls back to ~/.config/colloquy/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("colloquy").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&PathBuf>) {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Environment: COLLOQUY_* variables");

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:<5}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./colloquy.toml or ./.colloquy.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.settings.max_participants, 10);
        assert_eq!(config.strategy.kind, "round_robin");
        assert!(config.orchestrator.snapshot_on_commit);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("colloquy"));
    }

    #[test]
    fn test_explicit_file_overrides_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("colloquy.toml");
        let explicit = dir.path().join("explicit.toml");

        let mut f = std::fs::File::create(&project).unwrap();
        writeln!(f, "[settings]\nmax_messages = 10\nturn_timeout_secs = 90").unwrap();
        let mut f = std::fs::File::create(&explicit).unwrap();
        writeln!(f, "[settings]\nmax_messages = 25").unwrap();

        let config: FileConfig = ConfigLoader::figment(Some(&explicit), Some(&project))
            .extract()
            .unwrap();
        assert_eq!(config.settings.max_messages, Some(25));
        assert_eq!(config.settings.turn_timeout_secs, 90);
        assert_eq!(config.settings.response_timeout_secs, 60);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("broken.toml");
        std::fs::write(&explicit, "[settings]\nmax_participants = \"many\"\n").unwrap();

        let result: Result<FileConfig, _> = ConfigLoader::figment(Some(&explicit), None).extract();
        assert!(result.is_err());
    }
}
