use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_WEB_ROOT: &str = "web";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub web: WebConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

/// Where templates and `static/` live when nothing was embedded at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub root: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_WEB_ROOT),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub intro_sub_title: String,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub found: bool,
}

pub fn load(path: &Path) -> Result<ConfigLoad, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(ConfigLoad {
                config: Config::default(),
                found: false,
            });
        }
        Err(err) => return Err(format!("read config {}: {}", path.display(), err)),
    };
    let config = parse(&contents).map_err(|err| format!("parse config {}: {}", path.display(), err))?;
    Ok(ConfigLoad {
        config,
        found: true,
    })
}

fn parse(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.server.address, DEFAULT_ADDRESS);
        assert_eq!(config.web.root, PathBuf::from("web"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
[server]
address = "0.0.0.0:9000"

[ui]
intro_sub_title = "Schedule what every office screen shows"
"#,
        )
        .expect("parse");
        assert_eq!(config.server.address, "0.0.0.0:9000");
        assert_eq!(config.web.root, PathBuf::from("web"));
        assert_eq!(config.ui.intro_sub_title, "Schedule what every office screen shows");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let load = load(&dir.path().join("tvmagic.toml")).expect("load");
        assert!(!load.found);
        assert_eq!(load.config, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tvmagic.toml");
        fs::write(&path, "[server\naddress = 1").expect("write");
        assert!(load(&path).is_err());
    }
}
