use serde::Deserialize;

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub stub: StubConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StubConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: school_session::DEFAULT_BASE_URL.into(),
            timeout_secs: Some(30),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: ".school-session.toml".into(),
        }
    }
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

pub fn load(path: &str) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse(path, &contents),
        Err(e) => {
            tracing::warn!("failed to read config {path}: {e}, using defaults");
            Config::default()
        }
    }
}

fn parse(path: &str, contents: &str) -> Config {
    match toml::from_str(contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("failed to parse config {path}: {e}, using defaults");
            Config::default()
        }
    }
}
