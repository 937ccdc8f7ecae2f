use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::BotConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "marketbot.toml",
    "marketbot.yaml",
    "marketbot.yml",
    "marketbot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<BotConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./marketbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/marketbot/marketbot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `BotConfig::default()` if no config file is found.
pub fn discover_and_load() -> BotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BotConfig::default()
}

/// Load from an explicit path when given, otherwise discover, then apply
/// environment overrides.
pub fn load(path: Option<&Path>) -> Result<BotConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/marketbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "marketbot").map(|d| d.config_dir().to_path_buf())
}

/// Override config values from the process environment.
///
/// Recognised variables: `PAGE_ACCESS_TOKEN`, `VERIFY_TOKEN`, `GRAPH_API_URL`,
/// `PORT`, `ENABLE_FB_NLP`, `ENABLE_DETECTOR`, `DETECTOR`,
/// `IMAGE_PRE_PROCESS_URL`, `SMBMKT_BACKEND_URL`, `BOT_PUBLIC_URL`.
pub fn apply_env_overrides(config: &mut BotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut BotConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("PAGE_ACCESS_TOKEN") {
        config.messenger.page_access_token = Secret::new(token);
    }
    if let Some(token) = var("VERIFY_TOKEN") {
        config.messenger.verify_token = Secret::new(token);
    }
    if let Some(url) = var("GRAPH_API_URL") {
        config.messenger.graph_api_url = url;
    }
    if let Some(port) = var("PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(%port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(flag) = var("ENABLE_FB_NLP") {
        config.nlp.enabled = parse_flag(&flag);
    }
    if let Some(flag) = var("ENABLE_DETECTOR") {
        config.detector.enabled = parse_flag(&flag);
    }
    if let Some(backend) = var("DETECTOR") {
        config.detector.backend = backend;
    }
    // Applies to whichever backend is selected after `DETECTOR`.
    if let Some(url) = var("IMAGE_PRE_PROCESS_URL") {
        config
            .detector
            .endpoints
            .insert(config.detector.backend.clone(), url);
    }
    if let Some(url) = var("SMBMKT_BACKEND_URL") {
        config.similarity.backend_url = url;
    }
    if let Some(url) = var("BOT_PUBLIC_URL") {
        config.bot.public_url = Some(url);
    }
}

/// Parse a boolean-ish environment value.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_config(raw: &str, path: &Path) -> Result<BotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use {secrecy::ExposeSecret, std::collections::HashMap};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketbot.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 3000

[messenger]
page_access_token = "page-token"
verify_token = "verify-me"

[detector]
enabled = true
backend = "yolo"
endpoints = { yolo = "https://detect.example.com/yolo" }

[bot]
persona_name = "ana"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.messenger.page_access_token.expose_secret(), "page-token");
        assert_eq!(
            cfg.detector.endpoint(),
            Some("https://detect.example.com/yolo")
        );
        assert_eq!(cfg.bot.persona_name, "ana");
        assert!(cfg.replies.intents.contains_key("InvalidAttachment"));
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("marketbot.yaml");
        std::fs::write(&yaml, "nlp:\n  enabled: true\n").unwrap();
        assert!(load_config(&yaml).unwrap().nlp.enabled);

        let json = dir.path().join("marketbot.json");
        std::fs::write(&json, r#"{"similarity": {"backend_url": "http://sim"}}"#).unwrap();
        assert_eq!(
            load_config(&json).unwrap().similarity.endpoint().as_deref(),
            Some("http://sim/SimilarItems")
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketbot.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Path::new("/nonexistent/marketbot.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut cfg = BotConfig::default();
        cfg.server.port = 1234;
        apply_env_overrides_with(
            &mut cfg,
            env(&[
                ("PAGE_ACCESS_TOKEN", "tok"),
                ("VERIFY_TOKEN", "ver"),
                ("PORT", "5000"),
                ("ENABLE_DETECTOR", "true"),
                ("DETECTOR", "yolo"),
                ("IMAGE_PRE_PROCESS_URL", "http://detect"),
                ("SMBMKT_BACKEND_URL", "http://backend/"),
                ("ENABLE_FB_NLP", "1"),
            ]),
        );
        assert_eq!(cfg.messenger.page_access_token.expose_secret(), "tok");
        assert_eq!(cfg.messenger.verify_token.expose_secret(), "ver");
        assert_eq!(cfg.server.port, 5000);
        assert!(cfg.detector.enabled);
        assert_eq!(cfg.detector.endpoint(), Some("http://detect"));
        assert_eq!(
            cfg.similarity.endpoint().as_deref(),
            Some("http://backend/SimilarItems")
        );
        assert!(cfg.nlp.enabled);
    }

    #[test]
    fn invalid_port_and_blank_values_are_ignored() {
        let mut cfg = BotConfig::default();
        apply_env_overrides_with(&mut cfg, env(&[("PORT", "eighty"), ("VERIFY_TOKEN", "  ")]));
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.messenger.verify_token.expose_secret().is_empty());
    }

    #[test]
    fn flags() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
    }
}
