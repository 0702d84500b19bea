//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mastery_core::config::ScoringConfig;
use mastery_core::model::UserId;
use mastery_core::session::Session;
use mastery_core::traits::EventStore;

use crate::file::FileEventStore;
use crate::http::{HttpEventStore, DEFAULT_TIMEOUT_SECS};
use crate::memory::MemoryEventStore;

/// Which event store backend to use.
///
/// Note: Custom Debug impl masks access tokens to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    File {
        #[serde(default = "default_data_dir")]
        path: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory => f.debug_struct("Memory").finish(),
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::Http {
                base_url,
                access_token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("access_token", &access_token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./mastery-data")
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level mastery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasteryConfig {
    /// Scoring constants.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Event store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// User to act as when none is given on the command line.
    #[serde(default)]
    pub default_user: Option<String>,
}

impl MasteryConfig {
    /// Session for the configured identity, if the backend authenticates
    /// and a token is set.
    ///
    /// The session belongs to `default_user` (after the `MASTERY_USER`
    /// override), never to a user picked per command.
    pub fn session(&self) -> Option<Session> {
        let user = self
            .default_user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())?;
        match &self.store {
            StoreConfig::Http {
                access_token: Some(token),
                ..
            } if !token.is_empty() => Some(Session::new(UserId::from(user), token.clone())),
            _ => None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied through as-is and never scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + 2 + len];
        out.push_str(&rest[..start]);
        out.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Resolve env vars in a store config.
fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Memory => StoreConfig::Memory,
        StoreConfig::File { path } => StoreConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        StoreConfig::Http {
            base_url,
            access_token,
            timeout_secs,
        } => StoreConfig::Http {
            base_url: resolve_env_vars(base_url),
            access_token: access_token.as_ref().map(|t| resolve_env_vars(t)),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Apply `MASTERY_USER` and `MASTERY_ACCESS_TOKEN` overrides.
fn apply_env_overrides(config: &mut MasteryConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(user) = lookup("MASTERY_USER") {
        config.default_user = Some(user);
    }
    if let Some(token) = lookup("MASTERY_ACCESS_TOKEN") {
        if let StoreConfig::Http { access_token, .. } = &mut config.store {
            *access_token = Some(token);
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mastery.toml` in the current directory
/// 2. `~/.config/mastery/config.toml`
///
/// Environment variable overrides: `MASTERY_USER`, `MASTERY_ACCESS_TOKEN`.
pub fn load_config() -> Result<MasteryConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MasteryConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mastery.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config_file(path)?,
        None => MasteryConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config.store = resolve_store_config(&config.store);

    config
        .scoring
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid [scoring] section: {e}"))?;

    tracing::debug!(path = ?config_path, store = ?config.store, "loaded configuration");
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<MasteryConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<MasteryConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mastery"))
}

/// Create a store instance from its configuration.
///
/// `session` is only used by authenticating backends.
pub fn create_store(config: &StoreConfig, session: Option<Session>) -> Result<Arc<dyn EventStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryEventStore::new())),
        StoreConfig::File { path } => Ok(Arc::new(FileEventStore::new(path.clone()))),
        StoreConfig::Http {
            base_url,
            timeout_secs,
            ..
        } => {
            let mut store = HttpEventStore::with_timeout(base_url, *timeout_secs)
                .with_context(|| format!("failed to configure HTTP store at {base_url}"))?;
            if let Some(session) = session {
                store = store.with_session(session);
            }
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use mastery_core::error::StoreError;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_MASTERY_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_MASTERY_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_MASTERY_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no refs"), "no refs");
        std::env::remove_var("_MASTERY_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = MasteryConfig::default();
        assert_eq!(config.scoring.half_life_days, 90.0);
        assert!(config.default_user.is_none());
        assert!(matches!(config.store, StoreConfig::File { ref path } if path.ends_with("mastery-data")));
    }

    #[test]
    fn parse_http_store_config() {
        let toml_str = r#"
default_user = "learner-1"

[scoring]
half_life_days = 60.0

[scoring.tier_scores]
weak = 20.0

[store]
type = "http"
base_url = "https://docs.example.com/api"
access_token = "tok"
"#;
        let config: MasteryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_user.as_deref(), Some("learner-1"));
        assert_eq!(config.scoring.half_life_days, 60.0);
        assert_eq!(config.scoring.tier_scores.weak, 20.0);
        assert_eq!(config.scoring.tier_scores.moderate, 60.0);
        assert!(matches!(
            config.store,
            StoreConfig::Http { timeout_secs: 30, .. }
        ));
    }

    #[test]
    fn debug_masks_access_token() {
        let config = StoreConfig::Http {
            base_url: "https://docs.example.com".into(),
            access_token: Some("super-secret".into()),
            timeout_secs: 5,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn env_overrides_apply_to_http_only() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("MASTERY_USER", "env-user"), ("MASTERY_ACCESS_TOKEN", "env-tok")]);
        let lookup = |name: &str| vars.get(name).map(|v| v.to_string());

        let mut http = MasteryConfig {
            store: StoreConfig::Http {
                base_url: "https://docs.example.com".into(),
                access_token: None,
                timeout_secs: 5,
            },
            ..Default::default()
        };
        apply_env_overrides(&mut http, lookup);
        assert_eq!(http.default_user.as_deref(), Some("env-user"));
        let session = http.session().unwrap();
        assert_eq!(session.user_id(), &UserId::from("env-user"));
        assert_eq!(session.access_token(), "env-tok");

        let mut file = MasteryConfig::default();
        apply_env_overrides(&mut file, lookup);
        assert!(file.session().is_none());
    }

    #[test]
    fn session_requires_a_configured_user() {
        let mut config = MasteryConfig {
            store: StoreConfig::Http {
                base_url: "https://docs.example.com".into(),
                access_token: Some("tok".into()),
                timeout_secs: 5,
            },
            ..Default::default()
        };
        assert!(config.session().is_none());

        config.default_user = Some("  ".into());
        assert!(config.session().is_none());

        config.default_user = Some("learner-1".into());
        assert_eq!(config.session().unwrap().user_id(), &UserId::from("learner-1"));
    }

    #[tokio::test]
    async fn http_store_rejects_users_other_than_the_configured_one() {
        let config = MasteryConfig {
            default_user: Some("learner-1".into()),
            store: StoreConfig::Http {
                base_url: "http://127.0.0.1:9".into(),
                access_token: Some("tok".into()),
                timeout_secs: 1,
            },
            ..Default::default()
        };
        let store = create_store(&config.store, config.session()).unwrap();

        let err = store.list_by_user(&"someone-else".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationFailed(_)), "{err:?}");
        let err = store
            .delete_many(&"someone-else".into(), &["e1".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationFailed(_)), "{err:?}");
    }

    #[test]
    fn resolve_env_vars_does_not_rescan_substituted_values() {
        std::env::set_var("_MASTERY_SELF_REF", "a${_MASTERY_SELF_REF}b");
        assert_eq!(
            resolve_env_vars("x${_MASTERY_SELF_REF}y"),
            "xa${_MASTERY_SELF_REF}by"
        );
        std::env::remove_var("_MASTERY_SELF_REF");

        assert_eq!(resolve_env_vars("${_MASTERY_UNSET_VAR}/data"), "/data");
        assert_eq!(resolve_env_vars("open ${brace"), "open ${brace");
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mastery.toml");
        std::fs::write(
            &path,
            "[store]\ntype = \"file\"\npath = \"/tmp/mastery-test-data\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert!(matches!(
            config.store,
            StoreConfig::File { ref path } if path == Path::new("/tmp/mastery-test-data")
        ));
    }

    #[test]
    fn load_rejects_missing_file_and_bad_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config_from(Some(&missing))
            .unwrap_err()
            .to_string()
            .contains("not found"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[scoring]\nhalf_life_days = -1.0\n").unwrap();
        let err = load_config_from(Some(&bad)).unwrap_err();
        assert!(err.to_string().contains("half_life_days"));
    }

    #[tokio::test]
    async fn create_store_for_each_backend() {
        let dir = tempfile::tempdir().unwrap();
        let memory = create_store(&StoreConfig::Memory, None).unwrap();
        assert_eq!(memory.name(), "memory");

        let file = create_store(
            &StoreConfig::File {
                path: dir.path().to_path_buf(),
            },
            None,
        )
        .unwrap();
        assert_eq!(file.name(), "file");
        assert!(file.list_by_user(&"u1".into()).await.unwrap().is_empty());

        let http = create_store(
            &StoreConfig::Http {
                base_url: "http://127.0.0.1:9".into(),
                access_token: None,
                timeout_secs: 1,
            },
            None,
        )
        .unwrap();
        assert_eq!(http.name(), "http");

        let bad = create_store(
            &StoreConfig::Http {
                base_url: "::nope::".into(),
                access_token: None,
                timeout_secs: 1,
            },
            None,
        );
        assert!(bad.is_err());
    }
}
