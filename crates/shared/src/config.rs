//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object store connection.
    pub storage: StorageConfig,
    /// Upload pipeline settings.
    pub upload: UploadConfig,
    /// Remote mirroring limits.
    #[serde(default)]
    pub mirror: MirrorConfig,
    /// Avatar generator settings.
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// S3-compatible object store connection.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// S3 API endpoint URL (not the CDN host).
    pub endpoint: String,
    /// Region token. Most S3-compatible stores ignore it.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Bucket that receives uploads.
    pub bucket: String,
}

fn default_region() -> String {
    "auto".to_string()
}

/// Upload pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Hostname that serves uploaded objects over HTTPS.
    pub cdn_host: String,
    /// Prefix prepended to every generated storage key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Maximum accepted body size for direct uploads, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Total attempts per upload, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds. Zero retries immediately.
    #[serde(default)]
    pub retry_base_delay_ms: u64,
    /// Upper bound for the exponential backoff delay in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Randomize each delay between zero and its computed value.
    #[serde(default)]
    pub retry_jitter: bool,
    /// Timeout for a single put attempt in seconds. Zero disables it.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_key_prefix() -> String {
    "picture/".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

/// Remote mirroring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Whole-request timeout for downloads in seconds.
    #[serde(default = "default_mirror_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest remote body that will be buffered, in bytes.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u64,
    /// Hosts allowed as mirror sources. Empty allows any host.
    ///
    /// Accepts a list or a comma-separated string, so it can be set from a
    /// single environment variable.
    #[serde(default, deserialize_with = "parse_host_list")]
    pub allowed_hosts: Vec<String>,
    /// User-Agent sent with downloads.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_mirror_timeout_secs(),
            max_content_length: default_max_content_length(),
            allowed_hosts: Vec::new(),
            user_agent: default_user_agent(),
        }
    }
}

fn parse_host_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HostList {
        List(Vec<String>),
        Joined(String),
    }

    let hosts = match HostList::deserialize(deserializer)? {
        HostList::List(hosts) => hosts,
        HostList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(hosts
        .into_iter()
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .collect())
}

fn default_mirror_timeout_secs() -> u64 {
    30
}

fn default_max_content_length() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    concat!("rehost/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Avatar generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    /// Generator URL template. A `seed` query parameter is appended per user.
    #[serde(default)]
    pub generator_url: Option<String>,
    /// Appended to the user name before it becomes the seed.
    #[serde(default)]
    pub seed_suffix: String,
    /// Extension given to mirrored avatars.
    #[serde(default = "default_avatar_extension")]
    pub extension: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            generator_url: None,
            seed_suffix: String::new(),
            extension: default_avatar_extension(),
        }
    }
}

fn default_avatar_extension() -> String {
    ".svg".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Environment values are kept as strings and converted by the target
    /// field's type, so numeric-looking credentials keep leading zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("REHOST")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, Option<&str>); 6] = [
        ("REHOST__STORAGE__ENDPOINT", Some("https://account.r2.cloudflarestorage.com")),
        ("REHOST__STORAGE__ACCESS_KEY_ID", Some("access_key")),
        ("REHOST__STORAGE__SECRET_ACCESS_KEY", Some("secret_key")),
        ("REHOST__STORAGE__BUCKET", Some("pictures")),
        ("REHOST__UPLOAD__CDN_HOST", Some("cdn.example.com")),
        ("RUN_MODE", Some("test-no-such-file")),
    ];

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(REQUIRED, || {
            let config = AppConfig::load().expect("config should load");

            assert_eq!(config.storage.bucket, "pictures");
            assert_eq!(config.storage.region, "auto");
            assert_eq!(config.upload.cdn_host, "cdn.example.com");
            assert_eq!(config.upload.key_prefix, "picture/");
            assert_eq!(config.upload.max_attempts, 5);
            assert_eq!(config.upload.retry_base_delay_ms, 0);
            assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
            assert_eq!(config.mirror.timeout_secs, 30);
            assert!(config.mirror.allowed_hosts.is_empty());
            assert!(config.avatar.generator_url.is_none());
            assert_eq!(config.avatar.extension, ".svg");
        });
    }

    #[test]
    fn test_environment_overrides() {
        let mut vars: Vec<(&str, Option<&str>)> = REQUIRED.to_vec();
        vars.push(("REHOST__UPLOAD__MAX_ATTEMPTS", Some("3")));
        vars.push(("REHOST__UPLOAD__KEY_PREFIX", Some("avatar/")));
        vars.push(("REHOST__MIRROR__ALLOWED_HOSTS", Some("api.dicebear.com,example.org")));
        vars.push((
            "REHOST__AVATAR__GENERATOR_URL",
            Some("https://api.dicebear.com/9.x/thumbs/svg"),
        ));

        temp_env::with_vars(vars, || {
            let config = AppConfig::load().expect("config should load");

            assert_eq!(config.upload.max_attempts, 3);
            assert_eq!(config.upload.key_prefix, "avatar/");
            assert_eq!(
                config.mirror.allowed_hosts,
                vec!["api.dicebear.com".to_string(), "example.org".to_string()]
            );
            assert_eq!(
                config.avatar.generator_url.as_deref(),
                Some("https://api.dicebear.com/9.x/thumbs/svg")
            );
        });
    }

    #[test]
    fn test_numeric_looking_secrets_stay_verbatim() {
        let mut vars: Vec<(&str, Option<&str>)> = REQUIRED
            .into_iter()
            .filter(|(key, _)| !key.ends_with("_KEY_ID") && !key.ends_with("_ACCESS_KEY"))
            .collect();
        vars.push(("REHOST__STORAGE__ACCESS_KEY_ID", Some("0123")));
        vars.push(("REHOST__STORAGE__SECRET_ACCESS_KEY", Some("1e5")));
        vars.push(("REHOST__UPLOAD__RETRY_JITTER", Some("true")));
        vars.push(("REHOST__MIRROR__ALLOWED_HOSTS", Some("api.dicebear.com")));

        temp_env::with_vars(vars, || {
            let config = AppConfig::load().expect("config should load");

            assert_eq!(config.storage.access_key_id, "0123");
            assert_eq!(config.storage.secret_access_key, "1e5");
            assert!(config.upload.retry_jitter);
            assert_eq!(config.mirror.allowed_hosts, vec!["api.dicebear.com".to_string()]);
        });
    }

    #[test]
    fn test_missing_storage_section_fails() {
        temp_env::with_vars(
            [
                ("REHOST__UPLOAD__CDN_HOST", Some("cdn.example.com")),
                ("REHOST__STORAGE__ENDPOINT", None::<&str>),
                ("REHOST__STORAGE__ACCESS_KEY_ID", None),
                ("REHOST__STORAGE__SECRET_ACCESS_KEY", None),
                ("REHOST__STORAGE__BUCKET", None),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
