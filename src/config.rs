use thiserror::Error;

/// Which implementation backs the store and identity collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    Memory,
}

impl BackendKind {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supabase" | "" => Ok(Self::Supabase),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("BACKEND")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub supabase: Option<SupabaseConfig>,
    pub jwt: JwtConfig,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid("APP_PORT"))?,
            Err(_) => 8080,
        };

        let backend = BackendKind::parse(&std::env::var("BACKEND").unwrap_or_default())?;

        // The hosted backend is only needed when it is actually selected.
        let supabase = match backend {
            BackendKind::Supabase => Some(SupabaseConfig {
                url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
                anon_key: required("SUPABASE_ANON_KEY")?,
                service_key: required("SUPABASE_SERVICE_KEY")?,
            }),
            BackendKind::Memory => None,
        };

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            audience: std::env::var("JWT_AUDIENCE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            leeway_seconds: std::env::var("JWT_LEEWAY_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            host,
            port,
            backend,
            supabase,
            jwt,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration used by `AppState::fake()` and local experiments.
    pub fn for_memory(secret: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            backend: BackendKind::Memory,
            supabase: None,
            jwt: JwtConfig {
                secret: secret.into(),
                audience: None,
                leeway_seconds: 0,
                ttl_minutes: 5,
            },
        }
    }
}
