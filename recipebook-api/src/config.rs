/// Configuration management for the API server
///
/// Configuration comes from environment variables; a `.env` file is loaded
/// first when present (development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for token signing, at least 32 characters (required)
/// - `JWT_TTL_HOURS`: Token lifetime (default: 24)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `PUBLIC_HOST`: Scheme and host used in short links (default: request `Host`)
/// - `PAGE_SIZE`: Default page size for paginated lists (default: 6)
/// - `SHOPPING_LIST_FILENAME`: Download name of the shopping list
/// - `RUST_LOG` / `LOG_FORMAT`: Logging filter and `json` output switch
///
/// # Example
///
/// ```no_run
/// use recipebook_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Default download name of the shopping list
pub const DEFAULT_SHOPPING_LIST_FILENAME: &str = "Список покупок.txt";

/// Upper bound for the `limit` query parameter
pub const MAX_PAGE_SIZE: u32 = 100;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub content: ContentConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,

    /// Base URL for generated links, e.g. `https://recipes.example.com`
    pub public_host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for token signing
    ///
    /// Must be kept secret and at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    pub ttl_hours: i64,
}

/// Presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Default page size
    pub page_size: u32,

    pub shopping_list_filename: String,
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing or a value doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(lookup("API_PORT"), 8080u16, "API_PORT")?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let public_host = lookup("PUBLIC_HOST")
            .map(|host| host.trim().trim_end_matches('/').to_string())
            .filter(|host| !host.is_empty());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(
            lookup("DATABASE_MAX_CONNECTIONS"),
            10u32,
            "DATABASE_MAX_CONNECTIONS",
        )?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let ttl_hours = parse_or(
            lookup("JWT_TTL_HOURS"),
            recipebook_shared::auth::jwt::DEFAULT_TTL_HOURS,
            "JWT_TTL_HOURS",
        )?;
        if ttl_hours < 1 {
            anyhow::bail!("JWT_TTL_HOURS must be at least 1");
        }

        let page_size = parse_or(lookup("PAGE_SIZE"), 6u32, "PAGE_SIZE")?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            anyhow::bail!("PAGE_SIZE must be between 1 and {}", MAX_PAGE_SIZE);
        }

        let shopping_list_filename = lookup("SHOPPING_LIST_FILENAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHOPPING_LIST_FILENAME.to_string());

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production: parse_bool(lookup("PRODUCTION")),
                public_host,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_hours,
            },
            content: ContentConfig {
                page_size,
                shopping_list_filename,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token lifetime
    pub fn jwt_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.ttl_hours)
    }

    /// Configuration suitable for tests; nothing is read from the environment
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
                public_host: None,
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: 2,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                ttl_hours: 1,
            },
            content: ContentConfig {
                page_size: 6,
                shopping_list_filename: DEFAULT_SHOPPING_LIST_FILENAME.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgresql://localhost/recipebook"),
        ("JWT_SECRET", "test-secret-key-at-least-32-bytes-long"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert!(!config.api.production);
        assert_eq!(config.api.public_host, None);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.ttl_hours, 24);
        assert_eq!(config.content.page_size, 6);
        assert_eq!(config.content.shopping_list_filename, "Список покупок.txt");
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
            ("PUBLIC_HOST", "https://recipes.example/"),
            ("PAGE_SIZE", "12"),
            ("JWT_TTL_HOURS", "2"),
        ]);

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.api.production);
        assert_eq!(config.api.public_host.as_deref(), Some("https://recipes.example"));
        assert_eq!(config.content.page_size, 12);
        assert_eq!(config.jwt_ttl(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_missing_required_variables() {
        let err = Config::from_lookup(lookup_from(&[REQUIRED[1]])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = Config::from_lookup(lookup_from(&[REQUIRED[0]])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let vars = [REQUIRED[0], ("JWT_SECRET", "short")];
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("API_PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("API_PORT"));

        let mut vars = REQUIRED.to_vec();
        vars.push(("PAGE_SIZE", "0"));
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = Config::for_tests("postgresql://localhost/test");
        assert_eq!(config.bind_address(), "127.0.0.1:0");
    }
}
