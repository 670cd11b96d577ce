use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    /// Absent disables the Redis-backed exercise/idempotency caches.
    pub redis_uri: Option<String>,
    /// Absent disables the speech capabilities; speaking and audio dictation
    /// then answer with 503.
    pub speech_api_url: Option<String>,
    /// Locale applied when a request does not name one.
    pub default_locale: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| {
                eprintln!("WARNING: MONGO_URI not set, using localhost");
                "mongodb://localhost:27017".to_string()
            });

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "tilmaster".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .ok();

        let speech_api_url = settings
            .get_string("speech.url")
            .or_else(|_| env::var("SPEECH_API_URL"))
            .ok();

        let default_locale = settings
            .get_string("locale.default")
            .or_else(|_| env::var("DEFAULT_LOCALE"))
            .unwrap_or_else(|_| "uz".to_string());

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            speech_api_url,
            default_locale,
        })
    }

    /// Config for embedded/in-memory deployments and the test harness.
    pub fn standalone() -> Self {
        Config {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "tilmaster".to_string(),
            redis_uri: None,
            speech_api_url: None,
            default_locale: "uz".to_string(),
        }
    }
}
