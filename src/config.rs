/**
 * Application Configuration
 * Environment-driven settings for the server and its collaborators
 */
use std::str::FromStr;
use thiserror::Error;

/// Secret used when JWT_SECRET is unset. Refused in production.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a secure, unique value in production")]
    InsecureJwtSecret,

    #[error("Invalid HOST/PORT configuration: {0}")]
    InvalidBindAddress(String),
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_email: Option<String>,
    pub frontend_url: String,
    pub allowed_origins: Vec<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub email: Option<EmailConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_email: None,
            frontend_url: "http://localhost:3000".to_string(),
            allowed_origins: Vec::new(),
            cloudinary: None,
            email: None,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl AppConfig {
    /// Read configuration from the process environment.
    /// Collaborators whose credentials are incomplete are left unset so the
    /// development fallbacks take over.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cloudinary = match (
            env_opt("CLOUDINARY_CLOUD_NAME"),
            env_opt("CLOUDINARY_API_KEY"),
            env_opt("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let email = match (env_opt("EMAIL_API_URL"), env_opt("EMAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(EmailConfig {
                api_url,
                api_key,
                from: env_opt("EMAIL_FROM")
                    .unwrap_or_else(|| "Portfolio Builder <no-reply@localhost>".to_string()),
            }),
            _ => None,
        };

        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            environment: env_opt("ENVIRONMENT").unwrap_or(defaults.environment),
            host: env_opt("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port),
            jwt_secret: env_opt("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            admin_email: env_opt("ADMIN_EMAIL").map(|e| e.to_lowercase()),
            frontend_url: env_opt("FRONTEND_URL")
                .or_else(|| env_opt("FRONTEND_ORIGIN"))
                .unwrap_or(defaults.frontend_url),
            allowed_origins,
            cloudinary,
            email,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse insecure settings in production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production()
            && (self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET)
        {
            return Err(ConfigError::InsecureJwtSecret);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<std::net::SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidBindAddress(addr))
    }

    /// Whether an email address should be granted the admin role on registration.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .map(|admin| admin.eq_ignore_ascii_case(email))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_in_development() {
        let config = AppConfig::default();
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let config = AppConfig {
            environment: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InsecureJwtSecret)
        ));
    }

    #[test]
    fn test_bind_address_parses() {
        let config = AppConfig::default();
        let addr = config.bind_address().unwrap();
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_admin_email_is_case_insensitive() {
        let config = AppConfig {
            admin_email: Some("owner@example.com".to_string()),
            ..AppConfig::default()
        };
        assert!(config.is_admin_email("Owner@Example.com"));
        assert!(!config.is_admin_email("someone@example.com"));
    }
}
