use std::env;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub server_port: u16,
    /// Offset used to turn instants into the wall-clock time of practitioner schedules.
    pub clinic_utc_offset: FixedOffset,
    pub frontend_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_backend: match env::var("STORAGE_BACKEND").as_deref() {
                Ok("supabase") => StorageBackend::Supabase,
                Ok("memory") | Err(_) => StorageBackend::Memory,
                Ok(other) => {
                    warn!("Unknown STORAGE_BACKEND '{}', using in-memory storage", other);
                    StorageBackend::Memory
                }
            },
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SERVER_PORT not set or invalid, using default 5000");
                    5000
                }),
            clinic_utc_offset: env::var("CLINIC_UTC_OFFSET")
                .ok()
                .and_then(|offset| parse_utc_offset(&offset))
                .unwrap_or_else(|| {
                    warn!("CLINIC_UTC_OFFSET not set or invalid, using +05:30");
                    default_clinic_offset()
                }),
            frontend_url: env::var("FRONTEND_URL").ok(),
        };

        if config.storage_backend == StorageBackend::Supabase && !config.is_supabase_configured() {
            warn!("Supabase storage selected but SUPABASE_URL / SUPABASE_ANON_PUBLIC_KEY are missing");
        }
        if config.supabase_jwt_secret.is_empty() {
            warn!("Application not fully configured - protected routes will reject every token");
        }

        config
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.storage_backend == StorageBackend::Memory || self.is_supabase_configured())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            storage_backend: StorageBackend::Memory,
            server_port: 5000,
            clinic_utc_offset: default_clinic_offset(),
            frontend_url: None,
        }
    }
}

fn default_clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix())
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
