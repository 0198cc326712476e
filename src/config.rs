use anyhow::{bail, Result};
use std::env;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 500;

/// Settings for the stateless chat variant, read once at startup.
#[derive(Debug, Clone)]
pub struct ChatServerConfig {
    pub port: u16,
    pub allowed_origin: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: parsed_or("PORT", DEFAULT_PORT),
            allowed_origin: string_or("ALLOWED_ORIGIN", "*"),
            api_key: required("OPENAI_API_KEY")?,
            base_url: string_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: string_or("OPENAI_MODEL", DEFAULT_MODEL),
            temperature: parsed_or("TEMPERATURE", DEFAULT_TEMPERATURE),
            max_tokens: parsed_or("MAX_TOKENS", DEFAULT_MAX_TOKENS),
        })
    }
}

/// Settings for the thread-based assistant variant.
///
/// `assistant_id` is the one legitimately optional value: the server starts
/// without it (the health route reports its absence) but `/api/chat` refuses
/// to run until it is set.
#[derive(Debug, Clone)]
pub struct AssistantServerConfig {
    pub port: u16,
    pub allowed_origin: String,
    pub api_key: String,
    pub base_url: String,
    pub assistant_id: Option<String>,
}

impl AssistantServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: parsed_or("PORT", DEFAULT_PORT),
            allowed_origin: string_or("ALLOWED_ORIGIN", "*"),
            api_key: required("OPENAI_API_KEY")?,
            base_url: string_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            assistant_id: optional("OPENAI_ASSISTANT_ID"),
        })
    }
}

fn required(name: &str) -> Result<String> {
    match optional(name) {
        Some(value) => Ok(value),
        None => bail!("{name} must be set"),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn string_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
