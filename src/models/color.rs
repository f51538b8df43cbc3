use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Color {
    pub id: i64,
    pub hex_code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewColor {
    pub hex_code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateColorRequest {
    #[serde(default)]
    pub hex_code: String,
    #[serde(default)]
    pub name: String,
}

impl CreateColorRequest {
    pub fn validate(&self) -> AppResult<NewColor> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name must not be null"));
        }
        Ok(NewColor {
            hex_code: normalize_hex(&self.hex_code)?,
            name: self.name.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateColorRequest {
    pub hex_code: Option<String>,
    pub name: Option<String>,
}

impl UpdateColorRequest {
    /// Merge onto the stored color.
    pub fn apply(&self, current: &Color) -> AppResult<NewColor> {
        let hex_code = match &self.hex_code {
            Some(h) => normalize_hex(h)?,
            None => current.hex_code.clone(),
        };
        let name = match &self.name {
            Some(n) if n.trim().is_empty() => {
                return Err(AppError::validation("name must not be empty"))
            }
            Some(n) => n.trim().to_string(),
            None => current.name.clone(),
        };
        Ok(NewColor { hex_code, name })
    }
}

#[derive(Debug, Deserialize)]
pub struct HexCodeQuery {
    pub hex_code: String,
}

/// Accepts `#rrggbb` or `rrggbb` in any case; stores `#rrggbb` lower-case.
pub fn normalize_hex(raw: &str) -> AppResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation("hex_code must not be null"));
    }
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation(format!(
            "hex_code '{raw}' must look like #rrggbb"
        )));
    }
    Ok(format!("#{}", digits.to_ascii_lowercase()))
}
