use crate::utils::error::{AnalyzerError, Result};
use std::fmt::Display;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> AnalyzerError {
    AnalyzerError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Endpoint for the chat API: http(s) with a host.
pub fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("Invalid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            value,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if !url.has_host() {
        return Err(invalid(field, value, "URL has no host"));
    }
    Ok(())
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    match path {
        "" => Err(invalid(field, path, "Path cannot be empty")),
        p if p.contains('\0') => Err(invalid(field, path, "Path contains null bytes")),
        _ => Ok(()),
    }
}

/// Extension check, case-insensitive: `DATOS.CSV` passes for `csv`.
pub fn validate_file_extension(field: &str, file: &str, allowed: &[&str]) -> Result<()> {
    let extension = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| invalid(field, file, "File has no extension"))?;

    if allowed.iter().any(|a| a.eq_ignore_ascii_case(extension)) {
        Ok(())
    } else {
        Err(invalid(
            field,
            file,
            format!("Expected a .{} file, got .{}", allowed.join("/."), extension),
        ))
    }
}

pub fn validate_non_empty_string(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be blank"));
    }
    Ok(())
}

pub fn validate_min<T: PartialOrd + Display>(field: &str, value: T, min: T) -> Result<()> {
    if value < min {
        return Err(invalid(field, &value, format!("Value must be at least {}", min)));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field,
            &value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}
