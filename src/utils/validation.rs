use crate::utils::error::{ClearportError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ClearportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ClearportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// A bare file name: no directory separators, no parent references.
pub fn validate_file_name(field_name: &str, name: &str) -> Result<()> {
    validate_non_empty_string(field_name, name)?;
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ClearportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Expected a plain file name".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        if let Some(extension) = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            if !allowed_set.contains(extension) {
                return Err(ClearportError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
        } else {
            return Err(ClearportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: file.clone(),
                reason: "File has no extension or invalid filename".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_one_of(field_name: &str, values: &[String], allowed: &[&str]) -> Result<()> {
    for value in values {
        if !allowed.contains(&value.as_str()) {
            return Err(ClearportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.clone(),
                reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
            });
        }
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClearportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ClearportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output.output_path", "./etc/portage").is_ok());
        assert!(validate_path("output.output_path", "").is_err());
        assert!(validate_path("output.output_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("source.options_file", "options.conf").is_ok());
        assert!(validate_file_name("source.options_file", "sub/options.conf").is_err());
        assert!(validate_file_name("source.options_file", "..").is_err());
        assert!(validate_file_name("source.options_file", "  ").is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["pkg_mapping.json".to_string()];
        assert!(validate_file_extensions("source.mapping_file", &files, &["json"]).is_ok());

        let invalid_files = vec!["pkg_mapping.txt".to_string()];
        assert!(validate_file_extensions("source.mapping_file", &invalid_files, &["json"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("source.min_confidence", 0.5, 0.0, 1.0).is_ok());
        assert!(validate_range("source.min_confidence", 1.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        let formats = vec!["json".to_string(), "csv".to_string()];
        assert!(validate_one_of("output.report_formats", &formats, &["json", "csv"]).is_ok());
        let bad = vec!["xml".to_string()];
        assert!(validate_one_of("output.report_formats", &bad, &["json", "csv"]).is_err());
    }
}
