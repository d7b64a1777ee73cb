use super::Config;
use crate::error::Error;
use anyhow::Result;
use std::collections::HashSet;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    // Validate the account request
    for (field, value) in [
        ("appId", &config.request.app_id),
        ("safe", &config.request.safe),
        ("object", &config.request.object),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigValidationError {
                path: format!("request.{field}"),
                message: "Value is required".to_string(),
            });
        }
    }

    if errors.is_empty() {
        if let Err(Error::InvalidArgument { field, reason }) = config.request.validate() {
            errors.push(ConfigValidationError {
                path: format!("request.{field}"),
                message: reason,
            });
        }
    }

    // Validate requested attributes
    if config.attributes.is_empty() {
        errors.push(ConfigValidationError {
            path: "attributes".to_string(),
            message: "At least one attribute is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (idx, name) in config.attributes.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(ConfigValidationError {
                path: format!("attributes[{idx}]"),
                message: "Attribute name must not be empty".to_string(),
            });
        } else if name.contains('\0') {
            errors.push(ConfigValidationError {
                path: format!("attributes[{idx}]"),
                message: "Attribute name contains a NUL byte".to_string(),
            });
        } else if !seen.insert(name.as_str()) {
            warn!("Attribute '{name}' is requested more than once");
        }
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RequestParameters;

    fn valid() -> Config {
        Config {
            request: RequestParameters::new("IntegrationHost", "Apps", "host"),
            attributes: vec!["Password".into()],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&valid()).is_empty());
        assert!(validate_config_object(&valid()).is_ok());
    }

    #[test]
    fn default_config_lists_missing_fields() {
        let paths: Vec<String> = validate_config(&Config::default())
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["request.appId", "request.safe", "request.object"]);
    }

    #[test]
    fn query_separators_are_rejected() {
        let mut config = valid();
        config.request.safe = "Apps;Object=root".into();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "request.safe");
    }

    #[test]
    fn attribute_names_are_checked() {
        let mut config = valid();
        config.attributes = vec!["Password".into(), " ".into(), "Password".into()];
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "attributes[1]");

        config.attributes.clear();
        let err = validate_config_object(&config).unwrap_err();
        assert!(err.to_string().contains("attributes: At least one attribute"));
    }
}
