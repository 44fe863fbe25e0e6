use std::fmt;

use crate::error::{Error, Result};

pub const DEFAULT_REQUEST_SUFFIX: &str = "__Request";
pub const DEFAULT_RESPONSE_SUFFIX: &str = "__Response";

/// Plugin options, passed by protoc as `--typescript-http_opt=key=value,...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub verbose: bool,
    pub request_type_suffix: String,
    pub response_type_suffix: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: false,
            request_type_suffix: DEFAULT_REQUEST_SUFFIX.to_string(),
            response_type_suffix: DEFAULT_RESPONSE_SUFFIX.to_string(),
        }
    }
}

impl Options {
    ///
    /// Parses a parameter string such as `verbose,requestTypeSuffix=In`.
    ///
    /// A key without a value means `true`; `verbose` is off for any value other than `true`.
    /// Unknown keys and empty suffixes are rejected.
    ///
    pub fn parse(parameter: Option<&str>) -> Result<Self> {
        let mut options = Self::default();
        let Some(parameter) = parameter else {
            return Ok(options);
        };

        for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, "true"));
            match key.trim() {
                "verbose" => options.verbose = value.trim() == "true",
                "requestTypeSuffix" => options.request_type_suffix = non_empty(key, value)?,
                "responseTypeSuffix" => options.response_type_suffix = non_empty(key, value)?,
                other => return Err(Error::Options(format!("unknown option `{other}`"))),
            }
        }
        Ok(options)
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Options(format!("`{key}` cannot be empty")));
    }
    Ok(value.to_string())
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verbose={},requestTypeSuffix={},responseTypeSuffix={}",
            self.verbose, self.request_type_suffix, self.response_type_suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_parameter() {
        assert_eq!(Options::parse(None).unwrap(), Options::default());
        assert_eq!(Options::parse(Some("")).unwrap(), Options::default());
    }

    #[test]
    fn parses_all_keys() {
        let options =
            Options::parse(Some("verbose, requestTypeSuffix=Input,responseTypeSuffix=Output"))
                .unwrap();
        assert_eq!(
            options,
            Options {
                verbose: true,
                request_type_suffix: "Input".to_string(),
                response_type_suffix: "Output".to_string(),
            }
        );
        assert_eq!(
            options.to_string(),
            "verbose=true,requestTypeSuffix=Input,responseTypeSuffix=Output"
        );
    }

    #[test]
    fn rejects_bad_parameters() {
        for parameter in ["requestTypeSuffix=", "colour=blue"] {
            assert!(
                matches!(Options::parse(Some(parameter)), Err(Error::Options(_))),
                "{parameter}"
            );
        }
    }

    #[test]
    fn verbose_is_only_on_for_true() {
        for (parameter, verbose) in [
            ("verbose", true),
            ("verbose=true", true),
            ("verbose=false", false),
            ("verbose=yes", false),
            ("verbose=1", false),
        ] {
            assert_eq!(Options::parse(Some(parameter)).unwrap().verbose, verbose, "{parameter}");
        }
    }
}
