// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, fmt::Display, str::FromStr};

use crate::configuration::supported_configurations::SupportedConfigurations;

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceOrigin {
    Default,
    EnvVar,
    Code,
}

#[derive(Debug, PartialEq)]
pub(crate) struct ConfigKey<T> {
    pub(crate) value: T,
    #[allow(unused)]
    pub(crate) origin: ConfigSourceOrigin,
}

/// Compose multiple sources of configuration together.
///
/// The higher precedence sources are the first ones in the list.
pub(crate) struct CompositeSource {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl CompositeSource {
    pub fn add_source<C: ConfigurationSource + 'static>(&mut self, source: C) {
        self.sources.push(Box::new(source));
    }

    pub fn new() -> Self {
        CompositeSource {
            sources: Vec::new(),
        }
    }

    pub fn default_sources() -> Self {
        let mut sources = Self::new();
        sources.add_source(EnvSource);
        sources
    }
}

#[allow(unused)]
#[derive(Debug, PartialEq)]
pub(crate) struct CompositeParseError {
    desired_type: &'static str,
    error: Cow<'static, str>,
    value: String,
    origin: ConfigSourceOrigin,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CompositeConfigSourceResult<T> {
    #[allow(unused)]
    pub name: SupportedConfigurations,
    pub value: Option<ConfigKey<T>>,
    pub errors: Vec<CompositeParseError>,
}

impl CompositeSource {
    pub fn get(&self, key: SupportedConfigurations) -> CompositeConfigSourceResult<String> {
        self.get_parse(key)
    }

    /// Get a value from the configuration sources
    ///
    /// This method will iterate over sources in order of precedence
    /// and return the first valid value found. If no value is found, it will return None.
    ///
    /// It will return all parsing errors encountered before finding a valid value, and associate
    /// them with the source they came from.
    pub fn get_parse<T: FromStr<Err = impl Display>>(
        &self,
        name: SupportedConfigurations,
    ) -> CompositeConfigSourceResult<T> {
        let mut errors = Vec::new();
        for s in &self.sources {
            match s.get(name.as_str()).and_then(|value| {
                value
                    .parse::<T>()
                    .map_err(|e| ConfigSourceError::FailedParsing {
                        desired_type: std::any::type_name::<T>(),
                        error: Cow::Owned(e.to_string()),
                        value,
                    })
            }) {
                Ok(v) => {
                    return CompositeConfigSourceResult {
                        name,
                        value: Some(ConfigKey {
                            value: v,
                            origin: s.origin(),
                        }),
                        errors,
                    };
                }
                Err(ConfigSourceError::Missing) => continue,
                Err(ConfigSourceError::FailedParsing {
                    error,
                    value,
                    desired_type,
                }) => {
                    errors.push(CompositeParseError {
                        desired_type,
                        error,
                        value,
                        origin: s.origin(),
                    });
                }
            }
        }
        CompositeConfigSourceResult {
            name,
            value: None,
            errors,
        }
    }
}

pub(crate) enum ConfigSourceError {
    Missing,
    FailedParsing {
        desired_type: &'static str,
        error: Cow<'static, str>,
        // String representation of the value we failed to parse
        value: String,
    },
}

type ConfigSourceResult<T> = Result<T, ConfigSourceError>;

/// Represent a source of configuration
pub(crate) trait ConfigurationSource {
    fn origin(&self) -> ConfigSourceOrigin;

    fn get(&self, key: &'static str) -> ConfigSourceResult<String>;
}

pub(crate) struct EnvSource;

impl ConfigurationSource for EnvSource {
    fn origin(&self) -> ConfigSourceOrigin {
        ConfigSourceOrigin::EnvVar
    }

    fn get(&self, key: &'static str) -> ConfigSourceResult<String> {
        std::env::var(key).map_err(|_| ConfigSourceError::Missing)
    }
}

#[allow(unused)]
/// A source of configuration that is backed by a HashMap
/// This is used only for testing purposes
pub(crate) struct HashMapSource {
    map: std::collections::HashMap<String, String>,
    origin: ConfigSourceOrigin,
}

impl HashMapSource {
    #[allow(unused)]
    /// This is used only for testing purposes
    pub(crate) fn from_iter<U: ToString, V: ToString, T: IntoIterator<Item = (U, V)>>(
        map: T,
        origin: ConfigSourceOrigin,
    ) -> Self {
        HashMapSource {
            map: map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            origin,
        }
    }
}

impl ConfigurationSource for HashMapSource {
    fn origin(&self) -> ConfigSourceOrigin {
        self.origin
    }

    fn get(&self, key: &'static str) -> ConfigSourceResult<String> {
        self.map.get(key).cloned().ok_or(ConfigSourceError::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositeConfigSourceResult, CompositeSource, ConfigSourceOrigin, HashMapSource};
    use crate::configuration::sources::ConfigKey;
    use crate::configuration::supported_configurations::SupportedConfigurations;

    #[test]
    fn test_composite_source_single_origin() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [
                ("LUMIGO_TRACER_TOKEN", "t_f8f7b905da964eef89261"),
                ("LUMIGO_ENDPOINT", "http://localhost:4318"),
            ],
            ConfigSourceOrigin::EnvVar,
        ));

        for (key, expected) in [
            (
                SupportedConfigurations::LUMIGO_TRACER_TOKEN,
                CompositeConfigSourceResult {
                    name: SupportedConfigurations::LUMIGO_TRACER_TOKEN,
                    value: Some(ConfigKey {
                        value: "t_f8f7b905da964eef89261".to_string(),
                        origin: ConfigSourceOrigin::EnvVar,
                    }),
                    errors: vec![],
                },
            ),
            (
                SupportedConfigurations::LUMIGO_ENDPOINT,
                CompositeConfigSourceResult {
                    name: SupportedConfigurations::LUMIGO_ENDPOINT,
                    value: Some(ConfigKey {
                        value: "http://localhost:4318".to_string(),
                        origin: ConfigSourceOrigin::EnvVar,
                    }),
                    errors: vec![],
                },
            ),
            (
                SupportedConfigurations::LUMIGO_LOGS_ENDPOINT,
                CompositeConfigSourceResult {
                    name: SupportedConfigurations::LUMIGO_LOGS_ENDPOINT,
                    value: None,
                    errors: vec![],
                },
            ),
        ] {
            let result = source.get(key);
            assert_eq!(result, expected, "Failed for key: {:?}", key.as_str());
        }
    }

    #[test]
    fn test_composite_priority_order() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [("LUMIGO_ENDPOINT", "http://from-env:4318")],
            ConfigSourceOrigin::EnvVar,
        ));
        source.add_source(HashMapSource::from_iter(
            [("LUMIGO_ENDPOINT", "http://from-default:4318")],
            ConfigSourceOrigin::Default,
        ));

        let result = source.get(SupportedConfigurations::LUMIGO_ENDPOINT);
        assert_eq!(
            result,
            CompositeConfigSourceResult {
                name: SupportedConfigurations::LUMIGO_ENDPOINT,
                value: Some(ConfigKey {
                    value: "http://from-env:4318".to_string(),
                    origin: ConfigSourceOrigin::EnvVar,
                }),
                errors: vec![],
            }
        );
    }

    #[test]
    fn test_composite_parse_error_collection() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [("LUMIGO_CONNECTION_TIMEOUT", "not-a-float")],
            ConfigSourceOrigin::Code,
        ));
        source.add_source(HashMapSource::from_iter(
            [("LUMIGO_CONNECTION_TIMEOUT", "2.5")],
            ConfigSourceOrigin::EnvVar,
        ));

        let result: CompositeConfigSourceResult<f64> =
            source.get_parse(SupportedConfigurations::LUMIGO_CONNECTION_TIMEOUT);
        let value = result.value.expect("value should fall through to env var");
        assert_eq!(value.value, 2.5);
        assert_eq!(value.origin, ConfigSourceOrigin::EnvVar);
        assert_eq!(result.errors.len(), 1);
    }
}
