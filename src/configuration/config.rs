#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

pub const DEFAULT_API_BASE: &str = "https://a2sv-companion-backend.onrender.com";

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiBase,
    ConfigFile,
    PollAttempts,
    PollInterval,
    StorageFile,
}

impl ConfigKey {
    fn is_numeric(&self) -> bool {
        return matches!(self, ConfigKey::PollAttempts | ConfigKey::PollInterval);
    }
}

fn app_dir(base: Option<path::PathBuf>) -> path::PathBuf {
    return base
        .or_else(dirs::cache_dir)
        .unwrap_or_else(env::temp_dir)
        .join("solvetrack");
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    /// Reads a numeric key, falling back to its default when unset.
    pub fn get_u64(key: ConfigKey) -> Result<u64> {
        let mut val = Config::get(key);
        if val.is_empty() {
            val = Config::default(key);
        }

        return Config::parse_number(key, &val);
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        return match key {
            ConfigKey::ApiBase => DEFAULT_API_BASE.to_string(),
            ConfigKey::PollAttempts => "20".to_string(),
            ConfigKey::PollInterval => "2000".to_string(),

            // Special
            ConfigKey::ConfigFile => app_dir(dirs::config_dir())
                .join("config.toml")
                .to_string_lossy()
                .to_string(),
            ConfigKey::StorageFile => app_dir(dirs::data_dir())
                .join("storage.json")
                .to_string_lossy()
                .to_string(),
        };
    }

    fn parse_number(key: ConfigKey, val: &str) -> Result<u64> {
        return match val.trim().parse::<u64>() {
            Ok(num) if num > 0 => Ok(num),
            _ => bail!(format!(
                "Invalid value for '{key}': {val}. Expected a positive integer."
            )),
        };
    }

    /// Values set in a TOML config document, validated per key.
    pub fn parse_document(toml_str: &str) -> Result<Vec<(ConfigKey, String)>> {
        let doc = toml_str.parse::<toml_edit::Document>()?;
        let mut res = vec![];

        for key in ConfigKey::iter() {
            if key == ConfigKey::ConfigFile {
                continue;
            }

            let val = match doc.get(&key.to_string()) {
                Some(val) => val,
                None => continue,
            };

            if let Some(val_int) = val.as_integer() {
                if !key.is_numeric() {
                    bail!(format!(
                        "config.toml has an invalid value for key '{key}': {val_int}"
                    ));
                }
                Config::parse_number(key, &val_int.to_string())?;
                res.push((key, val_int.to_string()));
            } else if let Some(val_str) = val.as_str() {
                if val_str.is_empty() {
                    continue;
                }
                if key.is_numeric() {
                    Config::parse_number(key, val_str)?;
                }
                res.push((key, val_str.to_string()));
            } else {
                bail!(format!("config.toml has an invalid value for key '{key}'"));
            }
        }

        return Ok(res);
    }

    pub async fn load(clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }
        Config::set(ConfigKey::ConfigFile, &config_file);

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            for (key, val) in Config::parse_document(&toml_str)? {
                Config::set(key, &val);
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    if key.is_numeric() {
                        Config::parse_number(key, val)?;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            api_base = Config::get(ConfigKey::ApiBase),
            config_file = Config::get(ConfigKey::ConfigFile),
            poll_attempts = Config::get(ConfigKey::PollAttempts),
            poll_interval = Config::get(ConfigKey::PollInterval),
            storage_file = Config::get(ConfigKey::StorageFile),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let description = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))
                    .and_then(|e| return e.get_help())
                    .map(|e| {
                        return e
                            .to_string()
                            .split("[default:")
                            .next()
                            .unwrap_or_default()
                            .trim()
                            .to_string();
                    })
                    .unwrap_or_default();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if key.is_numeric() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
