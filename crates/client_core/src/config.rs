use std::{collections::HashMap, fs, path::Path};

use alloy_primitives::U256;
use shared::{domain::Address, units::DEFAULT_SCALING_FACTOR};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    pub contract_address: Address,
    pub scaling_factor: u128,
    pub token_symbol: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::new(""),
            scaling_factor: DEFAULT_SCALING_FACTOR,
            token_symbol: "BM".into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("contract address is not configured")]
    MissingContractAddress,
    #[error("scaling factor must be greater than zero")]
    ZeroScalingFactor,
    #[error("invalid scaling factor '{0}'")]
    InvalidScalingFactor(String),
    #[error("cannot read settings file {path}: {reason}")]
    UnreadableFile { path: String, reason: String },
    #[error("settings file is not valid TOML: {0}")]
    InvalidFile(String),
}

impl MintConfig {
    pub fn new(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: Address::new(contract_address),
            ..Self::default()
        }
    }

    pub fn scaling_factor(&self) -> U256 {
        U256::from(self.scaling_factor)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_address.is_blank() {
            return Err(ConfigError::MissingContractAddress);
        }
        if self.scaling_factor == 0 {
            return Err(ConfigError::ZeroScalingFactor);
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "contract_address" => self.contract_address = Address::new(value.trim()),
            "scaling_factor" => {
                self.scaling_factor = value
                    .trim()
                    .parse::<u128>()
                    .map_err(|_| ConfigError::InvalidScalingFactor(value.to_string()))?;
            }
            "token_symbol" => self.token_symbol = value.trim().to_string(),
            _ => {}
        }
        Ok(())
    }
}

/// Defaults, then the optional TOML file, then environment overrides.
/// A file that was asked for but cannot be read or parsed is an error.
/// Callers run [`MintConfig::validate`] once their own overrides are applied.
pub fn load_settings(path: Option<&Path>) -> Result<MintConfig, ConfigError> {
    let mut settings = MintConfig::default();

    if let Some(path) = path {
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::UnreadableFile {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        apply_toml(&mut settings, &raw)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_toml(settings: &mut MintConfig, raw: &str) -> Result<(), ConfigError> {
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(raw)
        .map_err(|err| ConfigError::InvalidFile(err.message().to_string()))?;
    for (key, value) in file_cfg {
        let value = match value {
            toml::Value::String(text) => text,
            toml::Value::Integer(number) => number.to_string(),
            other => other.to_string(),
        };
        settings.apply(&key, &value)?;
    }
    Ok(())
}

fn apply_env(
    settings: &mut MintConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("TOKEN_CONTRACT_ADDRESS") {
        settings.apply("contract_address", &v)?;
    }
    if let Some(v) = lookup("APP__CONTRACT_ADDRESS") {
        settings.apply("contract_address", &v)?;
    }
    if let Some(v) = lookup("APP__SCALING_FACTOR") {
        settings.apply("scaling_factor", &v)?;
    }
    if let Some(v) = lookup("APP__TOKEN_SYMBOL") {
        settings.apply("token_symbol", &v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn toml_file_overrides_defaults() {
        let mut settings = MintConfig::default();
        apply_toml(
            &mut settings,
            r#"
contract_address = "0xToken"
scaling_factor = 1000000
token_symbol = "TK"
"#,
        )
        .expect("apply toml");
        assert_eq!(settings.contract_address, Address::from("0xToken"));
        assert_eq!(settings.scaling_factor, 1_000_000);
        assert_eq!(settings.token_symbol, "TK");
    }

    #[test]
    fn scaling_factor_above_i64_is_accepted_as_string() {
        let mut settings = MintConfig::default();
        apply_toml(&mut settings, r#"scaling_factor = "100000000000000000000000""#)
            .expect("apply toml");
        assert_eq!(settings.scaling_factor, 100_000_000_000_000_000_000_000);
    }

    #[test]
    fn app_prefixed_env_wins_over_legacy_name() {
        let mut settings = MintConfig::default();
        apply_env(&mut settings, |key| match key {
            "TOKEN_CONTRACT_ADDRESS" => Some("0xLegacy".into()),
            "APP__CONTRACT_ADDRESS" => Some("0xApp".into()),
            "APP__TOKEN_SYMBOL" => Some("XYZ".into()),
            _ => None,
        })
        .expect("apply env");
        assert_eq!(settings.contract_address, Address::from("0xApp"));
        assert_eq!(settings.token_symbol, "XYZ");
        assert_eq!(settings.scaling_factor, DEFAULT_SCALING_FACTOR);
    }

    #[test]
    fn bad_scaling_factor_is_reported() {
        let mut settings = MintConfig::default();
        let err = apply_env(&mut settings, |key| {
            (key == "APP__SCALING_FACTOR").then(|| "ten".to_string())
        })
        .expect_err("should fail");
        assert_eq!(err, ConfigError::InvalidScalingFactor("ten".into()));
    }

    #[test]
    fn validate_requires_address_and_positive_factor() {
        assert_eq!(
            MintConfig::default().validate(),
            Err(ConfigError::MissingContractAddress)
        );
        let mut settings = MintConfig::new("0xToken");
        assert_eq!(settings.validate(), Ok(()));
        settings.scaling_factor = 0;
        assert_eq!(settings.validate(), Err(ConfigError::ZeroScalingFactor));
    }

    #[test]
    fn load_settings_reads_file_from_disk() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("mint_console_settings_{suffix}.toml"));
        fs::write(&path, "contract_address = \"0xFromFile\"\n").expect("write settings");

        let settings = load_settings(Some(&path));
        fs::remove_file(&path).expect("cleanup");

        // Environment may legitimately override the address on a dev machine.
        if env::var("APP__CONTRACT_ADDRESS").is_err() && env::var("TOKEN_CONTRACT_ADDRESS").is_err()
        {
            assert_eq!(
                settings.expect("settings").contract_address,
                Address::from("0xFromFile")
            );
        }
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut settings = MintConfig::default();
        let err = apply_toml(&mut settings, "contract_address = ").expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidFile(_)));
        assert_eq!(settings, MintConfig::default());
    }

    #[test]
    fn missing_settings_file_is_reported() {
        let path = env::temp_dir().join("mint_console_settings_that_does_not_exist.toml");
        let err = load_settings(Some(&path)).expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::UnreadableFile { path: reported, .. } if reported == path.display().to_string()
        ));
    }

    #[test]
    fn no_settings_file_means_defaults_plus_env() {
        let settings = load_settings(None).expect("settings");
        if env::var("APP__TOKEN_SYMBOL").is_err() {
            assert_eq!(settings.token_symbol, "BM");
        }
    }
}
