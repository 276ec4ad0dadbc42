//! Configuração da simulação
//!
//! Ordem de precedência: padrões → arquivo TOML → variáveis `QFAB_*`
//! (com `.env` carregado uma única vez) → flags da CLI.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{SimError, SimResult};

// Carrega .env na primeira leitura do ambiente
static DOTENV_INIT: Lazy<()> = Lazy::new(|| {
    let _ = dotenv::dotenv();
});

#[inline]
fn ensure_loaded() {
    let _ = &*DOTENV_INIT;
}

/// Parâmetros da simulação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Passo fixo da simulação (ms)
    pub tick_ms: u64,
    /// Intervalo do timer global de spawn (ms)
    pub spawn_interval_ms: u64,
    /// Velocidade dos itens (células/s)
    pub item_speed: f64,
    /// Distância para considerar um item assentado
    pub settle_epsilon: f64,
    /// Máximo de ticks por avanço de frame; o excesso conta como perdido
    pub max_burst_ticks: u32,
    /// Créditos iniciais do ledger
    pub starting_credits: u64,
    /// Semente do RNG de medição (entropia quando ausente)
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100, // 10 ticks/s
            spawn_interval_ms: 1000,
            item_speed: qfab_factory::DEFAULT_ITEM_SPEED,
            settle_epsilon: qfab_factory::SETTLE_EPSILON,
            max_burst_ticks: 5,
            starting_credits: 100,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Lê configuração de uma string TOML; campos ausentes usam o padrão
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: SimConfig = toml::from_str(content)
            .map_err(|e| SimError::InvalidConfiguration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Lê configuração de um arquivo TOML
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Padrões com overrides do ambiente
    pub fn from_env() -> SimResult<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Aplica `QFAB_*` do ambiente (e do `.env`)
    pub fn apply_env(&mut self) {
        ensure_loaded();
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Aplica overrides a partir de uma função de consulta.
    ///
    /// Valores que não fazem parse são ignorados com um aviso.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn read<T: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring unparsable override");
                    None
                }
            }
        }

        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        if let Some(v) = read(lookup, "QFAB_TICK_MS") {
            self.tick_ms = v;
        }
        if let Some(v) = read(lookup, "QFAB_SPAWN_INTERVAL_MS") {
            self.spawn_interval_ms = v;
        }
        if let Some(v) = read(lookup, "QFAB_ITEM_SPEED") {
            self.item_speed = v;
        }
        if let Some(v) = read(lookup, "QFAB_SETTLE_EPSILON") {
            self.settle_epsilon = v;
        }
        if let Some(v) = read(lookup, "QFAB_MAX_BURST_TICKS") {
            self.max_burst_ticks = v;
        }
        if let Some(v) = read(lookup, "QFAB_STARTING_CREDITS") {
            self.starting_credits = v;
        }
        if let Some(v) = read(lookup, "QFAB_SEED") {
            self.seed = Some(v);
        }
    }

    /// Valida limites dos parâmetros
    pub fn validate(&self) -> SimResult<()> {
        if self.tick_ms == 0 {
            return Err(SimError::InvalidConfiguration("tick_ms must be > 0".into()));
        }
        if self.spawn_interval_ms == 0 {
            return Err(SimError::InvalidConfiguration(
                "spawn_interval_ms must be > 0".into(),
            ));
        }
        if !(self.item_speed.is_finite() && self.item_speed > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "item_speed must be positive, got {}",
                self.item_speed
            )));
        }
        if !(self.settle_epsilon > 0.0 && self.settle_epsilon < 0.5) {
            return Err(SimError::InvalidConfiguration(format!(
                "settle_epsilon must be in (0, 0.5), got {}",
                self.settle_epsilon
            )));
        }
        if self.max_burst_ticks == 0 {
            return Err(SimError::InvalidConfiguration(
                "max_burst_ticks must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick(), Duration::from_millis(100));
        assert_eq!(config.spawn_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str("tick_ms = 50\nseed = 7\n").unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.starting_credits, 100);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        assert!(SimConfig::from_toml_str("tick_ms = 0").is_err());
        assert!(SimConfig::from_toml_str("item_speed = -1.0").is_err());
        assert!(SimConfig::from_toml_str("settle_epsilon = 0.9").is_err());
        assert!(SimConfig::from_toml_str("tick_ms = \"fast\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "spawn_interval_ms = 250").unwrap();
        writeln!(file, "starting_credits = 40").unwrap();
        let config = SimConfig::from_file(file.path()).unwrap();
        assert_eq!(config.spawn_interval_ms, 250);
        assert_eq!(config.starting_credits, 40);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("QFAB_TICK_MS", "20"),
            ("QFAB_SEED", "99"),
            ("QFAB_ITEM_SPEED", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = SimConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.tick_ms, 20);
        assert_eq!(config.seed, Some(99));
        // valor inválido ignorado
        assert_eq!(config.item_speed, qfab_factory::DEFAULT_ITEM_SPEED);
    }
}
