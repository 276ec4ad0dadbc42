//! Erros da simulação

use qfab_factory::{Cell, FactoryError};
use qfab_quantum::QuantumError;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// Erros do mundo de simulação e do carregamento de conteúdo
#[derive(Debug, Error)]
pub enum SimError {
    /// Gate não registrado
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Definição de gate rejeitada na validação
    #[error("Invalid gate definition '{id}': {reason}")]
    InvalidGate { id: String, reason: String },

    /// Build fora do catálogo
    #[error("Unknown build: {0}")]
    UnknownBuild(String),

    /// Build não liberado no nível atual
    #[error("Build '{0}' is not available in this level")]
    BuildUnavailable(String),

    /// Tile travado pelo nível
    #[error("Cell {0} is locked")]
    LockedCell(Cell),

    /// Créditos insuficientes
    #[error("Insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u64, available: u64 },

    /// Configuração inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Documento de nível/gates mal formado
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Quantum error: {0}")]
    Quantum(#[from] QuantumError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Parse(err.to_string())
    }
}
