//! Tipos de erro para qfab-factory

use qfab_quantum::{QuantumError, SystemId};
use thiserror::Error;

use crate::items::ItemId;

/// Resultado customizado para operações da fábrica
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Erros do grid e do registro de itens
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Unknown quantum system: {0}")]
    UnknownSystem(SystemId),

    #[error("Invalid cell {0:?}: expected \"x,y\"")]
    InvalidCell(String),

    #[error("Quantum error: {0}")]
    Quantum(#[from] QuantumError),
}
