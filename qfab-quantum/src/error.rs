//! Tipos de erro para qfab-quantum

use thiserror::Error;

/// Resultado customizado para operações quânticas
pub type QuantumResult<T> = Result<T, QuantumError>;

/// Erros que podem ocorrer em operações quânticas
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantumError {
    #[error("Dimension mismatch: matrix is {matrix}x{matrix}, vector has {vector} entries")]
    DimensionMismatch { matrix: usize, vector: usize },

    #[error("Gate size {0} is not a power of two")]
    InvalidGateSize(usize),

    #[error("Matrix is not square: row {row} has {len} entries, expected {expected}")]
    RaggedMatrix { row: usize, len: usize, expected: usize },

    #[error("Qubit {qubit} (+{width}) out of range for a {qubits}-qubit system")]
    QubitOutOfRange { qubit: usize, width: usize, qubits: usize },

    #[error("Basis index {index} out of range for vector of length {len}")]
    BasisOutOfRange { index: usize, len: usize },

    #[error("Unknown amplitude token: {0:?}")]
    UnknownToken(String),

    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),
}
