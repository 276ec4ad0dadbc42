//! # ⚛️ qfab-quantum — Estados Quânticos dos Itens
//!
//! Aritmética complexa, álgebra linear e o [`QuantumSystem`]: um vetor de
//! amplitudes por grupo de itens emaranhados, com aplicação de gates em
//! qualquer offset, merge por produto tensorial, medição e colapso.
//!
//! ## Computational Complexity
//!
//! **Gate application — O(4^n):**
//! - n = qubits no sistema
//! - O operador completo é montado por produto de Kronecker e aplicado densamente
//!
//! **Merge — O(2^(a+b)):**
//! - Produto tensorial dos dois vetores
//!
//! **Measure / excitation — O(2^n):**
//! - Uma passada sobre o vetor
//!
//! **Scalability:**
//! - Small systems (n ≤ 4): ✓ Excellent
//! - Medium systems (n ≤ 8): △ Good
//! - Larger: fora de escopo (o jogo mantém poucos qubits por grupo)
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          QuantumSystem                          │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Amplitude Vector (2^n)                   │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Gate Padding  I ⊗ G ⊗ I                  │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Born Sampling + Collapse                 │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```
//! use qfab_quantum::{Hadamard, QuantumGate, QuantumSystem, SystemId};
//!
//! let mut sys = QuantumSystem::new(SystemId(1));
//! sys.apply_gate(&Hadamard.matrix(), 0).unwrap();
//! assert!((sys.excitation_probability() - 0.5).abs() < 1e-12);
//! ```

pub mod circuit;
pub mod complex;
pub mod error;
pub mod gates;
pub mod linalg;
pub mod system;

pub use circuit::{ArcadeBackend, Circuit, CircuitBackend, CircuitGate, RunResult};
pub use complex::Complex;
pub use error::{QuantumError, QuantumResult};
pub use gates::{
    cnot, controlled, Hadamard, PauliX, PauliY, PauliZ, Phase, QuantumGate, RotationX, RotationY,
    RotationZ, SGate, TGate,
};
pub use linalg::{Amplitude, Matrix, Vector};
pub use system::{QuantumSystem, SystemId};
