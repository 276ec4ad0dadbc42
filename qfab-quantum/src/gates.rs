//! # Quantum Gates — Portas padrão das impressoras
//!
//! ## Gates Implementadas
//!
//! - **Single-qubit**: H (Hadamard), X, Y, Z (Pauli), S, T (Phase)
//! - **Rotation**: Rx, Ry, Rz, P
//! - **Two-qubit**: controlled-U com controle em qualquer um dos dois fatores

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::complex::Complex;
use crate::linalg::Matrix;

/// Trait para portas quânticas
pub trait QuantumGate: Send + Sync {
    /// Nome da porta
    fn name(&self) -> &'static str;

    /// Matriz da porta
    fn matrix(&self) -> Matrix;

    /// Verifica se é unitária
    fn is_unitary(&self) -> bool {
        self.matrix().is_unitary(1e-10)
    }
}

fn m2(a: Complex, b: Complex, c: Complex, d: Complex) -> Matrix {
    let mut m = Matrix::zeros(2);
    m.set(0, 0, a);
    m.set(0, 1, b);
    m.set(1, 0, c);
    m.set(1, 1, d);
    m
}

// =============================================================================
// Portas Padrão
// =============================================================================

/// Porta Hadamard: cria superposição
#[derive(Clone, Copy, Debug, Default)]
pub struct Hadamard;

impl QuantumGate for Hadamard {
    fn name(&self) -> &'static str {
        "H"
    }

    fn matrix(&self) -> Matrix {
        let h = Complex::real(FRAC_1_SQRT_2);
        m2(h, h, h, -h)
    }
}

/// Porta Pauli-X (NOT quântico)
#[derive(Clone, Copy, Debug, Default)]
pub struct PauliX;

impl QuantumGate for PauliX {
    fn name(&self) -> &'static str {
        "X"
    }

    fn matrix(&self) -> Matrix {
        m2(Complex::ZERO, Complex::ONE, Complex::ONE, Complex::ZERO)
    }
}

/// Porta Pauli-Y
#[derive(Clone, Copy, Debug, Default)]
pub struct PauliY;

impl QuantumGate for PauliY {
    fn name(&self) -> &'static str {
        "Y"
    }

    fn matrix(&self) -> Matrix {
        m2(Complex::ZERO, -Complex::I, Complex::I, Complex::ZERO)
    }
}

/// Porta Pauli-Z (phase flip)
#[derive(Clone, Copy, Debug, Default)]
pub struct PauliZ;

impl QuantumGate for PauliZ {
    fn name(&self) -> &'static str {
        "Z"
    }

    fn matrix(&self) -> Matrix {
        m2(Complex::ONE, Complex::ZERO, Complex::ZERO, Complex::real(-1.0))
    }
}

/// Porta S (√Z)
#[derive(Clone, Copy, Debug, Default)]
pub struct SGate;

impl QuantumGate for SGate {
    fn name(&self) -> &'static str {
        "S"
    }

    fn matrix(&self) -> Matrix {
        m2(Complex::ONE, Complex::ZERO, Complex::ZERO, Complex::I)
    }
}

/// Porta T (π/8)
#[derive(Clone, Copy, Debug, Default)]
pub struct TGate;

impl QuantumGate for TGate {
    fn name(&self) -> &'static str {
        "T"
    }

    fn matrix(&self) -> Matrix {
        m2(
            Complex::ONE,
            Complex::ZERO,
            Complex::ZERO,
            Complex::from_polar(PI / 4.0),
        )
    }
}

/// Porta de rotação em X
#[derive(Clone, Copy, Debug)]
pub struct RotationX {
    pub theta: f64,
}

impl RotationX {
    pub fn new(theta: f64) -> Self {
        Self { theta }
    }
}

impl QuantumGate for RotationX {
    fn name(&self) -> &'static str {
        "Rx"
    }

    fn matrix(&self) -> Matrix {
        let c = Complex::real((self.theta / 2.0).cos());
        let s = Complex::new(0.0, -(self.theta / 2.0).sin());
        m2(c, s, s, c)
    }
}

/// Porta de rotação em Y
#[derive(Clone, Copy, Debug)]
pub struct RotationY {
    pub theta: f64,
}

impl RotationY {
    pub fn new(theta: f64) -> Self {
        Self { theta }
    }
}

impl QuantumGate for RotationY {
    fn name(&self) -> &'static str {
        "Ry"
    }

    fn matrix(&self) -> Matrix {
        let c = (self.theta / 2.0).cos();
        let s = (self.theta / 2.0).sin();
        m2(
            Complex::real(c),
            Complex::real(-s),
            Complex::real(s),
            Complex::real(c),
        )
    }
}

/// Porta de rotação em Z
#[derive(Clone, Copy, Debug)]
pub struct RotationZ {
    pub theta: f64,
}

impl RotationZ {
    pub fn new(theta: f64) -> Self {
        Self { theta }
    }
}

impl QuantumGate for RotationZ {
    fn name(&self) -> &'static str {
        "Rz"
    }

    fn matrix(&self) -> Matrix {
        let half = self.theta / 2.0;
        m2(
            Complex::from_polar(-half),
            Complex::ZERO,
            Complex::ZERO,
            Complex::from_polar(half),
        )
    }
}

/// Porta de fase genérica
#[derive(Clone, Copy, Debug)]
pub struct Phase {
    pub phi: f64,
}

impl Phase {
    pub fn new(phi: f64) -> Self {
        Self { phi }
    }
}

impl QuantumGate for Phase {
    fn name(&self) -> &'static str {
        "P"
    }

    fn matrix(&self) -> Matrix {
        m2(
            Complex::ONE,
            Complex::ZERO,
            Complex::ZERO,
            Complex::from_polar(self.phi),
        )
    }
}

/// Controlled-U de dois qubits.
///
/// Com `control_first` o controle é o fator tensorial da esquerda
/// (`|0⟩⟨0| ⊗ I + |1⟩⟨1| ⊗ U`); caso contrário é o da direita
/// (`I ⊗ |0⟩⟨0| + U ⊗ |1⟩⟨1|`). `u` deve ser 2×2.
pub fn controlled(u: &Matrix, control_first: bool) -> Matrix {
    let mut out = Matrix::identity(4);
    for r in 0..2 {
        for c in 0..2 {
            // índices conjuntos (controle=1, alvo=r/c)
            let (row, col) = if control_first {
                (2 + r, 2 + c)
            } else {
                (2 * r + 1, 2 * c + 1)
            };
            out.set(row, col, u.get(r, c));
        }
    }
    out
}

/// CNOT com controle no primeiro fator
pub fn cnot() -> Matrix {
    controlled(&PauliX.matrix(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::apply;

    fn gates() -> Vec<Box<dyn QuantumGate>> {
        vec![
            Box::new(Hadamard),
            Box::new(PauliX),
            Box::new(PauliY),
            Box::new(PauliZ),
            Box::new(SGate),
            Box::new(TGate),
            Box::new(RotationX::new(0.3)),
            Box::new(RotationY::new(1.1)),
            Box::new(RotationZ::new(PI)),
            Box::new(Phase::new(2.0)),
        ]
    }

    #[test]
    fn test_standard_gates_unitary() {
        for gate in gates() {
            assert!(gate.is_unitary(), "{} is not unitary", gate.name());
        }
    }

    #[test]
    fn test_gate_then_dagger_restores_state() {
        let state = vec![Complex::new(0.6, 0.0), Complex::new(0.0, 0.8)];
        for gate in gates() {
            let m = gate.matrix();
            let forward = apply(&m, &state).unwrap();
            let back = apply(&m.dagger(), &forward).unwrap();
            for (a, b) in back.iter().zip(&state) {
                assert!(a.approx_eq(*b, 1e-10), "{} round trip drifted", gate.name());
            }
        }
    }

    #[test]
    fn test_s_squared_is_z() {
        let s = SGate.matrix();
        let s2 = s.mul(&s).unwrap();
        assert_eq!(s2, PauliZ.matrix());
    }

    #[test]
    fn test_cnot_flips_target_when_control_set() {
        // |10⟩ -> |11⟩
        let mut v = vec![Complex::ZERO; 4];
        v[2] = Complex::ONE;
        let out = apply(&cnot(), &v).unwrap();
        assert_eq!(out[3], Complex::ONE);
        assert!(cnot().is_unitary(1e-12));
    }

    #[test]
    fn test_reversed_control_orientation() {
        // controle no segundo fator: |01⟩ -> |11⟩
        let rev = controlled(&PauliX.matrix(), false);
        let mut v = vec![Complex::ZERO; 4];
        v[1] = Complex::ONE;
        let out = apply(&rev, &v).unwrap();
        assert_eq!(out[3], Complex::ONE);
        assert!(rev.is_unitary(1e-12));
    }
}
