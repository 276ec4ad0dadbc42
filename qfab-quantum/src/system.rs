//! Sistema quântico: vetor de amplitudes de um grupo de qubits emaranhados
//!
//! Convenção de bits: num sistema de `n` qubits o qubit `k` é o fator tensorial
//! `k` a partir da esquerda, ou seja o bit `n-1-k` do índice de base. O qubit 0
//! é o mais significativo. `merge` (este sistema primeiro) preserva os índices
//! deste sistema e desloca os do outro por `self.qubits()`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::complex::Complex;
use crate::error::{QuantumError, QuantumResult};
use crate::linalg::{self, Matrix, Vector};

/// Identificador de sistema quântico
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys-{}", self.0)
    }
}

/// Estado conjunto de um grupo de qubits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuantumSystem {
    id: SystemId,
    vector: Vector,
    qubits: usize,
}

impl QuantumSystem {
    /// Cria sistema de um qubit em |0⟩
    pub fn new(id: SystemId) -> Self {
        Self {
            id,
            vector: vec![Complex::ONE, Complex::ZERO],
            qubits: 1,
        }
    }

    /// Cria a partir de um vetor explícito (comprimento 2^n, n ≥ 1)
    pub fn from_vector(id: SystemId, vector: Vector) -> QuantumResult<Self> {
        if vector.len() < 2 || !vector.len().is_power_of_two() {
            return Err(QuantumError::InvalidGateSize(vector.len()));
        }
        let qubits = vector.len().trailing_zeros() as usize;
        Ok(Self { id, vector, qubits })
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Número de qubits (log2 do comprimento do vetor)
    pub fn qubits(&self) -> usize {
        self.qubits
    }

    pub fn amplitudes(&self) -> &[Complex] {
        &self.vector
    }

    /// Soma das probabilidades
    pub fn norm_sq(&self) -> f64 {
        self.vector.iter().map(|a| a.norm_sq()).sum()
    }

    /// Bit do `qubit` no índice de base `index`
    pub fn bit_of(&self, index: usize, qubit: usize) -> u8 {
        ((index >> (self.qubits - 1 - qubit)) & 1) as u8
    }

    /// Aplica um gate de `m` qubits começando no qubit `target`.
    ///
    /// O operador completo é `I(2^target) ⊗ G ⊗ I(2^(n-target-m))`. Qualquer
    /// erro deixa o vetor intacto.
    pub fn apply_gate(&mut self, gate: &Matrix, target: usize) -> QuantumResult<()> {
        let width = gate
            .qubits()
            .filter(|w| *w > 0)
            .ok_or(QuantumError::InvalidGateSize(gate.dim()))?;
        if target + width > self.qubits {
            return Err(QuantumError::QubitOutOfRange {
                qubit: target,
                width,
                qubits: self.qubits,
            });
        }

        let next = if width == self.qubits {
            linalg::apply(gate, &self.vector)?
        } else {
            let pre_size = 1usize << target;
            let post_size = 1usize << (self.qubits - target - width);
            let full = linalg::tensor_mat(
                &linalg::tensor_mat(&linalg::identity(pre_size), gate),
                &linalg::identity(post_size),
            );
            linalg::apply(&full, &self.vector)?
        };

        self.vector = next;
        Ok(())
    }

    /// Funde `other` neste sistema (este primeiro). Mesmo id = no-op.
    ///
    /// Não toca em itens: quem chama reaponta os itens de `other` e soma
    /// `self.qubits()` (pré-merge) aos seus índices.
    pub fn merge(&mut self, other: &QuantumSystem) {
        if other.id == self.id {
            return;
        }
        self.vector = linalg::tensor_vec(&self.vector, &other.vector);
        self.qubits += other.qubits;
    }

    /// Amostra um índice de base pela regra de Born (um único sorteio).
    ///
    /// Se o deslocamento numérico deixar o sorteio sem resolução, retorna o
    /// último índice.
    pub fn measure<R: Rng>(&self, rng: &mut R) -> usize {
        let draw: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        for (i, amp) in self.vector.iter().enumerate() {
            cumulative += amp.norm_sq();
            if draw < cumulative {
                return i;
            }
        }
        self.vector.len() - 1
    }

    /// Colapsa para o estado de base `index`
    pub fn collapse_to_basis(&mut self, index: usize) -> QuantumResult<()> {
        if index >= self.vector.len() {
            return Err(QuantumError::BasisOutOfRange {
                index,
                len: self.vector.len(),
            });
        }
        self.vector.iter_mut().for_each(|a| *a = Complex::ZERO);
        self.vector[index] = Complex::ONE;
        Ok(())
    }

    /// Mede e colapsa; retorna o índice observado
    pub fn measure_and_collapse<R: Rng>(&mut self, rng: &mut R) -> usize {
        let outcome = self.measure(rng);
        self.vector.iter_mut().for_each(|a| *a = Complex::ZERO);
        self.vector[outcome] = Complex::ONE;
        outcome
    }

    /// Probabilidade nos índices com bit menos significativo 1
    pub fn excitation_probability(&self) -> f64 {
        self.vector
            .iter()
            .enumerate()
            .filter(|(i, _)| i & 1 == 1)
            .map(|(_, a)| a.norm_sq())
            .sum()
    }

    /// Probabilidade marginal de o `qubit` ler 1
    pub fn qubit_excitation_probability(&self, qubit: usize) -> f64 {
        if qubit >= self.qubits {
            return 0.0;
        }
        self.vector
            .iter()
            .enumerate()
            .filter(|(i, _)| self.bit_of(*i, qubit) == 1)
            .map(|(_, a)| a.norm_sq())
            .sum()
    }
}
