//! Backend "arcade": executa um circuito pequeno sobre um [`QuantumSystem`]
//!
//! Suporta gates de um alvo com no máximo um controle adjacente. O que não
//! couber nisso é pulado e registrado em `notes`.

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::error::{QuantumError, QuantumResult};
use crate::gates::{self, QuantumGate};
use crate::linalg::{self, Amplitude, Matrix};
use crate::system::{QuantumSystem, SystemId};

/// Limite de qubits do backend arcade
pub const MAX_ARCADE_QUBITS: usize = 10;

/// Gate de circuito
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitGate {
    pub id: String,
    #[serde(default)]
    pub controls: Vec<usize>,
    pub targets: Vec<usize>,
    /// Matriz explícita; sem ela o id é resolvido na biblioteca padrão
    #[serde(default)]
    pub matrix: Option<Vec<Vec<Amplitude>>>,
}

/// Circuito: número de qubits e lista ordenada de gates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    pub qubits: usize,
    pub gates: Vec<CircuitGate>,
}

/// Resultado de execução
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub amplitudes: Vec<Complex>,
    pub probabilities: Vec<f64>,
    pub notes: Vec<String>,
}

/// Backend de execução de circuitos
pub trait CircuitBackend {
    fn label(&self) -> &str;

    fn run_circuit(&self, circuit: &Circuit) -> QuantumResult<RunResult>;
}

/// Backend local de vetor de estado
#[derive(Debug, Clone, Copy, Default)]
pub struct ArcadeBackend;

/// Resolve um id de gate da biblioteca padrão
pub fn standard_gate(id: &str) -> Option<Matrix> {
    let gate: Box<dyn QuantumGate> = match id.to_ascii_lowercase().as_str() {
        "h" => Box::new(gates::Hadamard),
        "x" | "cnot" | "cx" => Box::new(gates::PauliX),
        "y" => Box::new(gates::PauliY),
        "z" | "cz" => Box::new(gates::PauliZ),
        "s" => Box::new(gates::SGate),
        "t" => Box::new(gates::TGate),
        "id" | "i" => return Some(linalg::identity(2)),
        _ => return None,
    };
    Some(gate.matrix())
}

impl ArcadeBackend {
    fn resolve(gate: &CircuitGate) -> QuantumResult<Option<Matrix>> {
        match &gate.matrix {
            Some(raw) => linalg::try_parse_matrix(raw).map(Some),
            None => Ok(standard_gate(&gate.id)),
        }
    }
}

impl CircuitBackend for ArcadeBackend {
    fn label(&self) -> &str {
        "Arcade"
    }

    fn run_circuit(&self, circuit: &Circuit) -> QuantumResult<RunResult> {
        if circuit.qubits == 0 || circuit.qubits > MAX_ARCADE_QUBITS {
            return Err(QuantumError::InvalidCircuit(format!(
                "arcade backend supports 1..={} qubits, got {}",
                MAX_ARCADE_QUBITS, circuit.qubits
            )));
        }

        let mut vector = vec![Complex::ZERO; 1 << circuit.qubits];
        vector[0] = Complex::ONE;
        let mut system = QuantumSystem::from_vector(SystemId(0), vector)?;
        let mut notes = Vec::new();

        for (step, gate) in circuit.gates.iter().enumerate() {
            if let Some(&q) = gate
                .targets
                .iter()
                .chain(&gate.controls)
                .find(|q| **q >= circuit.qubits)
            {
                return Err(QuantumError::InvalidCircuit(format!(
                    "gate {} ({}) references qubit {}",
                    step, gate.id, q
                )));
            }

            let Some(u) = Self::resolve(gate)? else {
                notes.push(format!("step {}: unknown gate '{}' skipped", step, gate.id));
                continue;
            };

            match (gate.controls.as_slice(), gate.targets.as_slice()) {
                ([], [target]) => system.apply_gate(&u, *target)?,
                ([control], [target]) if control.abs_diff(*target) == 1 && u.dim() == 2 => {
                    let op = gates::controlled(&u, control < target);
                    system.apply_gate(&op, (*control).min(*target))?;
                }
                _ => notes.push(format!(
                    "step {}: '{}' with controls {:?} targets {:?} not supported",
                    step, gate.id, gate.controls, gate.targets
                )),
            }
        }

        let amplitudes = system.amplitudes().to_vec();
        let probabilities = amplitudes.iter().map(|a| a.norm_sq()).collect();
        Ok(RunResult {
            amplitudes,
            probabilities,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(id: &str, controls: &[usize], targets: &[usize]) -> CircuitGate {
        CircuitGate {
            id: id.to_string(),
            controls: controls.to_vec(),
            targets: targets.to_vec(),
            matrix: None,
        }
    }

    #[test]
    fn test_bell_circuit() {
        let circuit = Circuit {
            qubits: 2,
            gates: vec![gate("h", &[], &[0]), gate("x", &[0], &[1])],
        };
        let result = ArcadeBackend.run_circuit(&circuit).unwrap();
        assert!((result.probabilities[0] - 0.5).abs() < 1e-12);
        assert!((result.probabilities[3] - 0.5).abs() < 1e-12);
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_reversed_control() {
        // X no qubit 1, depois CNOT controle 1 -> alvo 0: |01⟩ -> |11⟩
        let circuit = Circuit {
            qubits: 2,
            gates: vec![gate("x", &[], &[1]), gate("cnot", &[1], &[0])],
        };
        let result = ArcadeBackend.run_circuit(&circuit).unwrap();
        assert!((result.probabilities[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_gates_are_noted() {
        let circuit = Circuit {
            qubits: 3,
            gates: vec![gate("warp", &[], &[0]), gate("x", &[0], &[2])],
        };
        let result = ArcadeBackend.run_circuit(&circuit).unwrap();
        assert_eq!(result.notes.len(), 2);
        assert_eq!(result.probabilities[0], 1.0);
    }

    #[test]
    fn test_out_of_range_qubit_rejected() {
        let circuit = Circuit {
            qubits: 1,
            gates: vec![gate("x", &[], &[3])],
        };
        assert!(matches!(
            ArcadeBackend.run_circuit(&circuit),
            Err(QuantumError::InvalidCircuit(_))
        ));
    }

    #[test]
    fn test_explicit_matrix_from_json() {
        let circuit: Circuit = serde_json::from_str(
            r#"{"qubits": 1, "gates": [{"id": "flip", "targets": [0], "matrix": [[0, 1], [1, 0]]}]}"#,
        )
        .unwrap();
        let result = ArcadeBackend.run_circuit(&circuit).unwrap();
        assert_eq!(result.probabilities, vec![0.0, 1.0]);
    }
}
