//! Álgebra linear sobre amplitudes complexas
//!
//! Matrizes quadradas row-major de lado 2^n, produto tensorial de vetores e
//! matrizes, identidade para padding e parsing dos coeficientes simbólicos que
//! a camada de conteúdo emite.
//!
//! Ordem tensorial: o primeiro operando varia mais devagar, tanto em
//! [`tensor_vec`] quanto em [`tensor_mat`].

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use crate::complex::Complex;
use crate::error::{QuantumError, QuantumResult};

/// Vetor de amplitudes
pub type Vector = Vec<Complex>;

/// Matriz complexa quadrada (row-major)
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    dim: usize,
    data: Vec<Complex>,
}

impl Matrix {
    /// Matriz de zeros n×n
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![Complex::ZERO; dim * dim],
        }
    }

    /// Identidade n×n
    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.set(i, i, Complex::ONE);
        }
        m
    }

    /// Constrói a partir de linhas; falha se a matriz não for quadrada
    pub fn from_rows(rows: Vec<Vec<Complex>>) -> QuantumResult<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dim {
                return Err(QuantumError::RaggedMatrix {
                    row,
                    len: values.len(),
                    expected: dim,
                });
            }
            data.extend(values);
        }
        Ok(Self { dim, data })
    }

    /// Lado da matriz
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Número de qubits sobre os quais a matriz age (None se o lado não for 2^n)
    pub fn qubits(&self) -> Option<usize> {
        if self.dim.is_power_of_two() {
            Some(self.dim.trailing_zeros() as usize)
        } else {
            None
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Complex {
        self.data[row * self.dim + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Complex) {
        self.data[row * self.dim + col] = value;
    }

    /// Linha `row` como slice
    pub fn row(&self, row: usize) -> &[Complex] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Multiplicação de matrizes
    pub fn mul(&self, other: &Matrix) -> QuantumResult<Matrix> {
        if self.dim != other.dim {
            return Err(QuantumError::DimensionMismatch {
                matrix: self.dim,
                vector: other.dim,
            });
        }
        let n = self.dim;
        let mut out = Matrix::zeros(n);
        for r in 0..n {
            for c in 0..n {
                let mut sum = Complex::ZERO;
                for k in 0..n {
                    sum = sum + self.get(r, k) * other.get(k, c);
                }
                out.set(r, c, sum);
            }
        }
        Ok(out)
    }

    /// Transposta conjugada (dagger)
    pub fn dagger(&self) -> Matrix {
        let n = self.dim;
        let mut out = Matrix::zeros(n);
        for r in 0..n {
            for c in 0..n {
                out.set(c, r, self.get(r, c).conj());
            }
        }
        out
    }

    /// Verifica U·U† = I dentro da tolerância
    pub fn is_unitary(&self, tol: f64) -> bool {
        let Ok(product) = self.mul(&self.dagger()) else {
            return false;
        };
        let id = Matrix::identity(self.dim);
        product
            .data
            .iter()
            .zip(id.data.iter())
            .all(|(a, b)| a.approx_eq(*b, tol))
    }
}

/// Aplica `m` a `v`: result[r] = Σ_c M[r][c]·v[c]
///
/// O vetor de entrada nunca é alterado; em caso de dimensões incompatíveis a
/// chamada é rejeitada.
pub fn apply(m: &Matrix, v: &[Complex]) -> QuantumResult<Vector> {
    if m.dim() != v.len() {
        return Err(QuantumError::DimensionMismatch {
            matrix: m.dim(),
            vector: v.len(),
        });
    }
    Ok((0..m.dim())
        .map(|r| {
            m.row(r)
                .iter()
                .zip(v)
                .fold(Complex::ZERO, |acc, (a, b)| acc + *a * *b)
        })
        .collect())
}

/// Produto tensorial de vetores (a varia mais devagar)
pub fn tensor_vec(a: &[Complex], b: &[Complex]) -> Vector {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for ca in a {
        for cb in b {
            out.push(*ca * *cb);
        }
    }
    out
}

/// Produto de Kronecker de matrizes (a varia mais devagar)
pub fn tensor_mat(a: &Matrix, b: &Matrix) -> Matrix {
    let (na, nb) = (a.dim(), b.dim());
    let mut out = Matrix::zeros(na * nb);
    for ar in 0..na {
        for ac in 0..na {
            let scale = a.get(ar, ac);
            if scale == Complex::ZERO {
                continue;
            }
            for br in 0..nb {
                for bc in 0..nb {
                    out.set(ar * nb + br, ac * nb + bc, scale * b.get(br, bc));
                }
            }
        }
    }
    out
}

/// Identidade n×n usada para completar gates até o tamanho do sistema
pub fn identity(n: usize) -> Matrix {
    Matrix::identity(n)
}

// =============================================================================
// Parsing de coeficientes
// =============================================================================

/// Coeficiente de gate como chega do conteúdo: número, token simbólico ou par
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amplitude {
    Number(f64),
    Complex { re: f64, im: f64 },
    Symbol(String),
}

impl Amplitude {
    /// Resolve com fallback para zero em tokens desconhecidos
    pub fn resolve(&self) -> Complex {
        match self {
            Amplitude::Number(n) => Complex::real(*n),
            Amplitude::Complex { re, im } => Complex::new(*re, *im),
            Amplitude::Symbol(token) => parse_amplitude(token),
        }
    }

    /// Resolve de forma estrita
    pub fn try_resolve(&self) -> QuantumResult<Complex> {
        match self {
            Amplitude::Symbol(token) => try_parse_amplitude(token),
            other => Ok(other.resolve()),
        }
    }
}

impl From<f64> for Amplitude {
    fn from(n: f64) -> Self {
        Amplitude::Number(n)
    }
}

impl From<&str> for Amplitude {
    fn from(token: &str) -> Self {
        Amplitude::Symbol(token.to_string())
    }
}

/// Parsing estrito do vocabulário de tokens.
///
/// Aceita números, `i`, `-i`, qualquer token contendo `sqrt(2)` (±1/√2,
/// imaginário se também contiver `i`) e `e^(iπ/4)` / `exp(ipi/4)`. Um `-`
/// inicial nega o valor em todas as formas, inclusive a fase: `-e^(iπ/4)` é
/// `-(1+i)/√2`, não `e^(iπ/4)`.
pub fn try_parse_amplitude(token: &str) -> QuantumResult<Complex> {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let (sign, body) = match compact.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, compact.strip_prefix('+').unwrap_or(&compact)),
    };

    if let Ok(value) = body.parse::<f64>() {
        if value.is_finite() {
            return Ok(Complex::real(sign * value));
        }
    }

    if body == "i" {
        return Ok(Complex::I.scale(sign));
    }

    if body.contains("sqrt(2)") {
        let base = sign * FRAC_1_SQRT_2;
        return Ok(if body.contains('i') {
            Complex::new(0.0, base)
        } else {
            Complex::real(base)
        });
    }

    if body.contains("e^(iπ/4)") || body.contains("exp(ipi/4)") || body.contains("e^(ipi/4)") {
        return Ok(Complex::from_polar(FRAC_PI_4).scale(sign));
    }

    Err(QuantumError::UnknownToken(token.to_string()))
}

/// Parsing tolerante: tokens desconhecidos viram amplitude zero.
///
/// Degradação silenciosa conhecida; use [`try_parse_amplitude`] para validar
/// conteúdo na carga.
pub fn parse_amplitude(token: &str) -> Complex {
    try_parse_amplitude(token).unwrap_or_else(|err| {
        tracing::warn!(%err, "unrecognized amplitude token, using zero");
        Complex::ZERO
    })
}

/// Converte a matriz bruta do conteúdo (tokens tolerantes, forma verificada)
pub fn parse_matrix(raw: &[Vec<Amplitude>]) -> QuantumResult<Matrix> {
    Matrix::from_rows(
        raw.iter()
            .map(|row| row.iter().map(Amplitude::resolve).collect())
            .collect(),
    )
}

/// Versão estrita de [`parse_matrix`]
pub fn try_parse_matrix(raw: &[Vec<Amplitude>]) -> QuantumResult<Matrix> {
    let mut rows = Vec::with_capacity(raw.len());
    for row in raw {
        rows.push(
            row.iter()
                .map(Amplitude::try_resolve)
                .collect::<QuantumResult<Vec<_>>>()?,
        );
    }
    Matrix::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex {
        Complex::real(re)
    }

    #[test]
    fn test_apply_identity() {
        let v = vec![c(0.6), Complex::new(0.0, 0.8)];
        let out = apply(&identity(2), &v).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn test_apply_dimension_mismatch() {
        let v = vec![c(1.0), c(0.0)];
        let err = apply(&identity(4), &v).unwrap_err();
        assert_eq!(err, QuantumError::DimensionMismatch { matrix: 4, vector: 2 });
    }

    #[test]
    fn test_tensor_vec_ordering() {
        // |1⟩ ⊗ |0⟩ = |10⟩ = índice 2
        let one = vec![c(0.0), c(1.0)];
        let zero = vec![c(1.0), c(0.0)];
        let out = tensor_vec(&one, &zero);
        assert_eq!(out.len(), 4);
        assert_eq!(out[2], c(1.0));
        assert_eq!(out.iter().filter(|a| a.norm_sq() > 0.0).count(), 1);
    }

    #[test]
    fn test_tensor_mat_matches_tensor_vec() {
        let x = Matrix::from_rows(vec![vec![c(0.0), c(1.0)], vec![c(1.0), c(0.0)]]).unwrap();
        let big = tensor_mat(&x, &identity(2));
        let zero = vec![c(1.0), c(0.0)];
        let joint = tensor_vec(&zero, &zero);

        let direct = apply(&big, &joint).unwrap();
        let separate = tensor_vec(&apply(&x, &zero).unwrap(), &zero);
        assert_eq!(direct, separate);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = Matrix::from_rows(vec![vec![c(1.0), c(0.0)], vec![c(0.0)]]).unwrap_err();
        assert!(matches!(err, QuantumError::RaggedMatrix { row: 1, .. }));
    }

    #[test]
    fn test_parse_known_tokens() {
        let h = FRAC_1_SQRT_2;
        assert!(parse_amplitude("1/sqrt(2)").approx_eq(c(h), 1e-12));
        assert!(parse_amplitude("-1/sqrt(2)").approx_eq(c(-h), 1e-12));
        assert!(parse_amplitude("i/sqrt(2)").approx_eq(Complex::new(0.0, h), 1e-12));
        assert_eq!(parse_amplitude("i"), Complex::I);
        assert_eq!(parse_amplitude(" - i "), Complex::new(0.0, -1.0));
        assert_eq!(parse_amplitude("-1"), c(-1.0));
        assert!(parse_amplitude("e^(iπ/4)").approx_eq(Complex::new(h, h), 1e-12));
        assert!(parse_amplitude("exp(ipi/4)").approx_eq(Complex::new(h, h), 1e-12));
        assert!(parse_amplitude("-e^(iπ/4)").approx_eq(Complex::new(-h, -h), 1e-12));
        assert!(parse_amplitude("- exp(ipi/4)").approx_eq(Complex::new(-h, -h), 1e-12));
    }

    #[test]
    fn test_unknown_token_fails_closed_to_zero() {
        assert_eq!(parse_amplitude("e^(iπ/8)"), Complex::ZERO);
        assert_eq!(parse_amplitude("banana"), Complex::ZERO);
        assert_eq!(parse_amplitude("inf"), Complex::ZERO);
        assert!(matches!(
            try_parse_amplitude("banana"),
            Err(QuantumError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_amplitude_deserializes_untagged() {
        let raw: Vec<Vec<Amplitude>> =
            serde_json::from_str(r#"[[1, "1/sqrt(2)"], [{"re": 0.0, "im": 1.0}, "-i"]]"#).unwrap();
        let m = parse_matrix(&raw).unwrap();
        assert_eq!(m.get(0, 0), c(1.0));
        assert_eq!(m.get(1, 0), Complex::I);
        assert_eq!(m.get(1, 1), Complex::new(0.0, -1.0));
    }

    #[test]
    fn test_strict_matrix_rejects_unknown() {
        let raw = vec![vec![Amplitude::from(1.0), Amplitude::from("nope")]];
        assert!(try_parse_matrix(&raw).is_err());
    }
}
