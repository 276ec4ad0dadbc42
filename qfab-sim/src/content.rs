//! Conteúdo do jogo: registro de gates, dados de nível e custos de build
//!
//! Aceita os documentos em snake_case e, por alias, os nomes camelCase dos
//! arquivos de conteúdo (`gateId`, `controlCount`, `rewardPerUnit`, ...).

use qfab_factory::{Cell, Direction, Tile, TileKind};
use qfab_quantum::circuit::standard_gate;
use qfab_quantum::linalg::{parse_matrix, try_parse_matrix};
use qfab_quantum::{Amplitude, Matrix, controlled};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};

/// Tolerância da verificação de unitariedade na carga
const UNITARY_TOLERANCE: f64 = 1e-6;

/// Custo usado quando o build não tem preço conhecido
pub const DEFAULT_BUILD_COST: u64 = 5;

// =============================================================================
// Gates
// =============================================================================

/// Comportamento de um gate sobre o item que passa pela impressora
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GateBehavior {
    /// Apenas encaminha
    Classical,
    /// Aplica a matriz 2×2 ao qubit do item
    Unitary { matrix: Vec<Vec<Amplitude>> },
    /// Gate de dois itens: controle + alvo na mesma célula
    Controlled {
        #[serde(alias = "controlCount")]
        control_count: usize,
        /// Gate de um qubit aplicado no alvo (padrão: `x`)
        #[serde(default)]
        target: Option<String>,
    },
    /// Mede e colapsa
    Measurement,
}

/// Definição de gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_cost")]
    pub cost: u64,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "unlockedAtChapter")]
    pub unlocked_at_chapter: u32,
    pub behavior: GateBehavior,
}

fn default_cost() -> u64 {
    DEFAULT_BUILD_COST
}

impl GateDefinition {
    pub fn new(id: &str, name: &str, cost: u64, category: &str, behavior: GateBehavior) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cost,
            category: category.to_string(),
            unlocked_at_chapter: 0,
            behavior,
        }
    }

    fn unitary(id: &str, name: &str, cost: u64, rows: [[Amplitude; 2]; 2]) -> Self {
        let matrix = rows.into_iter().map(Vec::from).collect();
        Self::new(id, name, cost, "single", GateBehavior::Unitary { matrix })
    }

    pub fn chapter(mut self, chapter: u32) -> Self {
        self.unlocked_at_chapter = chapter;
        self
    }
}

/// Registro de gates com operadores já resolvidos
#[derive(Debug, Clone, Default)]
pub struct GateRegistry {
    definitions: BTreeMap<String, GateDefinition>,
    operators: BTreeMap<String, Matrix>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Biblioteca padrão: h, x, y, z, s, t, id, cnot, cz, measure
    pub fn standard() -> Self {
        use Amplitude::Number as N;
        let s = |token: &str| Amplitude::from(token);

        let definitions = [
            GateDefinition::unitary(
                "h",
                "Hadamard",
                4,
                [[s("1/sqrt(2)"), s("1/sqrt(2)")], [s("1/sqrt(2)"), s("-1/sqrt(2)")]],
            )
            .chapter(1),
            GateDefinition::unitary("x", "Pauli-X", 6, [[N(0.0), N(1.0)], [N(1.0), N(0.0)]])
                .chapter(1),
            GateDefinition::unitary("y", "Pauli-Y", 6, [[N(0.0), s("-i")], [s("i"), N(0.0)]])
                .chapter(2),
            GateDefinition::unitary("z", "Pauli-Z", 6, [[N(1.0), N(0.0)], [N(0.0), N(-1.0)]])
                .chapter(2),
            GateDefinition::unitary("s", "Phase S", 5, [[N(1.0), N(0.0)], [N(0.0), s("i")]])
                .chapter(3),
            GateDefinition::unitary("t", "Phase T", 5, [[N(1.0), N(0.0)], [N(0.0), s("e^(iπ/4)")]])
                .chapter(3),
            GateDefinition::new("id", "Identity", 1, "single", GateBehavior::Classical),
            GateDefinition::new(
                "cnot",
                "Controlled-NOT",
                12,
                "multi",
                GateBehavior::Controlled {
                    control_count: 1,
                    target: Some("x".into()),
                },
            )
            .chapter(2),
            GateDefinition::new(
                "cz",
                "Controlled-Z",
                12,
                "multi",
                GateBehavior::Controlled {
                    control_count: 1,
                    target: Some("z".into()),
                },
            )
            .chapter(3),
            GateDefinition::new("measure", "Measurement", 8, "measurement", GateBehavior::Measurement)
                .chapter(1),
        ];

        let mut registry = Self::new();
        for definition in definitions {
            let registered = registry.insert_strict(definition);
            debug_assert!(registered.is_ok(), "standard gate rejected: {:?}", registered);
        }
        registry
    }

    /// Lê uma lista JSON de definições (tokens desconhecidos viram zero)
    pub fn from_json(json: &str) -> SimResult<Self> {
        Self::from_definitions(serde_json::from_str(json)?, false)
    }

    /// Como [`GateRegistry::from_json`], mas rejeita tokens desconhecidos e
    /// matrizes não unitárias
    pub fn from_json_strict(json: &str) -> SimResult<Self> {
        Self::from_definitions(serde_json::from_str(json)?, true)
    }

    fn from_definitions(definitions: Vec<GateDefinition>, strict: bool) -> SimResult<Self> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition, strict)?;
        }
        Ok(registry)
    }

    /// Registra (ou substitui) uma definição.
    ///
    /// Tokens de amplitude desconhecidos viram zero e uma matriz não unitária
    /// só gera aviso. Forma 2x2 e alvo de gate controlado continuam
    /// obrigatórios.
    pub fn insert(&mut self, definition: GateDefinition) -> SimResult<()> {
        self.register(definition, false)
    }

    /// Registra uma definição com validação estrita de tokens e unitariedade
    pub fn insert_strict(&mut self, definition: GateDefinition) -> SimResult<()> {
        self.register(definition, true)
    }

    fn register(&mut self, definition: GateDefinition, strict: bool) -> SimResult<()> {
        let invalid = |reason: String| SimError::InvalidGate {
            id: definition.id.clone(),
            reason,
        };

        match &definition.behavior {
            GateBehavior::Unitary { matrix } => {
                let parsed = if strict {
                    try_parse_matrix(matrix)
                } else {
                    parse_matrix(matrix)
                };
                let operator = parsed.map_err(|e| invalid(e.to_string()))?;
                if operator.dim() != 2 {
                    return Err(invalid(format!(
                        "expected a 2x2 matrix, got {}x{}",
                        operator.dim(),
                        operator.dim()
                    )));
                }
                if !operator.is_unitary(UNITARY_TOLERANCE) {
                    if strict {
                        return Err(invalid("matrix is not unitary".into()));
                    }
                    warn!(gate = %definition.id, "gate matrix is not unitary");
                }
                self.operators.insert(definition.id.clone(), operator);
            }
            GateBehavior::Controlled {
                control_count,
                target,
            } => {
                if *control_count == 0 {
                    return Err(invalid("control_count must be >= 1".into()));
                }
                let target = target.as_deref().unwrap_or("x");
                if self.single_qubit_operator(target).is_none() {
                    return Err(invalid(format!("unknown target gate '{}'", target)));
                }
                self.operators.remove(&definition.id);
            }
            GateBehavior::Classical | GateBehavior::Measurement => {
                self.operators.remove(&definition.id);
            }
        }

        debug!(gate = %definition.id, "registered gate");
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&GateDefinition> {
        self.definitions.get(id)
    }

    /// Definições em ordem de id
    pub fn list(&self) -> Vec<&GateDefinition> {
        self.definitions.values().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Matriz resolvida de um gate unitário
    pub fn operator(&self, id: &str) -> Option<&Matrix> {
        self.operators.get(id)
    }

    /// Operador de dois qubits de um gate controlado.
    ///
    /// `control_first` indica se o controle ocupa o primeiro fator tensorial.
    pub fn controlled_operator(&self, id: &str, control_first: bool) -> Option<Matrix> {
        match &self.get(id)?.behavior {
            GateBehavior::Controlled { target, .. } => {
                let u = self.single_qubit_operator(target.as_deref().unwrap_or("x"))?;
                Some(controlled(&u, control_first))
            }
            _ => None,
        }
    }

    fn single_qubit_operator(&self, id: &str) -> Option<Matrix> {
        self.operators.get(id).cloned().or_else(|| standard_gate(id))
    }
}

// =============================================================================
// Níveis
// =============================================================================

/// Tile do layout de um nível
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTile {
    pub x: i32,
    pub y: i32,
    pub kind: TileKind,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default, alias = "gateId")]
    pub gate_id: Option<String>,
}

impl LevelTile {
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    /// Tile do grid; fontes e sorvedouros vêm travados
    pub fn to_tile(&self) -> Tile {
        Tile {
            kind: self.kind,
            direction: self.direction,
            gate_id: self.gate_id.clone(),
            locked: self.kind.is_locked_by_default(),
        }
    }
}

/// Classe de estado que o contrato aceita
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractTarget {
    /// P(1) < 0.1
    Zero,
    /// P(1) > 0.9
    One,
    /// 0.4 < P(1) < 0.6
    Plus,
}

impl ContractTarget {
    /// Compara a probabilidade de excitação com a faixa do alvo
    pub fn accepts(&self, excitation: f64) -> bool {
        match self {
            ContractTarget::Zero => excitation < 0.1,
            ContractTarget::One => excitation > 0.9,
            ContractTarget::Plus => excitation > 0.4 && excitation < 0.6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContractTarget::Zero => "zero",
            ContractTarget::One => "one",
            ContractTarget::Plus => "plus",
        }
    }
}

/// Contrato declarado pelo nível
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub id: String,
    #[serde(default)]
    pub goal: String,
    pub target: ContractTarget,
    pub required: u32,
    #[serde(alias = "rewardPerUnit")]
    pub reward_per_unit: u64,
}

/// Documento de nível
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub layout: Vec<LevelTile>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub contract: Option<ContractSpec>,
    /// Builds liberados; vazio libera todos
    #[serde(default, alias = "availableBuilds")]
    pub available_builds: Vec<String>,
}

impl LevelData {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Carrega `.json` como JSON e qualquer outra extensão como TOML
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn allows_build(&self, build_id: &str) -> bool {
        self.available_builds.is_empty() || self.available_builds.iter().any(|b| b == build_id)
    }
}

// =============================================================================
// Builds
// =============================================================================

/// Builds que não são gates
pub const STRUCTURE_BUILDS: [&str; 5] = ["conveyor", "detector", "splitter", "merger", "scanner"];

/// Custo de um build: tabela fixa, depois o custo do gate, depois o padrão
pub fn build_cost(build_id: &str, gates: &GateRegistry) -> u64 {
    match build_id {
        "conveyor" => 1,
        "h" => 4,
        "x" | "z" => 6,
        "cnot" => 12,
        "detector" => 8,
        "splitter" => 6,
        "merger" => 4,
        other => gates.get(other).map_or(DEFAULT_BUILD_COST, |g| g.cost),
    }
}

/// Tile produzido por um build
pub fn build_tile(build_id: &str, facing: Direction, gates: &GateRegistry) -> SimResult<Tile> {
    let kind = match build_id {
        "conveyor" => TileKind::Conveyor,
        "detector" => TileKind::Detector,
        "splitter" => TileKind::Splitter,
        "merger" => TileKind::Merger,
        "scanner" => TileKind::Scanner,
        gate if gates.get(gate).is_some() => return Ok(Tile::printer(gate, facing)),
        other => return Err(SimError::UnknownBuild(other.to_string())),
    };
    Ok(Tile::new(kind).facing(facing))
}
