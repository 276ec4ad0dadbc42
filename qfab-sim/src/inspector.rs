//! Consulta de diagnóstico por célula (somente leitura)

use qfab_factory::{Cell, ItemId, ItemRegistry, Tile};
use qfab_quantum::SystemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classificação do qubit pela probabilidade de excitação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// P(1) < 0.1
    Zero,
    /// P(1) > 0.9
    One,
    Superposed,
}

impl Classification {
    pub fn from_excitation(p: f64) -> Self {
        if p < 0.1 {
            Classification::Zero
        } else if p > 0.9 {
            Classification::One
        } else {
            Classification::Superposed
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Zero => "|0⟩",
            Classification::One => "|1⟩",
            Classification::Superposed => "superposed",
        };
        write!(f, "{}", label)
    }
}

/// Item visto pelo inspetor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: ItemId,
    pub system: SystemId,
    pub qubit: usize,
    /// Qubits do sistema dono
    pub system_qubits: usize,
    /// Probabilidade marginal do qubit do item
    pub excitation: f64,
    pub classification: Classification,
}

/// Resultado de uma inspeção
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub cell: Cell,
    pub tile: Option<Tile>,
    pub items: Vec<ItemReport>,
}

/// Monta o relatório de `cell` a partir do tile e dos itens ali
pub fn inspect(tile: Option<&Tile>, registry: &ItemRegistry, cell: Cell) -> Inspection {
    let items = registry
        .items_at(cell)
        .into_iter()
        .filter_map(|item| {
            let system = registry.systems().get(item.system)?;
            let excitation = system.qubit_excitation_probability(item.qubit);
            Some(ItemReport {
                id: item.id,
                system: item.system,
                qubit: item.qubit,
                system_qubits: system.qubits(),
                excitation,
                classification: Classification::from_excitation(excitation),
            })
        })
        .collect();

    Inspection {
        cell,
        tile: tile.cloned(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qfab_factory::{Direction, TileKind};

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(Classification::from_excitation(0.05), Classification::Zero);
        assert_eq!(Classification::from_excitation(0.1), Classification::Superposed);
        assert_eq!(Classification::from_excitation(0.5), Classification::Superposed);
        assert_eq!(Classification::from_excitation(0.95), Classification::One);
    }

    #[test]
    fn test_inspect_reports_items_and_tile() {
        let mut reg = ItemRegistry::default();
        let cell = Cell::new(1, 1);
        let a = reg.spawn(cell);
        reg.spawn(Cell::new(9, 9));
        let tile = Tile::conveyor(Direction::West);

        let report = inspect(Some(&tile), &reg, cell);
        assert_eq!(report.tile.as_ref().map(|t| t.kind), Some(TileKind::Conveyor));
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].id, a);
        assert_eq!(report.items[0].classification, Classification::Zero);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"classification\":\"zero\""));
    }

    #[test]
    fn test_inspect_empty_cell() {
        let reg = ItemRegistry::default();
        let report = inspect(None, &reg, Cell::new(0, 0));
        assert!(report.tile.is_none());
        assert!(report.items.is_empty());
    }
}
