//! Grid esparso do chão de fábrica
//!
//! Mapa célula → tile. Ausência de chave significa tile vazio. Nenhuma
//! validação além do armazenamento: tiles travados e adjacência são
//! responsabilidade da simulação.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FactoryError;

/// Coordenada inteira de célula
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Célula vizinha na direção `dir`
    pub fn step(self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Cell {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FactoryError::InvalidCell(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        Ok(Cell::new(
            x.trim().parse().map_err(|_| invalid())?,
            y.trim().parse().map_err(|_| invalid())?,
        ))
    }
}

/// Direção cardinal (y cresce para o sul)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Ordem de busca por esteira adjacente quando o tile não tem direção
    pub const SEARCH_ORDER: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Rotação de 90° no sentido horário
    pub fn rotate_cw(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Rotação de 90° no sentido anti-horário
    pub fn rotate_ccw(self) -> Direction {
        self.rotate_cw().rotate_cw().rotate_cw()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tipo de tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    #[default]
    Empty,
    Conveyor,
    Printer,
    Splitter,
    Merger,
    Detector,
    Scanner,
    Source,
    Sink,
}

impl TileKind {
    /// Fontes e sorvedouros vêm travados do nível
    pub fn is_locked_by_default(&self) -> bool {
        matches!(self, TileKind::Source | TileKind::Sink)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TileKind::Empty => "empty",
            TileKind::Conveyor => "conveyor",
            TileKind::Printer => "printer",
            TileKind::Splitter => "splitter",
            TileKind::Merger => "merger",
            TileKind::Detector => "detector",
            TileKind::Scanner => "scanner",
            TileKind::Source => "source",
            TileKind::Sink => "sink",
        }
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tile colocado numa célula
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub gate_id: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_gate(mut self, gate_id: impl Into<String>) -> Self {
        self.gate_id = Some(gate_id.into());
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn conveyor(direction: Direction) -> Self {
        Self::new(TileKind::Conveyor).facing(direction)
    }

    pub fn printer(gate_id: impl Into<String>, direction: Direction) -> Self {
        Self::new(TileKind::Printer).facing(direction).with_gate(gate_id)
    }
}

/// Grid esparso
#[derive(Debug, Clone, Default)]
pub struct Grid {
    tiles: HashMap<Cell, Tile>,
    /// Incrementado a cada mutação
    version: u64,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: Cell) -> Option<&Tile> {
        self.tiles.get(&cell)
    }

    /// Coloca (ou substitui) o tile da célula
    pub fn set(&mut self, cell: Cell, tile: Tile) {
        self.tiles.insert(cell, tile);
        self.version += 1;
    }

    pub fn remove(&mut self, cell: Cell) -> Option<Tile> {
        let removed = self.tiles.remove(&cell);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.version += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, &Tile)> {
        self.tiles.iter().map(|(cell, tile)| (*cell, tile))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Células de um tipo, ordenadas por (x, y)
    pub fn cells_of_kind(&self, kind: TileKind) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .iter()
            .filter(|(_, tile)| tile.kind == kind)
            .map(|(cell, _)| cell)
            .collect();
        cells.sort();
        cells
    }

    /// Células de fonte em ordem determinística
    pub fn sources(&self) -> Vec<Cell> {
        self.cells_of_kind(TileKind::Source)
    }

    /// Verifica se há uma esteira em `cell`
    pub fn is_conveyor(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(|t| t.kind == TileKind::Conveyor)
    }
}
