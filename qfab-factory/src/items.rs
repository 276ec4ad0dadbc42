//! Registro de itens em trânsito e dos sistemas quânticos que eles carregam
//!
//! Cada item aponta para um [`QuantumSystem`] e para o índice de qubit que
//! representa dentro dele. Vários itens podem compartilhar um sistema depois de
//! um merge; o sistema só é destruído quando o último item que o referencia sai.
//!
//! Movimento: um item está "assentado" numa célula (dentro de ε, sem alvo) ou
//! "em voo" rumo a uma célula alvo. Só itens assentados consultam o
//! [`Router`]; o movimento só é confirmado se a célula destino tiver vaga.

use qfab_quantum::{QuantumSystem, SystemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{FactoryError, FactoryResult};
use crate::grid::{Cell, Direction};

/// Velocidade padrão (células por segundo)
pub const DEFAULT_ITEM_SPEED: f64 = 4.0;

/// Distância máxima para considerar um item assentado
pub const SETTLE_EPSILON: f64 = 0.05;

/// Identificador de item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marca de visita: célula já processada e saída escolhida nela
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileVisit {
    pub cell: Cell,
    pub exit: Option<Direction>,
}

/// Item em trânsito
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub target: Option<Cell>,
    pub speed: f64,
    pub system: SystemId,
    /// Qubit deste item dentro de `system`
    pub qubit: usize,
    /// Limpa ao chegar numa nova célula
    pub visit: Option<TileVisit>,
}

impl Item {
    /// Célula pela posição arredondada
    pub fn cell(&self) -> Cell {
        Cell::new(self.x.round() as i32, self.y.round() as i32)
    }

    pub fn is_settled(&self, epsilon: f64) -> bool {
        if self.target.is_some() {
            return false;
        }
        let cell = self.cell();
        (self.x - cell.x as f64).hypot(self.y - cell.y as f64) < epsilon
    }

    /// Visita registrada para `cell`, se houver
    pub fn visit_at(&self, cell: Cell) -> Option<TileVisit> {
        self.visit.filter(|v| v.cell == cell)
    }

    pub fn mark_visited(&mut self, cell: Cell, exit: Option<Direction>) {
        self.visit = Some(TileVisit { cell, exit });
    }

    fn snap_if_settled(&mut self, epsilon: f64) -> bool {
        if !self.is_settled(epsilon) {
            return false;
        }
        let cell = self.cell();
        self.x = cell.x as f64;
        self.y = cell.y as f64;
        true
    }
}

/// Tabela de sistemas quânticos vivos
#[derive(Debug, Clone, Default)]
pub struct SystemTable {
    systems: HashMap<SystemId, QuantumSystem>,
}

impl SystemTable {
    pub fn get(&self, id: SystemId) -> Option<&QuantumSystem> {
        self.systems.get(&id)
    }

    pub fn get_mut(&mut self, id: SystemId) -> Option<&mut QuantumSystem> {
        self.systems.get_mut(&id)
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.systems.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantumSystem> {
        self.systems.values()
    }

    fn insert(&mut self, system: QuantumSystem) {
        self.systems.insert(system.id(), system);
    }

    fn remove(&mut self, id: SystemId) -> Option<QuantumSystem> {
        self.systems.remove(&id)
    }

    fn clear(&mut self) {
        self.systems.clear();
    }
}

/// Decisão de roteamento para um item assentado
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Mover para a célula vizinha
    Move(Direction),
    /// Ficar parado neste tick
    Hold,
    /// Consumir o item (destruído ao fim da passada)
    Remove,
}

/// Callback de roteamento consultado para cada item assentado
pub trait Router {
    fn route(&mut self, item: &mut Item, cell: Cell, systems: &mut SystemTable) -> Route;

    /// Quantos itens a célula aceita ao mesmo tempo
    fn capacity(&self, _cell: Cell) -> usize {
        1
    }
}

impl<F> Router for F
where
    F: FnMut(&mut Item, Cell, &mut SystemTable) -> Route,
{
    fn route(&mut self, item: &mut Item, cell: Cell, systems: &mut SystemTable) -> Route {
        self(item, cell, systems)
    }
}

/// Resumo de uma passada de movimento
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Itens que começaram a se mover
    pub departed: usize,
    /// Movimentos recusados por ocupação
    pub blocked: usize,
    /// Itens que chegaram ao alvo
    pub arrived: Vec<ItemId>,
    /// Itens consumidos pelo roteador
    pub removed: Vec<ItemId>,
}

/// Registro de itens e sistemas
#[derive(Debug, Clone)]
pub struct ItemRegistry {
    items: BTreeMap<ItemId, Item>,
    systems: SystemTable,
    occupancy: HashMap<Cell, usize>,
    next_item: u64,
    next_system: u64,
    speed: f64,
    settle_epsilon: f64,
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_SPEED, SETTLE_EPSILON)
    }
}

impl ItemRegistry {
    pub fn new(speed: f64, settle_epsilon: f64) -> Self {
        Self {
            items: BTreeMap::new(),
            systems: SystemTable::default(),
            occupancy: HashMap::new(),
            next_item: 1,
            next_system: 1,
            speed,
            settle_epsilon,
        }
    }

    pub fn settle_epsilon(&self) -> f64 {
        self.settle_epsilon
    }

    /// Cria item num sistema novo de um qubit em |0⟩
    pub fn spawn(&mut self, cell: Cell) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        let system = SystemId(self.next_system);
        self.next_system += 1;

        self.systems.insert(QuantumSystem::new(system));
        self.items.insert(
            id,
            Item {
                id,
                x: cell.x as f64,
                y: cell.y as f64,
                target: None,
                speed: self.speed,
                system,
                qubit: 0,
                visit: None,
            },
        );
        trace!(item = %id, %system, %cell, "spawned");
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Itens em ordem de id
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn systems(&self) -> &SystemTable {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemTable {
        &mut self.systems
    }

    /// Sistema carregado pelo item
    pub fn system_of(&self, id: ItemId) -> Option<&QuantumSystem> {
        self.items.get(&id).and_then(|item| self.systems.get(item.system))
    }

    /// Probabilidade marginal de o qubit do item ler 1
    pub fn excitation_of(&self, id: ItemId) -> Option<f64> {
        let item = self.items.get(&id)?;
        let system = self.systems.get(item.system)?;
        Some(system.qubit_excitation_probability(item.qubit))
    }

    /// Remove o item; o sistema sai junto só se nenhum outro item o referencia
    pub fn destroy(&mut self, id: ItemId) -> FactoryResult<Item> {
        let item = self.items.remove(&id).ok_or(FactoryError::UnknownItem(id))?;
        let shared = self.items.values().any(|other| other.system == item.system);
        if !shared {
            self.systems.remove(item.system);
        }
        trace!(item = %id, system = %item.system, shared, "destroyed");
        Ok(item)
    }

    /// Remove todos os itens e sistemas
    pub fn destroy_all(&mut self) {
        self.items.clear();
        self.systems.clear();
        self.occupancy.clear();
    }

    /// Funde o sistema de `b` no de `a` e reindexa os itens absorvidos.
    ///
    /// Retorna o sistema sobrevivente. Itens que já compartilham sistema não
    /// mudam.
    pub fn merge_systems(&mut self, a: ItemId, b: ItemId) -> FactoryResult<SystemId> {
        let survivor_id = self.items.get(&a).ok_or(FactoryError::UnknownItem(a))?.system;
        let absorbed_id = self.items.get(&b).ok_or(FactoryError::UnknownItem(b))?.system;
        if survivor_id == absorbed_id {
            return Ok(survivor_id);
        }

        if !self.systems.contains(survivor_id) {
            return Err(FactoryError::UnknownSystem(survivor_id));
        }
        let absorbed = self
            .systems
            .remove(absorbed_id)
            .ok_or(FactoryError::UnknownSystem(absorbed_id))?;
        let survivor = self
            .systems
            .get_mut(survivor_id)
            .ok_or(FactoryError::UnknownSystem(survivor_id))?;

        let offset = survivor.qubits();
        survivor.merge(&absorbed);
        let qubits = survivor.qubits();

        for item in self.items.values_mut().filter(|i| i.system == absorbed_id) {
            item.system = survivor_id;
            item.qubit += offset;
        }

        debug!(%survivor_id, %absorbed_id, offset, qubits, "merged quantum systems");
        Ok(survivor_id)
    }

    /// Itens cuja posição arredondada é `cell`, em ordem de id
    pub fn items_at(&self, cell: Cell) -> Vec<&Item> {
        self.items.values().filter(|item| item.cell() == cell).collect()
    }

    /// Recalcula a ocupação por célula
    pub fn refresh_occupancy(&mut self) {
        self.occupancy.clear();
        for item in self.items.values() {
            *self.occupancy.entry(item.cell()).or_default() += 1;
        }
    }

    /// Último snapshot de ocupação
    pub fn occupancy(&self) -> &HashMap<Cell, usize> {
        &self.occupancy
    }

    pub fn occupancy_at(&self, cell: Cell) -> usize {
        self.occupancy.get(&cell).copied().unwrap_or(0)
    }

    /// Células com mais de um item no último snapshot, ordenadas
    pub fn congested_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .occupancy
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(cell, _)| *cell)
            .collect();
        cells.sort();
        cells
    }

    /// Passo de movimento de um tick.
    ///
    /// Itens assentados consultam o `router`; um `Move` só é aceito se a
    /// célula destino tiver menos reservas (itens assentados ali ou a caminho)
    /// que `router.capacity(dest)`. Itens em voo avançam `speed * dt` e, ao
    /// chegar, encaixam exatamente na célula alvo.
    pub fn update<R: Router + ?Sized>(&mut self, dt: Duration, router: &mut R) -> UpdateReport {
        let dt_secs = dt.as_secs_f64();
        let epsilon = self.settle_epsilon;
        let mut report = UpdateReport::default();

        let mut claims: HashMap<Cell, usize> = HashMap::new();
        for item in self.items.values() {
            *claims.entry(item.target.unwrap_or_else(|| item.cell())).or_default() += 1;
        }

        for item in self.items.values_mut() {
            if item.target.is_none() && item.snap_if_settled(epsilon) {
                let cell = item.cell();
                match router.route(item, cell, &mut self.systems) {
                    Route::Move(dir) => {
                        let dest = cell.step(dir);
                        let taken = claims.get(&dest).copied().unwrap_or(0);
                        if taken < router.capacity(dest) {
                            item.target = Some(dest);
                            *claims.entry(dest).or_default() += 1;
                            if let Some(count) = claims.get_mut(&cell) {
                                *count = count.saturating_sub(1);
                            }
                            report.departed += 1;
                        } else {
                            trace!(item = %item.id, %cell, %dest, "move blocked");
                            report.blocked += 1;
                        }
                    }
                    Route::Hold => {}
                    Route::Remove => {
                        report.removed.push(item.id);
                        continue;
                    }
                }
            }

            if let Some(target) = item.target {
                let (tx, ty) = (target.x as f64, target.y as f64);
                let (dx, dy) = (tx - item.x, ty - item.y);
                let dist = dx.hypot(dy);
                let step = item.speed * dt_secs;
                if dist <= step {
                    item.x = tx;
                    item.y = ty;
                    item.target = None;
                    item.visit = None;
                    report.arrived.push(item.id);
                } else {
                    item.x += dx / dist * step;
                    item.y += dy / dist * step;
                }
            }
        }

        for id in &report.removed {
            // o id veio do próprio mapa nesta passada
            let _ = self.destroy(*id);
        }

        report
    }
}
