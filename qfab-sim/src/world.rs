//! Mundo de simulação: grid, itens, gates, ledger e o passo fixo
//!
//! Ordem de um tick:
//! 1. spawn pelo timer global (todas as fontes juntas)
//! 2. resolução de gates controlados com dois itens na mesma célula
//! 3. movimento + efeitos por tile via [`TileRouter`]

use qfab_factory::{Cell, Direction, Grid, ItemId, ItemRegistry, Tile, TileKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::content::{GateBehavior, GateRegistry, LevelData, build_cost, build_tile};
use crate::error::{SimError, SimResult};
use crate::inspector::{self, Inspection};
use crate::ledger::{Contract, GameState, ScoreStore};
use crate::routing::{RoutingTally, TileRouter};

/// Resumo de um tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Número do tick executado (começa em 1)
    pub tick: u64,
    pub spawned: Vec<ItemId>,
    /// Gates controlados aplicados
    pub controlled_applied: usize,
    /// Pares pulados (sistemas multi-qubit ou qubits não adjacentes)
    pub controlled_skipped: usize,
    pub gates_applied: usize,
    pub measurements: usize,
    pub delivered: usize,
    pub rejected: usize,
    pub scanned: usize,
    pub blocked: usize,
    pub removed: usize,
}

impl StepReport {
    fn absorb(&mut self, tally: RoutingTally) {
        self.gates_applied += tally.gates_applied;
        self.measurements += tally.measurements;
        self.delivered += tally.delivered;
        self.rejected += tally.rejected;
        self.scanned += tally.scanned;
    }
}

/// Fotografia do estado agregado entre ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub tick: u64,
    pub items: usize,
    pub systems: usize,
    pub credits: u64,
    pub score: u64,
    pub contract: Option<Contract>,
    pub scans: [u64; 2],
    pub congested: Vec<Cell>,
}

/// Todo o estado mutável da simulação
pub struct SimulationWorld {
    config: SimConfig,
    grid: Grid,
    items: ItemRegistry,
    gates: GateRegistry,
    store: Box<dyn ScoreStore>,
    level: Option<LevelData>,
    splitter_toggles: HashMap<Cell, bool>,
    spawn_timer: Duration,
    rng: StdRng,
    tick: u64,
}

impl SimulationWorld {
    /// Cria mundo vazio com a biblioteca padrão de gates e ledger em memória
    pub fn new(config: SimConfig) -> SimResult<Self> {
        Self::with_gates(config, GateRegistry::standard())
    }

    pub fn with_gates(config: SimConfig, gates: GateRegistry) -> SimResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            grid: Grid::new(),
            items: ItemRegistry::new(config.item_speed, config.settle_epsilon),
            gates,
            store: Box::new(GameState::new(config.starting_credits)),
            level: None,
            splitter_toggles: HashMap::new(),
            spawn_timer: Duration::ZERO,
            rng,
            tick: 0,
            config,
        })
    }

    /// Substitui o ledger
    pub fn with_store(mut self, store: Box<dyn ScoreStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Acesso direto ao grid, sem custo nem verificação de trava
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemRegistry {
        &mut self.items
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    pub fn store(&self) -> &dyn ScoreStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn ScoreStore {
        self.store.as_mut()
    }

    pub fn level(&self) -> Option<&LevelData> {
        self.level.as_ref()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Pausa vinda do ledger (`ScoreStore::is_paused`)
    pub fn is_paused(&self) -> bool {
        self.store.is_paused()
    }

    // =========================================================================
    // Nível e edição
    // =========================================================================

    /// Limpa grid, itens e sistemas e carrega o layout do nível
    pub fn load_level(&mut self, level: LevelData) {
        self.clear();
        self.grid.clear();
        for tile in &level.layout {
            self.grid.set(tile.cell(), tile.to_tile());
        }
        self.store
            .set_contract(level.contract.as_ref().map(Contract::from_spec));
        info!(
            tiles = level.layout.len(),
            sources = self.grid.sources().len(),
            contract = level.contract.as_ref().map_or("none", |c| c.id.as_str()),
            "level loaded"
        );
        self.level = Some(level);
    }

    /// Remove todos os itens e sistemas e zera o estado por tick
    pub fn clear(&mut self) {
        self.items.destroy_all();
        self.splitter_toggles.clear();
        self.spawn_timer = Duration::ZERO;
    }

    /// Constrói `build_id` em `cell`, debitando o custo.
    ///
    /// Retorna o custo pago.
    pub fn place(&mut self, cell: Cell, build_id: &str, facing: Direction) -> SimResult<u64> {
        if self.grid.get(cell).is_some_and(|t| t.locked) {
            return Err(SimError::LockedCell(cell));
        }
        if let Some(level) = &self.level {
            if !level.allows_build(build_id) {
                return Err(SimError::BuildUnavailable(build_id.to_string()));
            }
        }

        let tile = build_tile(build_id, facing, &self.gates)?;
        let cost = build_cost(build_id, &self.gates);
        if !self.store.spend_credits(cost) {
            return Err(SimError::InsufficientCredits {
                needed: cost,
                available: self.store.credits(),
            });
        }

        self.grid.set(cell, tile);
        debug!(%cell, build = build_id, %facing, cost, "placed");
        Ok(cost)
    }

    /// Remove o tile de `cell` (sem reembolso)
    pub fn erase(&mut self, cell: Cell) -> SimResult<Option<Tile>> {
        if self.grid.get(cell).is_some_and(|t| t.locked) {
            return Err(SimError::LockedCell(cell));
        }
        Ok(self.grid.remove(cell))
    }

    /// Spawn manual fora do timer
    pub fn spawn_at(&mut self, cell: Cell) -> ItemId {
        self.items.spawn(cell)
    }

    pub fn inspect(&self, cell: Cell) -> Inspection {
        inspector::inspect(self.grid.get(cell), &self.items, cell)
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            tick: self.tick,
            items: self.items.len(),
            systems: self.items.systems().len(),
            credits: self.store.credits(),
            score: self.store.score(),
            contract: self.store.contract().cloned(),
            scans: self.store.scan_tallies(),
            congested: self.items.congested_cells(),
        }
    }

    // =========================================================================
    // Passo
    // =========================================================================

    /// Executa um tick de duração `config.tick_ms`
    pub fn step(&mut self) -> StepReport {
        if self.store.is_paused() {
            return StepReport {
                tick: self.tick,
                ..Default::default()
            };
        }

        let dt = self.config.tick();
        self.tick += 1;
        let mut report = StepReport {
            tick: self.tick,
            ..Default::default()
        };

        self.spawn_timer += dt;
        if self.spawn_timer >= self.config.spawn_interval() {
            for cell in self.grid.sources() {
                report.spawned.push(self.items.spawn(cell));
            }
            self.spawn_timer = Duration::ZERO;
        }

        self.items.refresh_occupancy();
        self.resolve_controlled_gates(&mut report);

        let mut router = TileRouter {
            grid: &self.grid,
            gates: &self.gates,
            store: self.store.as_mut(),
            toggles: &mut self.splitter_toggles,
            rng: &mut self.rng,
            tally: RoutingTally::default(),
        };
        let update = self.items.update(dt, &mut router);
        let tally = router.tally;
        report.absorb(tally);
        report.blocked = update.blocked;
        report.removed = update.removed.len();

        self.items.refresh_occupancy();
        self.store.advance_tick();
        report
    }

    /// Executa `ticks` passos e devolve os relatórios
    pub fn run(&mut self, ticks: u64) -> Vec<StepReport> {
        (0..ticks).map(|_| self.step()).collect()
    }

    /// Células com impressora de gate controlado, em ordem
    fn controlled_cells(&self) -> Vec<(Cell, String)> {
        let mut cells: Vec<(Cell, String)> = self
            .grid
            .iter()
            .filter(|(_, tile)| tile.kind == TileKind::Printer)
            .filter_map(|(cell, tile)| {
                let id = tile.gate_id.as_ref()?;
                match self.gates.get(id)?.behavior {
                    GateBehavior::Controlled { .. } => Some((cell, id.clone())),
                    _ => None,
                }
            })
            .collect();
        cells.sort();
        cells
    }

    /// Aplica gates controlados onde há dois itens assentados não processados.
    ///
    /// Controle e alvo saem da ordem (x, y, id). Sistemas distintos só são
    /// fundidos quando ambos têm um qubit; os índices precisam ser adjacentes.
    /// Os dois itens ficam marcados para a visita mesmo quando o gate é pulado.
    fn resolve_controlled_gates(&mut self, report: &mut StepReport) {
        let epsilon = self.items.settle_epsilon();

        for (cell, gate_id) in self.controlled_cells() {
            let mut waiting: Vec<(f64, f64, ItemId)> = self
                .items
                .items_at(cell)
                .into_iter()
                .filter(|item| item.is_settled(epsilon) && item.visit_at(cell).is_none())
                .map(|item| (item.x, item.y, item.id))
                .collect();
            if waiting.len() < 2 {
                continue;
            }
            waiting.sort_by(|a, b| {
                a.0.total_cmp(&b.0)
                    .then(a.1.total_cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });
            let (control, target) = (waiting[0].2, waiting[1].2);

            match self.apply_controlled(&gate_id, control, target) {
                Ok(true) => report.controlled_applied += 1,
                Ok(false) => report.controlled_skipped += 1,
                Err(err) => {
                    warn!(%cell, gate = %gate_id, %err, "controlled gate failed");
                    report.controlled_skipped += 1;
                }
            }

            for id in [control, target] {
                if let Some(item) = self.items.get_mut(id) {
                    item.mark_visited(cell, None);
                }
            }
        }
    }

    /// Retorna `Ok(false)` quando o par é pulado
    fn apply_controlled(&mut self, gate_id: &str, control: ItemId, target: ItemId) -> SimResult<bool> {
        let (control_system, target_system) = match (self.items.get(control), self.items.get(target)) {
            (Some(c), Some(t)) => (c.system, t.system),
            _ => return Ok(false),
        };

        if control_system != target_system {
            let single = |id| self.items.systems().get(id).is_some_and(|s| s.qubits() == 1);
            if !(single(control_system) && single(target_system)) {
                debug!(%control, %target, "skipping controlled gate across multi-qubit systems");
                return Ok(false);
            }
            self.items.merge_systems(control, target)?;
        }

        let (system, qc, qt) = match (self.items.get(control), self.items.get(target)) {
            (Some(c), Some(t)) => (c.system, c.qubit, t.qubit),
            _ => return Ok(false),
        };
        if qc.abs_diff(qt) != 1 {
            debug!(%control, %target, qc, qt, "skipping controlled gate on non-adjacent qubits");
            return Ok(false);
        }

        let operator = self
            .gates
            .controlled_operator(gate_id, qc < qt)
            .ok_or_else(|| SimError::UnknownGate(gate_id.to_string()))?;
        let state = self
            .items
            .systems_mut()
            .get_mut(system)
            .ok_or(qfab_factory::FactoryError::UnknownSystem(system))?;
        state.apply_gate(&operator, qc.min(qt))?;
        debug!(gate = gate_id, %control, %target, %system, "controlled gate applied");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContractSpec, ContractTarget, LevelTile};

    fn config() -> SimConfig {
        SimConfig {
            seed: Some(11),
            ..SimConfig::default()
        }
    }

    fn tile(x: i32, y: i32, kind: TileKind, direction: Option<Direction>) -> LevelTile {
        LevelTile {
            x,
            y,
            kind,
            direction,
            gate_id: None,
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let bad = SimConfig {
            tick_ms: 0,
            ..SimConfig::default()
        };
        assert!(SimulationWorld::new(bad).is_err());
    }

    #[test]
    fn test_load_level_locks_sources_and_sets_contract() {
        let mut world = SimulationWorld::new(config()).unwrap();
        world.spawn_at(Cell::new(7, 7));
        world.load_level(LevelData {
            layout: vec![
                tile(0, 0, TileKind::Source, Some(Direction::East)),
                tile(3, 0, TileKind::Sink, None),
            ],
            goal: None,
            contract: Some(ContractSpec {
                id: "c".into(),
                goal: String::new(),
                target: ContractTarget::Zero,
                required: 2,
                reward_per_unit: 3,
            }),
            available_builds: vec![],
        });
        assert!(world.items().is_empty());
        assert!(world.grid().get(Cell::new(0, 0)).unwrap().locked);
        assert_eq!(world.store().contract().unwrap().required, 2);
    }

    #[test]
    fn test_place_and_erase() {
        let mut world = SimulationWorld::new(config()).unwrap();
        world.load_level(LevelData {
            layout: vec![tile(0, 0, TileKind::Source, Some(Direction::East))],
            available_builds: vec!["conveyor".into(), "cnot".into()],
            ..Default::default()
        });

        assert_eq!(world.place(Cell::new(1, 0), "conveyor", Direction::East).unwrap(), 1);
        assert_eq!(world.store().credits(), 99);
        assert!(matches!(
            world.place(Cell::new(0, 0), "conveyor", Direction::East),
            Err(SimError::LockedCell(_))
        ));
        assert!(matches!(
            world.place(Cell::new(2, 0), "h", Direction::East),
            Err(SimError::BuildUnavailable(_))
        ));

        assert!(world.erase(Cell::new(1, 0)).unwrap().is_some());
        assert!(world.erase(Cell::new(0, 0)).is_err());
    }

    #[test]
    fn test_place_without_credits() {
        let mut world = SimulationWorld::new(SimConfig {
            starting_credits: 5,
            ..config()
        })
        .unwrap();
        let err = world.place(Cell::new(0, 0), "cnot", Direction::East).unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientCredits {
                needed: 12,
                available: 5
            }
        ));
        assert!(world.grid().is_empty());
    }

    #[test]
    fn test_global_spawn_timer() {
        let mut world = SimulationWorld::new(SimConfig {
            spawn_interval_ms: 300,
            ..config()
        })
        .unwrap();
        world.load_level(LevelData {
            layout: vec![
                tile(0, 0, TileKind::Source, None),
                tile(0, 5, TileKind::Source, None),
            ],
            ..Default::default()
        });

        let spawned: Vec<usize> = world.run(6).iter().map(|r| r.spawned.len()).collect();
        assert_eq!(spawned, vec![0, 0, 2, 0, 0, 2]);
    }

    #[test]
    fn test_paused_ledger_freezes_world() {
        let mut state = GameState::new(100);
        state.toggle_pause();
        let mut world = SimulationWorld::new(config())
            .unwrap()
            .with_store(Box::new(state));
        world.load_level(LevelData {
            layout: vec![
                tile(0, 0, TileKind::Conveyor, Some(Direction::East)),
                tile(1, 0, TileKind::Conveyor, Some(Direction::East)),
                tile(2, 0, TileKind::Conveyor, Some(Direction::East)),
            ],
            ..Default::default()
        });
        let id = world.spawn_at(Cell::new(0, 0));

        let reports = world.run(5);
        assert!(world.is_paused());
        assert!(reports.iter().all(|r| r.tick == 0 && r.spawned.is_empty()));
        assert_eq!(world.tick(), 0);
        assert_eq!(world.store().tick(), 0);
        assert_eq!(world.items().get(id).unwrap().x, 0.0);

        world.store_mut().set_paused(false);
        world.run(5);
        assert_eq!(world.tick(), 5);
        assert!(world.items().get(id).unwrap().x > 0.0);
    }

    #[test]
    fn test_step_advances_ledger_tick() {
        let mut world = SimulationWorld::new(config()).unwrap();
        world.run(3);
        assert_eq!(world.tick(), 3);
        assert_eq!(world.store().tick(), 3);
        assert_eq!(world.summary().tick, 3);
    }
}
