//! Roteamento por tile: efeitos de um item por visita e direção de saída
//!
//! O [`TileRouter`] é o callback passado para
//! [`ItemRegistry::update`](qfab_factory::ItemRegistry::update). Cada item
//! assentado recebe o efeito do tile onde está (gate, medição, pontuação...)
//! uma única vez por visita; a marca de visita fica no próprio item e some
//! quando ele chega na próxima célula.

use qfab_factory::{Cell, Direction, Grid, Item, Route, Router, SystemTable, Tile, TileKind};
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

use crate::content::{GateBehavior, GateRegistry};
use crate::ledger::ScoreStore;

/// Contadores de efeitos aplicados pelo roteador
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingTally {
    /// Gates unitários aplicados
    pub gates_applied: usize,
    /// Medições (impressora de medição, detector, scanner)
    pub measurements: usize,
    /// Entregas aceitas pelo contrato
    pub delivered: usize,
    /// Itens consumidos por sorvedouro sem bater o contrato
    pub rejected: usize,
    /// Itens lidos por scanner
    pub scanned: usize,
}

/// Roteador que lê o grid e aplica os efeitos dos tiles
pub struct TileRouter<'a> {
    pub grid: &'a Grid,
    pub gates: &'a GateRegistry,
    pub store: &'a mut dyn ScoreStore,
    /// Estado alternado de cada splitter
    pub toggles: &'a mut HashMap<Cell, bool>,
    pub rng: &'a mut StdRng,
    pub tally: RoutingTally,
}

impl<'a> TileRouter<'a> {
    /// Encaminha pela direção do tile ou, sem direção, para a primeira
    /// esteira vizinha na ordem leste, oeste, norte, sul
    fn forward(&self, cell: Cell, tile: &Tile) -> Route {
        if let Some(dir) = tile.direction {
            return Route::Move(dir);
        }
        Direction::SEARCH_ORDER
            .into_iter()
            .find(|dir| self.grid.is_conveyor(cell.step(*dir)))
            .map_or(Route::Hold, Route::Move)
    }

    fn printer(&mut self, item: &mut Item, cell: Cell, tile: &Tile, systems: &mut SystemTable) -> Route {
        let gates = self.gates;
        let Some(gate) = tile.gate_id.as_deref().and_then(|id| gates.get(id)) else {
            return self.forward(cell, tile);
        };

        match &gate.behavior {
            GateBehavior::Classical => {}
            GateBehavior::Unitary { .. } => {
                if item.visit_at(cell).is_none() {
                    if let (Some(op), Some(system)) =
                        (gates.operator(&gate.id), systems.get_mut(item.system))
                    {
                        match system.apply_gate(op, item.qubit) {
                            Ok(()) => {
                                self.tally.gates_applied += 1;
                                trace!(item = %item.id, gate = %gate.id, %cell, "gate applied");
                            }
                            Err(err) => warn!(item = %item.id, gate = %gate.id, %err, "gate rejected"),
                        }
                    }
                    item.mark_visited(cell, None);
                }
            }
            GateBehavior::Measurement => {
                if item.visit_at(cell).is_none() {
                    if let Some(system) = systems.get_mut(item.system) {
                        system.measure_and_collapse(&mut *self.rng);
                        self.tally.measurements += 1;
                    }
                    item.mark_visited(cell, None);
                }
            }
            GateBehavior::Controlled { .. } => {
                // espera o par; a resolução do gate marca a visita
                if item.visit_at(cell).is_none() {
                    return Route::Hold;
                }
            }
        }
        self.forward(cell, tile)
    }

    fn sink(&mut self, item: &Item, cell: Cell, systems: &SystemTable) -> Route {
        let excitation = systems
            .get(item.system)
            .map_or(0.0, |s| s.qubit_excitation_probability(item.qubit));

        let reward = self
            .store
            .contract()
            .filter(|c| c.target.accepts(excitation))
            .map(|c| c.reward_per_unit);

        match reward {
            Some(reward) => {
                self.store.record_delivery();
                self.store.add_credits(reward);
                self.store.add_score(1);
                self.tally.delivered += 1;
                debug!(item = %item.id, %cell, excitation, reward, "delivery accepted");
            }
            None => {
                self.tally.rejected += 1;
                debug!(item = %item.id, %cell, excitation, "delivery rejected");
            }
        }
        Route::Remove
    }

    fn scanner(&mut self, item: &Item, systems: &mut SystemTable) -> Route {
        if let Some(system) = systems.get_mut(item.system) {
            let outcome = system.measure_and_collapse(&mut *self.rng);
            let bit = system.bit_of(outcome, item.qubit);
            self.store.record_scan(bit);
            self.tally.measurements += 1;
            self.tally.scanned += 1;
            trace!(item = %item.id, bit, "scanned");
        }
        Route::Remove
    }

    fn detector(&mut self, item: &mut Item, cell: Cell, tile: &Tile, systems: &mut SystemTable) -> Route {
        if let Some(exit) = item.visit_at(cell).and_then(|v| v.exit) {
            return Route::Move(exit);
        }
        let Some(system) = systems.get_mut(item.system) else {
            return Route::Hold;
        };
        let outcome = system.measure_and_collapse(&mut *self.rng);
        let bit = system.bit_of(outcome, item.qubit);
        self.tally.measurements += 1;

        let facing = tile.direction.unwrap_or(Direction::East);
        let exit = if bit == 0 { facing } else { facing.rotate_cw() };
        item.mark_visited(cell, Some(exit));
        trace!(item = %item.id, %cell, bit, %exit, "detector routed");
        Route::Move(exit)
    }

    fn splitter(&mut self, item: &mut Item, cell: Cell, tile: &Tile) -> Route {
        if let Some(exit) = item.visit_at(cell).and_then(|v| v.exit) {
            return Route::Move(exit);
        }
        let facing = tile.direction.unwrap_or(Direction::East);
        let toggle = self.toggles.entry(cell).or_insert(false);
        let exit = if *toggle {
            facing.rotate_ccw()
        } else {
            facing.rotate_cw()
        };
        *toggle = !*toggle;
        item.mark_visited(cell, Some(exit));
        Route::Move(exit)
    }
}

impl Router for TileRouter<'_> {
    fn route(&mut self, item: &mut Item, cell: Cell, systems: &mut SystemTable) -> Route {
        let grid = self.grid;
        let Some(tile) = grid.get(cell) else {
            return Route::Hold;
        };

        match tile.kind {
            TileKind::Empty => Route::Hold,
            TileKind::Printer => self.printer(item, cell, tile, systems),
            TileKind::Sink => self.sink(item, cell, systems),
            TileKind::Scanner => self.scanner(item, systems),
            TileKind::Detector => self.detector(item, cell, tile, systems),
            TileKind::Splitter => self.splitter(item, cell, tile),
            TileKind::Merger | TileKind::Conveyor | TileKind::Source => self.forward(cell, tile),
        }
    }

    fn capacity(&self, cell: Cell) -> usize {
        controlled_capacity(self.grid, self.gates, cell).unwrap_or(1)
    }
}

/// Capacidade de uma impressora de gate controlado (`1 + control_count`)
pub fn controlled_capacity(grid: &Grid, gates: &GateRegistry, cell: Cell) -> Option<usize> {
    let tile = grid.get(cell).filter(|t| t.kind == TileKind::Printer)?;
    match gates.get(tile.gate_id.as_deref()?)?.behavior {
        GateBehavior::Controlled { control_count, .. } => Some(1 + control_count),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContractSpec, ContractTarget};
    use crate::ledger::{Contract, GameState};
    use qfab_factory::ItemRegistry;
    use rand::SeedableRng;

    struct Fixture {
        grid: Grid,
        gates: GateRegistry,
        state: GameState,
        toggles: HashMap<Cell, bool>,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: Grid::new(),
                gates: GateRegistry::standard(),
                state: GameState::new(0),
                toggles: HashMap::new(),
                rng: StdRng::seed_from_u64(3),
            }
        }

        fn router(&mut self) -> TileRouter<'_> {
            TileRouter {
                grid: &self.grid,
                gates: &self.gates,
                store: &mut self.state,
                toggles: &mut self.toggles,
                rng: &mut self.rng,
                tally: RoutingTally::default(),
            }
        }
    }

    #[test]
    fn test_empty_cell_holds() {
        let mut fx = Fixture::new();
        let mut reg = ItemRegistry::default();
        let id = reg.spawn(Cell::new(4, 4));
        let mut item = reg.get(id).unwrap().clone();
        let route = fx.router().route(&mut item, Cell::new(4, 4), reg.systems_mut());
        assert_eq!(route, Route::Hold);
    }

    #[test]
    fn test_conveyor_without_facing_searches_neighbours() {
        let mut fx = Fixture::new();
        let origin = Cell::new(0, 0);
        fx.grid.set(origin, Tile::new(TileKind::Conveyor));
        fx.grid.set(Cell::new(0, -1), Tile::conveyor(Direction::North));
        fx.grid.set(Cell::new(0, 1), Tile::conveyor(Direction::South));

        let mut reg = ItemRegistry::default();
        let id = reg.spawn(origin);
        let mut item = reg.get(id).unwrap().clone();
        // norte vem antes de sul na ordem de busca
        assert_eq!(
            fx.router().route(&mut item, origin, reg.systems_mut()),
            Route::Move(Direction::North)
        );
    }

    #[test]
    fn test_unitary_printer_applies_once_per_visit() {
        let mut fx = Fixture::new();
        let cell = Cell::new(1, 0);
        fx.grid.set(cell, Tile::printer("x", Direction::East));

        let mut reg = ItemRegistry::default();
        let id = reg.spawn(cell);
        let mut item = reg.get(id).unwrap().clone();
        let mut router = fx.router();
        for _ in 0..3 {
            assert_eq!(
                router.route(&mut item, cell, reg.systems_mut()),
                Route::Move(Direction::East)
            );
        }
        assert_eq!(router.tally.gates_applied, 1);
        let p = reg.systems().get(item.system).unwrap().qubit_excitation_probability(0);
        assert!((p - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_controlled_printer_holds_lone_item() {
        let mut fx = Fixture::new();
        let cell = Cell::new(2, 2);
        fx.grid.set(cell, Tile::printer("cnot", Direction::East));
        assert_eq!(fx.router().capacity(cell), 2);
        assert_eq!(fx.router().capacity(Cell::new(0, 0)), 1);

        let mut reg = ItemRegistry::default();
        let id = reg.spawn(cell);
        let mut item = reg.get(id).unwrap().clone();
        assert_eq!(fx.router().route(&mut item, cell, reg.systems_mut()), Route::Hold);

        item.mark_visited(cell, None);
        assert_eq!(
            fx.router().route(&mut item, cell, reg.systems_mut()),
            Route::Move(Direction::East)
        );
    }

    #[test]
    fn test_sink_scores_only_matching_items() {
        let mut fx = Fixture::new();
        let cell = Cell::new(5, 0);
        fx.grid.set(cell, Tile::new(TileKind::Sink).locked());
        fx.state.set_contract(Some(Contract::from_spec(&ContractSpec {
            id: "ones".into(),
            goal: String::new(),
            target: ContractTarget::One,
            required: 5,
            reward_per_unit: 7,
        })));

        let mut reg = ItemRegistry::default();
        let ground = reg.spawn(cell);
        let mut item = reg.get(ground).unwrap().clone();
        assert_eq!(fx.router().route(&mut item, cell, reg.systems_mut()), Route::Remove);
        assert_eq!(fx.state.credits(), 0);

        let excited = reg.spawn(cell);
        let mut item = reg.get(excited).unwrap().clone();
        let x = fx.gates.operator("x").unwrap().clone();
        reg.systems_mut().get_mut(item.system).unwrap().apply_gate(&x, 0).unwrap();
        assert_eq!(fx.router().route(&mut item, cell, reg.systems_mut()), Route::Remove);
        assert_eq!(fx.state.credits(), 7);
        assert_eq!(fx.state.score(), 1);
        assert_eq!(fx.state.contract().unwrap().delivered, 1);
    }

    #[test]
    fn test_scanner_tallies_and_removes() {
        let mut fx = Fixture::new();
        let cell = Cell::new(0, 3);
        fx.grid.set(cell, Tile::new(TileKind::Scanner));
        let mut reg = ItemRegistry::default();
        let id = reg.spawn(cell);
        let mut item = reg.get(id).unwrap().clone();
        assert_eq!(fx.router().route(&mut item, cell, reg.systems_mut()), Route::Remove);
        assert_eq!(fx.state.scan_tallies(), [1, 0]);
    }

    #[test]
    fn test_detector_exit_is_cached_for_the_visit() {
        let mut fx = Fixture::new();
        let cell = Cell::new(0, 0);
        fx.grid.set(cell, Tile::new(TileKind::Detector).facing(Direction::North));
        let mut reg = ItemRegistry::default();
        let id = reg.spawn(cell);
        let mut item = reg.get(id).unwrap().clone();
        let h = fx.gates.operator("h").unwrap().clone();
        reg.systems_mut().get_mut(item.system).unwrap().apply_gate(&h, 0).unwrap();

        let mut router = fx.router();
        let first = router.route(&mut item, cell, reg.systems_mut());
        let second = router.route(&mut item, cell, reg.systems_mut());
        assert_eq!(first, second);
        assert_eq!(router.tally.measurements, 1);
        assert!(matches!(
            first,
            Route::Move(Direction::North) | Route::Move(Direction::East)
        ));
    }

    #[test]
    fn test_splitter_alternates_and_caches() {
        let mut fx = Fixture::new();
        let cell = Cell::new(0, 0);
        fx.grid.set(cell, Tile::new(TileKind::Splitter).facing(Direction::East));
        let mut reg = ItemRegistry::default();
        let id = reg.spawn(cell);
        let template = reg.get(id).unwrap().clone();

        let mut router = fx.router();
        let mut exits = Vec::new();
        for _ in 0..4 {
            let mut item = template.clone();
            exits.push(router.route(&mut item, cell, reg.systems_mut()));
            // segunda consulta na mesma visita não alterna
            router.route(&mut item, cell, reg.systems_mut());
        }
        assert_eq!(
            exits,
            vec![
                Route::Move(Direction::South),
                Route::Move(Direction::North),
                Route::Move(Direction::South),
                Route::Move(Direction::North),
            ]
        );
    }
}
