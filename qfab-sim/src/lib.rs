//! # 🧪 qfab-sim — Mundo de Simulação da Fábrica Quântica
//!
//! Junta o grid e o registro de itens de `qfab-factory` com os sistemas de
//! `qfab-quantum` num único [`SimulationWorld`], avançado em passos fixos pelo
//! [`TickLoop`].
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          TickLoop (acumulador + observadores)   │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  SimulationWorld::step                    │  │
//! │  │   1. spawn (timer global)                 │  │
//! │  │   2. gates controlados                    │  │
//! │  │   3. TileRouter → ItemRegistry::update    │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  ScoreStore (contrato, créditos, score)   │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```
//! use qfab_sim::{LevelData, SimConfig, SimulationWorld};
//!
//! let level = LevelData::from_toml_str(r#"
//!     [[layout]]
//!     x = 0
//!     y = 0
//!     kind = "source"
//!     direction = "east"
//! "#).unwrap();
//!
//! let config = SimConfig { seed: Some(7), ..SimConfig::default() };
//! let mut world = SimulationWorld::new(config).unwrap();
//! world.load_level(level);
//! world.run(10);
//! assert_eq!(world.items().len(), 1);
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod inspector;
pub mod ledger;
pub mod routing;
pub mod scheduler;
pub mod world;

pub use config::SimConfig;
pub use content::{
    ContractSpec, ContractTarget, GateBehavior, GateDefinition, GateRegistry, LevelData, LevelTile,
    build_cost, build_tile,
};
pub use error::{SimError, SimResult};
pub use inspector::{Classification, Inspection, ItemReport};
pub use ledger::{Contract, GameMode, GameState, ScoreStore};
pub use routing::{RoutingTally, TileRouter};
pub use scheduler::{FrameInfo, LoopState, LoopStats, ObserverId, TickLoop};
pub use world::{SimulationWorld, StepReport, WorldSummary};
