//! # 🏭 qfab-factory — Grid e Itens da Fábrica
//!
//! Chão de fábrica esparso ([`Grid`]) e o [`ItemRegistry`]: itens que andam
//! célula a célula sobre as esteiras, cada um carregando um qubit de um
//! [`QuantumSystem`](qfab_quantum::QuantumSystem) possivelmente compartilhado.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          ItemRegistry                           │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Items (id → posição, alvo, qubit)        │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  SystemTable (id → QuantumSystem)         │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Router → Move / Hold / Remove            │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! O registro não conhece tiles: quem decide para onde cada item vai é o
//! [`Router`] passado para [`ItemRegistry::update`].

pub mod error;
pub mod grid;
pub mod items;

pub use error::{FactoryError, FactoryResult};
pub use grid::{Cell, Direction, Grid, Tile, TileKind};
pub use items::{
    DEFAULT_ITEM_SPEED, Item, ItemId, ItemRegistry, Route, Router, SETTLE_EPSILON, SystemTable,
    TileVisit, UpdateReport,
};
