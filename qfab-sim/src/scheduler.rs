//! Tick loop de passo fixo
//!
//! Acumula o tempo de frame e executa passos inteiros de `tick_ms`, limitado
//! a `max_burst_ticks` por avanço (o excesso conta como perdido). A fração
//! que sobra fica em `alpha` para interpolação do render.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::content::LevelData;
use crate::world::{SimulationWorld, StepReport};

/// Estado do loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

/// Resultado de um avanço de frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Ticks executados neste avanço
    pub ticks: u32,
    /// Ticks descartados pelo limite de burst
    pub missed: u64,
    /// Fração do próximo tick já acumulada, em [0, 1)
    pub alpha: f64,
}

/// Estatísticas do loop
#[derive(Debug, Clone)]
pub struct LoopStats {
    pub tick_count: u64,
    pub missed_ticks: u64,
    pub tick_interval: Duration,
    pub avg_execution_time: Duration,
    pub min_execution_time: Duration,
    pub max_execution_time: Duration,
}

/// Identificador de observador registrado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&StepReport, &SimulationWorld)>;

/// Loop dono do mundo e dos observadores de tick
pub struct TickLoop {
    world: SimulationWorld,
    interval: Duration,
    max_burst: u32,
    accumulator: Duration,
    state: LoopState,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
    last_tick: Option<Instant>,
    tick_count: u64,
    missed_ticks: u64,
    total_execution_time: Duration,
    min_execution_time: Option<Duration>,
    max_execution_time: Option<Duration>,
}

impl TickLoop {
    /// Cria loop em execução com os parâmetros de tempo do mundo
    pub fn new(world: SimulationWorld) -> Self {
        let interval = world.config().tick();
        let max_burst = world.config().max_burst_ticks;
        Self {
            world,
            interval,
            max_burst,
            accumulator: Duration::ZERO,
            state: LoopState::Running,
            observers: Vec::new(),
            next_observer: 0,
            last_tick: None,
            tick_count: 0,
            missed_ticks: 0,
            total_execution_time: Duration::ZERO,
            min_execution_time: None,
            max_execution_time: None,
        }
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimulationWorld {
        &mut self.world
    }

    pub fn into_world(self) -> SimulationWorld {
        self.world
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Só roda em `Running` e sem pausa no ledger do mundo
    fn is_live(&self) -> bool {
        self.state == LoopState::Running && !self.world.is_paused()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registra um observador chamado após cada tick
    pub fn on_tick<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&StepReport, &SimulationWorld) + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    /// Avança o relógio em `frame_dt` e executa os ticks devidos
    pub fn advance(&mut self, frame_dt: Duration) -> FrameInfo {
        if !self.is_live() {
            self.accumulator = Duration::ZERO;
            return FrameInfo {
                ticks: 0,
                missed: 0,
                alpha: self.alpha(),
            };
        }

        self.accumulator += frame_dt;
        let due = (self.accumulator.as_nanos() / self.interval.as_nanos()) as u64;
        let ticks = due.min(u64::from(self.max_burst)) as u32;
        let missed = due - u64::from(ticks);

        for _ in 0..ticks {
            self.tick_once();
        }

        // o excesso de burst é descartado junto com os ticks perdidos
        self.accumulator = self
            .accumulator
            .saturating_sub(self.interval * u32::try_from(due).unwrap_or(u32::MAX));
        if missed > 0 {
            self.missed_ticks += missed;
            debug!(missed, "tick burst clamped");
        }

        FrameInfo {
            ticks,
            missed,
            alpha: self.alpha(),
        }
    }

    /// Executa um único tick, ignorando o acumulador
    pub fn tick_once(&mut self) -> StepReport {
        let start = Instant::now();
        let report = self.world.step();
        self.record_execution_time(start.elapsed());
        self.tick_count += 1;
        self.last_tick = Some(Instant::now());

        for (_, observer) in self.observers.iter_mut() {
            observer(&report, &self.world);
        }
        report
    }

    /// Executa `ticks` passos sem esperar o relógio
    pub fn run_headless(&mut self, ticks: u64) -> Vec<StepReport> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            if !self.is_live() {
                break;
            }
            reports.push(self.tick_once());
        }
        reports
    }

    /// Executa até `ticks` passos em taxa fixa, dormindo entre eles
    pub fn run_realtime(&mut self, ticks: u64) -> Vec<StepReport> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            if !self.is_live() {
                break;
            }
            if let Some(last) = self.last_tick {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    std::thread::sleep(self.interval - elapsed);
                } else if elapsed > self.interval * 2 {
                    let missed = (elapsed.as_secs_f64() / self.interval.as_secs_f64()) as u64 - 1;
                    self.missed_ticks += missed;
                }
            }
            reports.push(self.tick_once());
        }
        reports
    }

    /// Pausa e descarta o tempo acumulado
    pub fn pause(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
            self.accumulator = Duration::ZERO;
        }
    }

    /// Retoma sem compensar o tempo pausado
    pub fn resume(&mut self) {
        if self.state == LoopState::Paused {
            self.state = LoopState::Running;
            self.accumulator = Duration::ZERO;
            self.last_tick = None;
        }
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.accumulator = Duration::ZERO;
    }

    /// Para, limpa itens e sistemas, carrega o nível e volta a rodar
    pub fn reload(&mut self, level: LevelData) {
        self.stop();
        self.world.load_level(level);
        self.last_tick = None;
        self.state = LoopState::Running;
        info!(tick = self.world.tick(), "level reloaded");
    }

    /// Fração do próximo tick acumulada
    pub fn alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.interval.as_secs_f64()
    }

    fn record_execution_time(&mut self, duration: Duration) {
        self.total_execution_time += duration;
        if self.min_execution_time.is_none_or(|min| duration < min) {
            self.min_execution_time = Some(duration);
        }
        if self.max_execution_time.is_none_or(|max| duration > max) {
            self.max_execution_time = Some(duration);
        }
    }

    pub fn stats(&self) -> LoopStats {
        let avg_execution_time = if self.tick_count > 0 {
            self.total_execution_time / self.tick_count as u32
        } else {
            Duration::ZERO
        };

        LoopStats {
            tick_count: self.tick_count,
            missed_ticks: self.missed_ticks,
            tick_interval: self.interval,
            avg_execution_time,
            min_execution_time: self.min_execution_time.unwrap_or(Duration::ZERO),
            max_execution_time: self.max_execution_time.unwrap_or(Duration::ZERO),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn missed_ticks(&self) -> u64 {
        self.missed_ticks
    }
}
