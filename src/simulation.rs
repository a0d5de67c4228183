use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use gulde_common::{Cell, CellExt, Position, convert};
use gulde_navigation::{
    CancellationToken, DestinationOutcome, PathEvent, Pathfinder, SharedGrid, Wait, WaitStatus,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::blackboard::{self, Blackboard, EntitySnapshot};
use crate::bus::Topic;
use crate::errands::Errands;
use crate::settings::SimConfig;

const TICK_TOPIC_CAPACITY: usize = 64;
const EVENT_TOPIC_CAPACITY: usize = 256;

/// Published once per fixed tick, after every pathfinder has moved.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub index: u64,
    pub dt: f32,
}

/// Something observable that happened to an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityEvent {
    Path { entity: String, event: PathEvent },
    Milestone {
        entity: String,
        destination: Cell,
        travelled: f32,
    },
    ErrandsDone { entity: String, legs: usize },
}

impl fmt::Display for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityEvent::Path {
                entity,
                event: PathEvent::DestinationChanged(cell),
            } => write!(f, "{} heads to ({}, {})", entity, cell.x, cell.y),
            EntityEvent::Path {
                entity,
                event: PathEvent::DestinationReached(cell),
            } => write!(f, "{} reached ({}, {})", entity, cell.x, cell.y),
            EntityEvent::Milestone {
                entity,
                destination,
                travelled,
            } => write!(
                f,
                "{} is {:.0}% of the way to ({}, {})",
                entity,
                travelled * 100.0,
                destination.x,
                destination.y
            ),
            EntityEvent::ErrandsDone { entity, legs } => {
                write!(f, "{} finished its errands ({} legs)", entity, legs)
            }
        }
    }
}

struct Entity {
    name: String,
    pathfinder: Arc<Mutex<Pathfinder>>,
    errands: Errands,
}

/// Final state of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReport {
    pub name: String,
    pub cell: Cell,
    pub position: Position,
    pub arrivals: u64,
    pub legs_completed: usize,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub ticks: u64,
    pub events_logged: usize,
    pub entities: Vec<EntityReport>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Simulation report ({} ticks, {} events)",
            self.ticks, self.events_logged
        )?;
        for entity in &self.entities {
            writeln!(
                f,
                "  {:<12} cell ({}, {})  position ({:.2}, {:.2})  arrivals {}  legs completed {}",
                entity.name,
                entity.cell.x,
                entity.cell.y,
                entity.position.x,
                entity.position.y,
                entity.arrivals,
                entity.legs_completed
            )?;
        }
        Ok(())
    }
}

/// Fixed-timestep host driving every entity's pathfinder.
pub struct Simulation {
    dt: f32,
    max_ticks: u64,
    tick_period: std::time::Duration,
    blackboard: Blackboard,
    entities: Vec<Entity>,
    ticks: Topic<Tick>,
    events: Topic<EntityEvent>,
    cancel: CancellationToken,
}

impl Simulation {
    /// Builds the grid and one pathfinder per configured entity.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let grid: SharedGrid = Arc::new(RwLock::new(config.build_grid()?));
        info!(map = %*grid.read(), "Map loaded");

        let blackboard = blackboard::new_blackboard(config.simulation.time_scale);
        let events: Topic<EntityEvent> = Topic::new(EVENT_TOPIC_CAPACITY);

        let mut entities = Vec::with_capacity(config.entities.len());
        for entity in &config.entities {
            let position = Arc::new(RwLock::new(entity.start_cell().to_position()));
            let mut pathfinder = Pathfinder::new(position, Some(Arc::clone(&grid)), entity.speed);

            let topic = events.clone();
            let name = entity.name.clone();
            pathfinder.subscribe(move |event| {
                topic.publish(EntityEvent::Path {
                    entity: name.clone(),
                    event: *event,
                });
            });

            let route = entity.route_cells();
            debug!(
                entity = %entity.name,
                route = ?convert::cells_to_tuples(&route),
                "Entity registered"
            );

            blackboard::update_entity(&blackboard, &entity.name, EntitySnapshot::of(&pathfinder));
            entities.push(Entity {
                name: entity.name.clone(),
                pathfinder: Arc::new(Mutex::new(pathfinder)),
                errands: Errands::from_route(&route, entity.announce_at),
            });
        }

        Ok(Self {
            dt: config.timestep(),
            max_ticks: config.simulation.max_ticks,
            tick_period: config.tick_period(),
            blackboard,
            entities,
            ticks: Topic::new(TICK_TOPIC_CAPACITY),
            events,
            cancel: CancellationToken::new(),
        })
    }

    #[cfg(test)]
    pub fn blackboard(&self) -> Blackboard {
        Arc::clone(&self.blackboard)
    }

    #[cfg(test)]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<EntityEvent>> {
        self.events.subscribe()
    }

    /// Runs until every errand runner finished or `max_ticks` elapsed.
    pub async fn run(self) -> Result<Report> {
        let Simulation {
            dt,
            max_ticks,
            tick_period,
            blackboard,
            mut entities,
            ticks,
            events,
            cancel,
        } = self;

        info!(entities = entities.len(), dt, max_ticks, "Simulation started");

        let logger = tokio::spawn(log_events(events.subscribe()));

        let mut runners = Vec::with_capacity(entities.len());
        for entity in &mut entities {
            let runner = ErrandRunner {
                name: entity.name.clone(),
                pathfinder: Arc::clone(&entity.pathfinder),
                errands: std::mem::take(&mut entity.errands),
                ticks: ticks.subscribe(),
                events: events.clone(),
                cancel: cancel.clone(),
            };
            runners.push(tokio::spawn(runner.run()));
        }
        debug!(subscribers = ticks.receiver_count(), "Tick topic ready");

        let tick = tick_loop(
            &entities,
            &blackboard,
            &ticks,
            &runners,
            dt,
            tick_period,
            max_ticks,
        )
        .await;

        // Wake runners still waiting for a tick
        cancel.cancel();
        drop(ticks);

        let mut legs_completed = Vec::with_capacity(runners.len());
        for runner in runners {
            legs_completed.push(runner.await.context("Errand runner panicked")??);
        }

        // Runners may have set a last destination after the final tick
        for entity in &entities {
            let snapshot = EntitySnapshot::of(&entity.pathfinder.lock());
            blackboard::update_entity(&blackboard, &entity.name, snapshot);
        }
        let world = blackboard::snapshot(&blackboard);

        let mut reports = Vec::with_capacity(entities.len());
        for (entity, legs_completed) in entities.iter().zip(legs_completed) {
            let snapshot = world
                .entities
                .get(&entity.name)
                .with_context(|| format!("Entity {} missing from blackboard", entity.name))?;
            reports.push(EntityReport {
                name: entity.name.clone(),
                cell: snapshot.cell,
                position: snapshot.position,
                arrivals: snapshot.arrivals,
                legs_completed,
            });
        }

        // The pathfinders' observers hold the last event senders
        drop(entities);
        drop(events);
        let events_logged = logger.await.context("Event logger panicked")??;

        debug!(tick = world.tick, entities = ?world.entities, "Final blackboard");
        info!(ticks = tick, events_logged, "Simulation finished");
        Ok(Report {
            ticks: tick,
            events_logged,
            entities: reports,
        })
    }
}

async fn tick_loop(
    entities: &[Entity],
    bb: &Blackboard,
    ticks: &Topic<Tick>,
    runners: &[JoinHandle<Result<usize>>],
    dt: f32,
    period: std::time::Duration,
    max_ticks: u64,
) -> u64 {
    info!("Tick loop started.");
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick = 0;

    loop {
        if runners.iter().all(JoinHandle::is_finished) {
            info!(tick, "All errand runners finished");
            break;
        }
        if tick >= max_ticks {
            warn!(max_ticks, "Tick limit reached, cancelling remaining errands");
            break;
        }

        ticker.tick().await;
        tick += 1;

        let time_scale = blackboard::time_scale(bb);
        for entity in entities {
            let mut pathfinder = entity.pathfinder.lock();
            pathfinder.fixed_update(time_scale, dt);
            let snapshot = EntitySnapshot::of(&pathfinder);
            if snapshot.moving {
                trace!(
                    entity = %entity.name,
                    x = snapshot.position.x,
                    y = snapshot.position.y,
                    travel_percentage = snapshot.travel_percentage,
                    "Entity moved"
                );
            }
            blackboard::update_entity(bb, &entity.name, snapshot);
        }
        blackboard::record_tick(bb, tick);
        ticks.publish(Tick { index: tick, dt });
    }

    tick
}

struct ErrandRunner {
    name: String,
    pathfinder: Arc<Mutex<Pathfinder>>,
    errands: Errands,
    ticks: broadcast::Receiver<Arc<Tick>>,
    events: Topic<EntityEvent>,
    cancel: CancellationToken,
}

impl ErrandRunner {
    fn drop_remaining(&mut self) {
        if !self.errands.is_empty() {
            debug!(entity = %self.name, dropped = self.errands.len(), "Dropping unwalked legs");
            self.errands.clear();
        }
    }

    /// Walks every leg in order. Returns the number of legs completed.
    async fn run(mut self) -> Result<usize> {
        info!(entity = %self.name, legs = self.errands.len(), "Errand runner started.");
        let mut completed = 0;

        while let Some(leg) = self.errands.next() {
            let (outcome, arrived, milestone) = {
                let mut pathfinder = self.pathfinder.lock();
                let outcome = pathfinder.set_destination(leg.destination);
                let arrived = pathfinder
                    .wait_for_destination_reached()
                    .with_cancellation(self.cancel.clone());
                let milestone = pathfinder
                    .wait_for_destination_reached_partly(leg.announce_at)
                    .with_cancellation(self.cancel.clone());
                (outcome, arrived, milestone)
            };
            debug!(entity = %self.name, destination = %leg.destination, ?outcome, "Leg started");

            let mut announced = !matches!(outcome, DestinationOutcome::Moving { .. });
            loop {
                if !announced && milestone.is_ready() {
                    announced = true;
                    let travelled = milestone.threshold();
                    info!(entity = %self.name, destination = %leg.destination, travelled, "Milestone reached");
                    self.events.publish(EntityEvent::Milestone {
                        entity: self.name.clone(),
                        destination: leg.destination,
                        travelled,
                    });
                }

                match arrived.poll() {
                    WaitStatus::Ready => break,
                    WaitStatus::Cancelled => {
                        info!(entity = %self.name, completed, "Errands cancelled");
                        self.drop_remaining();
                        return Ok(completed);
                    }
                    WaitStatus::Pending => {}
                }

                match self.ticks.recv().await {
                    Ok(tick) => {
                        trace!(entity = %self.name, tick = tick.index, dt = tick.dt, "Tick received");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(entity = %self.name, "Tick receiver lagged by {} ticks", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(entity = %self.name, completed, "Tick topic closed");
                        self.drop_remaining();
                        return Ok(completed);
                    }
                }
            }

            completed += 1;
            if let Some(next) = self.errands.peek() {
                trace!(entity = %self.name, next = %next.destination, "Next leg queued");
            }
        }

        self.events.publish(EntityEvent::ErrandsDone {
            entity: self.name.clone(),
            legs: completed,
        });
        info!(entity = %self.name, completed, "Errand runner finished.");
        Ok(completed)
    }
}

async fn log_events(mut events: broadcast::Receiver<Arc<EntityEvent>>) -> Result<usize> {
    info!("Event logger started.");
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                logged += 1;
                info!("{}", event);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event logger lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    Ok(logged)
}
