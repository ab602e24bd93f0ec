//! Fixed-rate tick loop advancing every registered entity

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::util::time::{Timer, TICK_DURATION};

use super::world::GameWorld;

pub struct TickDriver {
    world: Arc<GameWorld>,
    tick: u64,
}

impl TickDriver {
    pub fn new(world: Arc<GameWorld>) -> Self {
        Self { world, tick: 0 }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advance the world by one tick
    pub fn step(&mut self) {
        let timer = Timer::new();
        self.world.tick_entities(self.tick);
        self.tick += 1;

        let elapsed = timer.elapsed();
        if elapsed > TICK_DURATION {
            warn!(
                tick = self.tick,
                elapsed_ms = elapsed.as_millis() as u64,
                entities = self.world.entity_count(),
                "Tick overran its budget"
            );
        }
    }

    /// Run the authoritative tick loop until `shutdown` flips to true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_ms = TICK_DURATION.as_millis() as u64, "Tick driver started");

        let mut tick_interval = interval(TICK_DURATION);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => self.step(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(tick = self.tick, "Tick driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Flammable;
    use crate::game::player::Player;
    use crate::game::world::World;
    use crate::game::Difficulty;
    use glam::DVec3;

    #[test]
    fn step_ticks_every_entity_once() {
        let world = Arc::new(GameWorld::new(Difficulty::Normal));
        let dyn_world: Arc<dyn World> = world.clone();
        let player = Arc::new(Player::new("alex", DVec3::ZERO, &dyn_world));
        world.add_entity(player.clone());
        player.set_on_fire(5);

        let mut driver = TickDriver::new(world);
        driver.step();
        driver.step();

        assert_eq!(driver.current_tick(), 2);
        assert_eq!(player.on_fire_ticks(), 3);
    }

    #[test]
    fn run_stops_on_shutdown() {
        let world = Arc::new(GameWorld::new(Difficulty::Normal));
        let (tx, rx) = watch::channel(false);

        tokio_test::block_on(async move {
            let handle = tokio::spawn(TickDriver::new(world).run(rx));
            tx.send(true).expect("driver alive");
            handle.await.expect("driver task");
        });
    }
}
