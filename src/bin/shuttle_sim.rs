//! Desktop shuttle simulation.
//!
//! Runs the full shuttle control stack against mock hardware with a
//! simulated clock and a one-dimensional physics model: the locomotive's
//! velocity integrates into a position, and the home sensor reads present
//! whenever the train is near the home end.
//!
//! ```text
//! cargo run --bin shuttle_sim --features sim
//! RUST_LOG=debug cargo run --bin shuttle_sim --features sim
//! ```

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rs_shunter::config::{LayoutConfig, Profile, ShuttleConfig};
use rs_shunter::converter::Presence;
use rs_shunter::hal::{MockClock, MockMotor};
use rs_shunter::locomotive::{AbsoluteDirection, Locomotive};
use rs_shunter::shuttle::Shuttle;
use rs_shunter::ticks::Ticks;
use rs_shunter::traits::Clock;

/// How long to simulate, in simulated milliseconds.
const SIM_DURATION_MS: Ticks = 90_000;

/// Home sensor footprint in layout units from position zero.
const HOME_ZONE: f32 = 0.5;

/// A presence stage fed by the physics model through a shared flag.
struct SimSensor {
    present: Rc<Cell<bool>>,
}

impl Presence for SimSensor {
    fn sample(&mut self) {}

    fn is_present(&mut self, _now_ms: Ticks) -> bool {
        self.present.get()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let home_flag = Rc::new(Cell::new(true)); // train starts at home
    let sensor = SimSensor {
        present: home_flag.clone(),
    };

    let layout = LayoutConfig::default();
    let engine = Locomotive::new(
        MockMotor::new(),
        Profile::named("test")
            .expect("preset exists")
            .with_max_speed(3.0),
        AbsoluteDirection::Right,
    )
    .with_track_polarity(layout.track_polarity);

    let config = ShuttleConfig::default().with_shuttle_period_ms(20_000);
    let mut clock = MockClock::new();
    let mut shuttle = Shuttle::new(engine, sensor, config, clock.now_ms());

    let mut position = 0.0f32; // layout units from the home end
    let mut last_state = shuttle.state();

    tracing::info!(duration_ms = SIM_DURATION_MS, "simulation start");

    for _ in 0..SIM_DURATION_MS {
        clock.advance(1);
        let now = clock.now_ms();

        // 1 ms of physics, then the control loop sees the new world
        position += shuttle.engine().velocity() * 0.001;
        position = position.max(0.0);
        home_flag.set(position <= HOME_ZONE);

        if let Err(fault) = shuttle.poll(now) {
            shuttle.shutdown().ok();
            anyhow::bail!("motor fault: {fault:?}");
        }

        let state = shuttle.state();
        if state != last_state {
            tracing::info!(
                ?state,
                position = position as f64,
                velocity = shuttle.engine().velocity() as f64,
                "transition"
            );
            last_state = state;
        }
    }

    shuttle
        .shutdown()
        .map_err(|fault| anyhow::anyhow!("shutdown fault: {fault:?}"))?;
    tracing::info!("simulation complete");
    Ok(())
}
