use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use csch::model::{MockStateSource, MotorAction};
use csch::{Agent, ControlConfig};

const GOAL: &str = "mine 12 iron_ore";
const STEPS: usize = 120;
const REPORT_EVERY: usize = 10;
const BLOCKS_PER_TICK: f64 = 0.2;

/// Integrates one motor action into the mock world.
fn simulate(world: &MockStateSource, action: &MotorAction) {
    let player = world.snapshot().player.clone();
    let yaw = player.yaw + action.yaw_rate().to_degrees();
    let pitch = (player.pitch + action.pitch_rate().to_degrees()).clamp(-90.0, 90.0);
    let (sin, cos) = yaw.to_radians().sin_cos();

    let step = action.move_forward() * BLOCKS_PER_TICK;
    let x = player.position.x - sin * step + cos * action.strafe() * BLOCKS_PER_TICK;
    let z = player.position.z + cos * step + sin * action.strafe() * BLOCKS_PER_TICK;

    world.update_player_rotation(yaw, pitch);
    world.update_player_position(x, player.position.y, z);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    tracing::info!("CSCH control core booting...");

    // 2. World + Agent
    let world = Arc::new(MockStateSource::new());
    let agent = Agent::new(ControlConfig::default(), world.clone()).context("building agent")?;

    // 3. Goal
    let graph = agent.execute_goal(GOAL).context("planning goal")?;
    tracing::info!("Planned '{}' into {} intent nodes", GOAL, graph.len());

    // 4. Consume actions
    let mut consumed = 0;
    while consumed < STEPS {
        let next = tokio::task::block_in_place(|| agent.action_timeout(Duration::from_millis(200)));
        let Some(action) = next else {
            tracing::info!("No action within timeout; goal finished or idle");
            break;
        };
        simulate(&world, &action);
        consumed += 1;

        if consumed % REPORT_EVERY == 0 {
            if let Some(skill) = agent.current_skill() {
                tracing::info!("Step {}: reporting {} complete", consumed, skill.skill_name);
                agent.report_success("simulated completion")?;
            }
        }
    }

    // 5. Summary
    let metrics = agent.metrics();
    println!("Consumed {} actions", consumed);
    println!(
        "Aim error {:.3}, smoothness {:.3}, overall quality {:.3}",
        metrics.aim_error,
        metrics.smoothness,
        metrics.overall_quality()
    );
    println!("{}", agent.reflection());

    agent.shutdown().await.context("shutting down")?;
    Ok(())
}
