use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::runtime::action::{Action, ActionDefinition, Outcome, Progress};
use crate::runtime::context::ActionContext;

// Slack for clock sums that land a hair short of the deadline.
const EPSILON: f64 = 1e-9;

/// Deadline tracking shared by timed nodes.
#[derive(Debug, Default)]
struct Timer {
    until: Option<f64>,
}

impl Timer {
    fn poll(&mut self, now: f64, duration: f64) -> Progress {
        let until = *self.until.get_or_insert(now + duration);
        if now + EPSILON >= until {
            self.until = None;
            Progress::complete()
        } else {
            Progress::Wait(until - now)
        }
    }

    fn clear(&mut self) {
        self.until = None;
    }
}

fn read_duration(params: &Value) -> Result<f64> {
    match params.get("duration") {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => {
            let secs = v
                .as_f64()
                .ok_or_else(|| anyhow!("duration must be a number, got {}", v))?;
            if secs < 0.0 || !secs.is_finite() {
                bail!("duration must be a finite number of seconds >= 0, got {}", secs);
            }
            Ok(secs)
        }
    }
}

// --- WAIT NODE ---

#[derive(Debug)]
pub struct WaitNode {
    duration: f64,
    timer: Timer,
}

pub struct WaitDefinition;

impl ActionDefinition for WaitDefinition {
    fn name(&self) -> &str {
        "wait"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        Ok(Box::new(WaitNode {
            duration: read_duration(params)?,
            timer: Timer::default(),
        }))
    }
}

impl Action for WaitNode {
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        self.timer.poll(ctx.now(), self.duration)
    }

    fn skip(&mut self, _ctx: &mut ActionContext<'_>) -> Outcome {
        self.timer.clear();
        Outcome::Complete
    }

    fn reset(&mut self) {
        self.timer.clear();
    }
}

// --- PRESENT NODE ---

/// Hands an effect (line of dialogue, camera cut, animation) to the presenter
/// and optionally holds the list for its duration.
#[derive(Debug)]
pub struct PresentNode {
    effect: String,
    params: Value,
    duration: f64,
    timer: Timer,
}

pub struct PresentDefinition;

impl ActionDefinition for PresentDefinition {
    fn name(&self) -> &str {
        "present"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        let effect = params
            .get("effect")
            .and_then(|v| v.as_str())
            .ok_or(anyhow!("Missing effect"))?
            .to_string();

        Ok(Box::new(PresentNode {
            effect,
            params: params.get("params").cloned().unwrap_or(Value::Null),
            duration: read_duration(params)?,
            timer: Timer::default(),
        }))
    }
}

impl Action for PresentNode {
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        if !ctx.resumed() {
            ctx.present(&self.effect, self.params.clone(), false);
        }
        self.timer.poll(ctx.now(), self.duration)
    }

    fn skip(&mut self, ctx: &mut ActionContext<'_>) -> Outcome {
        self.timer.clear();
        ctx.present(&self.effect, self.params.clone(), true);
        Outcome::Complete
    }

    fn reset(&mut self) {
        self.timer.clear();
    }
}
