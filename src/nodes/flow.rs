use anyhow::{Result, anyhow, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::warn;

use crate::expr::{self, Expression};
use crate::runtime::action::{Action, ActionDefinition, Outcome, Progress, Shape};
use crate::runtime::context::ActionContext;

// --- CHECK NODE ---

/// Binary branch on a boolean expression over the variable store.
#[derive(Debug)]
pub struct CheckNode {
    condition: Expression,
    raw_cond: String,
}

pub struct CheckDefinition;

impl ActionDefinition for CheckDefinition {
    fn name(&self) -> &str {
        "check"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        let raw_cond = match params.get("condition") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => bail!("Missing condition"),
        };
        let condition = expr::compile(&raw_cond)?;
        Ok(Box::new(CheckNode { condition, raw_cond }))
    }
}

impl Action for CheckNode {
    fn shape(&self) -> Shape {
        Shape::Binary
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        let eval_ctx = expr::context_from(&ctx.all_vars());
        let result = self
            .condition
            .eval_boolean_with_context(&eval_ctx)
            .unwrap_or_else(|e| {
                warn!(list = %ctx.list(), index = ctx.index(), condition = %self.raw_cond, error = %e, "check failed, taking false branch");
                false
            });
        Progress::Done(Outcome::Check(result))
    }
}

// --- SWITCH NODE ---

/// Multi-way branch: the integer `value` expression picks one of `cases` exits.
#[derive(Debug)]
pub struct SwitchNode {
    value: Expression,
    raw_value: String,
    cases: usize,
}

pub struct SwitchDefinition;

impl ActionDefinition for SwitchDefinition {
    fn name(&self) -> &str {
        "switch"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        let raw_value = match params.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => bail!("Missing value"),
        };
        let cases = params
            .get("cases")
            .and_then(|v| v.as_u64())
            .ok_or(anyhow!("Missing cases"))? as usize;
        if cases == 0 {
            bail!("switch needs at least one case");
        }
        Ok(Box::new(SwitchNode {
            value: expr::compile(&raw_value)?,
            raw_value,
            cases,
        }))
    }
}

impl Action for SwitchNode {
    fn shape(&self) -> Shape {
        Shape::Multi(self.cases)
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        let eval_ctx = expr::context_from(&ctx.all_vars());
        match self.value.eval_int_with_context(&eval_ctx) {
            Ok(i) => Progress::Done(Outcome::Select(i)),
            Err(e) => {
                warn!(list = %ctx.list(), index = ctx.index(), value = %self.raw_value, error = %e, "switch value failed, stopping");
                Progress::Done(Outcome::Failed)
            }
        }
    }
}

// --- RANDOM NODE ---

/// Random branch. With `chance` it is binary (first exit with that
/// probability); otherwise it picks uniformly among `exits` (default 2).
#[derive(Debug)]
pub struct RandomNode {
    chance: Option<f64>,
    exits: usize,
    seed: Option<u64>,
    rng: StdRng,
}

impl RandomNode {
    fn rng_for(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

pub struct RandomDefinition;

impl ActionDefinition for RandomDefinition {
    fn name(&self) -> &str {
        "random"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        let chance = match params.get("chance") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let p = v.as_f64().ok_or_else(|| anyhow!("chance must be a number, got {}", v))?;
                if !(0.0..=1.0).contains(&p) {
                    bail!("chance must be within 0..=1, got {}", p);
                }
                Some(p)
            }
        };
        let exits = params.get("exits").and_then(|v| v.as_u64()).unwrap_or(2) as usize;
        if exits == 0 {
            bail!("random needs at least one exit");
        }
        let seed = params.get("seed").and_then(|v| v.as_u64());

        Ok(Box::new(RandomNode {
            chance,
            exits,
            seed,
            rng: RandomNode::rng_for(seed),
        }))
    }
}

impl Action for RandomNode {
    fn shape(&self) -> Shape {
        match self.chance {
            Some(_) => Shape::Binary,
            None => Shape::Multi(self.exits),
        }
    }

    fn run(&mut self, _ctx: &mut ActionContext<'_>) -> Progress {
        let outcome = match self.chance {
            Some(p) => Outcome::Check(self.rng.gen_bool(p)),
            None => Outcome::Select(self.rng.gen_range(0..self.exits) as i64),
        };
        Progress::Done(outcome)
    }

    fn reset(&mut self) {
        if self.seed.is_some() {
            self.rng = RandomNode::rng_for(self.seed);
        }
    }
}
