use std::sync::Arc;

use crate::actions::builtin::{AssignAction, LogAction};
use crate::runtime::engine::Engine;

pub mod common;
pub mod flow;
pub mod function;
pub mod list;

/// Registers every bundled action kind with `engine`.
pub fn register_standard_actions(engine: &mut Engine) {
    engine.register_action(Box::new(common::WaitDefinition));
    engine.register_action(Box::new(common::PresentDefinition));
    engine.register_action(Box::new(flow::CheckDefinition));
    engine.register_action(Box::new(flow::SwitchDefinition));
    engine.register_action(Box::new(flow::RandomDefinition));
    engine.register_action(Box::new(list::RunListDefinition));
    engine.register_action(Box::new(list::StopListDefinition));
    engine.register_function(Arc::new(LogAction));
    engine.register_function(Arc::new(AssignAction));
}
