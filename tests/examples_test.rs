use actionlist::compiler::Compiler;
use actionlist::compiler::loader::{load_list_from_yaml, load_lists_from_dir};
use actionlist::nodes::register_standard_actions;
use actionlist::runtime::asset::ListRef;
use actionlist::runtime::engine::Engine;
use actionlist::runtime::presenter::RecordingPresenter;
use serde_json::json;
use std::path::Path;

fn load_example(file_name: &str) -> (Engine, RecordingPresenter, ListRef) {
    let dir = Path::new("dsl_examples");
    let mut engine = Engine::new();
    register_standard_actions(&mut engine);
    let presenter = RecordingPresenter::new();
    engine.set_presenter(Box::new(presenter.clone()));

    let mut compiler = Compiler::new();
    for def in load_lists_from_dir(dir.join("assets")).expect("Failed to load assets") {
        let asset = compiler.compile(def).expect("Compilation failed");
        engine.validate_asset(&asset).expect("Invalid asset");
        engine.register_asset(asset);
    }

    let def = load_list_from_yaml(dir.join(file_name)).expect("Failed to load list");
    engine.init_vars(def.variables.clone());
    let asset = compiler.compile(def).expect("Compilation failed");
    let list = ListRef::scene(asset.id.clone());
    engine.load_scene_list(asset).expect("Failed to load scene list");
    (engine, presenter, list)
}

#[test]
fn test_tavern_runs_to_completion() {
    let (mut engine, presenter, list) = load_example("tavern.yaml");

    let id = engine.start(list, 0).expect("Failed to start");
    for _ in 0..40 {
        if engine.active_count() == 0 {
            break;
        }
        engine.tick(0.25);
    }

    assert_eq!(engine.active_count(), 0);
    assert_eq!(engine.get_var("gold"), Some(json!(2)));
    assert_eq!(presenter.visited_labels(id), vec!["greet", "can_pay", "buy", "fortune"]);

    let journal = presenter.journal();
    let served = journal
        .effects
        .iter()
        .find(|e| e.params["text"] == json!("One grog, coming up."));
    assert!(served.is_some());
    assert_eq!(journal.effects.iter().filter(|e| e.name == "mumble").count(), 1);
}

#[test]
fn test_tavern_force_skip_unblocks_gameplay() {
    let (mut engine, presenter, list) = load_example("tavern.yaml");

    engine.start(list, 0).expect("Failed to start");
    assert!(engine.is_gameplay_blocked());

    engine.force_skip_all();

    assert!(!engine.is_gameplay_blocked());
    assert_eq!(engine.get_var("gold"), Some(json!(2)));
    assert!(presenter.journal().effects.iter().any(|e| e.skipped));
}
