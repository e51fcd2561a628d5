use actionlist::{EngineConfig, EngineError};
use actionlist::compiler::Compiler;
use actionlist::dsl::ActionListDef;
use actionlist::dsl::builder::{ActionBuilder, ActionListBuilder};
use actionlist::nodes::register_standard_actions;
use actionlist::runtime::asset::{ActionListAsset, ListRef};
use actionlist::runtime::engine::Engine;
use actionlist::runtime::invocation::Invocation;
use actionlist::runtime::library::AssetLibrary;
use actionlist::runtime::presenter::RecordingPresenter;
use actionlist::runtime::snapshot::CursorSnapshot;
use serde_json::json;
use std::sync::Arc;

fn setup() -> (Engine, RecordingPresenter) {
    let mut engine = Engine::new();
    register_standard_actions(&mut engine);
    let presenter = RecordingPresenter::new();
    engine.set_presenter(Box::new(presenter.clone()));
    (engine, presenter)
}

fn compile(def: ActionListDef) -> ActionListAsset {
    Compiler::new().compile(def).expect("Compilation failed")
}

fn load_scene(engine: &mut Engine, def: ActionListDef) -> ListRef {
    let list = ListRef::scene(def.id.clone());
    engine.load_scene_list(compile(def)).expect("Failed to load scene list");
    list
}

fn example_graph(true_exit: fn(ActionBuilder) -> ActionBuilder) -> ActionListDef {
    let b = ActionListBuilder::new("example")
        .action("A", "log")
            .param("msg", "A")
            .build()
        .action("B", "check")
            .param("condition", "true");
    true_exit(b)
        .exit_stop()
        .build()
        .action("D", "log")
            .param("msg", "never")
            .build()
        .action("C", "log")
            .param("msg", "C")
            .exit_stop()
            .build()
        .build()
}

#[test]
fn test_example_scenario_visits_a_b_c() {
    let (mut engine, presenter) = setup();
    let list = load_scene(&mut engine, example_graph(|b| b.exit_jump("C")));

    let id = engine.start(list, 0).expect("Failed to start");

    assert_eq!(presenter.visited_labels(id), vec!["A", "B", "C"]);
    assert!(!engine.is_running(id));
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn test_out_of_range_jump_stops_and_keeps_outcome() {
    let (mut engine, presenter) = setup();
    let list = load_scene(&mut engine, example_graph(|b| b.exit_jump_index(99)));

    let id = engine.start(list, 0).expect("Failed to start");

    assert_eq!(presenter.visited_labels(id), vec!["A", "B"]);
    assert!(!engine.is_running(id));

    let graph = engine.scene_graph("example").expect("scene graph returned to its slot");
    assert_eq!(graph.node(1).unwrap().last_outcome(), Some(0));
    assert_eq!(graph.node(3).unwrap().last_outcome(), None);
}

#[test]
fn test_entry_past_end_terminates() {
    let (mut engine, presenter) = setup();
    let list = load_scene(&mut engine, example_graph(|b| b.exit_jump("C")));

    let id = engine.start(list, 42).expect("Failed to start");

    assert!(presenter.visited_labels(id).is_empty());
    assert!(!engine.is_running(id));
}

#[test]
fn test_timed_node_suspends_across_ticks() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("timed")
            .action("line", "present")
                .param("effect", "say")
                .param("params", json!({ "text": "Hello" }))
                .param("duration", 2.0)
                .build()
            .action("done", "log")
                .param("msg", "done")
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    assert!(engine.is_running(id));
    assert!(engine.is_gameplay_blocked());

    engine.tick(1.0);
    assert!(engine.is_running(id));

    engine.tick(1.5);
    assert!(!engine.is_running(id));
    assert!(!engine.is_gameplay_blocked());

    let journal = presenter.journal();
    assert_eq!(journal.effects.len(), 1);
    assert_eq!(journal.effects[0].params, json!({ "text": "Hello" }));
    assert!(!journal.effects[0].skipped);
    assert_eq!(presenter.visited_labels(id), vec!["line", "done"]);
}

#[test]
fn test_background_lists_do_not_block_gameplay() {
    let (mut engine, _) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("ambient")
            .background()
            .action("idle", "wait")
                .param("duration", 30)
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");

    assert!(engine.is_running(id));
    assert!(!engine.is_gameplay_blocked());
}

#[test]
fn test_run_list_waits_for_sub_list() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("sub")
            .action("pause", "wait")
                .param("duration", 1.0)
                .build()
            .build(),
    ));
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("main")
            .action("spawn", "run_list")
                .param("list", "asset:sub")
                .param("wait", true)
                .build()
            .action("after", "log")
                .param("msg", "sub finished")
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    assert!(engine.is_list_running(&ListRef::asset("sub")));

    engine.tick(0.5);
    engine.tick(1.0);
    assert!(!engine.is_list_running(&ListRef::asset("sub")));
    assert!(engine.is_running(id));

    engine.tick(0.1);
    assert!(!engine.is_running(id));
    assert_eq!(presenter.visited_labels(id), vec!["spawn", "after"]);
}

#[test]
fn test_missing_sub_list_does_not_stall() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("main")
            .action("spawn", "run_list")
                .param("list", "asset:ghost")
                .param("wait", true)
                .build()
            .action("after", "log")
                .param("msg", "carried on")
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    engine.tick(0.0);

    assert!(!engine.is_running(id));
    assert_eq!(presenter.visited_labels(id), vec!["spawn", "after"]);
}

#[test]
fn test_missing_sub_list_still_resumes_conversation() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("option")
            .action("spawn", "run_list")
                .param("list", "asset:ghost")
                .param("resume_conversation", "conv")
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    engine.tick(0.0);
    engine.tick(0.0);

    assert!(!engine.is_running(id));
    assert_eq!(presenter.journal().resumed, vec!["conv".to_string()]);
}

#[test]
fn test_run_exit_starts_next_list() {
    let (mut engine, _) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("outro")
            .action("hold", "wait")
                .param("duration", 5)
                .build()
            .build(),
    ));
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("intro")
            .action("first", "log")
                .param("msg", "intro")
                .exit_run(ListRef::asset("outro"))
                .build()
            .action("unreached", "log")
                .param("msg", "never")
                .build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");

    assert!(!engine.is_running(id));
    assert!(engine.is_list_running(&ListRef::asset("outro")));
}

#[test]
fn test_stop_list_kills_other_list() {
    let (mut engine, _) = setup();
    let bg = load_scene(
        &mut engine,
        ActionListBuilder::new("bg")
            .background()
            .action("loop", "wait")
                .param("duration", 100)
                .build()
            .build(),
    );
    let stopper = load_scene(
        &mut engine,
        ActionListBuilder::new("stopper")
            .action("stop", "stop_list")
                .param("list", "scene:bg")
                .build()
            .build(),
    );

    engine.start(bg.clone(), 0).expect("Failed to start bg");
    assert!(engine.is_list_running(&bg));

    engine.start(stopper, 0).expect("Failed to start stopper");
    assert!(!engine.is_list_running(&bg));
}

#[test]
fn test_disabled_scene_node_is_passed_over() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("toggles")
            .action("a", "log").param("msg", "a").build()
            .action("b", "log").param("msg", "b").build()
            .action("c", "log").param("msg", "c").build()
            .build(),
    );

    assert!(engine.set_node_enabled(&list, 1, false));
    let id = engine.start(list, 0).expect("Failed to start");

    assert_eq!(presenter.visited_labels(id), vec!["a", "c"]);
}

#[test]
fn test_kill_is_immediate_and_idempotent() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("long")
            .action("hold", "wait").param("duration", 10).build()
            .action("after", "log").param("msg", "after").build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    assert!(engine.kill(id));
    assert!(!engine.kill(id));

    engine.tick(20.0);
    assert!(!engine.is_running(id));
    assert_eq!(presenter.visited_labels(id), vec!["hold"]);
}

#[test]
fn test_resumption_fires_once_across_repeated_kills() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("talk")
            .action("hold", "wait").param("duration", 5).build()
            .build(),
    ));

    let id = engine
        .invoke(Invocation::new(ListRef::asset("talk")).resume_conversation("conv-1"))
        .expect("Failed to invoke");

    assert!(engine.kill(id));
    assert!(!engine.kill(id));
    engine.tick(10.0);

    assert_eq!(presenter.journal().resumed, vec!["conv-1"]);
}

#[test]
fn test_resumption_fires_when_list_ends() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("talk")
            .action("hold", "wait").param("duration", 5).build()
            .build(),
    ));

    engine
        .invoke(Invocation::new(ListRef::asset("talk")).resume_conversation("conv-2"))
        .expect("Failed to invoke");
    engine.tick(5.0);
    engine.tick(5.0);

    assert_eq!(presenter.journal().resumed, vec!["conv-2"]);
}

#[test]
fn test_kill_all_drops_resumptions() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("talk")
            .action("hold", "wait").param("duration", 5).build()
            .build(),
    ));

    engine
        .invoke(Invocation::new(ListRef::asset("talk")).resume_conversation("conv-3"))
        .expect("Failed to invoke");
    engine.kill_all();

    assert_eq!(engine.active_count(), 0);
    assert!(presenter.journal().resumed.is_empty());
}

#[test]
fn test_force_skip_is_bounded_on_deep_chains() {
    let (mut engine, _) = setup();
    for i in 0..25 {
        let mut b = ActionListBuilder::new(&format!("chain_{}", i));
        if i < 24 {
            b = b
                .action("next", "run_list")
                    .param("list", format!("asset:chain_{}", i + 1))
                    .build();
        }
        let def = b.action("hold", "wait").param("duration", 100).build().build();
        engine.register_asset(compile(def));
    }

    engine.start(ListRef::asset("chain_0"), 0).expect("Failed to start");
    assert!(engine.is_gameplay_blocked());

    let passes = engine.force_skip_all();

    assert_eq!(passes, 20);
    assert!(engine.is_gameplay_blocked());
}

#[test]
fn test_force_skip_clears_short_chains() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("cut_b")
            .action("line", "present").param("effect", "b").param("duration", 3).build()
            .build(),
    ));
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("cut_a")
            .action("line", "present").param("effect", "a").param("duration", 3).build()
            .action("next", "run_list").param("list", "asset:cut_b").build()
            .build(),
    );

    engine.start(list, 0).expect("Failed to start");
    let passes = engine.force_skip_all();

    assert_eq!(passes, 2);
    assert!(!engine.is_gameplay_blocked());
    let skipped: Vec<String> = presenter
        .journal()
        .effects
        .into_iter()
        .filter(|e| e.skipped)
        .map(|e| e.name)
        .collect();
    assert_eq!(skipped, vec!["a", "b"]);
}

#[test]
fn test_unskippable_lists_survive_force_skip() {
    let (mut engine, _) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("credits")
            .skippable(false)
            .action("roll", "wait").param("duration", 60).build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");

    assert_eq!(engine.force_skip_all(), 0);
    assert!(engine.is_running(id));
    assert!(!engine.skip(id));
}

fn fate_graph() -> ActionListDef {
    ActionListBuilder::new("fate")
        .action("roll", "random")
            .param("exits", 3)
            .exit_jump("a")
            .exit_jump("b")
            .exit_jump("c")
            .build()
        .action("a", "present").param("effect", "a").param("duration", 5).exit_stop().build()
        .action("b", "present").param("effect", "b").param("duration", 5).exit_stop().build()
        .action("c", "present").param("effect", "c").param("duration", 5).exit_stop().build()
        .build()
}

#[test]
fn test_skip_replays_random_branch() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(fate_graph()));

    for _ in 0..16 {
        presenter.clear();
        let id = engine.start(ListRef::asset("fate"), 0).expect("Failed to start");
        let live = presenter.journal().effects[0].name.clone();

        assert!(engine.skip(id));
        assert!(!engine.is_running(id));

        let journal = presenter.journal();
        assert_eq!(journal.effects.len(), 2);
        assert!(journal.effects[1].skipped);
        assert_eq!(journal.effects[1].name, live);
    }
}

#[test]
fn test_restored_skip_replays_saved_branch() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(fate_graph()));

    for _ in 0..16 {
        presenter.clear();
        let id = engine.start(ListRef::asset("fate"), 0).expect("Failed to start");
        let live = presenter.journal().effects[0].name.clone();

        let mut snapshot = engine.snapshot(id).expect("cursor is registered");
        snapshot.is_skipping = true;
        snapshot.next_index = Some(0);
        engine.kill_all();

        let restored = engine.restore(snapshot).expect("Failed to restore");
        assert_eq!(restored, id);
        assert!(engine.cursor(id).unwrap().is_skipping());

        engine.tick(0.0);
        let journal = presenter.journal();
        assert!(!engine.is_running(id));
        assert_eq!(journal.effects.last().unwrap().name, live);
        assert!(journal.effects.last().unwrap().skipped);
    }
}

#[test]
fn test_bindings_leave_template_untouched() {
    let (mut engine, presenter) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("greet")
            .parameter("name", "stranger")
            .action("hello", "present")
                .param("effect", "say")
                .param("params", json!({ "text": "Hello ${name}" }))
                .build()
            .build(),
    ));

    engine
        .invoke(Invocation::new(ListRef::asset("greet")).bind("name", "Guybrush"))
        .expect("Failed to invoke");
    engine
        .invoke(Invocation::new(ListRef::asset("greet")))
        .expect("Failed to invoke");

    let texts: Vec<_> = presenter
        .journal()
        .effects
        .into_iter()
        .map(|e| e.params["text"].clone())
        .collect();
    assert_eq!(texts, vec![json!("Hello Guybrush"), json!("Hello stranger")]);

    let template = engine.library().get("greet").unwrap();
    assert_eq!(template.nodes[0].params["params"]["text"], json!("Hello ${name}"));
}

#[test]
fn test_asset_invocations_are_independent() {
    let (mut engine, _) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("npc")
            .background()
            .action("idle", "wait").param("duration", 1).build()
            .build(),
    ));

    let first = engine.start(ListRef::asset("npc"), 0).expect("Failed to start");
    let second = engine.start(ListRef::asset("npc"), 0).expect("Failed to start");
    assert_ne!(first, second);
    assert_eq!(engine.active_count(), 2);

    engine.kill(first);
    assert!(engine.is_running(second));
    engine.tick(1.0);
    assert!(!engine.is_running(second));
}

#[test]
fn test_restarting_scene_list_replaces_running_cursor() {
    let (mut engine, _) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("door")
            .action("creak", "wait").param("duration", 3).build()
            .build(),
    );

    let first = engine.start(list.clone(), 0).expect("Failed to start");
    let second = engine.start(list, 0).expect("Failed to start");

    assert!(!engine.is_running(first));
    assert!(engine.is_running(second));
    assert_eq!(engine.active_count(), 1);
}

#[test]
fn test_snapshot_round_trip_resumes_list() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("saveable")
            .action("a", "log").param("msg", "a").build()
            .action("hold", "wait").param("duration", 10).build()
            .action("b", "log").param("msg", "b").build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    let saved = serde_json::to_string(&engine.snapshot_all()).expect("serialize");
    engine.kill_all();
    assert_eq!(engine.active_count(), 0);

    let snapshots: Vec<CursorSnapshot> = serde_json::from_str(&saved).expect("deserialize");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].next_index, Some(1));
    for snapshot in snapshots {
        engine.restore(snapshot).expect("Failed to restore");
    }
    assert!(engine.is_running(id));

    engine.tick(0.0);
    engine.tick(10.0);

    assert!(!engine.is_running(id));
    assert_eq!(presenter.visited_labels(id), vec!["a", "hold", "b"]);
}

#[test]
fn test_restore_rejects_mismatched_snapshot() {
    let (mut engine, _) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("saveable")
            .action("hold", "wait").param("duration", 10).build()
            .action("b", "log").param("msg", "b").build()
            .build(),
    );

    let id = engine.start(list, 0).expect("Failed to start");
    let mut snapshot = engine.snapshot(id).unwrap();
    snapshot.nodes.pop();

    let err = engine.restore(snapshot).unwrap_err();
    assert!(matches!(err, EngineError::SnapshotMismatch { expected: 2, found: 1, .. }));
    assert!(engine.scene_graph("saveable").is_some());
}

#[test]
fn test_setup_errors_surface_to_caller() {
    let (mut engine, _) = setup();

    let err = engine.start(ListRef::asset("nope"), 0).unwrap_err();
    assert!(matches!(err, EngineError::UnknownList(_)));

    let err = engine
        .load_scene_list(compile(
            ActionListBuilder::new("broken")
                .action("warp", "teleport").build()
                .build(),
        ))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownAction { index: 0, .. }));

    let err = engine
        .load_scene_list(compile(
            ActionListBuilder::new("broken")
                .action("hold", "wait").param("duration", -1).build()
                .build(),
        ))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidParams { .. }));
}

#[test]
fn test_variables_drive_checks_and_assignments() {
    let (mut engine, presenter) = setup();
    engine.set_var("gold", json!(12));
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("shop")
            .action("rich", "check")
                .param("condition", "${gold} >= 10")
                .exit_continue()
                .exit_jump("poor")
                .build()
            .action("buy", "assign")
                .param("expression", "gold = gold - 10")
                .exit_stop()
                .build()
            .action("poor", "log").param("msg", "too poor").build()
            .build(),
    );

    let id = engine.start(list.clone(), 0).expect("Failed to start");
    assert_eq!(presenter.visited_labels(id), vec!["rich", "buy"]);
    assert_eq!(engine.get_var("gold"), Some(json!(2)));

    let id = engine.start(list, 0).expect("Failed to start");
    assert_eq!(presenter.visited_labels(id), vec!["rich", "poor"]);
}

#[test]
fn test_skip_restarts_from_first_node() {
    let (mut engine, presenter) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("opts")
            .action("intro", "present").param("effect", "intro").build()
            .action("answer", "present").param("effect", "answer").param("duration", 5).build()
            .build(),
    );

    let id = engine.start(list, 1).expect("Failed to start");
    assert_eq!(presenter.visited_labels(id), vec!["answer"]);
    presenter.clear();

    assert!(engine.skip(id));

    assert!(!engine.is_running(id));
    assert_eq!(presenter.visited_labels(id), vec!["intro", "answer"]);
    let skipped: Vec<String> = presenter
        .journal()
        .effects
        .into_iter()
        .filter(|e| e.skipped)
        .map(|e| e.name)
        .collect();
    assert_eq!(skipped, vec!["intro", "answer"]);
}

#[test]
fn test_bad_bindings_leave_running_scene_list_alone() {
    let (mut engine, _) = setup();
    let list = load_scene(
        &mut engine,
        ActionListBuilder::new("door")
            .parameter("secs", 3)
            .action("creak", "wait").param("duration", "${secs}").build()
            .build(),
    );

    let first = engine.start(list.clone(), 0).expect("Failed to start");
    let err = engine
        .invoke(Invocation::new(list).bind("secs", "soon"))
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidParams { .. }));
    assert!(engine.is_running(first));
    assert_eq!(engine.active_count(), 1);

    engine.tick(3.0);
    assert!(!engine.is_running(first));
    assert!(engine.scene_graph("door").is_some());
}

#[test]
fn test_skipping_restored_parent_does_not_respawn_child() {
    let (mut engine, _) = setup();
    engine.register_asset(compile(
        ActionListBuilder::new("child")
            .action("hold", "wait").param("duration", 10).build()
            .build(),
    ));
    engine.register_asset(compile(
        ActionListBuilder::new("parent")
            .action("spawn", "run_list")
                .param("list", "asset:child")
                .param("wait", true)
                .build()
            .action("after", "log").param("msg", "after").build()
            .build(),
    ));
    let list = ListRef::asset("parent");
    let child = ListRef::asset("child");
    let children = |engine: &Engine| engine.cursors().filter(|c| c.list() == &child).count();

    let id = engine.start(list, 0).expect("Failed to start");
    engine.tick(0.0);
    assert_eq!(children(&engine), 1);

    let snapshot = engine.snapshot(id).expect("cursor is registered");
    engine.restore(snapshot).expect("Failed to restore");
    assert!(engine.skip(id));

    assert!(!engine.is_running(id));
    assert_eq!(children(&engine), 1);
}

#[test]
fn test_asset_library_is_shared_between_engines() {
    let library = Arc::new(AssetLibrary::new());
    let mut kitchen = Engine::with_library(library.clone(), EngineConfig::default());
    let mut cellar = Engine::with_library(library.clone(), EngineConfig::default());
    register_standard_actions(&mut kitchen);
    register_standard_actions(&mut cellar);
    assert!(library.is_empty());

    kitchen.register_asset(compile(
        ActionListBuilder::new("rat")
            .background()
            .action("scurry", "wait").param("duration", 1).build()
            .build(),
    ));

    assert!(library.contains("rat"));
    assert_eq!(library.len(), 1);
    let id = cellar.start(ListRef::asset("rat"), 0).expect("Failed to start");
    assert!(cellar.is_running(id));
    assert_eq!(kitchen.active_count(), 0);
}
