use actionlist::dsl::builder::ActionListBuilder;
use actionlist::dsl::{ExitAction, ExitDef};
use actionlist::runtime::asset::{ListMode, ListRef};
use serde_json::json;

#[test]
fn test_build_linear_list() {
    let def = ActionListBuilder::new("linear-list")
        .var("door_open", false)
        .action("greet", "present")
            .param("effect", "say")
            .param("params", json!({ "text": "Ahoy" }))
            .build()
        .action("pause", "wait")
            .param("duration", 2)
            .build()
        .build();

    assert_eq!(def.id, "linear-list");
    assert_eq!(def.mode, ListMode::Pausing);
    assert_eq!(def.variables.get("door_open"), Some(&json!(false)));
    assert_eq!(def.actions.len(), 2);

    let greet = def.actions.iter().find(|a| a.id == "greet").expect("Action not found");
    assert_eq!(greet.kind, "present");
    assert_eq!(greet.params.get("effect"), Some(&json!("say")));
    assert!(greet.enabled);
    assert!(greet.exits.is_empty());
}

#[test]
fn test_build_branching_list() {
    let def = ActionListBuilder::new("branching")
        .action("roll", "random")
            .param("exits", 3)
            .exit_jump("a")
            .exit_stop()
            .exit_continue()
            .build()
        .action("a", "log")
            .exit_run(ListRef::scene("epilogue"))
            .build()
        .build();

    let roll = &def.actions[0];
    assert_eq!(roll.exits.len(), 3);
    assert_eq!(roll.exits[0], ExitDef::jump("a"));
    assert_eq!(roll.exits[1].action, ExitAction::Stop);
    assert_eq!(roll.exits[2].action, ExitAction::Continue);
    assert_eq!(def.actions[1].exits[0].list, Some(ListRef::scene("epilogue")));
}

#[test]
fn test_list_def_serde_defaults() {
    let def: actionlist::dsl::ActionListDef = serde_json::from_value(json!({
        "id": "minimal",
        "actions": [
            { "id": "a", "kind": "log", "exits": [ {} , { "action": "jump", "index": 4 } ] }
        ]
    }))
    .expect("Failed to deserialize");

    assert!(def.skippable);
    assert_eq!(def.mode, ListMode::Pausing);
    assert!(def.actions[0].enabled);
    assert_eq!(def.actions[0].exits[0], ExitDef::next());
    assert_eq!(def.actions[0].exits[1], ExitDef::jump_index(4));
}
