// tests/placeholders.rs

mod common;

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use remake_engine::context::{has_placeholders, lookup, resolve, resolve_str};

fn context() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "Game_Root": "/games/quake",
        "Game": { "Name": "Quake", "Id": "quake", "Meta": { "year": 1996 } },
        "Tools": { "ffmpeg": "/opt/ffmpeg" },
        "Flags": ["-q", "-y"],
        "Nothing": null,
        "Verbose": true
    }) else {
        unreachable!()
    };
    map
}

#[test]
fn substitutes_top_level_and_nested_paths() {
    let ctx = context();
    assert_eq!(
        resolve_str("{{Game_Root}}/pak0.pak", &ctx),
        "/games/quake/pak0.pak"
    );
    assert_eq!(resolve_str("{{Game.Name}} ({{Game.Meta.year}})", &ctx), "Quake (1996)");
    assert_eq!(resolve_str("{{ Tools.ffmpeg }}", &ctx), "/opt/ffmpeg");
}

#[test]
fn unresolvable_tokens_are_preserved_verbatim() {
    let ctx = context();
    assert_eq!(resolve_str("{{Missing}}/x", &ctx), "{{Missing}}/x");
    // Walking through a string node fails and keeps the token.
    assert_eq!(resolve_str("{{Game_Root.deeper}}", &ctx), "{{Game_Root.deeper}}");
    assert_eq!(
        resolve_str("{{Game.Name}}-{{Game.Nope}}", &ctx),
        "Quake-{{Game.Nope}}"
    );
    assert!(has_placeholders(&resolve_str("{{Missing}}", &ctx)));
}

#[test]
fn string_forms_of_non_string_values() {
    let ctx = context();
    assert_eq!(resolve_str("[{{Nothing}}]", &ctx), "[]");
    assert_eq!(resolve_str("{{Verbose}}", &ctx), "true");
    assert_eq!(resolve_str("{{Flags}}", &ctx), r#"["-q","-y"]"#);
    assert_eq!(resolve_str("{{Game.Meta}}", &ctx), r#"{"year":1996}"#);
}

#[test]
fn structure_is_preserved_and_scalars_pass_through() {
    let ctx = context();
    let input = json!({
        "path": "{{Game_Root}}",
        "list": ["{{Game.Id}}", 3, false, null],
        "nested": { "tool": "{{Tools.ffmpeg}}" }
    });
    let out = resolve(&input, &ctx);
    assert_eq!(
        out,
        json!({
            "path": "/games/quake",
            "list": ["quake", 3, false, null],
            "nested": { "tool": "/opt/ffmpeg" }
        })
    );
}

#[test]
fn resolve_does_not_mutate_its_input() {
    let ctx = context();
    let input = json!(["{{Game_Root}}", { "k": "{{Game.Id}}" }]);
    let before = input.clone();
    let _ = resolve(&input, &ctx);
    assert_eq!(input, before);
}

#[test]
fn lookup_walks_one_segment_at_a_time() {
    let ctx = context();
    assert_eq!(lookup(&ctx, "Game.Meta.year"), Some(&json!(1996)));
    assert_eq!(lookup(&ctx, "Game.Meta.month"), None);
    assert_eq!(lookup(&ctx, "Flags.0"), None);
}

fn template_part() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z /._-]{0,8}",
        Just("{{Game_Root}}".to_string()),
        Just("{{Game.Name}}".to_string()),
        Just("{{Tools.ffmpeg}}".to_string()),
        Just("{{Unknown.key}}".to_string()),
        Just("{{Game.Nope}}".to_string()),
    ]
}

proptest! {
    #[test]
    fn resolution_is_idempotent(parts in prop::collection::vec(template_part(), 0..8)) {
        let ctx = context();
        let template = parts.concat();
        let once = resolve_str(&template, &ctx);
        let twice = resolve_str(&once, &ctx);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn text_without_braces_is_untouched(text in "[^{}]{0,40}") {
        let ctx = context();
        prop_assert_eq!(resolve_str(&text, &ctx), text);
    }
}
