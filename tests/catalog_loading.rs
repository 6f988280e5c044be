// tests/catalog_loading.rs

mod common;
use crate::common::TestResult;
use crate::common::builders::RegistryFixture;

use std::fs;

use remake_engine::config::{find_catalog, load_catalog, load_engine_config};
use remake_engine::engine::{FileGameRegistry, GameRegistry};
use remake_engine::errors::EngineError;
use remake_engine::types::{PromptKind, ScriptLanguage, ScriptType};

const QUAKE_CATALOG: &str = r#"
[[operations]]
name = "Extract"
script = "{{Game_Root}}/scripts/extract.py"
args = ["--src", "{{Game.RootPath}}/Source"]

[[operations.prompts]]
name = "verbose"
type = "confirm"
cli_flag = "--verbose"

[operations.on_success]
script_type = "native"
script = "validate_files"
args = ["GameFiles/**/*.pak"]

[[operations]]
name = "Convert"
script_type = "lua"
script = "convert.lua"
run_all = false

[[operations.on_success]]
script = "a.py"

[[operations.on_success]]
script = "b.py"
"#;

#[test]
fn toml_catalog_loads_with_nested_follow_ups() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("operations.toml");
    fs::write(&path, QUAKE_CATALOG)?;

    let catalog = load_catalog(&path)?;
    assert_eq!(catalog.len(), 2);

    let extract = catalog.find("Extract").ok_or("Extract missing")?;
    assert_eq!(extract.script_type, ScriptType::Process);
    assert!(extract.run_all);
    assert_eq!(extract.prompts[0].kind, PromptKind::Confirm);
    assert_eq!(extract.on_success.len(), 1);
    assert_eq!(extract.on_success[0].script_type, ScriptType::Native);
    assert_eq!(extract.on_success[0].source_file.as_deref(), Some(path.as_path()));

    let convert = catalog.find("convert.lua").ok_or("lookup by script failed")?;
    assert_eq!(convert.script_type, ScriptType::Embedded(ScriptLanguage::Lua));
    assert!(!convert.run_all);
    let follow_ups: Vec<_> = convert
        .on_success
        .iter()
        .filter_map(|op| op.script.as_deref())
        .collect();
    assert_eq!(follow_ups, vec!["a.py", "b.py"]);
    Ok(())
}

#[test]
fn json_catalog_accepts_bare_array_or_object() -> TestResult {
    let dir = tempfile::tempdir()?;

    let array = dir.path().join("array.json");
    fs::write(
        &array,
        r#"[{"Name":"Extract","script":"x.py","onSuccess":{"script":"y.py"}}]"#,
    )?;
    let catalog = load_catalog(&array)?;
    let op = catalog.find("Extract").ok_or("missing")?;
    assert_eq!(op.on_success.len(), 1);

    let object = dir.path().join("object.json");
    fs::write(
        &object,
        r#"{"operations":[{"name":"Run","script_type":"js","script":"main.js"}]}"#,
    )?;
    let catalog = load_catalog(&object)?;
    assert_eq!(
        catalog.operations()[0].script_type,
        ScriptType::Embedded(ScriptLanguage::Js)
    );
    Ok(())
}

#[test]
fn unknown_script_type_survives_loading() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("operations.toml");
    fs::write(&path, "[[operations]]\nscript_type = \"perl\"\nscript = \"x.pl\"\n")?;

    let catalog = load_catalog(&path)?;
    assert_eq!(
        catalog.operations()[0].script_type,
        ScriptType::Unknown("perl".into())
    );
    Ok(())
}

#[test]
fn invalid_catalogs_are_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let cases = [
        (
            "duplicate prompt",
            "[[operations]]\nscript = \"x.py\"\n[[operations.prompts]]\nname = \"a\"\ntype = \"text\"\n[[operations.prompts]]\nname = \"a\"\ntype = \"confirm\"\n",
        ),
        (
            "self condition",
            "[[operations]]\nscript = \"x.py\"\n[[operations.prompts]]\nname = \"a\"\ntype = \"text\"\ncondition = \"a\"\n",
        ),
        (
            "unknown native action",
            "[[operations]]\nscript_type = \"native\"\nscript = \"format_disk\"\n",
        ),
        (
            "native without action",
            "[[operations]]\nscript_type = \"native\"\n",
        ),
    ];

    for (label, contents) in cases {
        let path = dir.path().join("operations.toml");
        fs::write(&path, contents)?;
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)), "{label}: {err:?}");
    }

    let path = dir.path().join("operations.toml");
    fs::write(&path, "[[operations]]\n[[operations.prompts]]\nname = \"a\"\ntype = \"slider\"\n")?;
    assert!(matches!(load_catalog(&path), Err(EngineError::TomlError(_))));
    Ok(())
}

#[test]
fn engine_config_resolves_relative_paths_against_its_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("remake.toml");
    fs::write(
        &path,
        r#"
[engine]
project_root = "."
interpreter = "python3.12"
max_chain_depth = 4

[tools]
ffmpeg = "Tools/ffmpeg/ffmpeg"
git = "git"

[placeholders]
Output = "build"
"#,
    )?;

    let config = load_engine_config(&path)?;
    assert_eq!(config.settings.project_root, dir.path().join("."));
    assert_eq!(
        config.settings.registry_root(),
        dir.path().join(".").join("RemakeRegistry")
    );
    assert_eq!(config.settings.interpreter(), "python3.12");
    assert_eq!(config.settings.max_chain_depth, 4);
    assert_eq!(config.tools["ffmpeg"], dir.path().join("Tools/ffmpeg/ffmpeg"));
    assert_eq!(config.tools["git"], std::path::PathBuf::from("git"));
    assert_eq!(config.placeholders["Output"], "build");
    Ok(())
}

#[test]
fn engine_config_rejects_zero_limits() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("remake.toml");
    fs::write(&path, "[engine]\nqueue_capacity = 0\n")?;
    assert!(matches!(
        load_engine_config(&path),
        Err(EngineError::ConfigError(_))
    ));
    Ok(())
}

#[test]
fn file_registry_lists_modules_with_catalogs() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fixture = RegistryFixture::new(dir.path());
    let quake = fixture.add_module("quake", "");
    fixture.add_module("doom", "");
    fs::create_dir_all(fixture.registry_root().join("Games").join("no-catalog"))?;
    fixture.write_module_index(
        "[modules.quake]\nname = \"Quake\"\nurl = \"https://example.invalid/quake.git\"\n\n[modules.hexen]\nurl = \"https://example.invalid/hexen.git\"\n",
    );

    let registry = FileGameRegistry::new(fixture.registry_root());
    let modules = registry.registered_modules();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec!["doom", "quake"]);
    assert_eq!(modules["quake"].name, "Quake");
    assert_eq!(modules["quake"].root, quake);
    assert_eq!(modules["doom"].name, "doom");

    assert_eq!(
        registry.module_url("hexen").as_deref(),
        Some("https://example.invalid/hexen.git")
    );
    assert_eq!(registry.module_url("doom"), None);
    assert_eq!(
        registry.module_root("hexen"),
        fixture.registry_root().join("Games").join("hexen")
    );
    assert_eq!(find_catalog(&quake), Some(quake.join("operations.toml")));
    Ok(())
}
