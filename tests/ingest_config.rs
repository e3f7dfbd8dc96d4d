// tests/ingest_config.rs
use listing_curator::ingest::config::{load_sources_default, load_sources_from};
use listing_curator::ingest::providers::AdapterSpec;
use std::{env, fs};

const TOML: &str = r#"
[[groups]]
name = "jobs"

[[groups.sources]]
name = "jobs-api"
base_url = "https://careers.example.com/"
listing_type = "job"

[groups.sources.adapter]
kind = "api"
items_key = "data.items"

[groups.sources.adapter.fields]
link = "url"
"#;

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sources.toml");
    fs::write(&p_toml, TOML).unwrap();
    let cat = load_sources_from(&p_toml).unwrap();
    assert_eq!(cat.group_names(), vec!["jobs"]);
    assert!(matches!(
        &cat.groups[0].sources[0].adapter,
        AdapterSpec::Api(a) if a.fields.link == "url" && a.fields.title == "title"
    ));

    let p_json = dir.path().join("sources.json");
    fs::write(
        &p_json,
        r#"{"groups":[{"name":"contests","sources":[{
            "name":"board","base_url":"https://board.example.com/","listing_type":"contest",
            "adapter":{"kind":"markup","item":"li.contest","title":".title","link":"a"}
        }]}]}"#,
    )
    .unwrap();
    let cj = load_sources_from(&p_json).unwrap();
    assert_eq!(cj.group_names(), vec!["contests"]);

    let bad = dir.path().join("broken.toml");
    fs::write(&bad, "[[groups]]\nname = ").unwrap();
    assert!(load_sources_from(&bad).is_err());

    let unknown_kind = dir.path().join("unknown.json");
    fs::write(
        &unknown_kind,
        r#"{"groups":[{"name":"x","sources":[{
            "name":"s","base_url":"https://s/","listing_type":"job","adapter":{"kind":"ftp"}
        }]}]}"#,
    )
    .unwrap();
    assert!(load_sources_from(&unknown_kind).is_err());
}

#[test]
fn invalid_selector_fails_the_catalogue_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sources.toml");
    fs::write(
        &path,
        r#"
[[groups]]
name = "contests"

[[groups.sources]]
name = "contest-board"
base_url = "https://board.example.com/"
listing_type = "contest"

[groups.sources.adapter]
kind = "markup"
item = "li["
"#,
    )
    .unwrap();

    let err = load_sources_from(&path).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("contest-board"), "{msg}");
    assert!(msg.contains("li["), "{msg}");
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("SOURCES_CONFIG_PATH");

    // 1) nothing anywhere → empty catalogue
    let cat = load_sources_default().unwrap();
    assert!(cat.groups.is_empty());

    // 2) fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("sources.toml"), TOML).unwrap();
    assert_eq!(load_sources_default().unwrap().group_names(), vec!["jobs"]);

    // 3) env var wins
    let p_env = tmp.path().join("other.json");
    fs::write(&p_env, r#"{"groups":[{"name":"events","sources":[]}]}"#).unwrap();
    env::set_var("SOURCES_CONFIG_PATH", p_env.display().to_string());
    assert_eq!(load_sources_default().unwrap().group_names(), vec!["events"]);

    // 4) env var pointing nowhere is an error, not a silent fallback
    let missing = tmp.path().join("missing.toml");
    env::set_var("SOURCES_CONFIG_PATH", missing.display().to_string());
    assert!(load_sources_default().is_err());
    env::remove_var("SOURCES_CONFIG_PATH");

    env::set_current_dir(&old).unwrap();
}
