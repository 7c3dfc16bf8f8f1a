//! Tests for options.rs: choice marking and the static source.

use recon_editor::{ChoiceOption, OptionSource, StaticOptionSource, choices_for};
use serde_json::json;

fn shells() -> Vec<String> {
    vec!["/bin/sh".into(), "/bin/bash".into(), "/bin/zsh".into()]
}

#[test]
fn current_value_is_selected() {
    let choices = choices_for(&shells(), Some(&json!("/bin/bash")));

    assert_eq!(
        choices,
        vec![
            ChoiceOption {
                name: "/bin/sh".into(),
                selected: false,
            },
            ChoiceOption {
                name: "/bin/bash".into(),
                selected: true,
            },
            ChoiceOption {
                name: "/bin/zsh".into(),
                selected: false,
            },
        ]
    );
}

#[test]
fn missing_or_non_string_value_selects_nothing() {
    assert!(choices_for(&shells(), None).iter().all(|c| !c.selected));
    assert!(choices_for(&shells(), Some(&json!(3))).iter().all(|c| !c.selected));
}

#[tokio::test]
async fn static_source_returns_its_list() {
    let source = StaticOptionSource::new(["/bin/sh", "/bin/bash"]);

    let options = source.request_options().await.unwrap();

    assert_eq!(options, vec!["/bin/sh".to_string(), "/bin/bash".to_string()]);
}
