//! The linked builtin plugins driven through a full host run

mod common;

use common::{build_host, config_in};
use plughost::host::api::{FaultClass, HostState, Stage};
use plughost::plugin::api::LinkedProviders;

fn names(list: Vec<String>) -> Vec<String> {
    let mut list = list;
    list.sort();
    list
}

#[tokio::test]
async fn test_builtins_start_and_stop() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("greeter.toml"), "greeting = \"Hi {name}\"\n").unwrap();
    let mut t = build_host(LinkedProviders, config_in(dir.path()));

    t.host.start().await.unwrap();

    assert_eq!(t.host.state(), HostState::Ready);
    assert!(t.host.faults().is_empty(), "{:?}", t.host.faults());
    let loaded = names(t.host.loaded_plugins().await);
    assert_eq!(loaded, vec!["audit-log", "greeter", "ping"]);

    let commands: Vec<String> = t
        .host
        .submitted_commands()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(commands, vec!["ping"]);

    let live = t.gateway.live_connection().unwrap();
    assert_eq!(
        names(live.target().listener_names()),
        vec!["audit-recorder", "greeter-welcome", "ping-responder"]
    );

    let descriptor = t.database.descriptor("audit-log").unwrap();
    assert_eq!(descriptor.schema, "audit");
    assert_eq!(descriptor.tables, vec!["events"]);

    let report = t.host.stop().await.unwrap();
    assert!(report.drained);
    assert_eq!(t.database.unloaded(), vec!["audit-log"]);
    assert!(live.target().is_empty());
    assert!(t.gateway.pre_target().is_empty());
}

#[tokio::test]
async fn test_malformed_plugin_settings_are_severe() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("greeter.toml"), "greeting = \n").unwrap();
    let mut t = build_host(LinkedProviders, config_in(dir.path()));

    t.host.start().await.unwrap();

    assert!(t.host.is_loaded("greeter").await);
    let records = t.host.faults_for("greeter");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].class, FaultClass::Severe);
    assert_eq!(records[0].stage, Stage::PostInit);
}

#[tokio::test]
async fn test_configured_exclusions() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("plughost.toml");
    std::fs::write(
        &config_file,
        "[host]\nmax_parallelism = 2\ndisabled = [\"greeter\", \"audit-log\"]\n",
    )
    .unwrap();

    let config = plughost::host::api::HostConfig::load(Some(config_file.as_path()))
        .await
        .unwrap();
    assert_eq!(config.max_parallelism, 2);

    let mut t = build_host(LinkedProviders, config);
    t.host.start().await.unwrap();

    assert_eq!(t.host.loaded_plugins().await, vec!["ping"]);
    assert!(t.database.descriptor("audit-log").is_none());
    assert_eq!(t.host.pool().max_parallelism(), 2);
}
