//! Compose file rendering and project commands.

use tower_installer::compose::{render_compose_file, Compose};
use tower_installer::config::InstallerConfig;

use crate::support::ScriptedExecutor;

#[test]
fn compose_file_wires_prisma_to_postgres() {
    let rendered = render_compose_file(&InstallerConfig::default());
    assert!(rendered.starts_with("version: '3'\n"));
    assert!(rendered.contains("connector: postgres"));
    assert!(rendered.contains("POSTGRES_USER: prisma"));
    assert!(rendered.contains("- '8800:8800'"));
    assert!(rendered.contains("- '80:80'"));
}

#[test]
fn compose_file_follows_configured_images() {
    let mut config = InstallerConfig::default();
    config.images.server = "registry.local/tower:1.0.0".to_owned();
    let rendered = render_compose_file(&config);
    assert!(rendered.contains("image: registry.local/tower:1.0.0"));
    assert!(!rendered.contains("tower:0.2.3"));
}

#[tokio::test]
async fn project_name_is_passed_to_every_command() {
    let executor = ScriptedExecutor::new();
    let compose = Compose::new("staging", &executor);

    compose.up_from_stdin("version: '3'\n").await.expect("up");
    compose.down().await.expect("down");

    for command in executor.commands() {
        assert!(command.starts_with("docker-compose -p "));
        assert!(command.contains("staging"));
    }
}
