mod common;

use std::time::Duration;

use common::FakeRunner;
use hoist::cmd::Output;
use hoist::deploy::{PublishMode, Release, RemoteDeployer};
use hoist::error::DeployError;
use hoist::source::BuildDescriptor;
use hoist::ssh::SshSession;

const ID: &str = "deploy_20261017_120000_000";

fn release(user_home: &str) -> Release {
    Release {
        service: ID.into(),
        image: format!("{ID}:latest"),
        remote_dir: format!("{user_home}/{ID}"),
        port: 5000,
    }
}

#[test]
fn dockerfile_builds_then_runs() {
    let runner = FakeRunner::new().on("ls -1A", Output::ok("Dockerfile\napp.py\n"));
    let ssh = SshSession::new(&runner, "203.0.113.7", "root");

    let deployment = RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .deploy(&release("/root"))
        .unwrap();

    assert_eq!(deployment.descriptor, BuildDescriptor::Dockerfile);
    assert_eq!(deployment.host_port, None);

    let build = runner
        .position(&format!("docker build -t {ID}:latest /root/{ID}"))
        .unwrap();
    let remove = runner.position(&format!("docker rm -f {ID}")).unwrap();
    let start = runner
        .position(&format!(
            "docker run -d --name {ID} --restart unless-stopped -p 5000:5000 {ID}:latest"
        ))
        .unwrap();
    assert!(build < remove && remove < start);
    assert!(runner.position("docker compose").is_none());
}

#[test]
fn compose_project_is_run_scoped() {
    let runner = FakeRunner::new().on("ls -1A", Output::ok("compose.yaml\nDockerfile\n"));
    let ssh = SshSession::new(&runner, "203.0.113.7", "root");

    let deployment = RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .deploy(&release("/root"))
        .unwrap();

    assert_eq!(
        deployment.descriptor,
        BuildDescriptor::Compose("compose.yaml".into())
    );
    let down = runner
        .position(&format!(
            "cd /root/{ID} && docker compose -p {ID} -f compose.yaml down --remove-orphans"
        ))
        .unwrap();
    let up = runner
        .position(&format!(
            "cd /root/{ID} && docker compose -p {ID} -f compose.yaml up --build -d"
        ))
        .unwrap();
    assert!(down < up);
    assert!(runner.position("docker build").is_none());
    assert!(runner.position("docker run").is_none());
}

#[test]
fn ephemeral_publish_reports_engine_port() {
    let ps = format!(
        r#"{{"ID":"c1","Names":"{ID}","Image":"{ID}:latest","Status":"Up 1 second","#
    ) + r#""Ports":"0.0.0.0:49153->5000/tcp"}"#;
    let runner = FakeRunner::new()
        .on("ls -1A", Output::ok("Dockerfile\n"))
        .on("docker ps", Output::ok(&ps));
    let ssh = SshSession::new(&runner, "203.0.113.7", "root");

    let deployment = RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .publish(PublishMode::Ephemeral)
        .deploy(&release("/root"))
        .unwrap();

    assert_eq!(deployment.host_port, Some(49153));
    assert!(
        runner
            .position(&format!("--restart unless-stopped -p 5000 {ID}:latest"))
            .is_some()
    );
}

#[test]
fn non_root_user_runs_engine_with_sudo() {
    let runner = FakeRunner::new().on("ls -1A", Output::ok("Dockerfile\n"));
    let ssh = SshSession::new(&runner, "203.0.113.7", "ubuntu");

    RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .deploy(&release("/home/ubuntu"))
        .unwrap();

    assert!(
        runner
            .position(&format!("sudo docker build -t {ID}:latest /home/ubuntu/{ID}"))
            .is_some()
    );
    assert!(runner.position("sudo docker run -d").is_some());
}

#[test]
fn remote_tree_without_descriptor_fails() {
    let runner = FakeRunner::new().on("ls -1A", Output::ok("README.md\n"));
    let ssh = SshSession::new(&runner, "203.0.113.7", "root");

    let err = RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .deploy(&release("/root"))
        .unwrap_err();

    assert!(matches!(err, DeployError::NoBuildDescriptor(_)));
    assert!(runner.position("docker build").is_none());
}

#[test]
fn failed_build_is_a_deploy_error() {
    let runner = FakeRunner::new()
        .on("ls -1A", Output::ok("Dockerfile\n"))
        .on("docker build", Output::failed(1, "COPY failed"));
    let ssh = SshSession::new(&runner, "203.0.113.7", "root");

    let err = RemoteDeployer::new(&ssh)
        .settle(Duration::ZERO)
        .deploy(&release("/root"))
        .unwrap_err();

    assert!(matches!(err, DeployError::RemoteDeployFailed(ref m) if m.contains("COPY failed")));
    assert!(runner.position("docker run").is_none());
}
