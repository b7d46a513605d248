use std::collections::HashMap;
use std::collections::VecDeque;

use hoist::error::{DeployError, DeployResult};
use hoist::params::{Mode, RunId};
use hoist::pipeline::Cli;
use hoist::resolve::{self, Prompter};
use secrecy::ExposeSecret;
use tempfile::NamedTempFile;

/// Answers prompts from a script; an empty answer takes the default.
#[derive(Default)]
struct Scripted {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl Scripted {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| (*a).to_string()).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, question: &str) -> String {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {question}"))
    }
}

impl Prompter for Scripted {
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String> {
        let answer = self.next(question);
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer)
        }
    }

    fn confirm(&mut self, question: &str) -> DeployResult<bool> {
        Ok(self.next(question) == "y")
    }

    fn ask_secret(&mut self, question: &str) -> DeployResult<String> {
        Ok(self.next(question))
    }
}

fn key_file() -> NamedTempFile {
    NamedTempFile::new().unwrap()
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn run_id() -> RunId {
    RunId::from_token("20261017_120000_000")
}

#[test]
fn non_interactive_reads_environment() {
    let key = key_file();
    let key_path = key.path().to_string_lossy().into_owned();
    let env = env_of(&[
        ("DEPLOY_REPO", "https://github.com/acme/shop.git"),
        ("DEPLOY_PAT", "ghp_abc"),
        ("DEPLOY_USER", "root"),
        ("DEPLOY_HOST", "203.0.113.7"),
        ("DEPLOY_KEY", key_path.as_str()),
        ("DEPLOY_PORT", "5000"),
    ]);
    let cli = Cli {
        non_interactive: true,
        ..Cli::default()
    };

    let params = resolve::resolve(&cli, run_id(), &env, &mut Scripted::default()).unwrap();

    assert_eq!(params.user, "root");
    assert_eq!(params.host, "203.0.113.7");
    assert_eq!(params.key, key.path());
    assert_eq!(params.remote_dir(), "/root/deploy_20261017_120000_000");
    let target = params.target().unwrap();
    assert_eq!(target.branch, "main");
    assert_eq!(target.port, 5000);
    assert_eq!(target.token.as_ref().unwrap().expose_secret(), "ghp_abc");
}

#[test]
fn flags_take_precedence_over_environment() {
    let key = key_file();
    let env = env_of(&[("DEPLOY_HOST", "from-env"), ("DEPLOY_PORT", "1")]);
    let cli = Cli {
        non_interactive: true,
        repo: Some("git@github.com:acme/shop.git".into()),
        branch: Some("release".into()),
        user: Some("deploy".into()),
        host: Some("from-flag".into()),
        key: Some(key.path().to_string_lossy().into_owned()),
        port: Some("8080".into()),
        ..Cli::default()
    };

    let params = resolve::resolve(&cli, run_id(), &env, &mut Scripted::default()).unwrap();

    assert_eq!(params.host, "from-flag");
    let target = params.target().unwrap();
    assert_eq!(target.port, 8080);
    assert_eq!(target.branch, "release");
    assert!(target.token.is_none());
}

#[test]
fn non_interactive_missing_value_fails_without_prompting() {
    let key = key_file();
    let cli = Cli {
        non_interactive: true,
        repo: Some("https://github.com/acme/shop.git".into()),
        user: Some("root".into()),
        key: Some(key.path().to_string_lossy().into_owned()),
        port: Some("5000".into()),
        ..Cli::default()
    };
    let mut prompter = Scripted::default();

    let err = resolve::resolve(&cli, run_id(), &no_env, &mut prompter).unwrap_err();

    assert!(matches!(err, DeployError::MissingParameter(ref f) if f == "host"));
    assert!(prompter.asked.is_empty());
}

#[test]
fn environment_ignored_when_interactive() {
    let key = key_file();
    let key_path = key.path().to_string_lossy().into_owned();
    let env = env_of(&[("DEPLOY_HOST", "from-env")]);
    let cli = Cli {
        repo: Some("git@github.com:acme/shop.git".into()),
        ..Cli::default()
    };
    // use token?, branch, user, host, key, port
    let mut prompter = Scripted::new(&["n", "", "", "typed-host", key_path.as_str(), ""]);

    let params = resolve::resolve(&cli, run_id(), &env, &mut prompter).unwrap();

    assert_eq!(params.host, "typed-host");
    assert_eq!(params.user, "ubuntu");
    let target = params.target().unwrap();
    assert_eq!(target.branch, "main");
    assert_eq!(target.port, 3000);
    assert_eq!(prompter.asked.len(), 6);
    assert!(target.token.is_none());
}

#[test]
fn interactive_token_prompt_for_https() {
    let key = key_file();
    let key_path = key.path().to_string_lossy().into_owned();
    let cli = Cli::default();
    // repo, use token?, token, branch, user, host, key, port
    let mut prompter = Scripted::new(&[
        "https://github.com/acme/shop.git",
        "y",
        "ghp_secret",
        "dev",
        "root",
        "10.0.0.5",
        key_path.as_str(),
        "5000",
    ]);

    let params = resolve::resolve(&cli, run_id(), &no_env, &mut prompter).unwrap();

    let target = params.target().unwrap();
    assert_eq!(target.token.as_ref().unwrap().expose_secret(), "ghp_secret");
    assert_eq!(target.branch, "dev");
    assert_eq!(params.user, "root");
    assert_eq!(params.host, "10.0.0.5");
    assert_eq!(target.port, 5000);
}

#[test]
fn invalid_repo_url_rejected() {
    let key = key_file();
    let cli = Cli {
        non_interactive: true,
        repo: Some("not a url".into()),
        user: Some("root".into()),
        host: Some("h".into()),
        key: Some(key.path().to_string_lossy().into_owned()),
        port: Some("5000".into()),
        ..Cli::default()
    };

    let err = resolve::resolve(&cli, run_id(), &no_env, &mut Scripted::default()).unwrap_err();

    assert!(matches!(err, DeployError::InvalidParameter { ref field, .. } if field == "repo"));
}

#[test]
fn invalid_port_rejected() {
    let key = key_file();
    let cli = Cli {
        non_interactive: true,
        repo: Some("https://github.com/acme/shop.git".into()),
        user: Some("root".into()),
        host: Some("h".into()),
        key: Some(key.path().to_string_lossy().into_owned()),
        port: Some("70000".into()),
        ..Cli::default()
    };

    let err = resolve::resolve(&cli, run_id(), &no_env, &mut Scripted::default()).unwrap_err();

    assert!(matches!(err, DeployError::InvalidParameter { ref field, .. } if field == "port"));
}

#[test]
fn missing_key_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        non_interactive: true,
        repo: Some("https://github.com/acme/shop.git".into()),
        user: Some("root".into()),
        host: Some("h".into()),
        key: Some(dir.path().join("id_none").to_string_lossy().into_owned()),
        port: Some("5000".into()),
        ..Cli::default()
    };

    let err = resolve::resolve(&cli, run_id(), &no_env, &mut Scripted::default()).unwrap_err();

    assert!(matches!(err, DeployError::FileNotFound(_)));
}

#[test]
fn cleanup_needs_only_connection_parameters() {
    let key = key_file();
    let cli = Cli {
        cleanup: true,
        non_interactive: true,
        user: Some("root".into()),
        host: Some("h".into()),
        key: Some(key.path().to_string_lossy().into_owned()),
        ..Cli::default()
    };

    let params = resolve::resolve(&cli, run_id(), &no_env, &mut Scripted::default()).unwrap();

    assert!(matches!(params.mode, Mode::Cleanup));
    assert!(params.target().is_none());
}
