//! Single-host deployment for containerized repositories.
//!
//! Hoist takes a git repository that carries a `Dockerfile` or a
//! compose file, copies it to one Linux host over SSH, starts it in
//! the container engine, and puts nginx in front of it on port 80.
//! No agent runs on the host: everything goes through `ssh`, `scp`
//! and `rsync`.
//!
//! # Overview
//!
//! A run is a [`Pipeline`] over a resolved parameter set
//! ([`params::Params`]):
//!
//! 1. **Resolve** - flags, then `DEPLOY_*` variables
//!    (`--non-interactive`) or prompts
//! 2. **Fetch** - clone or update the branch locally and detect the
//!    build descriptor
//! 3. **Prepare** - install docker, the compose plugin and nginx on
//!    the host when missing
//! 4. **Transfer** - rsync the working copy to `~/deploy_<id>`
//! 5. **Deploy** - `docker compose up --build -d` or
//!    `docker build` + `docker run`
//! 6. **Proxy** - install `deploy_<id>.conf`, `nginx -t`, reload
//! 7. **Validate** - probe the app and the proxy, report only
//!
//! `--cleanup` instead tears down every container, every
//! `deploy_<id>` site and directory, best effort.
//!
//! Every external program goes through a [`Runner`](cmd::Runner),
//! so the whole flow can be driven against a recording fake.
//!
//! # Examples
//!
//! ```sh
//! hoist --repo https://github.com/acme/shop.git --branch main \
//!       --user ubuntu --host 203.0.113.7 --key ~/.ssh/id_ed25519 \
//!       --port 3000
//!
//! DEPLOY_REPO=git@github.com:acme/shop.git DEPLOY_USER=root \
//! DEPLOY_HOST=203.0.113.7 DEPLOY_KEY=/keys/deploy DEPLOY_PORT=8080 \
//!     hoist --non-interactive
//!
//! hoist --cleanup --user root --host 203.0.113.7 --key /keys/deploy
//! ```
//!
//! Programmatic use:
//!
//! ```rust,no_run
//! use hoist::cmd::SystemRunner;
//! use hoist::params::RunId;
//! use hoist::pipeline::{self, Cli, Settings};
//! use hoist::resolve::TerminalPrompter;
//!
//! fn main() -> anyhow::Result<()> {
//!     let (cli, _unknown) = Cli::parse_lenient(std::env::args().skip(1))?;
//!     let env = |key: &str| std::env::var(key).ok();
//!     pipeline::execute(
//!         &cli,
//!         RunId::now(),
//!         &SystemRunner,
//!         &env,
//!         &mut TerminalPrompter,
//!         Settings::default(),
//!     )?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cleanup;
pub mod cmd;
pub mod compose;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod nginx;
pub mod params;
pub mod pipeline;
pub mod provision;
pub mod proxy;
pub mod resolve;
pub mod source;
pub mod ssh;
pub mod transfer;
pub mod validate;

pub use error::{DeployError, DeployResult};
pub use nginx::NginxSite;
pub use params::{Params, RunId};
pub use pipeline::{Cli, Outcome, Pipeline, Settings};
