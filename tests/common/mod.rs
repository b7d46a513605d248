#![allow(dead_code)]

use std::cell::RefCell;

use hoist::cmd::{Output, Runner};
use hoist::error::DeployResult;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    /// Program and arguments joined by spaces.
    pub fn line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// The remote command of an `ssh` call.
    pub fn remote(&self) -> Option<&str> {
        (self.program == "ssh")
            .then(|| self.args.last().map(String::as_str))
            .flatten()
    }
}

/// Records every call and answers from substring rules. The first
/// rule whose pattern occurs in the command line wins; anything else
/// succeeds with empty output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<(String, Output)>,
    calls: RefCell<Vec<Call>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `output`.
    pub fn on(mut self, pattern: &str, output: Output) -> Self {
        self.rules.push((pattern.to_string(), output));
        self
    }

    /// A host running apt, with every component already installed
    /// and the app answering probes.
    pub fn healthy_host() -> Self {
        Self::new()
            .on("echo apt", Output::ok("apt\n"))
            .on("systemctl is-active docker", Output::ok("active\n"))
            .on("http_code", Output::ok("200"))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::line).collect()
    }

    /// Remote commands, in order.
    pub fn remote_commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.remote().map(ToString::to_string))
            .collect()
    }

    /// Calls to `program`.
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    /// Index of the first remote command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.remote_commands().iter().position(|c| c.contains(needle))
    }
}

impl Runner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<Output> {
        let call = Call {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        };
        let line = call.line();
        self.calls.borrow_mut().push(call);

        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| Output::ok("")))
    }
}
