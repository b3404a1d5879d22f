//! A blocking wrapper around a mock GitHub API for synchronous BDD steps.

use std::io;
use std::rc::Rc;

use rstest_bdd::Slot;
use serde_json::Value;
use tokio::runtime::Runtime;
use wiremock::MockServer;

use super::common::{mount_json, mount_pull_request, pull_request_url};

/// Runtime plus mock API for one scenario. Clones share both.
#[derive(Clone)]
pub struct MockGithub {
    runtime: Rc<Runtime>,
    server: Rc<MockServer>,
}

impl MockGithub {
    /// Returns the scenario's mock API, starting it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the Tokio runtime cannot be built.
    pub fn in_scenario(slot: &Slot<Self>) -> io::Result<Self> {
        if let Some(existing) = slot.get() {
            return Ok(existing);
        }
        let runtime = Runtime::new()?;
        let server = runtime.block_on(MockServer::start());
        let github = Self {
            runtime: Rc::new(runtime),
            server: Rc::new(server),
        };
        slot.set(github.clone());
        Ok(github)
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn url_for(&self, number: u64) -> String {
        pull_request_url(&self.server, number)
    }

    pub fn serve_pull_request(&self, number: u64, commits: Vec<Value>, files: Vec<Value>) {
        self.block_on(mount_pull_request(&self.server, number, commits, files));
    }

    pub fn serve_error(&self, route: &str, status: u16, body: Value) {
        self.block_on(mount_json(&self.server, route, status, body));
    }
}
