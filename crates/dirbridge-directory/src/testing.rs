//! Scripted in-memory directory for tests

use async_trait::async_trait;
use dirbridge_core::{DirectoryConfig, Error, Result};
use ldap3::SearchEntry;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ldap::{Connector, DirectoryConnection};

/// Build an entry; repeating an attribute name appends another value.
pub fn entry(dn: &str, attrs: &[(&str, &str)]) -> SearchEntry {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in attrs {
        map.entry(name.to_string()).or_default().push(value.to_string());
    }

    SearchEntry {
        dn: dn.to_string(),
        attrs: map,
        bin_attrs: HashMap::new(),
    }
}

/// Person entry under `ou=people,dc=example,dc=com`
pub fn person(uid: &str, email: &str) -> SearchEntry {
    entry(
        &format!("uid={},ou=people,dc=example,dc=com", uid),
        &[
            ("uid", uid),
            ("givenName", uid),
            ("sn", "Tester"),
            ("mail", email),
            ("cn", uid),
        ],
    )
}

/// Recorded directory call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bind(String),
    Search(String),
    Close,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, String>,
    results: HashMap<String, Vec<SearchEntry>>,
    failing: HashSet<String>,
    unreachable: bool,
    calls: Vec<Call>,
    opened: usize,
    closed: usize,
}

/// Directory double answering searches by exact filter text
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<State>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(self, dn: &str, password: &str) -> Self {
        self.state
            .lock()
            .accounts
            .insert(dn.to_string(), password.to_string());
        self
    }

    pub fn results(self, filter: &str, entries: Vec<SearchEntry>) -> Self {
        self.state.lock().results.insert(filter.to_string(), entries);
        self
    }

    pub fn failing(self, filter: &str) -> Self {
        self.state.lock().failing.insert(filter.to_string());
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn binds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Bind(dn) => Some(dn),
                _ => None,
            })
            .collect()
    }

    pub fn searches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Search(filter) => Some(filter),
                _ => None,
            })
            .collect()
    }

    /// (opened, closed) connection counts
    pub fn connections(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.opened, state.closed)
    }

    /// A connection that skips the connector, for search-level tests.
    pub fn connect(&self) -> MockConnection {
        self.state.lock().opened += 1;
        MockConnection {
            state: self.state.clone(),
            bound_as: None,
            closed: false,
        }
    }
}

#[async_trait]
impl Connector for MockDirectory {
    async fn establish(&self, config: &DirectoryConfig) -> Result<Box<dyn DirectoryConnection>> {
        if self.state.lock().unreachable {
            return Err(Error::Connection(format!("unable to dial {}", config.url())));
        }
        Ok(Box::new(self.connect()))
    }
}

pub struct MockConnection {
    state: Arc<Mutex<State>>,
    bound_as: Option<String>,
    closed: bool,
}

#[async_trait]
impl DirectoryConnection for MockConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Bind(dn.to_string()));

        match state.accounts.get(dn) {
            Some(expected) if expected == password => {
                self.bound_as = Some(dn.to_string());
                Ok(())
            }
            _ => {
                self.bound_as = None;
                Err(Error::Bind(format!("bind as {} rejected with code 49", dn)))
            }
        }
    }

    async fn search(
        &mut self,
        _base: &str,
        filter: &str,
        _attrs: &[String],
    ) -> Result<Vec<SearchEntry>> {
        let mut state = self.state.lock();
        state.calls.push(Call::Search(filter.to_string()));

        if self.bound_as.is_none() {
            return Err(Error::Search("operations error: bind required".into()));
        }
        if state.failing.contains(filter) {
            return Err(Error::Search(format!("search {} error: rc=1", filter)));
        }

        Ok(state.results.get(filter).cloned().unwrap_or_default())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut state = self.state.lock();
        state.calls.push(Call::Close);
        state.closed += 1;
    }
}
