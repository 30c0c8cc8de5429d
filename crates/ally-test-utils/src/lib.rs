//! Testing utilities for the Ally workspace
//!
//! Closure-backed handlers, a shared call journal and tracing setup.

#![allow(missing_docs)]

use ally_context::ContextSpec;
use ally_processor::{Branch, Chain, Declarations, Flow, Handler, Slots};
use parking_lot::Mutex;
use std::sync::{Arc, Once};

type Process = dyn for<'p> Fn(&mut Chain<'p>, &mut Slots) -> anyhow::Result<Flow> + Send + Sync;

/// Handler whose behaviour is a closure
pub struct FnHandler {
    name: String,
    declarations: Declarations,
    branches: Vec<Branch>,
    process: Box<Process>,
}

impl FnHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Declarations::new(),
            branches: Vec::new(),
            process: Box::new(proceed),
        }
    }

    #[must_use]
    pub fn slot(mut self, slot: impl Into<String>, spec: ContextSpec) -> Self {
        self.declarations = self.declarations.slot(slot, spec);
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    #[must_use]
    pub fn on_process<F>(mut self, process: F) -> Self
    where
        F: for<'p> Fn(&mut Chain<'p>, &mut Slots) -> anyhow::Result<Flow> + Send + Sync + 'static,
    {
        self.process = Box::new(process);
        self
    }

    /// Record the handler name in `journal` and continue
    #[must_use]
    pub fn logging(self, journal: &Journal) -> Self {
        let journal = journal.clone();
        let name = self.name.clone();
        self.on_process(move |_, _| {
            journal.push(&name);
            Ok(Flow::Continue)
        })
    }
}

fn proceed(_: &mut Chain<'_>, _: &mut Slots) -> anyhow::Result<Flow> {
    Ok(Flow::Continue)
}

impl Handler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    fn branches(&self) -> &[Branch] {
        &self.branches
    }

    fn process<'p>(&'p self, chain: &mut Chain<'p>, slots: &mut Slots) -> anyhow::Result<Flow> {
        (self.process)(chain, slots)
    }
}

/// Ordered log of events shared between handlers, finalizers and the test
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Install a test subscriber once, filtered by `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
