//! Assemblies and the build
//!
//! An [`Assembly`] collects handlers with placement hints. [`Assembly::create`]
//! orders them, merges every slot contract (recursing into branches) and
//! yields an immutable [`Processing`], or the first [`SetupError`].

use crate::branch::{Branch, BranchProcessing};
use crate::config::{AssemblyConfig, Fill};
use crate::error::{BranchError, SetupError};
use crate::handler::{Declarations, Handler, SlotTypes};
use crate::ordering::{self, Position};
use crate::processing::{BuildReport, Node, Processing, UnusedAttribute};
use crate::resolver::{self, Contribution};
use ally_context::{is_identifier, ContextSpec};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// Provenance of the initial slot types given to [`Assembly::create`]
pub const CREATE_SOURCE: &str = "<create>";

#[derive(Debug, Clone)]
struct Entry {
    handler: Arc<dyn Handler>,
    position: Position,
}

/// Named, unordered collection of handlers
#[derive(Debug, Clone)]
pub struct Assembly {
    name: String,
    entries: Vec<Entry>,
    config: AssemblyConfig,
}

impl Assembly {
    /// Create an empty assembly
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            config: AssemblyConfig::default(),
        }
    }

    /// With build and run options
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: AssemblyConfig) -> Self {
        self.config = config;
        self
    }

    /// Assembly name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build and run options
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Add a handler without placement hints
    pub fn add<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_at(handler, Position::new())
    }

    /// Add a handler with placement hints
    pub fn add_at<H: Handler + 'static>(&mut self, handler: H, position: Position) -> &mut Self {
        self.add_shared(Arc::new(handler), position)
    }

    /// Add a handler instance that may also be used elsewhere
    pub fn add_shared(&mut self, handler: Arc<dyn Handler>, position: Position) -> &mut Self {
        self.entries.push(Entry { handler, position });
        self
    }

    /// Add several handlers, in order, all with the same placement hints
    pub fn add_all<I>(&mut self, handlers: I, position: &Position) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        for handler in handlers {
            self.add_shared(handler, position.clone());
        }
        self
    }

    /// Add every handler of `other`, keeping their placement hints
    pub fn include(&mut self, other: &Assembly) -> &mut Self {
        self.entries.extend(other.entries.iter().cloned());
        self
    }

    /// Remove a handler, dropping the hints that refer to it
    ///
    /// # Errors
    /// [`SetupError::UnknownHandler`] if no handler has that name.
    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Handler>, SetupError> {
        let index = self.index_of(name)?;
        let entry = self.entries.remove(index);
        for other in &mut self.entries {
            other.position.before.shift_remove(name);
            other.position.after.shift_remove(name);
        }
        Ok(entry.handler)
    }

    /// Swap a handler for another at the same place
    ///
    /// Hints of other handlers follow the new handler's name.
    ///
    /// # Errors
    /// [`SetupError::UnknownHandler`] if no handler has that name.
    pub fn replace<H: Handler + 'static>(
        &mut self,
        name: &str,
        handler: H,
    ) -> Result<Arc<dyn Handler>, SetupError> {
        let index = self.index_of(name)?;
        let handler: Arc<dyn Handler> = Arc::new(handler);
        if handler.name() != name {
            for other in &mut self.entries {
                other.position.rename(name, handler.name());
            }
        }
        Ok(std::mem::replace(&mut self.entries[index].handler, handler))
    }

    /// Handler names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.handler.name())
    }

    /// Check if a handler with that name was added
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|other| other == name)
    }

    /// Number of handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no handler was added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the processing
    ///
    /// `initial` slot types take part in resolution as one more contributor:
    /// defined attributes are inputs the caller provides, required ones are
    /// outputs the caller expects.
    ///
    /// # Errors
    /// The first ordering, declaration, branch or resolution problem.
    #[tracing::instrument(skip_all, fields(assembly = %self.name))]
    pub fn create(&self, initial: SlotTypes) -> Result<Processing, SetupError> {
        let mut contributions = Contributions::new();
        let mut unused = Vec::new();
        contribute(&mut contributions, CREATE_SOURCE, &initial)?;
        let nodes = plan(self, "", &mut contributions, &mut unused)?;

        let mut specs = IndexMap::with_capacity(contributions.len());
        for (slot, contributed) in &contributions {
            let merged = resolver::merge_slot(slot, contributed)?;
            unused.extend(merged.unused);
            specs.insert(slot.clone(), merged.spec);
        }

        let report = if self.config.report_unused {
            for attr in &unused {
                tracing::warn!(
                    slot = %attr.slot,
                    attribute = %attr.attribute,
                    defined_by = ?attr.defined_by,
                    "defined attribute is never used"
                );
            }
            BuildReport { unused }
        } else {
            BuildReport::default()
        };

        let processing = bind(self.name.clone(), nodes, specs, report, self.config.fill);
        tracing::info!(
            handlers = processing.order().count(),
            slots = processing.slots().count(),
            "assembly created"
        );
        Ok(processing)
    }

    fn index_of(&self, name: &str) -> Result<usize, SetupError> {
        self.entries
            .iter()
            .position(|entry| entry.handler.name() == name)
            .ok_or_else(|| SetupError::UnknownHandler(name.to_string()))
    }
}

type Contributions = IndexMap<String, Vec<Contribution>>;

struct PlannedNode {
    handler: Arc<dyn Handler>,
    branches: Vec<PlannedBranch>,
}

struct PlannedBranch {
    name: String,
    nodes: Vec<PlannedNode>,
    slots: Vec<String>,
    shared: Vec<(String, String)>,
    private: IndexMap<String, Arc<ContextSpec>>,
}

fn contribute(
    contributions: &mut Contributions,
    source: &str,
    declarations: &Declarations,
) -> Result<(), SetupError> {
    let mut seen = IndexSet::with_capacity(declarations.len());
    for (slot, spec) in declarations.iter() {
        checked_name("slot", slot)?;
        if !seen.insert(slot) {
            return Err(SetupError::DuplicateSlot {
                handler: source.to_string(),
                slot: slot.to_string(),
            });
        }
        contributions
            .entry(slot.to_string())
            .or_default()
            .push(Contribution {
                source: source.to_string(),
                spec: Arc::clone(spec),
            });
    }
    Ok(())
}

fn checked_name(kind: &'static str, name: &str) -> Result<(), SetupError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SetupError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Order `assembly` and gather its contributions, including the shared slots
/// of its branches
fn plan(
    assembly: &Assembly,
    prefix: &str,
    contributions: &mut Contributions,
    unused: &mut Vec<UnusedAttribute>,
) -> Result<Vec<PlannedNode>, SetupError> {
    for entry in &assembly.entries {
        checked_name("handler", entry.handler.name())?;
    }
    let sorted = ordering::order(
        assembly
            .entries
            .iter()
            .map(|entry| (entry.handler.name(), &entry.position)),
    )?;

    let mut nodes = Vec::with_capacity(sorted.len());
    for index in sorted {
        let handler = Arc::clone(&assembly.entries[index].handler);
        let source = format!("{prefix}{}", handler.name());
        contribute(contributions, &source, handler.declarations())?;

        let mut branches = Vec::with_capacity(handler.branches().len());
        for (position, branch) in handler.branches().iter().enumerate() {
            branches.push(plan_branch(branch, &source, position, contributions, unused)?);
        }
        nodes.push(PlannedNode { handler, branches });
    }
    Ok(nodes)
}

fn plan_branch(
    branch: &Branch,
    owner: &str,
    index: usize,
    outer: &mut Contributions,
    unused: &mut Vec<UnusedAttribute>,
) -> Result<PlannedBranch, SetupError> {
    let prefix = format!("{owner}[{index}]/");
    let fail = |source: BranchError| SetupError::Branch {
        handler: owner.to_string(),
        index,
        source,
    };

    let mut inner = Contributions::new();
    let nodes = plan(&branch.assembly, &prefix, &mut inner, unused)?;

    let mut local: IndexSet<&str> = IndexSet::new();
    for (slot, spec) in &branch.local {
        if !local.insert(slot.as_str()) {
            return Err(fail(BranchError::DuplicateMapping(slot.clone())));
        }
        let Some(contributed) = inner.get_mut(slot) else {
            return Err(fail(BranchError::UnknownSlot(slot.clone())));
        };
        contributed.push(Contribution {
            source: format!("{prefix}<using>"),
            spec: Arc::clone(spec),
        });
    }

    let mut shared: Vec<(String, String)> = Vec::new();
    for (inner_slot, outer_slot) in &branch.mapping {
        if !inner.contains_key(inner_slot) {
            return Err(fail(BranchError::UnknownSlot(inner_slot.clone())));
        }
        if local.contains(inner_slot.as_str()) || shared.iter().any(|(s, _)| s == inner_slot) {
            return Err(fail(BranchError::DuplicateMapping(inner_slot.clone())));
        }
        checked_name("slot", outer_slot)?;
        shared.push((inner_slot.clone(), outer_slot.clone()));
    }
    if branch.included {
        for slot in inner.keys() {
            if !local.contains(slot.as_str()) && !shared.iter().any(|(s, _)| s == slot) {
                shared.push((slot.clone(), slot.clone()));
            }
        }
    }

    let mut targets: IndexSet<&str> = IndexSet::with_capacity(shared.len());
    for (_, outer_slot) in &shared {
        if !targets.insert(outer_slot.as_str()) {
            return Err(fail(BranchError::OuterCollision(outer_slot.clone())));
        }
    }

    let slots: Vec<String> = inner.keys().cloned().collect();
    for (inner_slot, outer_slot) in &shared {
        if let Some(moved) = inner.shift_remove(inner_slot) {
            outer.entry(outer_slot.clone()).or_default().extend(moved);
        }
    }

    let mut private = IndexMap::with_capacity(inner.len());
    for (slot, contributed) in &inner {
        let merged = resolver::merge_slot(slot, contributed)?;
        unused.extend(merged.unused);
        private.insert(slot.clone(), merged.spec);
    }

    Ok(PlannedBranch {
        name: branch.assembly.name.clone(),
        nodes,
        slots,
        shared,
        private,
    })
}

fn bind(
    name: String,
    nodes: Vec<PlannedNode>,
    specs: IndexMap<String, Arc<ContextSpec>>,
    report: BuildReport,
    fill: Fill,
) -> Processing {
    let nodes = nodes
        .into_iter()
        .map(|node| Node {
            branches: node
                .branches
                .into_iter()
                .map(|branch| bind_branch(branch, &specs, fill))
                .collect(),
            handler: node.handler,
        })
        .collect();
    Processing::new(name, nodes, specs, report, fill)
}

/// Shared inner slots use the very same context as their outer slot
fn bind_branch(
    branch: PlannedBranch,
    outer: &IndexMap<String, Arc<ContextSpec>>,
    fill: Fill,
) -> BranchProcessing {
    let mut specs = IndexMap::with_capacity(branch.slots.len());
    for slot in &branch.slots {
        let spec = match branch.shared.iter().find(|(inner, _)| inner == slot) {
            Some((_, outer_slot)) => outer.get(outer_slot),
            None => branch.private.get(slot),
        };
        if let Some(spec) = spec {
            specs.insert(slot.clone(), Arc::clone(spec));
        }
    }
    let processing = bind(branch.name, branch.nodes, specs, BuildReport::default(), fill);
    BranchProcessing::new(processing, branch.shared)
}
