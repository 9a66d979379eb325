use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::dom::{apply_patch, Document, DomPatch, HandleMap, PatchError};
use crate::event_loop::EventLoop;
use crate::mutation::{
    ConfigurationError, MutationEngine, MutationObserver, MutationObserverInit, MutationRecord,
};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Patch {
        patch: DomPatch,
    },
    Observe {
        observer: String,
        target: String,
        #[serde(default)]
        options: MutationObserverInit,
    },
    Disconnect {
        observer: String,
    },
    TakeRecords {
        observer: String,
    },
    Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    /// Parse a script written as YAML or JSON.
    pub fn parse(contents: &str) -> Result<Self, ReplayError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to parse replay script: {0}")]
    Script(#[from] serde_yaml::Error),
    #[error("step {step}: {source}")]
    Patch {
        step: usize,
        #[source]
        source: PatchError,
    },
    #[error("step {step}: observer '{observer}' rejected its options: {source}")]
    Observe {
        step: usize,
        observer: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("step {step}: unknown observer '{observer}'")]
    UnknownObserver { step: usize, observer: String },
}

/// A record rendered with node handles instead of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_namespace: Option<String>,
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added_nodes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_nodes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<String>,
}

impl RecordView {
    fn render(record: &MutationRecord, handles: &HandleMap) -> Self {
        let name = |node| handles.public_handle_for(node);
        Self {
            kind: record.mutation_type().as_str().to_string(),
            target: name(record.target()),
            attribute_name: record.attribute_name().map(str::to_owned),
            attribute_namespace: record.attribute_namespace().map(str::to_owned),
            old_value: record.old_value().map(str::to_owned),
            added_nodes: record.added_nodes().iter().copied().map(name).collect(),
            removed_nodes: record.removed_nodes().iter().copied().map(name).collect(),
            previous_sibling: record.previous_sibling().map(name),
            next_sibling: record.next_sibling().map(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySource {
    Callback,
    TakeRecords,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub observer: String,
    pub source: DeliverySource,
    pub records: Vec<RecordView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub patches_applied: usize,
    pub deliveries: usize,
    pub records_delivered: usize,
    pub records_taken: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    pub deliveries: Vec<Delivery>,
    pub summary: ReplaySummary,
}

/// Owns a document, its event loop, and the named observers of one replay.
pub struct ReplaySession {
    event_loop: Rc<EventLoop>,
    document: Document,
    handles: Rc<RefCell<HandleMap>>,
    observers: HashMap<String, MutationObserver>,
    deliveries: Rc<RefCell<Vec<Delivery>>>,
}

impl ReplaySession {
    pub fn new(config: &RuntimeConfig) -> Self {
        let event_loop = Rc::new(EventLoop::new(config));
        let engine = MutationEngine::new(event_loop.clone());
        let document = Document::new(engine);
        let handles = Rc::new(RefCell::new(HandleMap::new(&document)));
        Self {
            event_loop,
            document,
            handles,
            observers: HashMap::new(),
            deliveries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Run every step, then a final microtask checkpoint.
    pub fn run(mut self, script: &ReplayScript) -> Result<ReplayOutcome, ReplayError> {
        let mut summary = ReplaySummary::default();

        for (step, action) in script.steps.iter().enumerate() {
            match action {
                ReplayStep::Patch { patch } => {
                    apply_patch(&mut self.document, &mut self.handles.borrow_mut(), patch)
                        .map_err(|source| ReplayError::Patch { step, source })?;
                    summary.patches_applied += 1;
                }
                ReplayStep::Observe {
                    observer,
                    target,
                    options,
                } => {
                    let node = self
                        .handles
                        .borrow()
                        .resolve_handle(target)
                        .map_err(|source| ReplayError::Patch { step, source })?;
                    self.observer(observer)
                        .observe(node, options)
                        .map_err(|source| ReplayError::Observe {
                            step,
                            observer: observer.clone(),
                            source,
                        })?;
                }
                ReplayStep::Disconnect { observer } => {
                    self.existing_observer(step, observer)?.disconnect();
                }
                ReplayStep::TakeRecords { observer } => {
                    let records = self.existing_observer(step, observer)?.take_records();
                    summary.records_taken += records.len();
                    self.record_delivery(observer, DeliverySource::TakeRecords, &records);
                }
                ReplayStep::Checkpoint => {
                    let ran = self.event_loop.perform_microtask_checkpoint();
                    debug!(target: "replay", step, microtasks = ran, "checkpoint");
                }
            }
        }

        self.event_loop.perform_microtask_checkpoint();

        let deliveries = std::mem::take(&mut *self.deliveries.borrow_mut());
        for delivery in &deliveries {
            if delivery.source == DeliverySource::Callback {
                summary.deliveries += 1;
                summary.records_delivered += delivery.records.len();
            }
        }
        info!(
            target: "replay",
            patches = summary.patches_applied,
            deliveries = summary.deliveries,
            records = summary.records_delivered,
            "replay finished"
        );

        Ok(ReplayOutcome {
            deliveries,
            summary,
        })
    }

    fn observer(&mut self, name: &str) -> &MutationObserver {
        if !self.observers.contains_key(name) {
            let handles = Rc::clone(&self.handles);
            let deliveries = Rc::clone(&self.deliveries);
            let label = name.to_string();
            let observer = MutationObserver::new(self.document.mutations(), move |records, _| {
                let handles = handles.borrow();
                deliveries.borrow_mut().push(Delivery {
                    observer: label.clone(),
                    source: DeliverySource::Callback,
                    records: records
                        .iter()
                        .map(|record| RecordView::render(record, &handles))
                        .collect(),
                });
                Ok(())
            });
            self.observers.insert(name.to_string(), observer);
        }
        &self.observers[name]
    }

    fn existing_observer(&self, step: usize, name: &str) -> Result<&MutationObserver, ReplayError> {
        self.observers
            .get(name)
            .ok_or_else(|| ReplayError::UnknownObserver {
                step,
                observer: name.to_string(),
            })
    }

    fn record_delivery(&self, observer: &str, source: DeliverySource, records: &[MutationRecord]) {
        let handles = self.handles.borrow();
        self.deliveries.borrow_mut().push(Delivery {
            observer: observer.to_string(),
            source,
            records: records
                .iter()
                .map(|record| RecordView::render(record, &handles))
                .collect(),
        });
    }
}
