//! In-memory dataset repository driven by test scripts

use async_trait::async_trait;
use dredge_client::Result;
use dredge_core::{RequestPayload, ResultFormat};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::DatasetRepository;

type TriggerFn = Box<dyn Fn(&RequestPayload) -> Result<Option<String>> + Send + Sync>;
type StatusFn = Box<dyn Fn(&str, usize) -> Result<String> + Send + Sync>;
type FetchFn = Box<dyn Fn(&str) -> Result<Value> + Send + Sync>;

pub(crate) struct ScriptedRepository {
    trigger: TriggerFn,
    status: StatusFn,
    fetch: FetchFn,
    trigger_calls: AtomicUsize,
    status_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl ScriptedRepository {
    /// Triggers `s1`, reports `ready` and returns an empty list
    pub fn new() -> Self {
        Self {
            trigger: Box::new(|_| Ok(Some("s1".to_string()))),
            status: Box::new(|_, _| Ok("ready".to_string())),
            fetch: Box::new(|_| Ok(json!([]))),
            trigger_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_trigger<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestPayload) -> Result<Option<String>> + Send + Sync + 'static,
    {
        self.trigger = Box::new(f);
        self
    }

    pub fn on_status<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String> + Send + Sync + 'static,
    {
        self.status = Box::new(f);
        self
    }

    /// Answer status calls from `sequence`, repeating its last entry
    pub fn with_statuses(self, sequence: &[&'static str]) -> Self {
        let sequence: Vec<&'static str> = sequence.to_vec();
        self.on_status(move |_, call| {
            let idx = call.min(sequence.len().saturating_sub(1));
            Ok(sequence.get(idx).copied().unwrap_or("in_progress").to_string())
        })
    }

    pub fn on_fetch<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        self.fetch = Box::new(f);
        self
    }

    pub fn with_data(self, data: Value) -> Self {
        self.on_fetch(move |_| Ok(data.clone()))
    }

    pub fn trigger_calls(&self) -> usize {
        self.trigger_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetRepository for ScriptedRepository {
    async fn trigger(
        &self,
        payload: &RequestPayload,
        _dataset_id: &str,
        _include_errors: bool,
        _tag: Option<&str>,
    ) -> Result<Option<String>> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        (self.trigger)(payload)
    }

    async fn status(&self, snapshot_id: &str) -> Result<String> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst);
        (self.status)(snapshot_id, call)
    }

    async fn fetch(&self, snapshot_id: &str, _format: ResultFormat) -> Result<Value> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        (self.fetch)(snapshot_id)
    }
}
