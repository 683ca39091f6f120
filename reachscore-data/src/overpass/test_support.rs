//! Scripted [`AmenityService`] for fetcher tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::{AmenityService, ServiceResponse, TransportError};

type Outcome = Result<ServiceResponse, TransportError>;

/// Replays scripted outcomes in order, then repeats a fallback outcome.
#[derive(Debug)]
pub struct ScriptedAmenityService {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    requests: AtomicU32,
    queries: Mutex<Vec<String>>,
}

impl ScriptedAmenityService {
    /// Service replaying `script`; once drained it answers HTTP 500.
    pub fn new(script: Vec<Outcome>) -> Self {
        Self::with_fallback(script, Ok(ServiceResponse::new(500, "script exhausted")))
    }

    /// Service answering `outcome` to every request.
    pub fn repeating(outcome: Outcome) -> Self {
        Self::with_fallback(Vec::new(), outcome)
    }

    /// Service replaying `script`, then repeating `fallback`.
    pub fn with_fallback(script: Vec<Outcome>, fallback: Outcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Number of requests served so far.
    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Query bodies received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AmenityService for ScriptedAmenityService {
    async fn execute(&self, query: &str) -> Result<ServiceResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_owned());
        }
        let scripted = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}
