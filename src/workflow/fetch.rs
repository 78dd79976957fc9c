use super::query::build_graphql_query;
use super::types::{CountryRecord, DisplayItem, Protocol};
use crate::client::CountrySource;
use crate::error::FetchError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One dialog session's worth of lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRun {
    /// Dialog session that started the run
    pub epoch: u64,
    pub protocol: Protocol,
    pub items: Vec<DisplayItem>,
}

/// Result of one finished request
#[derive(Debug)]
pub enum Outcome {
    /// A REST lookup answered
    Country(CountryRecord),
    /// A REST lookup failed
    CountryFailed { code: String, error: FetchError },
    /// The GraphQL query answered with these countries
    Countries(Vec<CountryRecord>),
    QueryFailed(FetchError),
}

/// A finished request tagged with the epoch of the run that issued it
#[derive(Debug)]
pub struct Completion {
    pub epoch: u64,
    pub outcome: Outcome,
}

pub type CompletionSender = mpsc::UnboundedSender<Completion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

/// Spawns lookup tasks that report into a single completion channel.
///
/// Tasks never touch view state; whoever owns the receiver applies the
/// completions one at a time. Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct Launcher {
    source: Arc<dyn CountrySource>,
    sink: CompletionSender,
}

impl Launcher {
    pub fn new(source: Arc<dyn CountrySource>) -> (Self, CompletionReceiver) {
        let (sink, receiver) = mpsc::unbounded_channel();
        (Self { source, sink }, receiver)
    }

    /// Start every request of the run. An empty run starts nothing.
    pub fn launch(&self, run: FetchRun) -> Vec<JoinHandle<()>> {
        if run.items.is_empty() {
            debug!(epoch = run.epoch, "nothing selected, no lookups issued");
            return Vec::new();
        }

        info!(
            epoch = run.epoch,
            protocol = %run.protocol,
            countries = run.items.len(),
            "starting country lookups"
        );

        match run.protocol {
            Protocol::Rest => self.fetch_via_rest(run.epoch, run.items),
            Protocol::GraphQl => vec![self.fetch_via_graphql(run.epoch, &run.items)],
        }
    }

    /// One independent request per item, all in flight at once
    fn fetch_via_rest(&self, epoch: u64, items: Vec<DisplayItem>) -> Vec<JoinHandle<()>> {
        items
            .into_iter()
            .map(|item| {
                let source = Arc::clone(&self.source);
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    let outcome = match source.country_by_code(&item.code).await {
                        Ok(record) => Outcome::Country(record),
                        Err(error) => Outcome::CountryFailed {
                            code: item.code,
                            error,
                        },
                    };
                    report(&sink, Completion { epoch, outcome });
                })
            })
            .collect()
    }

    /// A single batched query for every item
    fn fetch_via_graphql(&self, epoch: u64, items: &[DisplayItem]) -> JoinHandle<()> {
        let query = build_graphql_query(items);
        let source = Arc::clone(&self.source);
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let outcome = match source.countries_by_query(&query).await {
                Ok(records) => Outcome::Countries(records),
                Err(error) => Outcome::QueryFailed(error),
            };
            report(&sink, Completion { epoch, outcome });
        })
    }
}

fn report(sink: &CompletionSender, completion: Completion) {
    if sink.send(completion).is_err() {
        debug!("completion dropped, dashboard is gone");
    }
}
