mod fetch;
mod query;
mod resolve;
mod types;

pub use fetch::{Completion, CompletionReceiver, CompletionSender, FetchRun, Launcher, Outcome};
pub use query::{build_graphql_query, CountryQueryBuilder, COUNTRY_FRAGMENT};
pub use resolve::resolve_display_items;
pub use types::{CountryRecord, DisplayItem, Protocol, Region};

#[cfg(test)]
pub(crate) use fetch::tests as fakes;
