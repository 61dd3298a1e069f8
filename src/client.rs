//! Downstream consumer of the gateway.
//!
//! [`QuotesClient`] calls `/quotes` and `/health` on a running gateway and
//! classifies what comes back: busy rejections with their `Retry-After`,
//! non-2xx statuses with a capped body snippet, unparsable bodies and
//! `ok != true` payloads. [`FetchReport`] flattens one attempt into a JSON
//! document suitable for logging or for the probe binary.

mod error;
mod quotes;
mod report;

pub use error::{FetchError, BODY_SNIPPET_LIMIT};
pub use quotes::{QuotesClient, QuotesFetch};
pub use report::FetchReport;
