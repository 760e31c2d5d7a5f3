// External collaborators: the repository metadata source, the search index,
// and the notification transport. Each is a trait plus the HTTP/process
// implementation used in production; tests substitute in-memory fakes.

pub mod notify;
pub mod solr;
pub mod source;

pub use notify::{LogNotifier, Notifier, SendmailNotifier};
pub use solr::{SearchIndex, SolrClient};
pub use source::{MetadataSource, PurlClient};
