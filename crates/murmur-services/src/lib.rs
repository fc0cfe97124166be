//! murmur-services — peer tracking, console mailboxes, and the activity
//! journal behind the registry report.

pub mod journal;
pub mod mailbox;
pub mod peer;
pub mod report;

pub use journal::ActivityJournal;
pub use mailbox::{Mailbox, Snippet};
pub use peer::PeerTable;
