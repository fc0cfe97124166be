//! Registry report rendering.
//!
//! The report is the line-oriented dump of the activity journal that the
//! registry receives on the closing session: each section is a count line
//! followed by that many records. Deterministic for a fixed journal.

use std::fmt::Write as _;

use crate::journal::JournalSnapshot;

/// Serialize the journal into the registry report.
pub fn assemble_report(journal: &JournalSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", journal.peers.len());
    for peer in &journal.peers {
        let _ = writeln!(out, "{peer}");
    }

    let _ = writeln!(out, "{}", journal.sources.len());
    for source in &journal.sources {
        let _ = writeln!(out, "{}", source.address);
        let _ = writeln!(out, "{}", source.date);
        let _ = writeln!(out, "{}", source.peers.len());
        for peer in &source.peers {
            let _ = writeln!(out, "{peer}");
        }
    }

    let _ = writeln!(out, "{}", journal.recv_adverts.len());
    for advert in &journal.recv_adverts {
        let _ = writeln!(out, "{} {} {}", advert.to, advert.from, advert.date);
    }

    let _ = writeln!(out, "{}", journal.sent_adverts.len());
    for advert in &journal.sent_adverts {
        let _ = writeln!(out, "{} {} {}", advert.to, advert.from, advert.date);
    }

    let _ = writeln!(out, "{}", journal.snippets.len());
    for snippet in &journal.snippets {
        let _ = writeln!(
            out,
            "{} {} {}",
            snippet.timestamp, snippet.text, snippet.sender
        );
    }

    out
}
