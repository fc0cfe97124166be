//! Console — stdin lines become outgoing snippets, received snippets are
//! printed as they arrive.
//!
//! The reader blocks on stdin from a dedicated thread; the printer is a
//! tokio task polling the incoming mailbox. Both stop cooperatively when
//! `close` is called, a literal `close` line is typed, or stdin hits end
//! of input.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use murmur_services::Mailbox;

/// Printer poll cadence. Keeps the writer from spinning on an empty
/// mailbox.
const PRINT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Console {
    mailbox: Arc<Mailbox>,
    active: AtomicBool,
}

impl Console {
    /// Start the reader thread and the printer task, returning the
    /// handle used to close them.
    pub fn spawn(mailbox: Arc<Mailbox>) -> Arc<Self> {
        let console = Arc::new(Self {
            mailbox,
            active: AtomicBool::new(true),
        });
        let reader = Arc::clone(&console);
        std::thread::spawn(move || reader.read_input());
        let printer = Arc::clone(&console);
        tokio::spawn(async move { printer.print_incoming().await });
        console
    }

    /// Stop both activities at their next wakeup.
    pub fn close(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn read_input(&self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if !self.is_active() {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            if line.trim() == "close" {
                break;
            }
            self.mailbox.put_outgoing(line);
        }
        self.close();
        tracing::debug!("console reader stopped");
    }

    async fn print_incoming(&self) {
        while self.is_active() {
            match self.mailbox.pop_incoming() {
                Some(snippet) => println!("{snippet}"),
                None => tokio::time::sleep(PRINT_POLL_INTERVAL).await,
            }
        }
        tracing::debug!("console printer stopped");
    }
}
