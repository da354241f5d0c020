//! Setup command: check access to the Messages and AddressBook stores.
//!
//! CHANGELOG:
//! - 10/19/2026 - Access diagnostics for both stores
//! - 01/10/2026 - Initial stub implementation

use anyhow::{bail, Result};

use crate::output::OutputControls;
use crate::session::MessagesSession;

/// Report readability and schema of both stores; fails when either is unusable.
pub fn check_access(session: &MessagesSession, output: &OutputControls) -> Result<()> {
    let report = session.access_report();

    if output.json {
        output.print(&report);
    } else {
        println!("{}", report.to_text());
    }

    if !report.ok() {
        bail!("one or more stores are not accessible");
    }
    Ok(())
}
