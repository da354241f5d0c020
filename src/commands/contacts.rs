//! Contact commands: find-contact, countries.
//!
//! CHANGELOG:
//! - 10/19/2026 - Fuzzy AddressBook lookup and dial-code table
//! - 01/10/2026 - Implemented list and add with JSON file I/O
//! - 01/10/2026 - Initial stub implementation

use anyhow::Result;

use crate::output::OutputControls;
use crate::phone;
use crate::session::MessagesSession;

/// Fuzzy-match contacts by name or nickname.
pub fn find(session: &mut MessagesSession, name: &str, output: &OutputControls) -> Result<()> {
    let matches = session.find_contact_by_name(name);

    if output.json {
        output.print(&matches);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No contacts found matching '{}'.", name);
        return Ok(());
    }

    println!("Contacts matching '{}' ({}):", name, matches.len());
    println!("{}", "-".repeat(50));
    for (i, m) in matches.iter().enumerate() {
        let via = if m.matched_on == m.name {
            String::new()
        } else {
            format!(" [matched '{}']", m.matched_on)
        };
        println!("{}. {}: {} (score {:.2}){}", i + 1, m.name, m.phone, m.score, via);
    }
    Ok(())
}

/// List supported dial codes.
pub fn countries(output: &OutputControls) -> Result<()> {
    let countries = phone::list_countries();

    if output.json {
        output.print(&countries);
    } else {
        for c in &countries {
            println!("{} {:<5} {} ({})", c.flag, c.dial_code, c.name, c.alpha2);
        }
    }
    Ok(())
}
