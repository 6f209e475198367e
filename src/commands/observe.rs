//! Console reporting for pipeline activity.

use colored::*;

use sieve::{TriageObserver, TriageState};

/// Prints one line per state transition.
///
/// Verbose mode narrates every stage of a single triage; quiet mode only
/// reports terminals, which keeps a parallel retriage readable.
pub struct ConsoleObserver {
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TriageObserver for ConsoleObserver {
    fn on_transition(&self, issue_number: u64, state: &TriageState) {
        match state {
            TriageState::Fetched if self.verbose => {
                println!("📥 #{issue_number} fetched");
            }
            TriageState::Classified if self.verbose => {
                println!("   #{issue_number} classified");
            }
            TriageState::DuplicateChecked if self.verbose => {
                println!("   #{issue_number} checked for duplicates");
            }
            TriageState::PriorityAssessed if self.verbose => {
                println!("   #{issue_number} priority assessed");
            }
            TriageState::Stored if self.verbose => {
                println!("   #{issue_number} stored in memory");
            }
            TriageState::Done => {
                println!("{} #{issue_number} triaged", "✓".green());
            }
            TriageState::Failed(stage) => {
                println!("{} #{issue_number} failed at {:?}", "✗".red(), stage);
            }
            _ => {}
        }
    }
}
