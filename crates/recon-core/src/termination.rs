//! Termination detection on free-form model text.
//!
//! Matching is case-insensitive substring search. Changing these phrases
//! changes when sessions end, so keep them in sync with the system prompts.

use crate::session::TerminationReason;

const STOP_MARKER: &str = "[stop]";

/// Inspect one text part for a completion signal
pub fn detect(text: &str) -> Option<TerminationReason> {
    let lower = text.to_lowercase();

    if lower.contains(STOP_MARKER) {
        return Some(TerminationReason::StopSignal);
    }
    if lower.contains("final answer") && lower.contains("coordinates") {
        return Some(TerminationReason::FinalAnswer);
    }
    if lower.contains("impossible") && lower.contains("stock photo") {
        return Some(TerminationReason::Impossible);
    }
    None
}

/// Whether a part announces a final answer (exact case), which suppresses
/// the "please continue" nudge
pub fn mentions_final_answer(text: &str) -> bool {
    text.contains("Final Answer")
}
