//! The text path: accept edits under a character cap, render bionic output.
//!
//! Every accepted edit replaces the document wholesale (the host sends the
//! full textarea contents per keystroke) and re-renders the transform. An
//! edit that would exceed the cap is rejected with a limit-naming error and
//! changes **nothing** — the previously accepted text and its rendered output
//! stay exactly as they were (last-valid-state-wins).

use crate::bionic;
use crate::error::ReadFastError;
use crate::policy::LimitProfile;

/// A bounded, transform-on-write text document.
#[derive(Debug, Clone)]
pub struct TextEditor {
    limits: LimitProfile,
    accepted: String,
    rendered: String,
}

impl TextEditor {
    /// An empty editor governed by `limits`.
    pub fn new(limits: LimitProfile) -> Self {
        Self {
            limits,
            accepted: String::new(),
            rendered: String::new(),
        }
    }

    /// Replace the document with `new_text` if it fits the cap.
    ///
    /// Character count is measured in characters, matching the cap the user
    /// sees, not in bytes. On rejection the prior state is untouched.
    pub fn apply_edit(&mut self, new_text: &str) -> Result<(), ReadFastError> {
        if let Some(limit) = self.limits.max_chars {
            let attempted = new_text.chars().count();
            if attempted > limit {
                return Err(ReadFastError::CharLimitExceeded { attempted, limit });
            }
        }
        self.rendered = bionic::transform(new_text);
        self.accepted = new_text.to_string();
        Ok(())
    }

    /// Swap in a new limit profile (session change). The accepted text is
    /// kept even if it now exceeds the cap; only future edits are checked.
    pub fn set_limits(&mut self, limits: LimitProfile) {
        self.limits = limits;
    }

    /// The last accepted text.
    pub fn text(&self) -> &str {
        &self.accepted
    }

    /// Bionic markup for the last accepted text.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn limits(&self) -> &LimitProfile {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bionic::strip_emphasis;
    use crate::policy::{LimitTable, Tier};

    fn small_profile(max_chars: usize) -> LimitProfile {
        LimitProfile {
            max_chars: Some(max_chars),
            max_file_bytes: 0,
            max_concurrent_files: Some(1),
        }
    }

    #[test]
    fn accepted_edit_updates_text_and_rendering() {
        let mut ed = TextEditor::new(small_profile(100));
        ed.apply_edit("read fast").unwrap();
        assert_eq!(ed.text(), "read fast");
        assert_eq!(strip_emphasis(ed.rendered()), "read fast");
    }

    #[test]
    fn rejected_edit_leaves_prior_state_intact() {
        let mut ed = TextEditor::new(small_profile(5000));
        ed.apply_edit("hello").unwrap();
        let rendered_before = ed.rendered().to_string();

        let too_long = "x".repeat(5001);
        let err = ed.apply_edit(&too_long).unwrap_err();
        match err {
            ReadFastError::CharLimitExceeded { attempted, limit } => {
                assert_eq!(attempted, 5001);
                assert_eq!(limit, 5000);
            }
            other => panic!("expected CharLimitExceeded, got {other:?}"),
        }

        assert_eq!(ed.text(), "hello");
        assert_eq!(ed.rendered(), rendered_before);
    }

    #[test]
    fn edit_exactly_at_limit_is_accepted() {
        let mut ed = TextEditor::new(small_profile(5));
        ed.apply_edit("abcde").unwrap();
        assert_eq!(ed.text(), "abcde");
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // Five 3-byte characters must fit a 5-char cap.
        let mut ed = TextEditor::new(small_profile(5));
        ed.apply_edit("あいうえお").unwrap();
        assert_eq!(ed.text(), "あいうえお");
    }

    #[test]
    fn unbounded_profile_accepts_large_input() {
        let limits = LimitTable::default().resolve(Tier::Ultimate, true);
        let mut ed = TextEditor::new(limits);
        let big = "word ".repeat(100_000);
        ed.apply_edit(&big).unwrap();
        assert_eq!(ed.text(), big);
    }

    #[test]
    fn tighter_limits_after_session_change_only_gate_future_edits() {
        let mut ed = TextEditor::new(small_profile(100));
        ed.apply_edit("this text has thirty characters").unwrap();

        ed.set_limits(small_profile(10));
        // Existing text survives the downgrade.
        assert_eq!(ed.text(), "this text has thirty characters");
        // New oversized edits are rejected against the new cap.
        assert!(ed.apply_edit("0123456789ab").is_err());
        assert_eq!(ed.text(), "this text has thirty characters");
    }
}
