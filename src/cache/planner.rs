//! Invalidation plan generation.
//!
//! Maps a confirmed mutation onto the fingerprint patterns whose cached reads
//! may now be wrong. Pure: no cache or network access.

use std::fmt;

use crate::domain::types::{EntityKind, MutationOp};

use super::events::{BookRefs, MutationEvent};
use super::keys::{Fingerprint, FingerprintPattern};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    patterns: Vec<FingerprintPattern>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvalidationPlan {{ patterns: {:?} }}", self.patterns)
    }
}

impl InvalidationPlan {
    pub fn for_event(event: &MutationEvent) -> Self {
        let mut plan = Self::default();
        let changes_record = matches!(event.operation, MutationOp::Update | MutationOp::Delete);

        match event.kind {
            EntityKind::Book => {
                plan.push(FingerprintPattern::AllBookLists);
                if let Some(id) = event.id {
                    if changes_record {
                        plan.push(FingerprintPattern::Book(id));
                    }
                    // A deleted book takes its notes with it.
                    if event.operation == MutationOp::Delete {
                        plan.push(FingerprintPattern::BookNotes(id));
                    }
                }
            }
            EntityKind::Note => {
                plan.push(FingerprintPattern::AllNoteLists);
                if let Some(id) = event.id {
                    plan.push(FingerprintPattern::Note(id));
                }
                match &event.books {
                    BookRefs::Known(books) => {
                        for book in books {
                            plan.push(FingerprintPattern::BookNotes(*book));
                        }
                    }
                    BookRefs::Unknown => plan.push(FingerprintPattern::AllBookNotes),
                }
                // Usage counts shown in tag lists follow note tags.
                plan.push(FingerprintPattern::AllTagLists);
            }
            EntityKind::Tag => {
                plan.push(FingerprintPattern::AllTagLists);
                if let (Some(id), true) = (event.id, changes_record) {
                    plan.push(FingerprintPattern::Tag(id));
                }
            }
        }

        plan
    }

    fn push(&mut self, pattern: FingerprintPattern) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn patterns(&self) -> &[FingerprintPattern] {
        &self.patterns
    }

    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches(fingerprint))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
