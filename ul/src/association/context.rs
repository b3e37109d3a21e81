//! Presentation context identifiers and negotiation.
use crate::pdu::{PresentationContextProposed, PresentationContextResultReason};
use dicomkit_core::DataDictionary;
use dicomkit_dictionary_std::StandardDataDictionary;
use std::sync::atomic::{AtomicU8, Ordering};

/// Largest presentation context identifier handed out.
pub const MAX_CONTEXT_ID: u8 = 127;

/// Issues presentation context identifiers:
/// odd numbers from 1 to 127, then back to 1.
///
/// Allocation is a single atomic step,
/// so one allocator may be shared between threads.
/// Identifiers are unique within any run of 64 allocations.
#[derive(Debug)]
pub struct ContextIdAllocator {
    next: AtomicU8,
}

impl Default for ContextIdAllocator {
    fn default() -> Self {
        ContextIdAllocator::new()
    }
}

impl ContextIdAllocator {
    pub const fn new() -> Self {
        ContextIdAllocator {
            next: AtomicU8::new(1),
        }
    }

    /// Take the next identifier.
    pub fn next_id(&self) -> u8 {
        let previous = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| {
                Some(if id >= MAX_CONTEXT_ID { 1 } else { id + 2 })
            });
        match previous {
            Ok(id) | Err(id) => id,
        }
    }
}

/// A presentation context as settled by negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresentationContextNegotiated {
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntax: String,
    pub reason: PresentationContextResultReason,
}

impl PresentationContextNegotiated {
    pub fn is_accepted(&self) -> bool {
        self.reason == PresentationContextResultReason::Acceptance
    }
}

/// Whether the data set codec handles the given transfer syntax.
pub fn check_transfer_syntax(uid: &str) -> bool {
    StandardDataDictionary.is_supported_transfer_syntax(uid)
}

pub(crate) fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c == '\0' || c == ' ')
}

/// Settle one proposed presentation context on the acceptor side.
///
/// The abstract syntax must be in `abstract_syntaxes`
/// (any is accepted if `promiscuous`),
/// and the first proposed transfer syntax found in `transfer_syntaxes`
/// (or, if that list is empty, the first one the codec supports) is chosen.
pub(crate) fn negotiate(
    proposed: &PresentationContextProposed,
    abstract_syntaxes: &[String],
    transfer_syntaxes: &[String],
    promiscuous: bool,
) -> PresentationContextNegotiated {
    let abstract_syntax = trim_uid(&proposed.abstract_syntax).to_string();
    if !promiscuous && !abstract_syntaxes.iter().any(|uid| trim_uid(uid) == abstract_syntax) {
        return PresentationContextNegotiated {
            id: proposed.id,
            abstract_syntax,
            transfer_syntax: dicomkit_dictionary_std::uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
            reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
        };
    }

    let chosen = proposed.transfer_syntaxes.iter().map(|ts| trim_uid(ts)).find(|ts| {
        check_transfer_syntax(ts)
            && (transfer_syntaxes.is_empty()
                || transfer_syntaxes.iter().any(|uid| trim_uid(uid) == *ts))
    });

    match chosen {
        Some(ts) => PresentationContextNegotiated {
            id: proposed.id,
            abstract_syntax,
            transfer_syntax: ts.to_string(),
            reason: PresentationContextResultReason::Acceptance,
        },
        None => PresentationContextNegotiated {
            id: proposed.id,
            abstract_syntax,
            transfer_syntax: dicomkit_dictionary_std::uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
            reason: PresentationContextResultReason::TransferSyntaxesNotSupported,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_dictionary_std::uids;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn odd_ids_wrap_after_127() {
        let allocator = ContextIdAllocator::new();
        let ids: Vec<u8> = (0..64).map(|_| allocator.next_id()).collect();
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&127));
        assert!(ids.iter().all(|id| id % 2 == 1));
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 64);
        assert_eq!(allocator.next_id(), 1);
        assert_eq!(allocator.next_id(), 3);
    }

    #[test]
    fn shared_allocator_gives_distinct_ids() {
        let allocator = Arc::new(ContextIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || (0..16).map(|_| allocator.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let ids: HashSet<u8> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn negotiate_contexts() {
        let proposed = PresentationContextProposed {
            id: 3,
            abstract_syntax: format!("{}\0", uids::VERIFICATION),
            transfer_syntaxes: vec![
                uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
                uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
                uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
            ],
        };
        let supported = vec![uids::VERIFICATION.to_string()];

        let pc = negotiate(&proposed, &supported, &[], false);
        assert!(pc.is_accepted());
        assert_eq!(pc.id, 3);
        assert_eq!(pc.abstract_syntax, uids::VERIFICATION);
        assert_eq!(pc.transfer_syntax, uids::EXPLICIT_VR_LITTLE_ENDIAN);

        let only_implicit = vec![uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string()];
        let pc = negotiate(&proposed, &supported, &only_implicit, false);
        assert_eq!(pc.transfer_syntax, uids::IMPLICIT_VR_LITTLE_ENDIAN);

        let pc = negotiate(&proposed, &[], &[], false);
        assert_eq!(pc.reason, PresentationContextResultReason::AbstractSyntaxNotSupported);
        assert!(negotiate(&proposed, &[], &[], true).is_accepted());

        let deflated_only = PresentationContextProposed {
            transfer_syntaxes: vec![uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.to_string()],
            ..proposed
        };
        let pc = negotiate(&deflated_only, &supported, &[], false);
        assert_eq!(pc.reason, PresentationContextResultReason::TransferSyntaxesNotSupported);
    }

    #[test]
    fn codec_transfer_syntaxes() {
        assert!(check_transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN));
        assert!(check_transfer_syntax(uids::EXPLICIT_VR_BIG_ENDIAN));
        assert!(!check_transfer_syntax(uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN));
    }
}
