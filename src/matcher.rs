//! Content-identity matching.
//!
//! Find the newest upstream commit whose content at the upstream path is
//! identical to some historical content at the local path. That commit is
//! the anchor: everything upstream after it is pending.

use subsync_git::GitOid;

use crate::history::CommitObjectRecord;

/// Why a commit was chosen as anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnchorReason {
    /// Its id starts with the `--since` prefix (or a sync marker).
    Since,
    /// Its object equals the object of `dest_commit` at the local path.
    Content {
        /// First destination commit (newest first) carrying that object.
        dest_commit: GitOid,
    },
}

/// Result of [`find_anchor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorMatch {
    pub anchor: GitOid,
    /// Upstream commits newer than the anchor, newest first.
    pub pending: Vec<GitOid>,
    pub reason: AnchorReason,
}

impl AnchorMatch {
    /// Nothing upstream is missing locally.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Walk `source` newest to oldest and return the first anchor.
///
/// A source commit whose id starts with `since` wins immediately. Otherwise
/// the first source record whose object equals any destination object is
/// the anchor. Returns `None` when the source is exhausted.
#[must_use]
pub fn find_anchor(
    source: &[CommitObjectRecord],
    dest: &[CommitObjectRecord],
    since: Option<&str>,
) -> Option<AnchorMatch> {
    let mut pending = Vec::new();
    for record in source {
        if since.is_some_and(|prefix| record.commit.has_prefix(prefix)) {
            return Some(AnchorMatch {
                anchor: record.commit.clone(),
                pending,
                reason: AnchorReason::Since,
            });
        }
        if let Some(hit) = dest.iter().find(|d| d.object == record.object) {
            return Some(AnchorMatch {
                anchor: record.commit.clone(),
                pending,
                reason: AnchorReason::Content {
                    dest_commit: hit.commit.clone(),
                },
            });
        }
        pending.push(record.commit.clone());
    }
    None
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use subsync_git::ObjectKind;

    /// The number leads, so short prefixes stay distinct.
    fn hex(n: u32) -> String {
        format!("{n:08x}{}", "0".repeat(32))
    }

    fn oid(n: u32) -> GitOid {
        GitOid::new(&hex(n)).unwrap()
    }

    /// Commit ids start at 1_000_000 so they never collide with objects.
    fn rec(commit: u32, object: u32) -> CommitObjectRecord {
        CommitObjectRecord {
            commit: oid(1_000_000 + commit),
            object: oid(object),
            kind: ObjectKind::Tree,
        }
    }

    #[test]
    fn anchor_is_first_shared_object() {
        let source = vec![rec(3, 30), rec(2, 20), rec(1, 10)];
        let dest = vec![rec(9, 99), rec(8, 20), rec(7, 10)];
        let m = find_anchor(&source, &dest, None).unwrap();
        assert_eq!(m.anchor, oid(1_000_002));
        assert_eq!(m.pending, vec![oid(1_000_003)]);
        assert_eq!(
            m.reason,
            AnchorReason::Content {
                dest_commit: oid(1_000_008)
            }
        );
    }

    #[test]
    fn up_to_date_when_newest_matches() {
        let source = vec![rec(2, 20), rec(1, 10)];
        let dest = vec![rec(5, 20)];
        let m = find_anchor(&source, &dest, None).unwrap();
        assert!(m.is_up_to_date());
    }

    #[test]
    fn no_match_is_none() {
        let source = vec![rec(2, 20), rec(1, 10)];
        let dest = vec![rec(5, 50)];
        assert_eq!(find_anchor(&source, &dest, None), None);
        assert_eq!(find_anchor(&[], &dest, None), None);
    }

    #[test]
    fn since_short_circuits_content_match() {
        let source = vec![rec(3, 30), rec(2, 20), rec(1, 10)];
        let dest = vec![rec(9, 30)];
        // Content would match the newest commit; since points further back.
        let since = &hex(1_000_001)[..8];
        let m = find_anchor(&source, &dest, Some(since)).unwrap();
        assert_eq!(m.anchor, oid(1_000_003));
        assert_eq!(m.reason, AnchorReason::Content { dest_commit: oid(1_000_009) });

        let dest = vec![rec(9, 99)];
        let m = find_anchor(&source, &dest, Some(since)).unwrap();
        assert_eq!(m.anchor, oid(1_000_001));
        assert_eq!(m.pending, vec![oid(1_000_003), oid(1_000_002)]);
        assert_eq!(m.reason, AnchorReason::Since);
    }

    #[test]
    fn since_is_case_insensitive() {
        let source = vec![CommitObjectRecord {
            commit: GitOid::new(&"ab".repeat(20)).unwrap(),
            object: oid(1),
            kind: ObjectKind::Blob,
        }];
        let m = find_anchor(&source, &[], Some("ABAB")).unwrap();
        assert_eq!(m.reason, AnchorReason::Since);
    }

    #[test]
    fn first_match_wins_even_if_content_reverted() {
        // Upstream returned to an old state (object 10) after a change; the
        // newest occurrence is found first.
        let source = vec![rec(3, 10), rec(2, 20), rec(1, 10)];
        let dest = vec![rec(7, 10)];
        let m = find_anchor(&source, &dest, None).unwrap();
        assert_eq!(m.anchor, oid(1_000_003));
        assert!(m.is_up_to_date());
    }

    proptest! {
        #[test]
        fn anchor_is_newest_shared_and_pending_is_prefix(
            src_objects in prop::collection::vec(0u32..20, 0..30),
            dst_objects in prop::collection::vec(0u32..20, 0..30),
        ) {
            let n = src_objects.len() as u32;
            let source: Vec<_> = src_objects
                .iter()
                .enumerate()
                .map(|(i, &o)| rec(n - i as u32, o))
                .collect();
            let dest: Vec<_> = dst_objects
                .iter()
                .enumerate()
                .map(|(i, &o)| rec(500_000 + i as u32, o))
                .collect();

            let first_shared = source
                .iter()
                .position(|s| dest.iter().any(|d| d.object == s.object));

            match (find_anchor(&source, &dest, None), first_shared) {
                (None, None) => {}
                (Some(m), Some(idx)) => {
                    prop_assert_eq!(&m.anchor, &source[idx].commit);
                    let expected: Vec<_> = source[..idx].iter().map(|r| r.commit.clone()).collect();
                    prop_assert_eq!(m.pending, expected);
                    // No pending commit's content exists locally.
                    for r in &source[..idx] {
                        prop_assert!(dest.iter().all(|d| d.object != r.object));
                    }
                }
                (got, want) => prop_assert!(false, "got {:?}, expected index {:?}", got, want),
            }
        }
    }
}
