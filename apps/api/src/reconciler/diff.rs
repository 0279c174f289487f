//! Queue diffing by entry identity

use std::collections::HashSet;

use super::ChangeEvent;
use crate::models::QueuedTrack;

/// Events turning `old` into `new`
///
/// Entries are matched by id only. Additions come first, in ascending
/// position within `new`; removals follow in `old` order. Reordering of
/// surviving entries produces no events.
pub fn diff_playlists(old: &[QueuedTrack], new: &[QueuedTrack]) -> Vec<ChangeEvent> {
    let old_ids: HashSet<u64> = old.iter().map(|t| t.id).collect();
    let new_ids: HashSet<u64> = new.iter().map(|t| t.id).collect();

    let added = new
        .iter()
        .enumerate()
        .filter(|(_, t)| !old_ids.contains(&t.id))
        .map(|(position, t)| ChangeEvent::TrackAdded {
            position,
            track: t.clone(),
        });

    let removed = old
        .iter()
        .filter(|t| !new_ids.contains(&t.id))
        .map(|t| ChangeEvent::TrackRemoved(t.id));

    added.chain(removed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackRef;

    fn entry(id: u64, title: &str) -> QueuedTrack {
        QueuedTrack {
            id,
            track: TrackRef::new("catalog", title).with_metadata(title, "Artist", "Album"),
        }
    }

    #[test]
    fn test_add_and_remove() {
        let old = vec![entry(1, "A"), entry(2, "B"), entry(3, "C")];
        let new = vec![entry(2, "B"), entry(3, "C"), entry(4, "D")];

        let events = diff_playlists(&old, &new);
        assert_eq!(
            events,
            vec![
                ChangeEvent::TrackAdded {
                    position: 2,
                    track: entry(4, "D")
                },
                ChangeEvent::TrackRemoved(1),
            ]
        );
    }

    #[test]
    fn test_adds_in_ascending_position() {
        let old = vec![entry(1, "A")];
        let new = vec![entry(7, "X"), entry(1, "A"), entry(8, "Y")];

        let positions: Vec<usize> = diff_playlists(&old, &new)
            .into_iter()
            .filter_map(|e| match e {
                ChangeEvent::TrackAdded { position, .. } => Some(position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn test_reorder_is_silent() {
        let old = vec![entry(1, "A"), entry(2, "B")];
        let new = vec![entry(2, "B"), entry(1, "A")];
        assert!(diff_playlists(&old, &new).is_empty());
    }

    #[test]
    fn test_from_and_to_empty() {
        let tracks = vec![entry(1, "A"), entry(2, "B")];
        assert_eq!(diff_playlists(&[], &tracks).len(), 2);
        assert_eq!(
            diff_playlists(&tracks, &[]),
            vec![ChangeEvent::TrackRemoved(1), ChangeEvent::TrackRemoved(2)]
        );
    }
}
