//! # Queue Engine
//!
//! Ordered play queue with shuffle and repeat.
//!
//! Entries are kept in insertion order; the play order is a permutation of
//! entry indices. Shuffling permutes everything except the current slot, and
//! turning shuffle off restores insertion order while keeping the same entry
//! current. Positions exposed by this type are positions in play order.
//!
//! The engine is synchronous and holds no locks; the player session wraps it
//! in a mutex.

use bridge_traits::AudioSource;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PlaybackError, Result};
use crate::track::TrackReference;

pub struct QueueEngine {
    /// Entries in insertion order.
    entries: Vec<TrackReference>,
    /// Play order as indices into `entries`.
    order: Vec<usize>,
    /// Position in `order`. Always `< order.len()` when non-empty.
    current: usize,
    shuffle: bool,
    repeat: bool,
    rng: StdRng,
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffling for tests and reproducible sessions.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            entries: Vec::new(),
            order: Vec::new(),
            current: 0,
            shuffle: false,
            repeat: false,
            rng,
        }
    }

    /// Loads tracks into the queue and makes one of them current.
    ///
    /// With `replace`, the queue becomes `tracks` and `start_index` points
    /// into it. Without, `tracks` are appended and `start_index` is relative
    /// to the appended list. If shuffle is active the play order is
    /// reshuffled around the new current entry.
    ///
    /// Returns the new current position.
    pub fn load(
        &mut self,
        tracks: Vec<TrackReference>,
        start_index: usize,
        replace: bool,
    ) -> Result<usize> {
        if tracks.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }
        if start_index >= tracks.len() {
            return Err(PlaybackError::InvalidIndex {
                index: start_index,
                len: tracks.len(),
            });
        }

        if replace {
            self.entries = tracks;
            self.order = (0..self.entries.len()).collect();
            self.current = start_index;
        } else {
            let offset = self.entries.len();
            let added = tracks.len();
            self.entries.extend(tracks);
            self.order.extend(offset..offset + added);
            self.current = self.order.len() - added + start_index;
        }

        if self.shuffle {
            self.shuffle_around_current();
        }
        Ok(self.current)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn current(&self) -> Option<&TrackReference> {
        self.order.get(self.current).map(|&entry| &self.entries[entry])
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.current)
    }

    /// Stable index of the current entry in insertion order.
    pub fn current_entry(&self) -> Option<usize> {
        self.order.get(self.current).copied()
    }

    /// Tracks in play order.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackReference> + '_ {
        self.order.iter().map(move |&entry| &self.entries[entry])
    }

    /// Tracks in insertion order.
    pub fn original_order(&self) -> &[TrackReference] {
        &self.entries
    }

    /// Play order as entry indices.
    pub fn play_order(&self) -> &[usize] {
        &self.order
    }

    pub fn has_next(&self) -> bool {
        !self.is_empty() && self.current + 1 < self.order.len()
    }

    pub fn has_previous(&self) -> bool {
        !self.is_empty() && self.current > 0
    }

    /// Moves to the next entry. Returns `false` at the end of the queue.
    pub fn advance(&mut self) -> bool {
        if self.has_next() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous entry. Returns `false` at the start; no wrap.
    pub fn retreat(&mut self) -> bool {
        if self.has_previous() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn set_current(&mut self, position: usize) -> Result<()> {
        if position >= self.order.len() {
            return Err(PlaybackError::InvalidIndex {
                index: position,
                len: self.order.len(),
            });
        }
        self.current = position;
        Ok(())
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    /// Flips shuffle and returns the new state.
    ///
    /// The current entry stays current in both directions.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.set_shuffle(!self.shuffle);
        self.shuffle
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if enabled == self.shuffle {
            return;
        }
        self.shuffle = enabled;
        if enabled {
            self.shuffle_around_current();
        } else if let Some(entry) = self.current_entry() {
            self.order = (0..self.entries.len()).collect();
            self.current = entry;
        }
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    /// Stores a resolved source on an entry, addressed by its stable index.
    pub fn set_audio_source(&mut self, entry: usize, source: AudioSource) -> bool {
        match self.entries.get_mut(entry) {
            Some(track) => {
                track.audio_source = Some(source);
                true
            }
            None => false,
        }
    }

    /// Drops a cached stream URL so the next play resolves afresh.
    pub fn clear_remote_source(&mut self, entry: usize) {
        if let Some(track) = self.entries.get_mut(entry) {
            if track.remote_url().is_some() {
                track.audio_source = None;
            }
        }
    }

    /// Restores a previously captured layout.
    ///
    /// `order` must be a permutation of `0..entries.len()`; otherwise
    /// insertion order is used. Out-of-range positions fall back to 0.
    /// Without shuffle the order is always insertion order, and `position`
    /// is carried through the saved order so the same track stays current.
    pub fn restore(
        &mut self,
        entries: Vec<TrackReference>,
        order: Option<Vec<usize>>,
        position: usize,
        shuffle: bool,
        repeat: bool,
    ) {
        let len = entries.len();
        let position = if position < len { position } else { 0 };
        let order = order.filter(|order| is_permutation(order, len));
        self.entries = entries;
        (self.order, self.current) = match order {
            Some(order) if shuffle => (order, position),
            Some(order) => ((0..len).collect(), order.get(position).copied().unwrap_or(0)),
            None => ((0..len).collect(), position),
        };
        self.shuffle = shuffle;
        self.repeat = repeat;
    }

    fn shuffle_around_current(&mut self) {
        if self.order.len() < 2 {
            return;
        }
        let pinned = self.current;
        let mut movable: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != pinned)
            .map(|(_, &entry)| entry)
            .collect();
        movable.shuffle(&mut self.rng);

        let mut movable = movable.into_iter();
        for (position, slot) in self.order.iter_mut().enumerate() {
            if position == pinned {
                continue;
            }
            if let Some(entry) = movable.next() {
                *slot = entry;
            }
        }
    }
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &entry in order {
        match seen.get_mut(entry) {
            Some(flag) if !*flag => *flag = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(ids: &[&str]) -> Vec<TrackReference> {
        ids.iter().map(|id| TrackReference::new(*id, *id)).collect()
    }

    fn ids(queue: &QueueEngine) -> Vec<String> {
        queue.tracks().map(|t| t.video_id.to_string()).collect()
    }

    #[test]
    fn replace_sets_start_index() {
        let mut queue = QueueEngine::with_seed(1);
        let position = queue.load(tracks(&["a", "b", "c"]), 1, true).unwrap();
        assert_eq!(position, 1);
        assert_eq!(queue.current().unwrap().video_id.as_str(), "b");
    }

    #[test]
    fn append_start_index_is_relative_to_new_tracks() {
        let mut queue = QueueEngine::with_seed(1);
        queue.load(tracks(&["a", "b"]), 0, true).unwrap();
        let position = queue.load(tracks(&["c", "d"]), 1, false).unwrap();
        assert_eq!(position, 3);
        assert_eq!(queue.current().unwrap().video_id.as_str(), "d");
        assert_eq!(ids(&queue), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn load_rejects_empty_and_out_of_range() {
        let mut queue = QueueEngine::with_seed(1);
        assert!(matches!(
            queue.load(Vec::new(), 0, true),
            Err(PlaybackError::EmptyQueue)
        ));
        assert!(matches!(
            queue.load(tracks(&["a"]), 3, true),
            Err(PlaybackError::InvalidIndex { index: 3, len: 1 })
        ));
        assert!(queue.is_empty());
        assert_eq!(queue.current_index(), None);
    }

    #[test]
    fn advance_and_retreat_do_not_wrap() {
        let mut queue = QueueEngine::with_seed(1);
        queue.load(tracks(&["a", "b"]), 0, true).unwrap();
        assert!(!queue.retreat());
        assert!(queue.advance());
        assert!(!queue.advance());
        assert_eq!(queue.current_index(), Some(1));
        assert!(queue.retreat());
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn shuffle_pins_current_slot_and_unshuffle_restores_order() {
        let mut queue = QueueEngine::with_seed(7);
        queue
            .load(tracks(&["a", "b", "c", "d", "e", "f"]), 1, true)
            .unwrap();

        assert!(queue.toggle_shuffle());
        assert_eq!(queue.current_index(), Some(1));
        assert_eq!(queue.current().unwrap().video_id.as_str(), "b");
        let mut shuffled = ids(&queue);
        shuffled.sort();
        assert_eq!(shuffled, vec!["a", "b", "c", "d", "e", "f"]);

        // Move somewhere else, then unshuffle
        queue.set_current(4).unwrap();
        let playing = queue.current().unwrap().video_id.clone();

        assert!(!queue.toggle_shuffle());
        assert_eq!(ids(&queue), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(queue.current().unwrap().video_id, playing);
    }

    #[test]
    fn load_while_shuffled_keeps_start_track_current() {
        let mut queue = QueueEngine::with_seed(3);
        queue.set_shuffle(true);
        queue.load(tracks(&["a", "b", "c", "d"]), 2, true).unwrap();
        assert_eq!(queue.current_index(), Some(2));
        assert_eq!(queue.current().unwrap().video_id.as_str(), "c");
    }

    #[test]
    fn audio_source_is_addressed_by_entry() {
        let mut queue = QueueEngine::with_seed(5);
        queue.load(tracks(&["a", "b", "c"]), 2, true).unwrap();
        queue.toggle_shuffle();
        let entry = queue.current_entry().unwrap();
        assert!(queue.set_audio_source(entry, AudioSource::remote("https://x/c")));
        assert_eq!(queue.current().unwrap().remote_url(), Some("https://x/c"));

        queue.clear_remote_source(entry);
        assert!(queue.current().unwrap().audio_source.is_none());
    }

    #[test]
    fn restore_rejects_invalid_permutation() {
        let mut queue = QueueEngine::with_seed(1);
        queue.restore(tracks(&["a", "b", "c"]), Some(vec![0, 0, 2]), 9, true, true);
        assert_eq!(queue.play_order(), &[0, 1, 2]);
        assert_eq!(queue.current_index(), Some(0));
        assert!(queue.is_shuffle());
        assert!(queue.is_repeat());

        queue.restore(tracks(&["a", "b", "c"]), Some(vec![2, 0, 1]), 1, true, false);
        assert_eq!(ids(&queue), vec!["c", "a", "b"]);
        assert_eq!(queue.current().unwrap().video_id.as_str(), "a");
    }

    #[test]
    fn restore_without_shuffle_uses_insertion_order() {
        let mut queue = QueueEngine::with_seed(1);
        queue.restore(tracks(&["a", "b", "c"]), Some(vec![2, 0, 1]), 0, false, false);

        assert_eq!(queue.play_order(), &[0, 1, 2]);
        assert_eq!(ids(&queue), vec!["a", "b", "c"]);
        assert_eq!(queue.current().unwrap().video_id.as_str(), "c");
        assert_eq!(queue.current_index(), Some(2));

        queue.restore(Vec::new(), Some(Vec::new()), 0, false, false);
        assert!(queue.current().is_none());
    }
}
