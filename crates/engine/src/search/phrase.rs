//! Phrase reduction: keep only strictly consecutive occurrences
//!
//! In strict-phrase mode an entity matches when the query terms appear
//! at consecutive positions within one attribute. Subject and body are
//! different attributes, so a phrase can never straddle them.
//!
//! Without phrase mode the AND-intersection already settled membership,
//! and the first term's entries are the answer set by convention.

use maildex_core::Entry;

/// Reduce the per-term entry lists to phrase matches.
///
/// `groups[i]` holds the (already intersected) entries of query term `i`.
/// For every entry of term 0 the later terms must contribute an entry
/// with the same id and attribute whose positions continue the phrase;
/// surviving entries keep only the positions where the full phrase
/// starts.
pub fn reduce_phrase(groups: &[Vec<Entry>]) -> Vec<Entry> {
    let first = match groups.first() {
        Some(first) => first,
        None => return Vec::new(),
    };

    let mut out = Vec::new();
    'entries: for e1 in first {
        let mut positions = e1.positions.clone();
        for (offset, group) in groups.iter().enumerate().skip(1) {
            let follower = group
                .iter()
                .find(|e| e.id == e1.id && e.attribute == e1.attribute);
            let follower = match follower {
                Some(f) => f,
                None => continue 'entries,
            };
            positions.retain(|p| follower.positions.contains(&(p + offset as u32)));
            if positions.is_empty() {
                continue 'entries;
            }
        }
        out.push(Entry {
            id: e1.id,
            attribute: e1.attribute,
            positions,
        });
    }
    out
}
