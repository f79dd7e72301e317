use indexmap::IndexMap;

use crate::cache::normalize_url;
use crate::types::request::SearchHit;

/// Merge hits from several providers into one ranked, deduplicated list.
///
/// Each batch carries its provider's priority. Hits are ordered by retrieval
/// rank, then provider priority, then provider id; the first hit for each
/// normalized URL wins. Hits without a title or http(s) url are dropped.
pub fn merge_hits(batches: Vec<(u32, Vec<SearchHit>)>, max_results: usize) -> Vec<SearchHit> {
    let mut ranked: Vec<(u32, SearchHit)> = batches
        .into_iter()
        .flat_map(|(priority, hits)| hits.into_iter().map(move |hit| (priority, hit)))
        .filter(|(_, hit)| hit.is_valid())
        .collect();

    ranked.sort_by(|(pa, a), (pb, b)| {
        a.rank
            .cmp(&b.rank)
            .then(pa.cmp(pb))
            .then_with(|| a.source.cmp(&b.source))
    });

    let mut unique: IndexMap<String, SearchHit> = IndexMap::new();
    for (_, hit) in ranked {
        unique.entry(normalize_url(&hit.url)).or_insert(hit);
    }

    unique.into_values().take(max_results).collect()
}
