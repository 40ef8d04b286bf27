//! Deduplication and cache filtering
//!
//! Both stages are pure and order-preserving.

use crate::cache::CacheSet;
use crate::schema::{LinkOccurrence, UniqueLink};
use std::collections::HashMap;

/// Which caches to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    pub use_accepted: bool,
    pub use_ignored: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            use_accepted: true,
            use_ignored: true,
        }
    }
}

/// Collapse occurrences sharing a URL into one record each
///
/// The first occurrence in scan order represents the URL. Records come
/// out in order of first sighting. URL comparison is exact and
/// case-sensitive.
pub fn dedupe<I>(occurrences: I) -> Vec<UniqueLink>
where
    I: IntoIterator<Item = LinkOccurrence>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<UniqueLink> = Vec::new();

    for occ in occurrences {
        match index.get(&occ.url) {
            Some(&i) => unique[i].sightings += 1,
            None => {
                index.insert(occ.url.clone(), unique.len());
                unique.push(UniqueLink {
                    occurrence: occ,
                    sightings: 1,
                });
            }
        }
    }

    unique
}

/// Drop links already in the accepted or ignored cache
pub fn filter_cached(
    links: Vec<UniqueLink>,
    accepted: &CacheSet,
    ignored: &CacheSet,
    options: FilterOptions,
) -> Vec<UniqueLink> {
    links
        .into_iter()
        .filter(|link| !(options.use_accepted && accepted.contains(link.url())))
        .filter(|link| !(options.use_ignored && ignored.contains(link.url())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn occ(url: &str, file: &str, line: usize) -> LinkOccurrence {
        LinkOccurrence::new(url, file, line)
    }

    fn link(url: &str) -> UniqueLink {
        UniqueLink {
            occurrence: occ(url, "a.md", 1),
            sightings: 1,
        }
    }

    #[test]
    fn test_dedupe_first_seen_wins() {
        let unique = dedupe(vec![
            occ("https://x.example", "a.md", 3),
            occ("https://y.example", "a.md", 9),
            occ("https://x.example", "b.md", 1),
            occ("https://x.example", "c.md", 7),
        ]);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].occurrence, occ("https://x.example", "a.md", 3));
        assert_eq!(unique[0].sightings, 3);
        assert_eq!(unique[1].url(), "https://y.example");
        assert_eq!(unique[1].sightings, 1);
    }

    #[test]
    fn test_dedupe_is_case_sensitive_and_exact() {
        let unique = dedupe(vec![
            occ("https://X.example", "a.md", 1),
            occ("https://x.example", "a.md", 2),
            occ("https://x.example/", "a.md", 3),
        ]);
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_dedupe_idempotent() {
        let once = dedupe(vec![
            occ("https://a.example", "a.md", 1),
            occ("https://b.example", "a.md", 2),
            occ("https://a.example", "b.md", 5),
        ]);
        let twice = dedupe(once.iter().map(|u| u.occurrence.clone()));

        let first: Vec<_> = once.iter().map(|u| &u.occurrence).collect();
        let second: Vec<_> = twice.iter().map(|u| &u.occurrence).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_accepted_cache() {
        let accepted: CacheSet = ["https://ok.example"].into_iter().collect();
        let ignored = CacheSet::new();

        let candidates = filter_cached(
            vec![link("https://ok.example"), link("https://new.example")],
            &accepted,
            &ignored,
            FilterOptions::default(),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url(), "https://new.example");
    }

    #[test]
    fn test_filter_ignored_cache() {
        let accepted = CacheSet::new();
        let ignored: CacheSet = ["https://flaky.example"].into_iter().collect();

        let candidates = filter_cached(
            vec![link("https://flaky.example"), link("https://new.example")],
            &accepted,
            &ignored,
            FilterOptions::default(),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url(), "https://new.example");
    }

    #[test]
    fn test_filter_opt_out() {
        let accepted: CacheSet = ["https://a.example"].into_iter().collect();
        let ignored: CacheSet = ["https://b.example"].into_iter().collect();
        let links = vec![link("https://a.example"), link("https://b.example")];

        let none = FilterOptions {
            use_accepted: false,
            use_ignored: false,
        };
        assert_eq!(filter_cached(links.clone(), &accepted, &ignored, none).len(), 2);

        let only_ignored = FilterOptions {
            use_accepted: false,
            use_ignored: true,
        };
        let kept = filter_cached(links, &accepted, &ignored, only_ignored);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url(), "https://a.example");
    }

    #[test]
    fn test_filter_is_exact_set_difference() {
        let links: Vec<UniqueLink> = (0..20)
            .map(|i| link(&format!("https://site{i}.example")))
            .collect();
        let accepted: CacheSet = (0..20)
            .step_by(3)
            .map(|i| format!("https://site{i}.example"))
            .collect();
        let ignored: CacheSet = (0..20)
            .step_by(4)
            .map(|i| format!("https://site{i}.example"))
            .collect();

        let kept = filter_cached(links.clone(), &accepted, &ignored, FilterOptions::default());

        let expected: BTreeSet<&str> = links
            .iter()
            .map(|l| l.url())
            .filter(|u| !accepted.contains(u) && !ignored.contains(u))
            .collect();
        let actual: Vec<&str> = kept.iter().map(|l| l.url()).collect();
        let actual_set: BTreeSet<&str> = actual.iter().copied().collect();

        assert_eq!(actual.len(), actual_set.len());
        assert_eq!(actual_set, expected);
    }
}
