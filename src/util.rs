use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::family::{Member, MemberId};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Members whose name or attribute values fuzzily match `query`. An empty
/// query matches nobody.
pub fn search_members<'a>(
    members: impl IntoIterator<Item = &'a Member>,
    query: &str,
) -> HashSet<MemberId> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }

    let matcher = SkimMatcherV2::default();
    members
        .into_iter()
        .filter(|member| {
            fuzzy_match_score(&matcher, &member.name, query).is_some()
                || member
                    .attributes
                    .values()
                    .any(|value| fuzzy_match_score(&matcher, value, query).is_some())
        })
        .map(|member| member.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::sample_family;

    #[test]
    fn blank_query_matches_nothing() {
        let tree = sample_family().unwrap();
        assert!(search_members(tree.members(), "   ").is_empty());
    }

    #[test]
    fn query_matches_names_case_insensitively() {
        let tree = sample_family().unwrap();
        let matches = search_members(tree.members(), "HALE");

        assert_eq!(matches, HashSet::from([1, 2, 3, 5, 7, 8, 10]));
    }

    #[test]
    fn unrelated_query_matches_nothing() {
        let tree = sample_family().unwrap();
        assert!(search_members(tree.members(), "zzqxj").is_empty());
    }
}
