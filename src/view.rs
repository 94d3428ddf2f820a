//! Derived view of the tracker: the merged topic list, the subset matching
//! the current query, and progress ratios.
//!
//! `aggregate` is pure and recomputes everything from its inputs. Topic and
//! item counts are small, so there is no incremental path.
use crate::completion::{is_checked, CompletionMap};
use crate::topic::Topic;

// ============================================================================
// Data Structures
// ============================================================================

/// Checked/total counts for one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicProgress {
    pub checked: usize,
    pub total: usize,
}

impl TopicProgress {
    /// Fraction of items checked; `0.0` for a topic without items.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.checked as f32 / self.total as f32
        }
    }
}

/// A topic that passed the query filter, with its progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicView {
    pub topic: Topic,
    pub progress: TopicProgress,
}

/// Read model handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Catalog topics followed by user topics.
    pub all: Vec<Topic>,
    /// Topics matching `query`, in merged order.
    pub filtered: Vec<TopicView>,
    pub checked: CompletionMap,
    pub query: String,
    /// Checked items over all items of `all`, in `0.0..=1.0`.
    pub overall_progress: f32,
}

impl ViewState {
    /// Overall progress as a whole percentage, rounded down.
    pub fn overall_percent(&self) -> u32 {
        (self.overall_progress * 100.0) as u32
    }

    pub fn is_checked(&self, code: &str, item: &str) -> bool {
        is_checked(&self.checked, code, item)
    }

    pub fn find(&self, code: &str) -> Option<&Topic> {
        self.all.iter().find(|t| t.code == code)
    }

    /// Whether any topic with `code` lists `item`. Only such items can be toggled.
    pub fn has_item(&self, code: &str, item: &str) -> bool {
        self.all
            .iter()
            .filter(|t| t.code == code)
            .any(|t| t.items.iter().any(|i| i == item))
    }
}

// ============================================================================
// Aggregation
// ============================================================================

pub fn topic_progress(topic: &Topic, checked: &CompletionMap) -> TopicProgress {
    TopicProgress {
        checked: topic
            .items
            .iter()
            .filter(|item| is_checked(checked, &topic.code, item))
            .count(),
        total: topic.items.len(),
    }
}

/// Topics matching `query` (trimmed, case-insensitive). Blank matches all.
pub fn filter_topics<'a>(topics: &'a [Topic], query: &str) -> Vec<&'a Topic> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return topics.iter().collect();
    }
    topics.iter().filter(|t| t.matches(&needle)).collect()
}

/// Build the view for the merged topic list, query and completion map.
pub fn aggregate(all: Vec<Topic>, query: &str, checked: CompletionMap) -> ViewState {
    let (done, total) = all
        .iter()
        .map(|topic| topic_progress(topic, &checked))
        .fold((0usize, 0usize), |(done, total), p| {
            (done + p.checked, total + p.total)
        });
    let overall_progress = if total == 0 {
        0.0
    } else {
        done as f32 / total as f32
    };

    let filtered = filter_topics(&all, query)
        .into_iter()
        .map(|topic| TopicView {
            progress: topic_progress(topic, &checked),
            topic: topic.clone(),
        })
        .collect();

    ViewState {
        all,
        filtered,
        checked,
        query: query.to_string(),
        overall_progress,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::completion_key;
    use proptest::prelude::*;

    fn topic(code: &str, name: &str, items: &[&str], keywords: &str) -> Topic {
        Topic::new(
            code,
            name,
            items.iter().map(|s| s.to_string()).collect(),
            keywords,
        )
    }

    fn checked(pairs: &[(&str, &str)]) -> CompletionMap {
        pairs
            .iter()
            .map(|(code, item)| (completion_key(code, item), true))
            .collect()
    }

    fn codes(view: &ViewState) -> Vec<&str> {
        view.filtered.iter().map(|v| v.topic.code.as_str()).collect()
    }

    #[test]
    fn test_empty_inputs() {
        let view = aggregate(vec![], "", CompletionMap::new());
        assert!(view.all.is_empty());
        assert!(view.filtered.is_empty());
        assert_eq!(view.overall_progress, 0.0);
        assert_eq!(view.overall_percent(), 0);
    }

    #[test]
    fn test_single_toggle_scenario() {
        let all = vec![topic("A-1", "Alpha", &["x", "y"], "")];
        let view = aggregate(all, "", checked(&[("A-1", "x")]));

        assert_eq!(view.filtered[0].progress.ratio(), 0.5);
        assert_eq!(view.overall_progress, 0.5);
        assert_eq!(view.overall_percent(), 50);
        assert!(view.is_checked("A-1", "x"));
        assert!(!view.is_checked("A-1", "y"));
    }

    #[test]
    fn test_topic_without_items_has_zero_progress() {
        let all = vec![topic("E-1", "Empty", &[], "")];
        let view = aggregate(all, "", CompletionMap::new());
        assert_eq!(view.filtered[0].progress, TopicProgress { checked: 0, total: 0 });
        assert_eq!(view.filtered[0].progress.ratio(), 0.0);
        assert_eq!(view.overall_progress, 0.0);
    }

    #[test]
    fn test_false_entries_do_not_count() {
        let all = vec![topic("A-1", "Alpha", &["x", "y"], "")];
        let mut map = checked(&[("A-1", "x")]);
        map.insert(completion_key("A-1", "y"), false);
        let view = aggregate(all, "", map);
        assert_eq!(view.filtered[0].progress.checked, 1);
    }

    #[test]
    fn test_flags_for_unknown_items_are_ignored() {
        let all = vec![topic("A-1", "Alpha", &["x"], "")];
        let view = aggregate(all, "", checked(&[("A-1", "gone"), ("B-2", "x")]));
        assert_eq!(view.overall_progress, 0.0);
    }

    #[test]
    fn test_same_item_text_in_two_topics_is_independent() {
        let all = vec![
            topic("A-1", "Alpha", &["shared"], ""),
            topic("B-1", "Beta", &["shared"], ""),
        ];
        let view = aggregate(all, "", checked(&[("A-1", "shared")]));
        assert_eq!(view.filtered[0].progress.checked, 1);
        assert_eq!(view.filtered[1].progress.checked, 0);
        assert_eq!(view.overall_progress, 0.5);
    }

    #[test]
    fn test_filter_matches_each_field_case_insensitively() {
        let all = vec![
            topic("TC-A", "Financial Reporting", &["Prepare statements"], "IFRS"),
            topic("TC-D", "Taxation", &["Compute VAT"], "indirect"),
            topic("USER-001", "My notes", &["Read chapter 3"], ""),
        ];

        let by = |q: &str| codes(&aggregate(all.clone(), q, CompletionMap::new()))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        assert_eq!(by("tc-d"), vec!["TC-D"]);
        assert_eq!(by("REPORTING"), vec!["TC-A"]);
        assert_eq!(by("ifrs"), vec!["TC-A"]);
        assert_eq!(by("vat"), vec!["TC-D"]);
        assert_eq!(by("Chapter"), vec!["USER-001"]);
        assert_eq!(by("t"), vec!["TC-A", "TC-D", "USER-001"]);
        assert!(by("nothing matches this").is_empty());
    }

    #[test]
    fn test_query_is_trimmed() {
        let all = vec![topic("TC-A", "Alpha", &[], ""), topic("TC-B", "Beta", &[], "")];
        let view = aggregate(all, "  beta  ", CompletionMap::new());
        assert_eq!(codes(&view), vec!["TC-B"]);
        assert_eq!(view.query, "  beta  ");
    }

    #[test]
    fn test_blank_query_keeps_everything() {
        let all = vec![topic("TC-A", "Alpha", &[], ""), topic("TC-B", "Beta", &[], "")];
        let view = aggregate(all, " \t ", CompletionMap::new());
        assert_eq!(codes(&view), vec!["TC-A", "TC-B"]);
    }

    #[test]
    fn test_overall_progress_ignores_filter() {
        let all = vec![
            topic("A-1", "Alpha", &["x", "y"], ""),
            topic("B-1", "Beta", &["z", "w"], ""),
        ];
        let view = aggregate(all, "beta", checked(&[("A-1", "x"), ("A-1", "y")]));
        assert_eq!(codes(&view), vec!["B-1"]);
        assert_eq!(view.overall_progress, 0.5);
    }

    #[test]
    fn test_has_item() {
        let all = vec![
            topic("A-1", "Alpha", &["x"], ""),
            topic("A-1", "Alpha (mine)", &["y"], ""),
        ];
        let view = aggregate(all, "zzz", CompletionMap::new());
        assert!(view.has_item("A-1", "x"));
        assert!(view.has_item("A-1", "y"));
        assert!(!view.has_item("A-1", "X"));
        assert!(!view.has_item("B-2", "x"));
    }

    #[test]
    fn test_percent_rounds_down() {
        let all = vec![topic("A-1", "Alpha", &["x", "y", "z"], "")];
        let view = aggregate(all, "", checked(&[("A-1", "x"), ("A-1", "y")]));
        assert_eq!(view.overall_percent(), 66);
    }

    fn arb_topics() -> impl Strategy<Value = Vec<(Topic, Vec<bool>)>> {
        prop::collection::vec(
            ("[A-Z]-[0-9]{1,3}", prop::collection::vec(any::<bool>(), 0..6)),
            0..6,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (code, flags))| {
                    let code = format!("{code}-{i}");
                    let items = (0..flags.len()).map(|n| format!("item {n}")).collect();
                    (Topic::new(code, "t", items, ""), flags)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_overall_is_ratio_of_sums(entries in arb_topics()) {
            let mut map = CompletionMap::new();
            let mut done = 0usize;
            let mut total = 0usize;
            for (topic, flags) in &entries {
                for (item, flag) in topic.items.iter().zip(flags) {
                    map.insert(completion_key(&topic.code, item), *flag);
                    total += 1;
                    if *flag {
                        done += 1;
                    }
                }
            }
            let all: Vec<Topic> = entries.into_iter().map(|(t, _)| t).collect();
            let view = aggregate(all, "", map);

            let expected = if total == 0 { 0.0 } else { done as f32 / total as f32 };
            prop_assert_eq!(view.overall_progress, expected);
            prop_assert!((0.0..=1.0).contains(&view.overall_progress));
        }

        #[test]
        fn prop_filtered_is_ordered_subset(entries in arb_topics(), query in "[a-z0-9 -]{0,4}") {
            let all: Vec<Topic> = entries.into_iter().map(|(t, _)| t).collect();
            let view = aggregate(all.clone(), &query, CompletionMap::new());

            let mut rest = all.iter();
            for shown in &view.filtered {
                prop_assert!(rest.any(|t| *t == shown.topic));
            }
            if query.trim().is_empty() {
                prop_assert_eq!(view.filtered.len(), all.len());
            }
        }
    }
}
