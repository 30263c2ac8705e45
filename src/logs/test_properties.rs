//! Property-based tests for log pagination and search.
//!
//! Arbitrary log bodies and cursors must keep the page arithmetic consistent:
//! every entry lands on exactly one page, pages never overflow the limit, and
//! filtering never invents lines.

use proptest::prelude::*;

use super::engine::{SearchFilter, query_text};
use super::pagination::{PageRequest, Pagination, page_slice};
use super::parse::{ParsedLine, parse_line};

// ──────────────────── strategies ────────────────────

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-z0-9 ]{0,24}",
        ("[0-9:. -]{1,12}", "INFO|WARN|ERROR|DEBUG", "[A-Z]{2,8}", "[a-zA-Z0-9 ]{0,20}")
            .prop_map(|(ts, level, module, msg)| format!("[{ts}] [{level}] [{module}] {msg}")),
    ]
}

fn arb_log() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_line(), 0..160)
}

fn non_blank(lines: &[String]) -> usize {
    lines.iter().filter(|l| !l.trim().is_empty()).count()
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn total_counts_non_blank_lines(lines in arb_log(), limit in 1usize..40) {
        let text = lines.join("\n");
        let page = query_text(&text, None, PageRequest::new(1, limit, usize::MAX));
        prop_assert_eq!(page.pagination.total_logs, non_blank(&lines));
        prop_assert_eq!(
            page.pagination.total_pages,
            non_blank(&lines).div_ceil(limit)
        );
    }

    #[test]
    fn pages_partition_the_entries(lines in arb_log(), limit in 1usize..40) {
        let text = lines.join("\n");
        let first = query_text(&text, None, PageRequest::new(1, limit, usize::MAX));
        let mut seen = 0;
        for page in 1..=first.pagination.total_pages + 1 {
            let got = query_text(&text, None, PageRequest::new(page, limit, usize::MAX));
            prop_assert!(got.logs.len() <= limit);
            if page > first.pagination.total_pages {
                prop_assert!(got.logs.is_empty());
            }
            seen += got.logs.len();
        }
        prop_assert_eq!(seen, first.pagination.total_logs);
    }

    #[test]
    fn slice_is_bounded(len in 0usize..300, page in 1usize..20, limit in 1usize..60) {
        let items: Vec<usize> = (0..len).collect();
        let req = PageRequest::new(page, limit, usize::MAX);
        let slice = page_slice(&items, req);
        prop_assert!(slice.len() <= limit);
        if let Some(first) = slice.first() {
            prop_assert_eq!(*first, (page - 1) * limit);
        }
        let meta = Pagination::new(req, len);
        prop_assert!(meta.total_pages * limit >= len);
    }

    #[test]
    fn filtering_only_removes(lines in arb_log(), needle in "[a-z]{1,3}") {
        let text = lines.join("\n");
        let filter = SearchFilter::new(Some(&needle));
        let all = query_text(&text, None, PageRequest::new(1, 1000, usize::MAX));
        let hits = query_text(&text, filter.as_ref(), PageRequest::new(1, 1000, usize::MAX));
        prop_assert!(hits.pagination.total_logs <= all.pagination.total_logs);
        for entry in &hits.logs {
            let joined = format!(
                "{} {} {} {}",
                entry.timestamp, entry.level, entry.component, entry.message
            )
            .to_lowercase();
            prop_assert!(joined.contains(&needle), "{joined:?} lacks {needle:?}");
        }
    }

    #[test]
    fn every_non_blank_line_yields_an_entry(line in arb_line()) {
        let parsed = parse_line(&line);
        prop_assert_eq!(parsed == ParsedLine::Blank, line.trim().is_empty());
    }
}
