//! Search, recency ordering, and pagination over the gateway log file.
//!
//! The whole file is read on every call. The gateway appends concurrently, so
//! a torn final line is possible; invalid UTF-8 is replaced rather than
//! rejected.

#![allow(missing_docs)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use memchr::memmem;
use serde::Serialize;

use crate::core::config::LogsConfig;
use crate::core::errors::{Result, SgqError};
use crate::logs::pagination::{PageRequest, Pagination, page_slice};
use crate::logs::parse::{LogEntry, parse_line};

const SOURCE_KIND: &str = "gateway log";
const COPY_CHUNK: usize = 64 * 1024;

/// One page of log entries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub pagination: Pagination,
}

impl LogPage {
    /// Page with no entries and zero totals.
    pub fn empty(request: PageRequest) -> Self {
        Self {
            logs: Vec::new(),
            pagination: Pagination::new(request, 0),
        }
    }
}

/// Case-insensitive plain substring filter.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    needle: String,
}

impl SearchFilter {
    /// `None` for an absent or empty search. Whitespace is part of the needle.
    pub fn new(search: Option<&str>) -> Option<Self> {
        let needle = search.filter(|s| !s.is_empty())?;
        Some(Self {
            needle: needle.to_lowercase(),
        })
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    fn finder(&self) -> memmem::Finder<'_> {
        memmem::Finder::new(self.needle.as_bytes())
    }
}

/// Run the filter → reverse → parse → paginate pipeline over log text.
pub fn query_text(text: &str, filter: Option<&SearchFilter>, request: PageRequest) -> LogPage {
    let finder = filter.map(SearchFilter::finder);
    let entries: Vec<LogEntry> = text
        .lines()
        .filter(|line| {
            finder.as_ref().is_none_or(|finder| {
                finder
                    .find(line.to_lowercase().as_bytes())
                    .is_some()
            })
        })
        .rev()
        .filter_map(|line| parse_line(line).into_entry())
        .collect();

    LogPage {
        logs: page_slice(&entries, request).to_vec(),
        pagination: Pagination::new(request, entries.len()),
    }
}

/// Log analytics over a single gateway log file.
#[derive(Debug, Clone)]
pub struct LogAnalytics {
    log_file: PathBuf,
}

impl LogAnalytics {
    pub fn new(cfg: &LogsConfig) -> Self {
        Self {
            log_file: cfg.log_file.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }

    /// Search and paginate the log as it is right now.
    pub fn query(&self, filter: Option<&SearchFilter>, request: PageRequest) -> Result<LogPage> {
        let bytes = self.raw_bytes()?;
        Ok(query_text(&String::from_utf8_lossy(&bytes), filter, request))
    }

    /// The whole log, unparsed and unfiltered.
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.log_file).map_err(|err| SgqError::source_read(SOURCE_KIND, &self.log_file, err))
    }

    /// Stream the whole log into `out`; returns the number of bytes copied.
    ///
    /// Failures reading the log are `ReadFailure`; failures writing to `out`
    /// are `OutputWrite`.
    pub fn copy_raw_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let mut file = fs::File::open(&self.log_file)
            .map_err(|err| SgqError::source_read(SOURCE_KIND, &self.log_file, err))?;
        let mut chunk = vec![0_u8; COPY_CHUNK];
        let mut copied = 0_u64;
        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(SgqError::ReadFailure {
                        source_kind: SOURCE_KIND,
                        path: self.log_file.clone(),
                        source: err,
                    });
                }
            };
            out.write_all(&chunk[..n])
                .map_err(|source| SgqError::OutputWrite { source })?;
            copied += n as u64;
        }
        out.flush()
            .map_err(|source| SgqError::OutputWrite { source })?;
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;

    fn req(page: usize, limit: usize) -> PageRequest {
        PageRequest::new(page, limit, usize::MAX)
    }

    fn analytics_at(path: PathBuf) -> LogAnalytics {
        LogAnalytics::new(&LogsConfig {
            log_file: path,
            ..LogsConfig::default()
        })
    }

    #[test]
    fn newest_lines_come_first() {
        let text = "[t1] [INFO] [A] first\n[t2] [INFO] [A] second\n[t3] [INFO] [A] third\n";
        let page = query_text(text, None, req(1, 10));
        let msgs: Vec<&str> = page.logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["third", "second", "first"]);
        assert_eq!(page.pagination.total_logs, 3);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let text = "[t] [ERROR] [NET] Timeout talking to node\n[t] [INFO] [NET] ok\nplain TIMEOUT\n";
        let filter = SearchFilter::new(Some("timeOUT")).unwrap();
        let page = query_text(text, Some(&filter), req(1, 10));
        assert_eq!(page.pagination.total_logs, 2);
        assert_eq!(page.logs[0].level, "RAW");
        assert_eq!(page.logs[1].level, "ERROR");
    }

    #[test]
    fn search_matches_bracket_fields_too() {
        let text = "[t] [WARN] [STORAGE] disk slow\n[t] [WARN] [NET] link flap\n";
        let filter = SearchFilter::new(Some("storage")).unwrap();
        let page = query_text(text, Some(&filter), req(1, 10));
        assert_eq!(page.logs.len(), 1);
        assert_eq!(page.logs[0].component, "STORAGE");
    }

    #[test]
    fn empty_search_is_no_filter() {
        assert!(SearchFilter::new(Some("")).is_none());
        assert!(SearchFilter::new(None).is_none());
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_needle() {
        let text = "[t] [INFO] [A] ERRORS happened\n[t] [INFO] [A] an error here\n";
        let filter = SearchFilter::new(Some(" error ")).unwrap();
        assert_eq!(filter.needle(), " error ");
        let page = query_text(text, Some(&filter), req(1, 10));
        assert_eq!(page.pagination.total_logs, 1);
        assert_eq!(page.logs[0].message, "an error here");

        let spaces = SearchFilter::new(Some("   ")).unwrap();
        let page = query_text(text, Some(&spaces), req(1, 10));
        assert_eq!(page.pagination.total_logs, 0);
    }

    #[test]
    fn zero_cursor_is_clamped_not_a_panic() {
        let text = "[t] [INFO] [A] x\n[t] [INFO] [A] y\n";
        let page = query_text(text, None, PageRequest::new(0, 0, 50));
        assert_eq!(page.logs.len(), 1);
        assert_eq!(page.logs[0].message, "y");
        assert_eq!(page.pagination.total_pages, 2);
    }

    #[test]
    fn blank_lines_are_not_counted() {
        let text = "\n[t] [INFO] [A] one\n\n   \n[t] [INFO] [A] two\n\n";
        let page = query_text(text, None, req(1, 10));
        assert_eq!(page.pagination.total_logs, 2);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn hundred_twenty_entries_make_three_pages() {
        let text: String = (0..120)
            .map(|i| format!("[t{i}] [INFO] [GEN] line {i}\n"))
            .collect();
        let page3 = query_text(&text, None, req(3, 50));
        assert_eq!(page3.logs.len(), 20);
        assert_eq!(page3.pagination.total_pages, 3);
        assert_eq!(page3.logs[0].message, "line 19");

        let page4 = query_text(&text, None, req(4, 50));
        assert!(page4.logs.is_empty());
        assert_eq!(page4.pagination.total_pages, 3);
        assert_eq!(page4.pagination.total_logs, 120);
    }

    #[test]
    fn missing_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let logs = analytics_at(dir.path().join("gateway.log"));
        let err = logs.query(None, req(1, 10)).expect_err("absent");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = logs.copy_raw_to(&mut Vec::new()).expect_err("absent");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_log_is_zero_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        fs::write(&path, "").unwrap();
        let page = analytics_at(path).query(None, req(1, 10)).unwrap();
        assert!(page.logs.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }

    #[test]
    fn directory_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = analytics_at(dir.path().to_path_buf())
            .query(None, req(1, 10))
            .expect_err("directory");
        assert_eq!(err.kind(), ErrorKind::ReadFailure);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        fs::write(&path, b"[t] [INFO] [A] ok\n[t] [INFO] [A] torn \xff\xfe").unwrap();
        let page = analytics_at(path).query(None, req(1, 10)).unwrap();
        assert_eq!(page.logs.len(), 2);
        assert!(page.logs[0].message.starts_with("torn"));
    }

    #[test]
    fn raw_retrieval_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        let body = b"\n[t] [INFO] [A] one\nnot structured\n\n";
        fs::write(&path, body).unwrap();
        let logs = analytics_at(path);
        assert_eq!(logs.raw_bytes().unwrap(), body);

        let mut out = Vec::new();
        let copied = logs.copy_raw_to(&mut out).unwrap();
        assert_eq!(copied, body.len() as u64);
        assert_eq!(out, body);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_side_failure_is_not_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        fs::write(&path, "[t] [INFO] [A] one\n").unwrap();
        let err = analytics_at(path)
            .copy_raw_to(&mut BrokenPipe)
            .expect_err("sink refuses writes");
        assert!(matches!(err, SgqError::OutputWrite { .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.public_message().contains("gateway log"));
    }
}
