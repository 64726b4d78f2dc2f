//! License status report parser.
//!
//! The status tool prints one block per license feature:
//!
//! ```text
//! Users of MATLAB:  (Total of 35 licenses issued;  Total of 2 licenses in use)
//!
//!   "MATLAB" v20, vendor: MLM
//!   floating license
//!
//!     alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44
//!     bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45
//! ```
//!
//! The scanner is a two-state machine. While seeking it only looks for
//! product headers. A header with a non-zero in-use count opens a pending
//! block, which collects user grant lines until its count is satisfied and a
//! line that is not a grant closes it. Blocks whose user count never reaches
//! the header's in-use count are dropped without producing a record.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::product::{ProductName, TrackedProducts};
use crate::record::UsageRecord;

/// `Users of <PRODUCT>: (Total of <N> licenses issued; Total of <M> licenses in use)`
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*Users\s+of\s+([\w\-]+):\s*\(Total\s+of\s+(\d+)\s+licenses?\s+issued;\s*Total\s+of\s+(\d+)\s+licenses?\s+in\s+use\)",
    )
    .unwrap()
});

/// `  <user> <server> <port> (v<version>) (<host>/<port> <handle>), start <time>`
static USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s+([\w.\-]+)\s+([\w.\-]+)\s+([\w.\-/:]+)\s+\(v[\d.]+\)\s+\([\w.\-]+/\d+\s+\d+\),\s*start\s+[\w/\s:]+",
    )
    .unwrap()
});

/// A parsed product header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    product: ProductName,
    issued: u32,
    in_use: u32,
}

fn parse_header(line: &str) -> Option<Header> {
    let caps = HEADER_RE.captures(line)?;
    let product = ProductName::new(&caps[1]).ok()?;
    let issued = caps[2].parse().ok()?;
    let in_use = caps[3].parse().ok()?;
    Some(Header {
        product,
        issued,
        in_use,
    })
}

fn parse_user(line: &str) -> Option<&str> {
    USER_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Users collected so far for the product whose header opened the block.
#[derive(Debug)]
struct PendingBlock {
    product: ProductName,
    expected: u32,
    users: Vec<String>,
}

impl PendingBlock {
    fn is_complete(&self) -> bool {
        usize::try_from(self.expected).ok() == Some(self.users.len())
    }
}

#[derive(Debug)]
enum ScanState {
    SeekingProduct,
    CollectingUsers(PendingBlock),
}

struct Scanner {
    collected_at: NaiveDateTime,
    state: ScanState,
    records: Vec<UsageRecord>,
}

impl Scanner {
    const fn new(collected_at: NaiveDateTime) -> Self {
        Self {
            collected_at,
            state: ScanState::SeekingProduct,
            records: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let header = parse_header(line);
        let state = std::mem::replace(&mut self.state, ScanState::SeekingProduct);
        self.state = match state {
            ScanState::SeekingProduct => header.map_or(ScanState::SeekingProduct, open_block),
            ScanState::CollectingUsers(mut block) => {
                if let Some(header) = header {
                    // A new header ends the current block whatever its state.
                    self.close(block);
                    open_block(header)
                } else if let Some(user) = parse_user(line) {
                    tracing::debug!(product = %block.product, user, "license grant");
                    block.users.push(user.to_string());
                    ScanState::CollectingUsers(block)
                } else if block.is_complete() {
                    self.emit(block);
                    ScanState::SeekingProduct
                } else {
                    ScanState::CollectingUsers(block)
                }
            }
        };
    }

    fn close(&mut self, block: PendingBlock) {
        if block.is_complete() {
            self.emit(block);
        } else {
            tracing::debug!(
                product = %block.product,
                expected = block.expected,
                found = block.users.len(),
                "dropping incomplete block"
            );
        }
    }

    fn emit(&mut self, block: PendingBlock) {
        let product = block.product.clone();
        match UsageRecord::new(block.product, self.collected_at, block.expected, block.users) {
            Ok(record) => {
                tracing::debug!(%product, users = record.users().len(), "emitting block");
                self.records.push(record);
            }
            Err(err) => tracing::debug!(%product, error = %err, "dropping invalid block"),
        }
    }

    fn finish(mut self) -> Vec<UsageRecord> {
        if let ScanState::CollectingUsers(block) =
            std::mem::replace(&mut self.state, ScanState::SeekingProduct)
        {
            self.close(block);
        }
        self.records
    }
}

fn open_block(header: Header) -> ScanState {
    tracing::debug!(
        product = %header.product,
        in_use = header.in_use,
        issued = header.issued,
        "product header"
    );
    if header.in_use == 0 {
        return ScanState::SeekingProduct;
    }
    ScanState::CollectingUsers(PendingBlock {
        product: header.product,
        expected: header.in_use,
        users: Vec::new(),
    })
}

/// Parses every complete product block in a report, tracked or not.
///
/// All records carry `collected_at` as their timestamp. Malformed input never
/// fails; it only yields fewer records.
pub fn parse_blocks<I, S>(lines: I, collected_at: NaiveDateTime) -> Vec<UsageRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scanner = Scanner::new(collected_at);
    for line in lines {
        scanner.feed(line.as_ref());
    }
    scanner.finish()
}

/// Report parser restricted to a set of tracked products.
#[derive(Debug, Clone, Copy)]
pub struct ReportParser<'a> {
    tracked: &'a TrackedProducts,
}

impl<'a> ReportParser<'a> {
    pub const fn new(tracked: &'a TrackedProducts) -> Self {
        Self { tracked }
    }

    /// Parses a report, keeping only records for tracked products.
    pub fn parse<I, S>(&self, lines: I, collected_at: NaiveDateTime) -> Vec<UsageRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parse_blocks(lines, collected_at)
            .into_iter()
            .filter(|record| {
                let keep = self.tracked.contains(record.product());
                if !keep {
                    tracing::debug!(product = %record.product(), "discarding untracked product");
                }
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const MATLAB_REPORT: &str = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 2 licenses in use)\n  alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44\n  bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45\n";

    fn collected_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 24)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap()
    }

    fn parse_text(text: &str) -> Vec<UsageRecord> {
        parse_blocks(text.split('\n'), collected_at())
    }

    fn users_of(record: &UsageRecord) -> Vec<&str> {
        record.users().iter().map(String::as_str).collect()
    }

    #[test]
    fn parses_single_block_at_end_of_input() {
        let records = parse_text(MATLAB_REPORT);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.product().as_str(), "MATLAB");
        assert_eq!(record.in_use(), 2);
        assert_eq!(users_of(record), vec!["alice", "bob"]);
        assert_eq!(record.timestamp(), collected_at());
    }

    #[test]
    fn zero_in_use_yields_nothing() {
        let records = parse_text(
            "Users of SIMULINK:  (Total of 10 licenses issued;  Total of 0 licenses in use)\n",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn header_keywords_are_case_insensitive_and_singular_accepted() {
        let text = "users OF Image_Toolbox:  (total of 7 licenses issued;  total of 1 license in use)\n    carol host-3 /dev/pts/6 (v32) (lmstat.com/1712 2391), start Wed 9/16 13:58\n";
        let records = parse_text(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product().as_str(), "Image_Toolbox");
        assert_eq!(users_of(&records[0]), vec!["carol"]);
    }

    #[test]
    fn full_report_with_feature_lines_and_multiple_blocks() {
        let text = r#"lmutil - Copyright (c) 1989-2011 Flexera Software, Inc. All Rights Reserved.
Flexible License Manager status on Tue 2/24/2015 17:00

License server status: 1712@lic.host

Users of features served by MLM:
Users of MATLAB:  (Total of 35 licenses issued;  Total of 3 licenses in use)

  "MATLAB" v20, vendor: MLM
  floating license

    user-01 SERVER-NAME-1 PORT-NAME-1 (v20) (lmstat.host.com/1712 3333), start Tue 2/24 16:44
    user-02 SERVER-NAME-2 PORT-NAME-2 (v30) (lmstat.host.com/1712 2622), start Tue 2/24 16:24
    user-01 SERVER-NAME-3 PORT-NAME-3 (v30) (lmstat.com/1712 3634), start Tue 2/24 14:50

Users of SIMULINK:  (Total of 10 licenses issued;  Total of 0 licenses in use)

Users of Signal_Toolbox:  (Total of 5 licenses issued;  Total of 1 license in use)

  "Signal_Toolbox" v20, vendor: MLM
  floating license

    user-04 SERVER-NAME-4 PORT-NAME-4 (v26) (lmstat.com/1712 1623), start Tue 2/24 16:26

"#;
        let records = parse_text(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product().as_str(), "MATLAB");
        assert_eq!(users_of(&records[0]), vec!["user-01", "user-02", "user-01"]);
        assert_eq!(records[1].product().as_str(), "Signal_Toolbox");
        assert_eq!(users_of(&records[1]), vec!["user-04"]);
    }

    #[test]
    fn undercounted_block_is_dropped() {
        let text = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 3 licenses in use)\n  alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44\n\n  \"MATLAB\" v20, vendor: MLM\n";
        assert!(parse_text(text).is_empty());
    }

    #[test]
    fn new_header_closes_undercounted_block_and_starts_next() {
        let text = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 3 licenses in use)\n  alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44\nUsers of SIMULINK:  (Total of 10 licenses issued;  Total of 1 license in use)\n  bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45\n";
        let records = parse_text(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product().as_str(), "SIMULINK");
        assert_eq!(users_of(&records[0]), vec!["bob"]);
    }

    #[test]
    fn overcounted_block_is_dropped() {
        let text = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 1 license in use)\n  alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44\n  bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45\nend of report\n";
        assert!(parse_text(text).is_empty());
    }

    #[test]
    fn malformed_header_is_ignored() {
        let text = "Users of MATLAB:  (Total of many licenses issued;  Total of 2 licenses in use)\n  alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44\n";
        assert!(parse_text(text).is_empty());
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_blocks(Vec::<String>::new(), collected_at()).is_empty());
    }

    #[test]
    fn handles_crlf_line_endings() {
        let text = MATLAB_REPORT.replace('\n', "\r\n");
        let records = parse_text(&text);
        assert_eq!(records.len(), 1);
        assert_eq!(users_of(&records[0]), vec!["alice", "bob"]);
    }

    #[test]
    fn reparsing_is_deterministic() {
        assert_eq!(parse_text(MATLAB_REPORT), parse_text(MATLAB_REPORT));
    }

    #[test]
    fn every_record_has_matching_user_count() {
        let text = format!(
            "{MATLAB_REPORT}Users of Optimization_Toolbox:  (Total of 4 licenses issued;  Total of 1 license in use)\n  dave s4 p4 (v20) (lic.host/1712 4444), start Tue 2/24 16:50\n"
        );
        for record in parse_text(&text) {
            assert_eq!(record.users().len(), record.in_use() as usize);
        }
    }

    #[test]
    fn report_parser_discards_untracked_products() {
        let tracked = TrackedProducts::from_names(["SIMULINK"]).unwrap();
        let parser = ReportParser::new(&tracked);
        let text = format!(
            "{MATLAB_REPORT}Users of SIMULINK:  (Total of 10 licenses issued;  Total of 1 license in use)\n  erin s5 p5 (v20) (lic.host/1712 5555), start Tue 2/24 16:52\n"
        );
        let records = parser.parse(text.lines(), collected_at());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product().as_str(), "SIMULINK");
    }

    #[test]
    fn ordinary_line_after_full_count_emits_block() {
        let text = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 2 licenses in use)
    alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44
    bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45
  \"MATLAB\" v20, vendor: MLM
";
        let records = parse_text(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product().as_str(), "MATLAB");
        assert_eq!(records[0].in_use(), 2);
        assert_eq!(users_of(&records[0]), vec!["alice", "bob"]);
    }

    #[test]
    fn grant_lines_after_emission_are_not_collected() {
        let text = "Users of MATLAB:  (Total of 35 licenses issued;  Total of 2 licenses in use)
    alice server1 port1 (v20) (lic.host/1712 3333), start Tue 2/24 16:44
    bob server2 port2 (v20) (lic.host/1712 3334), start Tue 2/24 16:45
  \"MATLAB\" v20, vendor: MLM
    carol server3 port3 (v20) (lic.host/1712 3335), start Tue 2/24 16:46
Users of SIMULINK:  (Total of 10 licenses issued;  Total of 1 license in use)
    dave server4 port4 (v20) (lic.host/1712 3336), start Tue 2/24 16:47
";
        let records = parse_text(text);
        assert_eq!(records.len(), 2);
        assert_eq!(users_of(&records[0]), vec!["alice", "bob"]);
        assert_eq!(records[1].product().as_str(), "SIMULINK");
        assert_eq!(users_of(&records[1]), vec!["dave"]);
        assert!(
            records
                .iter()
                .all(|r| !r.users().iter().any(|u| u == "carol"))
        );
    }
}
