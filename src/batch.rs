//! Change-request line intake
//!
//! Batches arrive as plain text, one request per line:
//!
//! ```text
//! <entity> <id> <status> <actor> <reason>
//! ```
//!
//! The first four fields are whitespace-delimited; everything after the
//! fourth is the reason, which may be wrapped in double quotes to carry
//! embedded words. Blank lines and `#` comments are skipped when reading
//! from a file.

use std::fs;
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::record::EntityKind;
use crate::transition::ChangeRequest;

/// Parse a single change-request line
pub fn parse_line(line: &str) -> Result<ChangeRequest> {
    let mut rest = line.trim();
    let mut fields = [""; 4];
    for field in &mut fields {
        *field = take_token(&mut rest).ok_or_else(|| {
            LedgerError::InvalidRequest(format!("need 5 fields: {}", line.trim()))
        })?;
    }

    let reason = rest.trim();
    if reason.is_empty() {
        return Err(LedgerError::InvalidRequest(format!(
            "need 5 fields: {}",
            line.trim()
        )));
    }
    let reason = reason
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(reason);

    let kind: EntityKind = fields[0].parse()?;
    Ok(ChangeRequest::new(kind, fields[1], fields[2], fields[3], reason))
}

/// Parse request lines, skipping blank lines and `#` comments
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Vec<ChangeRequest>> {
    let mut requests = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        requests.push(parse_line(trimmed)?);
    }
    Ok(requests)
}

/// Read a batch file of change requests
pub fn read_batch(path: impl AsRef<Path>) -> Result<Vec<ChangeRequest>> {
    let content = fs::read_to_string(path)?;
    parse_lines(content.lines())
}

fn take_token<'a>(rest: &mut &'a str) -> Option<&'a str> {
    *rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (token, tail) = rest.split_at(end);
    *rest = tail;
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_line() {
        let request = parse_line("issue S03.I01 in_progress alice starting").unwrap();
        assert_eq!(request.kind, EntityKind::Issue);
        assert_eq!(request.id, "S03.I01");
        assert_eq!(request.new_status, "in_progress");
        assert_eq!(request.actor, "alice");
        assert_eq!(request.reason, "starting");
    }

    #[test]
    fn test_quoted_reason_keeps_embedded_whitespace() {
        let request =
            parse_line("task S03.I01.T01 done bob \"finished the extraction script\"").unwrap();
        assert_eq!(request.reason, "finished the extraction script");
    }

    #[test]
    fn test_unquoted_reason_with_spaces_is_kept_whole() {
        let request = parse_line("issue S03.I02 review carol ready for review").unwrap();
        assert_eq!(request.reason, "ready for review");
    }

    #[test]
    fn test_short_line_is_rejected() {
        let err = parse_line("issue S03.I01 in_progress alice").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let err = parse_line("epic E01 done alice reason").unwrap_err();
        assert!(matches!(err, LedgerError::UnknownKind(_)));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let content = "\
# standup 2025-02-03
issue S03.I01 in_progress alice starting

task S03.I01.T01 in_progress bob \"picking this up\"
";
        let requests = parse_lines(content.lines()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].actor, "bob");
    }
}
