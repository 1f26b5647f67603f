// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Tested-version records and supported-range extraction.
//!
//! Tested-version files carry one version per line, an optional leading
//! `!` marking the version unsupported, and an optional ` # comment`.
//! Semantic versions (`M.m.p[suffix]`) order field-wise and always sort
//! before non-semantic tokens, which order lexicographically. Comments
//! never participate in equality or ordering.

use std::cmp::Ordering;
use std::fmt;

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum VersionKind {
    Semantic {
        major: u64,
        minor: u64,
        patch: u64,
        suffix: Option<String>,
    },
    NonSemantic(String),
}

#[derive(Debug, Clone)]
pub struct TestedVersion {
    kind: VersionKind,
    pub supported: bool,
    pub comment: Option<String>,
}

impl TestedVersion {
    pub fn parse(line: &str) -> Result<Self> {
        let (version_part, comment) = match line.split_once('#') {
            Some((version, comment)) => (version.trim(), Some(comment.trim().to_string())),
            None => (line.trim(), None),
        };

        let (token, supported) = match version_part.strip_prefix('!') {
            Some(rest) => (rest.trim(), false),
            None => (version_part, true),
        };
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            bail!("invalid version token {token:?}");
        }

        Ok(Self {
            kind: parse_kind(token),
            supported,
            comment,
        })
    }

    fn is_semantic(&self) -> bool {
        matches!(self.kind, VersionKind::Semantic { .. })
    }

    fn major(&self) -> Option<u64> {
        match &self.kind {
            VersionKind::Semantic { major, .. } => Some(*major),
            VersionKind::NonSemantic(_) => None,
        }
    }
}

fn parse_kind(token: &str) -> VersionKind {
    let parts: Vec<&str> = token.splitn(3, '.').collect();
    if parts.len() == 3 {
        let digits_end = parts[2]
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(parts[2].len());
        let (patch_digits, suffix) = parts[2].split_at(digits_end);
        if let (Ok(major), Ok(minor), Ok(patch), true) = (
            parts[0].parse(),
            parts[1].parse(),
            patch_digits.parse(),
            !patch_digits.is_empty(),
        ) {
            return VersionKind::Semantic {
                major,
                minor,
                patch,
                suffix: (!suffix.is_empty()).then(|| suffix.to_string()),
            };
        }
    }
    VersionKind::NonSemantic(token.to_string())
}

impl fmt::Display for TestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            VersionKind::Semantic {
                major,
                minor,
                patch,
                suffix,
            } => {
                write!(f, "{major}.{minor}.{patch}")?;
                if let Some(suffix) = suffix {
                    write!(f, "{suffix}")?;
                }
                Ok(())
            }
            VersionKind::NonSemantic(token) => write!(f, "{token}"),
        }
    }
}

// Comments and the supported flag never participate in equality or
// ordering; semantic versions sort before non-semantic ones.
impl PartialEq for TestedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TestedVersion {}

impl PartialOrd for TestedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TestedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (VersionKind::Semantic { .. }, VersionKind::NonSemantic(_)) => Ordering::Less,
            (VersionKind::NonSemantic(_), VersionKind::Semantic { .. }) => Ordering::Greater,
            (a, b) => a.cmp(b),
        }
    }
}

pub fn parse_tested_versions(contents: &str) -> Result<Vec<TestedVersion>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(TestedVersion::parse)
        .collect()
}

/// Extract the supported ranges from an ordered version list.
///
/// A run starts on the first supported version and closes at the first
/// unsupported one, or when the next supported semantic version jumps to a
/// major different from the run's start. Non-semantic versions emit as
/// singletons. Ranges render as `start~end`, or `start` for a singleton.
pub fn supported_ranges(sorted_versions: &[TestedVersion]) -> Vec<String> {
    let mut ranges = Vec::new();
    let mut run: Option<(&TestedVersion, &TestedVersion)> = None;

    fn emit(ranges: &mut Vec<String>, (start, end): (&TestedVersion, &TestedVersion)) {
        if start == end {
            ranges.push(start.to_string());
        } else {
            ranges.push(format!("{start}~{end}"));
        }
    }

    for version in sorted_versions {
        if !version.supported {
            if let Some(open) = run.take() {
                emit(&mut ranges, open);
            }
            continue;
        }
        if !version.is_semantic() {
            if let Some(open) = run.take() {
                emit(&mut ranges, open);
            }
            emit(&mut ranges, (version, version));
            continue;
        }
        match run {
            Some((start, _)) if start.major() == version.major() => {
                run = Some((start, version));
            }
            Some(open) => {
                emit(&mut ranges, open);
                run = Some((version, version));
            }
            None => {
                run = Some((version, version));
            }
        }
    }
    if let Some(open) = run.take() {
        emit(&mut ranges, open);
    }
    ranges
}
