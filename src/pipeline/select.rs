//! Page selection: parse `<path>[@<start>-<end>]` into a [`PageSpec`].
//!
//! The range suffix is matched against the *whole* token and the path part
//! is greedy, so the last `@N-M` wins and must end the token:
//!
//! | token               | path            | range     |
//! |---------------------|-----------------|-----------|
//! | `deck.pdf`          | `deck.pdf`      | 1-        |
//! | `deck.pdf@3-5`      | `deck.pdf`      | 3-5       |
//! | `a@1-2/deck.pdf@4-4`| `a@1-2/deck.pdf`| 4-4       |
//! | `talk@1-2.pdf`      | `talk@1-2.pdf`  | 1-        |
//!
//! A file literally named `deck@3-5` cannot be addressed without a range;
//! `deck@3-5@1-99` works around it.

use crate::error::Slide2RomError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

static RE_PAGE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*)@(\d+)-(\d+)$").unwrap());

/// Which PDF, and which of its pages, to turn into slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    source_path: PathBuf,
    start_page: u32,
    /// `None` means "through the last page".
    end_page: Option<u32>,
}

impl PageSpec {
    /// Build a spec from parts, enforcing `1 <= start <= end`.
    pub fn new(
        source_path: impl Into<PathBuf>,
        start_page: u32,
        end_page: Option<u32>,
    ) -> Result<Self, Slide2RomError> {
        let source_path = source_path.into();
        let token = match end_page {
            Some(end) => format!("{}@{}-{}", source_path.display(), start_page, end),
            None => source_path.display().to_string(),
        };
        if source_path.as_os_str().is_empty() {
            return Err(Slide2RomError::InvalidPath { token });
        }
        if start_page == 0 {
            return Err(Slide2RomError::InvalidRange {
                token,
                reason: "pages are 1-indexed, minimum is 1".into(),
            });
        }
        if let Some(end) = end_page {
            if start_page > end {
                return Err(Slide2RomError::InvalidRange {
                    token,
                    reason: format!("start page {start_page} is after end page {end}"),
                });
            }
        }
        Ok(Self {
            source_path,
            start_page,
            end_page,
        })
    }

    /// Parse a command-line token.
    pub fn parse(token: &str) -> Result<Self, Slide2RomError> {
        let Some(caps) = RE_PAGE_RANGE.captures(token) else {
            return Self::new(token, 1, None);
        };

        let parse_bound = |s: &str| {
            s.parse::<u32>().map_err(|_| Slide2RomError::InvalidRange {
                token: token.to_string(),
                reason: format!("page number {s} is too large"),
            })
        };
        let start = parse_bound(&caps[2])?;
        let end = parse_bound(&caps[3])?;

        Self::new(&caps[1], start, Some(end)).map_err(|e| match e {
            // Report the token as the user typed it.
            Slide2RomError::InvalidPath { .. } => Slide2RomError::InvalidPath {
                token: token.to_string(),
            },
            Slide2RomError::InvalidRange { reason, .. } => Slide2RomError::InvalidRange {
                token: token.to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn end_page(&self) -> Option<u32> {
        self.end_page
    }

    /// Whether 1-indexed `page` falls inside the requested range.
    pub fn selects(&self, page: u32) -> bool {
        page >= self.start_page && self.end_page.map_or(true, |end| page <= end)
    }

    /// The requested range clipped to a document of `total_pages` pages,
    /// or `None` when they don't overlap.
    pub fn page_range(&self, total_pages: u32) -> Option<RangeInclusive<u32>> {
        let end = self
            .end_page
            .map_or(total_pages, |end| end.min(total_pages));
        (self.start_page <= end).then(|| self.start_page..=end)
    }

    /// Number of slides this spec yields from a `total_pages` document.
    pub fn selected_count(&self, total_pages: u32) -> u32 {
        self.page_range(total_pages)
            .map_or(0, |r| r.end() - r.start() + 1)
    }

    /// The requested range as `start-end` (`start-` when unbounded).
    pub fn describe_range(&self) -> String {
        match self.end_page {
            Some(end) => format!("{}-{}", self.start_page, end),
            None => format!("{}-", self.start_page),
        }
    }
}

impl FromStr for PageSpec {
    type Err = Slide2RomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_page, self.end_page) {
            (1, None) => write!(f, "{}", self.source_path.display()),
            (start, Some(end)) => write!(f, "{}@{}-{}", self.source_path.display(), start, end),
            (start, None) => write!(f, "{}@{}-", self.source_path.display(), start),
        }
    }
}
