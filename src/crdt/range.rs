//! Range: Line/column geometry of the replicated buffer
//!
//! Two types live here:
//! - [`Point`]: a 0-based row/column extent. Used inside the sequence tree,
//!   where positions are always relative to something (a subtree, a segment
//!   start, the start of an insertion).
//! - [`Range`]: a 1-based, end-exclusive line/column rectangle as the host
//!   editor sees it.
//!
//! Points compose with [`Point::traverse`], which is associative but not
//! commutative: walking `"ab\nc"` then `"d"` ends on row 1, column 2, while
//! walking `"d"` then `"ab\nc"` ends on row 1, column 1.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A 0-based row/column position or extent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Point = Point::new(0, 0);

    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Extent covered by `text` (rows = line breaks, column = chars after the
    /// last line break)
    pub fn extent_of(text: &str) -> Self {
        let mut extent = Point::ZERO;
        for ch in text.chars() {
            if ch == '\n' {
                extent.row += 1;
                extent.column = 0;
            } else {
                extent.column += 1;
            }
        }
        extent
    }

    /// Position reached by walking `extent` starting from `self`
    pub fn traverse(self, extent: Point) -> Point {
        if extent.row == 0 {
            Point::new(self.row, self.column + extent.column)
        } else {
            Point::new(self.row + extent.row, extent.column)
        }
    }

    /// Extent from `start` to `self`; inverse of [`Point::traverse`]
    ///
    /// Returns `None` when `start` lies after `self`.
    pub fn traversal_from(self, start: Point) -> Option<Point> {
        match self.cmp(&start) {
            Ordering::Less => None,
            _ if self.row == start.row => Some(Point::new(0, self.column - start.column)),
            _ => Some(Point::new(self.row - start.row, self.column)),
        }
    }

    /// Byte index in `text` that sits at this point, if the point lies
    /// within the text
    pub fn byte_index_in(self, text: &str) -> Option<usize> {
        let mut cursor = Point::ZERO;
        if cursor == self {
            return Some(0);
        }
        for (index, ch) in text.char_indices() {
            if ch == '\n' {
                cursor.row += 1;
                cursor.column = 0;
            } else {
                cursor.column += 1;
            }
            if cursor == self {
                return Some(index + ch.len_utf8());
            }
            if cursor > self {
                return None;
            }
        }
        None
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

/// A 1-based, end-exclusive line/column rectangle
///
/// Invariant: start ≤ end lexicographically. [`Range::try_new`] enforces
/// it for untrusted input; ranges built internally already satisfy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Range {
    /// The point range at the very start of a buffer
    pub const ORIGIN: Range = Range::new(1, 1, 1, 1);

    pub const fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Validating constructor for ranges coming from outside the engine
    pub fn try_new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Result<Self> {
        let range = Self::new(start_line, start_col, end_line, end_col);
        range.validate()?;
        Ok(range)
    }

    /// Check the 1-based and start ≤ end invariants
    pub fn validate(&self) -> Result<()> {
        if self.start_line == 0 || self.start_col == 0 || self.end_line == 0 || self.end_col == 0 {
            return Err(SyncError::MalformedRange {
                range: *self,
                reason: "lines and columns are 1-based",
            });
        }
        if self.start() > self.end() {
            return Err(SyncError::MalformedRange {
                range: *self,
                reason: "start lies after end",
            });
        }
        Ok(())
    }

    /// Range spanning two 0-based points
    pub fn from_points(start: Point, end: Point) -> Self {
        Self::new(start.row + 1, start.column + 1, end.row + 1, end.column + 1)
    }

    /// Point range located at a 0-based point
    pub fn point(at: Point) -> Self {
        Self::from_points(at, at)
    }

    /// Range covering `text` when it starts at the buffer origin
    pub fn of_text(text: &str) -> Self {
        Self::from_points(Point::ZERO, Point::extent_of(text))
    }

    /// 0-based start point
    pub fn start(&self) -> Point {
        Point::new(
            self.start_line.saturating_sub(1),
            self.start_col.saturating_sub(1),
        )
    }

    /// 0-based end point
    pub fn end(&self) -> Point {
        Point::new(
            self.end_line.saturating_sub(1),
            self.end_col.saturating_sub(1),
        )
    }

    /// Extent between start and end
    pub fn extent(&self) -> Point {
        self.end().traversal_from(self.start()).unwrap_or(Point::ZERO)
    }

    pub fn is_point(&self) -> bool {
        self.start() == self.end()
    }

    /// Collapse to the start point
    pub fn collapse_to_start(&self) -> Range {
        Range::point(self.start())
    }

    /// `self` ends at or before the start of `other`
    pub fn is_before(&self, other: &Range) -> bool {
        self.end() <= other.start()
    }

    /// `self` starts at or after the end of `other`
    pub fn is_after(&self, other: &Range) -> bool {
        self.start() >= other.end()
    }

    pub fn intersects(&self, other: &Range) -> bool {
        !(self.is_before(other) || self.is_after(other))
    }

    /// `other` lies entirely inside `self`
    pub fn contains(&self, other: &Range) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// `point` lies inside `self`, end included
    pub fn contains_point(&self, point: Point) -> bool {
        self.start() <= point && point <= self.end()
    }

    /// `point` lies strictly between start and end
    pub fn strictly_contains_point(&self, point: Point) -> bool {
        self.start() < point && point < self.end()
    }

    /// `self` starts exactly where `other` starts
    pub fn is_at_left_edge_of(&self, other: &Range) -> bool {
        self.start() == other.start()
    }

    /// `self` ends exactly where `other` ends
    pub fn is_at_right_edge_of(&self, other: &Range) -> bool {
        self.end() == other.end()
    }

    /// Smallest range enclosing both
    pub fn merge(&self, other: &Range) -> Range {
        Range::from_points(
            self.start().min(other.start()),
            self.end().max(other.end()),
        )
    }

    /// Re-anchor a range expressed relative to the buffer origin so that it
    /// is relative to `origin` instead
    pub fn translate(&self, origin: Point) -> Range {
        Range::from_points(origin.traverse(self.start()), origin.traverse(self.end()))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
