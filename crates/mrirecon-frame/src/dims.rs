//! The 11-axis dimension vector shared by headers, measurements and arrays.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of axes in a [`Dimensions`] vector.
pub const AXIS_COUNT: usize = 11;

/// One axis of the acquisition space, in wire order. Column varies fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Column,
    Line,
    Channel,
    Set,
    Phase,
    Slice,
    Echo,
    Repetition,
    Segment,
    Partition,
    Average,
}

impl Axis {
    /// All axes in wire order.
    pub const ALL: [Axis; AXIS_COUNT] = [
        Axis::Column,
        Axis::Line,
        Axis::Channel,
        Axis::Set,
        Axis::Phase,
        Axis::Slice,
        Axis::Echo,
        Axis::Repetition,
        Axis::Segment,
        Axis::Partition,
        Axis::Average,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Column => "column",
            Axis::Line => "line",
            Axis::Channel => "channel",
            Axis::Set => "set",
            Axis::Phase => "phase",
            Axis::Slice => "slice",
            Axis::Echo => "echo",
            Axis::Repetition => "repetition",
            Axis::Segment => "segment",
            Axis::Partition => "partition",
            Axis::Average => "average",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extents (or, for indices, coordinates) along each of the 11 axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub column: u32,
    pub line: u32,
    pub channel: u32,
    pub set: u32,
    pub phase: u32,
    pub slice: u32,
    pub echo: u32,
    pub repetition: u32,
    pub segment: u32,
    pub partition: u32,
    pub average: u32,
}

impl Dimensions {
    /// All axes zero. The natural value for an index.
    pub const fn zero() -> Self {
        Self {
            column: 0,
            line: 0,
            channel: 0,
            set: 0,
            phase: 0,
            slice: 0,
            echo: 0,
            repetition: 0,
            segment: 0,
            partition: 0,
            average: 0,
        }
    }

    /// All axes one. The smallest materializable shape.
    pub const fn unit() -> Self {
        Self {
            column: 1,
            line: 1,
            channel: 1,
            set: 1,
            phase: 1,
            slice: 1,
            echo: 1,
            repetition: 1,
            segment: 1,
            partition: 1,
            average: 1,
        }
    }

    /// Shape with the given column, line and channel extents, all others 1.
    pub const fn with_extent(column: u32, line: u32, channel: u32) -> Self {
        let mut dims = Self::unit();
        dims.column = column;
        dims.line = line;
        dims.channel = channel;
        dims
    }

    pub fn from_array(values: [u32; AXIS_COUNT]) -> Self {
        let mut dims = Self::zero();
        for (axis, value) in Axis::ALL.into_iter().zip(values) {
            dims.set_axis(axis, value);
        }
        dims
    }

    pub fn to_array(&self) -> [u32; AXIS_COUNT] {
        Axis::ALL.map(|axis| self.get(axis))
    }

    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Column => self.column,
            Axis::Line => self.line,
            Axis::Channel => self.channel,
            Axis::Set => self.set,
            Axis::Phase => self.phase,
            Axis::Slice => self.slice,
            Axis::Echo => self.echo,
            Axis::Repetition => self.repetition,
            Axis::Segment => self.segment,
            Axis::Partition => self.partition,
            Axis::Average => self.average,
        }
    }

    pub fn set_axis(&mut self, axis: Axis, value: u32) {
        let slot = match axis {
            Axis::Column => &mut self.column,
            Axis::Line => &mut self.line,
            Axis::Channel => &mut self.channel,
            Axis::Set => &mut self.set,
            Axis::Phase => &mut self.phase,
            Axis::Slice => &mut self.slice,
            Axis::Echo => &mut self.echo,
            Axis::Repetition => &mut self.repetition,
            Axis::Segment => &mut self.segment,
            Axis::Partition => &mut self.partition,
            Axis::Average => &mut self.average,
        };
        *slot = value;
    }

    /// Product of all extents, or `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        Axis::ALL
            .into_iter()
            .try_fold(1usize, |acc, axis| acc.checked_mul(self.get(axis) as usize))
    }

    /// True when every axis is at least 1.
    pub fn is_materializable(&self) -> bool {
        Axis::ALL.into_iter().all(|axis| self.get(axis) >= 1)
    }

    /// True when `index` lies inside this shape on every axis.
    pub fn contains(&self, index: &Dimensions) -> bool {
        Axis::ALL
            .into_iter()
            .all(|axis| index.get(axis) < self.get(axis))
    }

    /// Grow each axis so that `index` fits: `max(self, index + 1)`.
    pub fn widen_to_fit(&mut self, index: &Dimensions) {
        for axis in Axis::ALL {
            let needed = index.get(axis).saturating_add(1);
            if needed > self.get(axis) {
                self.set_axis(axis, needed);
            }
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.to_array();
        write!(f, "[")?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_conversion_follows_axis_order() {
        let dims = Dimensions::from_array([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(dims.column, 1);
        assert_eq!(dims.channel, 3);
        assert_eq!(dims.average, 11);
        assert_eq!(dims.get(Axis::Segment), 9);
        assert_eq!(dims.to_array(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn element_count_and_overflow() {
        assert_eq!(Dimensions::with_extent(4, 3, 2).element_count(), Some(24));
        assert_eq!(Dimensions::zero().element_count(), Some(0));

        let mut huge = Dimensions::unit();
        for axis in Axis::ALL {
            huge.set_axis(axis, u32::MAX);
        }
        assert_eq!(huge.element_count(), None);
    }

    #[test]
    fn widen_takes_per_axis_maximum() {
        let mut dims = Dimensions::with_extent(4, 2, 1);
        let mut index = Dimensions::zero();
        index.line = 5;
        index.slice = 2;
        dims.widen_to_fit(&index);

        assert_eq!(dims.column, 4);
        assert_eq!(dims.line, 6);
        assert_eq!(dims.channel, 1);
        assert_eq!(dims.slice, 3);
        assert_eq!(dims.average, 1);
    }

    #[test]
    fn contains_checks_every_axis() {
        let shape = Dimensions::with_extent(4, 2, 1);
        let mut index = Dimensions::zero();
        assert!(shape.contains(&index));
        index.line = 1;
        assert!(shape.contains(&index));
        index.line = 2;
        assert!(!shape.contains(&index));
        index.line = 0;
        index.echo = 1;
        assert!(!shape.contains(&index));
    }

    #[test]
    fn display_lists_all_axes() {
        assert_eq!(
            Dimensions::with_extent(4, 2, 8).to_string(),
            "[4 2 8 1 1 1 1 1 1 1 1]"
        );
        assert_eq!(Axis::Partition.to_string(), "partition");
    }
}
