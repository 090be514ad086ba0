//! Segment display encoding for the 1.9" e-paper panel.
//!
//! Readings are split into digit cells, each cell is looked up as a pair of
//! half-cell bytes, and the halves are laid out into a fixed 14 byte frame:
//!
//! ```text
//! byte  0      temperature hundreds (right half only)
//! byte  1..=4  temperature tens, ones       (4 |= decimal point)
//! byte  5..=10 humidity tens, ones, tenths  (8 and 10 |= decimal point)
//! byte 11..=12 temperature tenths
//! byte 13      status icons
//! ```

use std::fmt;

use crate::types::{MetricKind, Reading};

pub const SEGMENT_BUFFER_LEN: usize = 14;

pub const DECIMAL_POINT_MASK: u8 = 0b0010_0000;

pub const STATUS_BYTE: u8 = 0x05 | 0b0000_1000 | 0b0001_0000;

/// Offsets that carry the decimal point decorator on top of a digit half.
pub const DECIMAL_POINT_OFFSETS: [usize; 3] = [4, 8, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Digit {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Blank,
}

impl Digit {
    pub const ALL: [Digit; 11] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Blank,
    ];

    /// Least significant decimal digit of `value`.
    pub fn from_value(value: u32) -> Self {
        match value % 10 {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            8 => Self::Eight,
            _ => Self::Nine,
        }
    }

    pub fn value(self) -> Option<u8> {
        match self {
            Self::Zero => Some(0),
            Self::One => Some(1),
            Self::Two => Some(2),
            Self::Three => Some(3),
            Self::Four => Some(4),
            Self::Five => Some(5),
            Self::Six => Some(6),
            Self::Seven => Some(7),
            Self::Eight => Some(8),
            Self::Nine => Some(9),
            Self::Blank => None,
        }
    }

    /// `(left, right)` half-cell patterns as wired on the panel.
    pub fn segments(self) -> (u8, u8) {
        match self {
            Self::Zero => (0xbf, 0x1f),
            Self::One => (0x00, 0x1f),
            Self::Two => (0xfd, 0x17),
            Self::Three => (0xf5, 0x1f),
            Self::Four => (0x47, 0x1f),
            Self::Five => (0xf7, 0x1d),
            Self::Six => (0xff, 0x1d),
            Self::Seven => (0x21, 0x1f),
            Self::Eight => (0xff, 0x1f),
            Self::Nine => (0xf7, 0x1f),
            Self::Blank => (0x00, 0x00),
        }
    }

    pub fn left(self) -> u8 {
        self.segments().0
    }

    pub fn right(self) -> u8 {
        self.segments().1
    }

    /// Inverse of [`Digit::segments`]. Overlay bits must already be stripped.
    pub fn from_segments(left: u8, right: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|digit| digit.segments() == (left, right))
    }

    pub fn as_char(self) -> char {
        match self.value() {
            Some(value) => char::from(b'0' + value),
            None => ' ',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitSequence {
    /// Hundreds, tens, ones, tenths.
    Temperature([Digit; 4]),
    /// Tens, ones, tenths.
    Humidity([Digit; 3]),
}

impl DigitSequence {
    pub fn digits(&self) -> &[Digit] {
        match self {
            Self::Temperature(digits) => digits,
            Self::Humidity(digits) => digits,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.digits().iter().all(|digit| *digit == Digit::Blank)
    }
}

impl fmt::Display for DigitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.digits();
        let (integer, fraction) = digits.split_at(digits.len() - 1);
        for digit in integer {
            write!(f, "{}", digit.as_char())?;
        }
        write!(f, ".{}", fraction[0].as_char())
    }
}

/// Splits a reading into its display cells.
///
/// Values of 1000 and above lose their thousands by the modulo arithmetic.
/// Negative and NaN values have no sensible rendering and come back blank.
pub fn extract_digits(value: f32, kind: MetricKind) -> DigitSequence {
    match kind {
        MetricKind::Temperature => DigitSequence::Temperature(temperature_digits(value)),
        MetricKind::Humidity => DigitSequence::Humidity(humidity_digits(value)),
    }
}

pub fn temperature_digits(value: f32) -> [Digit; 4] {
    if !is_displayable(value) {
        return [Digit::Blank; 4];
    }

    let integer = value as u32;
    let hundreds = if value < 100.0 {
        Digit::Blank
    } else {
        Digit::from_value(integer / 100)
    };

    [
        hundreds,
        Digit::from_value(integer / 10),
        Digit::from_value(integer),
        tenths_digit(value),
    ]
}

pub fn humidity_digits(value: f32) -> [Digit; 3] {
    if !is_displayable(value) {
        return [Digit::Blank; 3];
    }

    let integer = value as u32;
    [
        Digit::from_value(integer / 10),
        Digit::from_value(integer),
        tenths_digit(value),
    ]
}

fn is_displayable(value: f32) -> bool {
    !value.is_nan() && value >= 0.0
}

fn tenths_digit(value: f32) -> Digit {
    // `as` saturates, so huge readings stay well defined.
    Digit::from_value((value * 10.0).floor() as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBuffer([u8; SEGMENT_BUFFER_LEN]);

impl SegmentBuffer {
    /// Every segment off, including the status icons.
    pub fn blank() -> Self {
        Self([0; SEGMENT_BUFFER_LEN])
    }

    pub fn encode(temperature: [Digit; 4], humidity: [Digit; 3]) -> Self {
        Self::compose([
            DigitSequence::Temperature(temperature),
            DigitSequence::Humidity(humidity),
        ])
    }

    pub fn render(reading: &Reading) -> Self {
        Self::compose(
            [MetricKind::Temperature, MetricKind::Humidity]
                .map(|kind| extract_digits(reading.value(kind), kind)),
        )
    }

    fn compose(sequences: [DigitSequence; 2]) -> Self {
        let mut bytes = [0_u8; SEGMENT_BUFFER_LEN];
        for sequence in sequences {
            place(&mut bytes, sequence);
        }

        for offset in DECIMAL_POINT_OFFSETS {
            bytes[offset] |= DECIMAL_POINT_MASK;
        }
        bytes[13] = STATUS_BYTE;

        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SEGMENT_BUFFER_LEN] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; SEGMENT_BUFFER_LEN]) -> Self {
        Self(bytes)
    }

    /// Recovers the digits as the panel shows them. Returns `None` when a cell
    /// holds a pattern outside the digit table.
    ///
    /// The hundreds cell has only its right half, which 0, 1, 3, 4, 7, 8 and 9
    /// share. That half alone looks like a one on the panel, so any of those
    /// reads back as `One` (350 decodes as 150). The halves of 2, 5 and 6 are
    /// not a whole digit and give `None`.
    pub fn decode(&self) -> Option<(DigitSequence, DigitSequence)> {
        let bytes = self.stripped();

        let t_hundreds = match bytes[0] {
            0x00 => Digit::Blank,
            right if right == Digit::One.right() => Digit::One,
            _ => return None,
        };
        let temperature = DigitSequence::Temperature([
            t_hundreds,
            Digit::from_segments(bytes[1], bytes[2])?,
            Digit::from_segments(bytes[3], bytes[4])?,
            Digit::from_segments(bytes[11], bytes[12])?,
        ]);
        let humidity = DigitSequence::Humidity([
            Digit::from_segments(bytes[5], bytes[6])?,
            Digit::from_segments(bytes[7], bytes[8])?,
            Digit::from_segments(bytes[9], bytes[10])?,
        ]);

        Some((temperature, humidity))
    }

    fn stripped(&self) -> [u8; SEGMENT_BUFFER_LEN] {
        let mut bytes = self.0;
        for offset in DECIMAL_POINT_OFFSETS {
            bytes[offset] &= !DECIMAL_POINT_MASK;
        }
        bytes
    }
}

fn place(bytes: &mut [u8; SEGMENT_BUFFER_LEN], sequence: DigitSequence) {
    match sequence {
        DigitSequence::Temperature([hundreds, tens, ones, tenths]) => {
            // The hundreds cell is a half digit; only its right half is wired.
            bytes[0] = hundreds.right();
            bytes[1] = tens.left();
            bytes[2] = tens.right();
            bytes[3] = ones.left();
            bytes[4] = ones.right();
            bytes[11] = tenths.left();
            bytes[12] = tenths.right();
        }
        DigitSequence::Humidity([tens, ones, tenths]) => {
            bytes[5] = tens.left();
            bytes[6] = tens.right();
            bytes[7] = ones.left();
            bytes[8] = ones.right();
            bytes[9] = tenths.left();
            bytes[10] = tenths.right();
        }
    }
}

impl fmt::Display for SegmentBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
