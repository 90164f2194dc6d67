use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use crate::elapsed::ElapsedBreakdown;
use crate::error::DisplayError;
use crate::format::format_with_commas;

pub const TEXT_COLOR: u32 = 0x41_8f_de;

/// The value a display slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Years,
    Days,
    Hours,
    Minutes,
    TotalDays,
    TotalMinutes,
    TotalSeconds,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Years => "years",
            Field::Days => "days",
            Field::Hours => "hours",
            Field::Minutes => "minutes",
            Field::TotalDays => "total days",
            Field::TotalMinutes => "total minutes",
            Field::TotalSeconds => "total seconds",
        }
    }

    fn position(&self) -> (i32, i32) {
        match self {
            Field::Years => (118, 10),
            Field::Days => (7, 36),
            Field::Hours => (122, 35),
            Field::Minutes => (30, 60),
            Field::TotalDays => (30, 85),
            Field::TotalMinutes => (30, 110),
            Field::TotalSeconds => (30, 135),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Which set of slots is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Years, days, hours and minutes.
    Basic,
    /// Basic plus running totals of days, minutes and seconds.
    Extended,
}

impl Layout {
    pub fn fields(&self) -> &'static [Field] {
        const BASIC: &[Field] = &[Field::Years, Field::Days, Field::Hours, Field::Minutes];
        const EXTENDED: &[Field] = &[
            Field::Years,
            Field::Days,
            Field::Hours,
            Field::Minutes,
            Field::TotalDays,
            Field::TotalMinutes,
            Field::TotalSeconds,
        ];

        match self {
            Layout::Basic => BASIC,
            Layout::Extended => EXTENDED,
        }
    }

    pub fn slots(&self) -> Vec<DisplaySlot> {
        self.fields().iter().map(|&field| DisplaySlot::new(field)).collect()
    }
}

/// A fixed text region on screen bound to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySlot {
    pub field: Field,
    pub x: i32,
    pub y: i32,
    pub color: u32,
    pub text: String,
}

impl DisplaySlot {
    pub fn new(field: Field) -> Self {
        let (x, y) = field.position();
        Self {
            field,
            x,
            y,
            color: TEXT_COLOR,
            text: String::from("  "),
        }
    }
}

/// Text for each field of a layout. Units are plain decimal, totals are
/// grouped with commas.
pub fn render_text(breakdown: &ElapsedBreakdown, layout: Layout) -> BTreeMap<Field, String> {
    layout
        .fields()
        .iter()
        .map(|&field| {
            let text = match field {
                Field::Years => breakdown.years.to_string(),
                Field::Days => breakdown.days.to_string(),
                Field::Hours => breakdown.hours.to_string(),
                Field::Minutes => breakdown.minutes.to_string(),
                Field::TotalDays => format_with_commas(breakdown.total_days),
                Field::TotalMinutes => format_with_commas(breakdown.total_minutes),
                Field::TotalSeconds => format_with_commas(breakdown.total_seconds),
            };
            (field, text)
        })
        .collect()
}

/// Something that can put slot text on screen.
pub trait Display {
    fn draw(&mut self, slot: &DisplaySlot) -> Result<(), DisplayError>;

    /// Called once all slots of a frame are drawn.
    fn present(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Writes each frame as lines of text, one per slot.
pub struct ConsoleDisplay<W> {
    out: W,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for ConsoleDisplay<W> {
    fn draw(&mut self, slot: &DisplaySlot) -> Result<(), DisplayError> {
        writeln!(
            self.out,
            "{:>13} @ {:>3},{:<3} #{:06x}  {}",
            slot.field, slot.x, slot.y, slot.color, slot.text
        )?;
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elapsed::decompose;

    #[test]
    fn test_layout_slots() {
        let basic = Layout::Basic.slots();
        assert_eq!(basic.len(), 4);
        assert_eq!((basic[0].x, basic[0].y), (118, 10));
        assert_eq!(basic[3].field, Field::Minutes);

        let extended = Layout::Extended.slots();
        assert_eq!(extended.len(), 7);
        assert_eq!((extended[6].x, extended[6].y), (30, 135));
        assert!(extended.iter().all(|slot| slot.color == 0x418fde));
    }

    #[test]
    fn test_render_text() {
        // 3 years, 4 days, 5 hours, 6 minutes and 7 seconds
        let b = decompose(4 * 86_400 + 5 * 3600 + 6 * 60 + 7, 3);

        let basic = render_text(&b, Layout::Basic);
        assert_eq!(basic.len(), 4);
        assert_eq!(basic[&Field::Years], "3");
        assert_eq!(basic[&Field::Days], "4");
        assert_eq!(basic[&Field::Hours], "5");
        assert_eq!(basic[&Field::Minutes], "6");
        assert!(!basic.contains_key(&Field::TotalSeconds));

        let extended = render_text(&b, Layout::Extended);
        assert_eq!(extended[&Field::TotalDays], "1,099");
        assert_eq!(extended[&Field::TotalMinutes], "1,582,866");
        assert_eq!(extended[&Field::TotalSeconds], "94,971,967");
    }

    #[test]
    fn test_console_display() {
        let mut display = ConsoleDisplay::new(Vec::new());
        let mut slot = DisplaySlot::new(Field::TotalSeconds);
        slot.text = String::from("1,000");
        display.draw(&slot).unwrap();
        display.present().unwrap();

        let out = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(out, "total seconds @  30,135 #418fde  1,000\n\n");
    }
}
