//! Next bookable time slot.
//!
//! The current time is rounded up to the next slot boundary. A time sitting
//! exactly on a boundary (zero seconds) is kept. Anything earlier than the
//! opening time moves to the opening time; anything past the closing time
//! is rejected.

use crate::error::SlotError;
use crate::utils::config::SlotSettings;
use anyhow::Result;
use chrono::{NaiveTime, Timelike};

/// Bookable window, in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub open: u32,
    pub close: u32,
    pub step: u32,
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self {
            open: 7 * 60,
            close: 20 * 60 + 30,
            step: 30,
        }
    }
}

impl SlotWindow {
    pub fn from_settings(settings: &SlotSettings) -> Result<Self> {
        Ok(Self {
            open: minutes_of(settings.open_time()?),
            close: minutes_of(settings.close_time()?),
            step: settings.step_minutes.max(1),
        })
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn next_available_slot(now: NaiveTime, window: &SlotWindow) -> Result<NaiveTime, SlotError> {
    let mut minutes = minutes_of(now);
    if now.second() > 0 || now.nanosecond() > 0 {
        minutes += 1;
    }

    let slot = minutes.div_ceil(window.step) * window.step;
    if slot > window.close {
        return Err(SlotError::OutsideBusinessHours {
            slot: format_minutes(slot),
            latest: format_minutes(window.close),
        });
    }

    let slot = slot.max(window.open);
    // slot <= close < 24:00 here, so the conversion always succeeds
    Ok(NaiveTime::from_hms_opt(slot / 60, slot % 60, 0).unwrap_or(now))
}

/// Slot as shown in the booking field
pub fn format_slot(slot: NaiveTime) -> String {
    slot.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn slot(h: u32, m: u32) -> Result<NaiveTime, SlotError> {
        next_available_slot(at(h, m, 0), &SlotWindow::default())
    }

    #[test]
    fn test_early_morning_moves_to_opening() {
        assert_eq!(slot(2, 0), Ok(at(7, 0, 0)));
        assert_eq!(slot(6, 59), Ok(at(7, 0, 0)));
    }

    #[test]
    fn test_rounds_up_to_half_hour() {
        assert_eq!(slot(9, 7), Ok(at(9, 30, 0)));
        assert_eq!(slot(9, 31), Ok(at(10, 0, 0)));
    }

    #[test]
    fn test_boundary_is_kept_unless_seconds_passed() {
        assert_eq!(slot(10, 30), Ok(at(10, 30, 0)));
        assert_eq!(
            next_available_slot(at(10, 30, 1), &SlotWindow::default()),
            Ok(at(11, 0, 0))
        );
        assert_eq!(slot(20, 30), Ok(at(20, 30, 0)));
    }

    #[test]
    fn test_outside_business_hours() {
        assert_eq!(
            slot(20, 45),
            Err(SlotError::OutsideBusinessHours {
                slot: "21:00".to_string(),
                latest: "20:30".to_string(),
            })
        );
        assert!(slot(23, 50).is_err());
    }

    #[test]
    fn test_window_from_settings() {
        let settings = SlotSettings {
            open: "08:00".to_string(),
            close: "18:00".to_string(),
            step_minutes: 15,
        };
        let window = SlotWindow::from_settings(&settings).unwrap();
        assert_eq!(next_available_slot(at(9, 7, 0), &window), Ok(at(9, 15, 0)));
        assert_eq!(next_available_slot(at(5, 0, 0), &window), Ok(at(8, 0, 0)));
        assert_eq!(format_slot(at(9, 15, 0)), "09:15");
    }
}
