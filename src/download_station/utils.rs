//! Human-readable figures derived from task data.

use super::entities::TaskStatus::{Downloading, Seeding};
use super::entities::{Task, Transfer};
use byte_unit::{Byte, UnitType};

fn human_bytes(bytes: u64) -> String {
    format!(
        "{:#.2}",
        Byte::from(bytes).get_appropriate_unit(UnitType::Decimal)
    )
}

impl Task {
    fn transfer(&self) -> Option<&Transfer> {
        self.additional.as_ref()?.transfer.as_ref()
    }

    #[must_use]
    pub fn calculate_size(&self) -> String {
        human_bytes(self.size)
    }

    /// Downloaded share in whole percent, `0` when unknown
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn calculate_progress(&self) -> f64 {
        match self.transfer() {
            Some(transfer) if self.size > 0 => {
                (transfer.size_downloaded as f64 / self.size as f64 * 100.0).round()
            }
            _ => 0.0,
        }
    }

    /// Current speed as `(1.23 MB/s)`, empty unless downloading or seeding
    #[must_use]
    pub fn calculate_speed(&self) -> String {
        let speed = match (self.status, self.transfer()) {
            (Downloading, Some(transfer)) => transfer.speed_download,
            (Seeding, Some(transfer)) => transfer.speed_upload,
            _ => 0,
        };
        if speed == 0 {
            return String::new();
        }
        format!("({}/s)", human_bytes(speed))
    }

    /// Seconds until the download completes at the current speed
    #[must_use]
    pub fn seconds_left(&self) -> Option<u64> {
        if self.status != Downloading {
            return None;
        }
        let transfer = self.transfer()?;
        if transfer.speed_download == 0 {
            return None;
        }
        Some(self.size.saturating_sub(transfer.size_downloaded) / transfer.speed_download)
    }

    /// `⏳Time left: ...` while downloading, empty otherwise
    #[must_use]
    pub fn calculate_time_left(&self) -> String {
        if self.status != Downloading || self.transfer().is_none() {
            return String::new();
        }
        format!("⏳Time left: {}", format_eta(self.seconds_left()))
    }
}

/// Formats a duration in seconds as `42 s`, `3 m 5 s`, `2 h 10 m` or `1 d 4 h 0 m`
#[must_use]
pub fn format_eta(seconds: Option<u64>) -> String {
    let Some(input) = seconds else {
        return String::from("Unknown");
    };
    let (days, rest) = (input / 86_400, input % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, secs) = (rest / 60, rest % 60);

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{secs} s"),
        (0, 0, _) => format!("{minutes} m {secs} s"),
        (0, _, _) => format!("{hours} h {minutes} m"),
        _ => format!("{days} d {hours} h {minutes} m"),
    }
}
