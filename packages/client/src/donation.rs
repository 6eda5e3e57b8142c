//! Donation tiers and the time-decaying indicators shown for boosted messages.

use std::fmt;
use std::sync::Arc;

use livechat_shared::time::Clock;

use crate::ports::{IndicatorView, MessageId, UiPorts};

/// Visual bucket for a donation amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Info,
    Primary,
    Success,
    Warning,
    Danger,
}

/// Foreground tone that stays readable on a tier's background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTone {
    Light,
    Dark,
}

/// Inclusive upper bounds; anything above the last bound is `Danger`.
const LADDER: [(u64, Tier); 4] = [
    (1_000, Tier::Info),
    (10_000, Tier::Primary),
    (25_000, Tier::Success),
    (50_000, Tier::Warning),
];

impl Tier {
    /// Map a donation amount onto the ladder
    pub fn classify(amount: u64) -> Self {
        LADDER
            .iter()
            .find(|(upper, _)| amount <= *upper)
            .map_or(Tier::Danger, |(_, tier)| *tier)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Info => "info",
            Tier::Primary => "primary",
            Tier::Success => "success",
            Tier::Warning => "warning",
            Tier::Danger => "danger",
        }
    }

    /// Indicator width as a percentage of the indicator strip
    pub fn width_percent(self) -> u8 {
        match self {
            Tier::Info => 20,
            Tier::Primary => 25,
            Tier::Success => 40,
            Tier::Warning => 60,
            Tier::Danger => 100,
        }
    }

    /// Indicator and message background color
    pub fn background(self) -> &'static str {
        match self {
            Tier::Info => "rgb(47, 140, 155)",
            Tier::Primary => "#185eaa",
            Tier::Success => "rgb(52, 155, 75)",
            Tier::Warning => "rgb(240, 184, 16)",
            Tier::Danger => "rgb(181, 47, 59)",
        }
    }

    pub fn text_tone(self) -> TextTone {
        match self {
            Tier::Warning => TextTone::Dark,
            _ => TextTone::Light,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of one indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorId(pub u64);

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An active donation indicator
#[derive(Debug, Clone, PartialEq)]
pub struct DonationIndicator {
    pub id: IndicatorId,
    pub amount: u64,
    pub tier: Tier,
    pub linked_message: MessageId,
    started_at_ms: i64,
    lifetime_ms: i64,
}

impl DonationIndicator {
    /// Fraction of the lifetime left at `now_ms`, linear from 1.0 to 0.0
    pub fn remaining_fraction(&self, now_ms: i64) -> f64 {
        if self.lifetime_ms <= 0 {
            return 0.0;
        }
        let left = self.lifetime_ms - (now_ms - self.started_at_ms);
        (left as f64 / self.lifetime_ms as f64).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.started_at_ms >= self.lifetime_ms
    }
}

/// Drives creation, decay and removal of donation indicators
///
/// Indicators are kept in arrival order and never capped or reprioritized.
pub struct DonationIndicatorScheduler {
    clock: Arc<dyn Clock>,
    next_id: u64,
    active: Vec<DonationIndicator>,
}

impl DonationIndicatorScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 1,
            active: Vec::new(),
        }
    }

    /// Show a new indicator at full width that decays over `duration_secs`
    pub fn schedule(
        &mut self,
        ui: &dyn UiPorts,
        amount: u64,
        duration_secs: u64,
        linked_message: MessageId,
    ) -> &DonationIndicator {
        let id = IndicatorId(self.next_id);
        self.next_id += 1;

        let tier = Tier::classify(amount);
        let lifetime_ms = i64::try_from(duration_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        tracing::debug!(
            "Indicator {} for {} ({}) lives {}s",
            id,
            amount,
            tier,
            duration_secs
        );

        ui.show_indicator(&IndicatorView {
            id,
            amount,
            tier,
            linked_message,
            duration_secs,
        });

        let index = self.active.len();
        self.active.push(DonationIndicator {
            id,
            amount,
            tier,
            linked_message,
            started_at_ms: self.clock.now_millis(),
            lifetime_ms,
        });
        &self.active[index]
    }

    /// Advance every indicator to the current time
    ///
    /// Expired indicators are removed from the view; the rest shrink.
    pub fn tick(&mut self, ui: &dyn UiPorts) {
        let now = self.clock.now_millis();
        self.active.retain(|indicator| {
            if indicator.is_expired(now) {
                tracing::debug!("Indicator {} expired", indicator.id);
                ui.remove_indicator(indicator.id);
                false
            } else {
                ui.update_indicator(indicator.id, indicator.remaining_fraction(now));
                true
            }
        });
    }

    /// Scroll to the message linked to an active indicator
    ///
    /// # Returns
    ///
    /// `false` if the indicator is unknown or already removed
    pub fn click(&self, ui: &dyn UiPorts, id: IndicatorId) -> bool {
        match self.active.iter().find(|indicator| indicator.id == id) {
            Some(indicator) => {
                ui.scroll_to_message(indicator.linked_message);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> &[DonationIndicator] {
        &self.active
    }
}
