use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// Placeholder shown for completed steps whose exact date is not tracked.
pub const UNKNOWN_DATE: &str = "--";

/// Display format for timeline dates, e.g. `Mar 5, 2024`.
const DATE_FORMAT: &str = "%b %-d, %Y";

/// Lifecycle
///
/// Common surface of the enumerated progress values (order status, application stage,
/// job status). Each value has a stable wire name, used both for storage and for the
/// humanized display label.
pub trait Lifecycle: Copy + Eq + 'static {
    /// Stable wire/storage name (`on_hold`, `UNDER_REVIEW`, ...).
    fn as_str(&self) -> &'static str;

    /// Human readable label (`On Hold`, `Under Review`, ...).
    fn label(&self) -> String {
        humanize(self.as_str())
    }
}

/// humanize
///
/// Turns a wire name into a display label: `_` separated words, first letter upper-cased,
/// the rest lower-cased.
pub fn humanize(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Error returned when a stored or submitted value is not part of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! lifecycle_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, serde = $rename:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
        #[serde(rename_all = $rename)]
        #[ts(export)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Lifecycle for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

lifecycle_enum! {
    /// OrderStatus
    ///
    /// Ten-value order lifecycle. The first five form the happy path, the rest are
    /// alternative terminal branches.
    OrderStatus, "order status", serde = "snake_case" {
        #[default]
        Pending => "pending",
        Confirmed => "confirmed",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
        Returned => "returned",
        Refunded => "refunded",
        Failed => "failed",
        OnHold => "on_hold",
    }
}

lifecycle_enum! {
    /// ApplicationStage
    ///
    /// Progress of a job application from submission to a hiring decision.
    ApplicationStage, "application stage", serde = "SCREAMING_SNAKE_CASE" {
        #[default]
        Applied => "APPLIED",
        UnderReview => "UNDER_REVIEW",
        Interview => "INTERVIEW",
        AwaitingPayment => "AWAITING_PAYMENT",
        InQueue => "IN_QUEUE",
        OnTrial => "ON_TRIAL",
        Hired => "HIRED",
        Closed => "CLOSED",
        Rejected => "REJECTED",
    }
}

lifecycle_enum! {
    /// JobStatus
    ///
    /// Visibility of a job listing.
    JobStatus, "job status", serde = "lowercase" {
        #[default]
        Active => "active",
        Inactive => "inactive",
    }
}

impl OrderStatus {
    pub const PRIMARY: &'static [OrderStatus] = &[
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub const ALTERNATIVE: &'static [OrderStatus] = &[
        OrderStatus::Cancelled,
        OrderStatus::Returned,
        OrderStatus::Refunded,
        OrderStatus::Failed,
        OrderStatus::OnHold,
    ];

    /// Renders the order's progress timeline.
    pub fn timeline(self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Timeline<Self> {
        render_timeline(self, Self::PRIMARY, Self::ALTERNATIVE, created_at, updated_at)
    }
}

impl ApplicationStage {
    pub const PRIMARY: &'static [ApplicationStage] = &[
        ApplicationStage::Applied,
        ApplicationStage::UnderReview,
        ApplicationStage::Interview,
        ApplicationStage::AwaitingPayment,
        ApplicationStage::InQueue,
        ApplicationStage::OnTrial,
        ApplicationStage::Hired,
    ];

    pub const ALTERNATIVE: &'static [ApplicationStage] =
        &[ApplicationStage::Closed, ApplicationStage::Rejected];

    /// Badge colour used by the dashboards.
    pub fn color(self) -> &'static str {
        match self {
            ApplicationStage::Applied => "blue",
            ApplicationStage::UnderReview => "yellow",
            ApplicationStage::Interview => "purple",
            ApplicationStage::AwaitingPayment => "orange",
            ApplicationStage::InQueue => "gray",
            ApplicationStage::OnTrial => "pink",
            ApplicationStage::Hired => "green",
            ApplicationStage::Closed | ApplicationStage::Rejected => "red",
        }
    }

    pub fn timeline(self, applied_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Timeline<Self> {
        render_timeline(self, Self::PRIMARY, Self::ALTERNATIVE, applied_at, updated_at)
    }
}

/// One rendered step of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStep<S> {
    pub status: S,
    pub label: String,
    /// `None` for steps not reached yet, [`UNKNOWN_DATE`] for reached steps without a tracked date.
    pub date: Option<String>,
    pub is_completed: bool,
    pub is_current: bool,
}

/// Timeline
///
/// Output of [`render_timeline`]: the primary steps (possibly truncated) and, for
/// alternative statuses, the terminal step appended after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline<S> {
    pub steps: Vec<TimelineStep<S>>,
    pub terminal: Option<TimelineStep<S>>,
}

impl<S> Timeline<S> {
    /// The step marked current, either in the primary sequence or the terminal one.
    pub fn current(&self) -> Option<&TimelineStep<S>> {
        self.terminal
            .as_ref()
            .filter(|step| step.is_current)
            .or_else(|| self.steps.iter().find(|step| step.is_current))
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// render_timeline
///
/// Pure presentation of a lifecycle value against its primary and alternative sequences.
///
/// * Primary value at index `k`: steps `0..=k` are completed and step `k` is current.
///   Step 0 shows the creation date, the current step (when not step 0) shows the
///   last-updated date, every other completed step shows [`UNKNOWN_DATE`].
/// * Alternative value: only the first two primary steps are kept, both completed and
///   neither current, followed by a terminal step carrying the alternative value and
///   the last-updated date.
///
/// A value found in neither sequence renders every step as not completed.
pub fn render_timeline<S: Lifecycle>(
    current: S,
    primary: &[S],
    alternative: &[S],
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Timeline<S> {
    let is_alternative = alternative.contains(&current);
    let current_index = primary.iter().position(|status| *status == current);

    let steps = primary
        .iter()
        .enumerate()
        .take(if is_alternative { 2 } else { primary.len() })
        .map(|(index, status)| {
            let is_completed = is_alternative || current_index.is_some_and(|k| index <= k);
            let is_current = !is_alternative && current_index == Some(index);

            let date = is_completed.then(|| {
                if index == 0 {
                    format_date(created_at)
                } else if is_current {
                    format_date(updated_at)
                } else {
                    UNKNOWN_DATE.to_string()
                }
            });

            TimelineStep {
                status: *status,
                label: status.label(),
                date,
                is_completed,
                is_current,
            }
        })
        .collect();

    let terminal = is_alternative.then(|| TimelineStep {
        status: current,
        label: current.label(),
        date: Some(format_date(updated_at)),
        is_completed: true,
        is_current: true,
    });

    Timeline { steps, terminal }
}
