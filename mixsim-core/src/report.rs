//! Report types produced at the end of a run and the qualitative labels
//! derived from them.

use std::fmt;

/// Correlation rate below which anonymity is classified as high.
pub const HIGH_ANONYMITY_THRESHOLD: f64 = 0.1;
/// Correlation rate below which anonymity is classified as medium.
pub const MEDIUM_ANONYMITY_THRESHOLD: f64 = 0.3;
/// Correlation rate below which unlinkability is considered strong.
pub const STRONG_UNLINKABILITY_THRESHOLD: f64 = 0.15;
/// Entropy, in bits, above which unobservability is considered strong.
pub const STRONG_UNOBSERVABILITY_ENTROPY: f64 = 5.0;

/// Metrics aggregated over one simulation run.
///
/// # Examples
/// ```
/// use mixsim_core::{AnonymityLevel, MetricsReport};
///
/// let report = MetricsReport {
///     anonymity_set: 80,
///     entropy: 6.1,
///     correlation_rate: 0.05,
///     avg_latency: 140.0,
/// };
/// assert_eq!(report.anonymity_level(), AnonymityLevel::High);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsReport {
    /// Distinct senders among the routed flows.
    pub anonymity_set: usize,
    /// Shannon entropy of per-source traffic, in bits.
    pub entropy: f64,
    /// Share of the adversary's trials that correlated sender and receiver.
    pub correlation_rate: f64,
    /// Mean latency of the routed flows, `0.0` when none were routed.
    pub avg_latency: f64,
}

impl MetricsReport {
    /// Qualitative anonymity label for this report's correlation rate.
    #[must_use]
    pub fn anonymity_level(&self) -> AnonymityLevel {
        AnonymityLevel::from_correlation_rate(self.correlation_rate)
    }

    /// Derived security assessment against a passive adversary.
    #[must_use]
    pub fn security_analysis(&self) -> SecurityAnalysis {
        SecurityAnalysis::from_report(self)
    }
}

/// Qualitative anonymity classification of a run.
///
/// # Examples
/// ```
/// use mixsim_core::AnonymityLevel;
///
/// assert_eq!(AnonymityLevel::from_correlation_rate(0.09), AnonymityLevel::High);
/// assert_eq!(AnonymityLevel::from_correlation_rate(0.1), AnonymityLevel::Medium);
/// assert_eq!(AnonymityLevel::from_correlation_rate(0.3).as_str(), "LOW");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AnonymityLevel {
    /// Correlation rate below 0.1.
    High,
    /// Correlation rate in `[0.1, 0.3)`.
    Medium,
    /// Correlation rate of 0.3 or more.
    Low,
}

impl AnonymityLevel {
    /// Classifies a correlation rate.
    #[must_use]
    pub fn from_correlation_rate(rate: f64) -> Self {
        if rate < HIGH_ANONYMITY_THRESHOLD {
            Self::High
        } else if rate < MEDIUM_ANONYMITY_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Stable upper-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength of a single security property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Strength {
    /// The property holds comfortably.
    Strong,
    /// The property holds with reservations.
    Moderate,
}

impl Strength {
    /// Stable upper-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "STRONG",
            Self::Moderate => "MODERATE",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assessment of a run against a passive adversary.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecurityAnalysis {
    /// Strong when the correlation rate stays below 0.15.
    pub unlinkability: Strength,
    /// Strong when traffic entropy exceeds 5 bits.
    pub unobservability: Strength,
    /// Share of correlation attempts that failed, `1 - correlation_rate`.
    pub resistance: f64,
}

impl SecurityAnalysis {
    /// Derives the assessment from a report.
    ///
    /// # Examples
    /// ```
    /// use mixsim_core::{MetricsReport, SecurityAnalysis, Strength};
    ///
    /// let report = MetricsReport {
    ///     anonymity_set: 10,
    ///     entropy: 3.2,
    ///     correlation_rate: 0.12,
    ///     avg_latency: 95.0,
    /// };
    /// let analysis = SecurityAnalysis::from_report(&report);
    /// assert_eq!(analysis.unlinkability, Strength::Strong);
    /// assert_eq!(analysis.unobservability, Strength::Moderate);
    /// assert!((analysis.resistance - 0.88).abs() < 1e-12);
    /// ```
    #[expect(
        clippy::float_arithmetic,
        reason = "resistance is the complement of the correlation rate"
    )]
    #[must_use]
    pub fn from_report(report: &MetricsReport) -> Self {
        let unlinkability = if report.correlation_rate < STRONG_UNLINKABILITY_THRESHOLD {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        let unobservability = if report.entropy > STRONG_UNOBSERVABILITY_ENTROPY {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        Self {
            unlinkability,
            unobservability,
            resistance: 1.0 - report.correlation_rate,
        }
    }
}
