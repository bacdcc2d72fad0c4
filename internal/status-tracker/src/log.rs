// Copyright 2024 Veridoc contributors. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::{
    borrow::Cow,
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use crate::StatusTracker;

/// Overall severity of a validation outcome.
///
/// The derived ordering is the worst-of ordering used when aggregating
/// sub-check outcomes: `Invalid > Indeterminate > Warning > Valid`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ValidationStatus {
    /// The check passed.
    #[default]
    Valid,

    /// The check passed, but a condition deserves the caller's attention
    /// (for example, a certificate expiring soon or an untrusted but
    /// well-formed chain).
    Warning,

    /// The check could not be completed, and absence of proof is not proof
    /// of validity (for example, an unreachable revocation source).
    Indeterminate,

    /// The check failed.
    Invalid,
}

impl Display for ValidationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Warning => "warning",
            Self::Indeterminate => "indeterminate",
            Self::Invalid => "invalid",
        })
    }
}

impl FromStr for ValidationStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "warning" => Ok(Self::Warning),
            "indeterminate" => Ok(Self::Indeterminate),
            "invalid" => Ok(Self::Invalid),
            _ => Err(UnknownStatusError(s.to_owned())),
        }
    }
}

/// Returned when parsing a [`ValidationStatus`] from an unrecognized string.
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownStatusError(pub String);

impl Display for UnknownStatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown validation status ({})", self.0)
    }
}

impl std::error::Error for UnknownStatusError {}

/// Detailed information about a single validation sub-check outcome.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogItem {
    /// Label of the object this item refers to (a certificate key, a
    /// signature record id, or other descriptive label).
    pub label: Cow<'static, str>,

    /// Plain-language reason for this item.
    pub description: Cow<'static, str>,

    /// Source file where the condition was detected.
    pub file: Cow<'static, str>,

    /// Function where the condition was detected.
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected.
    pub line: u32,

    /// Debug representation of the underlying error, if any.
    pub err_val: Option<Cow<'static, str>>,

    /// Validation status code (see [`validation_codes`]).
    ///
    /// [`validation_codes`]: crate::validation_codes
    pub validation_status: Option<Cow<'static, str>>,

    /// Severity of this item when aggregating an overall status.
    pub severity: ValidationStatus,
}

impl LogItem {
    /// Create a `LogItem` without using the [`log_item`](crate::log_item)
    /// macro.
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
        file: impl Into<Cow<'static, str>>,
        line: u32,
    ) -> Self {
        LogItem {
            label: label.into(),
            description: description.into(),
            file: file.into(),
            function: function.into(),
            line,
            err_val: None,
            validation_status: None,
            severity: ValidationStatus::Valid,
        }
    }

    /// Capture the debug representation of an error value as additional
    /// information for this item.
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Add a validation status code.
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            ..self
        }
    }

    /// Record this item as a successful check.
    pub fn success(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(LogItem {
            severity: ValidationStatus::Valid,
            ..self
        });
    }

    /// Record this item without changing its severity.
    pub fn informational(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(self);
    }

    /// Record this item as a warning-severity outcome.
    pub fn warning(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(LogItem {
            severity: ValidationStatus::Warning,
            ..self
        });
    }

    /// Record this item as an indeterminate-severity outcome.
    pub fn indeterminate(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(LogItem {
            severity: ValidationStatus::Indeterminate,
            ..self
        });
    }

    /// Record this item as a failed check.
    ///
    /// Will return `Err(err)` if the tracker is configured to stop on the
    /// first error; `Ok(())` otherwise.
    pub fn failure<E: Debug>(self, tracker: &mut StatusTracker, err: E) -> Result<(), E> {
        let item = LogItem {
            err_val: Some(format!("{err:?}").into()),
            severity: ValidationStatus::Invalid,
            ..self
        };
        tracker.add_error(item, err)
    }

    /// Record this item as a failed check, discarding any stop-on-error
    /// response from the tracker.
    pub fn failure_no_throw<E: Debug>(self, tracker: &mut StatusTracker, err: E) {
        let item = LogItem {
            err_val: Some(format!("{err:?}").into()),
            severity: ValidationStatus::Invalid,
            ..self
        };
        let _ = tracker.add_error(item, err);
    }
}

/// Creates a [`LogItem`] annotated with the source file and line number where
/// the condition was discovered.
///
/// Takes three parameters, each of which may be a `'static str` or `String`:
///
/// * `label`: name of the object this item references
/// * `description`: plain-language reason for this item
/// * `function`: name of the function generating this item
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem {
            label: $label.into(),
            file: file!().into(),
            function: $function.into(),
            line: line!(),
            description: $description.into(),
            err_val: None,
            validation_status: None,
            severity: $crate::ValidationStatus::Valid,
        }
    }};
}
