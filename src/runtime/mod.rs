//! # Runtime Version Resolver
//!
//! Resolves a user-declared version-range selector against an immutable,
//! time-bounded support matrix to pick the concrete runtime major version a
//! build must target.
//!
//! The matrix is versioned deployment configuration, not runtime input: it is
//! constructed once at process start (typically from JSON) and never mutated.
//! Tests substitute alternate matrices and clocks freely.

mod range;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use range::{parse_interval, VersionInterval};

use crate::PackError;

/// One entry of the support matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportedRuntime {
    /// The concrete major version a build targets when this entry wins.
    pub major: u64,
    /// The version range this entry offers, e.g. `"10.x"` or `"8.10.x"`.
    /// Parsed into an interval at matrix construction; a selector matches
    /// this entry when the two intervals overlap.
    pub range: String,
    /// Execution-environment identifier, e.g. `"nodejs10.x"`.
    pub runtime: String,
    /// Last day of support. `None` means no end-of-support is scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discontinue_date: Option<NaiveDate>,
}

impl SupportedRuntime {
    fn discontinued_at(&self, today: NaiveDate) -> bool {
        self.discontinue_date.is_some_and(|d| d < today)
    }
}

/// The ordered, read-only support matrix. Entries are kept in descending
/// major order; that ordering is load-bearing, the first eligible entry wins.
#[derive(Debug, Clone)]
pub struct RuntimeMatrix {
    entries: Vec<(SupportedRuntime, VersionInterval)>,
    default_index: usize,
}

impl RuntimeMatrix {
    /// Build a matrix from a list of runtime descriptors.
    ///
    /// Entries are sorted by descending major version. The default selection
    /// is fixed here: the newest entry not yet discontinued at construction
    /// time. Fails if a `range` label does not parse or the list is empty.
    pub fn new(mut runtimes: Vec<SupportedRuntime>) -> Result<Self, PackError> {
        runtimes.sort_by(|a, b| b.major.cmp(&a.major));
        Self::with_today(runtimes, Utc::now().date_naive())
    }

    fn with_today(runtimes: Vec<SupportedRuntime>, today: NaiveDate) -> Result<Self, PackError> {
        if runtimes.is_empty() {
            return Err(PackError::Other("empty runtime support matrix".into()));
        }
        let mut entries = Vec::with_capacity(runtimes.len());
        for runtime in runtimes {
            let interval = parse_interval(&runtime.range)
                .map_err(|_| PackError::InvalidRange { selector: runtime.range.clone() })?;
            entries.push((runtime, interval));
        }
        let default_index = entries
            .iter()
            .position(|(r, _)| !r.discontinued_at(today))
            .unwrap_or(0);
        Ok(Self { entries, default_index })
    }

    /// Load a matrix from its JSON configuration form: an array of
    /// [`SupportedRuntime`] objects.
    pub fn from_json(json: &str) -> Result<Self, PackError> {
        let runtimes: Vec<SupportedRuntime> =
            serde_json::from_str(json).map_err(|e| PackError::Other(Box::new(e)))?;
        Self::new(runtimes)
    }

    /// The fixed descriptor returned for an absent or empty selector.
    pub fn default_selection(&self) -> &SupportedRuntime {
        &self.entries[self.default_index].0
    }

    /// All entries, newest major first.
    pub fn entries(&self) -> impl Iterator<Item = &SupportedRuntime> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// Resolve a selector against the matrix, judging discontinuation
    /// against the current date. See [`RuntimeMatrix::resolve_at`].
    pub fn resolve(&self, selector: Option<&str>) -> Result<&SupportedRuntime, PackError> {
        self.resolve_at(selector, Utc::now().date_naive())
    }

    /// Resolve a selector against the matrix as of `today`.
    ///
    /// An absent or blank selector yields the default selection. Otherwise
    /// the matrix is scanned newest-major first and the first entry whose
    /// offered range overlaps the selector and whose support window is still
    /// open wins, so a higher major is preferred whenever the selector allows
    /// it. Distinguishes "never supported" (`UnsupportedRange`) from "no
    /// longer supported" (`Discontinued`).
    pub fn resolve_at(
        &self,
        selector: Option<&str>,
        today: NaiveDate,
    ) -> Result<&SupportedRuntime, PackError> {
        let selector = match selector {
            None => return Ok(self.default_selection()),
            Some(s) if s.trim().is_empty() => return Ok(self.default_selection()),
            Some(s) => s,
        };

        let wanted = parse_interval(selector)
            .map_err(|_| PackError::InvalidRange { selector: selector.to_string() })?;

        let mut expired: Option<&SupportedRuntime> = None;
        for (runtime, offered) in &self.entries {
            if !offered.overlaps(&wanted) {
                continue;
            }
            if runtime.discontinued_at(today) {
                expired.get_or_insert(runtime);
                continue;
            }
            return Ok(runtime);
        }

        match expired {
            Some(runtime) => Err(PackError::Discontinued {
                selector: selector.to_string(),
                major: runtime.major,
                date: runtime.discontinue_date.unwrap_or_default(),
            }),
            None => Err(PackError::UnsupportedRange { selector: selector.to_string() }),
        }
    }
}

/// The stock Node.js support matrix used by the surrounding build pipeline.
pub fn node_matrix() -> RuntimeMatrix {
    let runtimes = vec![
        SupportedRuntime {
            major: 10,
            range: "10.x".to_string(),
            runtime: "nodejs10.x".to_string(),
            discontinue_date: None,
        },
        SupportedRuntime {
            major: 8,
            range: "8.10.x".to_string(),
            runtime: "nodejs8.10".to_string(),
            discontinue_date: None,
        },
        SupportedRuntime {
            major: 6,
            range: "6.x".to_string(),
            runtime: "nodejs6.10".to_string(),
            discontinue_date: NaiveDate::from_ymd_opt(2019, 8, 1),
        },
    ];
    // The stock table is known-good; a parse failure here is a bug.
    RuntimeMatrix::new(runtimes).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 15).unwrap()
    }

    fn matrix() -> RuntimeMatrix {
        RuntimeMatrix::with_today(
            vec![
                SupportedRuntime {
                    major: 10,
                    range: "10.x".into(),
                    runtime: "nodejs10.x".into(),
                    discontinue_date: None,
                },
                SupportedRuntime {
                    major: 8,
                    range: "8.10.x".into(),
                    runtime: "nodejs8.10".into(),
                    discontinue_date: None,
                },
                SupportedRuntime {
                    major: 6,
                    range: "6.x".into(),
                    runtime: "nodejs6.10".into(),
                    discontinue_date: NaiveDate::from_ymd_opt(2019, 8, 1),
                },
            ],
            today(),
        )
        .unwrap()
    }

    #[test]
    fn absent_and_empty_selectors_yield_the_default() {
        let m = matrix();
        assert_eq!(m.resolve_at(None, today()).unwrap().major, 10);
        assert_eq!(m.resolve_at(Some(""), today()).unwrap().major, 10);
        assert_eq!(m.resolve_at(Some("   "), today()).unwrap().major, 10);
        assert_eq!(m.default_selection().major, 10);
    }

    #[test]
    fn only_supported_versions_match() {
        let m = matrix();
        assert_eq!(m.resolve_at(Some("10.x"), today()).unwrap().major, 10);
        assert_eq!(m.resolve_at(Some("8.10.x"), today()).unwrap().major, 8);
        assert!(matches!(
            m.resolve_at(Some("8.11.x"), today()),
            Err(PackError::UnsupportedRange { .. })
        ));
        assert!(matches!(
            m.resolve_at(Some("6.x"), today()),
            Err(PackError::Discontinued { major: 6, .. })
        ));
        assert!(matches!(
            m.resolve_at(Some("999.x"), today()),
            Err(PackError::UnsupportedRange { .. })
        ));
        assert!(matches!(
            m.resolve_at(Some("foo"), today()),
            Err(PackError::InvalidRange { .. })
        ));
    }

    #[test]
    fn all_semver_range_forms_resolve() {
        let m = matrix();
        for selector in [
            "10.0.0",
            "10.x",
            ">=10",
            ">=10.3.0",
            "8.5.0 - 10.5.0",
            ">=9.0.0",
            ">=9.5.0 <=10.5.0",
            "~10.5.0",
            "^10.5.0",
        ] {
            assert_eq!(
                m.resolve_at(Some(selector), today()).unwrap().major,
                10,
                "selector {:?}",
                selector
            );
        }
    }

    #[test]
    fn newest_eligible_major_wins() {
        let m = matrix();
        assert_eq!(m.resolve_at(Some(">=8"), today()).unwrap().major, 10);
        assert_eq!(m.resolve_at(Some(">=6"), today()).unwrap().major, 10);
    }

    #[test]
    fn discontinued_entries_are_skipped_not_fatal() {
        // A selector satisfiable by both a discontinued and a live entry
        // resolves to the live one.
        let m = matrix();
        assert_eq!(m.resolve_at(Some(">=6.0.0"), today()).unwrap().major, 10);
        assert_eq!(m.resolve_at(Some("6.0.0 - 10.5.0"), today()).unwrap().major, 10);
    }

    #[test]
    fn before_discontinue_date_old_majors_still_resolve() {
        let m = matrix();
        let early = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(m.resolve_at(Some("6.x"), early).unwrap().major, 6);
    }

    #[test]
    fn matrix_loads_from_json_configuration() {
        let json = r#"[
            { "major": 12, "range": "12.x", "runtime": "nodejs12.x" },
            { "major": 10, "range": "10.x", "runtime": "nodejs10.x",
              "discontinue_date": "2021-07-30" }
        ]"#;
        let m = RuntimeMatrix::from_json(json).unwrap();
        assert_eq!(m.entries().count(), 2);
        assert_eq!(m.resolve(Some("12.x")).unwrap().runtime, "nodejs12.x");
    }

    #[test]
    fn bad_range_label_is_a_construction_error() {
        let result = RuntimeMatrix::new(vec![SupportedRuntime {
            major: 1,
            range: "not a range".into(),
            runtime: "bogus1".into(),
            discontinue_date: None,
        }]);
        assert!(matches!(result, Err(PackError::InvalidRange { .. })));
    }
}
