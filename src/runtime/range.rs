//! Version-range parsing and the interval overlap model.
//!
//! Selector strings follow the npm `engines` dialect: exact versions
//! (`10.0.0`), `x`-wildcards (`10.x`), comparators ANDed by whitespace
//! (`>=9.5.0 <=10.5.0`), hyphen ranges (`8.5.0 - 10.5.0`), tilde (`~10.5.0`)
//! and caret (`^10.5.0`). The expression is normalized into a form
//! `semver::VersionReq` accepts, then lowered to one closed interval over
//! version space. Two ranges are considered to match when their intervals
//! overlap, which is how a selector is tested against a support-matrix
//! entry's own range label.
//!
//! One deviation from `semver`'s Cargo semantics matters here: a bare
//! version means *exact* (`10.0.0` ⇒ `=10.0.0`), not caret.

use semver::{Comparator, Op, Version, VersionReq};

/// A closed interval over versions. `None` bounds are unbounded.
/// The `bool` is inclusivity at that endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VersionInterval {
    lo: Option<(Version, bool)>,
    hi: Option<(Version, bool)>,
}

impl VersionInterval {
    fn unbounded() -> Self {
        Self { lo: None, hi: None }
    }

    /// True if at least one version lies in both intervals.
    pub(crate) fn overlaps(&self, other: &VersionInterval) -> bool {
        let lo = tighter_lo(&self.lo, &other.lo);
        let hi = tighter_hi(&self.hi, &other.hi);
        nonempty(&lo, &hi)
    }
}

/// Parse a selector expression into its interval. `Err` carries no detail;
/// the caller owns the user-facing `InvalidRange` payload.
pub(crate) fn parse_interval(selector: &str) -> Result<VersionInterval, ()> {
    let normalized = normalize(selector)?;
    let req = VersionReq::parse(&normalized).map_err(|_| ())?;

    let mut interval = VersionInterval::unbounded();
    for comparator in &req.comparators {
        let piece = comparator_interval(comparator)?;
        interval.lo = tighter_lo(&interval.lo, &piece.lo);
        interval.hi = tighter_hi(&interval.hi, &piece.hi);
    }
    if !nonempty(&interval.lo, &interval.hi) {
        // Contradictory comparator sets (e.g. ">=10 <9") match nothing;
        // modeled as an empty interval rather than a parse error.
        return Ok(VersionInterval {
            lo: Some((Version::new(0, 0, 1), true)),
            hi: Some((Version::new(0, 0, 0), true)),
        });
    }
    Ok(interval)
}

/// Rewrite the npm-style expression into `semver::VersionReq` syntax.
fn normalize(selector: &str) -> Result<String, ()> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(());
    }

    // Hyphen range: "a - b" becomes ">=a, <=b".
    if let Some((lo, hi)) = trimmed.split_once(" - ") {
        let lo = lo.trim();
        let hi = hi.trim();
        if lo.is_empty() || hi.is_empty() || lo.contains(' ') || hi.contains(' ') {
            return Err(());
        }
        return Ok(format!(">={}, <={}", lo, hi));
    }

    // Whitespace between comparators means logical AND.
    let tokens: Vec<String> = trimmed
        .split_whitespace()
        .map(|token| {
            // A bare version is an exact requirement, not semver's default caret.
            // Wildcard tokens ("10.x") keep their own syntax.
            let is_bare = token.chars().next().is_some_and(|c| c.is_ascii_digit());
            let has_wildcard = token.contains(['x', 'X', '*']);
            if is_bare && !has_wildcard {
                format!("={}", token)
            } else {
                token.to_string()
            }
        })
        .collect();
    Ok(tokens.join(", "))
}

/// Lower one comparator to its interval.
fn comparator_interval(c: &Comparator) -> Result<VersionInterval, ()> {
    let major = c.major;
    let floor = Version::new(major, c.minor.unwrap_or(0), c.patch.unwrap_or(0));
    let next_major = Version::new(major + 1, 0, 0);
    let next_minor = c.minor.map(|m| Version::new(major, m + 1, 0));

    let interval = match c.op {
        Op::Wildcard => match (c.minor, next_minor) {
            (Some(_), Some(up)) => bounded(floor, true, up, false),
            _ => bounded(floor, true, next_major, false),
        },
        Op::Exact => match (c.minor, c.patch, next_minor) {
            (Some(_), Some(_), _) => bounded(floor.clone(), true, floor, true),
            (Some(_), None, Some(up)) => bounded(floor, true, up, false),
            _ => bounded(floor, true, next_major, false),
        },
        Op::GreaterEq => VersionInterval { lo: Some((floor, true)), hi: None },
        Op::Greater => match (c.minor, c.patch, next_minor) {
            (Some(_), Some(_), _) => VersionInterval { lo: Some((floor, false)), hi: None },
            (Some(_), None, Some(up)) => VersionInterval { lo: Some((up, true)), hi: None },
            _ => VersionInterval { lo: Some((next_major, true)), hi: None },
        },
        Op::Less => VersionInterval { lo: None, hi: Some((floor, false)) },
        Op::LessEq => match (c.minor, c.patch, next_minor) {
            (Some(_), Some(_), _) => VersionInterval { lo: None, hi: Some((floor, true)) },
            (Some(_), None, Some(up)) => VersionInterval { lo: None, hi: Some((up, false)) },
            _ => VersionInterval { lo: None, hi: Some((next_major, false)) },
        },
        Op::Tilde => match next_minor {
            Some(up) => bounded(floor, true, up, false),
            None => bounded(floor, true, next_major, false),
        },
        Op::Caret => {
            let hi = if major > 0 {
                next_major
            } else {
                match (c.minor, c.patch) {
                    (Some(0), Some(p)) => Version::new(0, 0, p + 1),
                    (Some(m), _) => Version::new(0, m + 1, 0),
                    (None, _) => Version::new(1, 0, 0),
                }
            };
            bounded(floor, true, hi, false)
        }
        _ => return Err(()),
    };
    Ok(interval)
}

fn bounded(lo: Version, lo_incl: bool, hi: Version, hi_incl: bool) -> VersionInterval {
    VersionInterval { lo: Some((lo, lo_incl)), hi: Some((hi, hi_incl)) }
}

fn tighter_lo(a: &Option<(Version, bool)>, b: &Option<(Version, bool)>) -> Option<(Version, bool)> {
    match (a, b) {
        (None, other) | (other, None) => other.clone(),
        (Some((va, ia)), Some((vb, ib))) => {
            if va > vb || (va == vb && !ia) {
                Some((va.clone(), *ia))
            } else {
                Some((vb.clone(), *ib))
            }
        }
    }
}

fn tighter_hi(a: &Option<(Version, bool)>, b: &Option<(Version, bool)>) -> Option<(Version, bool)> {
    match (a, b) {
        (None, other) | (other, None) => other.clone(),
        (Some((va, ia)), Some((vb, ib))) => {
            if va < vb || (va == vb && !ia) {
                Some((va.clone(), *ia))
            } else {
                Some((vb.clone(), *ib))
            }
        }
    }
}

fn nonempty(lo: &Option<(Version, bool)>, hi: &Option<(Version, bool)>) -> bool {
    match (lo, hi) {
        (Some((vl, il)), Some((vh, ih))) => vl < vh || (vl == vh && *il && *ih),
        _ => true,
    }
}
