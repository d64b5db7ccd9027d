use regex::Regex;
use url::Url;

use crate::core::models::PullRequestReference;

const CODE_HOST: &str = "github.com";

/// Extract pull request references from free-form message text.
///
/// Two shapes are recognised:
/// - full URLs like `https://github.com/acme/widget/pull/42`, which yield a
///   fully-populated reference
/// - bare numbers like `#42`, `PR-42` or `pr 42`, which yield the number only
///
/// URL references come first in text order, then bare references. A bare
/// reference is dropped when an earlier reference already has its number.
/// URL references are never deduplicated against each other.
/// Malformed candidates are skipped.
#[must_use]
pub fn extract_references(text: &str) -> Vec<PullRequestReference> {
    // Slack wraps links as <https://github.com/o/r/pull/1|label>; the
    // character classes below stop at `|` and `>` so both forms work.
    static PR_URL_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"https?://(?i:github\.com)/([^\s/<>|]+)/([^\s/<>|]+)/pull/([0-9]+)")
            .unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
    });

    static PR_NUMBER_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"(?:#|\b(?i:pr)-?)\s*([0-9]+)")
            .unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
    });

    let mut references: Vec<PullRequestReference> = Vec::new();

    for caps in PR_URL_RE.captures_iter(text) {
        let (Some(full), Some(owner), Some(repo), Some(number)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let Some(number) = parse_number(number.as_str()) else {
            continue;
        };
        if !is_code_host_url(full.as_str()) {
            continue;
        }

        references.push(PullRequestReference {
            owner: Some(owner.as_str().to_string()),
            repository: Some(repo.as_str().to_string()),
            number,
            url: Some(full.as_str().to_string()),
        });
    }

    for caps in PR_NUMBER_RE.captures_iter(text) {
        let Some(number) = caps.get(1).and_then(|m| parse_number(m.as_str())) else {
            continue;
        };
        if references.iter().any(|existing| existing.number == number) {
            continue;
        }
        references.push(PullRequestReference::bare(number));
    }

    references
}

fn parse_number(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Only secure links on the code host itself count as references.
fn is_code_host_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    url.scheme() == "https"
        && url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(CODE_HOST))
}
