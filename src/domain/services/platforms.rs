#[cfg(test)]
#[path = "platforms_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::Platform;
use crate::domain::models::ScrapedSolution;

static LEETCODE_KEY: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"/problems/([^/?#]+)").unwrap());
static HACKERRANK_KEY: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"/challenges/([^/?#]+)").unwrap());
static CODEFORCES_KEYS: Lazy<Vec<Regex>> = Lazy::new(|| {
    return [
        r"/problemset/problem/(\d+)/([^/?#]+)",
        r"/contest/(\d+)/problem/([^/?#]+)",
        r"/gym/(\d+)/problem/([^/?#]+)",
        r"/problem/(\d+)/([^/?#]+)",
    ]
    .iter()
    .map(|e| return Regex::new(e).unwrap())
    .collect();
});

const HACKERRANK_LANGUAGES: &[(&str, &str)] = &[
    ("python3", "python3"),
    ("python", "python3"),
    ("pypy3", "python3"),
    ("pypy", "python3"),
    ("java", "java"),
    ("java 8", "java"),
    ("java 15", "java"),
    ("javascript", "javascript"),
    ("c++", "cpp"),
    ("c++14", "cpp"),
    ("c++17", "cpp"),
    ("c", "c"),
    ("ruby", "ruby"),
    ("kotlin", "kotlin"),
    ("scala", "scala"),
    ("swift", "swift"),
    ("typescript", "typescript"),
    ("go", "go"),
    ("rust", "rust"),
];

/// Problem identifier the backend tracks a solution under. Empty when the
/// URL is not a problem page.
pub fn question_key(platform: Platform, url: &str) -> String {
    let captures = match platform {
        Platform::LeetCode => LEETCODE_KEY.captures(url),
        Platform::HackerRank => HACKERRANK_KEY.captures(url),
        Platform::Codeforces => CODEFORCES_KEYS.iter().find_map(|e| return e.captures(url)),
    };

    let captures = match captures {
        Some(captures) => captures,
        None => return "".to_string(),
    };

    return captures
        .iter()
        .skip(1)
        .flatten()
        .map(|e| return e.as_str())
        .collect::<Vec<&str>>()
        .join("");
}

/// Maps an editor language label onto the name the backend files solutions
/// under.
pub fn normalize_language(platform: Platform, label: &str) -> String {
    let value = label.trim().to_lowercase();

    return match platform {
        Platform::LeetCode => leetcode_language(&value).to_string(),
        Platform::HackerRank => hackerrank_language(&value),
        Platform::Codeforces => codeforces_language(&value).to_string(),
    };
}

fn leetcode_language(value: &str) -> &'static str {
    if value.contains("python") {
        return "python";
    }
    if value.contains("c++") || value.contains("cpp") {
        return "cpp";
    }
    if value.contains("javascript") {
        return "javascript";
    }
    if value.contains("typescript") {
        return "typescript";
    }
    if value.contains("java") {
        return "java";
    }

    return "python";
}

fn codeforces_language(value: &str) -> &'static str {
    if value.contains("c++") {
        return "cpp";
    }
    if value.contains("python") {
        return "python";
    }
    if value.contains("javascript") {
        return "javascript";
    }
    if value.contains("java") {
        return "java";
    }

    return "cpp";
}

fn hackerrank_language(value: &str) -> String {
    if value.is_empty() {
        return "python3".to_string();
    }

    if let Some((_, name)) = HACKERRANK_LANGUAGES.iter().find(|(key, _)| return *key == value) {
        return name.to_string();
    }

    // "javascript" contains "java" and "scala" contains "c", so the longest
    // matching label wins.
    return HACKERRANK_LANGUAGES
        .iter()
        .filter(|(key, _)| return value.contains(key))
        .max_by_key(|(key, _)| return key.len())
        .map(|(_, name)| return name.to_string())
        .unwrap_or_else(|| return value.to_string());
}

/// Page title without the site suffix, falling back to the question key.
pub fn title_or_key(title: &str, question_key: &str) -> String {
    let title = title.trim_end().trim_end_matches(" - LeetCode").trim();
    if title.is_empty() {
        return question_key.to_string();
    }

    return title.to_string();
}

/// Assembles what a site integration would scrape from a problem page.
pub fn scrape(
    platform: Platform,
    question_url: &str,
    code: &str,
    language_label: &str,
    title: &str,
    accepted: bool,
) -> ScrapedSolution {
    let question_key = question_key(platform, question_url);

    return ScrapedSolution {
        question_url: question_url.to_string(),
        title: title_or_key(title, &question_key),
        question_key,
        code: code.to_string(),
        language: normalize_language(platform, language_label),
        accepted,
    };
}
