use super::normalize_language;
use super::question_key;
use super::scrape;
use super::title_or_key;
use crate::domain::models::Platform;

#[test]
fn it_reads_leetcode_slug() {
    assert_eq!(
        question_key(
            Platform::LeetCode,
            "https://leetcode.com/problems/two-sum/description/?envType=daily"
        ),
        "two-sum"
    );
    assert_eq!(question_key(Platform::LeetCode, "https://leetcode.com/contest/"), "");
}

#[test]
fn it_reads_hackerrank_slug() {
    assert_eq!(
        question_key(
            Platform::HackerRank,
            "https://www.hackerrank.com/challenges/simple-array-sum/problem?isFullScreen=true"
        ),
        "simple-array-sum"
    );
    assert_eq!(
        question_key(Platform::HackerRank, "https://www.hackerrank.com/dashboard"),
        ""
    );
}

#[test]
fn it_reads_codeforces_keys() {
    let cases = [
        ("https://codeforces.com/problemset/problem/1520/A", "1520A"),
        ("https://codeforces.com/contest/1899/problem/B2", "1899B2"),
        ("https://codeforces.com/gym/104114/problem/C", "104114C"),
        ("/problem/4/A", "4A"),
        ("https://codeforces.com/blog/entry/1", ""),
    ];

    for (url, key) in cases {
        assert_eq!(question_key(Platform::Codeforces, url), key, "{url}");
    }
}

#[test]
fn it_normalizes_leetcode_languages() {
    assert_eq!(normalize_language(Platform::LeetCode, "Python3"), "python");
    assert_eq!(normalize_language(Platform::LeetCode, "C++"), "cpp");
    assert_eq!(normalize_language(Platform::LeetCode, "JavaScript"), "javascript");
    assert_eq!(normalize_language(Platform::LeetCode, "TypeScript"), "typescript");
    assert_eq!(normalize_language(Platform::LeetCode, "Java"), "java");
    assert_eq!(normalize_language(Platform::LeetCode, "Elixir"), "python");
}

#[test]
fn it_normalizes_codeforces_languages() {
    assert_eq!(normalize_language(Platform::Codeforces, "GNU G++20 11.2.0 (64 bit, winlibs)"), "cpp");
    assert_eq!(normalize_language(Platform::Codeforces, "GNU C++17 7.3.0"), "cpp");
    assert_eq!(normalize_language(Platform::Codeforces, "PyPy 3.10 (7.3.15, 64bit)"), "cpp");
    assert_eq!(normalize_language(Platform::Codeforces, "Python 3.8.10"), "python");
    assert_eq!(normalize_language(Platform::Codeforces, "Java 21 64bit"), "java");
    assert_eq!(normalize_language(Platform::Codeforces, ""), "cpp");
}

#[test]
fn it_normalizes_hackerrank_languages() {
    let cases = [
        ("Python 3", "python3"),
        ("PyPy3", "python3"),
        ("Java 15", "java"),
        ("JavaScript (Node.js)", "javascript"),
        ("C++20", "cpp"),
        ("Scala", "scala"),
        ("C", "c"),
        ("Go", "go"),
        ("Haskell", "haskell"),
        ("", "python3"),
    ];

    for (label, language) in cases {
        assert_eq!(normalize_language(Platform::HackerRank, label), language, "{label}");
    }
}

#[test]
fn it_strips_site_suffix_from_title() {
    assert_eq!(title_or_key("Two Sum - LeetCode", "two-sum"), "Two Sum");
    assert_eq!(title_or_key("  ", "two-sum"), "two-sum");
    assert_eq!(title_or_key(" - LeetCode", "two-sum"), "two-sum");
}

#[test]
fn it_scrapes_solution() {
    let solution = scrape(
        Platform::LeetCode,
        "https://leetcode.com/problems/two-sum/",
        test_utils::solution_fixture(),
        "Python3",
        "",
        true,
    );

    assert_eq!(solution.question_key, "two-sum");
    assert_eq!(solution.title, "two-sum");
    assert_eq!(solution.language, "python");
    assert!(solution.accepted);
}
