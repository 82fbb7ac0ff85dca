//! 归一化与精确匹配的性质测试。

use duihua_backend_rust::services::evaluator::{check_exact_match, normalize};
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalize_is_idempotent(s in ".*") {
        let once = normalize(&s);
        let twice = normalize(&once);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn normalize_output_is_trimmed(s in ".*") {
        let out = normalize(&s);
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn normalize_never_ends_with_terminal_punctuation(s in ".*") {
        let out = normalize(&s);
        prop_assert!(!out.ends_with(['.', '!', '?']));
    }

    #[test]
    fn normalize_lowercases_ascii(s in "[A-Za-z ]{0,40}") {
        let out = normalize(&s);
        prop_assert!(!out.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn exact_match_ignores_case_whitespace_and_trailing_punctuation(
        s in "[a-z]{1,10}( [a-z]{1,10}){0,3}"
    ) {
        let accepted = vec![s.clone()];
        let noisy = format!("  {}! ", s.to_uppercase());
        prop_assert!(check_exact_match(&noisy, &accepted));
    }
}
