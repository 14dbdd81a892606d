//! Property tests for credential redaction: no input may ever leak the key.

use comet::redact::{redact, REDACTION_MARKER};
use proptest::prelude::*;

proptest! {
    #[test]
    fn output_never_contains_the_key(text in ".{0,64}", key in ".{1,32}") {
        let embedded = format!("{text}{key}{text}{key}{text}");
        prop_assert!(!redact(&embedded, &key).contains(&key));
        prop_assert!(!redact(&text, &key).contains(&key));
        prop_assert!(!redact(&key, &key).contains(&key));
    }

    #[test]
    fn realistic_keys_are_replaced_by_the_marker(
        key in "[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}"
    ) {
        let url = format!("https://constelia.ai/api.php?key={key}&cmd=getMember&scripts=");
        let out = redact(&url, &key);
        prop_assert!(!out.contains(&key));
        prop_assert!(out.contains(REDACTION_MARKER));
        prop_assert!(out.contains("cmd=getMember"), "non-secret content survives");
    }

    #[test]
    fn text_without_the_key_is_untouched(text in "[a-z ]{0,64}") {
        let out = redact(&text, "KEY-THAT-DOES-NOT-APPEAR");
        prop_assert_eq!(out, text);
    }
}
