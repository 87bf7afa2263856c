use super::*;

// Each test uses its own variable names; the process environment is shared
// between test threads.

#[test]
fn env_parse_falls_back_when_unset() {
    assert_eq!(env_parse("DRAW_TEST_UNSET_KEY", 42_usize), 42);
}

#[test]
fn env_parse_reads_and_trims_value() {
    // SAFETY: no other test touches this key.
    unsafe { std::env::set_var("DRAW_TEST_PARSE_OK", " 17 ") };
    assert_eq!(env_parse("DRAW_TEST_PARSE_OK", 0_u16), 17);
}

#[test]
fn env_parse_falls_back_on_garbage() {
    // SAFETY: no other test touches this key.
    unsafe { std::env::set_var("DRAW_TEST_PARSE_BAD", "lots") };
    assert_eq!(env_parse("DRAW_TEST_PARSE_BAD", 8_u64), 8);
}

#[test]
fn non_empty_var_treats_blank_as_missing() {
    // SAFETY: no other test touches this key.
    unsafe { std::env::set_var("DRAW_TEST_BLANK", "   ") };
    assert!(non_empty_var("DRAW_TEST_BLANK").is_none());
}
