use tally_core::urls_in_line;

#[test]
fn splits_on_whitespace_and_skips_blank_lines() {
    let urls: Vec<_> = urls_in_line("  https://a.example.com\thttps://b.example.com ").collect();
    assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);

    assert_eq!(urls_in_line("   ").count(), 0);
    assert_eq!(urls_in_line("").count(), 0);
}

#[test]
fn malformed_tokens_are_passed_through() {
    let urls: Vec<_> = urls_in_line("not-a-url").collect();
    assert_eq!(urls, vec!["not-a-url"]);
}
