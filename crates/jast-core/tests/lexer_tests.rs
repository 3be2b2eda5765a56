use jast_core::{lex, LexErrorKind, LexerTask, Position, Token, TokenKind};

fn tokens(input: &str) -> Vec<Token> {
    lex(input).collect()
}

fn kinds_and_positions(input: &str) -> Vec<(TokenKind, usize, usize)> {
    lex(input)
        .map(|t| (t.kind, t.position.row, t.position.col))
        .collect()
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn positions_on_a_single_line() {
    assert_eq!(
        kinds_and_positions(r#"{"a": null}"#),
        vec![
            (TokenKind::ObjectOpen, 0, 0),
            (TokenKind::String, 0, 1),
            (TokenKind::Colon, 0, 4),
            (TokenKind::Null, 0, 6),
            (TokenKind::ObjectClose, 0, 10),
        ]
    );
}

#[test]
fn positions_of_empty_containers() {
    assert_eq!(
        kinds_and_positions(r#"{"a":{},"b":[]}"#),
        vec![
            (TokenKind::ObjectOpen, 0, 0),
            (TokenKind::String, 0, 1),
            (TokenKind::Colon, 0, 4),
            (TokenKind::ObjectOpen, 0, 5),
            (TokenKind::ObjectClose, 0, 6),
            (TokenKind::Comma, 0, 7),
            (TokenKind::String, 0, 8),
            (TokenKind::Colon, 0, 11),
            (TokenKind::ArrayOpen, 0, 12),
            (TokenKind::ArrayClose, 0, 13),
            (TokenKind::ObjectClose, 0, 14),
        ]
    );
}

#[test]
fn rows_advance_on_line_feed() {
    assert_eq!(
        kinds_and_positions("[\n  1,\n  true\n]"),
        vec![
            (TokenKind::ArrayOpen, 0, 0),
            (TokenKind::Number, 1, 2),
            (TokenKind::Comma, 1, 3),
            (TokenKind::True, 2, 2),
            (TokenKind::ArrayClose, 3, 0),
        ]
    );
}

#[test]
fn carriage_return_resets_the_column() {
    let toks = tokens("[1,\r\n2]");
    assert_eq!(toks[3].kind, TokenKind::Number);
    assert_eq!(toks[3].position, Position::new(1, 0));
}

// ============================================================================
// Token payloads
// ============================================================================

#[test]
fn literals_and_numbers() {
    let toks = tokens("[null, true, false, -31.2, 5e3]");
    let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::ArrayOpen,
            TokenKind::Null,
            TokenKind::Comma,
            TokenKind::True,
            TokenKind::Comma,
            TokenKind::False,
            TokenKind::Comma,
            TokenKind::Number,
            TokenKind::Comma,
            TokenKind::Number,
            TokenKind::ArrayClose,
        ]
    );
    assert_eq!(toks[7].text, "-31.2");
    assert_eq!(toks[9].text, "5e3");
}

#[test]
fn string_escapes_are_decoded() {
    let toks = tokens(r#""a\"b\\c\/d\b\f\n\r\t""#);
    assert_eq!(toks.len(), 1);
    assert_eq!(toks[0].text, "a\"b\\c/d\u{08}\u{0C}\n\r\t");
}

#[test]
fn unicode_escape() {
    let toks = tokens(r#""ab\u0063""#);
    assert_eq!(toks[0].kind, TokenKind::String);
    assert_eq!(toks[0].text, "abc");
}

#[test]
fn surrogate_pair_escape() {
    let toks = tokens(r#""\ud83d\ude00""#);
    assert_eq!(toks[0].text, "\u{1F600}");
}

#[test]
fn raw_multibyte_text_passes_through() {
    let toks = tokens(r#""café ✓""#);
    assert_eq!(toks[0].text, "café ✓");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unknown_literal_spans_the_run() {
    let toks = tokens(r#"{"a": nul}"#);
    let last = toks.last().unwrap();
    assert_eq!(last.kind, TokenKind::Error(LexErrorKind::UnknownLiteral));
    assert_eq!(last.text, "nul");
    assert_eq!(last.position, Position::new(0, 6));
}

#[test]
fn unterminated_string_keeps_partial_buffer() {
    let toks = tokens(r#"{"a": "\"}"#);
    assert_eq!(toks.len(), 4);
    let last = &toks[3];
    assert_eq!(last.kind, TokenKind::Error(LexErrorKind::UnterminatedString));
    assert_eq!(last.text, r#""\"}"#);
    assert_eq!(last.position, Position::new(0, 6));
}

#[test]
fn stray_character_is_an_error_token() {
    let toks = tokens(r#"{"a". false}"#);
    let last = toks.last().unwrap();
    assert_eq!(last.kind, TokenKind::Error(LexErrorKind::UnknownLiteral));
    assert_eq!(last.text, ".");
    assert_eq!(last.position, Position::new(0, 4));
}

#[test]
fn error_on_a_later_row() {
    let toks = tokens("{\"very_long\"\n <garbage>}");
    let last = toks.last().unwrap();
    assert!(last.is_error());
    assert_eq!(last.text, "<garbage>");
    assert_eq!(last.position, Position::new(1, 1));
}

#[test]
fn invalid_escapes() {
    for input in [r#""\x""#, r#""\u12g4""#, r#""\udc00""#, r#""\ud83dx""#] {
        let toks = tokens(input);
        assert_eq!(toks.len(), 1, "{input}");
        assert_eq!(
            toks[0].kind,
            TokenKind::Error(LexErrorKind::InvalidEscape),
            "{input}"
        );
    }
}

#[test]
fn stream_ends_after_the_error_token() {
    let toks = tokens("[1, @@, 2, 3]");
    assert!(toks.last().unwrap().is_error());
    assert_eq!(toks.len(), 4);
}

// ============================================================================
// Threaded producer
// ============================================================================

#[test]
fn threaded_lexer_matches_synchronous_lexer() {
    let input = include_str!("fixtures/web_app.json");
    let sync: Vec<Token> = lex(input).collect();
    let threaded: Vec<Token> = LexerTask::spawn(input.to_string()).unwrap().collect();
    assert_eq!(sync, threaded);
}

#[test]
fn threaded_lexer_stops_after_an_error() {
    let threaded: Vec<Token> = LexerTask::spawn("[1, nope, 2]".to_string())
        .unwrap()
        .collect();
    assert_eq!(threaded.len(), 4);
    assert!(threaded[3].is_error());
}

// ============================================================================
// Display
// ============================================================================

#[test]
fn token_display_forms() {
    let toks = tokens(r#"[null, 5, "a", {}]"#);
    let shown: Vec<String> = toks.iter().map(|t| t.to_string()).collect();
    assert_eq!(
        shown,
        vec!["<[>", "<null>", "<,>", "<num 5>", "<,>", "<str \"a\">", "<,>", "<{>", "<}>", "<]>"]
    );
}
