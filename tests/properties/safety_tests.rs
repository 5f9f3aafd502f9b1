//! Property-based tests for safety - ensuring parsers and decoders never panic.

use proptest::prelude::*;

use invsearch::config::Config;
use invsearch::search::expand::{parse_or_expression, tokenize};
use invsearch::storage::sqlite::{decode_embedding, encode_embedding};

proptest! {
    #[test]
    fn or_expression_parser_never_panics(input in ".{0,80}") {
        let _ = parse_or_expression(&input);
    }

    #[test]
    fn tokenize_yields_non_empty_words(input in ".{0,80}") {
        for word in tokenize(&input) {
            prop_assert!(!word.is_empty());
            prop_assert!(!word.chars().any(char::is_whitespace));
        }
    }

    #[test]
    fn config_parser_never_panics(input in ".{0,120}") {
        let _ = Config::from_toml_str(&input);
    }

    #[test]
    fn embedding_blob_decodes_only_whole_floats(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let decoded = decode_embedding(&bytes);
        prop_assert_eq!(decoded.is_ok(), bytes.len() % 4 == 0);
    }

    #[test]
    fn embedding_blob_preserves_values(values in prop::collection::vec(-1.0f32..1.0, 0..32)) {
        let decoded = decode_embedding(&encode_embedding(&values)).unwrap();
        prop_assert_eq!(decoded, values);
    }
}
