#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(src: &str) -> Vec<TokenKind> {
		Lexer::new(src)
			.lex()
			.unwrap()
			.into_iter()
			.map(|t| t.kind)
			.collect()
	}

	#[test]
	fn lex_keywords_and_identifiers() {
		assert_eq!(
			kinds("theorem Foo auto left"),
			vec![
				TokenKind::KwTheorem,
				TokenKind::Ident("Foo".to_string()),
				TokenKind::KwAuto,
				TokenKind::Ident("left".to_string()),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_prefers_longest_operator() {
		assert_eq!(
			kinds("... . := : == = -> -"),
			vec![
				TokenKind::Ellipsis,
				TokenKind::Dot,
				TokenKind::ColonEq,
				TokenKind::Colon,
				TokenKind::EqEq,
				TokenKind::Eq,
				TokenKind::Arrow,
				TokenKind::Minus,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_skips_comments() {
		let src = "x // trailing\n/* block\n * comment */ y";
		assert_eq!(
			kinds(src),
			vec![
				TokenKind::Ident("x".to_string()),
				TokenKind::Ident("y".to_string()),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_spans_are_byte_offsets() {
		let tokens = Lexer::new("ab  cd").lex().unwrap();
		assert_eq!(tokens[1].span.offset(), 4);
		assert_eq!(tokens[1].span.len(), 2);
	}

	#[test]
	fn lex_rejects_oversized_int() {
		let err = Lexer::new("99999999999999999999999").lex().unwrap_err();
		assert!(err.message.contains("invalid integer literal"));
	}

	#[test]
	fn lex_rejects_unknown_character() {
		let err = Lexer::new("x $ y").lex().unwrap_err();
		assert!(err.message.contains("unexpected character"), "{}", err.message);
	}
}
