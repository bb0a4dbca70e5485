use nom::{
	bytes::complete::{
		take_till1,
		take_while
	},
	combinator::{
		all_consuming,
		opt
	},
	error::ParseError,
	IResult,
	number::complete::float,
	sequence::preceded,
};

/// Skips whitespace, including the Unicode separators that end a token
pub fn ws<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
	E: ParseError<&'a str>
{
	take_while(char::is_whitespace)(input)
}

/// Parses a single whitespace-delimited token, skipping any leading whitespace
pub fn token<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
	E: ParseError<&'a str>
{
	preceded(ws, take_till1(char::is_whitespace))(input)
}

/// Parses the next token if it sits on the current line. A line break ahead yields `None` and
/// consumes nothing past the spaces before it.
pub fn inline_token<'a, E>(input: &'a str) -> IResult<&'a str, Option<&'a str>, E>
where
	E: ParseError<&'a str>
{
	preceded(
		take_while(|c: char| c.is_whitespace() && c != '\n' && c != '\r'),
		opt(take_till1(char::is_whitespace))
	)(input)
}

/// Interprets a whole token as a float, failing if any part of it is left over
pub fn float_token(tok: &str) -> Option<f32> {
	let res: IResult<&str, f32> = all_consuming(float)(tok);

	res.ok().map(|(_, f)| f)
}

#[cfg(test)]
mod tests {
	use nom::error::Error;

	#[test]
	fn test_token() {
		assert_eq!(super::token::<'_, Error<&str>>("  \n\tfacet normal"), Ok((" normal", "facet")));
		assert!(super::token::<'_, Error<&str>>(" \r\n ").is_err());
	}

	#[test]
	fn test_token_separators() {
		assert_eq!(super::token::<'_, Error<&str>>("\x0c\x0bvertex\x0c1"), Ok(("\x0c1", "vertex")));
		assert_eq!(super::token::<'_, Error<&str>>("\u{a0}\u{85}1\u{a0}2"), Ok(("\u{a0}2", "1")));
	}

	#[test]
	fn test_inline_token() {
		assert_eq!(super::inline_token::<'_, Error<&str>>(" cube part\r\nfacet"), Ok((" part\r\nfacet", Some("cube"))));
		assert_eq!(super::inline_token::<'_, Error<&str>>(" \t\r\nfacet"), Ok(("\r\nfacet", None)));
		assert_eq!(super::inline_token::<'_, Error<&str>>("\nfacet"), Ok(("\nfacet", None)));
		assert_eq!(super::inline_token::<'_, Error<&str>>(""), Ok(("", None)));
	}

	#[test]
	fn test_float_token() {
		assert_eq!(super::float_token("-1.5e2"), Some(-150.0));
		assert_eq!(super::float_token("0"), Some(0.0));
		assert_eq!(super::float_token("1.0x"), None);
		assert_eq!(super::float_token("vertex"), None);
	}
}
