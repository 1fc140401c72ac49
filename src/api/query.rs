//! Assembles X search query strings from structured options.

// self
use crate::_prelude::*;

/// Longest query the recent search endpoint accepts.
pub const MAX_QUERY_LEN: usize = 512;

/// Reasons a search query cannot be built.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum QueryError {
	/// No clause was produced.
	#[error("Search query cannot be empty; provide at least one search parameter.")]
	Empty,
	/// The query exceeds [`MAX_QUERY_LEN`].
	#[error("Query too long ({len} chars); the maximum is 512 characters.")]
	TooLong {
		/// Query length in characters.
		len: usize,
	},
}

/// Structured search options. Empty lists and `None` values contribute nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvancedSearch {
	/// Terms that must all appear.
	pub keywords: Vec<String>,
	/// Exact phrase.
	pub phrase: Option<String>,
	/// Terms of which at least one must appear.
	pub any: Vec<String>,
	/// Terms that must not appear.
	pub none: Vec<String>,
	/// Hashtags, with or without the leading `#`.
	pub hashtags: Vec<String>,
	/// Authors.
	pub from: Vec<String>,
	/// Reply targets.
	pub to: Vec<String>,
	/// Mentioned accounts.
	pub mentions: Vec<String>,
	/// BCP 47 language tag.
	pub lang: Option<String>,
	/// Require links.
	pub has_links: bool,
	/// Require media.
	pub has_media: bool,
	/// Require images.
	pub has_images: bool,
	/// Require videos.
	pub has_videos: bool,
	/// Require (`true`) or exclude (`false`) retweets.
	pub is_retweet: Option<bool>,
	/// Require or exclude replies.
	pub is_reply: Option<bool>,
	/// Require or exclude quotes.
	pub is_quote: Option<bool>,
	/// Require or exclude verified authors.
	pub is_verified: Option<bool>,
	/// Minimum like count.
	pub min_likes: Option<u32>,
	/// Minimum retweet count.
	pub min_retweets: Option<u32>,
	/// Minimum reply count.
	pub min_replies: Option<u32>,
	/// Lower date bound (`YYYY-MM-DD`).
	pub since: Option<String>,
	/// Upper date bound (`YYYY-MM-DD`).
	pub until: Option<String>,
	/// List id.
	pub list: Option<String>,
	/// Context annotations (`domain.entity`).
	pub context: Vec<String>,
}

/// Validated query string, at most [`MAX_QUERY_LEN`] characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery(String);
impl SearchQuery {
	/// Builds the query clauses in a fixed order and validates the result.
	///
	/// Language, `has:` and `is:` filters are standalone-invalid for X, so they are only added
	/// next to at least one other clause.
	pub fn build(options: &AdvancedSearch) -> Result<Self, QueryError> {
		let mut parts = Vec::new();

		if !options.keywords.is_empty() {
			parts.push(options.keywords.join(" "));
		}
		if let Some(phrase) = non_empty(&options.phrase) {
			parts.push(format!("\"{phrase}\""));
		}
		if !options.any.is_empty() {
			parts.push(format!("({})", options.any.join(" OR ")));
		}

		parts.extend(options.none.iter().map(|word| format!("-{word}")));
		parts.extend(options.hashtags.iter().map(|tag| {
			if tag.starts_with('#') { tag.clone() } else { format!("#{tag}") }
		}));

		match options.from.as_slice() {
			[] => {},
			[user] => parts.push(format!("from:{}", handle(user))),
			users => parts.push(format!(
				"({})",
				users.iter().map(|u| format!("from:{}", handle(u))).collect::<Vec<_>>().join(" OR ")
			)),
		}

		parts.extend(options.to.iter().map(|user| format!("to:{}", handle(user))));
		parts.extend(options.mentions.iter().map(|user| format!("@{}", handle(user))));

		if !parts.is_empty() {
			if let Some(lang) = non_empty(&options.lang) {
				parts.push(format!("lang:{lang}"));
			}

			for (wanted, operator) in [
				(options.has_links, "has:links"),
				(options.has_media, "has:media"),
				(options.has_images, "has:images"),
				(options.has_videos, "has:videos"),
			] {
				if wanted {
					parts.push(operator.into());
				}
			}
			for (flag, operator) in [
				(options.is_retweet, "is:retweet"),
				(options.is_reply, "is:reply"),
				(options.is_quote, "is:quote"),
				(options.is_verified, "is:verified"),
			] {
				match flag {
					Some(true) => parts.push(operator.into()),
					Some(false) => parts.push(format!("-{operator}")),
					None => {},
				}
			}
		}

		for (min, operator) in [
			(options.min_likes, "min_faves"),
			(options.min_retweets, "min_retweets"),
			(options.min_replies, "min_replies"),
		] {
			if let Some(min) = min.filter(|m| *m > 0) {
				parts.push(format!("{operator}:{min}"));
			}
		}
		if let Some(since) = non_empty(&options.since) {
			parts.push(format!("since:{since}"));
		}
		if let Some(until) = non_empty(&options.until) {
			parts.push(format!("until:{until}"));
		}
		if let Some(list) = non_empty(&options.list) {
			parts.push(format!("list:{list}"));
		}

		parts.extend(options.context.iter().map(|ctx| format!("context:{ctx}")));

		Self::parse(&parts.join(" "))
	}

	/// Validates a hand-written query.
	pub fn parse(raw: &str) -> Result<Self, QueryError> {
		let query = raw.trim();

		if query.is_empty() {
			return Err(QueryError::Empty);
		}

		let len = query.chars().count();

		if len > MAX_QUERY_LEN {
			return Err(QueryError::TooLong { len });
		}

		Ok(Self(query.to_owned()))
	}

	/// The query text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for SearchQuery {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn handle(user: &str) -> &str {
	user.trim_start_matches('@')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|v| !v.is_empty())
}
