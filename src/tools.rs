//! The X tool catalogue served over MCP.
//!
//! Argument names are camelCase. List-valued search arguments are comma separated, except
//! `keywords`, which is space separated.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	api::{AdvancedSearch, XApi},
	mcp::{CallToolResult, McpTool, ToolError, ToolFuture, ToolHandler},
};

const DEFAULT_COUNT: u32 = 10;

/// [`ToolHandler`] backed by [`XApi`].
#[derive(Clone, Debug)]
pub struct XTools {
	api: Arc<XApi>,
}
impl XTools {
	/// Exposes `api` as MCP tools.
	pub fn new(api: Arc<XApi>) -> Self {
		Self { api }
	}

	async fn dispatch(&self, name: &str, arguments: JsonValue) -> Result<CallToolResult, ToolError> {
		let api = &self.api;

		match name {
			"test_x_connection" => Ok(self.test_connection().await),
			"get_profile" => Ok(CallToolResult::json(&api.get_profile().await?)),
			"get_user" => {
				let args: UserArgs = parse(arguments)?;

				Ok(CallToolResult::json(&api.get_user(&args.username).await?))
			},
			"create_tweet" => {
				let args: CreateTweetArgs = parse(arguments)?;
				let tweet = api.create_tweet(&args.text, args.reply_to_id.as_deref()).await?;

				Ok(CallToolResult::text(format!(
					"Successfully created tweet with ID: {}",
					id_of(&tweet)
				)))
			},
			"reply_to_tweet" => {
				let args: ReplyArgs = parse(arguments)?;
				let reply = api.create_tweet(&args.text, Some(&args.tweet_id)).await?;

				Ok(CallToolResult::text(format!(
					"Successfully replied to tweet {} with reply ID: {}",
					args.tweet_id,
					id_of(&reply)
				)))
			},
			"delete_tweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				api.delete_tweet(&args.tweet_id).await?;

				Ok(CallToolResult::text(format!("Successfully deleted tweet: {}", args.tweet_id)))
			},
			"get_tweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				Ok(CallToolResult::json(&api.get_tweet(&args.tweet_id).await?))
			},
			"quote_tweet" => {
				let args: QuoteArgs = parse(arguments)?;
				let tweet = api.quote_tweet(&args.text, &args.quoted_tweet_url).await?;

				Ok(CallToolResult::text(format!(
					"Successfully created quote tweet with ID: {}",
					id_of(&tweet)
				)))
			},
			"get_timeline" => {
				let args: TimelineArgs = parse(arguments)?;
				let count = args.count.unwrap_or(DEFAULT_COUNT);

				Ok(CallToolResult::json(&api.get_timeline(args.user_id.as_deref(), count).await?))
			},
			"get_home_feed" => {
				let args: FeedArgs = parse(arguments)?;

				Ok(CallToolResult::json(
					&api.get_home_feed(args.count.unwrap_or(DEFAULT_COUNT)).await?,
				))
			},
			"search_tweets" => {
				let args: SearchArgs = parse(arguments)?;
				let max = args.max_results.unwrap_or(DEFAULT_COUNT);

				Ok(CallToolResult::json(&api.search_tweets(&args.query, max).await?))
			},
			"search_advanced" => {
				let args: AdvancedSearchArgs = parse(arguments)?;
				let max = args.max_results.unwrap_or(DEFAULT_COUNT);

				Ok(CallToolResult::json(&api.search_advanced(&args.into_options(), max).await?))
			},
			"get_list_tweets" => {
				let args: ListTweetsArgs = parse(arguments)?;
				let max = args.max_results.unwrap_or(DEFAULT_COUNT);

				Ok(CallToolResult::json(&api.get_list_tweets(&args.list_id, max).await?))
			},
			"get_user_lists" => {
				let args: UserListsArgs = parse(arguments)?;

				Ok(CallToolResult::json(&api.get_user_lists(args.user_id.as_deref()).await?))
			},
			"like_tweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				api.like_tweet(&args.tweet_id).await?;

				Ok(CallToolResult::text(format!("Successfully liked tweet: {}", args.tweet_id)))
			},
			"unlike_tweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				api.unlike_tweet(&args.tweet_id).await?;

				Ok(CallToolResult::text(format!("Successfully unliked tweet: {}", args.tweet_id)))
			},
			"retweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				api.retweet(&args.tweet_id).await?;

				Ok(CallToolResult::text(format!("Successfully retweeted: {}", args.tweet_id)))
			},
			"unretweet" => {
				let args: TweetIdArgs = parse(arguments)?;

				api.unretweet(&args.tweet_id).await?;

				Ok(CallToolResult::text(format!("Successfully unretweeted: {}", args.tweet_id)))
			},
			_ => Err(ToolError::UnknownTool { name: name.into() }),
		}
	}

	/// Reports the authenticated account, or the failure text; never errors.
	async fn test_connection(&self) -> CallToolResult {
		match self.api.get_profile().await {
			Ok(profile) => {
				let metric = |key: &str| profile["public_metrics"][key].as_u64().unwrap_or(0);

				CallToolResult::text(format!(
					"X MCP server connected.\n\nAuthenticated as: @{} ({})\nFollowers: {}\nFollowing: {}\nTweets: {}",
					profile["username"].as_str().unwrap_or("unknown"),
					profile["name"].as_str().unwrap_or("unknown"),
					metric("followers_count"),
					metric("following_count"),
					metric("tweet_count"),
				))
			},
			Err(e) => {
				tracing::warn!(error = %e, "connection test failed");

				CallToolResult::text(format!("X connection failed: {e}"))
			},
		}
	}
}
impl ToolHandler for XTools {
	fn tools(&self) -> Vec<McpTool> {
		catalogue()
	}

	fn call<'a>(&'a self, name: &'a str, arguments: JsonValue) -> ToolFuture<'a> {
		Box::pin(self.dispatch(name, arguments))
	}
}

#[derive(Debug, Deserialize)]
struct UserArgs {
	username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTweetArgs {
	text: String,
	#[serde(default)]
	reply_to_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyArgs {
	tweet_id: String,
	text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TweetIdArgs {
	tweet_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteArgs {
	text: String,
	quoted_tweet_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineArgs {
	#[serde(default)]
	user_id: Option<String>,
	#[serde(default)]
	count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FeedArgs {
	#[serde(default)]
	count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
	query: String,
	#[serde(default)]
	max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTweetsArgs {
	list_id: String,
	#[serde(default)]
	max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserListsArgs {
	#[serde(default)]
	user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AdvancedSearchArgs {
	keywords: Option<String>,
	phrase: Option<String>,
	any: Option<String>,
	none: Option<String>,
	hashtags: Option<String>,
	from: Option<String>,
	to: Option<String>,
	mentions: Option<String>,
	lang: Option<String>,
	has_links: Option<bool>,
	has_media: Option<bool>,
	has_images: Option<bool>,
	has_videos: Option<bool>,
	is_retweet: Option<bool>,
	is_reply: Option<bool>,
	is_quote: Option<bool>,
	is_verified: Option<bool>,
	min_likes: Option<u32>,
	min_retweets: Option<u32>,
	min_replies: Option<u32>,
	since: Option<String>,
	until: Option<String>,
	list: Option<String>,
	context: Option<String>,
	max_results: Option<u32>,
}
impl AdvancedSearchArgs {
	fn into_options(self) -> AdvancedSearch {
		AdvancedSearch {
			keywords: self
				.keywords
				.map(|k| k.split_whitespace().map(ToOwned::to_owned).collect())
				.unwrap_or_default(),
			phrase: self.phrase,
			any: split_commas(self.any),
			none: split_commas(self.none),
			hashtags: split_commas(self.hashtags),
			from: split_commas(self.from),
			to: split_commas(self.to),
			mentions: split_commas(self.mentions),
			lang: self.lang,
			has_links: self.has_links.unwrap_or(false),
			has_media: self.has_media.unwrap_or(false),
			has_images: self.has_images.unwrap_or(false),
			has_videos: self.has_videos.unwrap_or(false),
			is_retweet: self.is_retweet,
			is_reply: self.is_reply,
			is_quote: self.is_quote,
			is_verified: self.is_verified,
			min_likes: self.min_likes,
			min_retweets: self.min_retweets,
			min_replies: self.min_replies,
			since: self.since,
			until: self.until,
			list: self.list,
			context: split_commas(self.context),
		}
	}
}

fn split_commas(raw: Option<String>) -> Vec<String> {
	raw.map(|raw| {
		raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(ToOwned::to_owned).collect()
	})
	.unwrap_or_default()
}

fn parse<T>(arguments: JsonValue) -> Result<T, ToolError>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(arguments)
		.map_err(|e| ToolError::InvalidArguments { message: e.to_string() })
}

fn id_of(tweet: &JsonValue) -> &str {
	tweet["id"].as_str().unwrap_or("unknown")
}

fn schema(properties: JsonValue, required: &[&str]) -> JsonValue {
	json!({ "type": "object", "properties": properties, "required": required })
}

fn string_prop(description: &str) -> JsonValue {
	json!({ "type": "string", "description": description })
}

fn bool_prop(description: &str) -> JsonValue {
	json!({ "type": "boolean", "description": description })
}

fn count_prop(description: &str) -> JsonValue {
	json!({
		"type": "integer",
		"description": description,
		"default": DEFAULT_COUNT,
		"minimum": 1,
		"maximum": 100,
	})
}

fn tweet_id_tool(name: &str, description: &str, id_description: &str) -> McpTool {
	McpTool::new(name, description, schema(json!({ "tweetId": string_prop(id_description) }), &["tweetId"]))
}

/// Every tool definition, in listing order.
pub fn catalogue() -> Vec<McpTool> {
	vec![
		McpTool::new("test_x_connection", "Test the X MCP server connection.", schema(json!({}), &[])),
		McpTool::new("get_profile", "Get your X profile information.", schema(json!({}), &[])),
		McpTool::new(
			"get_user",
			"Get information about an X user.",
			schema(
				json!({ "username": string_prop("Username (with @) or user ID.") }),
				&["username"],
			),
		),
		McpTool::new(
			"create_tweet",
			"Create a new tweet.",
			schema(
				json!({
					"text": string_prop("Tweet text (max 280 characters)."),
					"replyToId": string_prop("Optional tweet ID to reply to."),
				}),
				&["text"],
			),
		),
		McpTool::new(
			"reply_to_tweet",
			"Reply to an existing tweet.",
			schema(
				json!({
					"tweetId": string_prop("The ID of the tweet to reply to."),
					"text": string_prop("The reply text."),
				}),
				&["tweetId", "text"],
			),
		),
		tweet_id_tool("delete_tweet", "Delete a tweet.", "The ID of the tweet to delete."),
		tweet_id_tool("get_tweet", "Get details of a specific tweet.", "The ID of the tweet to retrieve."),
		McpTool::new(
			"quote_tweet",
			"Quote a tweet with commentary.",
			schema(
				json!({
					"text": string_prop("Your commentary on the quoted tweet."),
					"quotedTweetUrl": string_prop("The URL of the tweet to quote."),
				}),
				&["text", "quotedTweetUrl"],
			),
		),
		McpTool::new(
			"get_timeline",
			"Get a user's timeline (their original tweets).",
			schema(
				json!({
					"userId": string_prop("User ID; defaults to the authenticated user."),
					"count": count_prop("Number of tweets to retrieve."),
				}),
				&[],
			),
		),
		McpTool::new(
			"get_home_feed",
			"Get your home timeline feed.",
			schema(json!({ "count": count_prop("Number of tweets to retrieve.") }), &[]),
		),
		McpTool::new(
			"search_tweets",
			"Search recent tweets using X query syntax.",
			schema(
				json!({
					"query": string_prop(
						"Search query, e.g. 'cat OR dog', 'from:user keyword', '#AI -is:retweet'."
					),
					"maxResults": count_prop("Number of tweets to retrieve (10-100)."),
				}),
				&["query"],
			),
		),
		McpTool::new(
			"search_advanced",
			"Advanced tweet search with structured parameters.",
			schema(
				json!({
					"keywords": string_prop("Keywords that must all be present (space separated)."),
					"phrase": string_prop("Exact phrase to search for."),
					"any": string_prop("Any of these words (comma separated)."),
					"none": string_prop("None of these words (comma separated)."),
					"hashtags": string_prop("Hashtags (comma separated, # optional)."),
					"from": string_prop("From these users (comma separated)."),
					"to": string_prop("Replies to these users (comma separated)."),
					"mentions": string_prop("Mentioning these users (comma separated)."),
					"lang": string_prop("Language code, e.g. 'en'."),
					"hasLinks": bool_prop("Only tweets with links."),
					"hasMedia": bool_prop("Only tweets with media."),
					"hasImages": bool_prop("Only tweets with images."),
					"hasVideos": bool_prop("Only tweets with videos."),
					"isRetweet": bool_prop("true: only retweets; false: exclude retweets."),
					"isReply": bool_prop("true: only replies; false: exclude replies."),
					"isQuote": bool_prop("true: only quotes; false: exclude quotes."),
					"isVerified": bool_prop("true: only verified authors; false: exclude them."),
					"minLikes": { "type": "integer", "description": "Minimum likes." },
					"minRetweets": { "type": "integer", "description": "Minimum retweets." },
					"minReplies": { "type": "integer", "description": "Minimum replies." },
					"since": string_prop("Start date (YYYY-MM-DD)."),
					"until": string_prop("End date (YYYY-MM-DD)."),
					"list": string_prop("Search within this list ID."),
					"context": string_prop("Context annotations (comma separated domain.entity)."),
					"maxResults": count_prop("Number of tweets to retrieve (10-100)."),
				}),
				&[],
			),
		),
		McpTool::new(
			"get_list_tweets",
			"Get tweets from an X list.",
			schema(
				json!({
					"listId": string_prop("The list ID."),
					"maxResults": count_prop("Number of tweets to retrieve."),
				}),
				&["listId"],
			),
		),
		McpTool::new(
			"get_user_lists",
			"Get lists owned by a user.",
			schema(
				json!({ "userId": string_prop("User ID; defaults to the authenticated user.") }),
				&[],
			),
		),
		tweet_id_tool("like_tweet", "Like a tweet.", "The ID of the tweet to like."),
		tweet_id_tool("unlike_tweet", "Unlike a tweet.", "The ID of the tweet to unlike."),
		tweet_id_tool("retweet", "Retweet a tweet.", "The ID of the tweet to retweet."),
		tweet_id_tool("unretweet", "Remove a retweet.", "The ID of the tweet to unretweet."),
	]
}
