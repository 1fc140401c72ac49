//! Typed facade over the X API v2 endpoints the tool catalogue exposes.
//!
//! Every operation returns the `data` member of the response as raw JSON. Collection endpoints
//! yield `[]` when X omits `data` (no results).

pub mod query;

pub use query::*;

// self
use crate::{
	_prelude::*,
	client::{ApiRequest, AuthenticatedClient},
};

const USER_FIELDS: &str = "id,name,username,description,profile_image_url,verified,public_metrics";
const TWEET_FIELDS: &str = "id,text,created_at,author_id,conversation_id,public_metrics";
const TWEET_DETAIL_FIELDS: &str = "id,text,created_at,author_id,conversation_id,in_reply_to_user_id,referenced_tweets,attachments,public_metrics";
const SEARCH_TWEET_FIELDS: &str =
	"id,text,created_at,author_id,conversation_id,public_metrics,entities,context_annotations";
const LIST_FIELDS: &str = "id,name,description,member_count,follower_count,created_at";
const AUTHOR_USER_FIELDS: &str = "name,username,verified";

/// Search page bounds enforced by the recent search endpoint.
pub const SEARCH_RESULTS_RANGE: (u32, u32) = (10, 100);

/// X API operations on behalf of the authenticated user.
#[derive(Debug)]
pub struct XApi {
	client: Arc<AuthenticatedClient>,
	user_id: Mutex<Option<String>>,
}
impl XApi {
	/// Wraps an authenticated client.
	pub fn new(client: Arc<AuthenticatedClient>) -> Self {
		Self { client, user_id: Mutex::new(None) }
	}

	/// Underlying authenticated client.
	pub fn client(&self) -> &AuthenticatedClient {
		&self.client
	}

	/// Authenticated user's profile; also primes the user id cache.
	pub async fn get_profile(&self) -> Result<JsonValue> {
		let user = self.data(ApiRequest::get("users/me").query("user.fields", USER_FIELDS)).await?;

		if let Some(id) = user.get("id").and_then(JsonValue::as_str) {
			*self.user_id.lock() = Some(id.to_owned());
		}

		Ok(user)
	}

	/// Looks a user up by `@username` or by numeric id.
	pub async fn get_user(&self, username_or_id: &str) -> Result<JsonValue> {
		let path = match username_or_id.strip_prefix('@') {
			Some(username) => format!("users/by/username/{}", path_id("username", username)?),
			None => format!("users/{}", path_id("user id", username_or_id)?),
		};

		self.data(ApiRequest::get(path).query("user.fields", USER_FIELDS)).await
	}

	/// Posts a tweet, optionally as a reply.
	pub async fn create_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<JsonValue> {
		let mut body = json!({ "text": text });

		if let Some(reply_to) = reply_to {
			body["reply"] = json!({ "in_reply_to_tweet_id": reply_to });
		}

		self.data(ApiRequest::post("tweets", body)).await
	}

	/// Deletes one of the user's tweets.
	pub async fn delete_tweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let tweet_id = path_id("tweet id", tweet_id)?;

		self.data(ApiRequest::delete(format!("tweets/{tweet_id}"))).await
	}

	/// Fetches one tweet with its author and referenced tweets expanded.
	pub async fn get_tweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let tweet_id = path_id("tweet id", tweet_id)?;

		self.data(
			ApiRequest::get(format!("tweets/{tweet_id}"))
				.query("tweet.fields", TWEET_DETAIL_FIELDS)
				.query("expansions", "author_id,referenced_tweets.id"),
		)
		.await
	}

	/// Posts `text` followed by the quoted tweet's URL.
	pub async fn quote_tweet(&self, text: &str, quoted_tweet_url: &str) -> Result<JsonValue> {
		self.create_tweet(&format!("{text} {quoted_tweet_url}"), None).await
	}

	/// Original tweets (no retweets or replies) of `user_id`, defaulting to the caller.
	pub async fn get_timeline(&self, user_id: Option<&str>, max_results: u32) -> Result<JsonValue> {
		let user_id = self.resolve_user(user_id).await?;

		self.collection(
			ApiRequest::get(format!("users/{user_id}/tweets"))
				.query("max_results", max_results.to_string())
				.query("tweet.fields", TWEET_FIELDS)
				.query("exclude", "retweets,replies"),
		)
		.await
	}

	/// Reverse chronological home timeline. Apps without access to it get the caller's own
	/// timeline instead.
	pub async fn get_home_feed(&self, max_results: u32) -> Result<JsonValue> {
		let user_id = self.me().await?;
		let feed = self
			.collection(
				ApiRequest::get(format!("users/{user_id}/timelines/reverse_chronological"))
					.query("max_results", max_results.to_string())
					.query("tweet.fields", TWEET_FIELDS),
			)
			.await;

		match feed {
			Ok(feed) => Ok(feed),
			Err(e) => {
				tracing::warn!(error = %e, "home feed unavailable; falling back to own timeline");

				self.get_timeline(Some(&user_id), max_results).await
			},
		}
	}

	/// Recent search; `max_results` is clamped to the endpoint's 10..=100 range.
	pub async fn search_tweets(&self, query: &str, max_results: u32) -> Result<JsonValue> {
		let query = SearchQuery::parse(query)?;
		let (min, max) = SEARCH_RESULTS_RANGE;

		tracing::debug!(query = %query, len = query.as_str().chars().count(), "searching tweets");

		self.collection(
			ApiRequest::get("tweets/search/recent")
				.query("query", query.as_str())
				.query("max_results", max_results.clamp(min, max).to_string())
				.query("tweet.fields", SEARCH_TWEET_FIELDS)
				.query("expansions", "author_id,referenced_tweets.id")
				.query("user.fields", AUTHOR_USER_FIELDS),
		)
		.await
	}

	/// Builds a query from structured options and runs it through [`search_tweets`](Self::search_tweets).
	pub async fn search_advanced(
		&self,
		options: &AdvancedSearch,
		max_results: u32,
	) -> Result<JsonValue> {
		let query = SearchQuery::build(options)?;

		self.search_tweets(query.as_str(), max_results).await
	}

	/// Tweets from members of a list.
	pub async fn get_list_tweets(&self, list_id: &str, max_results: u32) -> Result<JsonValue> {
		let list_id = path_id("list id", list_id)?;

		self.collection(
			ApiRequest::get(format!("lists/{list_id}/tweets"))
				.query("max_results", max_results.min(100).to_string())
				.query("tweet.fields", TWEET_FIELDS)
				.query("expansions", "author_id")
				.query("user.fields", AUTHOR_USER_FIELDS),
		)
		.await
	}

	/// Lists owned by `user_id`, defaulting to the caller.
	pub async fn get_user_lists(&self, user_id: Option<&str>) -> Result<JsonValue> {
		let user_id = self.resolve_user(user_id).await?;

		self.collection(
			ApiRequest::get(format!("users/{user_id}/owned_lists"))
				.query("max_results", "100")
				.query("list.fields", LIST_FIELDS),
		)
		.await
	}

	/// Likes a tweet as the caller.
	pub async fn like_tweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let me = self.me().await?;

		self.data(ApiRequest::post(format!("users/{me}/likes"), json!({ "tweet_id": tweet_id })))
			.await
	}

	/// Removes the caller's like.
	pub async fn unlike_tweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let tweet_id = path_id("tweet id", tweet_id)?;
		let me = self.me().await?;

		self.data(ApiRequest::delete(format!("users/{me}/likes/{tweet_id}"))).await
	}

	/// Retweets as the caller.
	pub async fn retweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let me = self.me().await?;

		self.data(ApiRequest::post(format!("users/{me}/retweets"), json!({ "tweet_id": tweet_id })))
			.await
	}

	/// Undoes the caller's retweet.
	pub async fn unretweet(&self, tweet_id: &str) -> Result<JsonValue> {
		let tweet_id = path_id("tweet id", tweet_id)?;
		let me = self.me().await?;

		self.data(ApiRequest::delete(format!("users/{me}/retweets/{tweet_id}"))).await
	}

	/// Cached id of the authenticated user, resolved through `users/me` on first use.
	pub async fn me(&self) -> Result<String> {
		if let Some(id) = self.user_id.lock().clone() {
			return Ok(id);
		}

		let profile = self.get_profile().await?;

		profile.get("id").and_then(JsonValue::as_str).map(ToOwned::to_owned).ok_or_else(|| {
			crate::error::ApiError { status: 200, detail: json!({ "error": "users/me returned no id" }) }
				.into()
		})
	}

	async fn resolve_user(&self, user_id: Option<&str>) -> Result<String> {
		match user_id.filter(|id| !id.is_empty()) {
			Some(id) => Ok(path_id("user id", id)?.to_owned()),
			None => self.me().await,
		}
	}

	async fn data(&self, request: ApiRequest) -> Result<JsonValue> {
		let mut response = self.client.send_with_auth(&request).await?;

		Ok(response.body.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null))
	}

	async fn collection(&self, request: ApiRequest) -> Result<JsonValue> {
		let data = self.data(request).await?;

		Ok(if data.is_null() { JsonValue::Array(Vec::new()) } else { data })
	}
}

/// Admits identifiers that stay a single path segment: ASCII letters, digits, and `_`.
fn path_id<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
	if !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
		Ok(value)
	} else {
		Err(Error::InvalidIdentifier { name, value: value.to_owned() })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::TokenSecret,
		client::{ApiResponse, ApiTransport, TransportFuture},
		store::MemoryStore,
	};

	#[derive(Default)]
	struct RecordingTransport {
		requests: Mutex<Vec<ApiRequest>>,
		me_calls: AtomicUsize,
	}
	impl ApiTransport for RecordingTransport {
		fn send<'a>(
			&'a self,
			request: &'a ApiRequest,
			_bearer: &'a TokenSecret,
		) -> TransportFuture<'a> {
			Box::pin(async move {
				self.requests.lock().push(request.clone());

				let body = match request.path.as_str() {
					"users/me" => {
						self.me_calls.fetch_add(1, Ordering::SeqCst);

						json!({ "data": { "id": "42", "username": "me" } })
					},
					path if path.ends_with("reverse_chronological") =>
						return Ok(ApiResponse { status: 403, body: json!({ "title": "Forbidden" }) }),
					"users/42/tweets" => json!({ "meta": { "result_count": 0 } }),
					_ => json!({ "data": { "ok": true } }),
				};

				Ok(ApiResponse { status: 200, body })
			})
		}
	}

	fn api() -> (XApi, Arc<RecordingTransport>) {
		let transport = Arc::new(RecordingTransport::default());
		let client = AuthenticatedClient::new(
			test_token_set("A1", None, Duration::ZERO, Duration::hours(2)),
			transport.clone(),
			Arc::new(MemoryStore::default()),
		);

		(XApi::new(Arc::new(client)), transport)
	}

	#[tokio::test]
	async fn user_id_is_resolved_once_and_cached() {
		let (api, transport) = api();

		api.like_tweet("7").await.expect("Like should succeed.");
		api.retweet("7").await.expect("Retweet should succeed.");

		let requests = transport.requests.lock();

		assert_eq!(transport.me_calls.load(Ordering::SeqCst), 1);
		assert_eq!(requests[1].path, "users/42/likes");
		assert_eq!(requests[1].body, Some(json!({ "tweet_id": "7" })));
		assert_eq!(requests[2].path, "users/42/retweets");
	}

	#[tokio::test]
	async fn home_feed_falls_back_to_own_timeline_and_defaults_to_empty() {
		let (api, transport) = api();
		let feed = api.get_home_feed(5).await.expect("Fallback should succeed.");

		assert_eq!(feed, json!([]));
		assert_eq!(transport.requests.lock().last().expect("Requests recorded.").path, "users/42/tweets");
	}

	#[tokio::test]
	async fn get_user_routes_on_at_prefix() {
		let (api, transport) = api();

		api.get_user("@jack").await.expect("Lookup should succeed.");
		api.get_user("12").await.expect("Lookup should succeed.");

		let requests = transport.requests.lock();

		assert_eq!(requests[0].path, "users/by/username/jack");
		assert_eq!(requests[1].path, "users/12");
	}

	#[tokio::test]
	async fn search_clamps_page_size_and_rejects_empty_queries() {
		let (api, transport) = api();

		api.search_tweets("rust", 3).await.expect("Search should succeed.");
		api.search_tweets("rust", 500).await.expect("Search should succeed.");

		assert!(matches!(api.search_tweets(" ", 10).await, Err(Error::Query(QueryError::Empty))));

		let requests = transport.requests.lock();
		let page = |i: usize| {
			requests[i].query.iter().find(|(k, _)| k == "max_results").map(|(_, v)| v.clone())
		};

		assert_eq!(page(0).as_deref(), Some("10"));
		assert_eq!(page(1).as_deref(), Some("100"));
	}

	#[tokio::test]
	async fn replies_and_quotes_shape_the_tweet_body() {
		let (api, transport) = api();

		api.create_tweet("hi", Some("99")).await.expect("Reply should succeed.");
		api.quote_tweet("look", "https://x.com/a/status/1").await.expect("Quote should succeed.");

		let requests = transport.requests.lock();

		assert_eq!(
			requests[0].body,
			Some(json!({ "text": "hi", "reply": { "in_reply_to_tweet_id": "99" } }))
		);
		assert_eq!(requests[1].body, Some(json!({ "text": "look https://x.com/a/status/1" })));
	}

	#[tokio::test]
	async fn identifiers_that_would_escape_their_segment_are_refused() {
		let (api, transport) = api();

		for result in [
			api.delete_tweet("../users/42/likes/7").await,
			api.get_user("@jack?user.fields=x#").await,
			api.get_tweet("1/retweeted_by").await,
			api.get_timeline(Some("42%2F.."), 10).await,
			api.unlike_tweet("").await,
		] {
			assert!(matches!(result, Err(Error::InvalidIdentifier { .. })), "{result:?}");
		}

		assert!(transport.requests.lock().is_empty(), "Nothing may reach the transport.");
	}
}
