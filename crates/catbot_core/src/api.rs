use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, bail};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::lookup_value;
use crate::error::{BotError, Result};
use crate::model::{Language, PageText, render_title};

/// Member namespaces followed when walking an English category: articles and
/// subcategories.
pub const MEMBER_NAMESPACES: &str = "0|14";

const MAX_QUERY_LIMIT: usize = 500;
const TITLE_BATCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedCategory {
    pub title: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMember {
    pub title: String,
    pub namespace: i32,
}

pub trait WikiReadApi {
    /// One page of the `Unusedcategories` report with hidden flags attached.
    fn list_unused_categories(
        &mut self,
        language: Language,
        limit: usize,
        continuation: Option<&str>,
    ) -> Result<Paged<UnusedCategory>>;
    fn category_is_hidden(&mut self, language: Language, title: &str) -> Result<bool>;
    /// `title` is the bare title inside `namespace`. Returns the first
    /// matching link's full title.
    fn resolve_interwiki(
        &mut self,
        language: Language,
        namespace: i32,
        title: &str,
        target: Language,
    ) -> Result<Option<String>>;
    fn list_category_members(
        &mut self,
        language: Language,
        category_title: &str,
        continuation: Option<&str>,
    ) -> Result<Paged<CategoryMember>>;
    fn get_page_text(&mut self, language: Language, title: &str) -> Result<PageText>;
    fn request_count(&self) -> usize;
}

pub trait WikiWriteApi: WikiReadApi {
    fn login(&mut self, language: Language, username: &str, password: &str) -> Result<()>;
    fn save_page(
        &mut self,
        language: Language,
        title: &str,
        text: &str,
        summary: &str,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MediaWikiClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub rate_limit_read_ms: u64,
    pub rate_limit_write_ms: u64,
    pub max_retries: usize,
    pub max_write_retries: usize,
    pub retry_delay_ms: u64,
}

impl MediaWikiClientConfig {
    pub fn from_lookup(
        lookup: &dyn Fn(&str) -> Option<String>,
        api_url_key: &str,
        api_url_default: &str,
        user_agent_default: &str,
    ) -> Self {
        let text = |key: &str, default: &str| {
            lookup_value(lookup, key).unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| {
            lookup_value(lookup, key)
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(default)
        };
        let count = |key: &str, default: usize| {
            lookup_value(lookup, key)
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(default)
        };
        Self {
            api_url: text(api_url_key, api_url_default),
            user_agent: text("WIKI_USER_AGENT", user_agent_default),
            timeout_ms: number("WIKI_HTTP_TIMEOUT_MS", 30_000),
            rate_limit_read_ms: number("WIKI_RATE_LIMIT_READ", 300),
            rate_limit_write_ms: number("WIKI_RATE_LIMIT_WRITE", 1_000),
            max_retries: count("WIKI_HTTP_RETRIES", 2),
            max_write_retries: count("WIKI_HTTP_WRITE_RETRIES", 1),
            retry_delay_ms: number("WIKI_HTTP_RETRY_DELAY_MS", 500),
        }
    }
}

/// Raw revision text of one page as returned by the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteText {
    pub title: String,
    pub content: String,
    pub is_redirect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// Blocking client for a single MediaWiki site.
pub struct MediaWikiClient {
    client: Client,
    config: MediaWikiClientConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
    csrf_token: Option<String>,
}

impl MediaWikiClient {
    pub fn new(config: MediaWikiClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            config,
            last_request_at: None,
            request_count: 0,
            csrf_token: None,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    /// Sends one API call, retrying transient transport and HTTP failures.
    /// POST calls that change the wiki use the write rate limit and budget.
    fn request_json(
        &mut self,
        method: Method,
        params: &[(&str, String)],
        is_write: bool,
    ) -> anyhow::Result<Value> {
        let url = Url::parse(&self.config.api_url)
            .with_context(|| format!("invalid MediaWiki API URL: {}", self.config.api_url))?;
        let budget = if is_write {
            self.config.max_write_retries
        } else {
            self.config.max_retries
        };
        let mut pairs = vec![("format", "json"), ("formatversion", "2")];
        pairs.extend(
            params
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (*key, value.as_str())),
        );

        let mut attempt = 0;
        loop {
            self.throttle(is_write);
            let request = match method {
                Method::Get => self.client.get(url.clone()).query(&pairs),
                Method::Post => self.client.post(url.clone()).form(&pairs),
            };
            let outcome = request.send();
            let retryable = match &outcome {
                Ok(response) => is_retryable_status(response.status()),
                Err(error) => is_retryable_error(error),
            };
            if retryable && attempt < budget {
                tracing::warn!(api = %self.config.api_url, attempt, "retrying MediaWiki request");
                sleep(retry_delay(&self.config, attempt, is_write, jitter_ms()));
                attempt += 1;
                continue;
            }
            return decode_payload(outcome.context("failed to call MediaWiki API")?);
        }
    }

    fn query(&mut self, params: &[(&str, String)]) -> anyhow::Result<Value> {
        self.request_json(Method::Get, params, false)
    }

    fn throttle(&mut self, is_write: bool) {
        let spacing = Duration::from_millis(if is_write {
            self.config.rate_limit_write_ms
        } else {
            self.config.rate_limit_read_ms
        });
        if let Some(wait) = self
            .last_request_at
            .and_then(|last| spacing.checked_sub(last.elapsed()))
        {
            sleep(wait);
        }
        self.last_request_at = Some(Instant::now());
        self.request_count += 1;
    }

    /// Fetches a `meta=tokens` token of the given type (`login`, `csrf`).
    fn fetch_token(&mut self, kind: &str) -> anyhow::Result<String> {
        let response = self.query(&[
            ("action", "query".to_string()),
            ("meta", "tokens".to_string()),
            ("type", kind.to_string()),
        ])?;
        let parsed: TokenQueryResponse = serde_json::from_value(response)
            .with_context(|| format!("failed to decode {kind} token response"))?;
        parsed
            .query
            .tokens
            .get(&format!("{kind}token"))
            .cloned()
            .with_context(|| format!("MediaWiki returned no {kind} token"))
    }

    fn csrf_token(&mut self) -> anyhow::Result<String> {
        if let Some(token) = self.csrf_token.clone() {
            return Ok(token);
        }
        let token = self.fetch_token("csrf")?;
        self.csrf_token = Some(token.clone());
        Ok(token)
    }

    pub fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let login_token = self.fetch_token("login")?;
        let response = self.request_json(
            Method::Post,
            &[
                ("action", "login".to_string()),
                ("lgname", username.to_string()),
                ("lgpassword", password.to_string()),
                ("lgtoken", login_token),
            ],
            true,
        )?;
        let parsed: LoginResponse =
            serde_json::from_value(response).context("failed to decode login response")?;
        if parsed.login.result.as_deref() != Some("Success") {
            let reason = parsed
                .login
                .reason
                .or(parsed.login.result)
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("MediaWiki login failed for {username}: {reason}");
        }
        self.csrf_token = None;
        Ok(())
    }

    pub fn unused_categories(
        &mut self,
        limit: usize,
        offset: Option<&str>,
    ) -> anyhow::Result<Paged<String>> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("list", "querypage".to_string()),
            ("qppage", "Unusedcategories".to_string()),
            ("qplimit", limit.clamp(1, MAX_QUERY_LIMIT).to_string()),
        ];
        if let Some(offset) = offset {
            params.push(("qpoffset", offset.to_string()));
        }
        let response = self.query(&params)?;
        parse_unused_categories(response)
    }

    /// Hidden flags keyed by title. Titles the site does not report are absent.
    pub fn hidden_flags(&mut self, titles: &[String]) -> anyhow::Result<BTreeMap<String, bool>> {
        let mut flags = BTreeMap::new();
        for batch in titles.chunks(TITLE_BATCH) {
            let response = self.query(&[
                ("action", "query".to_string()),
                ("prop", "categoryinfo".to_string()),
                ("titles", batch.join("|")),
            ])?;
            flags.extend(parse_hidden_flags(response)?);
        }
        Ok(flags)
    }

    pub fn langlink(&mut self, title: &str, target: Language) -> anyhow::Result<Option<String>> {
        let response = self.query(&[
            ("action", "query".to_string()),
            ("prop", "langlinks".to_string()),
            ("titles", title.to_string()),
            ("lllang", target.code().to_string()),
            ("lllimit", "max".to_string()),
        ])?;
        parse_langlink(response, target)
    }

    pub fn category_members(
        &mut self,
        category_title: &str,
        continuation: Option<&str>,
    ) -> anyhow::Result<Paged<CategoryMember>> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("list", "categorymembers".to_string()),
            ("cmtitle", category_title.to_string()),
            ("cmnamespace", MEMBER_NAMESPACES.to_string()),
            ("cmprop", "title".to_string()),
            ("cmlimit", MAX_QUERY_LIMIT.to_string()),
        ];
        if let Some(token) = continuation {
            params.push(("cmcontinue", token.to_string()));
        }
        let response = self.query(&params)?;
        parse_category_members(response)
    }

    pub fn page_text(&mut self, title: &str) -> anyhow::Result<Option<RemoteText>> {
        let response = self.query(&[
            ("action", "query".to_string()),
            ("titles", title.to_string()),
            ("prop", "revisions|info".to_string()),
            ("rvprop", "content".to_string()),
            ("rvslots", "main".to_string()),
        ])?;
        parse_page_text(response)
    }

    pub fn edit_page(&mut self, title: &str, content: &str, summary: &str) -> anyhow::Result<()> {
        let token = self.csrf_token()?;
        let response = self.request_json(
            Method::Post,
            &[
                ("action", "edit".to_string()),
                ("title", title.to_string()),
                ("text", content.to_string()),
                ("summary", summary.to_string()),
                ("bot", "1".to_string()),
                ("nocreate", "1".to_string()),
                ("assert", "user".to_string()),
                ("token", token),
            ],
            true,
        )?;
        let edit_payload: EditResponse =
            serde_json::from_value(response).context("failed to decode edit response")?;
        let edit = edit_payload
            .edit
            .ok_or_else(|| anyhow::anyhow!("missing edit payload in API response"))?;
        if edit.result.as_deref() != Some("Success") {
            bail!(
                "MediaWiki edit failed for {}: {}",
                title,
                edit.result.unwrap_or_else(|| "unknown".to_string())
            );
        }
        Ok(())
    }
}

/// The Arabic and English sites, addressed by language.
pub struct WikiFamily {
    ar: MediaWikiClient,
    en: MediaWikiClient,
}

impl WikiFamily {
    pub fn new(ar: MediaWikiClient, en: MediaWikiClient) -> Self {
        Self { ar, en }
    }

    pub fn site(&mut self, language: Language) -> &mut MediaWikiClient {
        match language {
            Language::Ar => &mut self.ar,
            Language::En => &mut self.en,
        }
    }
}

impl WikiReadApi for WikiFamily {
    fn list_unused_categories(
        &mut self,
        language: Language,
        limit: usize,
        continuation: Option<&str>,
    ) -> Result<Paged<UnusedCategory>> {
        let site = self.site(language);
        let titles = site.unused_categories(limit, continuation)?;
        let flags = site.hidden_flags(&titles.items)?;
        let items = titles
            .items
            .into_iter()
            .map(|title| {
                let hidden = flags.get(&title).copied().unwrap_or(false);
                UnusedCategory { title, hidden }
            })
            .collect();
        Ok(Paged {
            items,
            continuation: titles.continuation,
        })
    }

    fn category_is_hidden(&mut self, language: Language, title: &str) -> Result<bool> {
        let flags = self.site(language).hidden_flags(&[title.to_string()])?;
        Ok(flags.into_values().next().unwrap_or(false))
    }

    fn resolve_interwiki(
        &mut self,
        language: Language,
        namespace: i32,
        title: &str,
        target: Language,
    ) -> Result<Option<String>> {
        let full_title = render_title(language, namespace, title);
        Ok(self.site(language).langlink(&full_title, target)?)
    }

    fn list_category_members(
        &mut self,
        language: Language,
        category_title: &str,
        continuation: Option<&str>,
    ) -> Result<Paged<CategoryMember>> {
        Ok(self
            .site(language)
            .category_members(category_title, continuation)?)
    }

    fn get_page_text(&mut self, language: Language, title: &str) -> Result<PageText> {
        let remote = self
            .site(language)
            .page_text(title)?
            .ok_or_else(|| BotError::PageNotFound(format!("{language}:{title}")))?;
        Ok(PageText {
            language,
            title: remote.title,
            content: remote.content,
            is_redirect: remote.is_redirect,
        })
    }

    fn request_count(&self) -> usize {
        self.ar.request_count() + self.en.request_count()
    }
}

impl WikiWriteApi for WikiFamily {
    fn login(&mut self, language: Language, username: &str, password: &str) -> Result<()> {
        self.site(language)
            .login(username, password)
            .map_err(|error| BotError::Configuration(format!("{language}: {error:#}")))
    }

    fn save_page(
        &mut self,
        language: Language,
        title: &str,
        text: &str,
        summary: &str,
    ) -> Result<()> {
        self.site(language)
            .edit_page(title, text, summary)
            .map_err(|error| BotError::Edit {
                title: title.to_string(),
                reason: format!("{error:#}"),
            })
    }
}

pub fn parse_unused_categories(response: Value) -> anyhow::Result<Paged<String>> {
    let parsed: QueryResponse = serde_json::from_value(response)
        .context("failed to decode querypage API response")?;
    let items = parsed
        .query
        .querypage
        .map(|page| page.results.into_iter().map(|item| item.title).collect())
        .unwrap_or_default();
    let continuation = parsed
        .continuation
        .and_then(|cont| cont.qpoffset)
        .and_then(|offset| match offset {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) => Some(text),
            _ => None,
        });
    Ok(Paged {
        items,
        continuation,
    })
}

pub fn parse_hidden_flags(response: Value) -> anyhow::Result<BTreeMap<String, bool>> {
    let parsed: QueryResponse = serde_json::from_value(response)
        .context("failed to decode categoryinfo API response")?;
    Ok(parsed
        .query
        .pages
        .into_iter()
        .map(|page| {
            let hidden = page.categoryinfo.is_some_and(|info| info.hidden);
            (page.title, hidden)
        })
        .collect())
}

pub fn parse_langlink(response: Value, target: Language) -> anyhow::Result<Option<String>> {
    let parsed: QueryResponse = serde_json::from_value(response)
        .context("failed to decode langlinks API response")?;
    Ok(parsed
        .query
        .pages
        .into_iter()
        .flat_map(|page| page.langlinks)
        .find(|link| link.lang == target.code())
        .map(|link| link.title)
        .filter(|title| !title.trim().is_empty()))
}

pub fn parse_category_members(response: Value) -> anyhow::Result<Paged<CategoryMember>> {
    let parsed: QueryResponse = serde_json::from_value(response)
        .context("failed to decode categorymembers API response")?;
    let items = parsed
        .query
        .categorymembers
        .into_iter()
        .map(|item| CategoryMember {
            title: item.title,
            namespace: item.ns,
        })
        .collect();
    Ok(Paged {
        items,
        continuation: parsed.continuation.and_then(|cont| cont.cmcontinue),
    })
}

pub fn parse_page_text(response: Value) -> anyhow::Result<Option<RemoteText>> {
    let parsed: QueryResponse = serde_json::from_value(response)
        .context("failed to decode page content API response")?;
    let Some(page) = parsed.query.pages.into_iter().next() else {
        return Ok(None);
    };
    if page.missing || page.invalid {
        return Ok(None);
    }
    let content = page
        .revisions
        .into_iter()
        .next()
        .and_then(|revision| revision.slots)
        .and_then(|slots| slots.main)
        .map(|slot| slot.content);
    Ok(content.map(|content| RemoteText {
        title: page.title,
        content,
        is_redirect: page.redirect,
    }))
}

fn decode_payload(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    if !status.is_success() {
        bail!("MediaWiki API request failed with HTTP {status}");
    }
    let payload: Value = response
        .json()
        .context("failed to decode MediaWiki API JSON response")?;
    check_api_error(payload)
}

/// Turns a top-level `error` object into an `Err`, leaving other payloads alone.
fn check_api_error(payload: Value) -> anyhow::Result<Value> {
    let Some(error) = payload.get("error") else {
        return Ok(payload);
    };
    let error: ApiErrorPayload = serde_json::from_value(error.clone()).unwrap_or_default();
    bail!(
        "MediaWiki API error [{}]: {}",
        error.code.as_deref().unwrap_or("unknown_error"),
        error.info.as_deref().unwrap_or("unknown info")
    )
}

/// Exponential backoff from `retry_delay_ms`, doubled for writes.
fn retry_delay(
    config: &MediaWikiClientConfig,
    attempt: usize,
    is_write: bool,
    jitter_ms: u64,
) -> Duration {
    let factor = 2u64.saturating_pow(u32::try_from(attempt).unwrap_or(16));
    let write_factor = if is_write { 2 } else { 1 };
    Duration::from_millis(
        config
            .retry_delay_ms
            .saturating_mul(factor)
            .saturating_mul(write_factor)
            .saturating_add(jitter_ms),
    )
}

fn jitter_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::from(elapsed.subsec_millis() % 100))
        .unwrap_or(0)
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    query: QueryPayload,
    #[serde(default, rename = "continue")]
    continuation: Option<ContinuationPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPayload {
    querypage: Option<QueryPagePayload>,
    #[serde(default)]
    categorymembers: Vec<MemberQueryItem>,
    #[serde(default)]
    pages: Vec<PageQueryItem>,
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationPayload {
    qpoffset: Option<Value>,
    cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPagePayload {
    #[serde(default)]
    results: Vec<TitleQueryItem>,
}

#[derive(Debug, Deserialize)]
struct TitleQueryItem {
    title: String,
}

#[derive(Debug, Deserialize)]
struct MemberQueryItem {
    ns: i32,
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageQueryItem {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    redirect: bool,
    categoryinfo: Option<CategoryInfoItem>,
    #[serde(default)]
    langlinks: Vec<LangLinkItem>,
    #[serde(default)]
    revisions: Vec<RevisionQueryItem>,
}

#[derive(Debug, Deserialize)]
struct CategoryInfoItem {
    #[serde(default)]
    hidden: bool,
}

#[derive(Debug, Deserialize)]
struct LangLinkItem {
    lang: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct RevisionQueryItem {
    slots: Option<RevisionSlotContainer>,
}

#[derive(Debug, Deserialize)]
struct RevisionSlotContainer {
    main: Option<RevisionMainSlot>,
}

#[derive(Debug, Deserialize)]
struct RevisionMainSlot {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryResponse {
    #[serde(default)]
    query: TokenQueryPayload,
}

/// `tokens` is keyed by `<type>token`.
#[derive(Debug, Deserialize, Default)]
struct TokenQueryPayload {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorPayload {
    code: Option<String>,
    info: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoginResponse {
    #[serde(default)]
    login: LoginPayload,
}

#[derive(Debug, Deserialize, Default)]
struct LoginPayload {
    result: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EditResponse {
    edit: Option<EditPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct EditPayload {
    result: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unused_categories_returns_titles_and_offset() {
        let response = json!({
            "continue": {"qpoffset": 2, "continue": "-||"},
            "query": {
                "querypage": {
                    "name": "Unusedcategories",
                    "results": [
                        {"value": "0", "ns": 14, "title": "تصنيف:تاريخ"},
                        {"value": "0", "ns": 14, "title": "تصنيف:علوم"}
                    ]
                }
            }
        });
        let page = parse_unused_categories(response).expect("parse");
        assert_eq!(page.items, vec!["تصنيف:تاريخ", "تصنيف:علوم"]);
        assert_eq!(page.continuation.as_deref(), Some("2"));
    }

    #[test]
    fn unused_categories_empty_results() {
        let response = json!({
            "query": {"querypage": {"name": "Unusedcategories", "results": []}}
        });
        let page = parse_unused_categories(response).expect("parse");
        assert!(page.items.is_empty());
        assert!(page.continuation.is_none());
    }

    #[test]
    fn unused_categories_missing_query() {
        let page = parse_unused_categories(json!({})).expect("parse");
        assert!(page.items.is_empty());
    }

    #[test]
    fn hidden_flags_read_categoryinfo() {
        let response = json!({
            "query": {
                "pages": [
                    {"ns": 14, "title": "Category:Hidden test", "categoryinfo": {"size": 0, "hidden": true}},
                    {"ns": 14, "title": "Category:Visible test", "categoryinfo": {"size": 3}},
                    {"ns": 14, "title": "Category:Missing", "missing": true}
                ]
            }
        });
        let flags = parse_hidden_flags(response).expect("parse");
        assert_eq!(flags.get("Category:Hidden test"), Some(&true));
        assert_eq!(flags.get("Category:Visible test"), Some(&false));
        assert_eq!(flags.get("Category:Missing"), Some(&false));
    }

    #[test]
    fn langlink_takes_first_match_for_target() {
        let response = json!({
            "query": {
                "pages": [{
                    "ns": 14,
                    "title": "تصنيف:امثلة",
                    "langlinks": [
                        {"lang": "en", "title": "Category:Examples"},
                        {"lang": "en", "title": "Category:Samples"}
                    ]
                }]
            }
        });
        assert_eq!(
            parse_langlink(response, Language::En).expect("parse").as_deref(),
            Some("Category:Examples")
        );
    }

    #[test]
    fn langlink_absent_is_none() {
        let response = json!({"query": {"pages": [{"ns": 0, "title": "Example Article"}]}});
        assert!(parse_langlink(response, Language::Ar).expect("parse").is_none());
        assert!(parse_langlink(json!({}), Language::Ar).expect("parse").is_none());
    }

    #[test]
    fn category_members_keep_namespace_and_continuation() {
        let response = json!({
            "continue": {"cmcontinue": "page|4558414d504c45|123", "continue": "-||"},
            "query": {
                "categorymembers": [
                    {"ns": 0, "title": "Example Article"},
                    {"ns": 14, "title": "Category:Example subcategory"}
                ]
            }
        });
        let page = parse_category_members(response).expect("parse");
        assert_eq!(
            page.items,
            vec![
                CategoryMember {
                    title: "Example Article".to_string(),
                    namespace: 0,
                },
                CategoryMember {
                    title: "Category:Example subcategory".to_string(),
                    namespace: 14,
                },
            ]
        );
        assert_eq!(page.continuation.as_deref(), Some("page|4558414d504c45|123"));
    }

    #[test]
    fn page_text_reads_main_slot_and_redirect_flag() {
        let response = json!({
            "query": {
                "pages": [{
                    "pageid": 7,
                    "ns": 0,
                    "title": "مقال مثال",
                    "redirect": true,
                    "revisions": [{"slots": {"main": {"contentmodel": "wikitext", "content": "#تحويل [[هدف]]"}}}]
                }]
            }
        });
        let text = parse_page_text(response).expect("parse").expect("page");
        assert_eq!(text.title, "مقال مثال");
        assert_eq!(text.content, "#تحويل [[هدف]]");
        assert!(text.is_redirect);
    }

    #[test]
    fn page_text_missing_is_none() {
        let response = json!({"query": {"pages": [{"ns": 0, "title": "Nope", "missing": true}]}});
        assert!(parse_page_text(response).expect("parse").is_none());
    }

    #[test]
    fn api_error_objects_become_errors() {
        let error = check_api_error(json!({
            "error": {"code": "badtoken", "info": "Invalid CSRF token."}
        }))
        .expect_err("api error");
        assert_eq!(error.to_string(), "MediaWiki API error [badtoken]: Invalid CSRF token.");

        let error = check_api_error(json!({"error": "odd"})).expect_err("api error");
        assert!(error.to_string().contains("unknown_error"));

        let payload = json!({"query": {"pages": []}});
        assert_eq!(check_api_error(payload.clone()).expect("payload"), payload);
    }

    #[test]
    fn token_payload_is_keyed_by_type() {
        let parsed: TokenQueryResponse = serde_json::from_value(json!({
            "batchcomplete": true,
            "query": {"tokens": {"logintoken": "abc+\\", "csrftoken": "def+\\"}}
        }))
        .expect("decode");
        assert_eq!(parsed.query.tokens.get("logintoken").map(String::as_str), Some("abc+\\"));
        assert_eq!(parsed.query.tokens.get("csrftoken").map(String::as_str), Some("def+\\"));

        let empty: TokenQueryResponse = serde_json::from_value(json!({})).expect("decode");
        assert!(empty.query.tokens.is_empty());
    }

    #[test]
    fn retry_delay_backs_off_and_doubles_for_writes() {
        let lookup = |_: &str| -> Option<String> { None };
        let config = MediaWikiClientConfig::from_lookup(
            &lookup,
            "AR_WIKI_API_URL",
            "https://ar.example/api.php",
            "agent/1.0",
        );
        assert_eq!(retry_delay(&config, 0, false, 0), Duration::from_millis(500));
        assert_eq!(retry_delay(&config, 2, false, 0), Duration::from_millis(2_000));
        assert_eq!(retry_delay(&config, 1, true, 7), Duration::from_millis(2_007));
        assert!(retry_delay(&config, usize::MAX, true, 0) > Duration::from_secs(1));
    }

    #[test]
    fn client_config_reads_lookup_with_defaults() {
        let lookup = |key: &str| match key {
            "EN_WIKI_API_URL" => Some("https://en.example/api.php".to_string()),
            "WIKI_HTTP_RETRIES" => Some("5".to_string()),
            "WIKI_RATE_LIMIT_READ" => Some("not-a-number".to_string()),
            _ => None,
        };
        let config = MediaWikiClientConfig::from_lookup(
            &lookup,
            "EN_WIKI_API_URL",
            "https://default.example/api.php",
            "agent/1.0",
        );
        assert_eq!(config.api_url, "https://en.example/api.php");
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.rate_limit_read_ms, 300);
        assert_eq!(config.rate_limit_write_ms, 1_000);
    }
}
