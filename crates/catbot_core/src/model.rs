use std::fmt;

use crate::error::{BotError, Result};
use crate::mutate::append_category;

pub const NS_MAIN: i32 = 0;
pub const NS_CATEGORY: i32 = 14;

pub const AR_CATEGORY_NAMESPACE: &str = "تصنيف";
pub const EN_CATEGORY_NAMESPACE: &str = "Category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Ar,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Local name of the category namespace, used when rendering titles.
    pub fn category_namespace(self) -> &'static str {
        match self {
            Self::Ar => AR_CATEGORY_NAMESPACE,
            Self::En => EN_CATEGORY_NAMESPACE,
        }
    }

    /// Every prefix the site accepts for its category namespace. Arabic
    /// Wikipedia also honours the canonical English name.
    pub fn category_namespace_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Ar => &[AR_CATEGORY_NAMESPACE, EN_CATEGORY_NAMESPACE],
            Self::En => &[EN_CATEGORY_NAMESPACE],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Strips a leading category namespace prefix of `language`, if present.
pub fn strip_category_prefix(language: Language, title: &str) -> &str {
    let trimmed = title.trim();
    if let Some((prefix, rest)) = trimmed.split_once(':') {
        let prefix = prefix.trim();
        if language
            .category_namespace_aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(prefix))
        {
            return rest.trim();
        }
    }
    trimmed
}

fn normalize_name(name: &str) -> String {
    name.replace('_', " ").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryRef {
    pub language: Language,
    pub name: String,
}

impl CategoryRef {
    /// Accepts `تصنيف:اسم`, `Category:Name`, or a bare name.
    pub fn from_title(language: Language, title: &str) -> Self {
        let bare = strip_category_prefix(language, &normalize_name(title)).to_string();
        Self {
            language,
            name: bare,
        }
    }

    pub fn title(&self) -> String {
        format!("{}:{}", self.language.category_namespace(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleRef {
    pub language: Language,
    pub namespace: i32,
    pub name: String,
}

impl ArticleRef {
    /// Builds a reference from a full title as returned by a listing.
    pub fn from_title(language: Language, namespace: i32, title: &str) -> Self {
        let normalized = normalize_name(title);
        let name = if namespace == NS_CATEGORY {
            strip_category_prefix(language, &normalized).to_string()
        } else {
            normalized
        };
        Self {
            language,
            namespace,
            name,
        }
    }

    pub fn title(&self) -> String {
        render_title(self.language, self.namespace, &self.name)
    }
}

/// Renders a full title for the namespaces this bot touches. Other namespaces
/// are passed through unchanged since listings already return full titles.
pub fn render_title(language: Language, namespace: i32, name: &str) -> String {
    if namespace == NS_CATEGORY {
        format!("{}:{}", language.category_namespace(), name)
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub language: Language,
    pub title: String,
    pub content: String,
    pub is_redirect: bool,
}

impl PageText {
    pub fn new(language: Language, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            language,
            title: title.into(),
            content: content.into(),
            is_redirect: false,
        }
    }

    /// Returns a new value with `[[تصنيف:<name>]]` appended.
    pub fn with_category(&self, name: &str) -> Self {
        Self {
            language: self.language,
            title: self.title.clone(),
            content: append_category(&self.content, name),
            is_redirect: self.is_redirect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassificationResult {
    pub hidden: bool,
    pub maintenance: bool,
    pub stub: bool,
}

impl ClassificationResult {
    pub fn is_eligible(&self) -> bool {
        !self.hidden && !self.maintenance && !self.stub
    }

    pub fn skip_reason(&self) -> Option<EditDecision> {
        if self.hidden {
            Some(EditDecision::SkipHidden)
        } else if self.maintenance {
            Some(EditDecision::SkipMaintenance)
        } else if self.stub {
            Some(EditDecision::SkipStub)
        } else {
            None
        }
    }
}

/// One side of an interwiki link. `target` is `None` when no link exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterwikiLink {
    pub source_language: Language,
    pub source_title: String,
    pub target_language: Language,
    pub target: Option<String>,
}

impl InterwikiLink {
    /// The target title, or [`BotError::InterwikiNotFound`] when no link exists.
    pub fn into_target(self) -> Result<String> {
        self.target.ok_or_else(|| BotError::InterwikiNotFound {
            title: self.source_title,
            target: self.target_language.code().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditDecision {
    SkipHidden,
    SkipMaintenance,
    SkipStub,
    SkipNoInterwiki,
    SkipNotExplicit,
    SkipAlreadyPresent,
    SkipRedirect,
    SkipNotFound,
    Apply,
}

impl EditDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipHidden => "skip_hidden",
            Self::SkipMaintenance => "skip_maintenance",
            Self::SkipStub => "skip_stub",
            Self::SkipNoInterwiki => "skip_no_interwiki",
            Self::SkipNotExplicit => "skip_not_explicit",
            Self::SkipAlreadyPresent => "skip_already_present",
            Self::SkipRedirect => "skip_redirect",
            Self::SkipNotFound => "skip_not_found",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for EditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedEdit {
    pub before: PageText,
    pub after: PageText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecision {
    pub decision: EditDecision,
    pub target_title: Option<String>,
    pub edit: Option<ProposedEdit>,
}

impl MemberDecision {
    pub fn skip(decision: EditDecision) -> Self {
        Self {
            decision,
            target_title: None,
            edit: None,
        }
    }
}
