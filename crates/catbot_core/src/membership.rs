use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::model::{CategoryRef, EN_CATEGORY_NAMESPACE, Language};

static TITLE_YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\{\{\s*Title[ _]year[ _]range\s*\}\}")
        .case_insensitive(true)
        .build()
        .expect("valid title year range pattern")
});

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d\d\d\d–\d\d\d?\d?|\d+[–-]\d+|\d+)").expect("valid year range pattern")
});

fn build_category_pattern(prefixes: &[&str], name: &str) -> String {
    let prefix = prefixes
        .iter()
        .map(|prefix| regex::escape(prefix))
        .collect::<Vec<_>>()
        .join("|");
    let name = name
        .split([' ', '_'])
        .filter(|word| !word.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[ _]+");
    format!(r"\[\[\s*(?:{prefix})\s*:[\s_]*{name}[\s_]*(?:\|[^\]]*)?\]\]")
}

fn category_regex(language: Language, name: &str) -> Option<Regex> {
    let pattern = build_category_pattern(language.category_namespace_aliases(), name);
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// True when `text` links the category literally, e.g. `[[Category:Foo]]` or
/// `[[تصنيف:Foo|key]]`. Categories added by template transclusion never show
/// up in raw wikitext and therefore never match.
pub fn contains_category(text: &str, language: Language, name: &str) -> bool {
    let name = name.trim();
    if text.is_empty() || name.is_empty() {
        return false;
    }
    category_regex(language, name).is_some_and(|regex| regex.is_match(text))
}

/// Explicit membership check for an English member page.
///
/// Category pages that build their parent links with `{{Title year range}}`
/// get the year range from the category name substituted first, since the
/// template renders the page's own range inside the link.
pub fn has_explicit_category(text: &str, category: &CategoryRef, page_title: &str) -> bool {
    let text = expand_title_year_range(text, &category.name, page_title);
    contains_category(&text, category.language, &category.name)
}

fn expand_title_year_range<'a>(text: &'a str, category_name: &str, page_title: &str) -> Cow<'a, str> {
    let is_category_page = page_title
        .strip_prefix(EN_CATEGORY_NAMESPACE)
        .is_some_and(|rest| rest.starts_with(':'));
    if !is_category_page || !TITLE_YEAR_RANGE.is_match(text) {
        return Cow::Borrowed(text);
    }
    match YEAR_RANGE.find(category_name) {
        Some(range) => TITLE_YEAR_RANGE.replace_all(text, regex::NoExpand(range.as_str())),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive() {
        assert!(contains_category("[[Category:Foo]]", Language::En, "foo"));
        assert!(contains_category("[[category:FOO]]", Language::En, "Foo"));
    }

    #[test]
    fn longer_names_do_not_match() {
        assert!(!contains_category("[[Category:Foobar]]", Language::En, "Foo"));
        assert!(!contains_category("[[Category:Foo bar]]", Language::En, "Foo"));
    }

    #[test]
    fn sort_keys_and_whitespace_are_allowed() {
        let text = "Body\n[[ Category : Examples | Sort key ]]\n";
        assert!(contains_category(text, Language::En, "Examples"));
        assert!(contains_category("[[Category:Examples|*]]", Language::En, "Examples"));
        assert!(contains_category("[[Category:Examples ]]", Language::En, "Examples"));
    }

    #[test]
    fn spaces_and_underscores_are_equivalent() {
        assert!(contains_category("[[Category:Swiss_adventure_films]]", Language::En, "Swiss adventure films"));
        assert!(contains_category("[[تصنيف:أفلام مغامرات]]", Language::Ar, "أفلام_مغامرات"));
    }

    #[test]
    fn surrounding_underscores_are_ignored() {
        assert!(contains_category("[[Category:Examples_]]", Language::En, "Examples"));
        assert!(contains_category("[[Category:_Examples_|key]]", Language::En, "Examples"));
        assert!(contains_category("[[تصنيف:امثلة_]]", Language::Ar, "امثلة"));
        assert!(!contains_category("[[Category:Examples_more]]", Language::En, "Examples"));
    }

    #[test]
    fn title_year_range_without_a_year_leaves_text_alone() {
        let category = CategoryRef::from_title(Language::En, "Category:Swiss films");
        let text = "{{Title year range}}\n[[Category:{{Title year range}} films]]";
        assert!(!has_explicit_category(text, &category, "Category:Swiss films by year"));
        assert_eq!(
            expand_title_year_range(text, "Swiss films", "Category:Swiss films by year"),
            text
        );
    }

    #[test]
    fn arabic_pages_accept_both_namespace_names() {
        let text = "هذا نص المقالة\n[[تصنيف:علوم]]";
        assert!(contains_category(text, Language::Ar, "علوم"));
        assert!(contains_category("[[Category:علوم]]", Language::Ar, "علوم"));
        assert!(!contains_category("[[تصنيف:علوم]]", Language::En, "علوم"));
    }

    #[test]
    fn special_characters_are_literal() {
        let text = "[[Category:Test (something)]]";
        assert!(contains_category(text, Language::En, "Test (something)"));
        assert!(!contains_category("[[Category:Test so]]", Language::En, "Test (s.)"));
        assert!(contains_category("[[Category:C++ libraries]]", Language::En, "C++ libraries"));
    }

    #[test]
    fn template_inherited_membership_is_not_explicit() {
        let text = "{{Examples navbox}}\n'''Example''' is a thing.";
        assert!(!contains_category(text, Language::En, "Examples"));
    }

    #[test]
    fn unclosed_links_do_not_match() {
        assert!(!contains_category("[[Category:Examples", Language::En, "Examples"));
    }

    #[test]
    fn empty_inputs_are_false() {
        assert!(!contains_category("", Language::En, "Examples"));
        assert!(!contains_category("[[Category:Examples]]", Language::En, ""));
        assert!(!contains_category("[[Category:]]", Language::En, "  "));
    }

    #[test]
    fn title_year_range_is_expanded_for_category_pages() {
        let category = CategoryRef::from_title(Language::En, "Category:1913 in Asia");
        let text = "{{Title year range}}\n[[Category:{{Title year range}} in Asia]]";
        assert!(has_explicit_category(text, &category, "Category:January 1913 in Asia"));
    }

    #[test]
    fn title_year_range_is_ignored_for_articles() {
        let category = CategoryRef::from_title(Language::En, "Category:1913 in Asia");
        let text = "[[Category:{{Title year range}} in Asia]]";
        assert!(!has_explicit_category(text, &category, "January 1913"));
    }

    #[test]
    fn explicit_check_uses_category_name() {
        let category = CategoryRef::from_title(Language::En, "Category:Examples");
        assert!(has_explicit_category("[[Category:Examples]]", &category, "Example Article"));
        assert!(!has_explicit_category("{{Examples}}", &category, "Example Article"));
    }
}
