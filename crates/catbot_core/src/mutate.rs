use crate::model::AR_CATEGORY_NAMESPACE;

/// Appends `[[تصنيف:<name>]]` on its own line at the end of `text`.
///
/// Callers check absence first with [`crate::membership::contains_category`];
/// appending twice yields two links.
pub fn append_category(text: &str, name: &str) -> String {
    let link = format!("[[{AR_CATEGORY_NAMESPACE}:{}]]", name.trim());
    let mut output = String::with_capacity(text.len() + link.len() + 1);
    output.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&link);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_on_a_new_line() {
        assert_eq!(append_category("Hello", "مثال"), "Hello\n[[تصنيف:مثال]]");
    }

    #[test]
    fn existing_trailing_newline_is_reused() {
        assert_eq!(append_category("Hello\n", "مثال"), "Hello\n[[تصنيف:مثال]]");
    }

    #[test]
    fn other_trailing_whitespace_is_preserved() {
        assert_eq!(
            append_category("Hello\n\n", "مثال"),
            "Hello\n\n[[تصنيف:مثال]]"
        );
        assert_eq!(append_category("Hello  ", "مثال"), "Hello  \n[[تصنيف:مثال]]");
    }

    #[test]
    fn empty_text_gets_only_the_link() {
        assert_eq!(append_category("", "مثال"), "[[تصنيف:مثال]]");
    }

    #[test]
    fn existing_categories_stay_in_order() {
        let text = "نص\n[[تصنيف:أ]]\n[[تصنيف:ب]]";
        assert_eq!(
            append_category(text, "ج"),
            "نص\n[[تصنيف:أ]]\n[[تصنيف:ب]]\n[[تصنيف:ج]]"
        );
    }
}
