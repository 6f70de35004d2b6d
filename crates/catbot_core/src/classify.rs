use crate::model::{ClassificationResult, Language, strip_category_prefix};

const AR_MAINTENANCE: &str = "صيانة";
const AR_STUBS: &str = "بذور";
const AR_STUB_PREFIX: &str = "بذرة";
const EN_MAINTENANCE: &str = "maintenance";
const EN_STUB: &str = "stub";

/// Flags categories that should never be propagated.
///
/// Detection is substring based: exact code points for Arabic names and
/// case-insensitive for English ones. A namespace prefix on `name` is ignored.
pub fn classify(language: Language, name: &str, hidden: bool) -> ClassificationResult {
    let name = strip_category_prefix(language, name);
    ClassificationResult {
        hidden,
        maintenance: is_maintenance(language, name),
        stub: is_stub(language, name),
    }
}

fn is_maintenance(language: Language, name: &str) -> bool {
    match language {
        Language::Ar => name.contains(AR_MAINTENANCE),
        Language::En => name.to_lowercase().contains(EN_MAINTENANCE),
    }
}

fn is_stub(language: Language, name: &str) -> bool {
    match language {
        Language::Ar => name.starts_with(AR_STUB_PREFIX) || name.contains(AR_STUBS),
        Language::En => name.to_lowercase().contains(EN_STUB),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_stub_matches_any_case() {
        for name in ["Physics stubs", "STUB-Class articles", "Asia-geo-Stub"] {
            assert!(classify(Language::En, name, false).stub, "{name}");
        }
        assert!(!classify(Language::En, "Physicists", false).stub);
    }

    #[test]
    fn english_maintenance_matches_any_case() {
        let result = classify(Language::En, "Category:Wikipedia Maintenance", false);
        assert!(result.maintenance);
        assert!(!result.stub);
        assert!(!result.is_eligible());
    }

    #[test]
    fn arabic_stub_prefix_and_plural() {
        assert!(classify(Language::Ar, "بذرة فيزياء", false).stub);
        assert!(classify(Language::Ar, "تصنيف:بذرة فيزياء", false).stub);
        assert!(classify(Language::Ar, "مقالات بذور علوم", false).stub);
        // Only a leading بذرة counts.
        assert!(!classify(Language::Ar, "فيزياء بذرة", false).stub);
        assert!(!classify(Language::Ar, "علوم", false).stub);
    }

    #[test]
    fn arabic_maintenance_marker() {
        assert!(classify(Language::Ar, "تصنيفات صيانة", false).maintenance);
        assert!(!classify(Language::Ar, "تاريخ", false).maintenance);
    }

    #[test]
    fn english_rules_do_not_apply_to_arabic_names() {
        let result = classify(Language::Ar, "Stub maintenance", false);
        assert!(result.is_eligible());
    }

    #[test]
    fn hidden_flag_is_passed_through() {
        let result = classify(Language::Ar, "امثلة", true);
        assert!(result.hidden);
        assert!(!result.maintenance);
        assert!(!result.stub);
    }

    #[test]
    fn empty_name_is_all_false() {
        assert!(classify(Language::En, "", false).is_eligible());
        assert!(classify(Language::Ar, "  ", false).is_eligible());
    }
}
