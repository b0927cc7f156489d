use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// 比較の単位となる CV セクション
///
/// Keys appear either in the localized (Turkish) script or in the English
/// fallback; `keys()` lists both, localized first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionField {
    Experience,
    Education,
    Skills,
    TechnicalSkills,
    ForeignLanguages,
    Courses,
    Certifications,
    PersonalSkills,
    References,
    Summary,
    Projects,
}

/// How a section is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Discrete terms compared by set overlap.
    List,
    /// Whole blocks of meaning compared by sentence embeddings.
    Narrative,
}

/// Display-list rule used by the section diff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiffRule {
    /// Token-sort similarity (0-100) must reach the threshold.
    Fuzzy { threshold: f64 },
    Exact,
}

impl SectionField {
    pub fn all() -> impl Iterator<Item = SectionField> {
        SectionField::iter()
    }

    pub fn list_fields() -> impl Iterator<Item = SectionField> {
        SectionField::iter().filter(|f| f.kind() == FieldKind::List)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            SectionField::Experience
            | SectionField::Education
            | SectionField::Summary
            | SectionField::Projects => FieldKind::Narrative,
            _ => FieldKind::List,
        }
    }

    /// Localized key as produced by the extraction collaborator.
    pub fn localized_key(self) -> &'static str {
        match self {
            SectionField::Experience => "DENEYİM",
            SectionField::Education => "EĞİTİM",
            SectionField::Skills => "YETENEKLER",
            SectionField::TechnicalSkills => "TEKNİK_BECERİLER",
            SectionField::ForeignLanguages => "YABANCI_DİL",
            SectionField::Courses => "KURSLAR",
            SectionField::Certifications => "SERTİFİKALAR",
            SectionField::PersonalSkills => "KİŞİSEL_BECERİLER",
            SectionField::References => "REFERANSLAR",
            SectionField::Summary => "ÖZET",
            SectionField::Projects => "PROJELER",
        }
    }

    fn english_keys(self) -> &'static [&'static str] {
        match self {
            SectionField::Experience => &["EXPERIENCE"],
            SectionField::Education => &["EDUCATION"],
            SectionField::Skills => &["SKILLS"],
            SectionField::TechnicalSkills => &["TECHNICAL_SKILLS"],
            SectionField::ForeignLanguages => &["FOREIGN_LANGUAGES", "LANGUAGES"],
            SectionField::Courses => &["COURSES"],
            SectionField::Certifications => &["CERTIFICATIONS"],
            SectionField::PersonalSkills => &["PERSONAL_SKILLS"],
            SectionField::References => &["REFERENCES"],
            SectionField::Summary => &["SUMMARY"],
            SectionField::Projects => &["PROJECTS"],
        }
    }

    /// Lookup keys in resolution order: localized first, then English.
    pub fn keys(self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.localized_key()).chain(self.english_keys().iter().copied())
    }

    /// Proficiency words are stripped from terms of this field.
    pub fn carries_proficiency(self) -> bool {
        matches!(self, SectionField::ForeignLanguages)
    }

    pub fn label(self) -> &'static str {
        match self {
            SectionField::Experience => "Experience",
            SectionField::Education => "Education",
            SectionField::Skills => "Skills",
            SectionField::TechnicalSkills => "Technical skills",
            SectionField::ForeignLanguages => "Languages",
            SectionField::Courses => "Courses",
            SectionField::Certifications => "Certifications",
            SectionField::PersonalSkills => "Personal skills",
            SectionField::References => "References",
            SectionField::Summary => "Summary",
            SectionField::Projects => "Projects",
        }
    }

    /// Title of the "common terms" report line, for fields that have one.
    pub fn common_terms_title(self) -> Option<&'static str> {
        match self {
            SectionField::Skills => Some("COMMON SKILLS"),
            SectionField::TechnicalSkills => Some("COMMON TECHNICAL SKILLS"),
            SectionField::ForeignLanguages => Some("COMMON LANGUAGES"),
            SectionField::PersonalSkills => Some("COMMON PERSONAL SKILLS"),
            SectionField::Certifications => Some("COMMON CERTIFICATIONS"),
            SectionField::Courses => Some("COMMON COURSES"),
            _ => None,
        }
    }

    pub fn diff_rule(self) -> DiffRule {
        match self {
            SectionField::PersonalSkills => DiffRule::Fuzzy { threshold: 70.0 },
            SectionField::Skills => DiffRule::Fuzzy { threshold: 75.0 },
            SectionField::Projects => DiffRule::Fuzzy { threshold: 65.0 },
            SectionField::TechnicalSkills
            | SectionField::Certifications
            | SectionField::Courses => DiffRule::Fuzzy { threshold: 85.0 },
            _ => DiffRule::Exact,
        }
    }
}

/// Report order for the "common terms" lines.
pub const COMMON_TERMS_ORDER: [SectionField; 6] = [
    SectionField::Skills,
    SectionField::TechnicalSkills,
    SectionField::ForeignLanguages,
    SectionField::PersonalSkills,
    SectionField::Certifications,
    SectionField::Courses,
];

/// Sections shown with common/only lists in the batch output.
pub const DIFF_SECTIONS: [SectionField; 7] = [
    SectionField::Skills,
    SectionField::TechnicalSkills,
    SectionField::Projects,
    SectionField::Certifications,
    SectionField::Courses,
    SectionField::PersonalSkills,
    SectionField::ForeignLanguages,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_has_a_kind_and_keys() {
        let narrative: Vec<_> = SectionField::all()
            .filter(|f| f.kind() == FieldKind::Narrative)
            .collect();
        assert_eq!(
            narrative,
            vec![
                SectionField::Experience,
                SectionField::Education,
                SectionField::Summary,
                SectionField::Projects
            ]
        );
        assert_eq!(SectionField::list_fields().count(), 7);
        for field in SectionField::all() {
            assert!(field.keys().count() >= 2, "{field} lacks an English key");
        }
    }

    #[test]
    fn localized_key_comes_first() {
        let keys: Vec<_> = SectionField::ForeignLanguages.keys().collect();
        assert_eq!(keys, vec!["YABANCI_DİL", "FOREIGN_LANGUAGES", "LANGUAGES"]);
    }

    #[test]
    fn snake_case_names() {
        assert_eq!(SectionField::TechnicalSkills.as_ref(), "technical_skills");
        assert_eq!(
            serde_json::to_string(&SectionField::PersonalSkills).unwrap(),
            "\"personal_skills\""
        );
    }
}
