use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Education,
    Entertainment,
    Sports,
    News,
    Technology,
    Health,
    Science,
    Politics,
    Business,
    Arts,
    Travel,
    Food,
    Corruption,
    Fraud,
    Harassment,
    #[serde(rename = "Safety Violation")]
    SafetyViolation,
    Environmental,
    Other,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::Education,
        Category::Entertainment,
        Category::Sports,
        Category::News,
        Category::Technology,
        Category::Health,
        Category::Science,
        Category::Politics,
        Category::Business,
        Category::Arts,
        Category::Travel,
        Category::Food,
        Category::Corruption,
        Category::Fraud,
        Category::Harassment,
        Category::SafetyViolation,
        Category::Environmental,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "Education",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::News => "News",
            Category::Technology => "Technology",
            Category::Health => "Health",
            Category::Science => "Science",
            Category::Politics => "Politics",
            Category::Business => "Business",
            Category::Arts => "Arts",
            Category::Travel => "Travel",
            Category::Food => "Food",
            Category::Corruption => "Corruption",
            Category::Fraud => "Fraud",
            Category::Harassment => "Harassment",
            Category::SafetyViolation => "Safety Violation",
            Category::Environmental => "Environmental",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_strings() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn rejects_unknown_and_case_mismatch() {
        assert!("technology".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn wire_form_is_display_string() {
        let json = serde_json::to_string(&Category::SafetyViolation).unwrap();
        assert_eq!(json, "\"Safety Violation\"");
    }
}
