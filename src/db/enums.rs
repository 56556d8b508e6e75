use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tri-state visit marker stored on every bookmark.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "visit_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    #[sea_orm(string_value = "none")]
    #[serde(rename = "none")]
    NotVisited,
    #[sea_orm(string_value = "want_to_visit")]
    WantToVisit,
    #[sea_orm(string_value = "visited")]
    Visited,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::NotVisited => "none",
            VisitStatus::WantToVisit => "want_to_visit",
            VisitStatus::Visited => "visited",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(VisitStatus::NotVisited),
            "want_to_visit" => Ok(VisitStatus::WantToVisit),
            "visited" => Ok(VisitStatus::Visited),
            other => Err(format!("Unknown visit status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&VisitStatus::NotVisited).unwrap(),
            "\"none\""
        );
        assert_eq!(
            serde_json::to_string(&VisitStatus::WantToVisit).unwrap(),
            "\"want_to_visit\""
        );
        let parsed: VisitStatus = serde_json::from_str("\"visited\"").unwrap();
        assert_eq!(parsed, VisitStatus::Visited);
    }

    #[test]
    fn test_visit_status_from_str_rejects_unknown() {
        assert_eq!("none".parse::<VisitStatus>(), Ok(VisitStatus::NotVisited));
        assert!("all".parse::<VisitStatus>().is_err());
    }
}
