//! Static level schema: which columns of a flat row describe each hierarchy level.
//!
//! Levels L0..L3 form the organisational hierarchy (domain, line of business, journey, process
//! area). Levels L4..L7 are process levels; they carry predecessor relationships and become the
//! nodes of the flow graph.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
    L7,
}

impl Level {
    pub const ALL: [Level; 8] = [
        Level::L0,
        Level::L1,
        Level::L2,
        Level::L3,
        Level::L4,
        Level::L5,
        Level::L6,
        Level::L7,
    ];

    /// First process level. Everything above it is organisational hierarchy.
    pub const FIRST_PROCESS: Level = Level::L4;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_process(self) -> bool {
        self >= Self::FIRST_PROCESS
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::L0 => "L0",
            Level::L1 => "L1",
            Level::L2 => "L2",
            Level::L3 => "L3",
            Level::L4 => "L4",
            Level::L5 => "L5",
            Level::L6 => "L6",
            Level::L7 => "L7",
        }
    }

    /// Human-readable role of the level, used in diagnostics.
    pub fn role(self) -> &'static str {
        match self {
            Level::L0 => "domain",
            Level::L1 => "line-of-business",
            Level::L2 => "journey",
            Level::L3 => "process-area",
            Level::L4 => "process",
            Level::L5 => "sub-process",
            Level::L6 => "activity",
            Level::L7 => "task",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSchema {
                message: format!("unknown level `{s}`"),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipColumns {
    pub predecessor_column: String,
    #[serde(default)]
    pub condition_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSpec {
    pub id_column: String,
    pub name_column: String,
    #[serde(default)]
    pub metadata_columns: Vec<String>,
    #[serde(default)]
    pub relationships: Option<RelationshipColumns>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSchema {
    levels: Vec<LevelSpec>,
}

impl Default for LevelSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl LevelSchema {
    /// The conventional column layout: `L{k}`, `L{k}name`, `L{k}Description`, and for process
    /// levels `L{k}StepType`, `L{k}Owner`, `L{k}System`, `L{k}Predecessor`, `L{k}Condition`.
    pub fn standard() -> Self {
        let levels = Level::ALL
            .iter()
            .map(|&level| {
                let k = level.as_str();
                let mut metadata_columns = vec![format!("{k}Description")];
                let mut relationships = None;
                if level.is_process() {
                    metadata_columns.extend([
                        format!("{k}StepType"),
                        format!("{k}Owner"),
                        format!("{k}System"),
                    ]);
                    relationships = Some(RelationshipColumns {
                        predecessor_column: format!("{k}Predecessor"),
                        condition_column: Some(format!("{k}Condition")),
                    });
                }
                LevelSpec {
                    id_column: k.to_string(),
                    name_column: format!("{k}name"),
                    metadata_columns,
                    relationships,
                }
            })
            .collect();
        Self { levels }
    }

    pub fn new(levels: Vec<LevelSpec>) -> Result<Self> {
        let schema = Self { levels };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let schema: Self = serde_yaml::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parses JSON when the text looks like a JSON object, YAML otherwise.
    pub fn from_config_str(text: &str) -> Result<Self> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_yaml(text)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.len() != Level::ALL.len() {
            return Err(Error::InvalidSchema {
                message: format!(
                    "expected {} levels, found {}",
                    Level::ALL.len(),
                    self.levels.len()
                ),
            });
        }
        for (idx, spec) in self.levels.iter().enumerate() {
            if spec.id_column.trim().is_empty() {
                return Err(Error::InvalidSchema {
                    message: format!("level L{idx} has a blank identifier column"),
                });
            }
        }
        Ok(())
    }

    pub fn spec(&self, level: Level) -> &LevelSpec {
        &self.levels[level.index()]
    }

    pub fn spec_mut(&mut self, level: Level) -> &mut LevelSpec {
        &mut self.levels[level.index()]
    }

    pub fn levels(&self) -> impl Iterator<Item = (Level, &LevelSpec)> {
        Level::ALL.iter().copied().zip(self.levels.iter())
    }

    /// Replaces the metadata columns declared for `level`.
    pub fn with_metadata_columns<I, S>(mut self, level: Level, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec_mut(level).metadata_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schema_names_process_relationship_columns() {
        let schema = LevelSchema::standard();
        assert_eq!(schema.spec(Level::L0).id_column, "L0");
        assert_eq!(schema.spec(Level::L0).name_column, "L0name");
        assert!(schema.spec(Level::L3).relationships.is_none());
        let rel = schema.spec(Level::L4).relationships.as_ref().unwrap();
        assert_eq!(rel.predecessor_column, "L4Predecessor");
        assert_eq!(rel.condition_column.as_deref(), Some("L4Condition"));
        assert!(schema.spec(Level::L7).metadata_columns.contains(&"L7StepType".to_string()));
    }

    #[test]
    fn schema_round_trips_through_yaml() {
        let schema = LevelSchema::standard();
        let yaml = serde_yaml::to_string(&schema).unwrap();
        assert_eq!(LevelSchema::from_yaml(&yaml).unwrap(), schema);
    }

    #[test]
    fn schema_with_wrong_level_count_is_rejected() {
        let err = LevelSchema::from_json(r#"{"levels":[{"idColumn":"a","nameColumn":"b"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }), "{err}");
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("l5".parse::<Level>().unwrap(), Level::L5);
        assert!("L9".parse::<Level>().is_err());
        assert_eq!(Level::L3.next(), Some(Level::L4));
        assert_eq!(Level::L7.next(), None);
    }
}
