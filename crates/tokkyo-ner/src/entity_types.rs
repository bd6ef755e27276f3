//! Category and importance labels for recognised spans.

use serde::{Deserialize, Serialize};

/// Kind of chemical notation a pattern recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChemicalCategory {
    OrganicMolecular,
    InorganicCompound,
    Polymer,
    Reaction,
    Property,
    Condition,
}

impl ChemicalCategory {
    pub const ALL: [ChemicalCategory; 6] = [
        ChemicalCategory::OrganicMolecular,
        ChemicalCategory::InorganicCompound,
        ChemicalCategory::Polymer,
        ChemicalCategory::Reaction,
        ChemicalCategory::Property,
        ChemicalCategory::Condition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChemicalCategory::OrganicMolecular  => "organic_molecular",
            ChemicalCategory::InorganicCompound => "inorganic_compound",
            ChemicalCategory::Polymer           => "polymer",
            ChemicalCategory::Reaction          => "reaction",
            ChemicalCategory::Property          => "property",
            ChemicalCategory::Condition         => "condition",
        }
    }

    /// Contribution of one entity of this category to the complexity score.
    pub fn complexity_weight(&self) -> f64 {
        match self {
            ChemicalCategory::OrganicMolecular  => 0.3,
            ChemicalCategory::InorganicCompound => 0.2,
            ChemicalCategory::Polymer           => 0.4,
            ChemicalCategory::Reaction          => 0.5,
            ChemicalCategory::Property          => 0.1,
            ChemicalCategory::Condition         => 0.1,
        }
    }
}

/// Which part of a patent a legal phrase typically belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalCategory {
    Claim,
    Description,
    Procedural,
    General,
}

impl LegalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalCategory::Claim       => "claim",
            LegalCategory::Description => "description",
            LegalCategory::Procedural  => "procedural",
            LegalCategory::General     => "general",
        }
    }
}

/// Importance tier of a legal phrase. Ordered: `Normal < Important < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Normal,
    Important,
    Critical,
}

impl Importance {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// Contribution of one expression to the legal quality score.
    pub fn quality_weight(&self) -> f64 {
        match self {
            Importance::Critical  => 1.0,
            Importance::Important => 0.6,
            Importance::Normal    => 0.3,
        }
    }
}
