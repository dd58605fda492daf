//! Generic query conditions.
//!
//! A [`Condition`] is one clause of a search: a value matched against one
//! or more fields, with flags controlling how the match behaves (boolean
//! occurrence, phrase, fuzzy, exact filter, geo radius). Conditions are
//! backend-neutral; each driver translates them into its native dialect.

use serde::{Deserialize, Serialize};

/// Field name that callers use to address a record's identifier.
///
/// Drivers rewrite it to their native identifier field, or short-circuit
/// into a direct get-by-id lookup where the backend supports one.
pub const ID_ALIAS: &str = "xref_id";

/// Fuzziness applied when a fuzzy factor is missing or out of range.
pub const DEFAULT_FUZZINESS: f64 = 0.5;

/// The fields a condition applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSelector {
    /// Match against every indexed field.
    All,
    /// Match against a single named field.
    Single(String),
    /// Match against several named fields.
    Multiple(Vec<String>),
}

impl FieldSelector {
    /// The explicit field names, or `None` for the all-fields selector.
    pub fn names(&self) -> Option<Vec<&str>> {
        match self {
            FieldSelector::All => None,
            FieldSelector::Single(name) => Some(vec![name.as_str()]),
            FieldSelector::Multiple(names) => Some(names.iter().map(|n| n.as_str()).collect()),
        }
    }

    /// Whether this selector addresses all fields.
    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelector::All)
    }
}

impl From<&str> for FieldSelector {
    fn from(name: &str) -> Self {
        if name.is_empty() || name == "*" {
            FieldSelector::All
        } else {
            FieldSelector::Single(name.to_string())
        }
    }
}

impl From<String> for FieldSelector {
    fn from(name: String) -> Self {
        FieldSelector::from(name.as_str())
    }
}

impl From<Vec<String>> for FieldSelector {
    fn from(names: Vec<String>) -> Self {
        match names.len() {
            0 => FieldSelector::All,
            1 => FieldSelector::from(names.into_iter().next().unwrap()),
            _ => FieldSelector::Multiple(names),
        }
    }
}

/// Occurrence requirements for condition clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// Fuzziness of an edit-distance match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Fuzziness {
    /// Use [`DEFAULT_FUZZINESS`].
    Auto,
    /// An explicit factor; only values within `[0, 1]` are honored.
    Factor(f64),
}

impl Fuzziness {
    /// Resolve to a factor in `[0, 1]`.
    ///
    /// Factors outside the valid range fall back to [`DEFAULT_FUZZINESS`]
    /// rather than being passed through raw.
    pub fn factor(&self) -> f64 {
        match self {
            Fuzziness::Auto => DEFAULT_FUZZINESS,
            Fuzziness::Factor(f) if (0.0..=1.0).contains(f) => *f,
            Fuzziness::Factor(_) => DEFAULT_FUZZINESS,
        }
    }
}

/// A geo-radius filter: records within `distance` meters of a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Radius in meters.
    pub distance: f64,
}

/// One generic filter/match clause supplied by a caller.
///
/// At most one of the geo, filter, and text-match interpretations is
/// dominant per condition; drivers check geo first, then the filter flag,
/// and only then fall through to text matching.
///
/// # Examples
///
/// ```
/// use sagitta::condition::{Condition, Occur};
///
/// let condition = Condition::new("title", "red shoes").required();
/// assert_eq!(condition.occur(), Occur::Must);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// The field(s) the value is matched against.
    pub field: FieldSelector,
    /// The value to match, trimmed on construction.
    pub value: String,
    /// Must-match occurrence.
    pub required: bool,
    /// Must-not-match occurrence; wins over `required`.
    pub prohibited: bool,
    /// Match the value as an exact phrase.
    pub phrase: bool,
    /// Exact facet/numeric filter instead of a relevance match.
    pub filter: bool,
    /// Edit-distance matching.
    pub fuzzy: Option<Fuzziness>,
    /// Geo-radius filtering; short-circuits all other interpretations.
    pub geo: Option<GeoRadius>,
}

impl Condition {
    /// Create a relevance-match condition against the given field(s).
    pub fn new<F: Into<FieldSelector>, V: AsRef<str>>(field: F, value: V) -> Self {
        Condition {
            field: field.into(),
            value: value.as_ref().trim().to_string(),
            required: false,
            prohibited: false,
            phrase: false,
            filter: false,
            fuzzy: None,
            geo: None,
        }
    }

    /// Create a condition matching all fields.
    pub fn all<V: AsRef<str>>(value: V) -> Self {
        Condition::new(FieldSelector::All, value)
    }

    /// Create a geo-radius condition around a point, in meters.
    pub fn near(lat: f64, lon: f64, distance: f64) -> Self {
        let mut condition = Condition::all("");
        condition.geo = Some(GeoRadius { lat, lon, distance });
        condition
    }

    /// Require this condition to match (boolean AND).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Require this condition not to match (boolean NOT).
    pub fn prohibited(mut self) -> Self {
        self.prohibited = true;
        self
    }

    /// Match the value as an exact phrase.
    pub fn phrase(mut self) -> Self {
        self.phrase = true;
        self
    }

    /// Filter on the value exactly instead of relevance-matching it.
    pub fn filter(mut self) -> Self {
        self.filter = true;
        self
    }

    /// Enable fuzzy matching with the default fuzziness.
    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = Some(Fuzziness::Auto);
        self
    }

    /// Enable fuzzy matching with an explicit factor in `[0, 1]`.
    pub fn fuzziness(mut self, factor: f64) -> Self {
        self.fuzzy = Some(Fuzziness::Factor(factor));
        self
    }

    /// The boolean occurrence this condition resolves to.
    ///
    /// `prohibited` wins when both flags are set.
    pub fn occur(&self) -> Occur {
        if self.prohibited {
            Occur::MustNot
        } else if self.required {
            Occur::Must
        } else {
            Occur::Should
        }
    }

    /// The resolved fuzziness factor, if fuzzy matching is enabled.
    pub fn fuzziness_factor(&self) -> Option<f64> {
        self.fuzzy.map(|f| f.factor())
    }

    /// The id value, when this condition addresses the identifier alias.
    pub fn id_lookup(&self) -> Option<&str> {
        match &self.field {
            FieldSelector::Single(name) if name == ID_ALIAS => Some(self.value.as_str()),
            _ => None,
        }
    }
}
