use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::errors::Result;
use crate::tokenizer;

/// Metadata key under which the predicted label is attached to a document.
pub const METADATA_KEY: &str = "Severity";

/// Instance weights of the four known classes, indexed by class code.
pub const CLASS_WEIGHTS: [f64; 4] = [1.0, 0.3, 3.0, 3.0];

/// Annotator whose documents count half.
const DOWNWEIGHTED_ANNOTATOR: &str = "1";

const BODY_PATTERN: &str = r"(?s)\|(.*)\[report_end\]";
// `[^\n\r\x{85}\x{2028}\x{2029}]` is a dot that stops at every line
// terminator, and the whitespace class is ASCII only.
const TABLE_ROW_PATTERN: &str = concat!(
    r"(:[^\n\r\x{85}\x{2028}\x{2029}]*)\n+",
    r"([^\n\r\x{85}\x{2028}\x{2029}]*[^A-Z\-\( \t\n\x0B\f\r/])",
    r"([A-Z][^\n\r\x{85}\x{2028}\x{2029}]*:)",
);
const TABLE_ROW_REPLACEMENT: &str = "${1} ${2}\n${3}";
const SCORE_PATTERN: &str = r#"score="([0-9A-Za-z_]+)""#;
const ANNOTATOR_PATTERN: &str = r#"annotated_by="([^\n\r\x{85}\x{2028}\x{2029}])""#;

// Adjacent broken rows are not all caught by a single pass.
const TABLE_ROW_PASSES: usize = 3;

/// Severity class of a document.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Absent = 0,
    Mild = 1,
    Moderate = 2,
    Severe = 3,

    /// No usable score was found.
    Unknown = 4,
}

impl Severity {
    /// All class codes in index order.
    pub const ALL: [Self; 5] = [
        Self::Absent,
        Self::Mild,
        Self::Moderate,
        Self::Severe,
        Self::Unknown,
    ];

    /// Number of class codes, including [`Severity::Unknown`].
    pub const N_CODES: usize = 5;

    /// Gets the numeric class code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Converts a numeric class code back into a severity.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Gets the instance weight of the class, or `None` for [`Severity::Unknown`].
    pub fn class_weight(self) -> Option<f64> {
        CLASS_WEIGHTS.get(usize::from(self.code())).copied()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::Mild => "MILD",
            Self::Moderate => "MODERATE",
            Self::Severe => "SEVERE",
            Self::Unknown => "unknown",
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ABSENT" => Ok(Self::Absent),
            "MILD" => Ok(Self::Mild),
            "MODERATE" => Ok(Self::Moderate),
            "SEVERE" => Ok(Self::Severe),
            _ => Err("Unsupported severity class."),
        }
    }
}

/// A document split into its class, instance weight and body text.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    label: Severity,
    weight: f64,
    body: String,
    annotator: Option<String>,
}

impl Record {
    /// Creates a record from already separated parts.
    pub fn new<S>(label: Severity, weight: f64, body: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            label,
            weight,
            body: body.into(),
            annotator: None,
        }
    }

    pub const fn label(&self) -> Severity {
        self.label
    }

    pub const fn weight(&self) -> f64 {
        self.weight
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn annotator(&self) -> Option<&str> {
        self.annotator.as_deref()
    }

    /// Gets the synthetic token that identifies the annotator, if any.
    pub fn annotator_token(&self) -> Option<String> {
        self.annotator.as_ref().map(|id| format!("annotatedBy{id}"))
    }

    /// Tokenizes the body and appends the annotator token.
    ///
    /// The annotator token follows the bigrams and keeps its case, so it never
    /// collides with a word of the body.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = tokenizer::tokenize(&self.body);
        if let Some(token) = self.annotator_token() {
            tokens.push(token);
        }
        tokens
    }
}

/// Extracts records from semi-structured report text.
///
/// # Examples
///
/// ```
/// use severity::{RecordExtractor, Severity};
///
/// let extractor = RecordExtractor::new().unwrap();
/// let text = r#"<TAG score="SEVERE" annotated_by="2"/>|Patient in distress.[report_end]"#;
/// let record = extractor.extract(text);
///
/// assert_eq!(Severity::Severe, record.label());
/// assert_eq!(3.0, record.weight());
/// assert_eq!("Patient in distress.", record.body());
/// ```
#[derive(Clone, Debug)]
pub struct RecordExtractor {
    body: Regex,
    table_row: Regex,
    score: Regex,
    annotator: Regex,
}

impl RecordExtractor {
    /// Creates a new extractor.
    ///
    /// # Errors
    ///
    /// Returns an error only if a built-in pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            body: Regex::new(BODY_PATTERN)?,
            table_row: Regex::new(TABLE_ROW_PATTERN)?,
            score: Regex::new(SCORE_PATTERN)?,
            annotator: Regex::new(ANNOTATOR_PATTERN)?,
        })
    }

    /// Splits a raw document into a record.
    ///
    /// Missing markers never fail: the whole text becomes the body and the
    /// label falls back to [`Severity::Unknown`].
    pub fn extract(&self, text: &str) -> Record {
        let body = self
            .body
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map_or(text, |m| m.as_str());
        let body = self.fix_table_rows(body);

        let mut weight = 1.0;
        let label = self
            .score
            .captures(text)
            .and_then(|caps| caps[1].parse::<Severity>().ok())
            .unwrap_or(Severity::Unknown);
        if let Some(class_weight) = label.class_weight() {
            weight *= class_weight;
        }

        let annotator = self
            .annotator
            .captures(text)
            .map(|caps| caps[1].to_string());
        if annotator.as_deref() == Some(DOWNWEIGHTED_ANNOTATOR) {
            weight /= 2.0;
        }

        Record {
            label,
            weight,
            body,
            annotator,
        }
    }

    /// Inserts the line break missing before a `Label:` that was glued onto the
    /// previous table row.
    pub fn fix_table_rows(&self, text: &str) -> String {
        let mut fixed = text.to_string();
        for _ in 0..TABLE_ROW_PASSES {
            fixed = self
                .table_row
                .replace_all(&fixed, TABLE_ROW_REPLACEMENT)
                .into_owned();
        }
        fixed
    }
}

/// A document with its text and metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
    metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn put_metadata<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.insert(key.into(), value.into());
    }
}
